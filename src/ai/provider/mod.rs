//! Completion Backends
//!
//! Defines the `CompletionBackend` trait over the two hosted APIs. Each backend
//! exposes both request shapes; the dispatcher picks the shape, not the backend.
//!
//! ## Modules
//!
//! - `openai`: OpenAI API (primary)
//! - `azure`: Azure OpenAI deployment API (secondary)
//! - `response`: shared response decoding and error envelopes

mod azure;
mod openai;
mod response;

pub use azure::AzureOpenAiBackend;
pub use openai::OpenAiBackend;

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::config::Config;
use crate::constants::llm::CANDIDATE_COUNT;
use crate::types::{AssistError, Result};

/// Which hosted API serves the requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// api.openai.com
    Primary,
    /// Azure OpenAI resource endpoint
    Secondary,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => write!(f, "openai"),
            Self::Secondary => write!(f, "azure-openai"),
        }
    }
}

/// Parameters shared by both request shapes
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Model or deployment name
    pub model: String,
    /// Full payload (instruction + context)
    pub prompt: String,
    /// Response budget; always positive
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Candidate texts returned by one call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Candidates(pub Vec<String>);

impl Candidates {
    /// The single candidate; any other count is a protocol violation
    pub fn into_single(self) -> Result<String> {
        let received = self.0.len();
        let expected = CANDIDATE_COUNT as usize;
        if received != expected {
            return Err(AssistError::Protocol { expected, received });
        }
        self.0
            .into_iter()
            .next()
            .ok_or(AssistError::Protocol { expected, received })
    }
}

/// Hosted completion API
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Legacy prompt completion
    async fn completion(&self, request: &CompletionRequest) -> Result<Candidates>;

    /// Chat completion with a single user message
    async fn chat_completion(&self, request: &CompletionRequest) -> Result<Candidates>;

    fn kind(&self) -> BackendKind;
}

pub type SharedBackend = Arc<dyn CompletionBackend>;

/// Create the backend selected by configuration: Azure when an endpoint is set
pub fn create_backend(config: &Config) -> Result<SharedBackend> {
    let api_key = config
        .llm
        .api_key
        .clone()
        .ok_or_else(|| AssistError::Config("Please provide an OpenAI API key".to_string()))?;

    if config.uses_azure() {
        Ok(Arc::new(AzureOpenAiBackend::new(&config.llm, api_key)?))
    } else {
        Ok(Arc::new(OpenAiBackend::new(&config.llm, api_key)?))
    }
}

// Wire types shared by both backends

#[derive(Debug, Serialize)]
pub(crate) struct LegacyCompletionBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<&'a str>,
    pub prompt: [&'a str; 1],
    pub max_tokens: u32,
    pub temperature: f32,
    pub n: u32,
    pub echo: bool,
    pub stream: bool,
}

impl<'a> LegacyCompletionBody<'a> {
    pub fn new(request: &'a CompletionRequest, include_model: bool) -> Self {
        Self {
            model: include_model.then_some(request.model.as_str()),
            prompt: [request.prompt.as_str()],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            n: CANDIDATE_COUNT,
            echo: false,
            stream: false,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatCompletionBody<'a> {
    pub model: &'a str,
    pub messages: [ChatMessage<'a>; 1],
    pub max_tokens: u32,
    pub temperature: f32,
    pub n: u32,
    pub stream: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatMessage<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

impl<'a> ChatCompletionBody<'a> {
    pub fn new(request: &'a CompletionRequest) -> Self {
        Self {
            model: &request.model,
            messages: [ChatMessage {
                role: crate::constants::llm::USER_ROLE,
                content: &request.prompt,
            }],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            n: CANDIDATE_COUNT,
            stream: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "text-davinci-003".to_string(),
            prompt: "generate S3 bucket\n".to_string(),
            max_tokens: 3990,
            temperature: 0.0,
        }
    }

    #[test]
    fn test_single_candidate() {
        let candidates = Candidates(vec!["resource {}".to_string()]);
        assert_eq!(candidates.into_single().unwrap(), "resource {}");
    }

    #[test]
    fn test_wrong_candidate_count() {
        let err = Candidates(vec![]).into_single().unwrap_err();
        assert!(matches!(err, AssistError::Protocol { expected: 1, received: 0 }));

        let err = Candidates(vec!["a".to_string(), "b".to_string()])
            .into_single()
            .unwrap_err();
        assert!(matches!(err, AssistError::Protocol { expected: 1, received: 2 }));
    }

    #[test]
    fn test_legacy_body() {
        let request = request();
        let body = serde_json::to_value(LegacyCompletionBody::new(&request, true)).unwrap();
        assert_eq!(body["model"], "text-davinci-003");
        assert_eq!(body["prompt"][0], "generate S3 bucket\n");
        assert_eq!(body["n"], 1);
        assert_eq!(body["echo"], false);
        assert_eq!(body["stream"], false);
        assert_eq!(body["max_tokens"], 3990);

        let body = serde_json::to_value(LegacyCompletionBody::new(&request, false)).unwrap();
        assert!(body.get("model").is_none());
    }

    #[test]
    fn test_chat_body() {
        let request = request();
        let body = serde_json::to_value(ChatCompletionBody::new(&request)).unwrap();
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "generate S3 bucket\n");
        assert_eq!(body["n"], 1);
        assert_eq!(body["stream"], false);
    }

    #[test]
    fn test_missing_api_key() {
        let config = Config::default();
        let err = create_backend(&config).err().unwrap();
        assert!(matches!(err, AssistError::Config(_)));
    }

    #[test]
    fn test_backend_selection() {
        let mut config = Config::default();
        config.llm.api_key = Some("sk-test".into());
        assert_eq!(create_backend(&config).unwrap().kind(), BackendKind::Primary);

        config.llm.azure_endpoint = Some("https://example.openai.azure.com".to_string());
        config.llm.deployment_name = "gpt-35-turbo-0301".to_string();
        assert_eq!(create_backend(&config).unwrap().kind(), BackendKind::Secondary);
    }
}
