//! OpenAI API Backend
//!
//! Primary backend using api.openai.com `/completions` and `/chat/completions`.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::response::{self, ChatCompletionResponse, LegacyCompletionResponse};
use super::{
    BackendKind, Candidates, ChatCompletionBody, CompletionBackend, CompletionRequest,
    LegacyCompletionBody,
};
use crate::config::LlmConfig;
use crate::constants::network;
use crate::types::{AssistError, Result};

/// OpenAI API backend with secure API key handling
pub struct OpenAiBackend {
    /// API key stored securely - never exposed in logs or debug output
    api_key: SecretString,
    api_base: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiBackend")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl OpenAiBackend {
    pub fn new(config: &LlmConfig, api_key: SecretString) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(network::USER_AGENT)
            .build()
            .map_err(|e| AssistError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            api_base: network::OPENAI_API_BASE.to_string(),
            client,
        })
    }

    /// Point the backend at a different base URL (proxies, tests)
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: serde::Serialize + ?Sized,
        R: serde::de::DeserializeOwned,
    {
        let url = format!("{}{}", self.api_base, path);
        let start_time = Instant::now();

        debug!("Sending request to {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| response::send_error(self.kind(), e))?;

        debug!("OpenAI responded {} in {:?}", response.status(), start_time.elapsed());

        response::decode(self.kind(), response).await
    }
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    async fn completion(&self, request: &CompletionRequest) -> Result<Candidates> {
        info!(
            "Generating with OpenAI completion (model: {}, max_tokens: {})",
            request.model, request.max_tokens
        );
        let body = LegacyCompletionBody::new(request, true);
        let response: LegacyCompletionResponse = self.post("/completions", &body).await?;
        Ok(response.into())
    }

    async fn chat_completion(&self, request: &CompletionRequest) -> Result<Candidates> {
        info!(
            "Generating with OpenAI chat completion (model: {}, max_tokens: {})",
            request.model, request.max_tokens
        );
        let body = ChatCompletionBody::new(request);
        let response: ChatCompletionResponse = self.post("/chat/completions", &body).await?;
        Ok(response.into())
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Primary
    }
}
