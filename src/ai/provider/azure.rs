//! Azure OpenAI Backend
//!
//! Secondary backend: requests go to a deployment on an Azure OpenAI resource,
//! authenticated with the `api-key` header.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use url::Url;

use super::response::{self, ChatCompletionResponse, LegacyCompletionResponse};
use super::{
    BackendKind, Candidates, ChatCompletionBody, CompletionBackend, CompletionRequest,
    LegacyCompletionBody,
};
use crate::ai::deployment::validate_azure_deployment_name;
use crate::config::LlmConfig;
use crate::constants::network;
use crate::types::{AssistError, Result};

const API_KEY_HEADER: &str = "api-key";

/// Azure OpenAI backend bound to one resource endpoint and deployment
pub struct AzureOpenAiBackend {
    api_key: SecretString,
    endpoint: String,
    deployment: String,
    api_version: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for AzureOpenAiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureOpenAiBackend")
            .field("api_key", &"[REDACTED]")
            .field("endpoint", &self.endpoint)
            .field("deployment", &self.deployment)
            .field("api_version", &self.api_version)
            .finish()
    }
}

impl AzureOpenAiBackend {
    pub fn new(config: &LlmConfig, api_key: SecretString) -> Result<Self> {
        let endpoint = config
            .azure_endpoint
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| AssistError::Config("Azure OpenAI endpoint is not set".to_string()))?;
        let endpoint = parse_endpoint(endpoint)?;

        validate_azure_deployment_name(&config.deployment_name)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(network::USER_AGENT)
            .build()
            .map_err(|e| AssistError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            endpoint,
            deployment: config.deployment_name.clone(),
            api_version: config.api_version.clone(),
            client,
        })
    }

    fn operation_url(&self, operation: &str) -> String {
        format!(
            "{}/openai/deployments/{}/{}",
            self.endpoint, self.deployment, operation
        )
    }

    async fn post<B, R>(&self, operation: &str, body: &B) -> Result<R>
    where
        B: serde::Serialize + ?Sized,
        R: serde::de::DeserializeOwned,
    {
        let url = self.operation_url(operation);
        let start_time = Instant::now();

        debug!("Sending request to {} (api-version {})", url, self.api_version);

        let response = self
            .client
            .post(&url)
            .query(&[("api-version", self.api_version.as_str())])
            .header(API_KEY_HEADER, self.api_key.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| response::send_error(self.kind(), e))?;

        debug!(
            "Azure OpenAI responded {} in {:?}",
            response.status(),
            start_time.elapsed()
        );

        response::decode(self.kind(), response).await
    }
}

/// Endpoint must be an absolute http(s) URL; stored without a trailing slash
fn parse_endpoint(endpoint: &str) -> Result<String> {
    let url = Url::parse(endpoint).map_err(|e| {
        AssistError::Config(format!("Invalid Azure OpenAI endpoint {:?}: {}", endpoint, e))
    })?;

    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(AssistError::Config(format!(
            "Invalid Azure OpenAI endpoint {:?}: expected an absolute http(s) URL",
            endpoint
        )));
    }

    Ok(url.as_str().trim_end_matches('/').to_string())
}

#[async_trait]
impl CompletionBackend for AzureOpenAiBackend {
    async fn completion(&self, request: &CompletionRequest) -> Result<Candidates> {
        info!(
            "Generating with Azure OpenAI completion (deployment: {}, max_tokens: {})",
            self.deployment, request.max_tokens
        );
        // The deployment in the path selects the model
        let body = LegacyCompletionBody::new(request, false);
        let response: LegacyCompletionResponse = self.post("completions", &body).await?;
        Ok(response.into())
    }

    async fn chat_completion(&self, request: &CompletionRequest) -> Result<Candidates> {
        info!(
            "Generating with Azure OpenAI chat completion (deployment: {}, max_tokens: {})",
            self.deployment, request.max_tokens
        );
        let body = ChatCompletionBody::new(request);
        let response: ChatCompletionResponse = self.post("chat/completions", &body).await?;
        Ok(response.into())
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Secondary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(endpoint: &str, deployment: &str) -> LlmConfig {
        LlmConfig {
            azure_endpoint: Some(endpoint.to_string()),
            deployment_name: deployment.to_string(),
            ..LlmConfig::default()
        }
    }

    fn request(model: &str) -> CompletionRequest {
        CompletionRequest {
            model: model.to_string(),
            prompt: "generate S3 bucket\n".to_string(),
            max_tokens: 3990,
            temperature: 0.0,
        }
    }

    #[tokio::test]
    async fn test_chat_completion_uses_deployment_path_and_api_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/deployments/gpt-35-turbo-0301/chat/completions"))
            .and(query_param("api-version", "2023-03-15-preview"))
            .and(header("api-key", "azure-key"))
            .and(body_partial_json(json!({"n": 1, "stream": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"index": 0, "message": {"role": "assistant", "content": "provider \"azurerm\" {}"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = AzureOpenAiBackend::new(
            &config(&format!("{}/", server.uri()), "gpt-35-turbo-0301"),
            "azure-key".into(),
        )
        .unwrap();

        let candidates = backend
            .chat_completion(&request("gpt-35-turbo-0301"))
            .await
            .unwrap();
        assert_eq!(candidates.into_single().unwrap(), "provider \"azurerm\" {}");
    }

    #[tokio::test]
    async fn test_completion_omits_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/deployments/text-davinci-003/completions"))
            .and(query_param("api-version", "2023-03-15-preview"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"text": "terraform {}"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let backend =
            AzureOpenAiBackend::new(&config(&server.uri(), "text-davinci-003"), "k".into())
                .unwrap();
        backend
            .completion(&request("text-davinci-003"))
            .await
            .unwrap();

        let received = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
        assert!(body.get("model").is_none());
        assert_eq!(body["echo"], false);
    }

    #[tokio::test]
    async fn test_two_candidates_rejected_by_caller() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"text": "a"}, {"text": "b"}]
            })))
            .mount(&server)
            .await;

        let backend =
            AzureOpenAiBackend::new(&config(&server.uri(), "text-davinci-003"), "k".into())
                .unwrap();
        let err = backend
            .completion(&request("text-davinci-003"))
            .await
            .unwrap()
            .into_single()
            .unwrap_err();
        assert!(matches!(err, AssistError::Protocol { expected: 1, received: 2 }));
    }

    #[tokio::test]
    async fn test_raw_error_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&server)
            .await;

        let backend =
            AzureOpenAiBackend::new(&config(&server.uri(), "gpt-4-0314"), "k".into())
                .unwrap();
        let err = backend
            .chat_completion(&request("gpt-4-0314"))
            .await
            .unwrap_err();
        match err {
            AssistError::Transport {
                backend,
                status,
                message,
            } => {
                assert_eq!(backend, "azure-openai");
                assert_eq!(status, Some(502));
                assert_eq!(message, "Unexpected: Bad Gateway");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_relative_endpoint() {
        let err = AzureOpenAiBackend::new(&config("example.openai.azure.com", "gpt-4"), "k".into())
            .unwrap_err();
        assert!(matches!(err, AssistError::Config(_)));
    }

    #[test]
    fn test_rejects_bad_deployment_name() {
        let err = AzureOpenAiBackend::new(
            &config("https://example.openai.azure.com", "gpt 4!"),
            "k".into(),
        )
        .unwrap_err();
        assert!(matches!(err, AssistError::Config(_)));
    }

    #[test]
    fn test_endpoint_trailing_slash_trimmed() {
        assert_eq!(
            parse_endpoint("https://example.openai.azure.com/").unwrap(),
            "https://example.openai.azure.com"
        );
    }
}
