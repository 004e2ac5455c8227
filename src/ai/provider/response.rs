//! Response decoding shared by both backends.
//!
//! Non-2xx responses are turned into transport errors carrying the HTTP
//! status and the API's error message (or the raw body when it is not the
//! usual `{"error": {...}}` envelope).

use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::{BackendKind, Candidates};
use crate::types::{AssistError, Result};

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

/// Map a failed send (connect, timeout, TLS) to a transport error
pub(crate) fn send_error(backend: BackendKind, err: reqwest::Error) -> AssistError {
    if err.is_timeout() {
        AssistError::transport(backend.to_string(), format!("request timed out: {}", err))
    } else {
        AssistError::transport(backend.to_string(), err.to_string())
    }
}

/// Check the status and decode the JSON body
pub(crate) async fn decode<T: DeserializeOwned>(
    backend: BackendKind,
    response: reqwest::Response,
) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .map_err(|e| AssistError::transport(backend.to_string(), format!("failed to read from body: {}", e)))?;
        return Err(AssistError::http_status(
            backend.to_string(),
            status.as_u16(),
            error_message(&body),
        ));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| send_error(backend, e))?;
    serde_json::from_slice(&bytes).map_err(|e| {
        AssistError::transport(backend.to_string(), format!("invalid json response: {}", e))
    })
}

/// Message from an error envelope, or the raw body
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorEnvelope>(body) {
        Ok(envelope) => match envelope.error.kind {
            Some(kind) if !kind.is_empty() => format!("{} ({})", envelope.error.message, kind),
            _ => envelope.error.message,
        },
        Err(_) => format!("Unexpected: {}", body.trim()),
    }
}

// Response payloads

#[derive(Debug, Deserialize)]
pub(crate) struct LegacyCompletionResponse {
    choices: Vec<TextChoice>,
}

#[derive(Debug, Deserialize)]
struct TextChoice {
    #[serde(default)]
    text: String,
}

impl From<LegacyCompletionResponse> for Candidates {
    fn from(response: LegacyCompletionResponse) -> Self {
        Candidates(response.choices.into_iter().map(|c| c.text).collect())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl From<ChatCompletionResponse> for Candidates {
    fn from(response: ChatCompletionResponse) -> Self {
        Candidates(
            response
                .choices
                .into_iter()
                .map(|c| c.message.content.unwrap_or_default())
                .collect(),
        )
    }
}
