//! Unified Error Type System
//!
//! Centralized error types for the entire application.
//!
//! ## Error Categories
//!
//! - **Configuration**: unknown deployment, bad endpoint, missing key (fatal)
//! - **Transport**: timeout, non-2xx, undecodable response (surfaced, not retried)
//! - **Protocol**: wrong candidate count (fatal for the call)
//! - **Validation**: generated text is not valid HCL (never persisted)
//! - **Provisioning**: terraform exited with an error
//! - **Cancelled**: interrupted by the user

use std::fmt;
use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// Error categories used to decide how the CLI reports a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Misconfiguration - report immediately, no retry
    Configuration,
    /// Network or HTTP failure talking to the completion API
    Transport,
    /// Completion API answered with an unexpected shape
    Protocol,
    /// Generated template rejected by the syntax check
    Validation,
    /// External terraform binary failed
    Provisioning,
    /// Interrupted by the user
    Cancelled,
    /// Local I/O or serialization failure
    System,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Transport => write!(f, "TRANSPORT"),
            Self::Protocol => write!(f, "PROTOCOL"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::Provisioning => write!(f, "PROVISIONING"),
            Self::Cancelled => write!(f, "CANCELLED"),
            Self::System => write!(f, "SYSTEM"),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Syntax check failure with the parser's diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// One entry per diagnostic; never empty
    pub diagnostics: Vec<String>,
}

impl ValidationError {
    pub fn new(diagnostics: Vec<String>) -> Self {
        Self { diagnostics }
    }

    pub fn from_message(message: impl Into<String>) -> Self {
        Self {
            diagnostics: vec![message.into()],
        }
    }

    /// Diagnostics joined into a single block, one per line
    pub fn summary(&self) -> String {
        self.diagnostics.join("\n")
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid terraform template: {}", self.diagnostics.join("; "))
    }
}

impl std::error::Error for ValidationError {}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum AssistError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Config error: {0}")]
    Config(String),

    #[error("Unknown deployment {deployment:?}: not found in max tokens table")]
    UnknownDeployment { deployment: String },

    // -------------------------------------------------------------------------
    // Completion Errors
    // -------------------------------------------------------------------------
    #[error("Token encoding failed: {0}")]
    Encoding(String),

    #[error(
        "Token budget exhausted for {deployment}: {budget} tokens left \
         (max {max_tokens}, prompt {prompt_tokens})"
    )]
    BudgetExhausted {
        deployment: String,
        budget: i64,
        max_tokens: i64,
        prompt_tokens: usize,
    },

    #[error("{backend} request failed{}: {message}", status_suffix(.status))]
    Transport {
        backend: String,
        status: Option<u16>,
        message: String,
    },

    #[error("Invalid response: expected {expected} choice(s) but received {received}")]
    Protocol { expected: usize, received: usize },

    // -------------------------------------------------------------------------
    // Template & Provisioning Errors
    // -------------------------------------------------------------------------
    #[error("{0}")]
    Validation(ValidationError),

    #[error("terraform {operation} failed: {message}")]
    Provisioning { operation: String, message: String },

    #[error("Interrupted")]
    Cancelled,
}

impl From<ValidationError> for AssistError {
    fn from(err: ValidationError) -> Self {
        AssistError::Validation(err)
    }
}

pub type Result<T> = std::result::Result<T, AssistError>;

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}

// =============================================================================
// Helper Functions
// =============================================================================

impl AssistError {
    /// Create a transport error without an HTTP status
    pub fn transport(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            backend: backend.into(),
            status: None,
            message: message.into(),
        }
    }

    /// Create a transport error for a non-2xx response
    pub fn http_status(backend: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::Transport {
            backend: backend.into(),
            status: Some(status),
            message: message.into(),
        }
    }

    /// Create a provisioning error
    pub fn provisioning(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provisioning {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_) | Self::UnknownDeployment { .. } | Self::BudgetExhausted { .. } => {
                ErrorCategory::Configuration
            }
            Self::Encoding(_) | Self::Io(_) | Self::Json(_) | Self::Yaml(_) => ErrorCategory::System,
            Self::Transport { .. } => ErrorCategory::Transport,
            Self::Protocol { .. } => ErrorCategory::Protocol,
            Self::Validation(_) => ErrorCategory::Validation,
            Self::Provisioning { .. } => ErrorCategory::Provisioning,
            Self::Cancelled => ErrorCategory::Cancelled,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
