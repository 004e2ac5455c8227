//! Deployment Catalog
//!
//! Static lookup from deployment name to context window size, plus the
//! name-based classification that picks the request shape.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::types::{AssistError, Result};

/// Built-in deployments and their context window (tokens)
const BUILTIN_DEPLOYMENTS: &[(&str, usize)] = &[
    ("code-davinci-002", 8001),
    ("text-davinci-003", 4097),
    ("gpt-3.5-turbo-0301", 4096),
    ("gpt-3.5-turbo", 4096),
    ("gpt-35-turbo-0301", 4096), // azure naming
    ("gpt-4-0314", 8192),
    ("gpt-4-32k-0314", 8192),
];

/// Name fragments of the chat model family
const CHAT_FAMILY: &[&str] = &["gpt-3.5-turbo", "gpt-35-turbo", "gpt-4"];

static AZURE_DEPLOYMENT_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9]+([_-]?[a-zA-Z0-9]+)*$").expect("deployment name pattern is valid")
});

// =============================================================================
// Request Shape
// =============================================================================

/// Which completion endpoint a deployment is called through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestShape {
    /// `/chat/completions` with a single user message
    Chat,
    /// Legacy `/completions` with a prompt string
    Completion,
}

impl RequestShape {
    /// Classify a deployment by its model family. Pure: same input, same shape.
    pub fn classify(deployment: &str) -> Self {
        if CHAT_FAMILY.iter().any(|family| deployment.contains(family)) {
            Self::Chat
        } else {
            Self::Completion
        }
    }
}

impl fmt::Display for RequestShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chat => write!(f, "chat-completion"),
            Self::Completion => write!(f, "completion"),
        }
    }
}

// =============================================================================
// Deployment Profiles
// =============================================================================

/// Immutable deployment -> max context tokens table
#[derive(Debug, Clone)]
pub struct DeploymentProfiles {
    max_tokens: BTreeMap<String, usize>,
}

impl Default for DeploymentProfiles {
    fn default() -> Self {
        Self::builtin()
    }
}

impl DeploymentProfiles {
    /// Table with the built-in deployments only
    pub fn builtin() -> Self {
        Self {
            max_tokens: BUILTIN_DEPLOYMENTS
                .iter()
                .map(|(name, max)| (name.to_string(), *max))
                .collect(),
        }
    }

    /// Built-in table extended (or overridden) by configured entries
    pub fn with_extra<'a>(extra: impl IntoIterator<Item = (&'a String, &'a usize)>) -> Self {
        let mut profiles = Self::builtin();
        for (name, max) in extra {
            profiles.max_tokens.insert(name.clone(), *max);
        }
        profiles
    }

    /// Context window for a deployment
    pub fn max_tokens(&self, deployment: &str) -> Result<usize> {
        self.max_tokens
            .get(deployment)
            .copied()
            .ok_or_else(|| AssistError::UnknownDeployment {
                deployment: deployment.to_string(),
            })
    }

    pub fn contains(&self, deployment: &str) -> bool {
        self.max_tokens.contains_key(deployment)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.max_tokens.keys().map(String::as_str)
    }
}

/// Azure deployment names: alphanumerics separated by single `_` or `-`
pub fn validate_azure_deployment_name(name: &str) -> Result<()> {
    if AZURE_DEPLOYMENT_NAME.is_match(name) {
        Ok(())
    } else {
        Err(AssistError::Config(format!(
            "azure openai deployment {:?} can only include alphanumeric characters, '_' and '-', \
             and can't end with '_' or '-'",
            name
        )))
    }
}
