//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Built once at startup and passed by reference; nothing mutates it afterwards.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::constants::{budget, llm, network, terraform};
use crate::types::{AssistError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Completion API settings
    pub llm: LlmConfig,

    /// Terraform binary and output settings
    pub terraform: TerraformConfig,

    /// User interaction settings
    pub interaction: InteractionConfig,

    /// Extra deployment -> max context tokens entries
    pub deployments: BTreeMap<String, usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            terraform: TerraformConfig::default(),
            interaction: InteractionConfig::default(),
            deployments: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `AssistError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.llm.temperature) {
            return Err(AssistError::Config(format!(
                "temperature must be between 0.0 and 1.0, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.timeout_secs == 0 {
            return Err(AssistError::Config(
                "llm timeout_secs must be greater than 0".to_string(),
            ));
        }

        let output = &self.terraform.output_file;
        if !output.ends_with(".tf") || output.contains(['/', '\\']) {
            return Err(AssistError::Config(format!(
                "output_file must be a bare file name ending in .tf, got {:?}",
                output
            )));
        }

        if let Some((name, _)) = self.deployments.iter().find(|(_, max)| **max == 0) {
            return Err(AssistError::Config(format!(
                "deployment {:?} must declare a max token count greater than 0",
                name
            )));
        }

        Ok(())
    }

    /// Whether requests go to the Azure-hosted backend
    pub fn uses_azure(&self) -> bool {
        self.llm
            .azure_endpoint
            .as_deref()
            .is_some_and(|endpoint| !endpoint.trim().is_empty())
    }
}

// =============================================================================
// LLM Configuration
// =============================================================================

/// Completion API configuration
///
/// The API key is never serialized and is redacted in debug output.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Model (OpenAI) or deployment (Azure) name
    pub deployment_name: String,
    /// API key for either backend
    #[serde(skip_serializing)]
    pub api_key: Option<SecretString>,
    /// Azure OpenAI endpoint; switches requests to the Azure backend when set
    pub azure_endpoint: Option<String>,
    /// Azure REST API version
    pub api_version: String,
    /// Sampling temperature (0.0 - 1.0)
    pub temperature: f32,
    /// Replaces the table's max token count when greater than 0
    pub max_tokens: i64,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Tokens reserved on top of the encoded prompt
    pub token_overhead: usize,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("deployment_name", &self.deployment_name)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("azure_endpoint", &self.azure_endpoint)
            .field("api_version", &self.api_version)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .field("token_overhead", &self.token_overhead)
            .finish()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            deployment_name: llm::DEFAULT_DEPLOYMENT.to_string(),
            api_key: None,
            azure_endpoint: None,
            api_version: network::AZURE_API_VERSION.to_string(),
            temperature: llm::DEFAULT_TEMPERATURE,
            max_tokens: 0,
            timeout_secs: network::DEFAULT_TIMEOUT_SECS,
            token_overhead: budget::DEFAULT_TOKEN_OVERHEAD,
        }
    }
}

impl LlmConfig {
    /// Max token override, if one is in effect
    pub fn max_tokens_override(&self) -> Option<i64> {
        (self.max_tokens > 0).then_some(self.max_tokens)
    }
}

// =============================================================================
// Terraform Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerraformConfig {
    /// Directory terraform runs in (defaults to the current directory)
    pub working_dir: Option<PathBuf>,
    /// Path to the terraform executable (defaults to PATH lookup)
    pub exec_path: Option<PathBuf>,
    /// File name the accepted template is written to
    pub output_file: String,
}

impl Default for TerraformConfig {
    fn default() -> Self {
        Self {
            working_dir: None,
            exec_path: None,
            output_file: terraform::DEFAULT_OUTPUT_FILE.to_string(),
        }
    }
}

// =============================================================================
// Interaction Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Ask before applying each draft
    pub require_confirmation: bool,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            require_confirmation: true,
        }
    }
}

// =============================================================================
// Command-line Overrides
// =============================================================================

/// Values supplied on the command line; only `Some` fields override
#[derive(Clone, Default)]
pub struct CliOverrides {
    pub deployment_name: Option<String>,
    pub api_key: Option<String>,
    pub azure_endpoint: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<i64>,
    pub require_confirmation: Option<bool>,
    pub working_dir: Option<PathBuf>,
    pub exec_path: Option<PathBuf>,
}

impl CliOverrides {
    /// Nested layout matching `Config`, for merging with figment
    pub(crate) fn to_layer(&self) -> serde_json::Value {
        let mut llm = serde_json::Map::new();
        let mut terraform = serde_json::Map::new();
        let mut interaction = serde_json::Map::new();

        if let Some(v) = &self.deployment_name {
            llm.insert("deployment_name".into(), v.clone().into());
        }
        if let Some(v) = &self.api_key {
            llm.insert("api_key".into(), v.clone().into());
        }
        if let Some(v) = &self.azure_endpoint {
            llm.insert("azure_endpoint".into(), v.clone().into());
        }
        if let Some(v) = self.temperature {
            llm.insert("temperature".into(), serde_json::json!(v));
        }
        if let Some(v) = self.max_tokens {
            llm.insert("max_tokens".into(), v.into());
        }
        if let Some(v) = self.require_confirmation {
            interaction.insert("require_confirmation".into(), v.into());
        }
        if let Some(v) = &self.working_dir {
            terraform.insert("working_dir".into(), v.to_string_lossy().into_owned().into());
        }
        if let Some(v) = &self.exec_path {
            terraform.insert("exec_path".into(), v.to_string_lossy().into_owned().into());
        }

        let mut root = serde_json::Map::new();
        for (key, section) in [
            ("llm", llm),
            ("terraform", terraform),
            ("interaction", interaction),
        ] {
            if !section.is_empty() {
                root.insert(key.into(), serde_json::Value::Object(section));
            }
        }
        serde_json::Value::Object(root)
    }
}
