//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (<config dir>/terraform-assistant/config.toml)
//! 3. Project config (.terraform-assistant.toml)
//! 4. Legacy environment variables (OPENAI_API_KEY, AZURE_OPENAI_ENDPOINT, ...)
//! 5. Prefixed environment variables (TFASSIST_LLM__DEPLOYMENT_NAME -> llm.deployment_name)
//! 6. Command-line overrides

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
    value::Uncased,
};
use secrecy::ExposeSecret;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::{CliOverrides, Config};
use crate::types::{AssistError, Result};

/// Project-level config file, looked up in the current directory
const PROJECT_CONFIG_FILE: &str = ".terraform-assistant.toml";

/// Prefix for structured environment overrides
const ENV_PREFIX: &str = "TFASSIST_";

/// Environment variables understood for compatibility with earlier releases
const LEGACY_ENV: &[(&str, &str)] = &[
    ("OPENAI_DEPLOYMENT_NAME", "llm.deployment_name"),
    ("OPENAI_API_KEY", "llm.api_key"),
    ("AZURE_OPENAI_ENDPOINT", "llm.azure_endpoint"),
    ("TEMPERATURE", "llm.temperature"),
    ("MAX_TOKENS", "llm.max_tokens"),
    ("REQUIRE_CONFIRMATION", "interaction.require_confirmation"),
    ("WORKING_DIR", "terraform.working_dir"),
    ("EXEC_DIR", "terraform.exec_path"),
];

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain and no CLI overrides
    pub fn load() -> Result<Config> {
        Self::load_with(&CliOverrides::default())
    }

    /// Load configuration with full resolution chain using Figment:
    /// defaults → global → project → env vars → CLI
    pub fn load_with(overrides: &CliOverrides) -> Result<Config> {
        let figment = Self::figment(
            Self::global_config_path().as_deref(),
            &Self::project_config_path(),
        )
        .merge(Serialized::defaults(overrides.to_layer()));

        Self::extract(figment)
    }

    /// Load configuration from a specific file only
    pub fn load_from_file(path: &Path) -> Result<Config> {
        Self::extract(
            Figment::new()
                .merge(Serialized::defaults(Config::default()))
                .merge(Toml::file(path)),
        )
    }

    /// Figment for the file and environment layers
    fn figment(global_path: Option<&Path>, project_path: &Path) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = global_path
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(global_path));
        }

        if project_path.exists() {
            debug!("Loading project config from: {}", project_path.display());
            figment = figment.merge(Toml::file(project_path));
        }

        figment
            .merge(Self::legacy_env())
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Map the unprefixed variables onto their config keys
    fn legacy_env() -> Env {
        Env::raw().filter_map(|key| {
            let upper = key.as_str().to_ascii_uppercase();
            LEGACY_ENV
                .iter()
                .find(|(name, _)| *name == upper)
                .map(|(_, path)| Uncased::from(*path))
        })
    }

    fn extract(figment: Figment) -> Result<Config> {
        let mut config: Config = figment
            .extract()
            .map_err(|e| AssistError::Config(format!("Configuration error: {}", e)))?;

        config.normalize();
        config.validate()?;

        Ok(config)
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Get path to global config directory
    pub fn global_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "terraform-assistant").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get path to global config file
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join("config.toml"))
    }

    /// Get path to project config file
    pub fn project_config_path() -> PathBuf {
        PathBuf::from(PROJECT_CONFIG_FILE)
    }

    // =========================================================================
    // Config Commands
    // =========================================================================

    /// Show config file paths
    pub fn show_path() {
        println!("Configuration paths:");
        println!();

        if let Some(global) = Self::global_config_path() {
            let exists = if global.exists() { "✓" } else { "✗" };
            println!("  Global:  {} {}", exists, global.display());
        } else {
            println!("  Global:  (not available)");
        }

        let project = Self::project_config_path();
        let exists = if project.exists() { "✓" } else { "✗" };
        println!("  Project: {} {}", exists, project.display());
    }

    /// Render the effective configuration (text = TOML, json, yaml)
    pub fn render(config: &Config, format: &str) -> Result<String> {
        match format {
            "json" => Ok(serde_json::to_string_pretty(config)?),
            "yaml" => Ok(serde_yaml::to_string(config)?),
            _ => toml::to_string_pretty(config).map_err(|e| AssistError::Config(e.to_string())),
        }
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Write the default config to the global config directory
    pub fn init_global(force: bool) -> Result<PathBuf> {
        let global_dir = Self::global_dir().ok_or_else(|| {
            AssistError::Config("Cannot determine global config directory".to_string())
        })?;
        fs::create_dir_all(&global_dir)?;

        let config_path = global_dir.join("config.toml");
        Self::write_default(&config_path, force)?;
        Ok(config_path)
    }

    /// Write the default config to the current directory
    pub fn init_project(force: bool) -> Result<PathBuf> {
        let config_path = Self::project_config_path();
        Self::write_default(&config_path, force)?;
        Ok(config_path)
    }

    fn write_default(path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            info!("Config exists: {}", path.display());
            return Ok(());
        }
        fs::write(path, Self::default_config())?;
        info!("Created config: {}", path.display());
        Ok(())
    }

    /// Default config file content (TOML)
    fn default_config() -> String {
        r#"# terraform-assistant configuration
# Environment variables (OPENAI_API_KEY, TFASSIST_LLM__TEMPERATURE, ...) and
# command-line flags override these values.

[llm]
deployment_name = "text-davinci-003"
# azure_endpoint = "https://<resource>.openai.azure.com"
api_version = "2023-03-15-preview"
temperature = 0.0
# Replaces the model's context size when greater than 0
max_tokens = 0
timeout_secs = 30
token_overhead = 100

[terraform]
output_file = "provide.tf"
# working_dir = "."
# exec_path = "/usr/local/bin/terraform"

[interaction]
require_confirmation = true

# Extra deployments and their context window size
[deployments]
# "gpt-4-32k" = 32768
"#
        .to_string()
    }
}

impl Config {
    /// Treat blank optional strings (e.g. `AZURE_OPENAI_ENDPOINT=""`) as unset
    fn normalize(&mut self) {
        let blank = |s: &String| s.trim().is_empty();
        if self
            .llm
            .api_key
            .as_ref()
            .is_some_and(|key| key.expose_secret().trim().is_empty())
        {
            self.llm.api_key = None;
        }
        if self.llm.azure_endpoint.as_ref().is_some_and(blank) {
            self.llm.azure_endpoint = None;
        }
        if self
            .terraform
            .working_dir
            .as_ref()
            .is_some_and(|p| p.as_os_str().is_empty())
        {
            self.terraform.working_dir = None;
        }
        if self
            .terraform
            .exec_path
            .as_ref()
            .is_some_and(|p| p.as_os_str().is_empty())
        {
            self.terraform.exec_path = None;
        }
    }
}
