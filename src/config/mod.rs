//! Configuration Management
//!
//! Unified configuration system with hierarchical resolution:
//! 1. Built-in defaults
//! 2. Global config (<config dir>/terraform-assistant/config.toml)
//! 3. Project config (.terraform-assistant.toml)
//! 4. Legacy environment variables (OPENAI_API_KEY, ...)
//! 5. Prefixed environment variables (TFASSIST_*)
//! 6. CLI arguments (highest priority)

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::*;
