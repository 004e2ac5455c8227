//! Config Command
//!
//! Manage terraform-assistant configuration.
//!
//! Usage:
//!   terraform-assistant config show [-f json|yaml]
//!   terraform-assistant config path
//!   terraform-assistant config init [-g] [--force]

use crate::cli::ui::Output;
use crate::config::{CliOverrides, ConfigLoader};
use crate::types::Result;

/// Show the effective configuration (API key omitted)
pub fn show(overrides: &CliOverrides, format: &str) -> Result<()> {
    let config = ConfigLoader::load_with(overrides)?;
    let rendered = ConfigLoader::render(&config, format)?;
    println!("{}", rendered.trim_end());
    Ok(())
}

/// Show configuration paths
pub fn path() -> Result<()> {
    ConfigLoader::show_path();
    Ok(())
}

/// Write a default config file
pub fn init(global: bool, force: bool) -> Result<()> {
    let path = if global {
        ConfigLoader::init_global(force)?
    } else {
        ConfigLoader::init_project(force)?
    };

    Output::new().success(&format!(
        "Initialized {} configuration",
        if global { "global" } else { "project" }
    ));
    println!("  Config: {}", path.display());
    Ok(())
}
