//! HCL syntax check run on every accepted draft before it is written.

use tracing::{debug, warn};

use crate::types::{Result, ValidationError};

/// Syntax checker for generated templates
pub trait ValidationGate: Send + Sync {
    /// Fails with [`AssistError::Validation`](crate::types::AssistError::Validation)
    /// carrying at least one diagnostic
    fn check(&self, text: &str) -> Result<()>;
}

/// Parses the template with `hcl-rs`
#[derive(Debug, Clone, Copy, Default)]
pub struct HclValidator;

impl HclValidator {
    pub fn new() -> Self {
        Self
    }
}

impl ValidationGate for HclValidator {
    fn check(&self, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Err(ValidationError::from_message("template is empty").into());
        }

        match hcl::parse(text) {
            Ok(body) => {
                debug!("Template parsed: {} top-level structure(s)", body.into_iter().count());
                Ok(())
            }
            Err(e) => {
                let diagnostics: Vec<String> = e
                    .to_string()
                    .lines()
                    .map(str::trim_end)
                    .filter(|line| !line.trim().is_empty())
                    .map(String::from)
                    .collect();
                warn!("Template failed HCL validation: {}", diagnostics.join("; "));

                if diagnostics.is_empty() {
                    Err(ValidationError::from_message("template is not valid HCL").into())
                } else {
                    Err(ValidationError::new(diagnostics).into())
                }
            }
        }
    }
}
