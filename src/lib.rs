//! terraform-assistant - Terraform Templates from Natural Language
//!
//! Turns a prompt into a Terraform configuration through the OpenAI or Azure
//! OpenAI completion API, asks the user to approve it, checks the HCL syntax,
//! writes it and runs `terraform init` (and optionally `apply`).
//!
//! ## Core Features
//!
//! - **Token Budget**: response size derived from the model's context window
//! - **Two Backends**: OpenAI and Azure OpenAI, chat or legacy completion
//! - **Approval Loop**: draft, review and retry with feedback, no retry limit
//! - **Cancellation**: Ctrl-C aborts in-flight requests without side effects
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use terraform_assistant::{ConfigLoader, CompletionDispatcher, Session, ProvisionPlan};
//! use terraform_assistant::ai::create_backend;
//! use terraform_assistant::terraform::{HclValidator, TerraformCli};
//! use terraform_assistant::workflow::AutoApprove;
//!
//! let config = ConfigLoader::load()?;
//! let dispatcher = CompletionDispatcher::from_config(&config, create_backend(&config)?);
//! let session = Session::new(
//!     dispatcher,
//!     Arc::new(AutoApprove),
//!     Arc::new(HclValidator::new()),
//!     Arc::new(TerraformCli::locate(None, ".")?),
//!     ".",
//!     "provide.tf",
//! );
//! let outcome = session.run("an S3 bucket", ProvisionPlan::Init, &cancel).await?;
//! ```
//!
//! ## Modules
//!
//! - [`ai`]: token budget, deployment table, completion backends, dispatcher
//! - [`workflow`]: approval loop and generation session
//! - [`terraform`]: HCL validation, template persistence, terraform runner
//! - [`config`]: layered configuration
//! - [`cli`]: terminal prompt and command handlers

pub mod ai;
pub mod cli;
pub mod config;
pub mod constants;
pub mod terraform;
pub mod types;
pub mod workflow;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{CliOverrides, Config, ConfigLoader};

// Error Types
pub use types::{AssistError, ErrorCategory, Result, ValidationError};

// =============================================================================
// AI Re-exports
// =============================================================================

pub use ai::{
    BudgetCalculator, CompletionBackend, CompletionDispatcher, DeploymentProfiles, PromptContext,
    RequestShape, TokenBudget,
};

// =============================================================================
// Workflow Re-exports
// =============================================================================

pub use terraform::{HclValidator, Provisioner, TerraformCli, ValidationGate};
pub use workflow::{
    ApprovalLoop, DecisionSource, LoopOutcome, ProvisionPlan, Session, SessionOutcome,
    UserDecision,
};
