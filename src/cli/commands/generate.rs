//! Init / Apply Commands
//!
//! Generate a template from a prompt, confirm it, write it, and run terraform.
//!
//! Usage:
//!   terraform-assistant init  "create an S3 bucket with versioning"
//!   terraform-assistant apply "create an S3 bucket with versioning"

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::ai::{CompletionDispatcher, DeploymentProfiles, create_backend};
use crate::cli::prompt::ConsoleDecisionSource;
use crate::cli::ui::Output;
use crate::config::{CliOverrides, Config, ConfigLoader};
use crate::terraform::{HclValidator, TerraformCli};
use crate::types::{AssistError, Result};
use crate::workflow::{ProvisionPlan, Session, SessionOutcome};

/// Options for `init` and `apply`
pub struct GenerateOptions {
    /// Prompt words, joined with spaces
    pub prompt: Vec<String>,
    pub plan: ProvisionPlan,
    pub overrides: CliOverrides,
}

/// Join the prompt words into the initial instruction
pub fn instruction(words: &[String]) -> Result<String> {
    let instruction = words.join(" ").trim().to_string();
    if instruction.is_empty() {
        return Err(AssistError::Config("Prompt must be provided".to_string()));
    }
    Ok(instruction)
}

pub async fn run(options: GenerateOptions) -> Result<SessionOutcome> {
    let instruction = instruction(&options.prompt)?;
    let config = ConfigLoader::load_with(&options.overrides)?;
    let session = build_session(&config)?;

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupt received");
            interrupt.cancel();
        }
    });

    info!(
        "Generating template with {} ({})",
        config.llm.deployment_name,
        if config.uses_azure() { "azure-openai" } else { "openai" }
    );
    let outcome = session.run(&instruction, options.plan, &cancel).await;
    watcher.abort();

    let output = Output::new();
    match &outcome {
        Ok(SessionOutcome::Provisioned { path, rounds }) => {
            output.success(&format!(
                "Wrote {} after {} draft(s) and ran terraform {}",
                path.display(),
                rounds,
                match options.plan {
                    ProvisionPlan::Init => "init",
                    ProvisionPlan::Apply => "init and apply",
                }
            ));
        }
        Ok(SessionOutcome::Aborted) => output.info("Aborted, nothing was written"),
        Err(_) => {}
    }

    outcome
}

/// Resolve every collaborator up front so configuration errors surface
/// before the first request
fn build_session(config: &Config) -> Result<Session> {
    let profiles = DeploymentProfiles::with_extra(&config.deployments);
    profiles.max_tokens(&config.llm.deployment_name)?;

    let backend = create_backend(config)?;
    let dispatcher = CompletionDispatcher::from_config(config, backend);

    let working_dir = match &config.terraform.working_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?,
    };
    if !working_dir.is_dir() {
        return Err(AssistError::Config(format!(
            "working directory does not exist: {}",
            working_dir.display()
        )));
    }

    let provisioner = TerraformCli::locate(config.terraform.exec_path.as_deref(), &working_dir)?;
    debug!("Using terraform at {}", provisioner.executable().display());

    let require_confirmation = config.interaction.require_confirmation;
    Ok(Session::new(
        dispatcher,
        Arc::new(ConsoleDecisionSource::new(require_confirmation)),
        Arc::new(HclValidator::new()),
        Arc::new(provisioner),
        working_dir,
        config.terraform.output_file.clone(),
    )
    .with_redraft_invalid(require_confirmation))
}
