//! Generation Session
//!
//! One `init` / `apply` invocation: approval loop, syntax check, write the
//! template, then run terraform. Nothing is written or run unless the
//! accepted draft passes the syntax check.

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::approval::{ApprovalLoop, DecisionSource, LoopOutcome};
use crate::ai::CompletionDispatcher;
use crate::constants::llm::INVALID_TEMPLATE_PREFIX;
use crate::terraform::{Provisioner, ValidationGate, store_template};
use crate::types::{AssistError, Result};

/// Provisioning steps run after the template is written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionPlan {
    /// `terraform init`
    Init,
    /// `terraform init` then `terraform apply`
    Apply,
}

/// How a session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Template written and provisioning finished
    Provisioned { path: PathBuf, rounds: usize },
    /// User declined or interrupted
    Aborted,
}

/// Wires the approval loop to the validation, persistence and provisioning steps
pub struct Session {
    dispatcher: CompletionDispatcher,
    decisions: Arc<dyn DecisionSource>,
    gate: Arc<dyn ValidationGate>,
    provisioner: Arc<dyn Provisioner>,
    working_dir: PathBuf,
    output_file: String,
    /// Invalid drafts go back to drafting instead of failing
    redraft_invalid: bool,
}

impl Session {
    pub fn new(
        dispatcher: CompletionDispatcher,
        decisions: Arc<dyn DecisionSource>,
        gate: Arc<dyn ValidationGate>,
        provisioner: Arc<dyn Provisioner>,
        working_dir: impl Into<PathBuf>,
        output_file: impl Into<String>,
    ) -> Self {
        Self {
            dispatcher,
            decisions,
            gate,
            provisioner,
            working_dir: working_dir.into(),
            output_file: output_file.into(),
            redraft_invalid: true,
        }
    }

    pub fn with_redraft_invalid(mut self, redraft: bool) -> Self {
        self.redraft_invalid = redraft;
        self
    }

    pub async fn run(
        &self,
        instruction: &str,
        plan: ProvisionPlan,
        cancel: &CancellationToken,
    ) -> Result<SessionOutcome> {
        let mut approval = ApprovalLoop::new(&self.dispatcher, self.decisions.as_ref(), instruction);

        let template = loop {
            let draft = match approval.run(cancel).await? {
                LoopOutcome::Accepted(draft) => draft,
                LoopOutcome::Aborted => return Ok(SessionOutcome::Aborted),
            };

            match self.gate.check(&draft) {
                Ok(()) => break draft,
                Err(AssistError::Validation(invalid)) if self.redraft_invalid => {
                    warn!("Accepted draft is not valid HCL, drafting again");
                    self.decisions.report_invalid(&invalid);
                    approval.redraft(format!("{}\n{}", INVALID_TEMPLATE_PREFIX, invalid.summary()));
                }
                Err(e) => return Err(e),
            }
        };

        if cancel.is_cancelled() {
            return Ok(SessionOutcome::Aborted);
        }

        let path = store_template(&self.working_dir, &self.output_file, &template)?;

        let provisioned = match plan {
            ProvisionPlan::Init => self.provisioner.init(cancel).await,
            ProvisionPlan::Apply => match self.provisioner.init(cancel).await {
                Ok(()) => self.provisioner.apply(cancel).await,
                Err(e) => Err(e),
            },
        };

        match provisioned {
            Ok(()) => {
                info!("Provisioning finished for {}", path.display());
                Ok(SessionOutcome::Provisioned {
                    path,
                    rounds: approval.rounds(),
                })
            }
            Err(AssistError::Cancelled) => Ok(SessionOutcome::Aborted),
            Err(e) => Err(e),
        }
    }
}
