//! Approval Loop
//!
//! Draft, show, ask. Repeats until the user accepts or aborts; there is no
//! retry limit.
//!
//! ```text
//! Drafting ──► AwaitingApproval ──► Accepted
//!    ▲                │
//!    └──── Retry ─────┤
//!                     └──────────► Aborted
//! ```

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::ai::{CompletionDispatcher, PromptContext};
use crate::constants::llm::REJECTION_MARKER;
use crate::types::{AssistError, Result, ValidationError};

/// What the user wants done with a draft
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserDecision {
    Accept,
    /// Draft again, optionally with extra instructions
    Retry(Option<String>),
    Abort,
}

/// Where approval decisions come from (terminal prompt, tests, auto-approve)
#[async_trait]
pub trait DecisionSource: Send + Sync {
    /// Show a fresh draft to the user
    fn present(&self, _draft: &str) {}

    /// Tell the user an accepted draft failed the syntax check
    fn report_invalid(&self, _error: &ValidationError) {}

    /// Ask what to do with `draft`. Returning `Cancelled` aborts the loop.
    async fn decide(&self, draft: &str, cancel: &CancellationToken) -> Result<UserDecision>;
}

/// Accepts every draft without asking
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApprove;

#[async_trait]
impl DecisionSource for AutoApprove {
    async fn decide(&self, _draft: &str, _cancel: &CancellationToken) -> Result<UserDecision> {
        Ok(UserDecision::Accept)
    }
}

/// Loop state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopState {
    Drafting,
    AwaitingApproval(String),
    Accepted(String),
    Aborted,
}

/// Terminal result of [`ApprovalLoop::run`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopOutcome {
    Accepted(String),
    Aborted,
}

/// Drives drafts through the dispatcher until a decision is final.
///
/// Owns the prompt context for the whole session; every draft and every
/// piece of feedback is appended in order.
pub struct ApprovalLoop<'a> {
    dispatcher: &'a CompletionDispatcher,
    decisions: &'a dyn DecisionSource,
    context: PromptContext,
    state: LoopState,
    rounds: usize,
}

impl<'a> ApprovalLoop<'a> {
    pub fn new(
        dispatcher: &'a CompletionDispatcher,
        decisions: &'a dyn DecisionSource,
        instruction: impl Into<String>,
    ) -> Self {
        Self {
            dispatcher,
            decisions,
            context: PromptContext::new(instruction),
            state: LoopState::Drafting,
            rounds: 0,
        }
    }

    pub fn context(&self) -> &PromptContext {
        &self.context
    }

    pub fn state(&self) -> &LoopState {
        &self.state
    }

    /// Number of drafts requested so far
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Run until `Accepted` or `Aborted`.
    ///
    /// Cancellation ends the loop as `Aborted`. Any other dispatch or prompt
    /// failure is returned as-is.
    pub async fn run(&mut self, cancel: &CancellationToken) -> Result<LoopOutcome> {
        loop {
            let state = std::mem::replace(&mut self.state, LoopState::Aborted);
            self.state = match state {
                LoopState::Drafting => match self.draft(cancel).await {
                    Ok(draft) => LoopState::AwaitingApproval(draft),
                    Err(AssistError::Cancelled) => LoopState::Aborted,
                    Err(e) => {
                        self.state = LoopState::Drafting;
                        return Err(e);
                    }
                },
                LoopState::AwaitingApproval(draft) => {
                    match self.decisions.decide(&draft, cancel).await {
                        Ok(UserDecision::Accept) => LoopState::Accepted(draft),
                        Ok(UserDecision::Retry(feedback)) => {
                            self.push_feedback(feedback);
                            LoopState::Drafting
                        }
                        Ok(UserDecision::Abort) | Err(AssistError::Cancelled) => LoopState::Aborted,
                        Err(e) => {
                            self.state = LoopState::AwaitingApproval(draft);
                            return Err(e);
                        }
                    }
                }
                LoopState::Accepted(draft) => {
                    info!("Draft accepted after {} round(s)", self.rounds);
                    self.state = LoopState::Accepted(draft.clone());
                    return Ok(LoopOutcome::Accepted(draft));
                }
                LoopState::Aborted => {
                    info!("Approval loop aborted after {} round(s)", self.rounds);
                    return Ok(LoopOutcome::Aborted);
                }
            };
        }
    }

    /// Send an accepted draft back for another round with `feedback`
    pub fn redraft(&mut self, feedback: impl Into<String>) {
        self.push_feedback(Some(feedback.into()));
        self.state = LoopState::Drafting;
    }

    async fn draft(&mut self, cancel: &CancellationToken) -> Result<String> {
        self.rounds += 1;
        debug!("Drafting round {} with {}", self.rounds, self.context);

        let draft = self.dispatcher.dispatch(&self.context, cancel).await?;
        self.context.push(draft.clone());
        self.decisions.present(&draft);
        Ok(draft)
    }

    fn push_feedback(&mut self, feedback: Option<String>) {
        match feedback.map(|f| f.trim().to_string()).filter(|f| !f.is_empty()) {
            Some(feedback) => self.context.push(feedback),
            None => self.context.push(REJECTION_MARKER),
        }
    }
}
