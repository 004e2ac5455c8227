//! Completion Dispatcher
//!
//! Turns the prompt context into exactly one completion request:
//! budget check, request shape selection, cancellable send, candidate check.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::budget::BudgetCalculator;
use super::deployment::{DeploymentProfiles, RequestShape};
use super::prompt::PromptContext;
use super::provider::{CompletionRequest, SharedBackend};
use crate::config::Config;
use crate::constants::llm::SYSTEM_INSTRUCTION;
use crate::types::{AssistError, Result};

/// Sends the accumulated context to the configured backend
#[derive(Clone)]
pub struct CompletionDispatcher {
    backend: SharedBackend,
    calculator: BudgetCalculator,
    deployment: String,
    temperature: f32,
    max_tokens_override: Option<i64>,
}

impl CompletionDispatcher {
    pub fn new(
        backend: SharedBackend,
        calculator: BudgetCalculator,
        deployment: impl Into<String>,
        temperature: f32,
    ) -> Self {
        Self {
            backend,
            calculator,
            deployment: deployment.into(),
            temperature,
            max_tokens_override: None,
        }
    }

    /// Dispatcher wired from configuration
    pub fn from_config(config: &Config, backend: SharedBackend) -> Self {
        let profiles = Arc::new(DeploymentProfiles::with_extra(&config.deployments));
        let calculator = BudgetCalculator::new(profiles).with_overhead(config.llm.token_overhead);

        Self::new(
            backend,
            calculator,
            config.llm.deployment_name.clone(),
            config.llm.temperature,
        )
        .with_max_tokens_override(config.llm.max_tokens_override())
    }

    pub fn with_max_tokens_override(mut self, max_tokens: Option<i64>) -> Self {
        self.max_tokens_override = max_tokens;
        self
    }

    pub fn deployment(&self) -> &str {
        &self.deployment
    }

    /// Send one request for `context` and return the single candidate.
    ///
    /// Nothing is sent when the budget is not positive. Cancelling `cancel`
    /// drops the in-flight request and returns [`AssistError::Cancelled`].
    pub async fn dispatch(
        &self,
        context: &PromptContext,
        cancel: &CancellationToken,
    ) -> Result<String> {
        if cancel.is_cancelled() {
            return Err(AssistError::Cancelled);
        }

        let budget = self.calculator.compute(
            context.fragments(),
            &self.deployment,
            self.max_tokens_override,
        )?;
        if !budget.is_usable() {
            return Err(AssistError::BudgetExhausted {
                deployment: self.deployment.clone(),
                budget: budget.remaining,
                max_tokens: budget.max_tokens,
                prompt_tokens: budget.prompt_tokens,
            });
        }

        let shape = RequestShape::classify(&self.deployment);
        let request = CompletionRequest {
            model: self.deployment.clone(),
            prompt: context.render(SYSTEM_INSTRUCTION),
            max_tokens: u32::try_from(budget.remaining).unwrap_or(u32::MAX),
            temperature: self.temperature,
        };

        info!(
            "Dispatching {} request to {} ({} fragment(s), max_tokens {})",
            shape,
            self.backend.kind(),
            context.len(),
            request.max_tokens
        );

        let call = async {
            match shape {
                RequestShape::Chat => self.backend.chat_completion(&request).await,
                RequestShape::Completion => self.backend.completion(&request).await,
            }
        };

        let candidates = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Completion request cancelled");
                return Err(AssistError::Cancelled);
            }
            result = call => result?,
        };

        candidates.into_single()
    }
}
