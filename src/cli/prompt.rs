//! Terminal Decision Prompt
//!
//! Shows each draft and asks `Would you like to apply this? [Reprompt, Apply, Dont Apply]`.
//! Anything that is not one of the choices is taken as extra instructions.

use async_trait::async_trait;
use console::Term;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::ui::Output;
use crate::types::{AssistError, Result, ValidationError};
use crate::workflow::{DecisionSource, UserDecision};

const QUESTION: &str = "Would you like to apply this? [Reprompt, Apply, Dont Apply]";
const FEEDBACK_QUESTION: &str = "Extra instructions (leave empty to just try again)";

/// One line typed at the decision prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptInput {
    Apply,
    DontApply,
    Reprompt,
    Feedback(String),
    Empty,
}

impl PromptInput {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "" => Self::Empty,
            "a" | "apply" | "y" | "yes" => Self::Apply,
            "d" | "dont apply" | "don't apply" | "n" | "no" | "q" | "quit" => Self::DontApply,
            "r" | "reprompt" => Self::Reprompt,
            _ => Self::Feedback(trimmed.to_string()),
        }
    }
}

/// Asks on the terminal; with confirmation off, shows drafts and accepts
pub struct ConsoleDecisionSource {
    output: Output,
    require_confirmation: bool,
}

impl ConsoleDecisionSource {
    pub fn new(require_confirmation: bool) -> Self {
        Self {
            output: Output::new(),
            require_confirmation,
        }
    }

    async fn read_line(question: &'static str, cancel: &CancellationToken) -> Result<Option<String>> {
        let read = tokio::task::spawn_blocking(move || {
            let term = Term::stdout();
            term.write_str(&format!("{} {}: ", console::style("?").cyan(), question))?;
            let line = term.read_line()?;
            // Without a terminal read_line yields "", which ends the prompt
            Ok::<_, std::io::Error>((!line.is_empty() || term.is_term()).then_some(line))
        });

        tokio::select! {
            _ = cancel.cancelled() => Err(AssistError::Cancelled),
            joined = read => joined
                .map_err(|e| AssistError::Io(std::io::Error::other(e)))?
                .map_err(AssistError::from),
        }
    }
}

#[async_trait]
impl DecisionSource for ConsoleDecisionSource {
    fn present(&self, draft: &str) {
        self.output.draft(draft);
    }

    fn report_invalid(&self, error: &ValidationError) {
        self.output.validation(error);
        self.output.info("Drafting a corrected template...");
    }

    async fn decide(&self, _draft: &str, cancel: &CancellationToken) -> Result<UserDecision> {
        if !self.require_confirmation {
            return Ok(UserDecision::Accept);
        }

        loop {
            let Some(line) = Self::read_line(QUESTION, cancel).await? else {
                debug!("End of input at decision prompt");
                return Ok(UserDecision::Abort);
            };

            match PromptInput::parse(&line) {
                PromptInput::Apply => return Ok(UserDecision::Accept),
                PromptInput::DontApply => return Ok(UserDecision::Abort),
                PromptInput::Feedback(feedback) => return Ok(UserDecision::Retry(Some(feedback))),
                PromptInput::Reprompt => {
                    let feedback = Self::read_line(FEEDBACK_QUESTION, cancel)
                        .await?
                        .map(|f| f.trim().to_string())
                        .filter(|f| !f.is_empty());
                    return Ok(UserDecision::Retry(feedback));
                }
                PromptInput::Empty => continue,
            }
        }
    }
}
