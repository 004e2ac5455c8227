//! Scripted collaborators for workflow tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::approval::{DecisionSource, UserDecision};
use crate::ai::{
    BackendKind, BudgetCalculator, Candidates, CompletionBackend, CompletionDispatcher,
    CompletionRequest, DeploymentProfiles, TokenEncoder,
};
use crate::terraform::{Provisioner, ValidationGate};
use crate::types::{AssistError, Result, ValidationError};

struct WordEncoder;

impl TokenEncoder for WordEncoder {
    fn count(&self, text: &str) -> Result<usize> {
        Ok(text.split_whitespace().count())
    }
}

/// Dispatcher for `gpt-4-0314` counting one token per word
pub fn dispatcher(backend: Arc<ScriptedBackend>) -> CompletionDispatcher {
    let calculator = BudgetCalculator::new(Arc::new(DeploymentProfiles::builtin()))
        .with_encoder(Arc::new(WordEncoder));
    CompletionDispatcher::new(backend, calculator, "gpt-4-0314", 0.0)
}

/// Returns queued drafts in order and records every prompt it receives
pub struct ScriptedBackend {
    drafts: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
    delay: Option<Duration>,
    fail: bool,
}

impl ScriptedBackend {
    pub fn new(drafts: &[&str]) -> Self {
        Self {
            drafts: Mutex::new(drafts.iter().map(|d| d.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
            delay: None,
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(&[])
        }
    }

    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn completion(&self, request: &CompletionRequest) -> Result<Candidates> {
        self.chat_completion(request).await
    }

    async fn chat_completion(&self, request: &CompletionRequest) -> Result<Candidates> {
        self.prompts.lock().unwrap().push(request.prompt.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(AssistError::http_status("openai", 500, "server error"));
        }
        let draft = self.drafts.lock().unwrap().pop_front();
        Ok(Candidates(draft.into_iter().collect()))
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Primary
    }
}

/// Replays queued decisions; records presented drafts and reports
#[derive(Default)]
pub struct ScriptedDecisions {
    script: Mutex<VecDeque<UserDecision>>,
    presented: Mutex<Vec<String>>,
    invalid: Mutex<Vec<ValidationError>>,
}

impl ScriptedDecisions {
    pub fn new(script: Vec<UserDecision>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        }
    }

    pub fn presented(&self) -> Vec<String> {
        self.presented.lock().unwrap().clone()
    }

    pub fn reported_invalid(&self) -> Vec<ValidationError> {
        self.invalid.lock().unwrap().clone()
    }
}

#[async_trait]
impl DecisionSource for ScriptedDecisions {
    fn present(&self, draft: &str) {
        self.presented.lock().unwrap().push(draft.to_string());
    }

    fn report_invalid(&self, error: &ValidationError) {
        self.invalid.lock().unwrap().push(error.clone());
    }

    async fn decide(&self, _draft: &str, _cancel: &CancellationToken) -> Result<UserDecision> {
        Ok(self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(UserDecision::Abort))
    }
}

/// Ordered record of gate and provisioner calls shared between doubles
pub type EventLog = Arc<Mutex<Vec<&'static str>>>;

/// Rejects any text listed in `invalid`; records every check
#[derive(Default)]
pub struct RecordingGate {
    invalid: Vec<String>,
    checked: Mutex<Vec<String>>,
    events: EventLog,
}

impl RecordingGate {
    pub fn rejecting(invalid: &[&str]) -> Self {
        Self {
            invalid: invalid.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn with_events(mut self, events: EventLog) -> Self {
        self.events = events;
        self
    }

    pub fn checked(&self) -> Vec<String> {
        self.checked.lock().unwrap().clone()
    }
}

impl ValidationGate for RecordingGate {
    fn check(&self, text: &str) -> Result<()> {
        self.checked.lock().unwrap().push(text.to_string());
        self.events.lock().unwrap().push("check");
        if self.invalid.iter().any(|bad| bad == text) {
            return Err(ValidationError::from_message(format!("invalid: {text}")).into());
        }
        Ok(())
    }
}

/// Records provisioning calls in order
#[derive(Default)]
pub struct RecordingProvisioner {
    calls: Mutex<Vec<&'static str>>,
    events: EventLog,
}

impl RecordingProvisioner {
    pub fn with_events(mut self, events: EventLog) -> Self {
        self.events = events;
        self
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
        self.events.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provisioner for RecordingProvisioner {
    async fn init(&self, _cancel: &CancellationToken) -> Result<()> {
        self.record("init");
        Ok(())
    }

    async fn apply(&self, _cancel: &CancellationToken) -> Result<()> {
        self.record("apply");
        Ok(())
    }
}
