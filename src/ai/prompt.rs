//! Prompt Context
//!
//! Append-only conversation context accumulated across drafting rounds.

use std::fmt;

/// Ordered prompt fragments: the instruction, prior drafts, and feedback.
///
/// Fragments are only ever appended; their order is the conversation the
/// model sees on the next round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptContext {
    fragments: Vec<String>,
}

impl PromptContext {
    /// Start a context from the user's instruction
    pub fn new(instruction: impl Into<String>) -> Self {
        Self {
            fragments: vec![instruction.into()],
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn push(&mut self, fragment: impl Into<String>) {
        self.fragments.push(fragment.into());
    }

    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Request payload: `preamble` followed by every fragment on its own line
    pub fn render(&self, preamble: &str) -> String {
        let capacity = preamble.len() + self.fragments.iter().map(|f| f.len() + 1).sum::<usize>();
        let mut payload = String::with_capacity(capacity + 1);
        payload.push_str(preamble);
        payload.push('\n');
        for fragment in &self.fragments {
            payload.push_str(fragment);
            payload.push('\n');
        }
        payload
    }
}

impl fmt::Display for PromptContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} fragment(s)", self.fragments.len())
    }
}
