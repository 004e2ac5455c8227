pub mod commands;
pub mod prompt;
pub mod ui;

pub use prompt::{ConsoleDecisionSource, PromptInput};
pub use ui::Output;
