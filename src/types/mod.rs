pub mod error;

pub use error::{AssistError, ErrorCategory, Result, ValidationError};
