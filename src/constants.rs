//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Token budget constants
pub mod budget {
    /// Tokens reserved on top of the encoded prompt.
    ///
    /// BPE counts drift by a few tokens from what the API bills, so the
    /// remaining budget is always reduced by this margin.
    pub const DEFAULT_TOKEN_OVERHEAD: usize = 100;
}

/// Completion API constants
pub mod llm {
    /// Deployment used when none is configured
    pub const DEFAULT_DEPLOYMENT: &str = "text-davinci-003";

    /// Default sampling temperature (deterministic output)
    pub const DEFAULT_TEMPERATURE: f32 = 0.0;

    /// Candidates requested per call; the response must carry exactly this many
    pub const CANDIDATE_COUNT: u32 = 1;

    /// Instruction prepended to every payload
    pub const SYSTEM_INSTRUCTION: &str =
        "You are a Terraform HCL generator, only generate valid provider Terraform HCL templates.";

    /// Fragment appended to the context when a draft is rejected without feedback
    pub const REJECTION_MARKER: &str =
        "The previous template was rejected. Generate a different valid Terraform HCL template.";

    /// Fragment prefix used when an accepted draft fails the syntax check
    pub const INVALID_TEMPLATE_PREFIX: &str =
        "The previous template is not valid Terraform HCL. Fix these errors:";

    /// Role used for the single chat message
    pub const USER_ROLE: &str = "user";
}

/// Network constants
pub mod network {
    /// OpenAI API base URL
    pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

    /// Azure OpenAI REST API version
    pub const AZURE_API_VERSION: &str = "2023-03-15-preview";

    /// User agent sent to the completion API
    pub const USER_AGENT: &str = concat!("terraform-assistant/", env!("CARGO_PKG_VERSION"));

    /// Per-request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
}

/// Terraform constants
pub mod terraform {
    /// Binary looked up on PATH when no executable is configured
    pub const BINARY_NAME: &str = "terraform";

    /// File the accepted template is written to
    pub const DEFAULT_OUTPUT_FILE: &str = "provide.tf";

    /// Spinner tick interval (milliseconds)
    pub const SPINNER_TICK_MS: u64 = 100;
}
