//! AI Integration Layer
//!
//! Token budgeting and completion dispatch against the hosted LLM APIs.

pub mod budget;
pub mod deployment;
pub mod dispatcher;
pub mod prompt;
pub mod provider;
pub mod tokenizer;

pub use budget::{BudgetCalculator, TokenBudget};
pub use deployment::{DeploymentProfiles, RequestShape, validate_azure_deployment_name};
pub use dispatcher::CompletionDispatcher;
pub use prompt::PromptContext;
pub use provider::{
    AzureOpenAiBackend, BackendKind, Candidates, CompletionBackend, CompletionRequest,
    OpenAiBackend, SharedBackend, create_backend,
};
pub use tokenizer::{BpeEncoder, Encoding, TokenEncoder};
