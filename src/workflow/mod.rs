//! Generation Workflow
//!
//! - `approval`: draft / confirm / retry state machine
//! - `session`: approval followed by validation, persistence and provisioning

pub mod approval;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use approval::{ApprovalLoop, AutoApprove, DecisionSource, LoopOutcome, LoopState, UserDecision};
pub use session::{ProvisionPlan, Session, SessionOutcome};
