//! Terraform Integration
//!
//! Everything that happens after a draft is accepted: syntax check,
//! writing the template, and running the terraform binary.

pub mod artifact;
pub mod runner;
pub mod validator;

pub use artifact::store_template;
pub use runner::{Provisioner, TerraformCli, locate_terraform};
pub use validator::{HclValidator, ValidationGate};
