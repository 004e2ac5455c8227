use console::style;

use crate::types::ValidationError;

pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", style("✓").green(), message);
    }

    pub fn warning(&self, message: &str) {
        println!("{} {}", style("⚠").yellow(), message);
    }

    pub fn info(&self, message: &str) {
        println!("{} {}", style("ℹ").blue(), message);
    }

    /// Generated template, framed so it stands apart from prompts
    pub fn draft(&self, template: &str) {
        println!(
            "\n{} {}",
            style("⚡").yellow(),
            style("Attempting to apply the following template:").bold()
        );
        println!("{}", framed(template));
    }

    pub fn validation(&self, error: &ValidationError) {
        self.warning("The template is not valid Terraform HCL:");
        for diagnostic in &error.diagnostics {
            println!("  {}", style(diagnostic).dim());
        }
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

fn framed(template: &str) -> String {
    let rule = "─".repeat(40);
    format!("{rule}\n{}\n{rule}", template.trim())
}
