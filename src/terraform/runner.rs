//! Terraform CLI Runner
//!
//! Runs `terraform init` / `terraform apply` in the working directory under a
//! spinner. The child is killed when the cancellation token fires.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::constants::terraform::{BINARY_NAME, SPINNER_TICK_MS};
use crate::types::{AssistError, Result};

/// Provisioning operations run after a template is written
#[async_trait]
pub trait Provisioner: Send + Sync {
    async fn init(&self, cancel: &CancellationToken) -> Result<()>;

    async fn apply(&self, cancel: &CancellationToken) -> Result<()>;
}

/// Invokes the `terraform` executable
#[derive(Debug, Clone)]
pub struct TerraformCli {
    executable: PathBuf,
    working_dir: PathBuf,
    show_spinner: bool,
}

impl TerraformCli {
    pub fn new(executable: impl Into<PathBuf>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            working_dir: working_dir.into(),
            show_spinner: true,
        }
    }

    /// Resolve the executable: the configured path, or `terraform` on `PATH`
    pub fn locate(exec_path: Option<&Path>, working_dir: impl Into<PathBuf>) -> Result<Self> {
        let executable = match exec_path {
            Some(path) if path.is_dir() => path.join(BINARY_NAME),
            Some(path) => path.to_path_buf(),
            None => locate_terraform().ok_or_else(|| {
                AssistError::Config(format!(
                    "{} executable not found on PATH; set terraform.exec_path",
                    BINARY_NAME
                ))
            })?,
        };

        if !executable.is_file() {
            return Err(AssistError::Config(format!(
                "terraform executable not found at {}",
                executable.display()
            )));
        }

        Ok(Self::new(executable, working_dir))
    }

    pub fn without_spinner(mut self) -> Self {
        self.show_spinner = false;
        self
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    async fn run(&self, operation: &str, args: &[&str], cancel: &CancellationToken) -> Result<()> {
        let start_time = Instant::now();
        debug!(
            "Running {} {} in {}",
            self.executable.display(),
            args.join(" "),
            self.working_dir.display()
        );

        let child = Command::new(&self.executable)
            .args(args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                AssistError::provisioning(
                    operation,
                    format!("failed to start {}: {}", self.executable.display(), e),
                )
            })?;

        let spinner = self.spinner(operation);

        // Dropping the wait future drops the child, which kills it
        let output = tokio::select! {
            _ = cancel.cancelled() => {
                spinner.finish_and_clear();
                debug!("terraform {} cancelled", operation);
                return Err(AssistError::Cancelled);
            }
            output = child.wait_with_output() => output,
        };
        spinner.finish_and_clear();

        let output = output.map_err(|e| AssistError::provisioning(operation, e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = if stderr.trim().is_empty() {
                format!("process exited with {}", output.status)
            } else {
                stderr.trim().to_string()
            };
            return Err(AssistError::provisioning(operation, message));
        }

        info!(
            "terraform {} completed in {:?}",
            operation,
            start_time.elapsed()
        );
        Ok(())
    }

    fn spinner(&self, operation: &str) -> ProgressBar {
        if !self.show_spinner {
            return ProgressBar::hidden();
        }

        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.green} {msg} {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        spinner.set_style(style);
        spinner.set_message(format!("terraform {}", operation));
        spinner.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
        spinner
    }
}

#[async_trait]
impl Provisioner for TerraformCli {
    async fn init(&self, cancel: &CancellationToken) -> Result<()> {
        self.run("init", &["init", "-input=false"], cancel).await
    }

    async fn apply(&self, cancel: &CancellationToken) -> Result<()> {
        self.run("apply", &["apply", "-auto-approve", "-input=false"], cancel)
            .await
    }
}

/// First `terraform` executable on `PATH`
pub fn locate_terraform() -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(executable_name()))
        .find(|candidate| candidate.is_file())
}

fn executable_name() -> String {
    if cfg!(windows) {
        format!("{}.exe", BINARY_NAME)
    } else {
        BINARY_NAME.to_string()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;
    use tokio::sync::Mutex;

    // Serializes script writes and spawns (ETXTBSY when a write fd leaks into a fork)
    static SPAWN_LOCK: Mutex<()> = Mutex::const_new(());

    /// Shell script standing in for terraform
    fn fake_terraform(dir: &Path, script: &str) -> PathBuf {
        let path = dir.join("terraform");
        fs::write(&path, format!("#!/bin/sh\n{}\n", script)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[tokio::test]
    async fn test_init_runs_in_working_dir() {
        let _guard = SPAWN_LOCK.lock().await;
        let bin = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let exe = fake_terraform(bin.path(), "echo \"$@\" > args.txt");

        let cli = TerraformCli::new(exe, work.path()).without_spinner();
        cli.init(&CancellationToken::new()).await.unwrap();

        let args = fs::read_to_string(work.path().join("args.txt")).unwrap();
        assert_eq!(args.trim(), "init -input=false");
    }

    #[tokio::test]
    async fn test_apply_arguments() {
        let _guard = SPAWN_LOCK.lock().await;
        let bin = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let exe = fake_terraform(bin.path(), "echo \"$@\" > args.txt");

        let cli = TerraformCli::new(exe, work.path()).without_spinner();
        cli.apply(&CancellationToken::new()).await.unwrap();

        let args = fs::read_to_string(work.path().join("args.txt")).unwrap();
        assert_eq!(args.trim(), "apply -auto-approve -input=false");
    }

    #[tokio::test]
    async fn test_failure_carries_stderr() {
        let _guard = SPAWN_LOCK.lock().await;
        let bin = TempDir::new().unwrap();
        let exe = fake_terraform(bin.path(), "echo 'Error: no configuration files' >&2\nexit 1");

        let cli = TerraformCli::new(exe, bin.path()).without_spinner();
        let err = cli.init(&CancellationToken::new()).await.unwrap_err();
        match err {
            AssistError::Provisioning { operation, message } => {
                assert_eq!(operation, "init");
                assert_eq!(message, "Error: no configuration files");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancel_stops_child() {
        let _guard = SPAWN_LOCK.lock().await;
        let bin = TempDir::new().unwrap();
        let exe = fake_terraform(bin.path(), "sleep 30");

        let cli = TerraformCli::new(exe, bin.path()).without_spinner();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let err = cli.init(&cancel).await.unwrap_err();
        assert!(matches!(err, AssistError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_locate_with_directory() {
        let bin = TempDir::new().unwrap();
        let exe = fake_terraform(bin.path(), "exit 0");

        let cli = TerraformCli::locate(Some(bin.path()), ".").unwrap();
        assert_eq!(cli.executable(), exe);
    }

    #[test]
    fn test_locate_missing_executable() {
        let bin = TempDir::new().unwrap();
        let err = TerraformCli::locate(Some(&bin.path().join("terraform")), ".").unwrap_err();
        assert!(matches!(err, AssistError::Config(_)));
    }
}
