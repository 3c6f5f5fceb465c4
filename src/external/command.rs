//! Base command execution abstraction
//!
//! Provides the foundational trait for executing external commands, enabling
//! dependency injection for testing. Every invocation is bounded by a timeout
//! and runs non-interactively inside an explicit working directory.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub status_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status_code == 0
    }

    /// stdout and stderr joined, in that order.
    pub fn combined(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (true, _) => self.stderr.clone(),
            (false, true) => self.stdout.clone(),
            (false, false) => format!("{}\n{}", self.stdout, self.stderr),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Command execution failed: {message}")]
    ExecutionFailed { message: String },
    #[error("Command not found: {command}")]
    CommandNotFound { command: String },
    #[error("Command timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("IO error: {message}")]
    Io { message: String },
}

/// Trait for executing external commands
///
/// This abstraction allows the rest of the codebase to execute commands
/// without directly depending on `tokio::process::Command`, enabling testing
/// with scripted implementations.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(
        &self,
        program: &str,
        args: &[&str],
        cwd: &Path,
        timeout: Duration,
    ) -> Result<CommandOutput, CommandError>;
}

/// Real implementation using `tokio::process::Command`
pub struct ProcessCommandExecutor;

#[async_trait]
impl CommandExecutor for ProcessCommandExecutor {
    async fn execute(
        &self,
        program: &str,
        args: &[&str],
        cwd: &Path,
        timeout: Duration,
    ) -> Result<CommandOutput, CommandError> {
        let child = tokio::process::Command::new(program)
            .args(args)
            .current_dir(cwd)
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("LC_ALL", "C")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    CommandError::CommandNotFound {
                        command: program.to_string(),
                    }
                } else {
                    CommandError::Io { message: e.to_string() }
                }
            })?;

        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| CommandError::Io { message: e.to_string() })?,
            Err(_) => {
                tracing::warn!(program, ?args, timeout_ms = timeout.as_millis() as u64, "Command timed out");
                return Err(CommandError::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
        };

        Ok(CommandOutput {
            status_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}
