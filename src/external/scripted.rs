//! Scripted command executor for tests
//!
//! Responses are keyed by `"program arg1 arg2 ..."`. Unscripted commands fall
//! back to a configurable response (command-not-found by default).

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use super::command::{CommandError, CommandExecutor, CommandOutput};

pub struct ScriptedExecutor {
    responses: HashMap<String, Result<CommandOutput, CommandError>>,
    fallback: Option<Result<CommandOutput, CommandError>>,
    calls: Mutex<Vec<String>>,
}

impl Default for ScriptedExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            fallback: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn expect_command(
        mut self,
        program: &str,
        args: &[&str],
        response: Result<CommandOutput, CommandError>,
    ) -> Self {
        self.responses.insert(Self::key(program, args), response);
        self
    }

    /// Succeed with the given stdout.
    pub fn ok(self, program: &str, args: &[&str], stdout: &str) -> Self {
        self.expect_command(
            program,
            args,
            Ok(CommandOutput {
                status_code: 0,
                stdout: stdout.to_string(),
                stderr: String::new(),
            }),
        )
    }

    /// Exit with status 1 and the given stderr.
    pub fn fail(self, program: &str, args: &[&str], stderr: &str) -> Self {
        self.expect_command(
            program,
            args,
            Ok(CommandOutput {
                status_code: 1,
                stdout: String::new(),
                stderr: stderr.to_string(),
            }),
        )
    }

    pub fn with_fallback(mut self, response: Result<CommandOutput, CommandError>) -> Self {
        self.fallback = Some(response);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn key(program: &str, args: &[&str]) -> String {
        if args.is_empty() {
            program.to_string()
        } else {
            format!("{} {}", program, args.join(" "))
        }
    }
}

#[async_trait]
impl CommandExecutor for ScriptedExecutor {
    async fn execute(
        &self,
        program: &str,
        args: &[&str],
        _cwd: &Path,
        _timeout: Duration,
    ) -> Result<CommandOutput, CommandError> {
        let key = Self::key(program, args);
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(key.clone());
        }
        match self.responses.get(&key) {
            Some(response) => response.clone(),
            None => self.fallback.clone().unwrap_or(Err(CommandError::CommandNotFound {
                command: program.to_string(),
            })),
        }
    }
}
