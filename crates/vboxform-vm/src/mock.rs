//! Scripted executor for testing code that drives VBoxManage.
//!
//! Records every invocation and replays pre-configured outcomes in order,
//! so reconciliation logic can be tested without VirtualBox installed.

use crate::error::{ExecError, Result};
use crate::executor::{CommandExecutor, CommandOutput, DEFAULT_VBOXMANAGE};
use crate::invocation::Invocation;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// A scripted outcome: stdout on success, stderr on failure.
pub type MockResponse = std::result::Result<String, String>;

/// Test-double executor.
///
/// Once the script runs out every further call succeeds with empty output.
#[derive(Debug, Default)]
pub struct MockExecutor {
    responses: Mutex<VecDeque<MockResponse>>,
    invocations: Mutex<Vec<Invocation>>,
    program: Option<PathBuf>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responses(responses: Vec<MockResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            invocations: Mutex::new(Vec::new()),
            program: None,
        }
    }

    /// Report `program` as the executable, as a configured path would.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = Some(program.into());
        self
    }

    /// Every invocation executed so far, in order.
    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// The subcommand of each invocation, e.g. `["createvm", "modifyvm"]`.
    pub fn subcommands(&self) -> Vec<String> {
        self.invocations()
            .iter()
            .filter_map(|inv| inv.subcommand().map(str::to_string))
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.invocations.lock().map(|guard| guard.len()).unwrap_or(0)
    }
}

#[async_trait]
impl CommandExecutor for MockExecutor {
    async fn execute(&self, invocation: &Invocation) -> Result<CommandOutput> {
        if let Ok(mut invocations) = self.invocations.lock() {
            invocations.push(invocation.clone());
        }
        let next = self
            .responses
            .lock()
            .ok()
            .and_then(|mut responses| responses.pop_front());

        match next {
            Some(Ok(stdout)) => Ok(CommandOutput::with_stdout(stdout)),
            Some(Err(stderr)) => Err(ExecError::Failed {
                code: Some(1),
                stderr,
            }),
            None => Ok(CommandOutput::default()),
        }
    }

    fn program(&self) -> &Path {
        self.program
            .as_deref()
            .unwrap_or(Path::new(DEFAULT_VBOXMANAGE))
    }
}
