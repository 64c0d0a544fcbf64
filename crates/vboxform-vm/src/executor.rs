//! Command execution against the VBoxManage control surface.
//!
//! `CommandExecutor` runs one invocation to completion. `ProcessExecutor`
//! spawns the real binary; `TimeoutExecutor` layers an optional deadline
//! around any executor.

use crate::error::{ExecError, Result};
use crate::invocation::Invocation;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, trace, warn};

/// Default executable name, resolved through `PATH`.
pub const DEFAULT_VBOXMANAGE: &str = "VBoxManage";

/// Maximum captured output size in bytes (1 MB).
const MAX_OUTPUT_SIZE: usize = 1024 * 1024;

/// Output of a command that exited successfully.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn with_stdout(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }
}

/// Runs a single control-surface invocation.
///
/// `Ok` means exit status zero. Any other outcome, including failing to
/// spawn, is an `ExecError`; the executor never retries.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, invocation: &Invocation) -> Result<CommandOutput>;

    /// Executable the invocations are handed to.
    fn program(&self) -> &Path {
        Path::new(DEFAULT_VBOXMANAGE)
    }
}

#[async_trait]
impl<E: CommandExecutor + ?Sized> CommandExecutor for &E {
    async fn execute(&self, invocation: &Invocation) -> Result<CommandOutput> {
        (**self).execute(invocation).await
    }

    fn program(&self) -> &Path {
        (**self).program()
    }
}

/// Decode captured bytes, keeping at most `limit` bytes of text.
///
/// The cut lands on a character boundary and is marked in the result.
fn capture(raw: &[u8], limit: usize) -> String {
    let text = String::from_utf8_lossy(raw);
    if text.len() <= limit {
        return text.into_owned();
    }
    let cut = text
        .char_indices()
        .map(|(at, _)| at)
        .take_while(|&at| at <= limit)
        .last()
        .unwrap_or(0);
    format!("{}\n... [output truncated]", &text[..cut])
}

/// Spawns the VBoxManage executable for each invocation.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    program: PathBuf,
}

impl Default for ProcessExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_VBOXMANAGE)
    }
}

impl ProcessExecutor {
    /// Use `program` as the control-surface executable.
    ///
    /// A bare name is looked up in `PATH` at spawn time.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl CommandExecutor for ProcessExecutor {
    async fn execute(&self, invocation: &Invocation) -> Result<CommandOutput> {
        debug!(program = %self.program.display(), command = %invocation, "executing command");
        let start = Instant::now();

        let output = Command::new(&self.program)
            .args(invocation.args())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                warn!(error = %e, program = %self.program.display(), "failed to spawn command");
                ExecError::Spawn {
                    program: self.program.clone(),
                    source: e,
                }
            })?;

        let stdout = capture(&output.stdout, MAX_OUTPUT_SIZE);
        let stderr = capture(&output.stderr, MAX_OUTPUT_SIZE);
        debug!(
            exit_code = ?output.status.code(),
            stdout_len = stdout.len(),
            stderr_len = stderr.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "command completed"
        );
        trace!(stdout = %stdout, stderr = %stderr, "command output");

        if output.status.success() {
            Ok(CommandOutput { stdout, stderr })
        } else {
            Err(ExecError::Failed {
                code: output.status.code(),
                stderr,
            })
        }
    }
}

/// Wraps an executor with an optional per-command deadline.
///
/// With no limit every call passes straight through. When the limit
/// expires the inner future is dropped, which kills a spawned process.
#[derive(Debug, Clone)]
pub struct TimeoutExecutor<E> {
    inner: E,
    limit: Option<Duration>,
}

impl<E> TimeoutExecutor<E> {
    pub fn new(inner: E, limit: Option<Duration>) -> Self {
        Self { inner, limit }
    }

    pub fn limit(&self) -> Option<Duration> {
        self.limit
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }
}

#[async_trait]
impl<E: CommandExecutor> CommandExecutor for TimeoutExecutor<E> {
    async fn execute(&self, invocation: &Invocation) -> Result<CommandOutput> {
        let Some(limit) = self.limit else {
            return self.inner.execute(invocation).await;
        };

        match tokio::time::timeout(limit, self.inner.execute(invocation)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(command = %invocation, ?limit, "command deadline expired");
                Err(ExecError::Timeout(limit))
            }
        }
    }

    fn program(&self) -> &Path {
        self.inner.program()
    }
}
