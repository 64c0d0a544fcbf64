//! Error types for vboxform-vm.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for command execution.
pub type Result<T> = std::result::Result<T, ExecError>;

/// Errors produced when running a single control-surface command.
///
/// The executor never interprets a failure beyond this; callers decide
/// whether a given step is fatal.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The process could not be started at all
    #[error("failed to spawn {}: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The process ran and exited unsuccessfully
    #[error("exited with {}: {stderr}", exit_status(.code))]
    Failed { code: Option<i32>, stderr: String },

    /// The caller-supplied deadline expired
    #[error("command timed out after {0:?}")]
    Timeout(Duration),
}

impl ExecError {
    /// Text to surface to an operator.
    ///
    /// For a failed process this is the captured stderr, verbatim.
    pub fn detail(&self) -> String {
        match self {
            ExecError::Failed { stderr, .. } => stderr.clone(),
            other => other.to_string(),
        }
    }
}

fn exit_status(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "no status (terminated by signal)".to_string(),
    }
}

/// Desired-configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("iso_path must not be empty")]
    EmptyIsoPath,

    #[error("memory_mb must be > 0")]
    ZeroMemory,

    #[error("cpu_count must be > 0")]
    ZeroCpus,

    #[error("network_adapter.kind must not be empty")]
    EmptyNetworkKind,
}

/// Errors raised while planning an in-place change.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    /// The field cannot be changed without destroying and recreating the VM
    #[error("changing {field} requires replacing the VM")]
    RequiresReplacement { field: &'static str },
}
