//! Provider-level configuration.
//!
//! Configuration is loaded from environment variables with sensible defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;
use vboxform_vm::{ProcessExecutor, TimeoutExecutor, DEFAULT_VBOXMANAGE};

/// Configuration shared by every lifecycle call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// VBoxManage executable. A bare name is resolved through `PATH`.
    pub vboxmanage_path: PathBuf,

    /// Per-command deadline. `None` waits for every command indefinitely.
    pub command_timeout: Option<Duration>,
}

/// Configuration validation error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("VBoxManage executable not found: {0}")]
    MissingVBoxManage(PathBuf),

    #[error("invalid command timeout: {0:?}")]
    InvalidTimeout(String),
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            vboxmanage_path: PathBuf::from(DEFAULT_VBOXMANAGE),
            command_timeout: None,
        }
    }
}

impl ProviderConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `VBOXFORM_VBOXMANAGE` | `VBoxManage` (from `PATH`) |
    /// | `VBOXFORM_COMMAND_TIMEOUT_SECS` | unset (no timeout) |
    pub fn from_env() -> Result<Self, ConfigError> {
        let default = Self::default();

        let command_timeout = match std::env::var("VBOXFORM_COMMAND_TIMEOUT_SECS") {
            Ok(value) => Some(parse_timeout(&value)?),
            Err(_) => default.command_timeout,
        };

        Ok(Self {
            vboxmanage_path: std::env::var("VBOXFORM_VBOXMANAGE")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(default.vboxmanage_path),
            command_timeout,
        })
    }

    /// Check that an explicitly located executable exists.
    ///
    /// Bare names are left to `PATH` resolution at spawn time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if is_explicit_path(&self.vboxmanage_path) && !self.vboxmanage_path.exists() {
            return Err(ConfigError::MissingVBoxManage(self.vboxmanage_path.clone()));
        }
        Ok(())
    }

    /// Validate configuration but only log warnings instead of failing.
    pub fn validate_warn(&self) {
        if let Err(e) = self.validate() {
            tracing::warn!(error = %e, "Provider configuration problem");
        }
    }

    /// Build the executor chain for this configuration.
    pub fn executor(&self) -> TimeoutExecutor<ProcessExecutor> {
        TimeoutExecutor::new(
            ProcessExecutor::new(&self.vboxmanage_path),
            self.command_timeout,
        )
    }
}

/// Parse a whole number of seconds; zero is rejected.
pub fn parse_timeout(value: &str) -> Result<Duration, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidTimeout(value.to_string())),
    }
}

fn is_explicit_path(path: &Path) -> bool {
    path.components().count() > 1 || path.is_absolute()
}
