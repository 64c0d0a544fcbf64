//! Command-line host for the vboxform reconciler.
//!
//! Decodes a configuration or state document, runs one lifecycle
//! operation and hands back the response for printing. Persisting the
//! resulting state is left to whoever calls the binary.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use std::io::Read;
use std::path::{Path, PathBuf};
use vboxform_core::{parse_timeout, ProviderConfig, Reconciler, Response, VmState};
use vboxform_vm::{Plan, ProcessExecutor, TimeoutExecutor, VmConfig};

/// Path argument meaning "read from stdin".
const STDIN: &str = "-";

#[derive(Debug, Parser)]
#[command(name = "vboxform", version, about = "Reconcile VirtualBox VMs against a declared configuration")]
pub struct Cli {
    /// VBoxManage executable (overrides VBOXFORM_VBOXMANAGE)
    #[arg(long, global = true)]
    pub vboxmanage: Option<PathBuf>,

    /// Per-command timeout in seconds (overrides VBOXFORM_COMMAND_TIMEOUT_SECS)
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the create plan for a configuration without running it
    Plan {
        /// VM configuration (JSON file, or - for stdin)
        #[arg(long)]
        config: PathBuf,
    },
    /// Create and configure a VM
    Create {
        /// VM configuration (JSON file, or - for stdin)
        #[arg(long)]
        config: PathBuf,
    },
    /// Refresh the guest-reported IPv4 address
    Read {
        /// Persisted VM state (JSON file, or - for stdin)
        #[arg(long)]
        state: PathBuf,
    },
    /// Apply configuration changes in place
    Update {
        /// Persisted VM state (JSON file, or - for stdin)
        #[arg(long)]
        state: PathBuf,
        /// Desired VM configuration (JSON file, or - for stdin)
        #[arg(long)]
        config: PathBuf,
    },
    /// Power off, unregister and delete a VM
    Delete {
        /// Persisted VM state (JSON file, or - for stdin)
        #[arg(long)]
        state: PathBuf,
    },
}

/// What a command produced.
#[derive(Debug)]
pub enum Outcome {
    /// Rendered plan text
    Plan(String),
    /// Lifecycle response
    Response(Response),
}

impl Cli {
    /// Environment configuration with command-line overrides applied.
    pub fn provider_config(&self) -> anyhow::Result<ProviderConfig> {
        let mut config = ProviderConfig::from_env()?;
        if let Some(path) = &self.vboxmanage {
            config.vboxmanage_path = path.clone();
        }
        if let Some(secs) = self.timeout_secs {
            config.command_timeout = Some(parse_timeout(&secs.to_string())?);
        }
        Ok(config)
    }
}

/// Run the selected command.
pub async fn run(cli: &Cli) -> anyhow::Result<Outcome> {
    let response = match &cli.command {
        Command::Plan { config } => {
            let config: VmConfig = read_document(config)?;
            config.validate().context("invalid VM configuration")?;
            let program = cli.provider_config()?.vboxmanage_path;
            return Ok(Outcome::Plan(Plan::create(&config).render(&program)));
        }
        Command::Create { config } => {
            let config: VmConfig = read_document(config)?;
            reconciler(cli)?.create(&config).await
        }
        Command::Read { state } => {
            let state: VmState = read_document(state)?;
            reconciler(cli)?.read(&state).await
        }
        Command::Update { state, config } => {
            if is_stdin(state) && is_stdin(config) {
                bail!("--state and --config cannot both be read from stdin");
            }
            let state: VmState = read_document(state)?;
            let config: VmConfig = read_document(config)?;
            reconciler(cli)?.update(&state, &config).await
        }
        Command::Delete { state } => {
            let state: VmState = read_document(state)?;
            reconciler(cli)?.delete(&state).await
        }
    };

    Ok(Outcome::Response(response))
}

fn reconciler(cli: &Cli) -> anyhow::Result<Reconciler<TimeoutExecutor<ProcessExecutor>>> {
    let provider = cli.provider_config()?;
    provider.validate_warn();
    tracing::debug!(?provider, "Provider configuration loaded");
    Ok(Reconciler::new(provider.executor()))
}

/// Decode a JSON document from a file, or from stdin for `-`.
pub fn read_document<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let text = if is_stdin(path) {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("failed to read stdin")?;
        text
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?
    };
    serde_json::from_str(&text).with_context(|| format!("failed to decode {}", path.display()))
}

fn is_stdin(path: &Path) -> bool {
    path.as_os_str() == STDIN
}
