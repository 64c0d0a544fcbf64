//! vboxform entry point.
//!
//! Logs go to stderr; stdout carries only the JSON response (or the
//! rendered plan), so the output can be piped straight into a state file.

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vboxform_cli::{run, Cli, Outcome};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("vboxform=info".parse()?))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match run(&cli).await? {
        Outcome::Plan(text) => {
            print!("{text}");
            Ok(ExitCode::SUCCESS)
        }
        Outcome::Response(response) => {
            for diagnostic in &response.diagnostics {
                match diagnostic.severity {
                    vboxform_core::Severity::Error => tracing::error!(
                        summary = %diagnostic.summary,
                        detail = %diagnostic.detail,
                        "Operation failed"
                    ),
                    vboxform_core::Severity::Warning => tracing::info!(
                        summary = %diagnostic.summary,
                        detail = %diagnostic.detail,
                        "Diagnostic"
                    ),
                }
            }

            println!("{}", serde_json::to_string_pretty(&response)?);

            if response.is_success() {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
    }
}
