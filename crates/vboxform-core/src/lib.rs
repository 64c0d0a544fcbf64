//! # vboxform-core
//!
//! Desired-state reconciler for VirtualBox VMs managed through `VBoxManage`.
//!
//! The host transport decodes a `VmConfig` (or a persisted `VmState`), hands
//! it to a `Reconciler` and gets back a `Response`: the new state plus an
//! ordered list of diagnostics. Any error diagnostic means the operation
//! failed and its state must not be persisted.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     vboxform-core                        │
//! ├──────────────────────────────────────────────────────────┤
//! │                                                          │
//! │  VmConfig ──▶ ┌─────────────────┐     ┌───────────────┐  │
//! │               │   Reconciler    │────▶│     Plan      │  │
//! │               │  - create()     │     │ (vboxform-vm) │  │
//! │               │  - read()       │     └───────────────┘  │
//! │               │  - update()     │             │          │
//! │               │  - delete()     │             ▼          │
//! │               └─────────────────┘     ┌───────────────┐  │
//! │                 │            ▲        │CommandExecutor│  │
//! │                 ▼            └────────│ one at a time │  │
//! │     VmState + Diagnostics             └───────────────┘  │
//! │                                               │          │
//! └───────────────────────────────────────────────┼──────────┘
//!                                                 ▼
//!                                         VBoxManage process
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use vboxform_core::{ProviderConfig, Reconciler};
//! use vboxform_vm::VmConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = ProviderConfig::from_env()?;
//! let reconciler = Reconciler::new(provider.executor());
//!
//! let config = VmConfig::builder()
//!     .name("web")
//!     .iso_path("/isos/ubuntu-24.04.iso")
//!     .memory_mb(2048)
//!     .cpu_count(2)
//!     .build()?;
//!
//! let response = reconciler.create(&config).await;
//! for diagnostic in &response.diagnostics {
//!     println!("{diagnostic}");
//! }
//! # Ok(())
//! # }
//! ```

mod config;
mod diagnostics;
mod reconciler;
mod state;

pub use config::{parse_timeout, ConfigError, ProviderConfig};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use reconciler::{Reconciler, Response};
pub use state::{NetworkAdapterState, VmState};
