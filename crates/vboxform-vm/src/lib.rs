//! # vboxform-vm
//!
//! VBoxManage control-surface layer for vboxform.
//! Turns a declared VM configuration into ordered command plans and runs
//! individual commands against the `VBoxManage` executable.
//!
//! ## Quick Start
//!
//! ```no_run
//! use vboxform_vm::{CommandExecutor, Plan, ProcessExecutor, VmConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = VmConfig::builder()
//!     .name("web")
//!     .iso_path("/isos/ubuntu-24.04.iso")
//!     .memory_mb(2048)
//!     .cpu_count(2)
//!     .build()?;
//!
//! let executor = ProcessExecutor::default();
//! for step in Plan::create(&config).steps() {
//!     executor.execute(&step.invocation).await?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - **Typed configuration**: `VmConfig` validated at the decode boundary
//! - **Deterministic plans**: fixed step order for create, update and delete
//! - **Pluggable execution**: `CommandExecutor` trait with process, timeout and mock implementations

mod config;
mod error;
mod executor;
mod guest;
mod invocation;
mod mock;
mod plan;

pub use config::{
    NetworkAdapterConfig, VmConfig, VmConfigBuilder, BRIDGED_NETWORK_KIND, DEFAULT_NETWORK_KIND,
};
pub use error::{ConfigError, ExecError, PlanError, Result};
pub use executor::{
    CommandExecutor, CommandOutput, ProcessExecutor, TimeoutExecutor, DEFAULT_VBOXMANAGE,
};
pub use guest::{ipv4_query, parse_property_value, GUEST_IPV4_PROPERTY};
pub use invocation::Invocation;
pub use mock::{MockExecutor, MockResponse};
pub use plan::{Action, OnFailure, Plan, Step, STORAGE_CONTROLLER};
