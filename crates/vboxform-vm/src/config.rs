//! Desired VM configuration types.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Network kind used when no adapter block is configured.
pub const DEFAULT_NETWORK_KIND: &str = "nat";

/// Network kind that attaches the adapter to a host interface.
pub const BRIDGED_NETWORK_KIND: &str = "bridged";

/// Desired state of a VirtualBox VM, as declared by the caller.
///
/// Supplied fresh on every create/update call and never persisted here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VmConfig {
    /// VM name, also the handle every VBoxManage command targets.
    pub name: String,
    /// Path to the installation ISO.
    pub iso_path: PathBuf,
    /// Memory in MB.
    pub memory_mb: u32,
    /// Virtual CPU count.
    pub cpu_count: u32,
    /// Primary network adapter. `None` means NAT.
    #[serde(default)]
    pub network_adapter: Option<NetworkAdapterConfig>,
}

/// Caller-settable part of the primary network adapter.
///
/// The guest's IPv4 address is computed and therefore has no field here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkAdapterConfig {
    /// VBoxManage `--nic1` value (`nat`, `bridged`, `hostonly`, ...).
    pub kind: String,
    #[serde(default)]
    pub device: Option<String>,
    /// Host interface for bridged networking.
    #[serde(default)]
    pub host_interface: Option<String>,
}

impl VmConfig {
    /// Create a new config builder.
    pub fn builder() -> VmConfigBuilder {
        VmConfigBuilder::default()
    }

    /// Validate the configuration.
    ///
    /// Does not touch the filesystem; ISO existence is checked by the
    /// reconciler right before it issues commands.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if self.iso_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyIsoPath);
        }
        if self.memory_mb == 0 {
            return Err(ConfigError::ZeroMemory);
        }
        if self.cpu_count == 0 {
            return Err(ConfigError::ZeroCpus);
        }
        if let Some(adapter) = &self.network_adapter {
            if adapter.kind.trim().is_empty() {
                return Err(ConfigError::EmptyNetworkKind);
            }
        }
        Ok(())
    }

    /// Network kind to apply to NIC 1.
    pub fn network_kind(&self) -> &str {
        self.network_adapter
            .as_ref()
            .map(|adapter| adapter.kind.as_str())
            .unwrap_or(DEFAULT_NETWORK_KIND)
    }

    /// Host interface to bridge to, when the adapter is bridged and names one.
    pub fn bridge_interface(&self) -> Option<&str> {
        self.network_adapter.as_ref().and_then(|adapter| {
            if adapter.kind == BRIDGED_NETWORK_KIND {
                adapter.host_interface()
            } else {
                None
            }
        })
    }

    /// True for a bridged adapter that has no host interface to bridge to.
    ///
    /// Such an adapter gets no bridge step at all.
    pub fn is_bridged_without_interface(&self) -> bool {
        self.network_adapter.as_ref().is_some_and(|adapter| {
            adapter.kind == BRIDGED_NETWORK_KIND && adapter.host_interface().is_none()
        })
    }
}

impl NetworkAdapterConfig {
    /// Adapter of the given kind with no device or host interface.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Default::default()
        }
    }

    /// Bridged adapter attached to `host_interface`.
    pub fn bridged(host_interface: impl Into<String>) -> Self {
        Self {
            kind: BRIDGED_NETWORK_KIND.to_string(),
            device: None,
            host_interface: Some(host_interface.into()),
        }
    }

    /// The host interface, treating an empty string as unset.
    pub fn host_interface(&self) -> Option<&str> {
        self.host_interface.as_deref().filter(|s| !s.is_empty())
    }
}

/// Builder for VmConfig.
#[derive(Debug)]
pub struct VmConfigBuilder {
    config: VmConfig,
}

impl Default for VmConfigBuilder {
    fn default() -> Self {
        Self {
            config: VmConfig {
                name: String::new(),
                iso_path: PathBuf::new(),
                memory_mb: 1024,
                cpu_count: 1,
                network_adapter: None,
            },
        }
    }
}

impl VmConfigBuilder {
    /// Set the VM name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Set the installation ISO path.
    pub fn iso_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.iso_path = path.into();
        self
    }

    /// Set memory in MB (default: 1024).
    pub fn memory_mb(mut self, mb: u32) -> Self {
        self.config.memory_mb = mb;
        self
    }

    /// Set vCPU count (default: 1).
    pub fn cpu_count(mut self, count: u32) -> Self {
        self.config.cpu_count = count;
        self
    }

    /// Configure the primary network adapter.
    pub fn network_adapter(mut self, adapter: NetworkAdapterConfig) -> Self {
        self.config.network_adapter = Some(adapter);
        self
    }

    /// Build the configuration, validating all required fields.
    pub fn build(self) -> Result<VmConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
