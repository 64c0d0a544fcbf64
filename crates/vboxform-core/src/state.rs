//! Observed VM state handed back to the caller for persistence.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use vboxform_vm::{NetworkAdapterConfig, VmConfig};

/// Persisted view of a managed VM.
///
/// Mirrors `VmConfig` plus the guest's computed IPv4 address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmState {
    pub name: String,
    pub iso_path: PathBuf,
    pub memory_mb: u32,
    pub cpu_count: u32,
    #[serde(default)]
    pub network_adapter: Option<NetworkAdapterState>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkAdapterState {
    pub kind: String,
    #[serde(default)]
    pub device: Option<String>,
    /// Only set when the configured value was non-empty.
    #[serde(default)]
    pub host_interface: Option<String>,
    /// Reported by the running guest; `None` until a read resolves it.
    #[serde(default)]
    pub ipv4_address: Option<String>,
}

impl VmState {
    /// State right after a successful create: the config echoed back.
    pub fn from_config(config: &VmConfig) -> Self {
        Self {
            name: config.name.clone(),
            iso_path: config.iso_path.clone(),
            memory_mb: config.memory_mb,
            cpu_count: config.cpu_count,
            network_adapter: config
                .network_adapter
                .as_ref()
                .map(NetworkAdapterState::from_config),
        }
    }

    /// The caller-settable part of this state.
    pub fn to_config(&self) -> VmConfig {
        VmConfig {
            name: self.name.clone(),
            iso_path: self.iso_path.clone(),
            memory_mb: self.memory_mb,
            cpu_count: self.cpu_count,
            network_adapter: self.network_adapter.as_ref().map(|adapter| NetworkAdapterConfig {
                kind: adapter.kind.clone(),
                device: adapter.device.clone(),
                host_interface: adapter.host_interface.clone(),
            }),
        }
    }

    pub fn ipv4_address(&self) -> Option<&str> {
        self.network_adapter
            .as_ref()
            .and_then(|adapter| adapter.ipv4_address.as_deref())
    }
}

impl NetworkAdapterState {
    fn from_config(adapter: &NetworkAdapterConfig) -> Self {
        Self {
            kind: adapter.kind.clone(),
            device: adapter.device.clone(),
            host_interface: adapter.host_interface().map(str::to_string),
            ipv4_address: None,
        }
    }
}
