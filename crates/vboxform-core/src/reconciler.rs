//! Reconciler - maps desired configuration onto VBoxManage calls.
//!
//! Each lifecycle call builds a plan, runs it one command at a time and
//! turns the results into a state value plus diagnostics. Nothing is
//! retried and nothing already applied is rolled back.

use crate::diagnostics::Diagnostics;
use crate::state::VmState;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;
use vboxform_vm::{
    ipv4_query, parse_property_value, Action, CommandExecutor, OnFailure, Plan, Step, VmConfig,
};

/// Result of one lifecycle call.
///
/// `state` is only meaningful when `diagnostics` holds no error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub state: Option<VmState>,
    pub diagnostics: Diagnostics,
}

impl Response {
    fn failed(diagnostics: Diagnostics) -> Self {
        Self {
            state: None,
            diagnostics,
        }
    }

    fn ok(state: Option<VmState>, diagnostics: Diagnostics) -> Self {
        Self { state, diagnostics }
    }

    pub fn is_success(&self) -> bool {
        !self.diagnostics.has_error()
    }
}

/// Drives create/read/update/delete for VirtualBox VMs.
///
/// Holds no state between calls; concurrent calls for different VMs
/// share nothing but the executor.
#[derive(Debug, Clone)]
pub struct Reconciler<E> {
    executor: E,
}

impl<E: CommandExecutor> Reconciler<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    /// Create and configure a new VM.
    ///
    /// Configuration and ISO existence are checked before any command runs.
    pub async fn create(&self, config: &VmConfig) -> Response {
        let mut diags = Diagnostics::new();
        let start = Instant::now();
        tracing::info!(
            vm = %config.name,
            memory_mb = config.memory_mb,
            cpu_count = config.cpu_count,
            network_kind = config.network_kind(),
            "Creating VM"
        );

        if let Err(e) = config.validate() {
            tracing::error!(vm = %config.name, error = %e, "Invalid configuration");
            diags.add_error("Invalid Configuration", e.to_string());
            return Response::failed(diags);
        }

        if !iso_exists(&config.iso_path).await {
            tracing::error!(vm = %config.name, iso = %config.iso_path.display(), "ISO not found");
            diags.add_error("Invalid ISO Path", missing_iso_detail(&config.iso_path));
            return Response::failed(diags);
        }

        warn_bridged_without_interface(config, &mut diags);

        let plan = Plan::create(config);
        if !self.run_plan(&config.name, &plan, &mut diags).await {
            return Response::failed(diags);
        }

        tracing::info!(
            vm = %config.name,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "VM created"
        );
        diags.add_warning(
            "VM Created",
            format!("VM '{}' created successfully.", config.name),
        );
        Response::ok(Some(VmState::from_config(config)), diags)
    }

    /// Refresh the guest-reported IPv4 address.
    ///
    /// Only `network_adapter.ipv4_address` can change. The guest property is
    /// queried even without an adapter block, so a VM that no longer exists
    /// is reported; the address is then simply not recorded.
    pub async fn read(&self, state: &VmState) -> Response {
        let mut diags = Diagnostics::new();

        if let Err(detail) = check_state(state) {
            diags.add_error("Invalid State", detail);
            return Response::failed(diags);
        }

        let output = match self.executor.execute(&ipv4_query(&state.name)).await {
            Ok(output) => output,
            Err(e) => {
                tracing::error!(vm = %state.name, error = %e, "Guest property query failed");
                diags.add_error(
                    "Error retrieving VM IP",
                    format!(
                        "Failed to get IP address of VM '{}': {}",
                        state.name,
                        e.detail()
                    ),
                );
                return Response::failed(diags);
            }
        };

        let mut refreshed = state.clone();
        match parse_property_value(&output.stdout) {
            Some(address) => {
                tracing::debug!(vm = %state.name, %address, "Guest reported IPv4 address");
                match refreshed.network_adapter.as_mut() {
                    Some(adapter) => adapter.ipv4_address = Some(address.to_string()),
                    None => {
                        tracing::debug!(vm = %state.name, "No network adapter in state, address not recorded");
                    }
                }
            }
            None => {
                tracing::debug!(vm = %state.name, "Guest has not reported an IPv4 address yet");
            }
        }

        Response::ok(Some(refreshed), diags)
    }

    /// Apply configuration changes in place.
    ///
    /// A rename is rejected as requiring replacement. Other changes are
    /// applied with the same commands create uses; VirtualBox refuses most
    /// of them while the VM is running and that refusal is reported as is.
    pub async fn update(&self, prior: &VmState, desired: &VmConfig) -> Response {
        let mut diags = Diagnostics::new();
        tracing::info!(vm = %desired.name, "Updating VM");

        if let Err(e) = desired.validate() {
            diags.add_error("Invalid Configuration", e.to_string());
            return Response::failed(diags);
        }

        let current = prior.to_config();
        let plan = match Plan::update(&current, desired) {
            Ok(plan) => plan,
            Err(e) => {
                tracing::error!(vm = %prior.name, error = %e, "Update needs replacement");
                diags.add_error(
                    "Replacement Required",
                    format!(
                        "VM '{}' cannot be updated in place: {}. Delete and create it again.",
                        prior.name, e
                    ),
                );
                return Response::failed(diags);
            }
        };

        if current.iso_path != desired.iso_path && !iso_exists(&desired.iso_path).await {
            diags.add_error("Invalid ISO Path", missing_iso_detail(&desired.iso_path));
            return Response::failed(diags);
        }

        warn_bridged_without_interface(desired, &mut diags);

        if !self.run_plan(&desired.name, &plan, &mut diags).await {
            return Response::failed(diags);
        }

        let mut state = VmState::from_config(desired);
        let network_unchanged = current.network_kind() == desired.network_kind()
            && current.bridge_interface() == desired.bridge_interface();
        if network_unchanged {
            if let Some(adapter) = state.network_adapter.as_mut() {
                adapter.ipv4_address = prior.ipv4_address().map(str::to_string);
            }
        }

        tracing::info!(vm = %desired.name, changes = plan.len(), "VM updated");
        diags.add_warning(
            "VM Updated",
            format!(
                "VM '{}' updated successfully ({} change(s) applied).",
                desired.name,
                plan.len()
            ),
        );
        Response::ok(Some(state), diags)
    }

    /// Power off (best effort), then unregister and delete the VM.
    ///
    /// On success the caller drops the VM from its own records.
    pub async fn delete(&self, state: &VmState) -> Response {
        let mut diags = Diagnostics::new();
        tracing::info!(vm = %state.name, "Deleting VM");

        if let Err(detail) = check_state(state) {
            diags.add_error("Invalid State", detail);
            return Response::failed(diags);
        }

        let plan = Plan::delete(&state.name);
        if !self.run_plan(&state.name, &plan, &mut diags).await {
            return Response::failed(diags);
        }

        tracing::info!(vm = %state.name, "VM deleted");
        diags.add_warning(
            "VM Deleted",
            format!("VM '{}' has been successfully deleted.", state.name),
        );
        Response::ok(None, diags)
    }

    /// Run every step in order. Returns false once an aborting step fails.
    async fn run_plan(&self, name: &str, plan: &Plan, diags: &mut Diagnostics) -> bool {
        for (index, step) in plan.steps().iter().enumerate() {
            tracing::debug!(
                vm = %name,
                step = index + 1,
                total = plan.len(),
                action = %step.action,
                "Running plan step"
            );

            let err = match self.executor.execute(&step.invocation).await {
                Ok(_) => continue,
                Err(e) => e,
            };

            match step.on_failure {
                OnFailure::Warn => {
                    tracing::warn!(vm = %name, action = %step.action, error = %err, "Step failed, continuing");
                    diags.add_warning(failure_summary(step.action), tolerated_detail(name, step, &err.detail()));
                }
                OnFailure::Abort => {
                    tracing::error!(
                        vm = %name,
                        action = %step.action,
                        error = %err,
                        skipped = plan.len() - index - 1,
                        "Step failed, aborting plan"
                    );
                    diags.add_error(
                        failure_summary(step.action),
                        format!(
                            "Command failed for VM '{}': {}, Error: {}",
                            name,
                            step.invocation.command_line(self.executor.program()),
                            err.detail()
                        ),
                    );
                    return false;
                }
            }
        }
        true
    }
}

fn failure_summary(action: Action) -> &'static str {
    match action {
        Action::Register => "Error creating VM",
        Action::SetResources => "Error configuring VM resources",
        Action::AddStorageController => "Error adding storage controller",
        Action::AttachMedium => "Error attaching install medium",
        Action::SetNicKind | Action::SetBridgeAdapter => "Error configuring network adapter",
        Action::PowerOff => "VM Power Off Failed",
        Action::Unregister => "Error deleting VM",
    }
}

fn tolerated_detail(name: &str, step: &Step, detail: &str) -> String {
    match step.action {
        Action::PowerOff => format!(
            "Could not power off VM '{}'. It may not be running. ({})",
            name,
            detail.trim()
        ),
        _ => format!(
            "Could not {} for VM '{}': {}",
            step.action,
            name,
            detail.trim()
        ),
    }
}

fn warn_bridged_without_interface(config: &VmConfig, diags: &mut Diagnostics) {
    if config.is_bridged_without_interface() {
        tracing::warn!(vm = %config.name, "Bridged adapter has no host interface");
        diags.add_warning(
            "Bridged Adapter Without Host Interface",
            format!(
                "VM '{}' uses a bridged adapter but host_interface is empty; \
                 the bridge adapter was not set.",
                config.name
            ),
        );
    }
}

fn check_state(state: &VmState) -> Result<(), String> {
    if state.name.trim().is_empty() {
        return Err("state has an empty VM name".to_string());
    }
    Ok(())
}

fn missing_iso_detail(path: &Path) -> String {
    format!("The specified ISO file does not exist: {}", path.display())
}

async fn iso_exists(path: &Path) -> bool {
    tokio::fs::metadata(path).await.is_ok()
}
