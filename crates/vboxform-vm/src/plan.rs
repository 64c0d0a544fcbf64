//! Command plans: the ordered VBoxManage calls for each lifecycle operation.
//!
//! Plans are pure values built from configuration. Step order is fixed:
//! the VM must be registered before anything targets it by name, and the
//! storage controller must exist before a medium can be attached to it.

use crate::config::VmConfig;
use crate::error::PlanError;
use crate::invocation::Invocation;
use std::fmt;
use std::path::Path;

/// Name of the storage controller the install medium is attached to.
pub const STORAGE_CONTROLLER: &str = "SATA Controller";

/// What a plan step does, independent of its exact arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Register,
    SetResources,
    AddStorageController,
    AttachMedium,
    SetNicKind,
    SetBridgeAdapter,
    PowerOff,
    Unregister,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::Register => "register VM",
            Action::SetResources => "set memory and CPUs",
            Action::AddStorageController => "add storage controller",
            Action::AttachMedium => "attach install medium",
            Action::SetNicKind => "set network adapter kind",
            Action::SetBridgeAdapter => "set bridge adapter",
            Action::PowerOff => "power off",
            Action::Unregister => "unregister and delete",
        };
        f.write_str(s)
    }
}

/// How the reconciler treats a failed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnFailure {
    /// Record an error and skip every remaining step.
    Abort,
    /// Record a warning and carry on.
    Warn,
}

/// One command in a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub action: Action,
    pub invocation: Invocation,
    pub on_failure: OnFailure,
}

impl Step {
    fn abort(action: Action, invocation: Invocation) -> Self {
        Self {
            action,
            invocation,
            on_failure: OnFailure::Abort,
        }
    }

    fn warn(action: Action, invocation: Invocation) -> Self {
        Self {
            action,
            invocation,
            on_failure: OnFailure::Warn,
        }
    }
}

/// An ordered list of steps. Never reordered or deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    steps: Vec<Step>,
}

impl Plan {
    /// Register and configure a new VM.
    ///
    /// Five steps, plus a sixth (`--bridgeadapter1`) only for a bridged
    /// adapter with a non-empty host interface.
    pub fn create(config: &VmConfig) -> Self {
        let name = config.name.as_str();
        let mut steps = vec![
            Step::abort(
                Action::Register,
                Invocation::new(["createvm", "--name", name, "--register"]),
            ),
            set_resources(config),
            Step::abort(
                Action::AddStorageController,
                Invocation::new([
                    "storagectl",
                    name,
                    "--name",
                    STORAGE_CONTROLLER,
                    "--add",
                    "sata",
                    "--controller",
                    "IntelAhci",
                ]),
            ),
            attach_medium(name, &config.iso_path),
            set_nic_kind(name, config.network_kind()),
        ];

        if let Some(host_interface) = config.bridge_interface() {
            steps.push(set_bridge_adapter(name, host_interface));
        }

        Self { steps }
    }

    /// Apply the difference between `current` and `desired` in place.
    ///
    /// Renaming cannot be done in place and is rejected. An unchanged
    /// configuration yields an empty plan.
    pub fn update(current: &VmConfig, desired: &VmConfig) -> Result<Self, PlanError> {
        if current.name != desired.name {
            return Err(PlanError::RequiresReplacement { field: "name" });
        }

        let name = desired.name.as_str();
        let mut steps = Vec::new();

        if current.iso_path != desired.iso_path {
            steps.push(attach_medium(name, &desired.iso_path));
        }

        if current.memory_mb != desired.memory_mb || current.cpu_count != desired.cpu_count {
            steps.push(set_resources(desired));
        }

        if current.network_kind() != desired.network_kind()
            || current.bridge_interface() != desired.bridge_interface()
        {
            steps.push(set_nic_kind(name, desired.network_kind()));
            if let Some(host_interface) = desired.bridge_interface() {
                steps.push(set_bridge_adapter(name, host_interface));
            }
        }

        Ok(Self { steps })
    }

    /// Power off (tolerated failure), then unregister and delete (fatal).
    pub fn delete(name: &str) -> Self {
        Self {
            steps: vec![
                Step::warn(
                    Action::PowerOff,
                    Invocation::new(["controlvm", name, "poweroff"]),
                ),
                Step::abort(
                    Action::Unregister,
                    Invocation::new(["unregistervm", name, "--delete"]),
                ),
            ],
        }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn actions(&self) -> Vec<Action> {
        self.steps.iter().map(|step| step.action).collect()
    }

    /// Numbered listing of the steps as `program` would run them.
    pub fn render(&self, program: &Path) -> String {
        self.steps
            .iter()
            .enumerate()
            .map(|(i, step)| {
                format!(
                    "{}. {}: {}\n",
                    i + 1,
                    step.action,
                    step.invocation.command_line(program)
                )
            })
            .collect()
    }
}

fn set_resources(config: &VmConfig) -> Step {
    Step::abort(
        Action::SetResources,
        Invocation::new([
            "modifyvm".to_string(),
            config.name.clone(),
            "--memory".to_string(),
            config.memory_mb.to_string(),
            "--cpus".to_string(),
            config.cpu_count.to_string(),
        ]),
    )
}

fn attach_medium(name: &str, iso_path: &Path) -> Step {
    Step::abort(
        Action::AttachMedium,
        Invocation::new([
            "storageattach",
            name,
            "--storagectl",
            STORAGE_CONTROLLER,
            "--port",
            "0",
            "--device",
            "0",
            "--type",
            "dvddrive",
            "--medium",
        ])
        .arg(iso_path),
    )
}

fn set_nic_kind(name: &str, kind: &str) -> Step {
    Step::abort(
        Action::SetNicKind,
        Invocation::new(["modifyvm", name, "--nic1", kind]),
    )
}

fn set_bridge_adapter(name: &str, host_interface: &str) -> Step {
    Step::abort(
        Action::SetBridgeAdapter,
        Invocation::new(["modifyvm", name, "--bridgeadapter1", host_interface]),
    )
}
