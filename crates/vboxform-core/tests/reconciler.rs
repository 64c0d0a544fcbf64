//! Lifecycle tests for the reconciler against a scripted executor.

use std::path::PathBuf;
use tempfile::NamedTempFile;
use vboxform_core::{NetworkAdapterState, Reconciler, Severity, VmState};
use vboxform_vm::{MockExecutor, NetworkAdapterConfig, VmConfig};

fn iso() -> NamedTempFile {
    tempfile::Builder::new()
        .suffix(".iso")
        .tempfile()
        .expect("create temp iso")
}

fn config(iso: &NamedTempFile) -> VmConfig {
    VmConfig::builder()
        .name("web")
        .iso_path(iso.path())
        .memory_mb(2048)
        .cpu_count(2)
        .build()
        .expect("valid config")
}

fn state_with_adapter() -> VmState {
    VmState {
        name: "web".into(),
        iso_path: PathBuf::from("/isos/ubuntu.iso"),
        memory_mb: 2048,
        cpu_count: 2,
        network_adapter: Some(NetworkAdapterState {
            kind: "bridged".into(),
            device: Some("virtio".into()),
            host_interface: Some("eth0".into()),
            ipv4_address: None,
        }),
    }
}

fn args(mock: &MockExecutor) -> Vec<Vec<String>> {
    mock.invocations()
        .iter()
        .map(|inv| {
            inv.args()
                .iter()
                .map(|arg| arg.to_string_lossy().into_owned())
                .collect()
        })
        .collect()
}

// ============================================================================
// Create
// ============================================================================

#[tokio::test]
async fn test_create_runs_five_steps_in_order() {
    let iso = iso();
    let mock = MockExecutor::new();
    let reconciler = Reconciler::new(&mock);

    let response = reconciler.create(&config(&iso)).await;

    assert!(response.is_success());
    assert_eq!(
        mock.subcommands(),
        vec!["createvm", "modifyvm", "storagectl", "storageattach", "modifyvm"]
    );
    let args = args(&mock);
    assert_eq!(args[0], ["createvm", "--name", "web", "--register"]);
    assert_eq!(args[4], ["modifyvm", "web", "--nic1", "nat"]);
    assert_eq!(
        args[3].last().map(String::as_str),
        Some(iso.path().to_str().unwrap())
    );
}

#[tokio::test]
async fn test_create_bridged_adds_sixth_step() {
    let iso = iso();
    let mut config = config(&iso);
    config.network_adapter = Some(NetworkAdapterConfig::bridged("eth0"));
    let mock = MockExecutor::new();

    let response = Reconciler::new(&mock).create(&config).await;

    assert!(response.is_success());
    assert_eq!(mock.call_count(), 6);
    assert_eq!(
        args(&mock)[5],
        ["modifyvm", "web", "--bridgeadapter1", "eth0"]
    );
}

#[tokio::test]
async fn test_create_bridged_without_interface_warns_and_skips_step() {
    let iso = iso();
    let mut config = config(&iso);
    config.network_adapter = Some(NetworkAdapterConfig::bridged(""));
    let mock = MockExecutor::new();

    let response = Reconciler::new(&mock).create(&config).await;

    assert!(response.is_success());
    assert_eq!(mock.call_count(), 5);
    assert!(response
        .diagnostics
        .warnings()
        .any(|d| d.summary == "Bridged Adapter Without Host Interface"));
    let adapter = response.state.unwrap().network_adapter.unwrap();
    assert_eq!(adapter.kind, "bridged");
    assert_eq!(adapter.host_interface, None);
}

#[tokio::test]
async fn test_create_missing_iso_runs_nothing() {
    let mock = MockExecutor::new();
    let config = VmConfig::builder()
        .name("web")
        .iso_path("/nonexistent/ubuntu.iso")
        .build()
        .unwrap();

    let response = Reconciler::new(&mock).create(&config).await;

    assert_eq!(mock.call_count(), 0);
    assert_eq!(response.diagnostics.len(), 1);
    let diag = response.diagnostics.iter().next().unwrap();
    assert_eq!(diag.severity, Severity::Error);
    assert_eq!(diag.summary, "Invalid ISO Path");
    assert!(diag.detail.contains("/nonexistent/ubuntu.iso"));
    assert!(response.state.is_none());
}

#[tokio::test]
async fn test_create_invalid_config_runs_nothing() {
    let iso = iso();
    let mut config = config(&iso);
    config.cpu_count = 0;
    let mock = MockExecutor::new();

    let response = Reconciler::new(&mock).create(&config).await;

    assert_eq!(mock.call_count(), 0);
    assert!(response.diagnostics.has_error());
    assert_eq!(
        response.diagnostics.iter().next().unwrap().summary,
        "Invalid Configuration"
    );
}

#[tokio::test]
async fn test_create_short_circuits_on_failure() {
    let iso = iso();
    let stderr = "VBoxManage: error: Could not find a storage controller named 'SATA Controller'";
    let mock = MockExecutor::with_responses(vec![
        Ok(String::new()),
        Ok(String::new()),
        Err(stderr.to_string()),
    ]);

    let response = Reconciler::new(&mock).create(&config(&iso)).await;

    assert_eq!(mock.call_count(), 3);
    assert_eq!(
        mock.subcommands(),
        vec!["createvm", "modifyvm", "storagectl"]
    );
    assert!(response.state.is_none());
    let errors: Vec<_> = response.diagnostics.errors().collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].detail.contains(stderr));
    assert_eq!(response.diagnostics.warnings().count(), 0);
}

#[tokio::test]
async fn test_create_failure_names_configured_program() {
    let iso = iso();
    let mock = MockExecutor::with_responses(vec![Err("VBoxManage: error: boom".into())])
        .with_program("/opt/VirtualBox/VBoxManage");

    let response = Reconciler::new(&mock).create(&config(&iso)).await;

    let error = response.diagnostics.errors().next().unwrap();
    assert!(error
        .detail
        .contains("/opt/VirtualBox/VBoxManage createvm --name web --register"));
}

#[tokio::test]
async fn test_create_first_step_failure() {
    let iso = iso();
    let mock = MockExecutor::with_responses(vec![Err(
        "VBoxManage: error: Machine settings file already exists".into(),
    )]);

    let response = Reconciler::new(&mock).create(&config(&iso)).await;

    assert_eq!(mock.call_count(), 1);
    assert_eq!(
        response.diagnostics.errors().next().unwrap().summary,
        "Error creating VM"
    );
}

#[tokio::test]
async fn test_create_echoes_config_into_state() {
    let iso = iso();
    let mut config = config(&iso);
    config.network_adapter = Some(NetworkAdapterConfig {
        kind: "bridged".into(),
        device: Some("82540EM".into()),
        host_interface: Some("eth0".into()),
    });
    let mock = MockExecutor::new();

    let response = Reconciler::new(&mock).create(&config).await;

    let state = response.state.expect("state on success");
    assert_eq!(state.name, config.name);
    assert_eq!(state.iso_path, config.iso_path);
    assert_eq!(state.memory_mb, 2048);
    assert_eq!(state.cpu_count, 2);
    let adapter = state.network_adapter.unwrap();
    assert_eq!(adapter.kind, "bridged");
    assert_eq!(adapter.device.as_deref(), Some("82540EM"));
    assert_eq!(adapter.host_interface.as_deref(), Some("eth0"));
    assert_eq!(adapter.ipv4_address, None);

    let warnings: Vec<_> = response.diagnostics.warnings().collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].summary, "VM Created");
}

#[tokio::test]
async fn test_create_without_adapter_has_no_adapter_state() {
    let iso = iso();
    let response = Reconciler::new(MockExecutor::new())
        .create(&config(&iso))
        .await;
    assert!(response.state.unwrap().network_adapter.is_none());
}

// ============================================================================
// Read
// ============================================================================

#[tokio::test]
async fn test_read_sets_reported_address() {
    let mock = MockExecutor::with_responses(vec![Ok("Value: 192.168.1.50\n".into())]);
    let state = state_with_adapter();

    let response = Reconciler::new(&mock).read(&state).await;

    assert!(response.diagnostics.is_empty());
    assert_eq!(
        args(&mock),
        vec![vec![
            "guestproperty",
            "get",
            "web",
            "/VirtualBox/GuestInfo/Net/0/V4/IP"
        ]]
    );
    let refreshed = response.state.unwrap();
    assert_eq!(refreshed.ipv4_address(), Some("192.168.1.50"));

    let mut expected = state.clone();
    expected.network_adapter.as_mut().unwrap().ipv4_address = Some("192.168.1.50".into());
    assert_eq!(refreshed, expected);
}

#[tokio::test]
async fn test_read_without_value_leaves_address() {
    let mock = MockExecutor::with_responses(vec![Ok("No value set!\n".into())]);
    let mut state = state_with_adapter();
    state.network_adapter.as_mut().unwrap().ipv4_address = Some("10.0.0.7".into());

    let response = Reconciler::new(&mock).read(&state).await;

    assert!(response.diagnostics.is_empty());
    assert_eq!(response.state.unwrap(), state);
}

#[tokio::test]
async fn test_read_query_failure_is_fatal() {
    let mock = MockExecutor::with_responses(vec![Err(
        "VBoxManage: error: Could not find a registered machine named 'web'".into(),
    )]);

    let response = Reconciler::new(&mock).read(&state_with_adapter()).await;

    assert!(response.diagnostics.has_error());
    assert!(response.state.is_none());
    let error = response.diagnostics.errors().next().unwrap();
    assert_eq!(error.summary, "Error retrieving VM IP");
    assert!(error.detail.contains("Could not find a registered machine"));
}

#[tokio::test]
async fn test_read_without_adapter_still_queries() {
    let mock = MockExecutor::with_responses(vec![Ok("Value: 10.0.2.15\n".into())]);
    let mut state = state_with_adapter();
    state.network_adapter = None;

    let response = Reconciler::new(&mock).read(&state).await;

    assert_eq!(mock.call_count(), 1);
    assert_eq!(mock.subcommands(), vec!["guestproperty"]);
    assert!(response.diagnostics.is_empty());
    assert_eq!(response.state.unwrap(), state);
}

#[tokio::test]
async fn test_read_without_adapter_reports_missing_vm() {
    let mock = MockExecutor::with_responses(vec![Err(
        "VBoxManage: error: Could not find a registered machine named 'web'".into(),
    )]);
    let mut state = state_with_adapter();
    state.network_adapter = None;

    let response = Reconciler::new(&mock).read(&state).await;

    assert_eq!(mock.call_count(), 1);
    assert!(!response.is_success());
    assert!(response.state.is_none());
    let error = response.diagnostics.errors().next().unwrap();
    assert_eq!(error.summary, "Error retrieving VM IP");
    assert!(error.detail.contains("Could not find a registered machine named 'web'"));
}

// ============================================================================
// Update
// ============================================================================

#[tokio::test]
async fn test_update_resources_in_place() {
    let iso = iso();
    let prior = VmState::from_config(&config(&iso));
    let mut desired = config(&iso);
    desired.memory_mb = 4096;
    let mock = MockExecutor::new();

    let response = Reconciler::new(&mock).update(&prior, &desired).await;

    assert!(response.is_success());
    assert_eq!(
        args(&mock),
        vec![vec!["modifyvm", "web", "--memory", "4096", "--cpus", "2"]]
    );
    assert_eq!(response.state.unwrap().memory_mb, 4096);
    assert!(response
        .diagnostics
        .warnings()
        .any(|d| d.summary == "VM Updated"));
}

#[tokio::test]
async fn test_update_unchanged_runs_nothing() {
    let iso = iso();
    let config = config(&iso);
    let prior = VmState::from_config(&config);
    let mock = MockExecutor::new();

    let response = Reconciler::new(&mock).update(&prior, &config).await;

    assert!(response.is_success());
    assert_eq!(mock.call_count(), 0);
    assert_eq!(response.state.unwrap(), prior);
}

#[tokio::test]
async fn test_update_rename_requires_replacement() {
    let iso = iso();
    let prior = VmState::from_config(&config(&iso));
    let mut desired = config(&iso);
    desired.name = "api".into();
    let mock = MockExecutor::new();

    let response = Reconciler::new(&mock).update(&prior, &desired).await;

    assert_eq!(mock.call_count(), 0);
    assert_eq!(
        response.diagnostics.errors().next().unwrap().summary,
        "Replacement Required"
    );
}

#[tokio::test]
async fn test_update_missing_new_iso_runs_nothing() {
    let iso = iso();
    let prior = VmState::from_config(&config(&iso));
    let mut desired = config(&iso);
    desired.iso_path = PathBuf::from("/nonexistent/debian.iso");
    let mock = MockExecutor::new();

    let response = Reconciler::new(&mock).update(&prior, &desired).await;

    assert_eq!(mock.call_count(), 0);
    assert_eq!(
        response.diagnostics.errors().next().unwrap().summary,
        "Invalid ISO Path"
    );
}

#[tokio::test]
async fn test_update_keeps_address_when_network_unchanged() {
    let iso = iso();
    let mut config = config(&iso);
    config.network_adapter = Some(NetworkAdapterConfig::new("nat"));
    let mut prior = VmState::from_config(&config);
    prior.network_adapter.as_mut().unwrap().ipv4_address = Some("10.0.2.15".into());
    let mut desired = config.clone();
    desired.cpu_count = 4;

    let response = Reconciler::new(MockExecutor::new())
        .update(&prior, &desired)
        .await;

    assert_eq!(response.state.unwrap().ipv4_address(), Some("10.0.2.15"));
}

#[tokio::test]
async fn test_update_network_change_clears_address() {
    let iso = iso();
    let mut config = config(&iso);
    config.network_adapter = Some(NetworkAdapterConfig::new("nat"));
    let mut prior = VmState::from_config(&config);
    prior.network_adapter.as_mut().unwrap().ipv4_address = Some("10.0.2.15".into());
    let mut desired = config.clone();
    desired.network_adapter = Some(NetworkAdapterConfig::bridged("eth0"));
    let mock = MockExecutor::new();

    let response = Reconciler::new(&mock).update(&prior, &desired).await;

    assert_eq!(
        args(&mock),
        vec![
            vec!["modifyvm", "web", "--nic1", "bridged"],
            vec!["modifyvm", "web", "--bridgeadapter1", "eth0"],
        ]
    );
    assert_eq!(response.state.unwrap().ipv4_address(), None);
}

#[tokio::test]
async fn test_update_failure_surfaces_stderr() {
    let iso = iso();
    let prior = VmState::from_config(&config(&iso));
    let mut desired = config(&iso);
    desired.memory_mb = 8192;
    let stderr = "VBoxManage: error: The machine 'web' is already locked for a session";
    let mock = MockExecutor::with_responses(vec![Err(stderr.into())]);

    let response = Reconciler::new(&mock).update(&prior, &desired).await;

    assert!(response.state.is_none());
    assert!(response.diagnostics.errors().next().unwrap().detail.contains(stderr));
}

// ============================================================================
// Delete
// ============================================================================

#[tokio::test]
async fn test_delete_success() {
    let mock = MockExecutor::new();

    let response = Reconciler::new(&mock).delete(&state_with_adapter()).await;

    assert!(response.is_success());
    assert_eq!(
        args(&mock),
        vec![
            vec!["controlvm", "web", "poweroff"],
            vec!["unregistervm", "web", "--delete"],
        ]
    );
    let warnings: Vec<_> = response.diagnostics.warnings().collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].summary, "VM Deleted");
}

#[tokio::test]
async fn test_delete_power_off_failure_is_warning() {
    let mock = MockExecutor::with_responses(vec![
        Err("VBoxManage: error: Machine 'web' is not currently running".into()),
        Ok(String::new()),
    ]);

    let response = Reconciler::new(&mock).delete(&state_with_adapter()).await;

    assert_eq!(mock.call_count(), 2);
    assert!(response.is_success());
    assert_eq!(response.diagnostics.errors().count(), 0);
    let summaries: Vec<_> = response
        .diagnostics
        .warnings()
        .map(|d| d.summary.as_str())
        .collect();
    assert_eq!(summaries, ["VM Power Off Failed", "VM Deleted"]);
}

#[tokio::test]
async fn test_delete_unregister_failure_is_fatal() {
    let stderr = "VBoxManage: error: Cannot unregister the machine 'web' while it is locked";
    for power_off in [Ok(String::new()), Err("not running".to_string())] {
        let mock = MockExecutor::with_responses(vec![power_off, Err(stderr.into())]);

        let response = Reconciler::new(&mock).delete(&state_with_adapter()).await;

        assert!(!response.is_success());
        let error = response.diagnostics.errors().next().unwrap();
        assert_eq!(error.summary, "Error deleting VM");
        assert!(error.detail.contains(stderr));
        assert!(!response
            .diagnostics
            .warnings()
            .any(|d| d.summary == "VM Deleted"));
    }
}
