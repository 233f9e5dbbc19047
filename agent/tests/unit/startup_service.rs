//! Tests for the startup sequence: deferred reboot replies and runtime info.

#![allow(clippy::expect_used)]

use device_common::REBOOT_COMPLETED;
use device_control::application::services::startup;
use device_control::infra::device_config::JsonDeviceStore;

use crate::mocks::FakeHost;

fn write_device_config(host: &FakeHost, reboot: &str, request: &str) {
    host.write(
        &host.settings.paths.device_config_file(),
        &format!(
            r#"{{"assetcode":"A1","mqtturl":"tcp://broker:1883","reboot":"{reboot}","requestid":"{request}","site":"plant-3"}}"#
        ),
    );
}

#[tokio::test]
async fn pending_reboot_is_reported_once_and_cleared() {
    let host = FakeHost::new();
    write_device_config(&host, "rebooting", "req-9");

    assert!(startup::complete_reboot(&host).await.expect("complete"));

    let replies = host.publisher.on("response");
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0]["requestId"], "req-9");
    assert_eq!(replies[0]["result"]["command"], "bash");
    assert_eq!(replies[0]["result"]["subCommand"], "reboot");
    assert_eq!(replies[0]["result"]["message"], "reboot completed.");

    let config = JsonDeviceStore::load_sync(&host.settings.paths.device_config_file())
        .expect("load device config");
    assert_eq!(config.reboot, REBOOT_COMPLETED);
    assert_eq!(config.requestid, "");
    let raw = std::fs::read_to_string(host.settings.paths.device_config_file()).expect("read");
    assert!(raw.contains("plant-3"), "unknown keys survive: {raw}");

    assert!(!startup::complete_reboot(&host).await.expect("second run"));
    assert_eq!(host.publisher.on("response").len(), 1);
}

#[tokio::test]
async fn unsent_reboot_reply_keeps_the_marker() {
    let host = FakeHost::new();
    write_device_config(&host, "rebooting", "req-9");
    host.publisher.go_offline();

    assert!(!startup::complete_reboot(&host).await.expect("complete"));

    let config = JsonDeviceStore::load_sync(&host.settings.paths.device_config_file())
        .expect("load device config");
    assert_eq!(config.reboot, "rebooting");
    assert_eq!(config.requestid, "req-9");
}

#[tokio::test]
async fn nothing_is_published_without_a_pending_reboot() {
    let host = FakeHost::new();
    write_device_config(&host, "completed", "");

    assert!(!startup::complete_reboot(&host).await.expect("complete"));
    assert!(host.publisher.sent().is_empty());
}

#[tokio::test]
async fn prepare_publishes_runtime_info() {
    let host = FakeHost::new();
    write_device_config(&host, "", "");
    host.write(&host.settings.paths.conda_bin().join("python3.9"), "");

    startup::prepare(&host).await.expect("prepare");

    let runtime = host.publisher.on("runtime");
    assert_eq!(runtime.len(), 1);
    assert_eq!(runtime[0]["python"][0], "python3.9");
    assert!(runtime[0]["bwcVersion"]["device-control"].is_string());
}

#[tokio::test]
async fn prepare_fails_when_the_device_state_is_unreadable() {
    let host = FakeHost::new();

    assert!(startup::prepare(&host).await.is_err());
    assert!(host.publisher.sent().is_empty());
}
