//! Tests for the command worker and the dispatcher's generic paths:
//! ack ordering, decode/validate failures, shell, service, and reboot.

#![allow(clippy::expect_used)]

use device_common::REBOOT_PENDING;
use device_control::application::services::worker;
use device_control::domain::Platform;
use device_control::infra::device_config::JsonDeviceStore;
use serde_json::json;

use crate::helpers::{err_output, ok_output, payload};
use crate::mocks::FakeHost;

fn write_device_config(host: &FakeHost) {
    host.write(
        &host.settings.paths.device_config_file(),
        r#"{"assetcode":"A1","mqtturl":"tcp://broker:1883","custom":"keep"}"#,
    );
}

// ── Ordering ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn ack_is_published_before_the_result() {
    let host = FakeHost::new();
    host.runner.respond("echo hi", ok_output(b"hi\n"));

    worker::handle(&host, &payload("bash", "", json!({"cmd": "echo hi"}))).await;

    let sent = host.publisher.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].0, "svc/proj/A1/bwc/control/request/ack");
    assert_eq!(sent[0].1, json!({"requestId": "req-1", "message": "ok"}));
    assert_eq!(sent[1].0, "svc/proj/A1/bwc/control/response");
    let result = &sent[1].1;
    assert_eq!(result["requestId"], "req-1");
    assert_eq!(result["status"]["succeed"], 1);
    assert_eq!(result["result"]["message"], "hi");
    assert!(host.runner.ran("sh -c echo hi"));
}

#[tokio::test]
async fn unparsable_payload_is_dropped_without_reply() {
    let host = FakeHost::new();

    worker::handle(&host, b"not json").await;

    assert!(host.publisher.sent().is_empty());
}

#[tokio::test]
async fn queued_commands_run_in_arrival_order() {
    let host = FakeHost::new();
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    tx.send(payload("bash", "", json!({"cmd": "first"}))).expect("send");
    tx.send(payload("bash", "", json!({"cmd": "second"}))).expect("send");
    drop(tx);

    worker::run(&host, rx).await;

    assert_eq!(host.runner.calls(), ["sh -c first", "sh -c second"]);
    assert_eq!(host.publisher.on("request/ack").len(), 2);
    assert_eq!(host.publisher.on("response").len(), 2);
}

// ── Decode and validate ───────────────────────────────────────────────────────

#[tokio::test]
async fn unknown_command_is_404() {
    let host = FakeHost::new();

    worker::handle(&host, &payload("ftp", "get", json!({}))).await;

    let results = host.publisher.on("response");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["status"]["succeed"], 0);
    assert_eq!(results[0]["status"]["statusCode"], 404);
    assert!(host.runner.calls().is_empty());
}

#[tokio::test]
async fn unknown_subcommand_is_404() {
    let host = FakeHost::new();

    worker::handle(&host, &payload("deploy", "appRestart", json!({"appName": "cam"}))).await;

    assert_eq!(host.publisher.on("response")[0]["status"]["statusCode"], 404);
}

#[tokio::test]
async fn missing_required_field_is_400() {
    let host = FakeHost::new();

    worker::handle(&host, &payload("systemd", "", json!({"cmd": "restart"}))).await;

    let result = &host.publisher.on("response")[0];
    assert_eq!(result["status"]["statusCode"], 400);
    assert_eq!(result["status"]["errMsg"], "This is not the correct form.");
    assert!(host.runner.calls().is_empty());
}

#[tokio::test]
async fn wrongly_typed_payload_decodes_to_empty_fields() {
    let host = FakeHost::new();

    // `cmd` must be a string; the decode falls back to defaults and validation rejects it.
    worker::handle(&host, &payload("bash", "", json!({"cmd": 42}))).await;

    assert_eq!(host.publisher.on("response")[0]["status"]["statusCode"], 400);
}

// ── Shell and service ─────────────────────────────────────────────────────────

#[tokio::test]
async fn failing_shell_command_reports_output() {
    let host = FakeHost::new();
    host.runner.respond("false", err_output(1, b"nope"));

    worker::handle(&host, &payload("bash", "", json!({"cmd": "false"}))).await;

    let result = &host.publisher.on("response")[0];
    assert_eq!(result["status"]["succeed"], 0);
    assert_eq!(result["status"]["statusCode"], 400);
    assert_eq!(result["result"]["message"], "nope");
}

#[tokio::test]
async fn service_command_runs_systemctl() {
    let host = FakeHost::new();

    worker::handle(
        &host,
        &payload("systemd", "", json!({"cmd": "restart", "service": "ssh"})),
    )
    .await;

    assert!(host.runner.ran("systemctl restart ssh"));
    assert_eq!(host.publisher.on("response")[0]["status"]["succeed"], 1);
}

#[tokio::test]
async fn service_command_is_rejected_on_windows() {
    let mut host = FakeHost::new();
    host.settings.platform = Platform::Windows;

    worker::handle(
        &host,
        &payload("systemd", "", json!({"cmd": "restart", "service": "ssh"})),
    )
    .await;

    assert!(host.runner.calls().is_empty());
    assert_eq!(host.publisher.on("response")[0]["status"]["statusCode"], 400);
}

// ── Reboot ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn reboot_defers_the_reply_and_persists_the_marker() {
    let host = FakeHost::new();
    write_device_config(&host);

    worker::handle(&host, &payload("bash", "", json!({"cmd": "reboot"}))).await;

    // Only the ack goes out now.
    assert_eq!(host.publisher.on("request/ack").len(), 1);
    assert!(host.publisher.on("response").is_empty());
    assert!(host.runner.ran("sh -c reboot"));

    let config = JsonDeviceStore::load_sync(&host.settings.paths.device_config_file())
        .expect("load device config");
    assert_eq!(config.reboot, REBOOT_PENDING);
    assert_eq!(config.requestid, "req-1");
    assert_eq!(config.mqtturl, "tcp://broker:1883");
}

#[tokio::test]
async fn reboot_is_refused_when_the_marker_cannot_be_written() {
    let host = FakeHost::new();
    // No device config file: the marker cannot be persisted.

    worker::handle(&host, &payload("bash", "", json!({"cmd": "reboot"}))).await;

    assert!(!host.runner.ran("reboot"));
    let result = &host.publisher.on("response")[0];
    assert_eq!(result["status"]["statusCode"], 500);
}
