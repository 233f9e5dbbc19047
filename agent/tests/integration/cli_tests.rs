//! Integration tests for the command line surface.

#![allow(clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn device_control() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("device-control"));
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_version_subcommand_prints_name_and_version() {
    device_control()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("device-control "))
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_help_lists_commands_and_settings() {
    device_control()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("--root-dir"));
}

#[test]
fn test_unknown_platform_is_rejected_by_clap() {
    device_control()
        .args(["--platform", "beos", "version"])
        .assert()
        .code(2);
}

#[test]
fn test_run_without_device_config_fails() {
    let dir = TempDir::new().expect("tempdir");

    device_control()
        .arg("--root-dir")
        .arg(dir.path())
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("reading device config"));
}

#[test]
fn test_run_with_unsupported_broker_scheme_fails_before_connecting() {
    let dir = TempDir::new().expect("tempdir");
    let config_dir = dir.path().join("device.config");
    std::fs::create_dir_all(&config_dir).expect("mkdir");
    std::fs::write(
        config_dir.join("config.json"),
        r#"{"assetcode":"A1","servicecode":"svc","projectcode":"proj","mqtturl":"http://broker:80"}"#,
    )
    .expect("write config");

    device_control()
        .arg("--root-dir")
        .arg(dir.path())
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("http"));
}

#[test]
fn test_log_file_receives_the_error() {
    let dir = TempDir::new().expect("tempdir");
    let log = dir.path().join("agent.log");

    device_control()
        .arg("--root-dir")
        .arg(dir.path())
        .arg("--log-file")
        .arg(&log)
        .assert()
        .failure();

    let text = std::fs::read_to_string(&log).expect("log written");
    assert!(text.contains("device-control stopped"), "{text}");
}
