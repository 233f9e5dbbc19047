//! Tests for the `virtualEnv` commands and the venv manager.

#![allow(clippy::expect_used)]

use device_control::application::services::{venv, worker};
use device_control::domain::{AppRecord, VenvError};
use serde_json::json;

use crate::helpers::payload;
use crate::mocks::FakeHost;

fn result(host: &FakeHost) -> serde_json::Value {
    host.publisher
        .on("response")
        .pop()
        .expect("a result was published")
}

#[tokio::test]
async fn create_runs_conda_and_installs_requirements() {
    let host = FakeHost::new();

    worker::handle(
        &host,
        &payload(
            "virtualEnv",
            "venvCreate",
            json!({
                "venvName": "vision",
                "binFile": "python",
                "runTime": "python3.10",
                "requirement": "# comment\nnumpy==1.26\n\nrequests\n",
            }),
        ),
    )
    .await;

    let result = result(&host);
    assert_eq!(result["status"]["succeed"], 1);
    assert_eq!(result["result"]["message"], "Created V-Env.");
    assert!(host.runner.ran("create -p"));
    assert!(host.runner.ran("python=3.10 -y"));
    let written =
        std::fs::read_to_string(host.venv_dir("vision").join("requirements.txt")).expect("read");
    assert_eq!(written, "numpy==1.26\nrequests\n");
}

#[tokio::test]
async fn failed_create_removes_the_partial_venv() {
    let host = FakeHost::new();
    host.runner.fail("pip install");

    worker::handle(
        &host,
        &payload(
            "virtualEnv",
            "venvCreate",
            json!({"venvName": "vision", "binFile": "python", "requirement": "numpy"}),
        ),
    )
    .await;

    assert_eq!(result(&host)["status"]["succeed"], 0);
    assert!(!host.venv_dir("vision").exists());
}

#[tokio::test]
async fn create_refuses_an_existing_venv_and_keeps_it() {
    let host = FakeHost::new();
    host.add_venv("vision");

    worker::handle(
        &host,
        &payload(
            "virtualEnv",
            "venvCreate",
            json!({"venvName": "vision", "binFile": "python"}),
        ),
    )
    .await;

    assert_eq!(result(&host)["status"]["errMsg"], "vision already exists.");
    assert!(host.venv_dir("vision").exists());
    assert!(host.runner.calls().is_empty());
}

#[tokio::test]
async fn delete_of_a_venv_in_use_is_409_and_touches_nothing() {
    let host = FakeHost::new();
    host.add_venv("vision");
    host.install(&[
        AppRecord::service("cam", "1", "vision"),
        AppRecord::service("gps", "2", "vision"),
    ]);

    worker::handle(
        &host,
        &payload("virtualEnv", "venvDelete", json!({"venvName": "vision"})),
    )
    .await;

    let result = result(&host);
    assert_eq!(result["status"]["statusCode"], 409);
    assert_eq!(result["status"]["errMsg"], "vision is used by cam, gps.");
    assert!(host.venv_dir("vision").exists());
}

#[tokio::test]
async fn delete_of_an_unused_venv_removes_it() {
    let host = FakeHost::new();
    host.add_venv("scratch");
    host.install(&[AppRecord::service("cam", "1", "vision")]);

    worker::handle(
        &host,
        &payload("virtualEnv", "venvDelete", json!({"venvName": "scratch"})),
    )
    .await;

    assert_eq!(result(&host)["result"]["message"], "Deleted V-Env.");
    assert!(!host.venv_dir("scratch").exists());
}

#[tokio::test]
async fn delete_is_refused_while_the_registry_is_unreadable() {
    let host = FakeHost::new();
    host.add_venv("vision");
    host.write(&host.settings.paths.registry_file(), "{ not json");

    let err = venv::delete_unused(&host, "vision")
        .await
        .expect_err("must refuse");

    assert!(matches!(err, VenvError::Io(_)));
    assert!(host.venv_dir("vision").exists());
}

#[tokio::test]
async fn unsafe_names_are_rejected() {
    let host = FakeHost::new();

    for name in ["..", "a/b", "*"] {
        let err = venv::delete_unused(&host, name).await.expect_err("must reject");
        assert_eq!(err, VenvError::InvalidName);
    }
}

#[tokio::test]
async fn update_uninstalls_removals_then_installs() {
    let host = FakeHost::new();
    host.add_venv("vision");

    worker::handle(
        &host,
        &payload(
            "virtualEnv",
            "venvUpdate",
            json!({"venvName": "vision", "requirement": "numpy\n-scikit-learn\n"}),
        ),
    )
    .await;

    assert_eq!(result(&host)["result"]["message"], "Updated V-Env.");
    let calls = host.runner.calls();
    let uninstall = calls
        .iter()
        .position(|c| c.ends_with("uninstall -y scikit-learn"))
        .expect("uninstall ran");
    let install = calls
        .iter()
        .position(|c| c.contains("pip install -r"))
        .expect("install ran");
    assert!(uninstall < install);
}

#[tokio::test]
async fn python_versions_lists_conda_interpreters() {
    let host = FakeHost::new();
    let bin = host.settings.paths.conda_bin();
    for name in ["python3.9", "python3", "python", "python3.9-config", "pip"] {
        host.write(&bin.join(name), "");
    }

    assert_eq!(venv::python_versions(&host), ["python3", "python3.9"]);
}
