//! Tests for `config/configFix`, `config/getConfig`, and `model/update`.

#![allow(clippy::expect_used)]

use device_control::application::services::worker;
use device_control::domain::AppRecord;
use serde_json::json;

use crate::helpers::payload;
use crate::mocks::FakeHost;

const CONFIG: &str = "{\n\t\"threshold\": 3,\n\t\"label\": \"cam\",\n\t\"model\": {\n\t\t\"file\": \"a.pt\"\n\t}\n}";

fn installed_cam() -> FakeHost {
    let host = FakeHost::new();
    host.install(&[AppRecord::service("cam", "11", "vision")]);
    host.write(&host.app_dir("cam", "11").join("config.json"), CONFIG);
    host
}

fn config_text(host: &FakeHost) -> String {
    std::fs::read_to_string(host.app_dir("cam", "11").join("config.json")).expect("read config")
}

#[tokio::test]
async fn fix_rewrites_the_file_and_publishes_a_snapshot() {
    let host = installed_cam();

    worker::handle(
        &host,
        &payload(
            "config",
            "configFix",
            json!({"appName": "cam", "parameter": {"threshold": 7, "model": {"file": "b.pt"}, "extra": 1}}),
        ),
    )
    .await;

    let text = config_text(&host);
    assert!(text.contains("\"threshold\": 7.0"), "{text}");
    assert!(text.contains("\"file\": \"b.pt\""), "{text}");
    assert!(!text.contains("extra"), "absent keys are ignored: {text}");

    let replies = host.publisher.on("response");
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0]["status"]["succeed"], 1);
    assert_eq!(replies[0]["result"]["appId"], "11");
    assert_eq!(replies[1]["result"]["subCommand"], "getConfig");
    assert_eq!(
        replies[1]["result"]["parameter"]["config.json"]["model"]["file"],
        "b.pt"
    );
}

#[tokio::test]
async fn type_mismatch_leaves_the_file_untouched() {
    let host = installed_cam();

    worker::handle(
        &host,
        &payload(
            "config",
            "configFix",
            json!({"appName": "cam", "parameter": {"threshold": 1, "model": "flat"}}),
        ),
    )
    .await;

    let result = &host.publisher.on("response")[0];
    assert_eq!(result["status"]["statusCode"], 400);
    assert_eq!(result["status"]["errMsg"], "Check [model] parameter");
    assert_eq!(config_text(&host), CONFIG);
}

#[tokio::test]
async fn empty_parameter_changes_nothing() {
    let host = installed_cam();

    worker::handle(
        &host,
        &payload("config", "configFix", json!({"appName": "cam", "parameter": {}})),
    )
    .await;

    let replies = host.publisher.on("response");
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0]["result"]["message"], "Not change.");
    assert_eq!(config_text(&host), CONFIG);
}

#[tokio::test]
async fn unsafe_file_name_is_rejected() {
    let host = installed_cam();

    worker::handle(
        &host,
        &payload(
            "config",
            "configFix",
            json!({"appName": "cam", "fileName": "../../etc/passwd", "parameter": {"a": 1}}),
        ),
    )
    .await;

    assert_eq!(host.publisher.on("response")[0]["status"]["statusCode"], 400);
}

#[tokio::test]
async fn get_returns_every_json_file() {
    let host = installed_cam();
    host.write(&host.app_dir("cam", "11").join("broken.json"), "{");
    host.write(&host.app_dir("cam", "11").join("notes.txt"), "x");

    worker::handle(&host, &payload("config", "getConfig", json!({"appName": "cam"}))).await;

    let result = &host.publisher.on("response")[0];
    assert_eq!(result["status"]["statusCode"], 200);
    let parameter = result["result"]["parameter"].as_object().expect("parameter");
    let names: Vec<_> = parameter.keys().cloned().collect();
    assert_eq!(names, ["config.json"]);
}

#[tokio::test]
async fn get_on_a_directory_without_configs_is_204() {
    let host = FakeHost::new();
    host.install(&[AppRecord::service("cam", "11", "vision")]);

    worker::handle(&host, &payload("config", "getConfig", json!({"appName": "cam"}))).await;

    let result = &host.publisher.on("response")[0];
    assert_eq!(result["status"]["succeed"], 1);
    assert_eq!(result["status"]["statusCode"], 204);
}

#[tokio::test]
async fn get_on_a_missing_application_is_404() {
    let host = FakeHost::new();

    worker::handle(
        &host,
        &payload("config", "getConfig", json!({"appName": "ghost", "appId": "9"})),
    )
    .await;

    let result = &host.publisher.on("response")[0];
    assert_eq!(result["status"]["succeed"], 0);
    assert_eq!(result["status"]["statusCode"], 404);
}

// ── Model update ──────────────────────────────────────────────────────────────

fn model_info(url: &str) -> serde_json::Value {
    json!({
        "appName": "cam",
        "modelId": "m-2",
        "modelName": "detector",
        "modelVersion": 2,
        "modelUrl": url,
        "modelFileKey": "model.file",
        "parameter": {"model": {"file": "b.pt"}},
    })
}

#[tokio::test]
async fn model_update_swaps_weights_and_restarts() {
    let host = installed_cam();
    host.artifacts.serve("http://repo.local/w/b.pt", b"weights".to_vec());

    worker::handle(&host, &payload("model", "update", model_info("http://repo.local/w/b.pt"))).await;

    let result = &host.publisher.on("response")[0];
    assert_eq!(result["status"]["succeed"], 1);
    assert_eq!(result["result"]["modelVersion"], 2);
    assert_eq!(
        result["result"]["parameter"]["config.json"]["model"]["file"],
        "b.pt"
    );
    assert!(host.app_dir("cam", "11").join("b.pt").exists());
    assert_eq!(host.services.calls(), ["stop cam", "start cam"]);
}

#[tokio::test]
async fn failed_model_download_still_restarts_the_app() {
    let host = installed_cam();

    worker::handle(&host, &payload("model", "update", model_info("http://repo.local/w/missing.pt"))).await;

    let result = &host.publisher.on("response")[0];
    assert_eq!(result["status"]["succeed"], 0);
    assert_eq!(config_text(&host), CONFIG);
    assert_eq!(host.services.calls(), ["stop cam", "start cam"]);
}
