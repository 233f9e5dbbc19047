//! Integration tests for the file-backed registry and device state stores.

#![allow(clippy::expect_used)]

use device_common::REBOOT_PENDING;
use device_control::application::ports::{DeviceStateStore, RegistryStore};
use device_control::domain::{AppRecord, RegistryError};
use device_control::infra::device_config::JsonDeviceStore;
use device_control::infra::registry::JsonRegistryStore;
use tempfile::TempDir;

fn registry(dir: &TempDir) -> JsonRegistryStore {
    JsonRegistryStore::new(dir.path().join("device.config").join("app.json"))
}

fn grouped(name: &str, id: &str, group: &str) -> AppRecord {
    let mut record = AppRecord::service(name, id, "vision");
    record.app_group_id = group.to_string();
    record
}

#[tokio::test]
async fn missing_registry_file_reads_as_empty() {
    let dir = TempDir::new().expect("tempdir");

    assert!(registry(&dir).load().await.expect("load").is_empty());
}

#[tokio::test]
async fn registry_add_remove_and_group_lookup() {
    let dir = TempDir::new().expect("tempdir");
    let store = registry(&dir);

    store.add(grouped("a", "1", "g1")).await.expect("add a");
    store.add(grouped("b", "2", "g1")).await.expect("add b");
    store.add(AppRecord::container("web", "3")).await.expect("add web");

    let group: Vec<_> = store
        .find_by_group("g1")
        .await
        .expect("group")
        .into_iter()
        .map(|r| r.app_name)
        .collect();
    assert_eq!(group, ["a", "b"]);

    assert_eq!(
        store.remove_by_name("a").await.expect("remove"),
        Some("1".to_string())
    );
    assert_eq!(store.remove_by_name("a").await.expect("remove again"), None);
    assert_eq!(store.load().await.expect("load").len(), 2);

    // A fresh store over the same file sees the same records.
    let reopened = JsonRegistryStore::new(store.path().to_path_buf());
    let names: Vec<_> = reopened
        .load()
        .await
        .expect("load")
        .into_iter()
        .map(|r| r.app_name)
        .collect();
    assert_eq!(names, ["b", "web"]);
}

#[tokio::test]
async fn registry_rejects_duplicate_names() {
    let dir = TempDir::new().expect("tempdir");
    let store = registry(&dir);
    store.add(AppRecord::service("cam", "1", "vision")).await.expect("add");

    let err = store
        .add(AppRecord::service("cam", "2", "vision"))
        .await
        .expect_err("duplicate");

    assert_eq!(
        err.downcast_ref::<RegistryError>(),
        Some(&RegistryError::AlreadyExists("cam".to_string()))
    );
    assert_eq!(store.load().await.expect("load").len(), 1);
}

#[tokio::test]
async fn interleaved_adds_are_not_lost() {
    let dir = TempDir::new().expect("tempdir");
    let store = registry(&dir);

    let (a, b, c, d) = tokio::join!(
        store.add(AppRecord::service("a", "1", "vision")),
        store.add(AppRecord::service("b", "2", "vision")),
        store.add(AppRecord::service("c", "3", "vision")),
        store.add(AppRecord::container("d", "4")),
    );
    for result in [a, b, c, d] {
        result.expect("add");
    }

    assert_eq!(store.load().await.expect("load").len(), 4);
}

#[tokio::test]
async fn reboot_marker_keeps_foreign_keys() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{"assetcode":"A1","mqtturl":"ssl://broker:8883","vendor":{"slot":4}}"#,
    )
    .expect("write");
    let store = JsonDeviceStore::new(path.clone());

    store
        .set_reboot_marker(REBOOT_PENDING, "req-7")
        .await
        .expect("set marker");

    let config = store.load().await.expect("load");
    assert!(config.reboot_pending());
    assert_eq!(config.requestid, "req-7");
    assert_eq!(config.mqtturl, "ssl://broker:8883");
    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).expect("read")).expect("parse");
    assert_eq!(raw["vendor"]["slot"], 4);
}

#[tokio::test]
async fn missing_device_config_is_an_error() {
    let dir = TempDir::new().expect("tempdir");
    let store = JsonDeviceStore::new(dir.path().join("config.json"));

    assert!(store.load().await.is_err());
    assert!(store.set_reboot_marker(REBOOT_PENDING, "r").await.is_err());
}
