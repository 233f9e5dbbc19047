//! Infrastructure implementation of the `DeviceStateStore` port.
//!
//! The device configuration file is shared with other on-device tools, so
//! the reboot marker rewrite keeps every key it does not own.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use device_common::DeviceConfig;
use serde_json::{Map, Value};

use crate::application::ports::DeviceStateStore;
use crate::infra::fs::write_atomic;

/// `device.config/config.json` on disk.
pub struct JsonDeviceStore {
    path: PathBuf,
}

impl JsonDeviceStore {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Read the device configuration synchronously (used once at startup).
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or not valid JSON.
    pub fn load_sync(path: &Path) -> Result<DeviceConfig> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading device config {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("parsing device config {}", path.display()))
    }

    fn set_marker_sync(path: &Path, marker: &str, request_id: &str) -> Result<()> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading device config {}", path.display()))?;
        let mut doc: Map<String, Value> = serde_json::from_str(&content)
            .with_context(|| format!("parsing device config {}", path.display()))?;
        doc.insert("reboot".into(), Value::String(marker.to_string()));
        doc.insert("requestid".into(), Value::String(request_id.to_string()));
        let rendered = serde_json::to_string_pretty(&doc).context("serializing device config")?;
        write_atomic(path, &rendered)
    }
}

impl DeviceStateStore for JsonDeviceStore {
    async fn load(&self) -> Result<DeviceConfig> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || Self::load_sync(&path))
            .await
            .context("device config load task panicked")?
    }

    async fn set_reboot_marker(&self, marker: &str, request_id: &str) -> Result<()> {
        let path = self.path.clone();
        let (value, request) = (marker.to_string(), request_id.to_string());
        tokio::task::spawn_blocking(move || Self::set_marker_sync(&path, &value, &request))
            .await
            .context("device config write task panicked")??;
        tracing::info!(marker = %marker, request = %request_id, "reboot marker written");
        Ok(())
    }
}
