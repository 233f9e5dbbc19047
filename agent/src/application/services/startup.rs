//! Application service — work done once per process start, before commands are accepted.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use device_common::{CommandResult, REBOOT_COMPLETED, ResultEnvelope, RuntimeInfo, Status};

use crate::application::ports::{DeviceHost, DeviceStateStore, Publisher};
use crate::application::services::outbound::{now_millis, publish_json};
use crate::application::services::venv;

pub const REBOOT_COMPLETED_MESSAGE: &str = "reboot completed.";

/// Publish the deferred reply of a reboot requested by the previous process.
///
/// Returns whether a reply was published. The marker is cleared once the
/// reply has been queued by the broker client; the broker's acknowledgement
/// is not awaited. A reply that cannot be queued leaves the marker pending
/// for the next start.
///
/// # Errors
///
/// Returns an error if the device state cannot be read or the marker cannot be cleared.
pub async fn complete_reboot(host: &impl DeviceHost) -> Result<bool> {
    let config = host
        .device()
        .load()
        .await
        .context("failed to read device state")?;
    if !config.reboot_pending() {
        return Ok(false);
    }

    let mut result = CommandResult::new("bash", "reboot");
    result.message = REBOOT_COMPLETED_MESSAGE.to_string();
    result.updated_at = now_millis();
    let envelope = ResultEnvelope::single(
        &host.settings().device.asset_code,
        &config.requestid,
        result,
        Status::ok(),
    );
    let payload = serde_json::to_vec(&envelope).context("failed to encode reboot reply")?;
    if let Err(e) = host.publisher().publish(&host.topics().response(), payload).await {
        tracing::warn!(error = %format!("{e:#}"), "reboot reply not queued, marker kept");
        return Ok(false);
    }

    host.device()
        .set_reboot_marker(REBOOT_COMPLETED, "")
        .await
        .context("failed to clear reboot marker")?;
    tracing::info!(request = %config.requestid, "reboot completion reported");
    Ok(true)
}

/// Installed interpreters and the agent version.
pub fn runtime_info(host: &impl DeviceHost) -> RuntimeInfo {
    RuntimeInfo {
        python: venv::python_versions(host),
        bwc_version: BTreeMap::from([(
            env!("CARGO_PKG_NAME").to_string(),
            env!("CARGO_PKG_VERSION").to_string(),
        )]),
    }
}

/// Run every startup step in order.
///
/// Steps:
/// 1. Report a completed reboot
/// 2. Publish runtime info
/// 3. Ensure the base venv exists
///
/// Only step 1 is fatal; it must not be retried after commands start.
///
/// # Errors
///
/// Returns an error if the reboot marker cannot be handled.
pub async fn prepare(host: &impl DeviceHost) -> Result<()> {
    complete_reboot(host).await?;

    publish_json(host, &host.topics().runtime(), &runtime_info(host)).await;

    if let Err(e) = venv::ensure_base(host).await {
        tracing::warn!(error = %e, "base venv unavailable");
    }
    Ok(())
}
