//! Outbound publication helpers.

use serde::Serialize;

use crate::application::ports::{DeviceHost, Publisher};

/// Serialize `message` and publish it on `topic`.
///
/// Publication failures are logged, never propagated: a command's local
/// outcome does not depend on the broker accepting its reply.
pub async fn publish_json<T: Serialize>(host: &impl DeviceHost, topic: &str, message: &T) {
    let payload = match serde_json::to_vec(message) {
        Ok(p) => p,
        Err(e) => {
            tracing::error!(topic = %topic, error = %e, "failed to serialize message");
            return;
        }
    };
    if let Err(e) = host.publisher().publish(topic, payload).await {
        tracing::warn!(topic = %topic, error = %format!("{e:#}"), "publish failed");
    }
}

/// Milliseconds since the Unix epoch, for `updatedAt`.
#[must_use]
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
