//! Application service — the command worker.
//!
//! One worker drains the inbound queue in arrival order, so the registry and
//! the venv directory are only ever changed by one command at a time.

use device_common::{Ack, CommandEnvelope};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::application::ports::DeviceHost;
use crate::application::services::dispatcher::dispatch;
use crate::application::services::outbound::publish_json;

/// Handle queued request payloads until the sending side is dropped.
pub async fn run(host: &impl DeviceHost, mut inbox: UnboundedReceiver<Vec<u8>>) {
    tracing::info!("command worker started");
    while let Some(payload) = inbox.recv().await {
        handle(host, &payload).await;
    }
    tracing::info!("command queue closed, worker stopping");
}

/// Handle one request payload: ack, dispatch, then publish the replies.
///
/// Payloads that are not a command envelope are logged and dropped.
pub async fn handle(host: &impl DeviceHost, payload: &[u8]) {
    let envelope: CommandEnvelope = match serde_json::from_slice(payload) {
        Ok(env) => env,
        Err(e) => {
            tracing::error!(error = %e, bytes = payload.len(), "dropping unparsable request");
            return;
        }
    };
    let topics = host.topics();

    publish_json(host, &topics.ack(), &Ack::ok(&envelope.request_id)).await;

    let dispatched = dispatch(host, &envelope).await;
    if let Some(result) = &dispatched.result {
        tracing::info!(
            request = %envelope.request_id,
            succeeded = result.status.succeeded,
            code = result.status.status_code,
            "command finished"
        );
        publish_json(host, &topics.response(), result).await;
    }
    if let Some(config) = &dispatched.config_result {
        publish_json(host, &topics.response(), config).await;
    }
}
