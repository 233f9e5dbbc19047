//! MQTT broker client: the `Publisher` port and the inbound request pump.
//!
//! `connect` only builds the client; nothing touches the network until
//! [`RequestPump::run`] polls the event loop.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS, TlsConfiguration, Transport};
use tokio::sync::mpsc::UnboundedSender;

use crate::application::ports::Publisher;

const KEEP_ALIVE: Duration = Duration::from_secs(30);
/// Bounded wait for a publication to enter the client queue. The broker's
/// `PubAck` is handled by the event loop and not awaited here.
const PUBLISH_WAIT: Duration = Duration::from_secs(5);
/// Capacity of the client's request queue.
const QUEUE_CAPACITY: usize = 64;

// ── Endpoint ──────────────────────────────────────────────────────────────────

/// Broker address parsed from the device config `mqtturl`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerEndpoint {
    pub host: String,
    pub port: u16,
    pub tls: bool,
}

impl BrokerEndpoint {
    /// Parse `tcp://host:port` or `ssl://host:port`.
    ///
    /// # Errors
    ///
    /// Returns an error for other schemes or a missing host.
    pub fn parse(mqtt_url: &str) -> Result<Self> {
        let url = url::Url::parse(mqtt_url).with_context(|| format!("invalid mqtturl: {mqtt_url}"))?;
        let tls = match url.scheme() {
            "tcp" | "mqtt" => false,
            "ssl" | "tls" | "mqtts" => true,
            other => anyhow::bail!("unsupported broker scheme: {other}"),
        };
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .with_context(|| format!("mqtturl has no host: {mqtt_url}"))?
            .to_string();
        let port = url.port().unwrap_or(if tls { 8883 } else { 1883 });
        Ok(Self { host, port, tls })
    }
}

/// Credentials and TLS material for the broker connection.
#[derive(Debug, Clone, Default)]
pub struct BrokerAuth {
    pub username: Option<String>,
    pub password: Option<String>,
}

fn read_pem(cert_dir: &Path, name: &str) -> Result<Vec<u8>> {
    let path = cert_dir.join(name);
    std::fs::read(&path).with_context(|| format!("failed to read {}", path.display()))
}

/// Build client options for `endpoint`.
///
/// # Errors
///
/// Returns an error if a TLS endpoint is missing its certificate files.
pub fn options(
    endpoint: &BrokerEndpoint,
    client_id: &str,
    auth: &BrokerAuth,
    cert_dir: &Path,
) -> Result<MqttOptions> {
    let mut opts = MqttOptions::new(client_id, endpoint.host.clone(), endpoint.port);
    opts.set_keep_alive(KEEP_ALIVE);
    if endpoint.tls {
        let ca = read_pem(cert_dir, "rootCa.pem")?;
        let cert = read_pem(cert_dir, "cert.pem")?;
        let key = read_pem(cert_dir, "key.pem")?;
        opts.set_transport(Transport::Tls(TlsConfiguration::Simple {
            ca,
            alpn: None,
            client_auth: Some((cert, key)),
        }));
    } else if let Some(user) = &auth.username {
        opts.set_credentials(user.clone(), auth.password.clone().unwrap_or_default());
    }
    Ok(opts)
}

/// Create the publisher and the request pump for one broker connection.
#[must_use]
pub fn connect(opts: MqttOptions, request_topic: String) -> (MqttPublisher, RequestPump) {
    let (client, events) = AsyncClient::new(opts, QUEUE_CAPACITY);
    (
        MqttPublisher {
            client: client.clone(),
        },
        RequestPump {
            client,
            events,
            request_topic,
        },
    )
}

// ── Publisher ─────────────────────────────────────────────────────────────────

/// Publishes with QoS 1.
#[derive(Clone)]
pub struct MqttPublisher {
    client: AsyncClient,
}

impl Publisher for MqttPublisher {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        tokio::time::timeout(
            PUBLISH_WAIT,
            self.client.publish(topic, QoS::AtLeastOnce, false, payload),
        )
        .await
        .with_context(|| format!("publish to {topic} timed out"))?
        .with_context(|| format!("publish to {topic} failed"))
    }
}

// ── Inbound ───────────────────────────────────────────────────────────────────

/// Drives the MQTT event loop and forwards request payloads to the worker.
pub struct RequestPump {
    client: AsyncClient,
    events: EventLoop,
    request_topic: String,
}

impl RequestPump {
    /// Subscribe without holding `&self` across the await, so the pump
    /// future stays `Send`.
    async fn subscribe(client: AsyncClient, topic: String) -> Result<()> {
        tracing::info!(topic = %topic, "connected to broker, subscribing");
        client
            .subscribe(topic, QoS::AtLeastOnce)
            .await
            .context("failed to subscribe to request topic")
    }

    /// Poll until the broker acknowledges the first connection.
    ///
    /// # Errors
    ///
    /// Returns the connection error if the broker cannot be reached.
    pub async fn wait_connected(&mut self) -> Result<()> {
        loop {
            let event = self
                .events
                .poll()
                .await
                .context("failed to connect to broker")?;
            if let Event::Incoming(Packet::ConnAck(_)) = event {
                return Self::subscribe(self.client.clone(), self.request_topic.clone()).await;
            }
        }
    }

    /// Poll the broker until the connection fails.
    ///
    /// The request topic is subscribed again after every reconnect.
    ///
    /// # Errors
    ///
    /// Returns the connection error that ended the loop, or an error when the
    /// worker has gone away.
    pub async fn run(mut self, requests: UnboundedSender<Vec<u8>>) -> Result<()> {
        loop {
            let event = self.events.poll().await.context("broker connection lost")?;
            match event {
                Event::Incoming(Packet::ConnAck(_)) => {
                    Self::subscribe(self.client.clone(), self.request_topic.clone()).await?;
                }
                Event::Incoming(Packet::Publish(publish)) if publish.topic == self.request_topic => {
                    tracing::debug!(bytes = publish.payload.len(), "request received");
                    requests
                        .send(publish.payload.to_vec())
                        .context("worker channel closed")?;
                }
                _ => {}
            }
        }
    }
}
