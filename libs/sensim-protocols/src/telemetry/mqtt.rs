//! MQTT publisher
//!
//! The rumqttc event loop runs in its own task. A connection error flips the
//! publisher to disconnected and the loop retries with exponential backoff;
//! publishes fail fast while disconnected so the telemetry tick can move on.

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::publisher::Publisher;
use crate::error::PortError;
use crate::reconnect::{Backoff, ReconnectPolicy};

/// Broker connection settings; every field is optional in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub keep_alive_secs: u64,
    /// 0, 1 or 2; anything else means 1
    pub qos: u8,
    /// Request channel capacity between client and event loop
    pub capacity: usize,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            client_id: "simsrv".to_string(),
            username: None,
            password: None,
            keep_alive_secs: 30,
            qos: 1,
            capacity: 10,
        }
    }
}

impl MqttConfig {
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn qos(&self) -> QoS {
        match self.qos {
            0 => QoS::AtMostOnce,
            2 => QoS::ExactlyOnce,
            _ => QoS::AtLeastOnce,
        }
    }

    fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(&self.client_id, &self.host, self.port);
        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            options.set_credentials(username, password);
        }
        options.set_keep_alive(Duration::from_secs(self.keep_alive_secs.max(5)));
        options.set_clean_session(true);
        options
    }
}

pub struct MqttPublisher {
    client: AsyncClient,
    qos: QoS,
    endpoint: String,
    connected: Arc<AtomicBool>,
}

impl MqttPublisher {
    /// Create the client and spawn its event loop; connection happens in the background
    pub fn start(config: &MqttConfig, policy: ReconnectPolicy, token: CancellationToken) -> Self {
        let (client, eventloop) = AsyncClient::new(config.options(), config.capacity.max(1));
        let connected = Arc::new(AtomicBool::new(false));
        let endpoint = config.endpoint();

        tokio::spawn(drive_event_loop(
            eventloop,
            connected.clone(),
            Backoff::new(policy),
            endpoint.clone(),
            token,
        ));

        info!("MQTT publisher connecting to {}", endpoint);
        Self {
            client,
            qos: config.qos(),
            endpoint,
            connected,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }
}

async fn drive_event_loop(
    mut eventloop: rumqttc::EventLoop,
    connected: Arc<AtomicBool>,
    mut backoff: Backoff,
    endpoint: String,
    token: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            event = eventloop.poll() => match event {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    connected.store(true, Ordering::Relaxed);
                    backoff.reset();
                    info!("Connected to MQTT broker {}", endpoint);
                },
                Ok(notification) => {
                    debug!("MQTT event: {:?}", notification);
                },
                Err(e) => {
                    connected.store(false, Ordering::Relaxed);
                    let delay = backoff.next_delay();
                    warn!(
                        "MQTT connection to {} failed: {} (retry {} in {:?})",
                        endpoint,
                        e,
                        backoff.attempt(),
                        delay
                    );
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = tokio::time::sleep(delay) => {},
                    }
                },
            },
        }
    }
    connected.store(false, Ordering::Relaxed);
    debug!("MQTT event loop for {} stopped", endpoint);
}

#[async_trait]
impl Publisher for MqttPublisher {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), PortError> {
        if !self.is_connected() {
            return Err(PortError::Disconnected(self.endpoint.clone()));
        }
        self.client
            .publish(topic, self.qos, false, payload)
            .await
            .map_err(|e| PortError::Transport(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config: MqttConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.endpoint(), "localhost:1883");
        assert_eq!(config.qos(), QoS::AtLeastOnce);
        assert_eq!(config.client_id, "simsrv");
    }

    #[tokio::test]
    async fn test_publish_fails_fast_without_broker() {
        let config = MqttConfig {
            host: "127.0.0.1".into(),
            port: 1,
            ..Default::default()
        };
        let token = CancellationToken::new();
        let publisher = MqttPublisher::start(&config, ReconnectPolicy::default(), token.clone());
        let err = publisher
            .publish("campus/x", b"{}".to_vec())
            .await
            .unwrap_err();
        assert_eq!(err, PortError::Disconnected("127.0.0.1:1".into()));
        token.cancel();
    }
}
