// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/floodhub

//! MQTT client for the field link

use std::io::ErrorKind;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use rumqttc::{AsyncClient, ConnectReturnCode, ConnectionError, Event, EventLoop, MqttOptions, Packet, QoS};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{CommandSink, TransportError};
use crate::config::MqttConfig;
use crate::sensors::Ingestor;

/// Requests buffered between the client handle and the event loop
const REQUEST_CAPACITY: usize = 100;

/// Grace period for flushing the disconnect at shutdown
const DISCONNECT_GRACE: Duration = Duration::from_secs(2);

/// MQTT client wrapper
pub struct MqttClient {
    client: AsyncClient,
    connected: Arc<AtomicBool>,
    inbound: Vec<String>,
}

impl MqttClient {
    /// Connect with bounded retries. Each attempt waits at most
    /// `connect_timeout` for the broker's CONNACK.
    pub async fn connect(config: &MqttConfig) -> Result<(Self, EventLoop), TransportError> {
        let attempts = config.connect_attempts.max(1);

        for attempt in 1..=attempts {
            info!(
                "Connecting to MQTT broker {}:{} (attempt {}/{})",
                config.host, config.port, attempt, attempts
            );

            let (client, mut eventloop) = AsyncClient::new(options(config), REQUEST_CAPACITY);
            let result = tokio::time::timeout(config.connect_timeout(), wait_for_connack(&mut eventloop)).await;

            match result {
                Ok(Ok(())) => {
                    info!("MQTT connected to {}:{}", config.host, config.port);
                    let inbound = config.topics.inbound().iter().map(|t| t.to_string()).collect();
                    let mqtt = Self {
                        client,
                        connected: Arc::new(AtomicBool::new(true)),
                        inbound,
                    };
                    return Ok((mqtt, eventloop));
                }
                Ok(Err(e)) => warn!("MQTT connection failed: {}", describe(&e)),
                Err(_) => warn!("MQTT connection timed out after {:?}", config.connect_timeout()),
            }

            if attempt < attempts {
                tokio::time::sleep(config.connect_retry_delay()).await;
            }
        }

        error!("Could not connect to MQTT broker after {} attempts", attempts);
        Err(TransportError::Exhausted { attempts })
    }

    /// Subscribe to every inbound topic
    pub async fn subscribe_all(&self) -> Result<(), TransportError> {
        for topic in &self.inbound {
            self.client.subscribe(topic.as_str(), QoS::AtMostOnce).await?;
            info!("Subscribed to MQTT topic: {}", topic);
        }
        Ok(())
    }

    /// Drive the connection: dispatch inbound messages, track connectivity and
    /// resubscribe after every reconnect.
    pub fn spawn_event_loop(
        &self,
        mut eventloop: EventLoop,
        ingestor: Ingestor,
        reconnect_delay: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        let client = self.client.clone();
        let connected = self.connected.clone();
        let inbound = self.inbound.clone();

        tokio::spawn(async move {
            'events: loop {
                let event = tokio::select! {
                    event = eventloop.poll() => event,
                    _ = shutdown.recv() => break 'events,
                };

                match event {
                    Ok(Event::Incoming(Packet::Publish(msg))) => {
                        ingestor.handle(&msg.topic, &msg.payload);
                    }
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        if !connected.swap(true, Ordering::SeqCst) {
                            info!("MQTT reconnected");
                        }
                        for topic in &inbound {
                            if let Err(e) = client.try_subscribe(topic.as_str(), QoS::AtMostOnce) {
                                warn!("Resubscribe to {} failed: {}", topic, e);
                            }
                        }
                    }
                    Ok(Event::Incoming(Packet::Disconnect)) => {
                        connected.store(false, Ordering::SeqCst);
                        warn!("Broker sent disconnect");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        let e = TransportError::from(e);
                        if connected.swap(false, Ordering::SeqCst) {
                            warn!("MQTT connection lost: {}", describe(&e));
                        } else {
                            debug!("MQTT still disconnected: {}", describe(&e));
                        }
                        tokio::select! {
                            _ = tokio::time::sleep(reconnect_delay) => {}
                            _ = shutdown.recv() => break 'events,
                        }
                    }
                }
            }

            connected.store(false, Ordering::SeqCst);
            if client.try_disconnect().is_ok() {
                let _ = tokio::time::timeout(DISCONNECT_GRACE, async {
                    while eventloop.poll().await.is_ok() {}
                })
                .await;
            }
            info!("MQTT disconnected");
        })
    }
}

#[async_trait]
impl CommandSink for MqttClient {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        self.client.try_publish(topic, QoS::AtMostOnce, false, payload)?;
        Ok(())
    }
}

fn client_id(config: &MqttConfig) -> String {
    if config.client_id.is_empty() {
        format!("floodhub-{}", Uuid::new_v4().simple())
    } else {
        config.client_id.clone()
    }
}

fn options(config: &MqttConfig) -> MqttOptions {
    let mut options = MqttOptions::new(client_id(config), &config.host, config.port);
    options.set_keep_alive(Duration::from_secs(config.keep_alive_secs.max(5)));

    if let (Some(username), Some(password)) = (&config.username, &config.password) {
        options.set_credentials(username, password);
    }
    options
}

async fn wait_for_connack(eventloop: &mut EventLoop) -> Result<(), TransportError> {
    loop {
        match eventloop.poll().await? {
            Event::Incoming(Packet::ConnAck(ack)) if ack.code == ConnectReturnCode::Success => return Ok(()),
            Event::Incoming(Packet::ConnAck(ack)) => return Err(TransportError::Refused(format!("{:?}", ack.code))),
            _ => {}
        }
    }
}

/// Operator-facing description of a transport failure
fn describe(error: &TransportError) -> String {
    match error {
        TransportError::Connection(ConnectionError::Io(e)) if e.kind() == ErrorKind::ConnectionRefused => {
            "connection refused (is the broker running?)".to_string()
        }
        TransportError::Connection(ConnectionError::Io(e)) => format!("network error: {}", e),
        TransportError::Connection(ConnectionError::ConnectionRefused(code)) => {
            format!("broker rejected connection: {:?}", code)
        }
        TransportError::Connection(ConnectionError::NetworkTimeout) => "network timeout".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_refused() {
        let io = std::io::Error::new(ErrorKind::ConnectionRefused, "refused");
        let e = TransportError::Connection(ConnectionError::Io(io));
        assert!(describe(&e).starts_with("connection refused"));
        assert_eq!(describe(&TransportError::ConnectTimeout), "connection attempt timed out");
    }

    #[test]
    fn test_options_from_config() {
        let config = MqttConfig {
            username: Some("hub".into()),
            password: Some("secret".into()),
            ..MqttConfig::default()
        };
        let options = options(&config);
        assert_eq!(options.broker_address(), ("test.mosquitto.org".to_string(), 1883));
        assert_eq!(options.keep_alive(), Duration::from_secs(60));
        assert!(options.client_id().starts_with("floodhub-"));
        assert_ne!(client_id(&config), client_id(&config));
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_gives_up_after_attempts() {
        // Nothing listens on port 1 on localhost.
        let config = MqttConfig {
            host: "127.0.0.1".into(),
            port: 1,
            connect_attempts: 2,
            connect_retry_delay_secs: 1,
            connect_timeout_secs: 1,
            ..MqttConfig::default()
        };
        match MqttClient::connect(&config).await {
            Err(TransportError::Exhausted { attempts }) => assert_eq!(attempts, 2),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("connected to nothing"),
        }
    }
}
