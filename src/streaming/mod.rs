//! Streaming module - MQTT transport and alert commands

mod mqtt;
mod publisher;

pub use mqtt::*;
pub use publisher::*;

use async_trait::async_trait;
use thiserror::Error;

/// Transport errors
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("not connected to broker")]
    NotConnected,

    #[error("connection attempt timed out")]
    ConnectTimeout,

    #[error("broker rejected connection: {0}")]
    Refused(String),

    #[error("gave up after {attempts} connection attempts")]
    Exhausted { attempts: u32 },

    #[error("connection error: {0}")]
    Connection(#[from] rumqttc::ConnectionError),

    #[error("client error: {0}")]
    Client(#[from] rumqttc::ClientError),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Outbound side of the broker connection
#[async_trait]
pub trait CommandSink: Send + Sync {
    fn is_connected(&self) -> bool;

    /// Fire-and-forget publish. Must not wait for the broker.
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError>;
}
