use async_trait::async_trait;

use crate::error::DomainError;

/// Message delivered by the broker on a subscribed topic
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl InboundMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Everything the transport reports to the sync loop
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportEvent {
    /// Broker session (re)established
    Connected,
    /// Session lost; the transport reconnects on its own
    Disconnected,
    Message(InboundMessage),
}

/// Publish/subscribe port to the broker
#[async_trait]
pub trait Transport: Send + Sync {
    async fn publish(&self, topic: &str, payload: &[u8], retain: bool) -> Result<(), DomainError>;

    async fn subscribe(&self, topic: &str) -> Result<(), DomainError>;

    fn is_connected(&self) -> bool;
}
