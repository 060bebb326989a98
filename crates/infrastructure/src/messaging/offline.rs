use async_trait::async_trait;
use domain::{DomainError, Transport};

/// Transport used when `mqtt.enabled` is false
///
/// Publishes are discarded and the session never connects, so the bridge
/// keeps driving hardware and scanning inputs without a broker.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineTransport;

#[async_trait]
impl Transport for OfflineTransport {
    async fn publish(&self, topic: &str, _payload: &[u8], _retain: bool) -> Result<(), DomainError> {
        tracing::trace!(topic = %topic, "MQTT disabled, publish discarded");
        Ok(())
    }

    async fn subscribe(&self, _topic: &str) -> Result<(), DomainError> {
        Ok(())
    }

    fn is_connected(&self) -> bool {
        false
    }
}
