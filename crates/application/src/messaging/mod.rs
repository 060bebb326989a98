pub mod command_router;
pub mod discovery;

pub use command_router::{CommandRouter, Outcome};
pub use discovery::{DiscoveryDocument, DiscoveryMessage, DiscoveryPublisher};

use domain::{DomainError, Transport};

/// Publish a retained state message
///
/// Skipped while the session is down; every state is republished when the
/// transport reconnects.
pub(crate) async fn publish_state(
    transport: &dyn Transport,
    topic: &str,
    payload: &[u8],
) -> Result<(), DomainError> {
    if !transport.is_connected() {
        tracing::debug!(topic = %topic, "Not connected, state publish deferred");
        return Ok(());
    }
    transport.publish(topic, payload, true).await.map_err(|e| {
        tracing::error!(topic = %topic, error = %e, "Failed to publish state");
        e
    })
}
