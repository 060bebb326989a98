use std::sync::Arc;

use domain::{
    DimmerCommand, DomainError, EntityKind, EntityRegistry, Hal, RelayCommand, StateTable,
    Transport,
};
use tracing::{debug, error, info, warn};

use super::publish_state;

/// Result of routing one inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Hardware written, state stored and published
    Applied {
        kind: EntityKind,
        index: u8,
        payload: String,
    },
    /// Not a command topic of this bridge
    Ignored,
}

/// Turns command messages into hardware writes and state updates
pub struct CommandRouter {
    registry: Arc<EntityRegistry>,
}

impl CommandRouter {
    pub fn new(registry: Arc<EntityRegistry>) -> Self {
        Self { registry }
    }

    /// Decode, apply and publish one command
    ///
    /// Payload errors leave the table untouched. A failed hardware write is
    /// returned without touching the table or publishing, so the last
    /// published state keeps matching the hardware.
    pub async fn handle_command(
        &self,
        hal: &mut dyn Hal,
        transport: &dyn Transport,
        table: &mut StateTable,
        topic: &str,
        payload: &[u8],
    ) -> Result<Outcome, DomainError> {
        let Some(entity) = self.registry.resolve_command_topic(topic) else {
            debug!(topic = %topic, "Ignoring message on unknown topic");
            return Ok(Outcome::Ignored);
        };
        let (kind, index) = (entity.kind, entity.index);

        let state_payload = match kind {
            EntityKind::Dimmer => {
                let command = DimmerCommand::decode(payload).map_err(|e| {
                    warn!(entity = %entity, error = %e, "Rejected dimmer command");
                    e
                })?;
                let target = command.target_state();
                hal.set_dimmer(index, target.is_on(), target.brightness())
                    .await
                    .map_err(|e| {
                        error!(entity = %entity, error = %e, "Dimmer write failed");
                        e
                    })?;
                table.set_dimmer(index, target)?;
                target.to_payload()
            }
            EntityKind::Relay => {
                let command = RelayCommand::decode(payload).map_err(|e| {
                    warn!(entity = %entity, error = %e, "Rejected relay command");
                    e
                })?;
                let target = command.target_state();
                hal.set_relay(index, target.on).await.map_err(|e| {
                    error!(entity = %entity, error = %e, "Relay write failed");
                    e
                })?;
                table.set_relay(index, target)?;
                target.to_payload().to_string()
            }
            EntityKind::Input => {
                // resolve_command_topic never yields inputs
                debug!(topic = %topic, "Inputs accept no commands");
                return Ok(Outcome::Ignored);
            }
        };

        info!(entity = %entity, state = %state_payload, "Command applied");
        publish_state(transport, &entity.state_topic, state_payload.as_bytes()).await?;

        Ok(Outcome::Applied {
            kind,
            index,
            payload: state_payload,
        })
    }
}
