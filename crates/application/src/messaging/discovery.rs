use domain::state::{PAYLOAD_OFF, PAYLOAD_ON};
use domain::{Availability, DomainError, Entity, EntityKind, EntityRegistry, TopicLayout, Transport};
use serde::Serialize;
use tracing::{debug, error, info};

pub const DEVICE_NAME: &str = "KC868-AP";
pub const MANUFACTURER: &str = "KC";
pub const MODEL: &str = "KC868-AP";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub identifiers: Vec<String>,
    pub name: &'static str,
    pub manufacturer: &'static str,
    pub model: &'static str,
    pub sw_version: &'static str,
}

impl DeviceInfo {
    fn for_layout(layout: &TopicLayout) -> Self {
        Self {
            identifiers: vec![layout.device_id.clone()],
            name: DEVICE_NAME,
            manufacturer: MANUFACTURER,
            model: MODEL,
            sw_version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// Home Assistant MQTT discovery config for one entity
///
/// Field order is fixed so the same registry always serializes to the same
/// bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveryDocument {
    pub name: String,
    pub unique_id: String,
    pub state_topic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_topic: Option<String>,
    pub availability_topic: String,
    pub payload_available: &'static str,
    pub payload_not_available: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brightness: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brightness_scale: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_on: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_off: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_class: Option<&'static str>,
    pub device: DeviceInfo,
}

impl DiscoveryDocument {
    pub fn for_entity(entity: &Entity, layout: &TopicLayout) -> Self {
        let mut doc = Self {
            name: entity.name.clone(),
            unique_id: entity.unique_id.clone(),
            state_topic: entity.state_topic.clone(),
            command_topic: entity.command_topic.clone(),
            availability_topic: layout.availability_topic(),
            payload_available: Availability::Online.as_str(),
            payload_not_available: Availability::Offline.as_str(),
            schema: None,
            brightness: None,
            brightness_scale: None,
            payload_on: None,
            payload_off: None,
            device_class: None,
            device: DeviceInfo::for_layout(layout),
        };

        match entity.kind {
            EntityKind::Dimmer => {
                doc.schema = Some("json");
                doc.brightness = Some(true);
                doc.brightness_scale = Some(100);
            }
            EntityKind::Relay => {
                doc.payload_on = Some(PAYLOAD_ON);
                doc.payload_off = Some(PAYLOAD_OFF);
            }
            EntityKind::Input => {
                doc.payload_on = Some(PAYLOAD_ON);
                doc.payload_off = Some(PAYLOAD_OFF);
                doc.device_class = Some("power");
            }
        }
        doc
    }
}

/// Serialized discovery document and the topic it is retained on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Announces every entity to Home Assistant
pub struct DiscoveryPublisher;

impl DiscoveryPublisher {
    /// One document per entity, in registry order
    pub fn documents(registry: &EntityRegistry) -> Result<Vec<DiscoveryMessage>, DomainError> {
        registry
            .all_entities()
            .iter()
            .map(|entity| {
                let doc = DiscoveryDocument::for_entity(entity, registry.layout());
                let payload = serde_json::to_vec(&doc).map_err(|e| {
                    DomainError::InvalidPayload(format!(
                        "discovery document for {entity} failed to encode: {e}"
                    ))
                })?;
                Ok(DiscoveryMessage {
                    topic: entity.discovery_topic.clone(),
                    payload,
                })
            })
            .collect()
    }

    /// Publish all documents retained, then subscribe to command and birth topics
    ///
    /// Every document is attempted; the first failure is returned.
    pub async fn publish_discovery(
        transport: &dyn Transport,
        registry: &EntityRegistry,
    ) -> Result<(), DomainError> {
        let messages = Self::documents(registry)?;
        let mut first_error = None;

        for message in &messages {
            if let Err(e) = transport.publish(&message.topic, &message.payload, true).await {
                error!(topic = %message.topic, error = %e, "Failed to publish discovery");
                first_error.get_or_insert(e);
            }
        }

        let birth_topic = registry.layout().birth_topic();
        for topic in registry.command_topics().chain(std::iter::once(birth_topic.as_str())) {
            if let Err(e) = transport.subscribe(topic).await {
                error!(topic = %topic, error = %e, "Failed to subscribe");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                info!(count = messages.len(), "Discovery published");
                Ok(())
            }
        }
    }

    pub async fn publish_availability(
        transport: &dyn Transport,
        layout: &TopicLayout,
        availability: Availability,
    ) -> Result<(), DomainError> {
        let topic = layout.availability_topic();
        transport
            .publish(&topic, availability.as_str().as_bytes(), true)
            .await?;
        debug!(topic = %topic, availability = %availability, "Availability published");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn registry() -> EntityRegistry {
        EntityRegistry::new(TopicLayout::default())
    }

    fn document(registry: &EntityRegistry, kind: EntityKind, index: u8) -> Value {
        let entity = registry.resolve(kind, index).unwrap();
        serde_json::to_value(DiscoveryDocument::for_entity(entity, registry.layout())).unwrap()
    }

    #[test]
    fn test_light_document() {
        let registry = registry();
        let doc = document(&registry, EntityKind::Dimmer, 0);

        assert_eq!(doc["name"], "KC868 Light 1");
        assert_eq!(doc["unique_id"], "kc868-ap_dimmer_0");
        assert_eq!(doc["command_topic"], "kc868-ap/dimmer/0/set");
        assert_eq!(doc["state_topic"], "kc868-ap/dimmer/0/state");
        assert_eq!(doc["schema"], "json");
        assert_eq!(doc["brightness"], true);
        assert_eq!(doc["brightness_scale"], 100);
        assert_eq!(doc["availability_topic"], "kc868-ap/availability");
        assert_eq!(doc["payload_available"], "online");
        assert_eq!(doc["payload_not_available"], "offline");
        assert!(doc.get("payload_on").is_none());
        assert_eq!(
            doc["device"],
            json!({
                "identifiers": ["kc868-ap"],
                "name": "KC868-AP",
                "manufacturer": "KC",
                "model": "KC868-AP",
                "sw_version": env!("CARGO_PKG_VERSION"),
            })
        );
    }

    #[test]
    fn test_switch_document() {
        let registry = registry();
        let doc = document(&registry, EntityKind::Relay, 2);

        assert_eq!(doc["name"], "KC868 Relay 2");
        assert_eq!(doc["payload_on"], "ON");
        assert_eq!(doc["payload_off"], "OFF");
        assert!(doc.get("schema").is_none());
        assert!(doc.get("device_class").is_none());
    }

    #[test]
    fn test_binary_sensor_document() {
        let registry = registry();
        let doc = document(&registry, EntityKind::Input, 7);

        assert_eq!(doc["name"], "KC868 Input X07");
        assert_eq!(doc["unique_id"], "kc868-ap_input_07");
        assert_eq!(doc["device_class"], "power");
        assert_eq!(doc["state_topic"], "kc868-ap/input/7/state");
        assert!(doc.get("command_topic").is_none());
    }

    #[test]
    fn test_documents_cover_registry_in_order() {
        let registry = registry();
        let messages = DiscoveryPublisher::documents(&registry).unwrap();

        assert_eq!(messages.len(), 34);
        assert_eq!(
            messages[0].topic,
            "homeassistant/light/kc868-ap_dimmer_0/config"
        );
        assert_eq!(
            messages[16].topic,
            "homeassistant/switch/kc868-ap_relay_1/config"
        );
        assert_eq!(
            messages[33].topic,
            "homeassistant/binary_sensor/kc868-ap_input_16/config"
        );
    }

    #[test]
    fn test_documents_are_byte_identical_across_builds() {
        let registry = registry();
        assert_eq!(
            DiscoveryPublisher::documents(&registry).unwrap(),
            DiscoveryPublisher::documents(&registry.clone()).unwrap()
        );
    }
}
