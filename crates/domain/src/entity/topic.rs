use serde::{Deserialize, Serialize};

use super::EntityKind;

/// Topic namespace of one bridge instance
///
/// Layout:
/// - `{base}/availability`
/// - `{base}/{kind}/{index}/set` and `{base}/{kind}/{index}/state`
/// - `{discovery_prefix}/{component}/{device_id}_{object_id}/config`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicLayout {
    pub base_topic: String,
    pub discovery_prefix: String,
    pub device_id: String,
}

impl Default for TopicLayout {
    fn default() -> Self {
        Self {
            base_topic: "kc868-ap".to_string(),
            discovery_prefix: "homeassistant".to_string(),
            device_id: "kc868-ap".to_string(),
        }
    }
}

impl TopicLayout {
    pub fn new(
        base_topic: impl Into<String>,
        discovery_prefix: impl Into<String>,
        device_id: impl Into<String>,
    ) -> Self {
        Self {
            base_topic: base_topic.into(),
            discovery_prefix: discovery_prefix.into(),
            device_id: device_id.into(),
        }
    }

    pub fn availability_topic(&self) -> String {
        format!("{}/availability", self.base_topic)
    }

    /// Home Assistant birth/will topic
    pub fn birth_topic(&self) -> String {
        format!("{}/status", self.discovery_prefix)
    }

    pub fn command_topic(&self, kind: EntityKind, index: u8) -> String {
        format!("{}/{}/{}/set", self.base_topic, kind, index)
    }

    pub fn state_topic(&self, kind: EntityKind, index: u8) -> String {
        format!("{}/{}/{}/state", self.base_topic, kind, index)
    }

    /// Object id of an entity; inputs are zero-padded to match the X01..X16 labels
    pub fn object_id(&self, kind: EntityKind, index: u8) -> String {
        match kind {
            EntityKind::Input => format!("{}_{:02}", kind, index),
            _ => format!("{}_{}", kind, index),
        }
    }

    pub fn unique_id(&self, kind: EntityKind, index: u8) -> String {
        format!("{}_{}", self.device_id, self.object_id(kind, index))
    }

    pub fn discovery_topic(&self, kind: EntityKind, index: u8) -> String {
        format!(
            "{}/{}/{}/config",
            self.discovery_prefix,
            kind.component(),
            self.unique_id(kind, index)
        )
    }

    /// Split `{base}/{kind}/{index}/set` into its kind and index
    ///
    /// Returns `None` for anything that is not a command topic of this layout.
    pub fn parse_command_topic(&self, topic: &str) -> Option<(EntityKind, u8)> {
        let rest = topic.strip_prefix(&self.base_topic)?.strip_prefix('/')?;
        let mut parts = rest.split('/');
        let kind = EntityKind::from_segment(parts.next()?)?;
        let index_segment = parts.next()?;
        if parts.next()? != "set" || parts.next().is_some() {
            return None;
        }
        // Reject "+1" and "01" style segments so one entity has one topic
        if index_segment.is_empty() || !index_segment.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if index_segment.len() > 1 && index_segment.starts_with('0') {
            return None;
        }
        let index = index_segment.parse::<u8>().ok()?;
        Some((kind, index))
    }
}
