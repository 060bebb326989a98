mod kind;
mod registry;
mod topic;

pub use kind::EntityKind;
pub use registry::EntityRegistry;
pub use topic::TopicLayout;

use serde::{Deserialize, Serialize};

/// One controllable or observable channel bound to the board
///
/// Built once by the [`EntityRegistry`]; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub kind: EntityKind,
    pub index: u8,
    pub name: String,
    pub unique_id: String,
    /// Absent for inputs
    pub command_topic: Option<String>,
    pub state_topic: String,
    pub discovery_topic: String,
}

impl Entity {
    pub(crate) fn new(layout: &TopicLayout, kind: EntityKind, index: u8) -> Self {
        let name = match kind {
            EntityKind::Dimmer => format!("KC868 Light {}", u16::from(index) + 1),
            EntityKind::Relay => format!("KC868 Relay {}", index),
            EntityKind::Input => format!("KC868 Input X{:02}", index),
        };

        Self {
            kind,
            index,
            name,
            unique_id: layout.unique_id(kind, index),
            command_topic: kind
                .accepts_commands()
                .then(|| layout.command_topic(kind, index)),
            state_topic: layout.state_topic(kind, index),
            discovery_topic: layout.discovery_topic(kind, index),
        }
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.kind, self.index)
    }
}
