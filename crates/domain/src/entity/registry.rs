use super::{Entity, EntityKind, TopicLayout};
use crate::error::{DomainError, Result};

/// Static catalog of every entity on the board
///
/// Ordered dimmers, relays, inputs. Built once from configuration.
#[derive(Debug, Clone)]
pub struct EntityRegistry {
    layout: TopicLayout,
    entities: Vec<Entity>,
}

impl EntityRegistry {
    pub fn new(layout: TopicLayout) -> Self {
        let entities = EntityKind::ALL
            .into_iter()
            .flat_map(|kind| kind.index_range().map(move |index| (kind, index)))
            .map(|(kind, index)| Entity::new(&layout, kind, index))
            .collect();

        Self { layout, entities }
    }

    pub fn layout(&self) -> &TopicLayout {
        &self.layout
    }

    pub fn all_entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn resolve(&self, kind: EntityKind, index: u8) -> Result<&Entity> {
        self.entities
            .iter()
            .find(|e| e.kind == kind && e.index == index)
            .ok_or(DomainError::EntityNotFound { kind, index })
    }

    /// Resolve `{base}/{kind}/{index}/set` to a commandable entity
    pub fn resolve_command_topic(&self, topic: &str) -> Option<&Entity> {
        let (kind, index) = self.layout.parse_command_topic(topic)?;
        if !kind.accepts_commands() {
            return None;
        }
        self.resolve(kind, index).ok()
    }

    /// All topics the bridge subscribes to for commands
    pub fn command_topics(&self) -> impl Iterator<Item = &str> {
        self.entities
            .iter()
            .filter_map(|e| e.command_topic.as_deref())
    }
}
