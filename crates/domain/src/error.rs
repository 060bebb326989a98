use thiserror::Error;

use crate::entity::EntityKind;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// A HAL operation failed after exhausting its retry policy
    #[error("Hardware error: {0}")]
    Hardware(String),

    /// A single bus transaction failed (retried by the HAL)
    #[error("Bus error: {0}")]
    Bus(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Entity not found: {kind} {index}")]
    EntityNotFound { kind: EntityKind, index: u8 },
}

pub type Result<T> = std::result::Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_names_entity() {
        let err = DomainError::EntityNotFound {
            kind: EntityKind::Relay,
            index: 3,
        };
        assert_eq!(err.to_string(), "Entity not found: relay 3");
    }
}
