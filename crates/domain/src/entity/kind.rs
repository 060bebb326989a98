use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

use crate::{DIMMER_COUNT, INPUT_COUNT, RELAY_COUNT};

/// Class of a controllable or observable channel on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Dimmer,
    Relay,
    Input,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [Self::Dimmer, Self::Relay, Self::Input];

    /// Topic segment used under the base topic
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dimmer => "dimmer",
            Self::Relay => "relay",
            Self::Input => "input",
        }
    }

    /// Home Assistant component the entity is discovered as
    pub fn component(&self) -> &'static str {
        match self {
            Self::Dimmer => "light",
            Self::Relay => "switch",
            Self::Input => "binary_sensor",
        }
    }

    /// Valid channel indices for this kind
    pub fn index_range(&self) -> RangeInclusive<u8> {
        match self {
            Self::Dimmer => 0..=DIMMER_COUNT - 1,
            Self::Relay => 1..=RELAY_COUNT,
            Self::Input => 1..=INPUT_COUNT,
        }
    }

    /// Inputs are read-only; everything else accepts commands
    pub fn accepts_commands(&self) -> bool {
        !matches!(self, Self::Input)
    }

    /// Parse a topic segment back into a kind
    pub fn from_segment(segment: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == segment)
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_as_str_and_component() {
        assert_eq!(EntityKind::Dimmer.as_str(), "dimmer");
        assert_eq!(EntityKind::Dimmer.component(), "light");
        assert_eq!(EntityKind::Relay.component(), "switch");
        assert_eq!(EntityKind::Input.component(), "binary_sensor");
    }

    #[test]
    fn test_index_ranges_match_board() {
        assert_eq!(EntityKind::Dimmer.index_range(), 0..=15);
        assert_eq!(EntityKind::Relay.index_range(), 1..=2);
        assert_eq!(EntityKind::Input.index_range(), 1..=16);
    }

    #[test]
    fn test_from_segment() {
        assert_eq!(EntityKind::from_segment("relay"), Some(EntityKind::Relay));
        assert_eq!(EntityKind::from_segment("light"), None);
    }

    #[test]
    fn test_inputs_do_not_accept_commands() {
        assert!(EntityKind::Dimmer.accepts_commands());
        assert!(EntityKind::Relay.accepts_commands());
        assert!(!EntityKind::Input.accepts_commands());
    }
}
