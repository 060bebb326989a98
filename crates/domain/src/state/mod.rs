mod snapshot;
mod table;

pub use snapshot::InputSnapshot;
pub use table::StateTable;

use serde::{Deserialize, Serialize};

pub const PAYLOAD_ON: &str = "ON";
pub const PAYLOAD_OFF: &str = "OFF";

fn on_off(on: bool) -> &'static str {
    if on { PAYLOAD_ON } else { PAYLOAD_OFF }
}

/// Logical state of one dimmer channel
///
/// Binary by construction: off is always brightness 0, on is always 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DimmerState {
    on: bool,
}

impl DimmerState {
    pub const FULL_BRIGHTNESS: u8 = 100;

    pub const fn on() -> Self {
        Self { on: true }
    }

    pub const fn off() -> Self {
        Self { on: false }
    }

    pub const fn from_on(on: bool) -> Self {
        Self { on }
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    pub fn brightness(&self) -> u8 {
        if self.on { Self::FULL_BRIGHTNESS } else { 0 }
    }

    /// JSON state document, e.g. `{"state":"ON","brightness":100}`
    pub fn to_payload(&self) -> String {
        let payload = DimmerStatePayload {
            state: on_off(self.on),
            brightness: self.brightness(),
        };
        // A two-field struct of &str and u8 always serializes
        serde_json::to_string(&payload).unwrap_or_default()
    }
}

#[derive(Serialize)]
struct DimmerStatePayload<'a> {
    state: &'a str,
    brightness: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RelayState {
    pub on: bool,
}

impl RelayState {
    pub const fn new(on: bool) -> Self {
        Self { on }
    }

    pub fn to_payload(&self) -> &'static str {
        on_off(self.on)
    }
}

/// Read-only state of one digital input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InputState {
    pub active: bool,
}

impl InputState {
    pub fn to_payload(&self) -> &'static str {
        on_off(self.active)
    }
}

/// Device liveness as seen by the broker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    Online,
    #[default]
    Offline,
}

impl Availability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
        }
    }
}

impl std::fmt::Display for Availability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
