//! Inbound command payload decoding
//!
//! Accepted forms:
//! - structured JSON `{"state": "ON"|"OFF", "brightness": 0..100}`
//! - bare tokens `ON` / `OFF` (case-insensitive, optionally JSON-quoted)
//! - bare integers `0..100` (dimmers only)

use serde::Deserialize;
use serde_json::Value;

use crate::error::{DomainError, Result};
use crate::state::{DimmerState, PAYLOAD_OFF, PAYLOAD_ON, RelayState};

#[derive(Debug, Deserialize)]
struct StructuredCommand {
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    brightness: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Switch {
    On,
    Off,
}

fn invalid(msg: impl Into<String>) -> DomainError {
    DomainError::InvalidPayload(msg.into())
}

fn parse_switch(token: &str) -> Option<Switch> {
    let token = token.trim();
    if token.eq_ignore_ascii_case(PAYLOAD_ON) {
        Some(Switch::On)
    } else if token.eq_ignore_ascii_case(PAYLOAD_OFF) {
        Some(Switch::Off)
    } else {
        None
    }
}

fn check_brightness(value: i64) -> Result<u8> {
    u8::try_from(value)
        .ok()
        .filter(|b| *b <= DimmerState::FULL_BRIGHTNESS)
        .ok_or_else(|| invalid(format!("brightness {value} outside 0..100")))
}

fn payload_text(payload: &[u8]) -> Result<&str> {
    let text = std::str::from_utf8(payload)
        .map_err(|_| invalid("payload is not valid UTF-8"))?
        .trim();
    if text.is_empty() {
        return Err(invalid("empty payload"));
    }
    Ok(text)
}

/// Decoded dimmer command, before the binary brightness policy is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimmerCommand {
    On,
    Off,
    /// Bare level or brightness-only document
    Level(u8),
}

impl DimmerCommand {
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let text = payload_text(payload)?;

        if let Some(switch) = parse_switch(text) {
            return Ok(Self::from_switch(switch));
        }

        let value: Value = serde_json::from_str(text)
            .map_err(|_| invalid(format!("unrecognized dimmer payload '{text}'")))?;

        match value {
            Value::Object(_) => {
                let doc: StructuredCommand = serde_json::from_value(value)
                    .map_err(|e| invalid(format!("malformed dimmer document: {e}")))?;
                Self::from_document(doc)
            }
            Value::String(token) => parse_switch(&token)
                .map(Self::from_switch)
                .ok_or_else(|| invalid(format!("unrecognized dimmer token '{token}'"))),
            Value::Number(n) => {
                let level = n
                    .as_i64()
                    .ok_or_else(|| invalid(format!("brightness {n} is not an integer")))?;
                check_brightness(level).map(Self::Level)
            }
            other => Err(invalid(format!("unsupported dimmer payload {other}"))),
        }
    }

    fn from_switch(switch: Switch) -> Self {
        match switch {
            Switch::On => Self::On,
            Switch::Off => Self::Off,
        }
    }

    fn from_document(doc: StructuredCommand) -> Result<Self> {
        let brightness = doc.brightness.map(check_brightness).transpose()?;
        let switch = match doc.state.as_deref() {
            Some(state) => Some(
                parse_switch(state)
                    .ok_or_else(|| invalid(format!("unrecognized state '{state}'")))?,
            ),
            None => None,
        };

        match (switch, brightness) {
            (Some(Switch::Off), _) => Ok(Self::Off),
            (Some(Switch::On), _) => Ok(Self::On),
            (None, Some(level)) => Ok(Self::Level(level)),
            (None, None) => Err(invalid("document has neither state nor brightness")),
        }
    }

    /// Binary policy: anything non-zero is full on
    pub fn target_state(&self) -> DimmerState {
        match self {
            Self::On => DimmerState::on(),
            Self::Off | Self::Level(0) => DimmerState::off(),
            Self::Level(_) => DimmerState::on(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayCommand {
    On,
    Off,
}

impl RelayCommand {
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let text = payload_text(payload)?;

        let switch = match parse_switch(text) {
            Some(switch) => switch,
            None => match serde_json::from_str::<Value>(text) {
                Ok(Value::String(token)) => parse_switch(&token)
                    .ok_or_else(|| invalid(format!("unrecognized relay token '{token}'")))?,
                Ok(value @ Value::Object(_)) => {
                    let doc: StructuredCommand = serde_json::from_value(value)
                        .map_err(|e| invalid(format!("malformed relay document: {e}")))?;
                    doc.state
                        .as_deref()
                        .and_then(parse_switch)
                        .ok_or_else(|| invalid("relay document needs state ON or OFF"))?
                }
                _ => return Err(invalid(format!("unrecognized relay payload '{text}'"))),
            },
        };

        Ok(match switch {
            Switch::On => Self::On,
            Switch::Off => Self::Off,
        })
    }

    pub fn target_state(&self) -> RelayState {
        RelayState::new(matches!(self, Self::On))
    }
}
