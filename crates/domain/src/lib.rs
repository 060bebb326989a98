//! Domain layer - Pure bridge logic with no I/O
//!
//! This crate contains:
//! - Entities (dimmers, relays, inputs) and their registry
//! - Entity states and the owned state table
//! - Command payload decoding
//! - Ports for the hardware bus, the HAL and the broker transport
//!
//! Principles:
//! - No dependencies on infrastructure
//! - Invariants enforced by construction
//! - Testable in isolation

pub mod command;
pub mod entity;
pub mod error;
pub mod hal;
pub mod state;
pub mod transport;

// Re-export commonly used types
pub use command::{DimmerCommand, RelayCommand};
pub use entity::{Entity, EntityKind, EntityRegistry, TopicLayout};
pub use error::{DomainError, Result};
pub use hal::{Hal, RetryPolicy};
pub use state::{Availability, DimmerState, InputSnapshot, InputState, RelayState, StateTable};
pub use transport::{InboundMessage, Transport, TransportEvent};

/// Number of PWM dimmer channels on the board (indices 0..=15)
pub const DIMMER_COUNT: u8 = 16;

/// Number of relay outputs on the board (indices 1..=2)
pub const RELAY_COUNT: u8 = 2;

/// Number of digital inputs on the board (indices 1..=16)
pub const INPUT_COUNT: u8 = 16;
