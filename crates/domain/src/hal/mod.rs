mod bus;
mod retry;

pub use bus::{I2cBus, RelayOutput};
pub use retry::{Attempt, RetryPolicy};

use async_trait::async_trait;

use crate::error::DomainError;
use crate::state::InputSnapshot;

/// Uniform access to the board's three peripheral classes
///
/// Implementations reflect physical registers only; logical state lives in
/// the [`crate::StateTable`]. Every call is one serialized bus operation,
/// retried internally per the injected [`RetryPolicy`], and fails with
/// [`DomainError::Hardware`] once retries are exhausted.
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait Hal: Send {
    /// Drive one PWM channel (0..=15) to `brightness` percent
    async fn set_dimmer(&mut self, index: u8, on: bool, brightness: u8) -> Result<(), DomainError>;

    /// Drive one relay (1..=2)
    async fn set_relay(&mut self, index: u8, on: bool) -> Result<(), DomainError>;

    /// Read both input expanders; an unreadable one leaves its bank unknown
    async fn read_inputs(&mut self) -> Result<InputSnapshot, DomainError>;

    /// Switch every output off; failures are logged, not returned
    async fn shutdown(&mut self);
}
