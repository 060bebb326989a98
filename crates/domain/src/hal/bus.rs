//! Bus-level ports implemented by infrastructure drivers

use async_trait::async_trait;

use crate::error::DomainError;

/// I2C bus master
///
/// One call is one bus transaction. Implementations report failures as
/// [`DomainError::Bus`]; retrying is the HAL's concern.
#[async_trait]
pub trait I2cBus: Send {
    /// Write data to a device at the given 7-bit address
    async fn write(&mut self, address: u8, data: &[u8]) -> Result<(), DomainError>;

    /// Read `len` bytes from a device at the given 7-bit address
    async fn read(&mut self, address: u8, len: usize) -> Result<Vec<u8>, DomainError>;

    /// Write then read in a single transaction (repeated start)
    ///
    /// Typically a register address followed by the register contents.
    async fn write_read(
        &mut self,
        address: u8,
        data: &[u8],
        len: usize,
    ) -> Result<Vec<u8>, DomainError>;

    /// Addresses that acknowledge a probe
    async fn scan(&mut self) -> Result<Vec<u8>, DomainError>;

    /// Get bus driver identifier
    fn driver_type(&self) -> &str;
}

/// Discrete output pins driving the relay coils
#[async_trait]
pub trait RelayOutput: Send {
    async fn set_level(&mut self, pin: u8, high: bool) -> Result<(), DomainError>;
}
