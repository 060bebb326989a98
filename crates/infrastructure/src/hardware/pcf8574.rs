use domain::DomainError;

use super::bus::RetryingBus;

/// 8-bit quasi-bidirectional expander reading eight board inputs
#[derive(Debug)]
pub struct Pcf8574 {
    address: u8,
    available: bool,
}

impl Pcf8574 {
    pub fn new(address: u8) -> Self {
        Self {
            address,
            available: false,
        }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Release every pin high so it can be read as an input
    pub async fn init(&mut self, bus: &mut RetryingBus) -> Result<(), DomainError> {
        self.available = false;
        bus.write(self.address, &[0xFF]).await?;
        self.available = true;
        Ok(())
    }

    /// Raw pin levels; a cleared bit is an active input
    pub async fn read_port(&self, bus: &mut RetryingBus) -> Result<u8, DomainError> {
        if !self.available {
            return Err(DomainError::Hardware(format!(
                "PCF8574 at 0x{:02X} not available",
                self.address
            )));
        }
        let bytes = bus.read(self.address, 1).await?;
        bytes.first().copied().ok_or_else(|| {
            DomainError::Hardware(format!("PCF8574 at 0x{:02X} returned no data", self.address))
        })
    }
}
