use domain::hal::RelayOutput;
use domain::{DomainError, EntityKind, RELAY_COUNT, RetryPolicy};

/// Two GPIO-driven relay coils, relay 1 and relay 2
pub struct RelayBank {
    output: Box<dyn RelayOutput>,
    pins: [u8; RELAY_COUNT as usize],
    policy: RetryPolicy,
    available: bool,
}

impl RelayBank {
    pub fn new(output: Box<dyn RelayOutput>, pins: [u8; 2], policy: RetryPolicy) -> Self {
        Self {
            output,
            pins,
            policy,
            available: false,
        }
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Drive both coils low
    pub async fn init(&mut self) -> Result<(), DomainError> {
        self.available = false;
        for pin in self.pins {
            self.drive(pin, false).await?;
        }
        self.available = true;
        Ok(())
    }

    pub async fn set(&mut self, index: u8, on: bool) -> Result<(), DomainError> {
        let pin = self.pin(index)?;
        if !self.available {
            return Err(DomainError::Hardware("relay outputs not available".into()));
        }
        self.drive(pin, on).await
    }

    fn pin(&self, index: u8) -> Result<u8, DomainError> {
        index
            .checked_sub(1)
            .and_then(|slot| self.pins.get(usize::from(slot)))
            .copied()
            .ok_or(DomainError::EntityNotFound {
                kind: EntityKind::Relay,
                index,
            })
    }

    async fn drive(&mut self, pin: u8, high: bool) -> Result<(), DomainError> {
        self.policy
            .run(&format!("GPIO {pin} write"), self.output.as_mut(), |output| {
                output.set_level(pin, high)
            })
            .await
    }
}
