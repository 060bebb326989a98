use domain::hal::I2cBus;
use domain::{DomainError, RetryPolicy};

fn describe(verb: &str, address: u8) -> String {
    format!("I2C {verb} at 0x{address:02X}")
}

/// I2C bus with every transaction wrapped in a [`RetryPolicy`]
pub struct RetryingBus {
    bus: Box<dyn I2cBus>,
    policy: RetryPolicy,
}

impl RetryingBus {
    pub fn new(bus: Box<dyn I2cBus>, policy: RetryPolicy) -> Self {
        Self { bus, policy }
    }

    pub async fn write(&mut self, address: u8, data: &[u8]) -> Result<(), DomainError> {
        let data = data.to_vec();
        self.policy
            .run(&describe("write", address), self.bus.as_mut(), |bus| {
                let data = data.clone();
                Box::pin(async move { bus.write(address, &data).await })
            })
            .await
    }

    pub async fn read(&mut self, address: u8, len: usize) -> Result<Vec<u8>, DomainError> {
        self.policy
            .run(&describe("read", address), self.bus.as_mut(), |bus| {
                bus.read(address, len)
            })
            .await
    }

    pub async fn write_read(
        &mut self,
        address: u8,
        data: &[u8],
        len: usize,
    ) -> Result<Vec<u8>, DomainError> {
        let data = data.to_vec();
        self.policy
            .run(&describe("register read", address), self.bus.as_mut(), |bus| {
                let data = data.clone();
                Box::pin(async move { bus.write_read(address, &data, len).await })
            })
            .await
    }

    /// Probe the bus once; scanning is diagnostic and never retried
    pub async fn scan(&mut self) -> Result<Vec<u8>, DomainError> {
        self.bus.scan().await
    }

    pub fn driver_type(&self) -> &str {
        self.bus.driver_type()
    }
}
