//! Board drivers composed behind the [`Hal`] port

mod bus;
mod pca9685;
mod pcf8574;
mod relay;

pub use bus::RetryingBus;
pub use pca9685::{Pca9685, duty_for, prescale_for};
pub use pcf8574::Pcf8574;
pub use relay::RelayBank;

use async_trait::async_trait;
use domain::hal::{I2cBus, RelayOutput};
use domain::{DIMMER_COUNT, DomainError, EntityKind, Hal, InputSnapshot, RetryPolicy};

use crate::config::HardwareConfig;

/// Which peripherals answered during [`HardwareManager::init`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HardwareStatus {
    pub pwm: bool,
    pub inputs_1_8: bool,
    pub inputs_9_16: bool,
    pub relays: bool,
}

impl HardwareStatus {
    pub fn all_available(&self) -> bool {
        self.pwm && self.inputs_1_8 && self.inputs_9_16 && self.relays
    }
}

/// PCA9685 dimmers, PCF8574 inputs and GPIO relays of one KC868-AP
pub struct HardwareManager {
    bus: RetryingBus,
    pwm: Pca9685,
    inputs_1_8: Pcf8574,
    inputs_9_16: Pcf8574,
    relays: RelayBank,
}

impl HardwareManager {
    pub fn new(
        bus: Box<dyn I2cBus>,
        relays: Box<dyn RelayOutput>,
        config: &HardwareConfig,
        policy: RetryPolicy,
    ) -> Self {
        let addresses = &config.addresses;
        Self {
            bus: RetryingBus::new(bus, policy),
            pwm: Pca9685::new(addresses.pca9685, config.pwm_frequency),
            inputs_1_8: Pcf8574::new(addresses.inputs_1_8),
            inputs_9_16: Pcf8574::new(addresses.inputs_9_16),
            relays: RelayBank::new(
                relays,
                [config.relays.relay1_pin, config.relays.relay2_pin],
                policy,
            ),
        }
    }

    /// Initialise every peripheral
    ///
    /// A peripheral that fails stays unavailable and its operations return
    /// [`DomainError::Hardware`]; the others keep working.
    pub async fn init(&mut self) -> HardwareStatus {
        match self.bus.scan().await {
            Ok(found) => {
                let found: Vec<String> = found.iter().map(|a| format!("0x{a:02X}")).collect();
                tracing::info!(
                    driver = self.bus.driver_type(),
                    devices = ?found,
                    "I2C scan complete"
                );
            }
            Err(e) => tracing::warn!(error = %e, "I2C scan failed"),
        }

        if let Err(e) = self.pwm.init(&mut self.bus).await {
            tracing::warn!(address = self.pwm.address(), error = %e, "PCA9685 not initialised, dimmers disabled");
        }
        for expander in [&mut self.inputs_1_8, &mut self.inputs_9_16] {
            if let Err(e) = expander.init(&mut self.bus).await {
                tracing::warn!(address = expander.address(), error = %e, "PCF8574 not initialised, inputs disabled");
            }
        }
        if let Err(e) = self.relays.init().await {
            tracing::warn!(error = %e, "Relay outputs not initialised");
        }

        let status = self.status();
        if status.all_available() {
            tracing::info!("Hardware initialised");
        } else {
            tracing::warn!(?status, "Hardware initialised with missing peripherals");
        }
        status
    }

    pub fn status(&self) -> HardwareStatus {
        HardwareStatus {
            pwm: self.pwm.is_available(),
            inputs_1_8: self.inputs_1_8.is_available(),
            inputs_9_16: self.inputs_9_16.is_available(),
            relays: self.relays.is_available(),
        }
    }
}

#[async_trait]
impl Hal for HardwareManager {
    async fn set_dimmer(&mut self, index: u8, on: bool, brightness: u8) -> Result<(), DomainError> {
        if index >= DIMMER_COUNT {
            return Err(DomainError::EntityNotFound {
                kind: EntityKind::Dimmer,
                index,
            });
        }
        let percent = if on { brightness.min(100) } else { 0 };
        self.pwm.set_level(&mut self.bus, index, percent).await?;
        tracing::debug!(index, percent, "Dimmer written");
        Ok(())
    }

    async fn set_relay(&mut self, index: u8, on: bool) -> Result<(), DomainError> {
        self.relays.set(index, on).await?;
        tracing::debug!(index, on, "Relay written");
        Ok(())
    }

    /// Each expander is read on its own; only both failing is an error
    async fn read_inputs(&mut self) -> Result<InputSnapshot, DomainError> {
        let low = self.inputs_1_8.read_port(&mut self.bus).await;
        let high = self.inputs_9_16.read_port(&mut self.bus).await;
        match (low, high) {
            (Err(e), Err(_)) => Err(e),
            (low, high) => {
                if let Err(e) = &low {
                    tracing::debug!(error = %e, "Inputs 1-8 unreadable");
                }
                if let Err(e) = &high {
                    tracing::debug!(error = %e, "Inputs 9-16 unreadable");
                }
                Ok(InputSnapshot::from_banks(low.ok(), high.ok()))
            }
        }
    }

    async fn shutdown(&mut self) {
        if self.pwm.is_available() {
            if let Err(e) = self.pwm.all_off(&mut self.bus).await {
                tracing::error!(error = %e, "Failed to switch dimmers off");
            }
        }
        if self.relays.is_available() {
            for index in 1..=2 {
                if let Err(e) = self.relays.set(index, false).await {
                    tracing::error!(index, error = %e, "Failed to switch relay off");
                }
            }
        }
        tracing::info!("All outputs off");
    }
}
