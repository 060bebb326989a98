mod simulator;

pub use simulator::{RelayHandle, SimulatedBus, SimulatedRelays, SimulatorHandle};

use domain::DomainError;
use domain::hal::{I2cBus, RelayOutput};
use serde::{Deserialize, Serialize};

use crate::config::HardwareConfig;

/// Bus driver selected by `hardware.driver`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusDriverType {
    /// In-memory board model
    #[default]
    Simulator,
}

impl BusDriverType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simulator => "simulator",
        }
    }
}

/// Bus and relay outputs for one board
pub struct BoardIo {
    pub bus: Box<dyn I2cBus>,
    pub relays: Box<dyn RelayOutput>,
}

/// Factory for creating the board's bus drivers
pub struct BusFactory;

impl BusFactory {
    /// Create the bus and relay outputs from the hardware configuration
    pub fn create(config: &HardwareConfig) -> Result<BoardIo, DomainError> {
        match config.driver {
            BusDriverType::Simulator => {
                tracing::info!(
                    pca9685 = config.addresses.pca9685,
                    inputs_1_8 = config.addresses.inputs_1_8,
                    inputs_9_16 = config.addresses.inputs_9_16,
                    "Using simulated I2C bus"
                );
                Ok(BoardIo {
                    bus: Box::new(SimulatedBus::new(&config.addresses)),
                    relays: Box::new(SimulatedRelays::new()),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_simulator_driver() {
        let io = BusFactory::create(&HardwareConfig::default());
        assert!(io.is_ok());
        assert_eq!(io.unwrap().bus.driver_type(), "simulator");
    }

    #[test]
    fn test_driver_type_from_config_value() {
        let driver: BusDriverType = serde_json::from_str("\"simulator\"").unwrap();
        assert_eq!(driver, BusDriverType::Simulator);
        assert!(serde_json::from_str::<BusDriverType>("\"spidev\"").is_err());
    }
}
