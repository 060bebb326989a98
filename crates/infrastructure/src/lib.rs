//! Infrastructure layer - Board drivers, broker session and configuration

pub mod config;
pub mod drivers;
pub mod hardware;
pub mod messaging;

pub use config::BridgeConfig;
pub use drivers::{BoardIo, BusDriverType, BusFactory};
pub use hardware::{HardwareManager, HardwareStatus};
pub use messaging::{MqttClient, OfflineTransport};
