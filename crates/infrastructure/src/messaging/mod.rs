pub mod mqtt_client;
mod offline;

pub use mqtt_client::{MqttClient, availability_will};
pub use offline::OfflineTransport;
