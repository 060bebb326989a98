use std::collections::HashSet;
use std::time::Duration;

use config::{Config, Environment, File};
use domain::{DomainError, RetryPolicy, TopicLayout};
use serde::{Deserialize, Serialize};

use crate::drivers::BusDriverType;

/// Station credentials; the link itself is owned by the network collaborator
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct WifiConfig {
    pub ssid: String,
    pub password: String,
    /// Seconds
    pub timeout: u64,
    pub retry_attempts: u32,
}

impl Default for WifiConfig {
    fn default() -> Self {
        Self {
            ssid: String::new(),
            password: String::new(),
            timeout: 30,
            retry_attempts: 3,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct I2cConfig {
    pub sda_pin: u8,
    pub scl_pin: u8,
    pub frequency: u32,
}

impl Default for I2cConfig {
    fn default() -> Self {
        Self {
            sda_pin: 4,
            scl_pin: 16,
            frequency: 100_000,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AddressConfig {
    pub inputs_1_8: u8,
    pub inputs_9_16: u8,
    pub pca9685: u8,
}

impl Default for AddressConfig {
    fn default() -> Self {
        Self {
            inputs_1_8: 0x3A,
            inputs_9_16: 0x21,
            pca9685: 0x40,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct RelayPinConfig {
    pub relay1_pin: u8,
    pub relay2_pin: u8,
}

impl Default for RelayPinConfig {
    fn default() -> Self {
        Self {
            relay1_pin: 13,
            relay2_pin: 2,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 10,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct HardwareConfig {
    pub driver: BusDriverType,
    pub i2c: I2cConfig,
    pub addresses: AddressConfig,
    pub relays: RelayPinConfig,
    /// PCA9685 output frequency in Hz
    pub pwm_frequency: u16,
    pub retry: RetryConfig,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            driver: BusDriverType::default(),
            i2c: I2cConfig::default(),
            addresses: AddressConfig::default(),
            relays: RelayPinConfig::default(),
            pwm_frequency: 500,
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SystemConfig {
    pub debug: bool,
    pub log_level: String,
    /// Maintenance period in milliseconds
    pub gc_interval: u64,
    /// Input scan period in milliseconds
    pub input_scan_interval: u64,
    /// Network tick period in milliseconds
    pub tick_interval: u64,
    /// Periodic discovery republish in milliseconds
    pub discovery_interval: u64,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            debug: false,
            log_level: "INFO".to_string(),
            gc_interval: 10_000,
            input_scan_interval: 10,
            tick_interval: 50,
            discovery_interval: 60_000,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct MqttConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub client_id: String,
    pub base_topic: String,
    pub discovery_prefix: String,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: String::new(),
            port: 1883,
            username: String::new(),
            password: String::new(),
            client_id: "kc868-ap".to_string(),
            base_topic: "kc868-ap".to_string(),
            discovery_prefix: "homeassistant".to_string(),
        }
    }
}

impl MqttConfig {
    /// Credentials are only sent when a username is configured
    pub fn credentials(&self) -> Option<(&str, &str)> {
        (!self.username.is_empty()).then_some((self.username.as_str(), self.password.as_str()))
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct BridgeConfig {
    pub wifi: WifiConfig,
    pub hardware: HardwareConfig,
    pub system: SystemConfig,
    pub mqtt: MqttConfig,
}

fn config_error(e: impl std::fmt::Display) -> DomainError {
    DomainError::Configuration(e.to_string())
}

impl BridgeConfig {
    /// Load and validate the layered configuration
    ///
    /// Priority, lowest first: built-in defaults, `{dir}/default.*`
    /// (required), `{dir}/{RUN_MODE}.*` (optional), `KC868__*` env vars.
    pub fn load(config_dir: &str) -> Result<Self, DomainError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "production".into());

        let s = Config::builder()
            .set_default("mqtt.port", 1883)
            .map_err(config_error)?
            .add_source(File::with_name(&format!("{}/default", config_dir)).required(true))
            .add_source(File::with_name(&format!("{}/{}", config_dir, run_mode)).required(false))
            // e.g. KC868__MQTT__HOST=10.0.0.1
            .add_source(Environment::with_prefix("KC868").separator("__"))
            .build()
            .map_err(config_error)?;

        let config: Self = s.try_deserialize().map_err(config_error)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        let mqtt = &self.mqtt;
        if mqtt.enabled {
            if mqtt.host.trim().is_empty() {
                return Err(config_error("mqtt.host is required when mqtt.enabled"));
            }
            if mqtt.port == 0 {
                return Err(config_error("mqtt.port must be non-zero"));
            }
        }
        for (key, value) in [
            ("mqtt.client_id", &mqtt.client_id),
            ("mqtt.base_topic", &mqtt.base_topic),
            ("mqtt.discovery_prefix", &mqtt.discovery_prefix),
        ] {
            if value.trim().is_empty() {
                return Err(config_error(format!("{key} must not be empty")));
            }
            if value.contains(['+', '#']) {
                return Err(config_error(format!("{key} must not contain wildcards")));
            }
        }

        let addresses = &self.hardware.addresses;
        let mut seen = HashSet::new();
        for (key, address) in [
            ("hardware.addresses.inputs_1_8", addresses.inputs_1_8),
            ("hardware.addresses.inputs_9_16", addresses.inputs_9_16),
            ("hardware.addresses.pca9685", addresses.pca9685),
        ] {
            if !(0x03..=0x77).contains(&address) {
                return Err(config_error(format!(
                    "{key} 0x{address:02X} is outside the 7-bit range"
                )));
            }
            if !seen.insert(address) {
                return Err(config_error(format!(
                    "{key} 0x{address:02X} is already assigned"
                )));
            }
        }
        if self.hardware.relays.relay1_pin == self.hardware.relays.relay2_pin {
            return Err(config_error("relay pins must differ"));
        }
        if !(24..=1526).contains(&self.hardware.pwm_frequency) {
            return Err(config_error(format!(
                "hardware.pwm_frequency {} outside 24..1526 Hz",
                self.hardware.pwm_frequency
            )));
        }
        if self.hardware.retry.max_attempts == 0 {
            return Err(config_error("hardware.retry.max_attempts must be at least 1"));
        }

        let system = &self.system;
        for (key, value) in [
            ("system.gc_interval", system.gc_interval),
            ("system.input_scan_interval", system.input_scan_interval),
            ("system.tick_interval", system.tick_interval),
            ("system.discovery_interval", system.discovery_interval),
        ] {
            if value == 0 {
                return Err(config_error(format!("{key} must be non-zero")));
            }
        }

        Ok(())
    }

    pub fn topic_layout(&self) -> TopicLayout {
        TopicLayout::new(
            self.mqtt.base_topic.clone(),
            self.mqtt.discovery_prefix.clone(),
            self.mqtt.client_id.clone(),
        )
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.hardware.retry.max_attempts,
            Duration::from_millis(self.hardware.retry.delay_ms),
        )
    }

    /// Default tracing filter when RUST_LOG is unset
    pub fn log_filter(&self) -> String {
        if self.system.debug {
            return "debug".to_string();
        }
        match self.system.log_level.to_ascii_uppercase().as_str() {
            "DEBUG" => "debug",
            "WARNING" | "WARN" => "warn",
            "ERROR" | "CRITICAL" => "error",
            _ => "info",
        }
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> BridgeConfig {
        let mut config = BridgeConfig::default();
        config.mqtt.host = "broker.local".to_string();
        config
    }

    #[test]
    fn test_defaults_match_board() {
        let config = BridgeConfig::default();
        assert_eq!(config.hardware.addresses.inputs_1_8, 0x3A);
        assert_eq!(config.hardware.addresses.inputs_9_16, 0x21);
        assert_eq!(config.hardware.addresses.pca9685, 0x40);
        assert_eq!(config.hardware.relays.relay1_pin, 13);
        assert_eq!(config.hardware.pwm_frequency, 500);
        assert_eq!(config.system.input_scan_interval, 10);
        assert_eq!(config.system.tick_interval, 50);
        assert_eq!(config.system.gc_interval, 10_000);
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.retry_policy(), RetryPolicy::default());
        assert_eq!(config.topic_layout(), TopicLayout::default());
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_missing_host_is_rejected_only_when_enabled() {
        let mut config = BridgeConfig::default();
        assert!(matches!(
            config.validate(),
            Err(DomainError::Configuration(_))
        ));
        config.mqtt.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_wildcard_topics_are_rejected() {
        let mut config = valid();
        config.mqtt.base_topic = "house/#".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_addresses_are_rejected() {
        let mut config = valid();
        config.hardware.addresses.inputs_9_16 = 0x3A;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("already assigned"));
    }

    #[test]
    fn test_out_of_range_values_are_rejected() {
        let mut config = valid();
        config.hardware.addresses.pca9685 = 0x80;
        assert!(config.validate().is_err());

        let mut config = valid();
        config.hardware.pwm_frequency = 2000;
        assert!(config.validate().is_err());

        let mut config = valid();
        config.system.input_scan_interval = 0;
        assert!(config.validate().is_err());

        let mut config = valid();
        config.hardware.retry.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_log_filter() {
        let mut config = valid();
        assert_eq!(config.log_filter(), "info");
        config.system.log_level = "WARNING".to_string();
        assert_eq!(config.log_filter(), "warn");
        config.system.debug = true;
        assert_eq!(config.log_filter(), "debug");
    }

    #[test]
    fn test_credentials() {
        let mut config = valid();
        assert!(config.mqtt.credentials().is_none());
        config.mqtt.username = "ha".to_string();
        config.mqtt.password = "secret".to_string();
        assert_eq!(config.mqtt.credentials(), Some(("ha", "secret")));
    }
}
