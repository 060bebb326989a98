//! Command line and wiring helpers for the bridge binary

use std::path::Path;
use std::time::Duration;

use application::SyncLoopConfig;
use clap::Parser;
use infrastructure::BridgeConfig;
use infrastructure::config::SystemConfig;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to config directory
    #[arg(long, default_value = "config")]
    pub config_dir: String,

    /// Override MQTT Host
    #[arg(long)]
    pub mqtt_host: Option<String>,

    /// Override MQTT Port
    #[arg(long)]
    pub mqtt_port: Option<u16>,

    /// Override MQTT client id (also the discovery device id)
    #[arg(long)]
    pub client_id: Option<String>,
}

impl Args {
    /// Config directory, falling back to the crate's own when run from the workspace root
    pub fn resolve_config_dir(&self) -> String {
        let dev_dir = format!("crates/bridge-agent/{}", self.config_dir);
        if !Path::new(&self.config_dir).exists() && Path::new(&dev_dir).exists() {
            return dev_dir;
        }
        self.config_dir.clone()
    }

    pub fn apply_overrides(&self, config: &mut BridgeConfig) {
        if let Some(host) = &self.mqtt_host {
            config.mqtt.host = host.clone();
        }
        if let Some(port) = self.mqtt_port {
            config.mqtt.port = port;
        }
        if let Some(client_id) = &self.client_id {
            config.mqtt.client_id = client_id.clone();
        }
    }
}

pub fn loop_config(system: &SystemConfig) -> SyncLoopConfig {
    SyncLoopConfig {
        tick_interval: Duration::from_millis(system.tick_interval),
        scan_interval: Duration::from_millis(system.input_scan_interval),
        maintenance_interval: Duration::from_millis(system.gc_interval),
        discovery_interval: Duration::from_millis(system.discovery_interval),
    }
}
