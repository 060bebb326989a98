use std::fs;
use std::path::PathBuf;

use domain::DomainError;
use infrastructure::BridgeConfig;
use infrastructure::drivers::BusDriverType;
use uuid::Uuid;

fn config_dir(files: &[(&str, &str)]) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("kc868_test_{}", Uuid::new_v4()));
    fs::create_dir_all(&dir).unwrap();
    for (name, contents) in files {
        fs::write(dir.join(name), contents).unwrap();
    }
    dir
}

#[test]
fn test_load_default_file() {
    let dir = config_dir(&[(
        "default.json",
        r#"{
            "hardware": { "driver": "simulator", "addresses": { "pca9685": 65 } },
            "mqtt": { "host": "broker.local", "username": "ha", "password": "secret" }
        }"#,
    )]);

    let config = BridgeConfig::load(dir.to_str().unwrap()).unwrap();

    assert_eq!(config.hardware.driver, BusDriverType::Simulator);
    assert_eq!(config.hardware.addresses.pca9685, 0x41);
    // Untouched sections keep board defaults
    assert_eq!(config.hardware.addresses.inputs_1_8, 0x3A);
    assert_eq!(config.mqtt.host, "broker.local");
    assert_eq!(config.mqtt.port, 1883);
    assert_eq!(config.mqtt.credentials(), Some(("ha", "secret")));
    assert_eq!(config.mqtt.base_topic, "kc868-ap");

    fs::remove_dir_all(dir).ok();
}

#[test]
fn test_run_mode_file_overrides_default() {
    let dir = config_dir(&[
        ("default.json", r#"{ "mqtt": { "host": "broker.local" } }"#),
        (
            "production.json",
            r#"{ "mqtt": { "client_id": "kitchen" }, "system": { "debug": true } }"#,
        ),
    ]);

    let config = BridgeConfig::load(dir.to_str().unwrap()).unwrap();

    assert_eq!(config.mqtt.client_id, "kitchen");
    assert_eq!(config.topic_layout().device_id, "kitchen");
    assert_eq!(config.log_filter(), "debug");

    fs::remove_dir_all(dir).ok();
}

#[test]
fn test_environment_overrides_files() {
    let dir = config_dir(&[("default.json", r#"{ "mqtt": { "host": "broker.local" } }"#)]);

    // SAFETY: no other test in this binary reads KC868__SYSTEM__*
    unsafe { std::env::set_var("KC868__SYSTEM__TICK_INTERVAL", "75") };
    let config = BridgeConfig::load(dir.to_str().unwrap());
    unsafe { std::env::remove_var("KC868__SYSTEM__TICK_INTERVAL") };

    assert_eq!(config.unwrap().system.tick_interval, 75);

    fs::remove_dir_all(dir).ok();
}

#[test]
fn test_missing_default_file_is_fatal() {
    let dir = config_dir(&[]);

    let result = BridgeConfig::load(dir.to_str().unwrap());
    assert!(matches!(result, Err(DomainError::Configuration(_))));

    fs::remove_dir_all(dir).ok();
}

#[test]
fn test_invalid_values_are_rejected_on_load() {
    let dir = config_dir(&[(
        "default.json",
        r#"{ "mqtt": { "host": "broker.local" }, "hardware": { "pwm_frequency": 5000 } }"#,
    )]);

    let result = BridgeConfig::load(dir.to_str().unwrap());
    assert!(matches!(result, Err(DomainError::Configuration(msg)) if msg.contains("pwm_frequency")));

    fs::remove_dir_all(dir).ok();
}

#[test]
fn test_unknown_driver_is_rejected() {
    let dir = config_dir(&[(
        "default.json",
        r#"{ "mqtt": { "host": "broker.local" }, "hardware": { "driver": "spidev" } }"#,
    )]);

    assert!(BridgeConfig::load(dir.to_str().unwrap()).is_err());

    fs::remove_dir_all(dir).ok();
}
