use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use application::SyncLoop;
use bridge_agent::{Args, loop_config};
use domain::{EntityRegistry, Transport};
use infrastructure::messaging::availability_will;
use infrastructure::{BridgeConfig, BusFactory, HardwareManager, MqttClient, OfflineTransport};

async fn run() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    // 1. Load Configuration
    let config_dir = args.resolve_config_dir();
    let mut config = BridgeConfig::load(&config_dir)
        .with_context(|| format!("Failed to load configuration from {config_dir}"))?;
    args.apply_overrides(&mut config);
    config.validate().context("Invalid command line override")?;

    // 2. Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.log_filter()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = std::process::id(),
        config_dir = %config_dir,
        "KC868-AP bridge starting"
    );

    // 3. Hardware
    let io = BusFactory::create(&config.hardware)?;
    let mut hardware =
        HardwareManager::new(io.bus, io.relays, &config.hardware, config.retry_policy());
    hardware.init().await;

    // 4. Broker session
    let layout = config.topic_layout();
    let registry = Arc::new(EntityRegistry::new(layout.clone()));

    let mut mqtt_client = None;
    // Keeps the event channel open when MQTT is disabled
    let mut _offline_events = None;
    let (transport, events): (Arc<dyn Transport>, _) = if config.mqtt.enabled {
        info!(host = %config.mqtt.host, port = config.mqtt.port, client_id = %config.mqtt.client_id, "Connecting to MQTT Broker...");
        let client = MqttClient::new(&config.mqtt, Some(availability_will(&layout)))?;
        // Subscribe before the first ConnAck can be processed
        let events = client.subscribe_events();
        mqtt_client = Some(client.clone());
        (Arc::new(client) as Arc<dyn Transport>, events)
    } else {
        warn!("MQTT disabled, running hardware only");
        let (tx, rx) = broadcast::channel(1);
        _offline_events = Some(tx);
        (Arc::new(OfflineTransport) as Arc<dyn Transport>, rx)
    };

    // 5. Sync loop until Ctrl-C
    let mut sync = SyncLoop::new(
        Box::new(hardware),
        transport,
        events,
        registry,
        loop_config(&config.system),
    );

    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutting down..."),
            Err(err) => warn!(error = %err, "Unable to listen for shutdown signal"),
        }
        trigger.cancel();
    });

    let result = sync.run(shutdown).await;

    // 6. Offline, all outputs off
    sync.shutdown().await;
    if let Some(client) = mqtt_client {
        if let Err(e) = client.disconnect().await {
            warn!(error = %e, "MQTT disconnect failed");
        }
        // Let the event loop flush the offline message
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    result.context("Sync loop stopped")?;
    info!("Good bye!");
    Ok(())
}

fn main() {
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("CRITICAL ERROR: failed to start runtime: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = rt.block_on(run()) {
        eprintln!("\nCRITICAL ERROR: {:?}", e);
        std::process::exit(1);
    }
}
