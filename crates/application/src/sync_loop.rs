use std::sync::Arc;
use std::time::Duration;

use domain::{
    Availability, DomainError, EntityKind, EntityRegistry, Hal, InboundMessage, StateTable,
    Transport, TransportEvent,
};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::messaging::{CommandRouter, DiscoveryPublisher, Outcome, publish_state};
use crate::scanner::InputScanner;

/// Loop periods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncLoopConfig {
    /// Network tick: drain transport events, scan, maybe maintain
    pub tick_interval: Duration,
    pub scan_interval: Duration,
    pub maintenance_interval: Duration,
    pub discovery_interval: Duration,
}

impl Default for SyncLoopConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(50),
            scan_interval: Duration::from_millis(10),
            maintenance_interval: Duration::from_secs(10),
            discovery_interval: Duration::from_secs(60),
        }
    }
}

impl SyncLoopConfig {
    /// Whole ticks per `interval`, at least one
    fn ticks_per(&self, interval: Duration) -> u64 {
        let tick = self.tick_interval.as_millis().max(1);
        (interval.as_millis() / tick).max(1) as u64
    }
}

/// Counters reported by maintenance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub ticks: u64,
    pub commands_applied: u64,
    pub commands_ignored: u64,
    pub commands_rejected: u64,
    pub hardware_errors: u64,
    pub publish_errors: u64,
    pub scan_failures: u64,
    pub input_changes: u64,
}

/// Single-task owner of the bridge state
///
/// Owns the [`StateTable`]; every mutation happens on this task, so command
/// handling, scanning and maintenance never interleave.
pub struct SyncLoop {
    hal: Box<dyn Hal>,
    transport: Arc<dyn Transport>,
    events: broadcast::Receiver<TransportEvent>,
    registry: Arc<EntityRegistry>,
    router: CommandRouter,
    scanner: InputScanner,
    table: StateTable,
    config: SyncLoopConfig,
    maintenance_every: u64,
    discovery_every: u64,
    last_discovery_tick: u64,
    stats: LoopStats,
}

impl SyncLoop {
    pub fn new(
        hal: Box<dyn Hal>,
        transport: Arc<dyn Transport>,
        events: broadcast::Receiver<TransportEvent>,
        registry: Arc<EntityRegistry>,
        config: SyncLoopConfig,
    ) -> Self {
        Self {
            hal,
            transport,
            events,
            router: CommandRouter::new(registry.clone()),
            scanner: InputScanner::new(registry.clone()),
            registry,
            table: StateTable::new(),
            maintenance_every: config.ticks_per(config.maintenance_interval),
            discovery_every: config.ticks_per(config.discovery_interval),
            config,
            last_discovery_tick: 0,
            stats: LoopStats::default(),
        }
    }

    pub fn table(&self) -> &StateTable {
        &self.table
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    /// Run until `shutdown` is cancelled
    ///
    /// Only a closed event channel ends the loop with an error.
    pub async fn run(&mut self, shutdown: CancellationToken) -> Result<(), DomainError> {
        let mut tick = tokio::time::interval(self.config.tick_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut scan = tokio::time::interval(self.config.scan_interval);
        scan.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            tick_ms = self.config.tick_interval.as_millis() as u64,
            scan_ms = self.config.scan_interval.as_millis() as u64,
            "Sync loop started"
        );

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!("Sync loop stopping");
                    return Ok(());
                }
                _ = tick.tick() => self.tick().await?,
                _ = scan.tick() => self.scan().await,
            }
        }
    }

    /// Drain pending transport events, scan once, maintain when due
    pub async fn tick(&mut self) -> Result<(), DomainError> {
        loop {
            match self.events.try_recv() {
                Ok(event) => self.handle_event(event).await,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Transport events lagged, messages dropped");
                }
                Err(TryRecvError::Closed) => {
                    error!("Transport event channel closed");
                    return Err(DomainError::Transport(
                        "transport event channel closed".into(),
                    ));
                }
            }
        }

        self.scan().await;

        self.stats.ticks += 1;
        if self.stats.ticks % self.maintenance_every == 0 {
            self.maintenance().await;
        }
        Ok(())
    }

    pub async fn scan(&mut self) {
        match self
            .scanner
            .scan(self.hal.as_mut(), self.transport.as_ref(), &mut self.table)
            .await
        {
            Ok(report) => {
                self.stats.input_changes += report.changed.len() as u64;
                self.stats.publish_errors += report.failed.len() as u64;
            }
            Err(_) => self.stats.scan_failures += 1,
        }
    }

    /// Announce the device and replay every known state
    pub async fn on_connected(&mut self) {
        info!("Broker connected, announcing device");
        self.announce().await;
        self.table.set_availability(Availability::Online);
        self.republish_states().await;
    }

    /// Go offline and switch every output off
    pub async fn shutdown(&mut self) {
        self.table.set_availability(Availability::Offline);
        if self.transport.is_connected() {
            if let Err(e) = DiscoveryPublisher::publish_availability(
                self.transport.as_ref(),
                self.registry.layout(),
                Availability::Offline,
            )
            .await
            {
                error!(error = %e, "Failed to publish offline availability");
            }
        }
        self.hal.shutdown().await;
        info!(stats = ?self.stats, "Sync loop shut down");
    }

    async fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connected => self.on_connected().await,
            TransportEvent::Disconnected => {
                warn!("Broker connection lost");
                self.table.set_availability(Availability::Offline);
            }
            TransportEvent::Message(message) => self.handle_message(message).await,
        }
    }

    async fn handle_message(&mut self, message: InboundMessage) {
        if message.topic == self.registry.layout().birth_topic() {
            let payload = String::from_utf8_lossy(&message.payload);
            if payload.trim().eq_ignore_ascii_case(Availability::Online.as_str()) {
                info!("Home Assistant came online, republishing discovery");
                self.announce().await;
            }
            return;
        }

        let result = self
            .router
            .handle_command(
                self.hal.as_mut(),
                self.transport.as_ref(),
                &mut self.table,
                &message.topic,
                &message.payload,
            )
            .await;

        match result {
            Ok(Outcome::Applied { .. }) => self.stats.commands_applied += 1,
            Ok(Outcome::Ignored) => self.stats.commands_ignored += 1,
            Err(DomainError::InvalidPayload(_)) => self.stats.commands_rejected += 1,
            Err(DomainError::Transport(_)) => self.stats.publish_errors += 1,
            Err(_) => self.stats.hardware_errors += 1,
        }
    }

    /// Discovery plus `online`
    async fn announce(&mut self) {
        let transport = self.transport.as_ref();
        if let Err(e) = DiscoveryPublisher::publish_discovery(transport, &self.registry).await {
            error!(error = %e, "Discovery incomplete");
        }
        if let Err(e) = DiscoveryPublisher::publish_availability(
            transport,
            self.registry.layout(),
            Availability::Online,
        )
        .await
        {
            error!(error = %e, "Failed to publish availability");
        }
        self.last_discovery_tick = self.stats.ticks;
    }

    async fn republish_states(&mut self) {
        let mut messages: Vec<(String, String)> = Vec::new();

        for (index, state) in self.table.dimmers() {
            if let Ok(entity) = self.registry.resolve(EntityKind::Dimmer, index) {
                messages.push((entity.state_topic.clone(), state.to_payload()));
            }
        }
        for (index, state) in self.table.relays() {
            if let Ok(entity) = self.registry.resolve(EntityKind::Relay, index) {
                messages.push((entity.state_topic.clone(), state.to_payload().to_string()));
            }
        }
        if let Some(snapshot) = self.table.inputs() {
            for (index, state) in snapshot.iter() {
                if let Ok(entity) = self.registry.resolve(EntityKind::Input, index) {
                    messages.push((entity.state_topic.clone(), state.to_payload().to_string()));
                }
            }
        }

        for (topic, payload) in &messages {
            if publish_state(self.transport.as_ref(), topic, payload.as_bytes())
                .await
                .is_err()
            {
                self.stats.publish_errors += 1;
            }
        }
        debug!(count = messages.len(), "States republished");
    }

    async fn maintenance(&mut self) {
        if self.transport.is_connected() {
            if let Err(e) = DiscoveryPublisher::publish_availability(
                self.transport.as_ref(),
                self.registry.layout(),
                Availability::Online,
            )
            .await
            {
                warn!(error = %e, "Availability refresh failed");
            }
            if self.stats.ticks - self.last_discovery_tick >= self.discovery_every {
                debug!("Periodic discovery refresh");
                self.announce().await;
            }
            self.republish_states().await;
        }
        debug!(stats = ?self.stats, "Maintenance");
    }
}
