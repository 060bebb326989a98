use std::sync::{
    Arc, RwLock,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;

use async_trait::async_trait;
use domain::{Availability, DomainError, InboundMessage, TopicLayout, Transport, TransportEvent};
use rumqttc::{AsyncClient, Event, LastWill, MqttOptions, Packet, QoS};
use tokio::sync::broadcast;
use tokio::task;
use tracing::{error, info};

use crate::config::MqttConfig;

const KEEP_ALIVE: Duration = Duration::from_secs(20);
const RECONNECT_BACKOFF: Duration = Duration::from_secs(1);
/// Outgoing requests queued for the event loop
const REQUEST_CAPACITY: usize = 100;

/// Last will announcing the bridge offline, retained
pub fn availability_will(layout: &TopicLayout) -> LastWill {
    LastWill::new(
        layout.availability_topic(),
        Availability::Offline.as_str(),
        QoS::AtLeastOnce,
        true,
    )
}

fn read_subscriptions(subscriptions: &RwLock<Vec<String>>) -> Vec<String> {
    match subscriptions.read() {
        Ok(subs) => subs.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

/// Broker session backed by a rumqttc event loop task
///
/// Connection changes and inbound publishes are fanned out as
/// [`TransportEvent`]s on a broadcast channel. Tracked topics are
/// re-subscribed on every ConnAck.
#[derive(Clone)]
pub struct MqttClient {
    client: AsyncClient,
    tx: broadcast::Sender<TransportEvent>,
    connected: Arc<AtomicBool>,
    subscriptions: Arc<RwLock<Vec<String>>>,
}

impl MqttClient {
    pub fn new(config: &MqttConfig, last_will: Option<LastWill>) -> Result<Self, DomainError> {
        if config.host.trim().is_empty() {
            return Err(DomainError::Configuration("mqtt.host is empty".into()));
        }

        let mut mqttoptions = MqttOptions::new(&config.client_id, &config.host, config.port);
        mqttoptions.set_keep_alive(KEEP_ALIVE);
        // Persistent session so commands sent while reconnecting are delivered
        mqttoptions.set_clean_session(false);

        if let Some((username, password)) = config.credentials() {
            mqttoptions.set_credentials(username, password);
        }
        if let Some(will) = last_will {
            mqttoptions.set_last_will(will);
        }

        let (client, mut eventloop) = AsyncClient::new(mqttoptions, REQUEST_CAPACITY);
        let (tx, _) = broadcast::channel(250);
        let tx_clone = tx.clone();
        let connected = Arc::new(AtomicBool::new(false));
        let connected_clone = connected.clone();

        let subscriptions = Arc::new(RwLock::new(Vec::new()));
        let subscriptions_clone = subscriptions.clone();
        let client_clone = client.clone();
        let host = format!("{}:{}", config.host, config.port);

        task::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        let msg = InboundMessage::new(publish.topic, publish.payload.to_vec());
                        if tx_clone.send(TransportEvent::Message(msg)).is_err() {
                            tracing::debug!("Dropped MQTT message, no receiver");
                        }
                    }
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!(broker = %host, "MQTT Connected");
                        connected_clone.store(true, Ordering::Relaxed);

                        let subs = read_subscriptions(&subscriptions_clone);
                        if !subs.is_empty() {
                            info!(count = subs.len(), "Re-subscribing to topics");
                            for topic in subs {
                                // Never wait on the queue this task drains
                                if let Err(e) = client_clone.try_subscribe(&topic, QoS::AtLeastOnce) {
                                    error!(topic = %topic, error = %e, "Failed to re-subscribe");
                                }
                            }
                        }
                        let _ = tx_clone.send(TransportEvent::Connected);
                    }
                    Ok(Event::Outgoing(rumqttc::Outgoing::Disconnect)) => {
                        if connected_clone.swap(false, Ordering::Relaxed) {
                            let _ = tx_clone.send(TransportEvent::Disconnected);
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!(broker = %host, error = ?e, "MQTT Connection error");
                        if connected_clone.swap(false, Ordering::Relaxed) {
                            let _ = tx_clone.send(TransportEvent::Disconnected);
                        }
                        tokio::time::sleep(RECONNECT_BACKOFF).await;
                    }
                }
            }
        });

        Ok(Self {
            client,
            tx,
            connected,
            subscriptions,
        })
    }

    /// Receiver for connection changes and inbound messages
    ///
    /// Take it before the first ConnAck to observe the initial `Connected`.
    pub fn subscribe_events(&self) -> broadcast::Receiver<TransportEvent> {
        self.tx.subscribe()
    }

    /// Flush the disconnect packet; the last will is not sent
    pub async fn disconnect(&self) -> Result<(), DomainError> {
        self.client
            .disconnect()
            .await
            .map_err(|e| DomainError::Transport(format!("Failed to disconnect: {}", e)))
    }
}

#[async_trait]
impl Transport for MqttClient {
    /// Queue a publish; a full request queue fails instead of blocking
    async fn publish(&self, topic: &str, payload: &[u8], retain: bool) -> Result<(), DomainError> {
        self.client
            .try_publish(topic, QoS::AtLeastOnce, retain, payload.to_vec())
            .map_err(|e| DomainError::Transport(format!("Failed to publish to {}: {}", topic, e)))
    }

    async fn subscribe(&self, topic: &str) -> Result<(), DomainError> {
        {
            let mut subs = match self.subscriptions.write() {
                Ok(subs) => subs,
                Err(poisoned) => poisoned.into_inner(),
            };
            if !subs.iter().any(|t| t == topic) {
                subs.push(topic.to_string());
            }
        }

        if !self.is_connected() {
            // Replayed on ConnAck
            tracing::debug!(topic = %topic, "Subscription deferred until connected");
            return Ok(());
        }

        self.client
            .try_subscribe(topic, QoS::AtLeastOnce)
            .map_err(|e| DomainError::Transport(format!("Failed to subscribe to {}: {}", topic, e)))
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }
}
