#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use domain::{DomainError, Transport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub topic: String,
    pub payload: String,
    pub retain: bool,
}

#[derive(Default)]
struct Inner {
    published: Mutex<Vec<Published>>,
    subscriptions: Mutex<Vec<String>>,
    connected: AtomicBool,
    fail_publishes: AtomicBool,
}

/// Transport that records every publish and subscription
#[derive(Clone, Default)]
pub struct RecordingTransport {
    inner: Arc<Inner>,
}

impl RecordingTransport {
    pub fn connected() -> Self {
        let transport = Self::default();
        transport.set_connected(true);
        transport
    }

    pub fn set_connected(&self, connected: bool) {
        self.inner.connected.store(connected, Ordering::SeqCst);
    }

    pub fn fail_publishes(&self, fail: bool) {
        self.inner.fail_publishes.store(fail, Ordering::SeqCst);
    }

    pub fn published(&self) -> Vec<Published> {
        self.inner.published.lock().unwrap().clone()
    }

    /// Payloads published to one topic, oldest first
    pub fn published_to(&self, topic: &str) -> Vec<String> {
        self.published()
            .into_iter()
            .filter(|p| p.topic == topic)
            .map(|p| p.payload)
            .collect()
    }

    pub fn subscriptions(&self) -> Vec<String> {
        self.inner.subscriptions.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.inner.published.lock().unwrap().clear();
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn publish(&self, topic: &str, payload: &[u8], retain: bool) -> Result<(), DomainError> {
        if self.inner.fail_publishes.load(Ordering::SeqCst) {
            return Err(DomainError::Transport("broker unavailable".into()));
        }
        self.inner.published.lock().unwrap().push(Published {
            topic: topic.to_string(),
            payload: String::from_utf8_lossy(payload).into_owned(),
            retain,
        });
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<(), DomainError> {
        self.inner
            .subscriptions
            .lock()
            .unwrap()
            .push(topic.to_string());
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }
}
