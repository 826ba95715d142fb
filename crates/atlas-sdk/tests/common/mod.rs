//! Test utilities and common setup.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;

use atlas_sdk::EventBus;
use atlas_sdk::bus::{CONNECTED_TOPIC, DISCONNECTED_TOPIC, Inbound};
use atlas_sdk::error::{SdkError, SdkResult};
use atlas_sdk::transport::Transport;

/// Transport double that records outbound traffic instead of sending it.
pub struct RecordingTransport {
    inbound: Inbound,
    pub connects: AtomicUsize,
    pub disconnects: AtomicUsize,
    published: Mutex<Vec<(String, Option<Vec<u8>>)>>,
}

impl RecordingTransport {
    pub fn new(inbound: Inbound) -> Self {
        Self {
            inbound,
            connects: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
            published: Mutex::new(Vec::new()),
        }
    }

    /// Payloads published to one topic, in order.
    pub fn published_to(&self, topic: &str) -> Vec<Option<Vec<u8>>> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    /// Every published (topic, payload) pair, in order.
    pub fn published(&self) -> Vec<(String, Option<Vec<u8>>)> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn connect(&self) -> SdkResult<()> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.inbound.dispatch(CONNECTED_TOPIC, None);
        Ok(())
    }

    async fn disconnect(&self) -> SdkResult<()> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        self.inbound.dispatch(DISCONNECTED_TOPIC, None);
        Ok(())
    }

    fn publish(&self, topic: &str, payload: Option<Bytes>) {
        self.published
            .lock()
            .unwrap()
            .push((topic.to_string(), payload.map(|bytes| bytes.to_vec())));
    }

    fn subscribe(&self, _topic: &str) {}

    fn unsubscribe(&self, _topic: &str) {}
}

/// A bus bound to a recording transport.
pub fn recording_bus() -> (EventBus, Arc<RecordingTransport>) {
    let bus = EventBus::new();
    let transport = Arc::new(RecordingTransport::new(bus.inbound()));
    bus.bind(transport.clone());
    (bus, transport)
}

/// Transport double whose connect always fails, for startup-error paths.
pub struct UnreachableTransport {
    pub attempts: AtomicUsize,
}

impl UnreachableTransport {
    pub fn new() -> Self {
        Self {
            attempts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Transport for UnreachableTransport {
    async fn connect(&self) -> SdkResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(SdkError::ConnectFailed {
            endpoint: "localhost:1883".to_string(),
            message: "connection refused".to_string(),
        })
    }

    async fn disconnect(&self) -> SdkResult<()> {
        Ok(())
    }

    fn publish(&self, _topic: &str, _payload: Option<Bytes>) {}

    fn subscribe(&self, _topic: &str) {}

    fn unsubscribe(&self, _topic: &str) {}
}
