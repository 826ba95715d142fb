//! In-process loopback transport.
//!
//! Publishes are delivered straight back into the local bus. Useful for
//! tests and for single-process setups where skill and channel share one
//! process and no broker is involved.

use async_trait::async_trait;
use bytes::Bytes;
use log::debug;

use crate::bus::{CONNECTED_TOPIC, DISCONNECTED_TOPIC, Inbound};
use crate::error::SdkResult;
use crate::transport::Transport;

pub struct LoopbackTransport {
    inbound: Inbound,
}

impl LoopbackTransport {
    pub fn new(inbound: Inbound) -> Self {
        Self { inbound }
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn connect(&self) -> SdkResult<()> {
        debug!("loopback transport connected");
        self.inbound.dispatch(CONNECTED_TOPIC, None);
        Ok(())
    }

    async fn disconnect(&self) -> SdkResult<()> {
        debug!("loopback transport disconnected");
        self.inbound.dispatch(DISCONNECTED_TOPIC, None);
        Ok(())
    }

    fn publish(&self, topic: &str, payload: Option<Bytes>) {
        self.inbound.dispatch(topic, payload.as_deref());
    }

    fn subscribe(&self, _topic: &str) {
        // Every local topic is already "subscribed": delivery goes through
        // the bus registry directly.
    }

    fn unsubscribe(&self, _topic: &str) {}
}
