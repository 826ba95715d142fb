//! Transport layer: how the event bus reaches the outside world.
//!
//! The bus only ever talks to a [`Transport`]: the trait covers the physical
//! connect/disconnect pair plus fire-and-forget publish and topic
//! subscription. Inbound messages flow the other way, from the transport into
//! the bus, through an [`Inbound`](crate::bus::Inbound) handle handed to the
//! transport at construction time.
//!
//! Transports are a closed set selected by configuration (no runtime class
//! loading): `mqtt` for broker-backed operation, `loopback` for single-process
//! and test setups.

mod loopback;
mod mqtt;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;

use crate::error::{SdkError, SdkResult};

pub use loopback::LoopbackTransport;
pub use mqtt::MqttTransport;

/// Publish/subscribe capability the bus depends on.
///
/// `publish`, `subscribe` and `unsubscribe` are fire-and-forget: failures are
/// logged by the implementation, never surfaced to the dispatch path. Only
/// the initial `connect` may fail loudly; an unreachable broker is fatal at
/// startup.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Establish the physical connection. Implementations signal the local
    /// `connected` lifecycle topic once the connection is usable (for a
    /// broker transport: after every registered topic has been re-subscribed).
    async fn connect(&self) -> SdkResult<()>;

    /// Tear the connection down, signaling `disconnected` locally.
    async fn disconnect(&self) -> SdkResult<()>;

    /// Send a payload to a topic. Never blocks the dispatch path.
    fn publish(&self, topic: &str, payload: Option<Bytes>);

    /// Establish a live network subscription for a topic.
    fn subscribe(&self, topic: &str);

    /// Drop the live network subscription for a topic.
    fn unsubscribe(&self, topic: &str);
}

/// The transports this build knows how to construct.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Mqtt,
    Loopback,
}

impl FromStr for TransportKind {
    type Err = SdkError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "mqtt" => Ok(Self::Mqtt),
            "loopback" => Ok(Self::Loopback),
            other => Err(SdkError::UnknownTransport(other.to_string())),
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mqtt => write!(f, "mqtt"),
            Self::Loopback => write!(f, "loopback"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_known_names_and_rejects_the_rest() {
        assert_eq!("mqtt".parse::<TransportKind>().unwrap(), TransportKind::Mqtt);
        assert_eq!(
            "loopback".parse::<TransportKind>().unwrap(),
            TransportKind::Loopback
        );
        assert!(matches!(
            "zeromq".parse::<TransportKind>(),
            Err(SdkError::UnknownTransport(_))
        ));
    }
}
