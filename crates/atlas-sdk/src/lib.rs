//! Client SDK for the atlas dialog protocol.
//!
//! Skills and channels are independent processes talking to an atlas server
//! through a message broker. This crate gives them the pieces they need and
//! nothing more:
//!
//! - [`bus`]: the in-process event bus: topic registry, ordered dispatch,
//!   local lifecycle signals, reference-counted start/stop for shared
//!   connections.
//! - [`transport`]: how the bus reaches the broker (`mqtt`) or stays
//!   in-process (`loopback`).
//! - [`adapters`]: the two protocol state machines. A skill answers
//!   discovery pings and handles intents; a channel owns a remote session
//!   and relays dialog events.
//! - [`skill`] / [`channel`]: high-level participants with config loading
//!   and a foreground run loop.
//!
//! The wire vocabulary (topics, payload keys, descriptors, envelopes) lives
//! in [`atlas_protocol`], re-exported here as [`protocol`].

pub mod adapters;
pub mod bus;
pub mod channel;
pub mod cli;
pub mod config;
pub mod error;
pub mod message;
pub mod skill;
pub mod transport;

mod shutdown;
mod sync;

pub use atlas_protocol as protocol;

pub use bus::EventBus;
pub use channel::{Channel, ChannelBuilder};
pub use config::{BrokerConfig, ChannelConfig, MessagingConfig, SdkConfig};
pub use error::{SdkError, SdkResult};
pub use message::IntentMessage;
pub use skill::Skill;
