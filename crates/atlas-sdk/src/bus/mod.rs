//! Publish/subscribe dispatch core.
//!
//! This module implements the in-process side of the protocol:
//!
//! - `hub`: the [`EventBus`]: topic registry, ordered handler dispatch,
//!   lifecycle-topic semantics and reference-counted start/stop for shared
//!   connections.
//! - `handlers`: payload decoding modes wrapped as dispatchable handlers.
//!
//! The bus is transport independent; see [`crate::transport`] for the
//! concrete ways it reaches a broker.

pub mod handlers;
mod hub;

pub use hub::{
    CONNECTED_TOPIC, DISCONNECTED_TOPIC, EventBus, HandlerId, Inbound, is_lifecycle,
};
