//! Participant adapters.
//!
//! An adapter owns one participant's side of the protocol on a shared bus:
//! which topics it listens on, what it announces, and how it reacts to the
//! discovery exchange. `activate` wires the subscriptions up, `deactivate`
//! tears every one of them down again.

mod channel;
mod skill;

pub use channel::{ChannelAdapter, ChannelCallbacks, EmptyCallback, JsonCallback};
pub use skill::SkillAdapter;
