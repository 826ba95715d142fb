//! Canonical wire vocabulary for the atlas dialog protocol.
//!
//! Everything a participant puts on the wire is defined here: the topic name
//! table and its addressed-topic builders, the payload key constants, the
//! discovery descriptors and the conversation-correlation envelope. The crate
//! is pure data (no I/O, no transport assumptions) so both skills and
//! channels (and the server itself) can share one vocabulary.

pub mod descriptor;
pub mod envelope;
pub mod keys;
pub mod topics;

pub use descriptor::SkillDescriptor;
