//! Conversation-correlation envelope.
//!
//! The skill-facing dialog verbs (ask/answer/end) travel over global topics,
//! so every reply must carry its conversation id inside the payload. The
//! formatter here is stateless: it tags a caller-supplied structured payload
//! and serializes it, nothing more.

use serde_json::{Map, Value};

use crate::keys;

/// Merge a conversation id into a structured payload and serialize it.
///
/// The caller's fields win except for the correlation key itself, which is
/// always overwritten with the given id.
pub fn correlated(conversation_id: &str, mut payload: Map<String, Value>) -> Vec<u8> {
    payload.insert(
        keys::CONVERSATION_ID.to_string(),
        Value::String(conversation_id.to_string()),
    );
    Value::Object(payload).to_string().into_bytes()
}
