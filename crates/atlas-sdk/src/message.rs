//! Decoded intent payloads.

use serde_json::Value;

use atlas_protocol::keys;

use crate::bus::handlers::JsonPayload;

/// A recognized intent as delivered to a skill handler.
///
/// Wraps the decoded payload with accessors for the correlation metadata the
/// server merges in, the extracted slots, and the per-message settings.
#[derive(Debug, Clone)]
pub struct IntentMessage {
    data: JsonPayload,
}

impl IntentMessage {
    pub fn new(data: JsonPayload) -> Self {
        Self { data }
    }

    pub fn session_id(&self) -> Option<&str> {
        self.str_field(keys::SESSION_ID)
    }

    /// Conversation id to echo back in `ask`/`answer`/`end` replies.
    pub fn conversation_id(&self) -> Option<&str> {
        self.str_field(keys::CONVERSATION_ID)
    }

    pub fn user_id(&self) -> Option<&str> {
        self.str_field(keys::USER_ID)
    }

    /// Language tag of the conversation.
    pub fn lang(&self) -> Option<&str> {
        self.str_field(keys::LANG)
    }

    pub fn server_version(&self) -> Option<&str> {
        self.str_field(keys::SERVER_VERSION)
    }

    /// Value of a slot extracted by the server, if present.
    pub fn slot(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }

    /// String value of a slot, if present and a string.
    pub fn slot_str(&self, name: &str) -> Option<&str> {
        self.slot(name).and_then(Value::as_str)
    }

    /// Per-message setting value, delivered under the settings key.
    pub fn setting(&self, name: &str) -> Option<&Value> {
        self.data.get(keys::SETTINGS)?.get(name)
    }

    /// The whole decoded payload.
    pub fn data(&self) -> &JsonPayload {
        &self.data
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }
}
