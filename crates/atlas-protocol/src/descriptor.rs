//! Discovery descriptors.
//!
//! A skill announces itself by publishing its descriptor on the discovery
//! pong topic; the server broadcasts pings that may carry its own process
//! start time. Both sides of that exchange are defined here.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Everything a skill tells the server about itself.
///
/// Serialized as-is onto the discovery pong topic: intents flatten to a
/// name → slot-name-list map (`null` slots for intents declared without
/// parameters), settings to a plain list of setting names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillDescriptor {
    /// Skill name, shown by the server in discovery listings.
    pub name: String,

    /// Skill version string.
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Intent name → slot names needed by that intent.
    ///
    /// `None` means the intent takes no declared slots. The SDK inserts
    /// missing entries here when a handler is registered for an intent the
    /// descriptor never declared.
    #[serde(default)]
    pub intents: BTreeMap<String, Option<Vec<String>>>,

    /// Names of configuration settings this skill reads.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub settings: Vec<String>,
}

impl SkillDescriptor {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            author: None,
            description: None,
            intents: BTreeMap::new(),
            settings: Vec::new(),
        }
    }

    /// Declare an intent and the slots it needs.
    pub fn declare_intent(&mut self, name: impl Into<String>, slots: Option<Vec<String>>) {
        self.intents.insert(name.into(), slots);
    }

    /// Serialize the descriptor into a discovery pong payload.
    ///
    /// Produced fresh on every pong; the descriptor is never cached on the
    /// wire side, so late intent registrations show up in the next announce.
    pub fn to_pong_payload(&self) -> Vec<u8> {
        // A struct-to-value conversion cannot fail here: every field is
        // string/list/map shaped.
        serde_json::to_vec(self).expect("descriptor serializes to JSON")
    }
}

/// Discovery ping payload broadcast by the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoveryPing {
    /// Server process start time. Absent on older servers; channels use it
    /// to detect a restart and re-announce themselves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
}

impl DiscoveryPing {
    /// Read the server start time out of an already-decoded ping payload.
    ///
    /// Returns `None` when the field is missing or not a valid RFC 3339
    /// timestamp; both are tolerated, not errors.
    pub fn started_at_from(data: &serde_json::Map<String, Value>) -> Option<DateTime<Utc>> {
        data.get(crate::keys::STARTED_AT)
            .and_then(Value::as_str)
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|ts| ts.with_timezone(&Utc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_intents_roundtrip_through_pong_payload() {
        let mut descriptor = SkillDescriptor::new("echo", "1.0.0");
        descriptor.declare_intent("echo", Some(vec!["message".to_string()]));
        descriptor.declare_intent("quit", None);

        let payload = descriptor.to_pong_payload();
        let parsed: SkillDescriptor = serde_json::from_slice(&payload).unwrap();

        assert_eq!(parsed.intents, descriptor.intents);
        assert_eq!(
            parsed.intents.get("echo"),
            Some(&Some(vec!["message".to_string()]))
        );
        assert_eq!(parsed.intents.get("quit"), Some(&None));
    }

    #[test]
    fn ping_started_at_tolerates_missing_and_garbage() {
        let mut data = serde_json::Map::new();
        assert!(DiscoveryPing::started_at_from(&data).is_none());

        data.insert(
            crate::keys::STARTED_AT.to_string(),
            Value::String("not a timestamp".to_string()),
        );
        assert!(DiscoveryPing::started_at_from(&data).is_none());

        data.insert(
            crate::keys::STARTED_AT.to_string(),
            Value::String("2026-08-06T12:00:00Z".to_string()),
        );
        assert!(DiscoveryPing::started_at_from(&data).is_some());
    }
}
