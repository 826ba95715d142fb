//! Payload key constants shared by every atlas component, so message fields
//! never live as magic strings at call sites.
//!
//! Keys prefixed with `__` are correlation metadata merged into structured
//! payloads by the SDK itself; plain keys are regular payload fields.

// Correlation metadata keys

pub const SESSION_ID: &str = "__sid";
pub const CONVERSATION_ID: &str = "__cid";
pub const USER_ID: &str = "__uid";
pub const LANG: &str = "__lang";
pub const SERVER_VERSION: &str = "__version";
pub const SETTINGS: &str = "__env";

// Plain payload keys

pub const UID: &str = "uid";
pub const PLAIN_LANG: &str = "lang";
pub const STARTED_AT: &str = "started_at";
