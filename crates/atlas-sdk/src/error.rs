//! SDK error types.
//!
//! Only conditions that should stop a participant surface here. Everything
//! else (bad payloads, unknown topics, missing callbacks) degrades to a log
//! line and dispatch continues.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for SDK operations.
pub type SdkResult<T> = Result<T, SdkError>;

/// Errors that can cross the SDK's public API.
#[derive(Debug, Error)]
pub enum SdkError {
    /// The broker could not be reached. Fatal at startup; never retried
    /// automatically.
    #[error("could not connect to the broker at {endpoint}: {message}")]
    ConnectFailed { endpoint: String, message: String },

    /// The bus was started before a transport was bound to it.
    #[error("no transport bound to the event bus")]
    TransportUnbound,

    /// A config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A config file could not be parsed.
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// A required config section is missing.
    #[error("missing config section: {0}")]
    MissingConfig(&'static str),

    /// The config named a transport this build does not know.
    #[error("unknown transport kind: {0}")]
    UnknownTransport(String),
}
