//! Configuration loading.
//!
//! One YAML file per participant, loaded once at process start into a typed
//! [`SdkConfig`] and passed by reference to whatever needs it; there is no
//! global configuration state. The raw tree is kept alongside the typed
//! sections so ad-hoc values can still be read with a dotted path.
//!
//! ```yaml
//! skill:
//!   name: weather
//!   version: 1.0.0
//!   intents:
//!     forecast: [location, date]
//! messaging:
//!   transport: mqtt
//!   host: 127.0.0.1
//!   port: 1883
//! ```

use std::fmt;
use std::path::Path;

use serde::Deserialize;
use serde_yaml::Value;

use atlas_protocol::SkillDescriptor;

use crate::error::{SdkError, SdkResult};
use crate::transport::TransportKind;

/// Broker connection parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Session identifier presented to the broker; generated when absent.
    pub client_id: Option<String>,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            username: None,
            password: None,
            client_id: None,
        }
    }
}

impl BrokerConfig {
    /// Whether the connection uses credentials.
    pub fn is_secured(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }
}

impl fmt::Display for BrokerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.username {
            Some(username) => write!(f, "{username}:***@{}:{}", self.host, self.port),
            None => write!(f, "{}:{}", self.host, self.port),
        }
    }
}

/// The `messaging:` config section: which transport to use and where the
/// broker lives.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MessagingConfig {
    pub transport: TransportKind,
    #[serde(flatten)]
    pub broker: BrokerConfig,
}

/// The `channel:` config section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Channel id; generated when absent. Must be unique per channel and per
    /// user, since it addresses the channel's topics.
    pub id: Option<String>,
    pub user_id: Option<String>,
}

/// A fully loaded configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SdkConfig {
    pub messaging: MessagingConfig,
    /// Present when this process hosts a skill.
    pub skill: Option<SkillDescriptor>,
    /// Present when this process hosts a channel.
    pub channel: Option<ChannelConfig>,
    #[serde(skip)]
    raw: Value,
}

impl SdkConfig {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> SdkResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| SdkError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(contents: &str) -> SdkResult<Self> {
        let raw: Value = serde_yaml::from_str(contents)?;
        let mut config: SdkConfig = serde_yaml::from_str(contents)?;
        config.raw = raw;
        Ok(config)
    }

    /// Read a value from the raw tree by dotted path, e.g.
    /// `messaging.host`. Returns `None` anywhere along a missing path.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut current = &self.raw;
        for part in path.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }
}
