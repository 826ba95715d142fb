//! Command-line overrides for foreground runs.
//!
//! Binaries flatten [`BrokerArgs`] into their own clap parser to get the
//! conventional `--config` / `-H host` / `-p port` / `-u user:password`
//! flags; flags win over the config file.

use std::path::PathBuf;

use clap::Args;

use crate::config::{MessagingConfig, SdkConfig};
use crate::error::SdkResult;

#[derive(Debug, Clone, Args)]
pub struct BrokerArgs {
    /// Path to the YAML config file
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Broker host address
    #[arg(short = 'H', long)]
    pub host: Option<String>,

    /// Broker port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Broker credentials in the form user:password
    #[arg(short, long, value_name = "USER:PASSWORD")]
    pub user: Option<String>,
}

impl BrokerArgs {
    /// Load the config file if one was given (defaults otherwise) and apply
    /// the flag overrides on top.
    pub fn load_config(&self) -> SdkResult<SdkConfig> {
        let mut config = match &self.config {
            Some(path) => SdkConfig::from_yaml_file(path)?,
            None => SdkConfig::default(),
        };
        self.apply(&mut config.messaging);
        Ok(config)
    }

    /// Apply the flag overrides to a messaging config.
    pub fn apply(&self, messaging: &mut MessagingConfig) {
        if let Some(host) = &self.host {
            messaging.broker.host = host.clone();
        }
        if let Some(port) = self.port {
            messaging.broker.port = port;
        }
        if let Some(user) = &self.user {
            let (username, password) = match user.split_once(':') {
                Some((username, password)) => (username.to_string(), password.to_string()),
                None => (user.clone(), String::new()),
            };
            messaging.broker.username = Some(username);
            messaging.broker.password = Some(password);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(host: Option<&str>, port: Option<u16>, user: Option<&str>) -> BrokerArgs {
        BrokerArgs {
            config: None,
            host: host.map(str::to_string),
            port,
            user: user.map(str::to_string),
        }
    }

    #[test]
    fn flags_override_the_defaults() {
        let mut messaging = MessagingConfig::default();
        args(Some("broker.local"), Some(8883), None).apply(&mut messaging);

        assert_eq!(messaging.broker.host, "broker.local");
        assert_eq!(messaging.broker.port, 8883);
        assert!(messaging.broker.username.is_none());
    }

    #[test]
    fn user_flag_splits_on_the_first_colon() {
        let mut messaging = MessagingConfig::default();
        args(None, None, Some("atlas:se:cret")).apply(&mut messaging);

        assert_eq!(messaging.broker.username.as_deref(), Some("atlas"));
        assert_eq!(messaging.broker.password.as_deref(), Some("se:cret"));
        assert!(messaging.broker.is_secured());
    }

    #[test]
    fn user_flag_without_a_colon_is_a_bare_username() {
        let mut messaging = MessagingConfig::default();
        args(None, None, Some("atlas")).apply(&mut messaging);

        assert_eq!(messaging.broker.username.as_deref(), Some("atlas"));
        assert_eq!(messaging.broker.password.as_deref(), Some(""));
    }
}
