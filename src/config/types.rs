//! Core configuration types and loading.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

use super::defaults::{
    default_away_message, default_log_level, default_port, default_puppet_min_size,
    default_quit_message, default_true, default_webhook_name, default_webirc_hostname,
};
use crate::irc::Backoff;
use crate::nick::NickPolicy;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Bridge configuration, one TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub global: GlobalConfig,
    pub irc: IrcConfig,
    #[serde(default)]
    pub discord: DiscordConfig,
    /// Discord channel id -> IRC channel name.
    #[serde(default)]
    pub links: BTreeMap<String, String>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn connection_config(&self) -> ConnectionConfig {
        let irc = &self.irc;
        ConnectionConfig {
            server: irc.server.clone(),
            port: irc.port,
            tls: irc.tls,
            verify_cert: irc.verify_cert,
            webirc_password: irc.webirc_password.clone().filter(|p| !p.is_empty()),
            webirc_hostname: irc.webirc_hostname.clone(),
            away_message: irc.away_message.clone(),
            quit_message: irc.quit_message.clone(),
            backoff: Backoff::default(),
        }
    }

    pub fn nick_policy(&self) -> NickPolicy {
        NickPolicy::new(self.irc.puppet_suffix.clone(), self.irc.puppet_min_size)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GlobalConfig {
    /// Tracing filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Prometheus metrics HTTP port; 0 disables the endpoint.
    #[serde(default)]
    pub metrics_port: u16,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            metrics_port: 0,
        }
    }
}

/// IRC side: server, the fixed identities, and puppet parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct IrcConfig {
    pub server: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub tls: bool,
    /// Verify the server certificate (only applies when tls = true).
    #[serde(default = "default_true")]
    pub verify_cert: bool,
    /// Admin bot nickname.
    pub bot_nickname: String,
    /// Channel the admin bot sits in.
    pub bot_channel: String,
    /// Nickname of the connection relaying IRC traffic to Discord.
    pub listener_nickname: String,
    /// Appended to every puppet nickname (e.g. `_d2`).
    pub puppet_suffix: String,
    /// Display-name floor for nickname composition.
    #[serde(default = "default_puppet_min_size")]
    pub puppet_min_size: usize,
    /// WEBIRC password; puppets skip the WEBIRC line when unset.
    #[serde(default)]
    pub webirc_password: Option<String>,
    #[serde(default = "default_webirc_hostname")]
    pub webirc_hostname: String,
    #[serde(default = "default_away_message")]
    pub away_message: String,
    #[serde(default = "default_quit_message")]
    pub quit_message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordConfig {
    /// Bot token for a linked Discord connector.
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_webhook_name")]
    pub webhook_name: String,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            webhook_name: default_webhook_name(),
        }
    }
}

/// Validated, immutable connection parameters shared by every IRC task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub server: String,
    pub port: u16,
    pub tls: bool,
    pub verify_cert: bool,
    pub webirc_password: Option<String>,
    pub webirc_hostname: String,
    pub away_message: String,
    pub quit_message: String,
    pub backoff: Backoff,
}

impl ConnectionConfig {
    /// Plaintext connection with every other field at its default.
    pub fn new(server: impl Into<String>, port: u16) -> Self {
        Self {
            server: server.into(),
            port,
            tls: false,
            verify_cert: true,
            webirc_password: None,
            webirc_hostname: default_webirc_hostname(),
            away_message: default_away_message(),
            quit_message: default_quit_message(),
            backoff: Backoff::default(),
        }
    }
}
