//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use std::collections::HashSet;

use super::Config;
use crate::irc::casemap::irc_to_lower;
use crate::nick::{MAX_NICK_LEN, is_legal_fragment, is_legal_nick};
use crate::puppet::ChannelId;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("irc.server is required")]
    MissingServer,
    #[error("irc.port must be non-zero")]
    InvalidPort,
    #[error("irc.{0} is required")]
    MissingNickname(&'static str),
    #[error("irc.{field} is not a legal nickname: '{value}'")]
    IllegalNickname { field: &'static str, value: String },
    #[error("irc.puppet_suffix is required")]
    MissingSuffix,
    #[error("irc.puppet_suffix contains illegal nickname characters: '{0}'")]
    IllegalSuffix(String),
    #[error("irc.puppet_min_size must be at most {max}, got {got}")]
    MinSizeTooLarge { got: usize, max: usize },
    #[error("irc.bot_channel must start with '#' or '&', got '{0}'")]
    InvalidBotChannel(String),
    #[error("[links] must map at least one channel")]
    NoLinks,
    #[error("links key must be a Discord channel id, got '{0}'")]
    InvalidLinkId(String),
    #[error("links target must start with '#' or '&', got '{0}'")]
    InvalidChannelName(String),
    #[error("IRC channel linked more than once: '{0}'")]
    DuplicateIrcChannel(String),
}

fn is_channel_name(name: &str) -> bool {
    (name.starts_with('#') || name.starts_with('&'))
        && name.len() > 1
        && !name.contains([' ', ',', '\x07'])
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let irc = &config.irc;

    if irc.server.trim().is_empty() {
        errors.push(ValidationError::MissingServer);
    }
    if irc.port == 0 {
        errors.push(ValidationError::InvalidPort);
    }

    for (field, value) in [
        ("bot_nickname", &irc.bot_nickname),
        ("listener_nickname", &irc.listener_nickname),
    ] {
        if value.is_empty() {
            errors.push(ValidationError::MissingNickname(field));
        } else if !is_legal_nick(value) {
            errors.push(ValidationError::IllegalNickname {
                field,
                value: value.clone(),
            });
        }
    }

    // Suffix
    if irc.puppet_suffix.is_empty() {
        errors.push(ValidationError::MissingSuffix);
    } else if !is_legal_fragment(&irc.puppet_suffix) {
        errors.push(ValidationError::IllegalSuffix(irc.puppet_suffix.clone()));
    }
    if irc.puppet_min_size > MAX_NICK_LEN {
        errors.push(ValidationError::MinSizeTooLarge {
            got: irc.puppet_min_size,
            max: MAX_NICK_LEN,
        });
    }

    if !is_channel_name(&irc.bot_channel) {
        errors.push(ValidationError::InvalidBotChannel(irc.bot_channel.clone()));
    }

    // Links
    if config.links.is_empty() {
        errors.push(ValidationError::NoLinks);
    }
    let mut seen = HashSet::new();
    for (id, channel) in &config.links {
        if id.trim().parse::<ChannelId>().is_err() {
            errors.push(ValidationError::InvalidLinkId(id.clone()));
        }
        if !is_channel_name(channel) {
            errors.push(ValidationError::InvalidChannelName(channel.clone()));
        } else if !seen.insert(irc_to_lower(channel)) {
            errors.push(ValidationError::DuplicateIrcChannel(channel.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
