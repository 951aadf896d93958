//! Discord side of the bridge.
//!
//! The gateway/REST client itself lives outside this crate. This module
//! holds the types crossing the boundary, the [`DiscordOutbound`] seam a
//! client implements, the drainers that feed it, and a JSON-lines adapter
//! ([`stdio`]) used when no client is linked in.

pub mod relay;
pub mod stdio;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::DiscordError;
use crate::nick::{NickPolicy, sanitize};
use crate::puppet::{ChannelId, CommandData, CommandKind, PuppetCommand, UserId};

pub use relay::{run_direct, run_relay};

/// What the bridge knows about a Discord guild member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscordUser {
    pub id: UserId,
    /// Account username.
    pub name: String,
    /// Guild nickname or global display name.
    pub display_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl DiscordUser {
    /// Discord mention markup.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }

    /// Composed nickname without suffix.
    pub fn composed_nick(&self, policy: &NickPolicy) -> String {
        policy.compose(&self.name, &self.display_name)
    }

    /// Full IRC nickname; also the [`MentionLookup`](crate::mention::MentionLookup) key.
    pub fn puppet_nick(&self, policy: &NickPolicy) -> String {
        policy.puppet_nick(&self.composed_nick(policy))
    }
}

/// Public IRC message headed for a linked Discord channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayMessage {
    pub author: String,
    pub irc_channel: String,
    pub content: String,
}

/// Private IRC traffic for one Discord user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectMessage {
    pub author: String,
    pub recipient: UserId,
    pub content: String,
    /// Bridge-generated error notice rather than a relayed message.
    pub error: bool,
}

/// Outbound operations a Discord client must provide.
#[async_trait]
pub trait DiscordOutbound: Send + Sync {
    async fn send_as_webhook(
        &self,
        channel: ChannelId,
        author: &str,
        avatar_url: &str,
        text: &str,
    ) -> Result<(), DiscordError>;

    async fn send_direct_message(&self, user: UserId, text: &str) -> Result<(), DiscordError>;
}

/// Build a command for `user` the way the Discord client enqueues them.
pub fn command_for(
    user: &DiscordUser,
    kind: CommandKind,
    policy: &NickPolicy,
    channel: Option<ChannelId>,
    data: Option<CommandData>,
) -> PuppetCommand {
    PuppetCommand {
        nick: sanitize(&user.display_name),
        display_name: user.display_name.clone(),
        irc_nick: user.composed_nick(policy),
        name: user.name.clone(),
        id: user.id,
        channel,
        command: kind,
        data,
        timestamp: Utc::now().timestamp_millis() as f64 / 1000.0,
        target: None,
    }
}
