//! The puppet command: unit of control crossing from Discord to IRC.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable Discord user snowflake.
pub type UserId = u64;
/// Discord channel snowflake.
pub type ChannelId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    Active,
    Die,
    Send,
    SendDm,
    Afk,
    Unafk,
    Nick,
    JoinPart,
    /// Anything this version does not know. Logged and dropped.
    #[serde(other)]
    Unknown,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Die => "die",
            Self::Send => "send",
            Self::SendDm => "send_dm",
            Self::Afk => "afk",
            Self::Unafk => "unafk",
            Self::Nick => "nick",
            Self::JoinPart => "join_part",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Variant payload: channel ids for `active`/`join_part`, text for `send`/`send_dm`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandData {
    Channels(Vec<ChannelId>),
    Text(String),
}

/// Immutable once enqueued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireCommand")]
pub struct PuppetCommand {
    /// Sanitized display name.
    pub nick: String,
    pub display_name: String,
    /// Composed nickname, without the puppet suffix.
    pub irc_nick: String,
    /// Raw Discord username.
    pub name: String,
    pub id: UserId,
    #[serde(default)]
    pub channel: Option<ChannelId>,
    pub command: CommandKind,
    #[serde(default)]
    pub data: Option<CommandData>,
    /// Seconds since the Unix epoch.
    #[serde(default)]
    pub timestamp: f64,
    /// Recipient nickname for `send_dm`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

/// `channel` as producers send it: a channel id, or for `send_dm` the
/// recipient nickname.
#[derive(Deserialize)]
#[serde(untagged)]
enum ChannelField {
    Id(ChannelId),
    Name(String),
}

#[derive(Deserialize)]
struct WireCommand {
    nick: String,
    display_name: String,
    irc_nick: String,
    name: String,
    id: UserId,
    #[serde(default)]
    channel: Option<ChannelField>,
    command: CommandKind,
    #[serde(default)]
    data: Option<CommandData>,
    #[serde(default)]
    timestamp: f64,
    #[serde(default)]
    target: Option<String>,
}

impl From<WireCommand> for PuppetCommand {
    fn from(wire: WireCommand) -> Self {
        let (channel, target) = match wire.channel {
            Some(ChannelField::Id(id)) => (Some(id), wire.target),
            Some(ChannelField::Name(name)) => match name.parse::<ChannelId>() {
                Ok(id) => (Some(id), wire.target),
                Err(_) => (None, wire.target.or(Some(name))),
            },
            None => (None, wire.target),
        };
        Self {
            nick: wire.nick,
            display_name: wire.display_name,
            irc_nick: wire.irc_nick,
            name: wire.name,
            id: wire.id,
            channel,
            command: wire.command,
            data: wire.data,
            timestamp: wire.timestamp,
            target,
        }
    }
}

impl PuppetCommand {
    pub fn kind(&self) -> CommandKind {
        self.command
    }

    pub fn channels(&self) -> Option<&[ChannelId]> {
        match &self.data {
            Some(CommandData::Channels(ids)) => Some(ids),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.data {
            Some(CommandData::Text(text)) => Some(text),
            _ => None,
        }
    }
}
