//! Inbound lines translated into the events roles react to.

use super::message::Message;

const CTCP_DELIM: char = '\x01';

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IrcEvent {
    /// RPL_WELCOME (001); `nick` is the nickname the server accepted.
    Welcome { nick: String },
    Join { nick: String, channel: String },
    Public { nick: String, target: String, text: String },
    /// CTCP ACTION (`/me`) in a channel.
    Action { nick: String, target: String, text: String },
    Private { nick: String, text: String },
    NickChanged { old: String, new: String },
    /// ERR_NICKNAMEINUSE (433).
    NicknameInUse { attempted: String },
    /// ERR_NOSUCHNICK (401).
    NoSuchNick { nick: String },
    /// The transport closed. Emitted exactly once per connection.
    Disconnected { reason: String },
}

fn is_channel(target: &str) -> bool {
    target.starts_with('#') || target.starts_with('&')
}

impl IrcEvent {
    /// Translate a parsed line. Lines the bridge has no use for yield `None`.
    pub fn from_message(msg: &Message) -> Option<Self> {
        match msg.command.as_str() {
            "001" => Some(Self::Welcome {
                nick: msg.param(0)?.to_string(),
            }),
            "433" => Some(Self::NicknameInUse {
                attempted: msg.param(1)?.to_string(),
            }),
            "401" => Some(Self::NoSuchNick {
                nick: msg.param(1)?.to_string(),
            }),
            "JOIN" => Some(Self::Join {
                nick: msg.source_nick()?.to_string(),
                channel: msg.param(0)?.to_string(),
            }),
            "NICK" => Some(Self::NickChanged {
                old: msg.source_nick()?.to_string(),
                new: msg.param(0)?.to_string(),
            }),
            "PRIVMSG" => Self::from_privmsg(msg),
            _ => None,
        }
    }

    fn from_privmsg(msg: &Message) -> Option<Self> {
        let nick = msg.source_nick()?.to_string();
        let target = msg.param(0)?.to_string();
        let text = msg.param(1)?;

        if let Some(ctcp) = text.strip_prefix(CTCP_DELIM) {
            let ctcp = ctcp.strip_suffix(CTCP_DELIM).unwrap_or(ctcp);
            let action = ctcp.strip_prefix("ACTION ")?;
            if !is_channel(&target) {
                return None;
            }
            return Some(Self::Action {
                nick,
                target,
                text: action.to_string(),
            });
        }

        if is_channel(&target) {
            Some(Self::Public {
                nick,
                target,
                text: text.to_string(),
            })
        } else {
            Some(Self::Private {
                nick,
                text: text.to_string(),
            })
        }
    }
}
