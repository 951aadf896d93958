//! Public IRC traffic -> Discord.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::ChannelLinkTable;
use crate::discord::RelayMessage;
use crate::irc::{IrcEvent, IrcHandle, Role};
use crate::metrics::BridgeStats;

/// Sits in every linked channel and relays what non-puppets say.
pub struct Listener {
    nickname: String,
    /// Messages from nicknames ending in this are our own puppets echoing.
    puppet_suffix: String,
    links: Arc<ChannelLinkTable>,
    relay: mpsc::UnboundedSender<RelayMessage>,
    stats: Arc<BridgeStats>,
}

impl Listener {
    pub fn new(
        nickname: impl Into<String>,
        puppet_suffix: impl Into<String>,
        links: Arc<ChannelLinkTable>,
        relay: mpsc::UnboundedSender<RelayMessage>,
        stats: Arc<BridgeStats>,
    ) -> Self {
        Self {
            nickname: nickname.into(),
            puppet_suffix: puppet_suffix.into(),
            links,
            relay,
            stats,
        }
    }

    fn forward(&self, author: &str, channel: &str, content: String) {
        if author.ends_with(&self.puppet_suffix) {
            return;
        }
        if self.links.discord_channel(channel).is_none() {
            debug!(channel = %channel, "Message in unlinked channel, dropping");
            return;
        }
        let message = RelayMessage {
            author: author.to_string(),
            irc_channel: channel.to_string(),
            content,
        };
        if self.relay.send(message).is_err() {
            warn!("Relay queue closed, dropping message");
            return;
        }
        self.stats.irc_message();
    }
}

impl Role for Listener {
    type Command = ();
    const KIND: &'static str = "listener";

    fn nickname(&self) -> &str {
        &self.nickname
    }

    fn set_nickname(&mut self, nick: String) {
        self.nickname = nick;
    }

    fn on_ready(&mut self, irc: &IrcHandle) {
        for channel in self.links.irc_channels() {
            debug!(channel = %channel, "Listener joining");
            irc.join(channel);
        }
    }

    fn on_event(&mut self, event: &IrcEvent, _irc: &IrcHandle) {
        match event {
            IrcEvent::Public { nick, target, text } => self.forward(nick, target, text.clone()),
            IrcEvent::Action { nick, target, text } => {
                self.forward(nick, target, format!("*{text}*"))
            }
            _ => {}
        }
    }
}
