//! One IRC identity per active Discord user.

use std::collections::BTreeSet;
use std::net::Ipv6Addr;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::command::{ChannelId, CommandKind, PuppetCommand, UserId};
use crate::address::derive_address;
use crate::chunk::split_message;
use crate::config::{ChannelLinkTable, ConnectionConfig};
use crate::discord::DirectMessage;
use crate::error::{SessionError, SupervisorError};
use crate::irc::{
    ConnectionMachine, Flow, IrcContext, IrcEvent, IrcHandle, Message, Role, SessionOutcome,
};
use crate::telemetry::spans;

/// Author shown on bridge-generated "no such nick" notices.
const NO_SUCH_NICK_AUTHOR: &str = "NOSUCHNICK";

/// Collaborators shared by every puppet.
#[derive(Clone)]
pub struct PuppetContext {
    pub irc: IrcContext,
    pub links: Arc<ChannelLinkTable>,
    pub direct: mpsc::UnboundedSender<DirectMessage>,
}

/// The [`Role`] a puppet's connection runs.
pub struct Puppet {
    user_id: UserId,
    nickname: String,
    channels: BTreeSet<ChannelId>,
    address: Ipv6Addr,
    links: Arc<ChannelLinkTable>,
    config: Arc<ConnectionConfig>,
    direct: mpsc::UnboundedSender<DirectMessage>,
}

impl Puppet {
    pub fn new(
        user_id: UserId,
        nickname: String,
        channels: impl IntoIterator<Item = ChannelId>,
        ctx: &PuppetContext,
    ) -> Self {
        let address = derive_address(&nickname);
        Self {
            user_id,
            nickname,
            channels: channels.into_iter().collect(),
            address,
            links: ctx.links.clone(),
            config: ctx.irc.config.clone(),
            direct: ctx.direct.clone(),
        }
    }

    pub fn address(&self) -> Ipv6Addr {
        self.address
    }

    pub fn channels(&self) -> &BTreeSet<ChannelId> {
        &self.channels
    }

    fn say(&self, irc: &IrcHandle, target: &str, text: &str) {
        for chunk in split_message(text, target, &self.nickname, &self.config.webirc_hostname) {
            irc.privmsg(target, &chunk);
        }
    }

    fn send(&self, command: &PuppetCommand, irc: &IrcHandle) {
        let Some(text) = command.text().filter(|t| !t.is_empty()) else {
            debug!("Empty send, ignoring");
            return;
        };
        let Some(target) = command.channel.and_then(|id| self.links.irc_channel(id)) else {
            debug!(channel = ?command.channel, "Send to unlinked channel, skipping");
            return;
        };
        self.say(irc, target, text);
    }

    fn send_dm(&self, command: &PuppetCommand, irc: &IrcHandle) {
        let Some(text) = command.text().filter(|t| !t.is_empty()) else {
            debug!("Empty direct message, ignoring");
            return;
        };
        let Some(target) = command.target.as_deref().filter(|t| !t.is_empty()) else {
            warn!("Direct message without a target nickname, dropping");
            return;
        };
        self.say(irc, target, text);
    }

    /// Join channels newly requested, part channels no longer requested.
    fn join_part(&mut self, requested: BTreeSet<ChannelId>, irc: &IrcHandle) {
        for id in self.channels.difference(&requested) {
            if let Some(channel) = self.links.irc_channel(*id) {
                irc.part(channel);
            }
        }
        for id in requested.difference(&self.channels) {
            if let Some(channel) = self.links.irc_channel(*id) {
                irc.join(channel);
            }
        }
        self.channels = requested;
    }

    fn deliver(&self, message: DirectMessage) {
        if self.direct.send(message).is_err() {
            warn!("Direct message queue closed, dropping");
        }
    }
}

impl Role for Puppet {
    type Command = PuppetCommand;
    const KIND: &'static str = "puppet";

    fn nickname(&self) -> &str {
        &self.nickname
    }

    fn set_nickname(&mut self, nick: String) {
        self.nickname = nick;
    }

    /// WEBIRC must precede registration so the server applies the spoofed host.
    fn preamble(&self) -> Vec<Message> {
        match &self.config.webirc_password {
            Some(password) => {
                let host = &self.config.webirc_hostname;
                vec![Message::webirc(password, host, host, &self.address.to_string())]
            }
            None => Vec::new(),
        }
    }

    fn on_ready(&mut self, irc: &IrcHandle) {
        // Only registered users may message the puppet.
        irc.mode(&self.nickname, "+R");
        for id in &self.channels {
            match self.links.irc_channel(*id) {
                Some(channel) => irc.join(channel),
                None => debug!(channel = id, "No IRC channel linked, not joining"),
            }
        }
    }

    fn on_event(&mut self, event: &IrcEvent, _irc: &IrcHandle) {
        match event {
            IrcEvent::Private { nick, text } => self.deliver(DirectMessage {
                author: nick.clone(),
                recipient: self.user_id,
                content: text.clone(),
                error: false,
            }),
            IrcEvent::NoSuchNick { nick } => self.deliver(DirectMessage {
                author: NO_SUCH_NICK_AUTHOR.to_string(),
                recipient: self.user_id,
                content: format!("ERROR: User '{nick}' not found, no such nick exists on irc!"),
                error: true,
            }),
            _ => {}
        }
    }

    fn on_command(&mut self, command: PuppetCommand, irc: &IrcHandle) -> Flow {
        debug!(kind = %command.kind(), "Handling command");
        match command.kind() {
            CommandKind::Send => self.send(&command, irc),
            CommandKind::SendDm => self.send_dm(&command, irc),
            CommandKind::Afk => irc.away(Some(&self.config.away_message)),
            CommandKind::Unafk => irc.away(None),
            CommandKind::Nick => {
                if command.irc_nick.is_empty() || command.irc_nick == self.nickname {
                    debug!("Nickname unchanged");
                } else {
                    info!(old = %self.nickname, new = %command.irc_nick, "Changing nickname");
                    irc.nick(&command.irc_nick);
                    self.nickname = command.irc_nick;
                }
            }
            CommandKind::JoinPart => match command.channels() {
                Some(ids) => self.join_part(ids.iter().copied().collect(), irc),
                None => warn!("join_part without a channel list, ignoring"),
            },
            CommandKind::Die => return Flow::Terminate(self.quit_message()),
            CommandKind::Active => debug!("Already active"),
            CommandKind::Unknown => error!("Unknown command kind, dropping"),
        }
        Flow::Continue
    }

    fn quit_message(&self) -> Option<String> {
        Some(self.config.quit_message.clone())
    }
}

/// Handle the supervisor keeps for a running puppet.
pub struct PuppetSession {
    user_id: UserId,
    nickname: String,
    address: Ipv6Addr,
    sender: mpsc::UnboundedSender<PuppetCommand>,
    task: JoinHandle<SessionOutcome>,
}

impl PuppetSession {
    /// Spawn the puppet's connection task.
    pub fn create(
        user_id: UserId,
        nickname: String,
        channels: impl IntoIterator<Item = ChannelId>,
        ctx: &PuppetContext,
    ) -> Self {
        let puppet = Puppet::new(user_id, nickname.clone(), channels, ctx);
        let address = puppet.address();
        let (sender, rx) = mpsc::unbounded_channel();
        let span = spans::puppet(user_id, &nickname);
        let task = ConnectionMachine::new(puppet, ctx.irc.clone())
            .with_commands(rx)
            .spawn(span);
        Self {
            user_id,
            nickname,
            address,
            sender,
            task,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Nickname the session was created with.
    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    pub fn address(&self) -> Ipv6Addr {
        self.address
    }

    /// FIFO push; never blocks.
    pub fn enqueue(&self, command: PuppetCommand) -> Result<(), SupervisorError> {
        self.sender
            .send(command)
            .map_err(|_| SupervisorError::SessionGone(self.user_id))
    }

    /// Wait for the connection task to finish.
    pub async fn join(self) -> Result<SessionOutcome, SessionError> {
        Ok(self.task.await?)
    }
}
