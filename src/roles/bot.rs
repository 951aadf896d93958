//! Admin bot answering operator commands from IRC.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::irc::casemap::irc_eq;
use crate::irc::{IrcEvent, IrcHandle, Role};
use crate::metrics::BridgeStats;

pub struct AdminBot {
    nickname: String,
    channel: String,
    stats: Arc<BridgeStats>,
}

/// `H:MM:SS`, prefixed with `N day(s), ` once a day has passed.
pub fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    let (days, rem) = (secs / 86_400, secs % 86_400);
    let clock = format!("{}:{:02}:{:02}", rem / 3600, (rem % 3600) / 60, rem % 60);
    match days {
        0 => clock,
        1 => format!("1 day, {clock}"),
        n => format!("{n} days, {clock}"),
    }
}

impl AdminBot {
    pub fn new(
        nickname: impl Into<String>,
        channel: impl Into<String>,
        stats: Arc<BridgeStats>,
    ) -> Self {
        Self {
            nickname: nickname.into(),
            channel: channel.into(),
            stats,
        }
    }

    /// `<botnick>: <cmd>` addressed to us, if it is.
    fn addressed<'a>(&self, text: &'a str) -> Option<&'a str> {
        let (addressee, cmd) = text.split_once(':')?;
        irc_eq(addressee, &self.nickname).then(|| cmd.trim())
    }

    fn command(&self, nick: &str, cmd: &str, irc: &IrcHandle) {
        info!(from = %nick, cmd = %cmd, "Admin command");
        match cmd {
            "stats" => {
                let snapshot = self.stats.snapshot();
                irc.privmsg(nick, &format!("Puppets total: {}", snapshot.puppets_active));
                irc.privmsg(
                    nick,
                    &format!("Relayed messages from Discord: {}", snapshot.discord_messages),
                );
                irc.privmsg(
                    nick,
                    &format!("Relayed messages from IRC: {}", snapshot.irc_messages),
                );
                irc.privmsg(nick, &format!("Uptime: {}", format_uptime(snapshot.uptime)));
            }
            other => irc.privmsg(nick, &format!("Not understood: {other}")),
        }
    }
}

impl Role for AdminBot {
    type Command = ();
    const KIND: &'static str = "bot";

    fn nickname(&self) -> &str {
        &self.nickname
    }

    fn set_nickname(&mut self, nick: String) {
        self.nickname = nick;
    }

    fn on_ready(&mut self, irc: &IrcHandle) {
        irc.join(&self.channel);
    }

    fn on_event(&mut self, event: &IrcEvent, irc: &IrcHandle) {
        match event {
            IrcEvent::Private { nick, text } => self.command(nick, text.trim(), irc),
            IrcEvent::Public { nick, text, .. } => match self.addressed(text) {
                Some(cmd) => self.command(nick, cmd, irc),
                None => debug!("Channel message not for us"),
            },
            _ => {}
        }
    }
}
