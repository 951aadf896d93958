//! JSON-lines boundary used when no Discord client is linked in.
//!
//! Puppet commands arrive one JSON object per line; deliveries leave as one
//! JSON object per line. Anything that does not parse is logged and skipped.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio_util::codec::{FramedRead, LinesCodec};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{DiscordOutbound, DiscordUser};
use crate::config::ChannelLinkTable;
use crate::error::DiscordError;
use crate::filters::{
    replace_channel_mentions, replace_custom_emotes, replace_timestamps, replace_user_mentions,
};
use crate::mention::MentionLookup;
use crate::nick::NickPolicy;
use crate::puppet::{ChannelId, CommandData, CommandKind, PuppetCommand, UserId};

/// Longest accepted input line.
const MAX_INPUT_LINE: usize = 64 * 1024;

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Delivery<'a> {
    Webhook {
        channel: ChannelId,
        author: &'a str,
        avatar_url: &'a str,
        text: &'a str,
    },
    DirectMessage {
        user: UserId,
        text: &'a str,
    },
}

/// Writes deliveries as JSON lines.
pub struct JsonLinesOutbound<W> {
    out: Mutex<W>,
}

impl<W> JsonLinesOutbound<W> {
    pub fn new(out: W) -> Self {
        Self { out: Mutex::new(out) }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

impl<W: AsyncWrite + Unpin + Send> JsonLinesOutbound<W> {
    async fn write(&self, delivery: &Delivery<'_>) -> Result<(), DiscordError> {
        let mut line = serde_json::to_vec(delivery)?;
        line.push(b'\n');
        let mut out = self.out.lock().await;
        out.write_all(&line).await?;
        out.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> DiscordOutbound for JsonLinesOutbound<W> {
    async fn send_as_webhook(
        &self,
        channel: ChannelId,
        author: &str,
        avatar_url: &str,
        text: &str,
    ) -> Result<(), DiscordError> {
        self.write(&Delivery::Webhook {
            channel,
            author,
            avatar_url,
            text,
        })
        .await
    }

    async fn send_direct_message(&self, user: UserId, text: &str) -> Result<(), DiscordError> {
        self.write(&Delivery::DirectMessage { user, text }).await
    }
}

/// Keep the mention table in step with puppet lifecycle commands.
///
/// Entries are keyed by puppet nickname but owned per user, so a rename
/// replaces the user's entry and `die` removes it whatever nick it carries.
async fn track_mentions(
    command: &PuppetCommand,
    policy: &NickPolicy,
    mentions: &RwLock<MentionLookup>,
) {
    match command.kind() {
        CommandKind::Active | CommandKind::Nick => {
            let nick = policy.puppet_nick(&command.irc_nick);
            let mut mentions = mentions.write().await;
            let avatar_url = mentions
                .remove_user(command.id)
                .and_then(|(_, previous)| previous.avatar_url);
            let user = DiscordUser {
                id: command.id,
                name: command.name.clone(),
                display_name: command.display_name.clone(),
                avatar_url,
            };
            debug!(user_id = command.id, nick = %nick, "Mention entry updated");
            mentions.insert(nick, user);
        }
        CommandKind::Die => {
            if mentions.write().await.remove_user(command.id).is_none() {
                debug!(user_id = command.id, "No mention entry to remove");
            }
        }
        _ => {}
    }
}

/// Turn Discord markup into text IRC users can read.
pub fn render_for_irc(
    text: &str,
    mentions: &MentionLookup,
    links: &ChannelLinkTable,
    now: DateTime<Utc>,
) -> String {
    let text = replace_user_mentions(text, |id| mentions.nick_for(id).map(str::to_string));
    let text = replace_channel_mentions(&text, |id| {
        links
            .irc_channel(id)
            .map(|name| name.trim_start_matches('#').to_string())
    });
    let text = replace_custom_emotes(&text);
    replace_timestamps(&text, now)
}

/// Read puppet commands from `input` until EOF or shutdown.
pub async fn run_commands<R: AsyncRead + Unpin>(
    input: R,
    commands: mpsc::UnboundedSender<PuppetCommand>,
    policy: NickPolicy,
    links: Arc<ChannelLinkTable>,
    mentions: Arc<RwLock<MentionLookup>>,
    shutdown: CancellationToken,
) {
    let mut lines = FramedRead::new(input, LinesCodec::new_with_max_length(MAX_INPUT_LINE));
    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => break,
            line = lines.next() => line,
        };
        let line = match line {
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                warn!(error = %e, "Unreadable command line, skipping");
                continue;
            }
            None => {
                info!("Command input closed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<PuppetCommand>(&line) {
            Ok(mut command) => {
                debug!(user_id = command.id, kind = %command.kind(), "Command received");
                track_mentions(&command, &policy, &mentions).await;
                if let Some(CommandData::Text(text)) = &mut command.data {
                    *text = render_for_irc(text, &*mentions.read().await, &links, Utc::now());
                }
                if commands.send(command).is_err() {
                    warn!("Supervisor queue closed, stopping command input");
                    break;
                }
            }
            Err(e) => warn!(error = %e, "Malformed command, skipping"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deliveries_are_json_lines() {
        let outbound = JsonLinesOutbound::new(Vec::new());
        outbound
            .send_as_webhook(100, "carl", "https://a/b.png", "hello")
            .await
            .unwrap();
        outbound.send_direct_message(9, "psst").await.unwrap();

        let written = String::from_utf8(outbound.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = written
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines[0]["type"], "webhook");
        assert_eq!(lines[0]["channel"], 100);
        assert_eq!(lines[0]["author"], "carl");
        assert_eq!(lines[1]["type"], "direct_message");
        assert_eq!(lines[1]["user"], 9);
        assert_eq!(lines[1]["text"], "psst");
    }

    #[tokio::test]
    async fn test_commands_skip_garbage_and_track_mentions() {
        let input = concat!(
            r#"{"nick":"ann","display_name":"Ann","irc_nick":"Ann[ann]","name":"ann","id":9,"command":"active","data":[100]}"#,
            "\n",
            "not json\n",
            "\n",
            r#"{"nick":"ann","display_name":"Ann","irc_nick":"Ann[ann]","name":"ann","id":9,"channel":100,"command":"send","data":"hi"}"#,
            "\n",
            r#"{"nick":"ann","display_name":"Ann","irc_nick":"Ann[ann]","name":"ann","id":9,"channel":100,"command":"send","data":"<@9> see <#100> <:blob:123>"}"#,
            "\n",
        );
        let (tx, mut rx) = mpsc::unbounded_channel();
        let links = Arc::new(ChannelLinkTable::new([(100, "#general".to_string())]));
        let mentions = Arc::new(RwLock::new(MentionLookup::new()));

        run_commands(
            input.as_bytes(),
            tx,
            NickPolicy::new("_d2", 6),
            links,
            mentions.clone(),
            CancellationToken::new(),
        )
        .await;

        assert_eq!(rx.recv().await.unwrap().kind(), CommandKind::Active);
        assert_eq!(rx.recv().await.unwrap().text(), Some("hi"));
        assert_eq!(
            rx.recv().await.unwrap().text(),
            Some("Ann[ann]_d2 see #general :blob:")
        );
        assert!(rx.recv().await.is_none());
        assert_eq!(mentions.read().await.resolve("Ann[ann]_d2").map(|u| u.id), Some(9));
    }

    #[tokio::test]
    async fn test_nick_change_moves_mention_entry() {
        let input = concat!(
            r#"{"nick":"ann","display_name":"Ann","irc_nick":"Ann[ann]","name":"ann","id":9,"command":"active","data":[100]}"#,
            "\n",
            r#"{"nick":"annie","display_name":"Annie","irc_nick":"Annie[ann]","name":"ann","id":9,"command":"nick"}"#,
            "\n",
            r#"{"nick":"annie","display_name":"Annie","irc_nick":"Annie[ann]","name":"ann","id":9,"channel":100,"command":"send","data":"<@9> here"}"#,
            "\n",
        );
        let (tx, mut rx) = mpsc::unbounded_channel();
        let links = Arc::new(ChannelLinkTable::new([(100, "#general".to_string())]));
        let mentions = Arc::new(RwLock::new(MentionLookup::new()));

        run_commands(
            input.as_bytes(),
            tx,
            NickPolicy::new("_d2", 6),
            links,
            mentions.clone(),
            CancellationToken::new(),
        )
        .await;

        assert_eq!(rx.recv().await.unwrap().kind(), CommandKind::Active);
        assert_eq!(rx.recv().await.unwrap().kind(), CommandKind::Nick);
        assert_eq!(rx.recv().await.unwrap().text(), Some("Annie[ann]_d2 here"));

        let lookup = mentions.read().await;
        assert_eq!(lookup.len(), 1);
        assert!(lookup.resolve("Ann[ann]_d2").is_none());
        assert_eq!(lookup.resolve("Annie[ann]_d2").map(|u| u.id), Some(9));
        assert_eq!(lookup.rewrite_irc_mentions("hi Annie[ann]_d2"), "hi <@9>");
    }

    #[tokio::test]
    async fn test_die_removes_entry_by_user() {
        let mentions = RwLock::new(MentionLookup::new());
        let policy = NickPolicy::new("_d2", 6);
        let mut command: PuppetCommand = serde_json::from_str(
            r#"{"nick":"ann","display_name":"Ann","irc_nick":"Ann[ann]","name":"ann","id":9,"command":"active"}"#,
        )
        .unwrap();
        track_mentions(&command, &policy, &mentions).await;

        command.command = CommandKind::Die;
        command.irc_nick = "Renamed[ann]".to_string();
        track_mentions(&command, &policy, &mentions).await;
        assert!(mentions.read().await.is_empty());
    }
}
