//! Drainers moving IRC traffic out to Discord.
//!
//! Delivery is best effort: failures are logged and the message dropped.

use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info, warn};

use super::{DirectMessage, DiscordOutbound, RelayMessage};
use crate::config::ChannelLinkTable;
use crate::mention::MentionLookup;

/// Avatar used for IRC authors with no Discord counterpart.
pub fn fallback_avatar(author: &str) -> String {
    format!("https://robohash.org/{author}?set=set4")
}

/// Drain public IRC messages into their linked Discord channels.
pub async fn run_relay(
    mut rx: mpsc::UnboundedReceiver<RelayMessage>,
    outbound: Arc<dyn DiscordOutbound>,
    links: Arc<ChannelLinkTable>,
    mentions: Arc<RwLock<MentionLookup>>,
) {
    while let Some(msg) = rx.recv().await {
        let Some(channel) = links.discord_channel(&msg.irc_channel) else {
            debug!(channel = %msg.irc_channel, "No Discord channel linked, dropping");
            continue;
        };

        let (text, avatar) = {
            let mentions = mentions.read().await;
            let avatar = mentions
                .avatar_for(&msg.author)
                .map(str::to_string)
                .unwrap_or_else(|| fallback_avatar(&msg.author));
            (mentions.rewrite_irc_mentions(&msg.content), avatar)
        };

        if let Err(e) = outbound
            .send_as_webhook(channel, &msg.author, &avatar, &text)
            .await
        {
            warn!(
                author = %msg.author,
                channel,
                error = %e,
                code = e.error_code(),
                "Webhook delivery failed, dropping message"
            );
        }
    }
    info!("Relay queue closed");
}

/// Drain private IRC traffic into Discord direct messages.
pub async fn run_direct(
    mut rx: mpsc::UnboundedReceiver<DirectMessage>,
    outbound: Arc<dyn DiscordOutbound>,
    mentions: Arc<RwLock<MentionLookup>>,
) {
    while let Some(msg) = rx.recv().await {
        let text = if msg.error {
            msg.content
        } else {
            let content = mentions.read().await.rewrite_irc_mentions(&msg.content);
            format!("Message from IRC user {}: {}", msg.author, content)
        };

        if let Err(e) = outbound.send_direct_message(msg.recipient, &text).await {
            warn!(
                user_id = msg.recipient,
                error = %e,
                code = e.error_code(),
                "Direct message delivery failed, dropping"
            );
        }
    }
    info!("Direct message queue closed");
}
