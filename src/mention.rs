//! IRC nickname <-> Discord user lookup for rewriting relayed text.
//!
//! Keys are full puppet nicknames (composed part plus suffix), produced by
//! [`NickPolicy`](crate::nick::NickPolicy), so the table and the puppets agree
//! on every byte of the nickname.

use std::collections::HashMap;

use regex::Regex;
use tracing::{debug, warn};

use crate::discord::DiscordUser;

/// Owned by the Discord-side pipeline. One instance per bridge.
#[derive(Debug, Default)]
pub struct MentionLookup {
    entries: HashMap<String, DiscordUser>,
    pattern: Option<Regex>,
}

impl MentionLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `user` under the puppet nickname `nick`, replacing any prior entry.
    pub fn insert(&mut self, nick: impl Into<String>, user: DiscordUser) {
        self.entries.insert(nick.into(), user);
        self.rebuild();
    }

    pub fn remove(&mut self, nick: &str) -> Option<DiscordUser> {
        let removed = self.entries.remove(nick);
        if removed.is_some() {
            self.rebuild();
        } else {
            warn!(nick = %nick, "Nickname not present in mention lookup");
        }
        removed
    }

    /// Drop whatever nickname is registered for a Discord user.
    pub fn remove_user(&mut self, user_id: u64) -> Option<(String, DiscordUser)> {
        let nick = self.nick_for(user_id)?.to_string();
        let user = self.entries.remove(&nick)?;
        self.rebuild();
        Some((nick, user))
    }

    pub fn resolve(&self, nick: &str) -> Option<&DiscordUser> {
        self.entries.get(nick)
    }

    /// Reverse lookup: the puppet nickname registered for a Discord user.
    pub fn nick_for(&self, user_id: u64) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, user)| user.id == user_id)
            .map(|(nick, _)| nick.as_str())
    }

    /// Find an avatar for an IRC author by Discord display name or puppet nickname.
    pub fn avatar_for(&self, author: &str) -> Option<&str> {
        self.entries
            .get(author)
            .or_else(|| self.entries.values().find(|u| u.display_name == author))
            .and_then(|u| u.avatar_url.as_deref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replace every known puppet nickname in `text` with a Discord mention.
    pub fn rewrite_irc_mentions(&self, text: &str) -> String {
        let Some(pattern) = &self.pattern else {
            return text.to_string();
        };
        pattern
            .replace_all(text, |caps: &regex::Captures<'_>| match self.entries.get(&caps[0]) {
                Some(user) => user.mention(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }

    fn rebuild(&mut self) {
        if self.entries.is_empty() {
            self.pattern = None;
            return;
        }

        let mut keys: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        // Leftmost-first alternation: longer nicknames must win over their prefixes.
        keys.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        let alternation = keys.into_iter().map(regex::escape).collect::<Vec<_>>().join("|");

        match Regex::new(&format!(r"\b({alternation})\b")) {
            Ok(re) => {
                debug!(entries = self.entries.len(), "Mention lookup rebuilt");
                self.pattern = Some(re);
            }
            Err(e) => {
                warn!(error = %e, "Failed to compile mention lookup, mentions disabled");
                self.pattern = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: u64, display_name: &str) -> DiscordUser {
        DiscordUser {
            id,
            name: display_name.to_lowercase(),
            display_name: display_name.to_string(),
            avatar_url: Some(format!("https://cdn.example/{id}.png")),
        }
    }

    #[test]
    fn test_rewrite_known_nick() {
        let mut lookup = MentionLookup::new();
        lookup.insert("alice[alice]_d2", user(1, "alice"));
        assert_eq!(
            lookup.rewrite_irc_mentions("hi alice[alice]_d2, how are you"),
            "hi <@1>, how are you"
        );
    }

    #[test]
    fn test_rewrite_prefers_longest_nick() {
        let mut lookup = MentionLookup::new();
        lookup.insert("bob_d2", user(1, "bob"));
        lookup.insert("bob_d2x_d2", user(2, "bobx"));
        assert_eq!(lookup.rewrite_irc_mentions("bob_d2x_d2: ping"), "<@2>: ping");
        assert_eq!(lookup.rewrite_irc_mentions("bob_d2: ping"), "<@1>: ping");
    }

    #[test]
    fn test_rewrite_requires_word_boundary() {
        let mut lookup = MentionLookup::new();
        lookup.insert("carol_d2", user(3, "carol"));
        assert_eq!(lookup.rewrite_irc_mentions("xcarol_d2"), "xcarol_d2");
    }

    #[test]
    fn test_empty_lookup_passes_through() {
        let lookup = MentionLookup::new();
        assert_eq!(lookup.rewrite_irc_mentions("nothing here"), "nothing here");
    }

    #[test]
    fn test_remove_stops_rewriting() {
        let mut lookup = MentionLookup::new();
        lookup.insert("dave_d2", user(4, "dave"));
        assert!(lookup.remove("dave_d2").is_some());
        assert!(lookup.remove("dave_d2").is_none());
        assert!(lookup.is_empty());
        assert_eq!(lookup.rewrite_irc_mentions("dave_d2"), "dave_d2");
    }

    #[test]
    fn test_avatar_by_display_name_or_nick() {
        let mut lookup = MentionLookup::new();
        lookup.insert("Eve[eve]_d2", user(5, "Eve"));
        assert_eq!(lookup.avatar_for("Eve"), Some("https://cdn.example/5.png"));
        assert_eq!(lookup.avatar_for("Eve[eve]_d2"), Some("https://cdn.example/5.png"));
        assert_eq!(lookup.avatar_for("mallory"), None);
        assert_eq!(lookup.resolve("Eve[eve]_d2").map(|u| u.id), Some(5));
        assert_eq!(lookup.nick_for(5), Some("Eve[eve]_d2"));
        assert_eq!(lookup.nick_for(6), None);
    }

    #[test]
    fn test_remove_user_by_id() {
        let mut lookup = MentionLookup::new();
        lookup.insert("Finn[finn]_d2", user(6, "Finn"));
        lookup.insert("Gus[gus]_d2", user(7, "Gus"));

        let (nick, removed) = lookup.remove_user(6).unwrap();
        assert_eq!(nick, "Finn[finn]_d2");
        assert_eq!(removed.id, 6);
        assert!(lookup.remove_user(6).is_none());
        assert_eq!(lookup.len(), 1);
        assert_eq!(lookup.rewrite_irc_mentions("Finn[finn]_d2 Gus[gus]_d2"), "Finn[finn]_d2 <@7>");
    }
}
