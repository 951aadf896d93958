//! Discord channel <-> IRC channel mapping.

use std::collections::{BTreeMap, HashMap};

use tracing::warn;

use crate::irc::casemap::irc_to_lower;
use crate::puppet::ChannelId;

/// Bidirectional, immutable after construction. Shared by `Arc`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelLinkTable {
    to_irc: BTreeMap<ChannelId, String>,
    /// Keyed by case-folded IRC channel name.
    to_discord: HashMap<String, ChannelId>,
}

impl ChannelLinkTable {
    pub fn new(links: impl IntoIterator<Item = (ChannelId, String)>) -> Self {
        let mut table = Self::default();
        for (id, channel) in links {
            table.to_discord.insert(irc_to_lower(&channel), id);
            table.to_irc.insert(id, channel);
        }
        table
    }

    /// Build from the raw `[links]` section. Entries whose key is not a
    /// channel id are skipped; validation reports them.
    pub fn from_config(links: &BTreeMap<String, String>) -> Self {
        Self::new(links.iter().filter_map(|(id, channel)| match id.trim().parse() {
            Ok(id) => Some((id, channel.clone())),
            Err(_) => {
                warn!(id = %id, "Skipping link with invalid Discord channel id");
                None
            }
        }))
    }

    pub fn irc_channel(&self, id: ChannelId) -> Option<&str> {
        self.to_irc.get(&id).map(String::as_str)
    }

    pub fn discord_channel(&self, irc_channel: &str) -> Option<ChannelId> {
        self.to_discord.get(&irc_to_lower(irc_channel)).copied()
    }

    /// Every linked IRC channel, in Discord id order.
    pub fn irc_channels(&self) -> impl Iterator<Item = &str> {
        self.to_irc.values().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.to_irc.len()
    }

    pub fn is_empty(&self) -> bool {
        self.to_irc.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_both_ways() {
        let table = ChannelLinkTable::new([(1, "#General".to_string()), (2, "#dev".to_string())]);
        assert_eq!(table.irc_channel(1), Some("#General"));
        assert_eq!(table.irc_channel(3), None);
        assert_eq!(table.discord_channel("#general"), Some(1));
        assert_eq!(table.discord_channel("#DEV"), Some(2));
        assert_eq!(table.discord_channel("#other"), None);
        assert_eq!(table.irc_channels().collect::<Vec<_>>(), vec!["#General", "#dev"]);
    }

    #[test]
    fn test_from_config_skips_bad_ids() {
        let mut raw = BTreeMap::new();
        raw.insert("100".to_string(), "#a".to_string());
        raw.insert("nope".to_string(), "#b".to_string());
        let table = ChannelLinkTable::from_config(&raw);
        assert_eq!(table.len(), 1);
        assert_eq!(table.irc_channel(100), Some("#a"));
    }
}
