//! Discord markup to IRC-readable text.
//!
//! Pure functions; lookups of users and channels are supplied by the caller
//! so these stay independent of any Discord client.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::{Captures, Regex};

use crate::puppet::{ChannelId, UserId};

static USER_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<@!?(\d+)>").expect("user mention pattern"));
static CHANNEL_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<#!?(\d+)>").expect("channel mention pattern"));
static CUSTOM_EMOTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<a?:([^:<>]+):\d+>").expect("custom emote pattern"));
static TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<t:(-?\d+)(?::([tTdDfFR]))?>").expect("timestamp pattern")
});

/// `<@id>` / `<@!id>` -> IRC nickname. Unknown ids are left untouched.
pub fn replace_user_mentions(text: &str, resolve: impl Fn(UserId) -> Option<String>) -> String {
    USER_MENTION
        .replace_all(text, |caps: &Captures<'_>| {
            caps[1]
                .parse::<UserId>()
                .ok()
                .and_then(&resolve)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// `<#id>` -> `#name`. Unknown ids are left untouched.
pub fn replace_channel_mentions(
    text: &str,
    resolve: impl Fn(ChannelId) -> Option<String>,
) -> String {
    CHANNEL_MENTION
        .replace_all(text, |caps: &Captures<'_>| {
            match caps[1].parse::<ChannelId>().ok().and_then(&resolve) {
                Some(name) => format!("#{name}"),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// `<:name:id>` and `<a:name:id>` -> `:name:`.
pub fn replace_custom_emotes(text: &str) -> String {
    CUSTOM_EMOTE.replace_all(text, ":$1:").into_owned()
}

/// Render `<t:unix[:style]>` timestamps as plain text relative to `now`.
pub fn replace_timestamps(text: &str, now: DateTime<Utc>) -> String {
    TIMESTAMP
        .replace_all(text, |caps: &Captures<'_>| {
            let Some(at) = caps[1]
                .parse::<i64>()
                .ok()
                .and_then(|secs| DateTime::from_timestamp(secs, 0))
            else {
                return caps[0].to_string();
            };
            let style = caps.get(2).map_or("f", |m| m.as_str());
            render_timestamp(at, style, now)
        })
        .into_owned()
}

fn render_timestamp(at: DateTime<Utc>, style: &str, now: DateTime<Utc>) -> String {
    let format = match style {
        "t" => "%H:%M",
        "T" => "%H:%M:%S",
        "d" => "%m/%d/%Y",
        "D" => "%B %d, %Y",
        "F" => "%A, %B %d, %Y at %H:%M",
        "R" => return format_relative(at, now),
        _ => "%B %d, %Y at %H:%M",
    };
    at.format(format).to_string()
}

const UNITS: [(&str, i64); 5] = [
    ("year", 31_536_000),
    ("month", 2_592_000),
    ("day", 86_400),
    ("hour", 3_600),
    ("minute", 60),
];

/// `5 hours ago`, `in 3 days`, using the largest whole unit.
pub fn format_relative(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = (at - now).num_seconds();
    let past = diff < 0;
    let seconds = diff.abs();

    let (value, unit) = UNITS
        .iter()
        .find(|(_, len)| seconds >= *len)
        .map_or((seconds, "second"), |(unit, len)| (seconds / len, *unit));
    let plural = if value == 1 { "" } else { "s" };

    if past {
        format!("{value} {unit}{plural} ago")
    } else {
        format!("in {value} {unit}{plural}")
    }
}
