//! Splitting outgoing text into IRC-sized PRIVMSG payloads.
//!
//! A full line on the wire must stay within [`MAX_LINE_BYTES`] including the
//! `:nick!nick@host PRIVMSG target :` envelope the server will prepend when
//! relaying and the trailing CRLF.

use tracing::warn;

/// RFC 1459 line limit, CRLF included.
pub const MAX_LINE_BYTES: usize = 512;

/// Bytes the relayed line spends on everything but the payload.
pub fn envelope_overhead(nick: &str, hostname: &str, target: &str) -> usize {
    format!(":{nick}!{nick}@{hostname} PRIVMSG {target} :").len() + 2
}

/// Split `text` into payloads that each fit a PRIVMSG to `target` from `nick`.
pub fn split_message(text: &str, target: &str, nick: &str, hostname: &str) -> Vec<String> {
    let budget = MAX_LINE_BYTES.saturating_sub(envelope_overhead(nick, hostname, target));
    split_to_budget(text, budget)
}

/// Split `text` into pieces of at most `budget` UTF-8 bytes.
///
/// CR and LF are removed first. A cut that would land inside a word backs
/// off to the last space of the piece; a single word longer than the budget
/// is cut at the nearest char boundary. Spaces at split points are dropped.
pub fn split_to_budget(text: &str, budget: usize) -> Vec<String> {
    let cleaned: String = text.chars().filter(|c| !matches!(c, '\r' | '\n')).collect();
    let mut rest = cleaned.as_str();
    let mut chunks = Vec::new();

    while !rest.is_empty() {
        let cut = floor_char_boundary(rest, budget);
        if cut == 0 {
            warn!(budget, remaining = rest.len(), "Line budget too small for a single character");
            break;
        }

        let mut piece = &rest[..cut];
        let more = cut < rest.len();
        if more && !piece.ends_with(' ') && !rest[cut..].starts_with(' ') {
            if let Some(space) = piece.rfind(' ').filter(|&i| i > 0) {
                piece = &piece[..space];
            }
        }

        let taken = piece.len();
        let piece = if more { piece.trim_end_matches(' ') } else { piece };
        if !piece.is_empty() {
            chunks.push(piece.to_string());
        }
        rest = rest[taken..].trim_start();
    }

    chunks
}

/// Largest index `<= max` that sits on a char boundary of `s`.
fn floor_char_boundary(s: &str, max: usize) -> usize {
    if max >= s.len() {
        return s.len();
    }
    let mut idx = max;
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}
