//! RFC 1459 case mapping for nickname and channel comparison.
//!
//! Besides ASCII letters, `[]\~` fold to `{}|^`.

#[inline]
pub const fn irc_lower_char(c: char) -> char {
    match c {
        '[' => '{',
        ']' => '}',
        '\\' => '|',
        '~' => '^',
        'A'..='Z' => c.to_ascii_lowercase(),
        _ => c,
    }
}

pub fn irc_to_lower(s: &str) -> String {
    s.chars().map(irc_lower_char).collect()
}

pub fn irc_eq(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a
            .chars()
            .zip(b.chars())
            .all(|(ca, cb)| irc_lower_char(ca) == irc_lower_char(cb))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folds_brackets() {
        assert_eq!(irc_to_lower("Name[Bob]\\~"), "name{bob}|^");
    }

    #[test]
    fn test_eq() {
        assert!(irc_eq("BridgeBot", "bridgebot"));
        assert!(irc_eq("a[b]", "A{B}"));
        assert!(!irc_eq("bot", "bot_"));
        assert!(!irc_eq("é", "É"));
    }
}
