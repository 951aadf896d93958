//! Nickname sanitizing and puppet nickname composition.
//!
//! Puppet nicknames have the shape `{display}[{username}]{suffix}`. The
//! composed part (without suffix) is also the key of the mention lookup
//! table, so composition must be stable byte-for-byte.

/// Maximum puppet nickname length, suffix included.
pub const MAX_NICK_LEN: usize = 30;

/// Substituted when a name sanitizes to nothing.
pub const EMPTY_NICK_PLACEHOLDER: &str = "_";

/// Check if a character is a "special" character allowed in nicknames.
///
/// Per RFC 2812: `[ ] \ ` ^ _ { | }`
#[inline]
fn is_special(c: char) -> bool {
    matches!(c, '[' | ']' | '\\' | '`' | '_' | '^' | '{' | '|' | '}')
}

#[inline]
fn is_leading(c: char) -> bool {
    c.is_ascii_alphabetic() || is_special(c)
}

#[inline]
fn is_legal(c: char) -> bool {
    c.is_ascii_alphanumeric() || is_special(c)
}

/// Strip a free-form display string down to IRC-legal nickname characters.
///
/// Surrounding whitespace is trimmed, an illegal first character becomes
/// `_`, and every other illegal character is dropped. Input that is empty
/// after trimming yields [`EMPTY_NICK_PLACEHOLDER`].
pub fn sanitize(name: &str) -> String {
    let mut chars = name.trim().chars();
    let Some(first) = chars.next() else {
        return EMPTY_NICK_PLACEHOLDER.to_string();
    };

    let mut out = String::with_capacity(name.len());
    out.push(if is_leading(first) { first } else { '_' });
    out.extend(chars.filter(|c| is_legal(*c)));
    out
}

/// Whether `nick` is made only of characters [`sanitize`] would keep.
pub fn is_legal_nick(nick: &str) -> bool {
    let mut chars = nick.chars();
    match chars.next() {
        Some(first) if is_leading(first) => chars.all(is_legal),
        _ => false,
    }
}

/// Whether `fragment` may appear after the first character of a nickname.
pub fn is_legal_fragment(fragment: &str) -> bool {
    fragment.chars().all(is_legal)
}

/// Parameters for composing puppet nicknames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NickPolicy {
    /// Appended to every puppet nickname (e.g. `_d2`).
    pub suffix: String,
    /// Display-name floor used when the username would be over-shrunk.
    pub min_display_size: usize,
    /// Total budget including brackets and suffix.
    pub max_len: usize,
}

impl NickPolicy {
    pub fn new(suffix: impl Into<String>, min_display_size: usize) -> Self {
        Self {
            suffix: suffix.into(),
            min_display_size,
            max_len: MAX_NICK_LEN,
        }
    }

    /// Compose `{display}[{username}]` from unsanitized names.
    pub fn compose(&self, username: &str, display_name: &str) -> String {
        compose_nick(
            &sanitize(username),
            &sanitize(display_name),
            self.suffix.len(),
            self.min_display_size,
            self.max_len,
        )
    }

    /// The nickname actually used on IRC: composed part plus suffix.
    pub fn puppet_nick(&self, composed: &str) -> String {
        format!("{}{}", composed, self.suffix)
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn take_chars(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

/// Compose a bounded nickname from already-sanitized parts.
///
/// Two-phase clamp: the username is shortened first, never by more than
/// `display_len - min_display_size` when the overflow exceeds the display
/// name, then the display name absorbs whatever overflow remains.
pub fn compose_nick(
    username: &str,
    display_name: &str,
    suffix_len: usize,
    min_display_size: usize,
    max_len: usize,
) -> String {
    let reserved = 2 + suffix_len;
    let display_len = char_len(display_name);
    let mut username = username.to_string();

    let total = display_len + char_len(&username) + reserved;
    if total > max_len {
        let mut remove = total - max_len;
        if remove > display_len {
            remove = display_len.saturating_sub(min_display_size);
        }
        let keep = char_len(&username).saturating_sub(remove);
        username = take_chars(&username, keep);
    }

    let mut display_name = display_name.to_string();
    let total = display_len + char_len(&username) + reserved;
    if total > max_len {
        let remove = total - max_len;
        display_name = take_chars(&display_name, display_len.saturating_sub(remove));
    }

    // Display name exhausted and still over budget: the username gives up the rest.
    let used = char_len(&display_name) + reserved;
    if used + char_len(&username) > max_len {
        username = take_chars(&username, max_len.saturating_sub(used));
    }

    format!("{display_name}[{username}]")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_illegal() {
        assert_eq!(
            sanitize("This is a really long name with spaces üòç"),
            "Thisisareallylongnamewithspaces"
        );
    }

    #[test]
    fn test_sanitize_replaces_illegal_first_char() {
        assert_eq!(sanitize("1st place"), "_stplace");
        assert_eq!(sanitize("  ☃snowman  "), "_snowman");
        assert_eq!(sanitize("[cool]"), "[cool]");
    }

    #[test]
    fn test_sanitize_empty_uses_placeholder() {
        assert_eq!(sanitize(""), EMPTY_NICK_PLACEHOLDER);
        assert_eq!(sanitize("   "), EMPTY_NICK_PLACEHOLDER);
        // Only the first char is kept (as `_`) when the rest is illegal.
        assert_eq!(sanitize("😍😍😍"), "_");
    }

    #[test]
    fn test_legal_nick() {
        assert!(is_legal_nick("name_b[TestUser]_d2"));
        assert!(is_legal_nick("_d2"));
        assert!(!is_legal_nick("2fast"));
        assert!(!is_legal_nick("nick name"));
        assert!(!is_legal_nick(""));
        assert!(is_legal_fragment("_d2"));
        assert!(!is_legal_fragment("-d2"));
    }

    #[test]
    fn test_compose_fits() {
        let policy = NickPolicy::new("_d2", 6);
        assert_eq!(policy.compose("TestUser", "name_b"), "name_b[TestUser]");
        assert_eq!(policy.puppet_nick("name_b[TestUser]"), "name_b[TestUser]_d2");
    }

    #[test]
    fn test_compose_shrinks_username_first() {
        // 10 + 20 + 5 = 35 -> overflow 5, username loses 5.
        let nick = compose_nick("abcdefghijklmnopqrst", "DisplayNam", 3, 6, 30);
        assert_eq!(nick, "DisplayNam[abcdefghijklmno]");
        assert_eq!(nick.len() + 3, 30);
    }

    #[test]
    fn test_compose_clamps_then_shrinks_display() {
        // display 10, username 30, suffix 3: overflow 15 > 10, so the username
        // only loses 10 - 2 = 8; the display name absorbs the remaining 7.
        let username = "u".repeat(30);
        let nick = compose_nick(&username, "Displaynam", 3, 2, 30);
        assert_eq!(nick, format!("Dis[{}]", "u".repeat(22)));
        assert_eq!(nick.len() + 3, 30);
    }

    #[test]
    fn test_compose_exhausted_display_trims_username() {
        let username = "u".repeat(30);
        let nick = compose_nick(&username, "Displays", 3, 6, 30);
        assert_eq!(nick, format!("[{}]", "u".repeat(25)));
    }

    #[test]
    fn test_compose_never_exceeds_budget() {
        let cases = [
            ("a", "b"),
            ("averyveryverylongusername", "short"),
            ("short", "averyveryverylongdisplayname"),
            ("averyveryverylongusername", "averyveryverylongdisplayname"),
        ];
        for (user, display) in cases {
            let nick = compose_nick(user, display, 3, 6, 30);
            assert!(nick.chars().count() + 3 <= 30, "{user}/{display} -> {nick}");
        }
    }
}
