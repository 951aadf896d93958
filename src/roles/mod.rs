//! The two long-lived, non-puppet IRC identities.

mod bot;
mod listener;

pub use bot::{AdminBot, format_uptime};
pub use listener::Listener;
