//! Tracing setup and span constructors.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_level` from the config file.
/// Logs go to stderr; stdout carries the JSON-lines Discord boundary.
pub fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Standardized span constructors for bridge observability.
pub mod spans {
    use tracing::{Span, info_span};

    /// Span for a long-lived IRC connection (listener, bot).
    pub fn connection(role: &str, nick: &str) -> Span {
        info_span!("connection", role = %role, nick = %nick)
    }

    /// Span for a puppet session.
    pub fn puppet(user_id: u64, nick: &str) -> Span {
        info_span!("puppet", user_id, nick = %nick)
    }

    /// Span for the supervisor loop.
    pub fn supervisor() -> Span {
        info_span!("supervisor")
    }
}
