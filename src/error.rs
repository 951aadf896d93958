//! Unified error handling for the bridge.
//!
//! One enum per layer, each with a static `error_code()` used as a metric
//! label. None of these is fatal to the process: connection errors feed the
//! backoff loop, supervisor errors are logged and the command dropped.

use thiserror::Error;

use crate::puppet::{CommandKind, UserId};

// ============================================================================
// Connection Errors (connector / transport)
// ============================================================================

/// Failures while establishing an IRC connection. Always transient.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("connection failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid server name: {0}")]
    InvalidServerName(String),

    #[error("tls handshake failed: {0}")]
    Tls(String),

    #[error("connection refused: {0}")]
    Refused(String),
}

impl ConnectError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::InvalidServerName(_) => "invalid_server_name",
            Self::Tls(_) => "tls",
            Self::Refused(_) => "refused",
        }
    }
}

// ============================================================================
// Wire Errors (line parsing)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    #[error("empty line")]
    Empty,

    #[error("missing command in line: {0}")]
    MissingCommand(String),
}

impl WireError {
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::MissingCommand(_) => "missing_command",
        }
    }
}

// ============================================================================
// Supervisor Errors (command routing)
// ============================================================================

/// Routing failures. Logged and dropped; the supervisor loop keeps going.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SupervisorError {
    #[error("no puppet session for user {user_id} (command {kind})")]
    NoSession { user_id: UserId, kind: CommandKind },

    #[error("puppet session for user {0} is no longer accepting commands")]
    SessionGone(UserId),

    #[error("unknown command for user {0}")]
    UnknownCommand(UserId),
}

impl SupervisorError {
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NoSession { .. } => "no_session",
            Self::SessionGone(_) => "session_gone",
            Self::UnknownCommand(_) => "unknown_command",
        }
    }
}

// ============================================================================
// Session Errors (task teardown)
// ============================================================================

/// Abnormal end of a connection task, surfaced when it is joined.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session task panicked")]
    Panicked,

    #[error("session task cancelled")]
    Cancelled,
}

impl From<tokio::task::JoinError> for SessionError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_panic() {
            Self::Panicked
        } else {
            Self::Cancelled
        }
    }
}

impl SessionError {
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Panicked => "panicked",
            Self::Cancelled => "cancelled",
        }
    }
}

// ============================================================================
// Discord Errors (outbound delivery)
// ============================================================================

/// Delivery failures at the Discord boundary. Logged, never retried.
#[derive(Debug, Error)]
pub enum DiscordError {
    #[error("discord rejected delivery: {0}")]
    Rejected(String),

    #[error("output failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

impl DiscordError {
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Rejected(_) => "rejected",
            Self::Io(_) => "io",
            Self::Encode(_) => "encode",
        }
    }
}
