//! Default value functions for configuration.
//!
//! Separated into its own module for clarity and reuse.

/// Returns `true` (for serde defaults).
pub fn default_true() -> bool {
    true
}

// =============================================================================
// Global Defaults
// =============================================================================

pub fn default_log_level() -> String {
    "info".to_string()
}

// =============================================================================
// IRC Defaults
// =============================================================================

pub fn default_port() -> u16 {
    6667
}

pub fn default_puppet_min_size() -> usize {
    6
}

pub fn default_webirc_hostname() -> String {
    "discord.bridge".to_string()
}

pub fn default_away_message() -> String {
    "User is away on discord".to_string()
}

pub fn default_quit_message() -> String {
    "has left discord".to_string()
}

// =============================================================================
// Discord Defaults
// =============================================================================

pub fn default_webhook_name() -> String {
    "CatPuppetBridge".to_string()
}
