//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Config struct definitions, loading, and the derived [`ConnectionConfig`]
//! - [`links`]: The Discord <-> IRC [`ChannelLinkTable`]
//! - [`validation`]: Startup checks reporting every problem at once
//! - [`defaults`]: Serde default values

mod defaults;
mod links;
mod types;
mod validation;

pub use links::ChannelLinkTable;
pub use types::{Config, ConfigError, ConnectionConfig, DiscordConfig, GlobalConfig, IrcConfig};
pub use validation::{ValidationError, validate};
