//! puppetbridge - Discord <-> IRC relay with per-user IRC puppets.
//!
//! Every active Discord user gets an IRC connection of their own (a
//! *puppet*), driven by the [`puppet::Supervisor`]. A shared
//! [`roles::Listener`] carries public IRC traffic back to Discord and a
//! [`roles::AdminBot`] answers operator queries.

pub mod address;
pub mod chunk;
pub mod config;
pub mod discord;
pub mod error;
pub mod filters;
pub mod http;
pub mod irc;
pub mod mention;
pub mod metrics;
pub mod nick;
pub mod puppet;
pub mod roles;
pub mod telemetry;
