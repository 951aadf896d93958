//! Prometheus metrics for the bridge.
//!
//! All metrics live on a [`BridgeStats`] instance with its own registry, so
//! tests and multiple bridges in one process never share counters.
//!
//! - `bridge_puppets_active` - Live puppet sessions (gauge)
//! - `bridge_puppets_started_total` - Puppet sessions created
//! - `bridge_discord_messages_total` - Send commands routed to puppets
//! - `bridge_irc_messages_total` - IRC channel messages relayed to Discord
//! - `bridge_supervisor_errors_total{error}` - Dropped commands by cause
//! - `bridge_reconnects_total{role}` - Lost connections by role

use std::time::{Duration, Instant};

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

pub struct BridgeStats {
    registry: Registry,
    puppets_active: IntGauge,
    puppets_started: IntCounter,
    discord_messages: IntCounter,
    irc_messages: IntCounter,
    supervisor_errors: IntCounterVec,
    reconnects: IntCounterVec,
    started: Instant,
}

/// Point-in-time copy of the counters, as reported by the admin bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub puppets_active: i64,
    pub puppets_started: u64,
    pub discord_messages: u64,
    pub irc_messages: u64,
    pub uptime: Duration,
}

impl BridgeStats {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        macro_rules! register {
            ($init:expr) => {{
                let m = $init?;
                registry.register(Box::new(m.clone()))?;
                m
            }};
        }

        Ok(Self {
            puppets_active: register!(IntGauge::new(
                "bridge_puppets_active",
                "Live puppet sessions"
            )),
            puppets_started: register!(IntCounter::new(
                "bridge_puppets_started_total",
                "Puppet sessions created"
            )),
            discord_messages: register!(IntCounter::new(
                "bridge_discord_messages_total",
                "Messages relayed from Discord to IRC"
            )),
            irc_messages: register!(IntCounter::new(
                "bridge_irc_messages_total",
                "Messages relayed from IRC to Discord"
            )),
            supervisor_errors: register!(IntCounterVec::new(
                Opts::new("bridge_supervisor_errors_total", "Puppet commands dropped by cause"),
                &["error"]
            )),
            reconnects: register!(IntCounterVec::new(
                Opts::new("bridge_reconnects_total", "Lost IRC connections by role"),
                &["role"]
            )),
            registry,
            started: Instant::now(),
        })
    }

    #[inline]
    pub fn puppet_started(&self) {
        self.puppets_started.inc();
        self.puppets_active.inc();
    }

    #[inline]
    pub fn puppet_stopped(&self) {
        self.puppets_active.dec();
    }

    #[inline]
    pub fn discord_message(&self) {
        self.discord_messages.inc();
    }

    #[inline]
    pub fn irc_message(&self) {
        self.irc_messages.inc();
    }

    #[inline]
    pub fn supervisor_error(&self, code: &str) {
        self.supervisor_errors.with_label_values(&[code]).inc();
    }

    #[inline]
    pub fn reconnect(&self, role: &str) {
        self.reconnects.with_label_values(&[role]).inc();
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            puppets_active: self.puppets_active.get(),
            puppets_started: self.puppets_started.get(),
            discord_messages: self.discord_messages.get(),
            irc_messages: self.irc_messages.get(),
            uptime: self.started.elapsed(),
        }
    }

    /// Gather all metrics and encode them in Prometheus text format.
    pub fn gather(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = vec![];
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::error!(error = %e, "Failed to encode Prometheus metrics");
            return String::new();
        }
        match String::from_utf8(buffer) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_lifecycle() {
        let stats = BridgeStats::new().unwrap();
        stats.puppet_started();
        stats.puppet_started();
        stats.puppet_stopped();
        stats.discord_message();
        stats.irc_message();
        stats.irc_message();

        let snap = stats.snapshot();
        assert_eq!(snap.puppets_active, 1);
        assert_eq!(snap.puppets_started, 2);
        assert_eq!(snap.discord_messages, 1);
        assert_eq!(snap.irc_messages, 2);
    }

    #[test]
    fn test_labelled_counters_are_exported() {
        let stats = BridgeStats::new().unwrap();
        stats.supervisor_error("no_session");
        stats.reconnect("puppet");

        let output = stats.gather();
        assert!(output.contains("bridge_supervisor_errors_total{error=\"no_session\"} 1"));
        assert!(output.contains("bridge_reconnects_total{role=\"puppet\"} 1"));
        assert!(output.contains("bridge_puppets_active 0"));
    }

    #[test]
    fn test_instances_are_independent() {
        let a = BridgeStats::new().unwrap();
        let b = BridgeStats::new().unwrap();
        a.discord_message();
        assert_eq!(b.snapshot().discord_messages, 0);
    }
}
