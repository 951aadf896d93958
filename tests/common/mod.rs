//! Integration test common infrastructure.
//!
//! Provides a scripted IRC server and a bridge context wired to the real
//! TCP connector with a fast reconnect schedule.

pub mod server;

use std::sync::Arc;
use std::time::Duration;

use puppetbridge::config::ConnectionConfig;
use puppetbridge::irc::{Backoff, IrcContext, TcpConnector};
use puppetbridge::metrics::BridgeStats;
use tokio_util::sync::CancellationToken;

#[allow(unused_imports)]
pub use server::{TestIrcConn, TestIrcServer};

/// Context for connections to `127.0.0.1:port`.
#[allow(dead_code)]
pub fn tcp_context(port: u16) -> IrcContext {
    let mut config = ConnectionConfig::new("127.0.0.1", port);
    config.webirc_password = Some("gatewaypw".into());
    config.backoff = Backoff {
        step: Duration::from_millis(10),
        cap: Duration::from_millis(50),
    };
    IrcContext {
        config: Arc::new(config),
        connector: Arc::new(TcpConnector),
        stats: Arc::new(BridgeStats::new().expect("metrics registry")),
        shutdown: CancellationToken::new(),
    }
}
