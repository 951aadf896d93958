//! In-memory connector for driving roles and the state machine in tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::connector::{ConnectTarget, Connection, Connector, IrcHandle};
use super::event::IrcEvent;
use super::machine::{Backoff, IrcContext};
use super::message::Message;
use crate::config::ConnectionConfig;
use crate::error::ConnectError;
use crate::metrics::BridgeStats;

const WAIT: Duration = Duration::from_secs(2);

struct Inner {
    refusals: AtomicUsize,
    attempts: AtomicUsize,
    accepted: mpsc::UnboundedSender<MockLink>,
}

#[derive(Clone)]
pub struct MockConnector {
    inner: Arc<Inner>,
}

pub struct MockAcceptor {
    rx: mpsc::UnboundedReceiver<MockLink>,
}

/// The server side of one mock connection.
pub struct MockLink {
    pub target: ConnectTarget,
    lines: mpsc::UnboundedReceiver<Message>,
    events: mpsc::UnboundedSender<IrcEvent>,
}

impl MockConnector {
    pub fn new() -> (Self, MockAcceptor) {
        let (accepted, rx) = mpsc::unbounded_channel();
        let inner = Arc::new(Inner {
            refusals: AtomicUsize::new(0),
            attempts: AtomicUsize::new(0),
            accepted,
        });
        (Self { inner }, MockAcceptor { rx })
    }

    /// Fail the next `n` connection attempts.
    pub fn refuse_next(&self, n: usize) {
        self.inner.refusals.store(n, Ordering::SeqCst);
    }

    pub fn attempts(&self) -> usize {
        self.inner.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, target: &ConnectTarget) -> Result<Connection, ConnectError> {
        self.inner.attempts.fetch_add(1, Ordering::SeqCst);
        let refused = self
            .inner
            .refusals
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(ConnectError::Refused("mock refusal".into()));
        }

        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Message>();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (lines_tx, lines_rx) = mpsc::unbounded_channel();

        // Stand-in for the socket task: QUIT closes the connection.
        let quit_events = event_tx.clone();
        tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                let quitting = msg.command == "QUIT";
                let _ = lines_tx.send(msg);
                if quitting {
                    let _ = quit_events.send(IrcEvent::Disconnected { reason: "quit".into() });
                    break;
                }
            }
        });

        let _ = self.inner.accepted.send(MockLink {
            target: target.clone(),
            lines: lines_rx,
            events: event_tx,
        });

        Ok(Connection {
            handle: IrcHandle::new(out_tx),
            events: event_rx,
        })
    }
}

impl MockAcceptor {
    pub async fn accept(&mut self) -> MockLink {
        tokio::time::timeout(WAIT, self.rx.recv())
            .await
            .expect("no connection attempt")
            .expect("connector dropped")
    }

    pub async fn try_accept(&mut self, wait: Duration) -> Option<MockLink> {
        tokio::time::timeout(wait, self.rx.recv()).await.ok().flatten()
    }
}

impl MockLink {
    pub fn send(&self, event: IrcEvent) {
        let _ = self.events.send(event);
    }

    pub fn welcome(&self, nick: &str) {
        self.send(IrcEvent::Welcome { nick: nick.to_string() });
    }

    pub fn drop_connection(&self, reason: &str) {
        self.send(IrcEvent::Disconnected { reason: reason.to_string() });
    }

    pub async fn expect_line(&mut self) -> Message {
        tokio::time::timeout(WAIT, self.lines.recv())
            .await
            .expect("no line written")
            .expect("connection closed")
    }

    /// Collect lines until one satisfies `done` (inclusive).
    pub async fn lines_until(&mut self, mut done: impl FnMut(&Message) -> bool) -> Vec<Message> {
        let mut lines = Vec::new();
        loop {
            let line = self.expect_line().await;
            let stop = done(&line);
            lines.push(line);
            if stop {
                return lines;
            }
        }
    }

    /// Lines written so far, without waiting.
    pub fn try_lines(&mut self) -> Vec<Message> {
        let mut lines = Vec::new();
        while let Ok(line) = self.lines.try_recv() {
            lines.push(line);
        }
        lines
    }
}

pub fn test_config() -> ConnectionConfig {
    let mut config = ConnectionConfig::new("irc.test", 6667);
    config.webirc_password = Some("hunter2".into());
    config.backoff = Backoff {
        step: Duration::from_millis(5),
        cap: Duration::from_millis(20),
    };
    config
}

pub fn test_context(connector: MockConnector) -> IrcContext {
    IrcContext {
        config: Arc::new(test_config()),
        connector: Arc::new(connector),
        stats: Arc::new(BridgeStats::new().expect("metrics registry")),
        shutdown: CancellationToken::new(),
    }
}
