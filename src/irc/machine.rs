//! Connection state machine shared by every IRC identity.
//!
//! `Connecting -> Ready -> (disconnect) Connecting -> ... -> Terminating -> Terminated`
//!
//! The machine owns reconnects, backoff, nickname collisions and the gate
//! that keeps queued commands waiting until the server welcomed us. What a
//! connection *does* is supplied by a [`Role`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, debug, info, warn};

use super::connector::{ConnectTarget, Connection, Connector, IrcHandle};
use super::event::IrcEvent;
use super::message::Message;
use crate::config::ConnectionConfig;
use crate::metrics::BridgeStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Ready,
    Terminating,
    Terminated,
}

/// Reconnect delay: `min(step * retry, cap)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub step: Duration,
    pub cap: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            step: Duration::from_secs(10),
            cap: Duration::from_secs(300),
        }
    }
}

impl Backoff {
    pub fn delay(&self, retry: u32) -> Duration {
        self.step.saturating_mul(retry).min(self.cap)
    }
}

/// What the machine should do after a role handled a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Quit with the given message and end the task.
    Terminate(Option<String>),
}

/// How a connection task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The role asked to terminate (or its command queue closed).
    Quit,
    /// The process shutdown token was cancelled.
    Shutdown,
}

/// Identity and behaviour of one connection.
///
/// Every callback runs on the connection's own task, so a role's state is
/// never touched concurrently.
pub trait Role: Send + 'static {
    type Command: Send + 'static;

    /// Metric label and span name.
    const KIND: &'static str;

    fn nickname(&self) -> &str;

    /// Called with the nickname the server actually accepted.
    fn set_nickname(&mut self, nick: String);

    fn username(&self) -> String {
        let ident: String = self
            .nickname()
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .take(10)
            .collect();
        if ident.is_empty() { "bridge".to_string() } else { ident }
    }

    fn realname(&self) -> String {
        self.nickname().to_string()
    }

    /// Lines sent ahead of registration on every connect.
    fn preamble(&self) -> Vec<Message> {
        Vec::new()
    }

    /// Registration complete. Join channels, set modes.
    fn on_ready(&mut self, irc: &IrcHandle);

    fn on_event(&mut self, _event: &IrcEvent, _irc: &IrcHandle) {}

    fn on_command(&mut self, _command: Self::Command, _irc: &IrcHandle) -> Flow {
        Flow::Continue
    }

    fn quit_message(&self) -> Option<String> {
        None
    }
}

/// Shared collaborators every connection task needs.
#[derive(Clone)]
pub struct IrcContext {
    pub config: Arc<ConnectionConfig>,
    pub connector: Arc<dyn Connector>,
    pub stats: Arc<BridgeStats>,
    pub shutdown: CancellationToken,
}

pub struct ConnectionMachine<R: Role> {
    role: R,
    ctx: IrcContext,
    commands: Option<mpsc::UnboundedReceiver<R::Command>>,
    state: ConnectionState,
    /// Nickname every (re)connect registers with. Collision fallbacks never
    /// touch it; only a role command changing the nickname does.
    intended: String,
}

async fn next_command<C>(commands: &mut Option<mpsc::UnboundedReceiver<C>>) -> Option<C> {
    match commands {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

impl<R: Role> ConnectionMachine<R> {
    pub fn new(role: R, ctx: IrcContext) -> Self {
        let intended = role.nickname().to_string();
        Self {
            role,
            ctx,
            commands: None,
            state: ConnectionState::Connecting,
            intended,
        }
    }

    /// Attach the queue drained once the connection is ready.
    pub fn with_commands(mut self, commands: mpsc::UnboundedReceiver<R::Command>) -> Self {
        self.commands = Some(commands);
        self
    }

    pub fn spawn(self, span: Span) -> JoinHandle<SessionOutcome> {
        tokio::spawn(self.run().instrument(span))
    }

    pub async fn run(mut self) -> SessionOutcome {
        loop {
            self.state = ConnectionState::Connecting;
            if self.role.nickname() != self.intended {
                debug!(
                    accepted = %self.role.nickname(),
                    intended = %self.intended,
                    "Restoring nickname"
                );
                self.role.set_nickname(self.intended.clone());
            }
            let Some(connection) = self.establish().await else {
                self.state = ConnectionState::Terminated;
                info!("Shutdown while connecting");
                return SessionOutcome::Shutdown;
            };

            if let Some(outcome) = self.drive(connection).await {
                self.state = ConnectionState::Terminated;
                info!(nick = %self.role.nickname(), ?outcome, "Connection terminated");
                return outcome;
            }
            self.ctx.stats.reconnect(R::KIND);
        }
    }

    fn target(&self) -> ConnectTarget {
        let config = &self.ctx.config;
        ConnectTarget {
            server: config.server.clone(),
            port: config.port,
            tls: config.tls,
            verify_cert: config.verify_cert,
            nickname: self.intended.clone(),
            username: self.role.username(),
            realname: self.role.realname(),
            preamble: self.role.preamble(),
        }
    }

    /// Connect with unbounded retries. `None` only on shutdown.
    async fn establish(&mut self) -> Option<Connection> {
        let backoff = self.ctx.config.backoff;
        let mut retry: u32 = 0;
        loop {
            let target = self.target();
            let attempt = tokio::select! {
                _ = self.ctx.shutdown.cancelled() => return None,
                attempt = self.ctx.connector.connect(&target) => attempt,
            };

            match attempt {
                Ok(connection) => return Some(connection),
                Err(e) => {
                    let delay = backoff.delay(retry);
                    retry = retry.saturating_add(1);
                    warn!(
                        server = %target.server,
                        error = %e,
                        code = e.error_code(),
                        retry,
                        delay_secs = delay.as_secs_f64(),
                        "Connection failed, retrying"
                    );
                    tokio::select! {
                        _ = self.ctx.shutdown.cancelled() => return None,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    /// Run one connection. `None` means it dropped and should be re-established.
    async fn drive(&mut self, connection: Connection) -> Option<SessionOutcome> {
        let Connection { handle, mut events } = connection;
        let Self {
            role,
            ctx,
            commands,
            state,
            intended,
        } = self;
        let mut exit: Option<SessionOutcome> = None;

        loop {
            let ready = *state == ConnectionState::Ready;
            let terminating = exit.is_some();
            let mut queue_closed = false;

            tokio::select! {
                _ = ctx.shutdown.cancelled(), if !terminating => {
                    info!("Shutdown requested, quitting");
                    *state = ConnectionState::Terminating;
                    handle.quit(role.quit_message().as_deref());
                    exit = Some(SessionOutcome::Shutdown);
                }
                event = events.recv() => match event {
                    None | Some(IrcEvent::Disconnected { .. }) if terminating => return exit,
                    None => {
                        warn!("Connection event stream ended");
                        return None;
                    }
                    Some(IrcEvent::Disconnected { reason }) => {
                        warn!(reason = %reason, "Disconnected, reconnecting");
                        return None;
                    }
                    Some(IrcEvent::Welcome { nick }) => {
                        info!(nick = %nick, "Registered");
                        role.set_nickname(nick);
                        *state = ConnectionState::Ready;
                        role.on_ready(&handle);
                    }
                    Some(IrcEvent::NicknameInUse { attempted }) => {
                        let fallback = format!("_{attempted}");
                        warn!(attempted = %attempted, fallback = %fallback, "Nickname in use");
                        handle.nick(&fallback);
                        role.set_nickname(fallback);
                    }
                    Some(IrcEvent::NickChanged { old, new }) if old == role.nickname() => {
                        debug!(old = %old, new = %new, "Nickname changed");
                        role.set_nickname(new);
                    }
                    Some(event) => role.on_event(&event, &handle),
                },
                command = next_command(commands), if ready && !terminating => match command {
                    Some(command) => {
                        let before = role.nickname().to_string();
                        let flow = role.on_command(command, &handle);
                        if role.nickname() != before {
                            *intended = role.nickname().to_string();
                        }
                        if let Flow::Terminate(reason) = flow {
                            *state = ConnectionState::Terminating;
                            handle.quit(reason.as_deref());
                            exit = Some(SessionOutcome::Quit);
                        }
                    }
                    None => {
                        debug!("Command queue closed, quitting");
                        queue_closed = true;
                        *state = ConnectionState::Terminating;
                        handle.quit(role.quit_message().as_deref());
                        exit = Some(SessionOutcome::Quit);
                    }
                },
            }

            if queue_closed {
                *commands = None;
            }
        }
    }
}
