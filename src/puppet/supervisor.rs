//! Single owner of every puppet session.
//!
//! All creation, lookup and removal happens on the supervisor's own task,
//! which is what keeps "at most one session per user" true without locks.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::{Instrument, debug, error, info, warn};

use super::command::{CommandKind, PuppetCommand, UserId};
use super::session::{PuppetContext, PuppetSession};
use crate::error::SupervisorError;
use crate::nick::NickPolicy;
use crate::telemetry::spans;

pub struct Supervisor {
    sessions: HashMap<UserId, PuppetSession>,
    policy: NickPolicy,
    ctx: PuppetContext,
}

impl Supervisor {
    pub fn new(policy: NickPolicy, ctx: PuppetContext) -> Self {
        Self {
            sessions: HashMap::new(),
            policy,
            ctx,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn contains(&self, user_id: UserId) -> bool {
        self.sessions.contains_key(&user_id)
    }

    pub fn nickname(&self, user_id: UserId) -> Option<&str> {
        self.sessions.get(&user_id).map(PuppetSession::nickname)
    }

    /// Drain `rx` until it closes or the shutdown token fires, then tear
    /// every puppet down.
    pub async fn run(mut self, mut rx: mpsc::UnboundedReceiver<PuppetCommand>) {
        let shutdown = self.ctx.irc.shutdown.clone();
        async {
            info!("Supervisor started");
            loop {
                let command = tokio::select! {
                    _ = shutdown.cancelled() => break,
                    command = rx.recv() => command,
                };
                let Some(command) = command else {
                    info!("Command queue closed");
                    break;
                };
                if let Err(e) = self.handle(command).await {
                    error!(error = %e, code = e.error_code(), "Dropping command");
                    self.ctx.irc.stats.supervisor_error(e.error_code());
                }
            }
            self.shutdown().await;
        }
        .instrument(spans::supervisor())
        .await
    }

    /// Apply one command to the session map.
    pub async fn handle(&mut self, command: PuppetCommand) -> Result<(), SupervisorError> {
        let user_id = command.id;
        match command.kind() {
            CommandKind::Active => {
                self.activate(command);
                Ok(())
            }
            CommandKind::Die => {
                self.kill(command).await;
                Ok(())
            }
            CommandKind::Unknown => Err(SupervisorError::UnknownCommand(user_id)),
            kind => {
                let Some(session) = self.sessions.get(&user_id) else {
                    return Err(SupervisorError::NoSession { user_id, kind });
                };
                let command = match kind {
                    CommandKind::Nick => PuppetCommand {
                        irc_nick: self.policy.puppet_nick(&command.irc_nick),
                        ..command
                    },
                    _ => command,
                };
                session.enqueue(command)?;
                if kind == CommandKind::Send {
                    self.ctx.irc.stats.discord_message();
                }
                Ok(())
            }
        }
    }

    fn activate(&mut self, command: PuppetCommand) {
        if self.sessions.contains_key(&command.id) {
            debug!(user_id = command.id, "Puppet already active");
            return;
        }

        let composed = if command.irc_nick.is_empty() {
            self.policy.compose(&command.name, &command.display_name)
        } else {
            command.irc_nick.clone()
        };
        let nickname = self.policy.puppet_nick(&composed);
        let channels = command.channels().unwrap_or_default().to_vec();
        info!(user_id = command.id, nick = %nickname, channels = channels.len(), "Starting puppet");

        let session = PuppetSession::create(command.id, nickname, channels, &self.ctx);
        self.sessions.insert(command.id, session);
        self.ctx.irc.stats.puppet_started();
    }

    /// Forward `die` and wait for the session to finish before forgetting it.
    async fn kill(&mut self, command: PuppetCommand) {
        let user_id = command.id;
        let Some(session) = self.sessions.remove(&user_id) else {
            warn!(user_id, "Die for a user with no puppet, ignoring");
            return;
        };
        if let Err(e) = session.enqueue(command) {
            debug!(error = %e, "Session already stopping");
        }
        self.reap(session).await;
    }

    async fn reap(&self, session: PuppetSession) {
        let user_id = session.user_id();
        match session.join().await {
            Ok(outcome) => info!(user_id, ?outcome, "Puppet stopped"),
            Err(e) => error!(user_id, error = %e, code = e.error_code(), "Puppet task failed"),
        }
        self.ctx.irc.stats.puppet_stopped();
    }

    /// Stop every puppet and wait for each to finish.
    pub async fn shutdown(&mut self) {
        info!(puppets = self.sessions.len(), "Stopping all puppets");
        let sessions: Vec<PuppetSession> = self.sessions.drain().map(|(_, s)| s).collect();
        for session in sessions {
            let die = PuppetCommand {
                nick: String::new(),
                display_name: String::new(),
                irc_nick: String::new(),
                name: String::new(),
                id: session.user_id(),
                channel: None,
                command: CommandKind::Die,
                data: None,
                timestamp: 0.0,
                target: None,
            };
            // The shutdown token may already have ended the task.
            let _ = session.enqueue(die);
            self.reap(session).await;
        }
    }
}
