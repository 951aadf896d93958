//! Connecting to the IRC server and driving one connection.
//!
//! A connection is one task owning the framed socket. Outbound lines arrive
//! through an [`IrcHandle`]; inbound lines leave as [`IrcEvent`]s. `PING` is
//! answered inside the task and never reaches a role.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::io;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};
use tracing::{debug, info, trace};

use super::event::IrcEvent;
use super::message::Message;
use super::stream::IrcStream;
use super::tls::upgrade_to_tls;
use crate::error::ConnectError;

/// Everything needed to open and register one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectTarget {
    pub server: String,
    pub port: u16,
    pub tls: bool,
    pub verify_cert: bool,
    pub nickname: String,
    pub username: String,
    pub realname: String,
    /// Lines written before `NICK`/`USER` (WEBIRC).
    pub preamble: Vec<Message>,
}

impl ConnectTarget {
    /// The full registration burst, in wire order.
    pub fn registration(&self) -> Vec<Message> {
        let mut lines = self.preamble.clone();
        lines.push(Message::nick(&self.nickname));
        lines.push(Message::user(&self.username, &self.realname));
        lines
    }
}

/// Cloneable fire-and-forget writer for one connection.
///
/// Writes after the transport closed are discarded.
#[derive(Debug, Clone)]
pub struct IrcHandle {
    tx: mpsc::UnboundedSender<Message>,
}

impl IrcHandle {
    pub fn new(tx: mpsc::UnboundedSender<Message>) -> Self {
        Self { tx }
    }

    pub fn send_raw(&self, msg: Message) {
        if self.tx.send(msg).is_err() {
            trace!("Write after connection closed, discarded");
        }
    }

    pub fn join(&self, channel: &str) {
        self.send_raw(Message::join(channel));
    }

    pub fn part(&self, channel: &str) {
        self.send_raw(Message::part(channel));
    }

    pub fn privmsg(&self, target: &str, text: &str) {
        self.send_raw(Message::privmsg(target, text));
    }

    pub fn nick(&self, nick: &str) {
        self.send_raw(Message::nick(nick));
    }

    pub fn mode(&self, target: &str, modes: &str) {
        self.send_raw(Message::mode(target, modes));
    }

    pub fn away(&self, message: Option<&str>) {
        self.send_raw(Message::away(message));
    }

    /// Send `QUIT`; the connection closes once it is written.
    pub fn quit(&self, message: Option<&str>) {
        self.send_raw(Message::quit(message));
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// A registered-or-registering connection as seen by the state machine.
#[derive(Debug)]
pub struct Connection {
    pub handle: IrcHandle,
    pub events: mpsc::UnboundedReceiver<IrcEvent>,
}

#[async_trait]
pub trait Connector: Send + Sync {
    /// Open the transport and write the registration burst.
    ///
    /// Returns before the welcome arrives; `IrcEvent::Welcome` signals it.
    async fn connect(&self, target: &ConnectTarget) -> Result<Connection, ConnectError>;
}

/// TCP (optionally TLS) connector.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

fn codec_error(err: LinesCodecError) -> ConnectError {
    match err {
        LinesCodecError::Io(e) => ConnectError::Io(e),
        other => ConnectError::Io(io::Error::other(other.to_string())),
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self, target: &ConnectTarget) -> Result<Connection, ConnectError> {
        let tcp = TcpStream::connect((target.server.as_str(), target.port)).await?;
        let stream = if target.tls {
            let tls = upgrade_to_tls(tcp, &target.server, target.verify_cert).await?;
            IrcStream::Tls(Box::new(tls))
        } else {
            IrcStream::Plain(tcp)
        };
        info!(
            server = %target.server,
            port = target.port,
            tls = stream.is_tls(),
            nick = %target.nickname,
            "Connected"
        );

        let mut framed = Framed::new(stream, LinesCodec::new());
        for line in target.registration() {
            framed.send(line.to_string()).await.map_err(codec_error)?;
        }

        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        tokio::spawn(drive(framed, out_rx, event_tx));

        Ok(Connection {
            handle: IrcHandle::new(out_tx),
            events: event_rx,
        })
    }
}

/// Pump lines both ways until either side closes. Emits one `Disconnected`.
async fn drive(
    mut framed: Framed<IrcStream, LinesCodec>,
    mut outbound: mpsc::UnboundedReceiver<Message>,
    events: mpsc::UnboundedSender<IrcEvent>,
) {
    let reason = loop {
        tokio::select! {
            out = outbound.recv() => match out {
                Some(msg) => {
                    let quitting = msg.command == "QUIT";
                    trace!(line = %msg, "->");
                    if let Err(e) = framed.send(msg.to_string()).await {
                        break format!("write failed: {e}");
                    }
                    if quitting {
                        break "quit".to_string();
                    }
                }
                None => break "connection released".to_string(),
            },
            line = framed.next() => match line {
                Some(Ok(line)) => {
                    trace!(line = %line, "<-");
                    let msg = match line.parse::<Message>() {
                        Ok(msg) => msg,
                        Err(e) => {
                            debug!(error = %e, code = e.error_code(), "Unparseable line skipped");
                            continue;
                        }
                    };
                    match msg.command.as_str() {
                        "PING" => {
                            let pong = Message::pong(msg.param(0).unwrap_or_default());
                            if let Err(e) = framed.send(pong.to_string()).await {
                                break format!("write failed: {e}");
                            }
                        }
                        "ERROR" => {
                            debug!(message = ?msg.param(0), "Server sent ERROR");
                        }
                        _ => {
                            if let Some(event) = IrcEvent::from_message(&msg) {
                                let _ = events.send(event);
                            }
                        }
                    }
                }
                Some(Err(e)) => break format!("read failed: {e}"),
                None => break "connection closed by server".to_string(),
            },
        }
    };

    debug!(reason = %reason, "Connection task finished");
    let _ = events.send(IrcEvent::Disconnected { reason });
}
