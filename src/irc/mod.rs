//! IRC client plumbing: line model, connector, and the connection state
//! machine every bridge identity runs on.

pub mod casemap;
mod connector;
mod event;
mod machine;
mod message;
mod stream;
mod tls;

#[cfg(test)]
pub(crate) mod testing;

pub use connector::{ConnectTarget, Connection, Connector, IrcHandle, TcpConnector};
pub use event::IrcEvent;
pub use machine::{
    Backoff, ConnectionMachine, ConnectionState, Flow, IrcContext, Role, SessionOutcome,
};
pub use message::{Message, Prefix};
