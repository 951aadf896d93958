//! Per-user IRC puppets: the command protocol, the session role and the
//! supervisor that owns them.

mod command;
mod session;
mod supervisor;

pub use command::{ChannelId, CommandData, CommandKind, PuppetCommand, UserId};
pub use session::{Puppet, PuppetContext, PuppetSession};
pub use supervisor::Supervisor;
