//! Handler registries.
//!
//! Three ordered registries drive an application:
//!
//! - **command** handlers see raw lines synchronously, in the loop;
//! - **message** handlers see PRIVMSG/NOTICE lines that pass their
//!   [`Matcher`], each in its own background task;
//! - **join** handlers fire once the name list of a joined channel is
//!   complete.
//!
//! On-connected and on-disconnected callbacks complete the set. Every
//! registration yields a [`HandlerId`] that removes it again.

mod callbacks;
mod command;
mod matcher;
mod registry;

pub use callbacks::{ConnectedFn, DisconnectedFn, JoinFn, MessageFn};
pub use command::{CommandContext, CommandFn, CommandPattern};
pub use matcher::{Captures, Matcher, MatcherBuilder, Predicate};
pub use registry::{HandlerId, HandlerKind, RegistryStats};

pub(crate) use callbacks::{
    JoinEntry, MessageEntry, connected_fn, disconnected_fn, join_fn, message_fn,
};
pub(crate) use command::{CommandEntry, Effect};
pub(crate) use registry::Registry;
