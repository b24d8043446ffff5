//! Requests from client handles to the dispatch loop.
//!
//! Everything that touches a registry or the socket travels through one
//! FIFO queue, so registrations and writes keep the order they were issued
//! in and nothing mutates a registry while the loop iterates it.

use tokio::sync::oneshot;

use crate::handlers::{
    CommandEntry, ConnectedFn, DisconnectedFn, HandlerId, HandlerKind, JoinEntry, MessageEntry,
    RegistryStats,
};

pub(crate) enum Control {
    /// Write one line (already validated).
    Send(String),
    /// Create the channel entry, then write `JOIN`.
    Join(String),
    AddCommand(HandlerId, CommandEntry),
    AddMessage(HandlerId, MessageEntry),
    AddJoin(HandlerId, JoinEntry),
    AddConnected(HandlerId, ConnectedFn),
    AddDisconnected(HandlerId, DisconnectedFn),
    Remove(HandlerKind, HandlerId),
    /// Run on-disconnected callbacks, then write `QUIT`. `done` fires once
    /// the `QUIT` line is queued.
    Quit {
        reason: Option<String>,
        done: oneshot::Sender<()>,
    },
    Stats(oneshot::Sender<RegistryStats>),
}

impl Control {
    /// Short label for trace output.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Send(_) => "send",
            Self::Join(_) => "join",
            Self::AddCommand(..) => "add_command",
            Self::AddMessage(..) => "add_message",
            Self::AddJoin(..) => "add_join",
            Self::AddConnected(..) => "add_connected",
            Self::AddDisconnected(..) => "add_disconnected",
            Self::Remove(..) => "remove",
            Self::Quit { .. } => "quit",
            Self::Stats(_) => "stats",
        }
    }
}
