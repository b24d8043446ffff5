//! asif - an event-driven, handler-based IRC client framework.
//!
//! A [`Client`] owns one server connection. Applications register handlers
//! for raw commands, for chat messages selected by a [`Matcher`], for
//! completed channel joins, and for connect/disconnect; the dispatch loop
//! tracks users and channels in a roster and hands out [`User`],
//! [`Channel`] and [`Message`] handles built on it. [`Module`] lets a
//! bundle of handlers be defined before the client exists.

mod client;
mod config;
mod error;
mod handlers;
mod module;
mod state;
pub mod telemetry;

pub use client::{Awaiting, Client, ConnectionState};
pub use config::{Config, ConfigError, IdentityConfig, LimitsConfig, ServerConfig};
pub use error::{ClientError, HandlerResult, Result};
pub use handlers::{
    Captures, CommandContext, CommandFn, CommandPattern, ConnectedFn, DisconnectedFn, HandlerId,
    HandlerKind, JoinFn, Matcher, MatcherBuilder, MessageFn, Predicate, RegistryStats,
};
pub use module::{ChannelProxy, Module};
pub use state::{Channel, Message, Recipient, User};

/// The wire layer: line codec, message parsing and numerics.
pub use asif_proto as proto;
