//! Asynchronous handler bodies.
//!
//! Message, join, connected and disconnected handlers run as background
//! tasks, so they are stored as shared closures returning boxed futures.

use std::future::Future;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use super::matcher::{Captures, Matcher};
use crate::client::Client;
use crate::error::HandlerResult;
use crate::state::{Channel, Message};

/// Stored message handler.
pub type MessageFn = Arc<dyn Fn(Message, Captures) -> BoxFuture<'static, HandlerResult> + Send + Sync>;
/// Stored join handler.
pub type JoinFn = Arc<dyn Fn(Channel) -> BoxFuture<'static, HandlerResult> + Send + Sync>;
/// Stored on-connected callback.
pub type ConnectedFn = Arc<dyn Fn(Client) -> BoxFuture<'static, HandlerResult> + Send + Sync>;
/// Stored on-disconnected callback; the second argument is the quit
/// reason.
pub type DisconnectedFn =
    Arc<dyn Fn(Client, Option<String>) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

pub(crate) struct MessageEntry {
    pub matcher: Matcher,
    pub handler: MessageFn,
}

pub(crate) struct JoinEntry {
    /// `None` fires for every channel.
    pub channel: Option<String>,
    pub handler: JoinFn,
}

impl JoinEntry {
    pub fn wants(&self, channel: &str) -> bool {
        self.channel.as_deref().is_none_or(|c| c == channel)
    }
}

pub(crate) fn message_fn<F, Fut>(f: F) -> MessageFn
where
    F: Fn(Message, Captures) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(move |msg, caps| f(msg, caps).boxed())
}

pub(crate) fn join_fn<F, Fut>(f: F) -> JoinFn
where
    F: Fn(Channel) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(move |channel| f(channel).boxed())
}

pub(crate) fn connected_fn<F, Fut>(f: F) -> ConnectedFn
where
    F: Fn(Client) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(move |client| f(client).boxed())
}

pub(crate) fn disconnected_fn<F, Fut>(f: F) -> DisconnectedFn
where
    F: Fn(Client, Option<String>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(move |client, reason| f(client, reason).boxed())
}
