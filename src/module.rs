//! Pluggable modules.
//!
//! A [`Module`] collects handler registrations before it knows which client
//! it will run on. Until [`Client::add_module`] attaches it, registrations
//! are buffered and everything else fails with
//! [`ClientError::NotAttached`]. Attaching replays the buffer in call order
//! and later calls go straight to the client.
//!
//! ```
//! use asif::{Client, Config, Matcher, Module};
//!
//! let greeter = Module::new("greeter");
//! let lobby = greeter.channel("#lobby");
//! lobby.on_message(Matcher::any(), false, |msg, _| async move {
//!     msg.reply("hello", None)?;
//!     Ok(())
//! });
//! assert!(lobby.channel().is_err());
//!
//! let client = Client::new(Config::new("localhost", 6667, "asif"));
//! client.add_module(&greeter);
//! assert_eq!(lobby.channel().unwrap().name(), "#lobby");
//! ```

use std::fmt;
use std::future::Future;
use std::mem;
use std::sync::Arc;

use asif_proto::RawMessage;
use parking_lot::Mutex;
use tracing::debug;

use crate::client::Client;
use crate::error::{ClientError, HandlerResult, Result};
use crate::handlers::{
    Captures, CommandContext, CommandPattern, HandlerId, Matcher, connected_fn, disconnected_fn,
    join_fn, message_fn,
};
use crate::state::{Channel, Message};

/// An operation waiting for its target.
pub(crate) type Deferred<T> = Box<dyn FnOnce(&T) + Send>;

/// Either the buffered operations or the target they were waiting for.
pub(crate) enum Binding<T> {
    Unbound(Vec<Deferred<T>>),
    Bound(T),
}

impl<T> Binding<T> {
    pub fn new() -> Self {
        Self::Unbound(Vec::new())
    }

    /// Run `op` now if bound, otherwise buffer it.
    pub fn run_or_defer<F>(&mut self, op: F)
    where
        F: FnOnce(&T) + Send + 'static,
    {
        match self {
            Self::Bound(target) => op(target),
            Self::Unbound(buffered) => buffered.push(Box::new(op)),
        }
    }

    /// Bind to `target` and replay the buffer in order. Returns how many
    /// operations were replayed.
    pub fn bind(&mut self, target: T) -> usize {
        let previous = mem::replace(self, Self::Bound(target));
        let (Self::Unbound(buffered), Self::Bound(target)) = (previous, &*self) else {
            return 0;
        };
        let replayed = buffered.len();
        for op in buffered {
            op(target);
        }
        replayed
    }

    pub fn get(&self) -> Option<&T> {
        match self {
            Self::Bound(target) => Some(target),
            Self::Unbound(_) => None,
        }
    }

    pub fn pending(&self) -> usize {
        match self {
            Self::Unbound(buffered) => buffered.len(),
            Self::Bound(_) => 0,
        }
    }
}

impl<T> Default for Binding<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Module
// ============================================================================

/// A named bundle of handlers that can be set up before a client exists.
#[derive(Clone)]
pub struct Module {
    name: Arc<str>,
    binding: Arc<Mutex<Binding<Client>>>,
}

impl Module {
    /// Create a detached module; `name` labels its log lines.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Arc::from(name.into()),
            binding: Arc::new(Mutex::new(Binding::new())),
        }
    }

    /// The module's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether [`Client::add_module`] has run for this module.
    pub fn is_attached(&self) -> bool {
        self.binding.lock().get().is_some()
    }

    /// The client this module runs on.
    pub fn client(&self) -> Result<Client> {
        self.binding
            .lock()
            .get()
            .cloned()
            .ok_or_else(|| ClientError::NotAttached(format!("module {}", self.name)))
    }

    pub(crate) fn attach(&self, client: Client) {
        let replayed = self.binding.lock().bind(client);
        debug!(module = %self.name, replayed, "Module attached");
    }

    fn with_client<F>(&self, op: F)
    where
        F: FnOnce(&Client) + Send + 'static,
    {
        self.binding.lock().run_or_defer(op);
    }

    /// A channel by name. Before attachment this is an unbound proxy that
    /// becomes live when the module is attached.
    pub fn channel(&self, name: &str) -> ChannelProxy {
        let proxy = ChannelProxy::new(name);
        let target = proxy.clone();
        let name = name.to_string();
        self.with_client(move |client| target.bind(client.channel(&name)));
        proxy
    }

    /// See [`Client::on_command`]. Deferred until attachment.
    pub fn on_command<F>(&self, pattern: impl Into<CommandPattern>, handler: F) -> HandlerId
    where
        F: FnMut(&RawMessage, &mut CommandContext<'_>) -> Result<()> + Send + 'static,
    {
        let id = HandlerId::next();
        let pattern = pattern.into();
        self.with_client(move |client| client.add_command_with_id(id, pattern, Box::new(handler)));
        id
    }

    /// See [`Client::on_message`]. Deferred until attachment.
    pub fn on_message<F, Fut>(&self, matcher: Matcher, handler: F) -> HandlerId
    where
        F: Fn(Message, Captures) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let id = HandlerId::next();
        let handler = message_fn(handler);
        self.with_client(move |client| client.add_message_with_id(id, matcher, handler));
        id
    }

    /// See [`Client::on_join`]. Deferred until attachment.
    pub fn on_join<F, Fut>(&self, channel: Option<&str>, handler: F) -> HandlerId
    where
        F: Fn(Channel) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let id = HandlerId::next();
        let handler = join_fn(handler);
        let channel = channel.map(str::to_string);
        self.with_client(move |client| {
            client.add_join_with_id(id, channel, handler);
        });
        id
    }

    /// See [`Client::on_connected`].
    pub fn on_connected<F, Fut>(&self, handler: F) -> HandlerId
    where
        F: Fn(Client) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let id = HandlerId::next();
        let handler = connected_fn(handler);
        self.with_client(move |client| client.add_connected_with_id(id, handler));
        id
    }

    /// See [`Client::on_disconnected`].
    pub fn on_disconnected<F, Fut>(&self, handler: F) -> HandlerId
    where
        F: Fn(Client, Option<String>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let id = HandlerId::next();
        let handler = disconnected_fn(handler);
        self.with_client(move |client| client.add_disconnected_with_id(id, handler));
        id
    }

    /// Operations still waiting for attachment.
    pub fn pending(&self) -> usize {
        self.binding.lock().pending()
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("attached", &self.is_attached())
            .finish()
    }
}

// ============================================================================
// ChannelProxy
// ============================================================================

/// Stand-in for a [`Channel`] obtained from a module.
#[derive(Clone)]
pub struct ChannelProxy {
    name: Arc<str>,
    binding: Arc<Mutex<Binding<Channel>>>,
}

impl ChannelProxy {
    fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            binding: Arc::new(Mutex::new(Binding::new())),
        }
    }

    fn bind(&self, channel: Channel) {
        let replayed = self.binding.lock().bind(channel);
        debug!(channel = %self.name, replayed, "Channel proxy bound");
    }

    /// The channel name this proxy stands for.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The real channel, once the module is attached.
    pub fn channel(&self) -> Result<Channel> {
        self.binding
            .lock()
            .get()
            .cloned()
            .ok_or_else(|| ClientError::NotAttached(format!("channel {}", self.name)))
    }

    /// Send to the channel. Fails with [`ClientError::NotAttached`] before
    /// the module is attached.
    pub fn message(&self, text: &str, notice: bool) -> Result<()> {
        self.channel()?.message(text, notice)
    }

    /// See [`Channel::on_message`].
    pub fn on_message<F, Fut>(&self, matcher: Matcher, accept_query: bool, handler: F) -> HandlerId
    where
        F: Fn(Message, Captures) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let id = HandlerId::next();
        let handler = message_fn(handler);
        self.binding.lock().run_or_defer(move |channel: &Channel| {
            let matcher = matcher.scoped_to(channel.name(), accept_query);
            channel.client().add_message_with_id(id, matcher, handler);
        });
        id
    }

    /// Run `handler` whenever a join of this channel completes.
    pub fn on_join<F, Fut>(&self, handler: F) -> HandlerId
    where
        F: Fn(Channel) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let id = HandlerId::next();
        let handler = join_fn(handler);
        self.binding.lock().run_or_defer(move |channel: &Channel| {
            channel
                .client()
                .add_join_with_id(id, Some(channel.name().to_string()), handler);
        });
        id
    }
}

impl fmt::Debug for ChannelProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelProxy")
            .field("name", &self.name)
            .field("bound", &self.binding.lock().get().is_some())
            .finish()
    }
}
