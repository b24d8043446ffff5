//! The client: one connection, its roster and its handlers.
//!
//! [`Client`] is a cheap, cloneable handle. The connection itself is driven
//! by [`Client::run`] (or [`Client::run_with`] for an already-open stream),
//! which owns the handler registries for as long as it runs. Every other
//! method talks to that loop through a FIFO control queue.
//!
//! ```no_run
//! use asif::{Client, Config, Matcher};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let client = Client::new(Config::new("irc.libera.chat", 6667, "asif"));
//!
//! client.on_connected(|client| async move {
//!     client.join("#asif")?;
//!     Ok(())
//! });
//!
//! let ping = Matcher::builder().text("!ping").build()?;
//! client.on_message(ping, |msg, _| async move {
//!     msg.reply("pong", None)?;
//!     Ok(())
//! });
//!
//! client.run().await?;
//! # Ok(())
//! # }
//! ```

mod awaiting;
mod background;
mod control;
mod dispatch;
mod event_loop;
mod handshake;
mod names;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use asif_proto::{LineCodec, RawMessage, build, split_prefix, tokens};
use parking_lot::{Mutex, RwLock};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{Instrument, debug, error, info};

use crate::config::Config;
use crate::error::{ClientError, HandlerResult, Result};
use crate::handlers::{
    Captures, CommandContext, CommandEntry, CommandFn, CommandPattern, ConnectedFn,
    DisconnectedFn, HandlerId, HandlerKind, JoinEntry, JoinFn, Matcher, MessageEntry, MessageFn,
    RegistryStats, connected_fn, disconnected_fn, join_fn, message_fn,
};
use crate::module::Module;
use crate::state::roster::UserState;
use crate::state::{Channel, Message, Roster, User};
use crate::telemetry::spans;

pub use awaiting::Awaiting;

use awaiting::Registration;
use control::Control;
use event_loop::Dispatcher;

/// Lifecycle of the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Not connected yet.
    Connecting,
    /// Socket open, handshake in progress.
    Registering,
    /// Handshake complete; messages are delivered.
    Connected,
    /// The loop has ended.
    Closed,
}

struct Shared {
    config: Config,
    roster: RwLock<Roster>,
    control: mpsc::UnboundedSender<Control>,
    /// Taken by the first `run`.
    pending: Mutex<Option<mpsc::UnboundedReceiver<Control>>>,
    state: watch::Sender<ConnectionState>,
}

/// Handle to an IRC connection.
#[derive(Clone)]
pub struct Client {
    shared: Arc<Shared>,
}

impl Client {
    /// Create a client for `config`. Nothing is sent until [`run`](Self::run).
    ///
    /// Handlers and modules may be registered before running; they are
    /// queued and take effect once the loop starts.
    pub fn new(config: Config) -> Self {
        let (control, pending) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(ConnectionState::Connecting);
        let roster = Roster::new(config.identity.nick.clone());
        Self {
            shared: Arc::new(Shared {
                config,
                roster: RwLock::new(roster),
                control,
                pending: Mutex::new(Some(pending)),
                state,
            }),
        }
    }

    /// The configuration this client was created with.
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    pub(crate) fn roster(&self) -> &RwLock<Roster> {
        &self.shared.roster
    }

    /// The nick the server currently knows us by.
    pub fn nick(&self) -> String {
        self.shared.roster.read().own_nick().to_string()
    }

    // ========================================================================
    // Running
    // ========================================================================

    /// Connect over TCP to the configured server and run until the
    /// connection ends.
    ///
    /// Returns `Ok(())` when the server closes the stream. Transport and
    /// protocol failures, and errors from command handlers, end the loop
    /// and are returned.
    pub async fn run(&self) -> Result<()> {
        let address = self.shared.config.address();
        info!(address = %address, "Connecting");
        let stream = match TcpStream::connect(&address).await {
            Ok(stream) => stream,
            Err(e) => {
                error!(address = %address, error = %e, "Connect failed");
                self.set_state(ConnectionState::Closed);
                return Err(e.into());
            }
        };
        self.run_with(stream).await
    }

    /// Run the protocol over an already-open stream.
    pub async fn run_with<S>(&self, stream: S) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let control = self
            .shared
            .pending
            .lock()
            .take()
            .ok_or(ClientError::AlreadyRunning)?;

        let span = spans::connection(&self.shared.config.server.host, &self.nick());
        let result = Dispatcher::new(self.clone(), control)
            .run(stream)
            .instrument(span)
            .await;
        self.set_state(ConnectionState::Closed);

        match &result {
            Ok(()) => info!("Connection closed"),
            Err(e) => error!(error = %e, code = e.error_code(), "Connection failed"),
        }
        result
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    pub(crate) fn set_state(&self, state: ConnectionState) {
        let previous = self.shared.state.send_replace(state);
        if previous != state {
            debug!(from = ?previous, to = ?state, "Connection state changed");
        }
    }

    /// Wait until the connection reaches `target`.
    ///
    /// Fails with [`ClientError::Closed`] if the loop ends first.
    pub async fn wait_for_state(&self, target: ConnectionState) -> Result<()> {
        let mut rx = self.shared.state.subscribe();
        let reached = rx
            .wait_for(|s| *s == target || *s == ConnectionState::Closed)
            .await
            .map(|s| *s)
            .map_err(|_| ClientError::Closed)?;
        if reached == target {
            Ok(())
        } else {
            Err(ClientError::Closed)
        }
    }

    // ========================================================================
    // Outbound
    // ========================================================================

    fn enqueue(&self, control: Control) -> Result<()> {
        let label = control.label();
        self.shared.control.send(control).map_err(|_| {
            debug!(control = label, "Dispatch loop is gone");
            ClientError::Closed
        })
    }

    /// Queue a structured message for writing.
    pub fn send(&self, msg: &RawMessage) -> Result<()> {
        self.send_raw(msg.to_string())
    }

    /// Queue one line for writing. The terminator is added on the wire.
    pub fn send_raw(&self, line: impl Into<String>) -> Result<()> {
        let line = line.into();
        LineCodec::validate_outgoing(&line)?;
        self.enqueue(Control::Send(line))
    }

    /// Send a PRIVMSG, or a NOTICE with `notice`, to a nick or channel.
    pub fn message(&self, target: &str, text: &str, notice: bool) -> Result<()> {
        let command = if notice { tokens::NOTICE } else { tokens::PRIVMSG };
        self.send_raw(build(&[command, target], None, Some(text)))
    }

    /// Request a nick change. The roster follows once the server confirms.
    pub fn change_nick(&self, nick: &str) -> Result<()> {
        self.send_raw(build(&[tokens::NICK, nick], None, None))
    }

    /// Join a channel without waiting for the name list.
    pub fn join(&self, channel: &str) -> Result<()> {
        LineCodec::validate_outgoing(channel)?;
        self.enqueue(Control::Join(channel.to_string()))
    }

    /// Join a channel; the result resolves once its name list is complete.
    pub fn join_and_wait(&self, channel: &str) -> Result<Awaiting<Channel>> {
        let id = HandlerId::next();
        let (slot, rx) = awaiting::slot();
        let control = self.shared.control.clone();
        let handler = join_fn(move |joined: Channel| {
            let slot = slot.clone();
            let control = control.clone();
            async move {
                if slot.fill(joined) {
                    let _ = control.send(Control::Remove(HandlerKind::Join, id));
                }
                Ok(())
            }
        });
        self.add_join_with_id(id, Some(channel.to_string()), handler);
        let waiting = Awaiting::new(rx, self.registration(HandlerKind::Join, id));
        self.join(channel)?;
        Ok(waiting)
    }

    /// Leave `channel`. The roster drops it when the server echoes the PART.
    pub fn part(&self, channel: &str, reason: Option<&str>) -> Result<()> {
        self.send_raw(build(&[tokens::PART, channel], None, reason))
    }

    /// Part a channel; the result resolves with the server's PART echo.
    pub fn part_and_wait(&self, channel: &str, reason: Option<&str>) -> Result<Awaiting<RawMessage>> {
        let waiting = self.await_command_where(
            CommandPattern::new([tokens::PART, channel]),
            |msg, client| {
                msg.prefix
                    .as_deref()
                    .is_some_and(|p| client.roster().read().is_own_nick(split_prefix(p).0))
            },
        );
        self.part(channel, reason)?;
        Ok(waiting)
    }

    /// Run the on-disconnected callbacks in order, then send `QUIT`.
    ///
    /// Resolves once `QUIT` is queued; the loop ends when the server closes
    /// the connection.
    pub async fn quit(&self, reason: Option<&str>) -> Result<()> {
        let (done, rx) = oneshot::channel();
        self.enqueue(Control::Quit {
            reason: reason.map(str::to_string),
            done,
        })?;
        rx.await.map_err(|_| ClientError::Closed)
    }

    // ========================================================================
    // Roster reads
    // ========================================================================

    pub(crate) fn user_handle(&self, state: &UserState) -> User {
        User::new(state.name.clone(), state.hostmask.clone(), self.clone())
    }

    /// A known user by nick.
    pub fn get_user(&self, nick: &str) -> Option<User> {
        let roster = self.shared.roster.read();
        roster.user_by_name(nick).map(|u| self.user_handle(u))
    }

    /// A known channel by name.
    pub fn get_channel(&self, name: &str) -> Option<Channel> {
        let known = self.shared.roster.read().channel(name).is_some();
        known.then(|| self.channel(name))
    }

    /// A handle for `name`, known or not.
    pub fn channel(&self, name: &str) -> Channel {
        Channel::new(name.to_string(), self.clone())
    }

    /// Every channel the roster tracks, sorted by name.
    pub fn channels(&self) -> Vec<Channel> {
        let names = self.shared.roster.read().channel_names();
        names.into_iter().map(|n| Channel::new(n, self.clone())).collect()
    }

    // ========================================================================
    // Registration
    // ========================================================================

    fn register(&self, control: Control) {
        // A closed loop never dispatches again, so a lost registration is
        // harmless; `enqueue` already logged it.
        let _ = self.enqueue(control);
    }

    fn registration(&self, kind: HandlerKind, id: HandlerId) -> Registration {
        Registration::new(self.shared.control.clone(), kind, id)
    }

    /// Run `handler` inline for every line matching `pattern`.
    ///
    /// An error from the handler ends the connection.
    pub fn on_command<F>(&self, pattern: impl Into<CommandPattern>, handler: F) -> HandlerId
    where
        F: FnMut(&RawMessage, &mut CommandContext<'_>) -> Result<()> + Send + 'static,
    {
        let id = HandlerId::next();
        self.add_command_with_id(id, pattern.into(), Box::new(handler));
        id
    }

    pub(crate) fn add_command_with_id(&self, id: HandlerId, pattern: CommandPattern, handler: CommandFn) {
        self.register(Control::AddCommand(id, CommandEntry { pattern, handler }));
    }

    /// Spawn `handler` for every PRIVMSG/NOTICE that `matcher` accepts.
    pub fn on_message<F, Fut>(&self, matcher: Matcher, handler: F) -> HandlerId
    where
        F: Fn(Message, Captures) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let id = HandlerId::next();
        self.add_message_with_id(id, matcher, message_fn(handler));
        id
    }

    pub(crate) fn add_message_with_id(&self, id: HandlerId, matcher: Matcher, handler: MessageFn) {
        self.register(Control::AddMessage(id, MessageEntry { matcher, handler }));
    }

    /// Spawn `handler` whenever a join completes, for `channel` or for
    /// every channel with `None`.
    pub fn on_join<F, Fut>(&self, channel: Option<&str>, handler: F) -> HandlerId
    where
        F: Fn(Channel) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let id = HandlerId::next();
        self.add_join_with_id(id, channel.map(str::to_string), join_fn(handler));
        id
    }

    pub(crate) fn add_join_with_id(&self, id: HandlerId, channel: Option<String>, handler: JoinFn) {
        self.register(Control::AddJoin(id, JoinEntry { channel, handler }));
    }

    /// Run `handler` once the handshake completes. Callbacks run in
    /// registration order; a failing one does not stop the rest.
    pub fn on_connected<F, Fut>(&self, handler: F) -> HandlerId
    where
        F: Fn(Client) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let id = HandlerId::next();
        self.add_connected_with_id(id, connected_fn(handler));
        id
    }

    pub(crate) fn add_connected_with_id(&self, id: HandlerId, handler: ConnectedFn) {
        self.register(Control::AddConnected(id, handler));
    }

    /// Run `handler` from [`quit`](Self::quit), before `QUIT` is sent.
    pub fn on_disconnected<F, Fut>(&self, handler: F) -> HandlerId
    where
        F: Fn(Client, Option<String>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let id = HandlerId::next();
        self.add_disconnected_with_id(id, disconnected_fn(handler));
        id
    }

    pub(crate) fn add_disconnected_with_id(&self, id: HandlerId, handler: DisconnectedFn) {
        self.register(Control::AddDisconnected(id, handler));
    }

    /// Remove a handler from the registry of `kind`. Unknown ids are ignored.
    pub fn remove_handler(&self, kind: HandlerKind, id: HandlerId) {
        self.register(Control::Remove(kind, id));
    }

    /// Shorthand for [`remove_handler`](Self::remove_handler) on command handlers.
    pub fn remove_command_handler(&self, id: HandlerId) {
        self.remove_handler(HandlerKind::Command, id);
    }

    /// Shorthand for [`remove_handler`](Self::remove_handler) on message handlers.
    pub fn remove_message_handler(&self, id: HandlerId) {
        self.remove_handler(HandlerKind::Message, id);
    }

    /// Shorthand for [`remove_handler`](Self::remove_handler) on join handlers.
    pub fn remove_join_handler(&self, id: HandlerId) {
        self.remove_handler(HandlerKind::Join, id);
    }

    // ========================================================================
    // One-shot waits
    // ========================================================================

    /// Resolve with the next line matching `pattern`.
    pub fn await_command(&self, pattern: impl Into<CommandPattern>) -> Awaiting<RawMessage> {
        self.await_command_where(pattern.into(), |_, _| true)
    }

    pub(crate) fn await_command_where<P>(&self, pattern: CommandPattern, filter: P) -> Awaiting<RawMessage>
    where
        P: Fn(&RawMessage, &Client) -> bool + Send + 'static,
    {
        let id = HandlerId::next();
        let (slot, rx) = awaiting::slot();
        let handler: CommandFn = Box::new(move |msg, ctx| {
            if filter(msg, ctx.client()) {
                slot.fill(msg.clone());
            }
            if slot.is_spent() {
                ctx.remove_self();
            }
            Ok(())
        });
        self.add_command_with_id(id, pattern, handler);
        Awaiting::new(rx, self.registration(HandlerKind::Command, id))
    }

    /// Resolve with the next message `matcher` accepts.
    pub fn await_message(&self, matcher: Matcher) -> Awaiting<(Message, Captures)> {
        let id = HandlerId::next();
        let (slot, rx) = awaiting::slot();
        let control = self.shared.control.clone();
        let handler = message_fn(move |msg, caps| {
            let slot = slot.clone();
            let control = control.clone();
            async move {
                if slot.fill((msg, caps)) {
                    let _ = control.send(Control::Remove(HandlerKind::Message, id));
                }
                Ok(())
            }
        });
        self.add_message_with_id(id, matcher, handler);
        Awaiting::new(rx, self.registration(HandlerKind::Message, id))
    }

    // ========================================================================
    // Modules and diagnostics
    // ========================================================================

    /// Attach a module, replaying everything it registered while detached.
    pub fn add_module(&self, module: &Module) {
        info!(module = %module.name(), "Attaching module");
        module.attach(self.clone());
    }

    /// Current registry sizes, as seen by the loop after everything queued
    /// before this call.
    pub async fn registry_stats(&self) -> Result<RegistryStats> {
        let (tx, rx) = oneshot::channel();
        self.enqueue(Control::Stats(tx))?;
        rx.await.map_err(|_| ClientError::Closed)
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("server", &self.shared.config.address())
            .field("nick", &self.nick())
            .field("state", &self.state())
            .finish()
    }
}
