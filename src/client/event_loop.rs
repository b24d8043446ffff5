//! The dispatch loop.
//!
//! One task owns the transport and every handler registry. It alternates
//! between two sources with a biased `select!`:
//!
//! ```text
//!   control queue ──┐   (drained first: registrations, removals, writes)
//!                   ├──► Dispatcher ──► socket
//!   socket lines ───┘   (one line at a time, see `dispatch`)
//! ```
//!
//! Because control requests are applied between lines, a registry is never
//! mutated while it is being iterated and writes keep their queue order.

use std::sync::Arc;

use asif_proto::{LineCodec, ProtocolError, build, tokens};
use futures_util::{Sink, SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, error, info, trace};

use super::background::supervise;
use super::control::Control;
use super::{Client, ConnectionState, handshake};
use crate::error::Result;
use crate::handlers::{
    CommandEntry, ConnectedFn, DisconnectedFn, HandlerId, HandlerKind, JoinEntry, MessageEntry, Registry,
    RegistryStats,
};

pub(crate) struct Dispatcher {
    pub(super) client: Client,
    control: mpsc::UnboundedReceiver<Control>,
    pub(super) commands: Registry<CommandEntry>,
    pub(super) messages: Registry<MessageEntry>,
    pub(super) joins: Registry<JoinEntry>,
    pub(super) connected: Registry<ConnectedFn>,
    disconnected: Registry<DisconnectedFn>,
}

/// Write one line, logging it.
pub(super) async fn write_line<W>(writer: &mut W, line: String) -> Result<()>
where
    W: Sink<String, Error = ProtocolError> + Unpin,
{
    debug!("<- {line}");
    writer.send(line).await?;
    Ok(())
}

impl Dispatcher {
    pub fn new(client: Client, control: mpsc::UnboundedReceiver<Control>) -> Self {
        Self {
            client,
            control,
            commands: Registry::new(),
            messages: Registry::new(),
            joins: Registry::new(),
            connected: Registry::new(),
            disconnected: Registry::new(),
        }
    }

    pub async fn run<S>(mut self, stream: S) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let max_line_len = self.client.config().limits.max_line_len;
        let (read, write) = tokio::io::split(stream);
        let mut reader = FramedRead::new(read, LineCodec::with_max_len(max_line_len));
        let mut writer = FramedWrite::new(write, LineCodec::new());

        self.client.set_state(ConnectionState::Registering);
        for line in handshake::begin(&self.client, &mut self.commands) {
            write_line(&mut writer, line).await?;
        }

        loop {
            tokio::select! {
                biased;

                Some(control) = self.control.recv() => {
                    self.apply_control(control, &mut writer).await?;
                }

                frame = reader.next() => match frame {
                    Some(Ok(line)) => self.handle_line(&line, &mut writer).await?,
                    Some(Err(e)) => {
                        error!(error = %e, "Read error");
                        return Err(e.into());
                    }
                    None => {
                        info!("Server closed the connection");
                        break;
                    }
                },
            }
        }

        Ok(())
    }

    async fn apply_control<W>(&mut self, control: Control, writer: &mut W) -> Result<()>
    where
        W: Sink<String, Error = ProtocolError> + Unpin,
    {
        trace!(control = control.label(), "Applying control request");
        match control {
            Control::Send(line) => write_line(writer, line).await?,
            Control::Join(channel) => {
                self.client.roster().write().resolve_channel(&channel);
                info!(channel = %channel, "Joining");
                write_line(writer, build(&[tokens::JOIN, channel.as_str()], None, None)).await?;
            }
            Control::AddCommand(id, entry) => self.commands.insert(id, entry),
            Control::AddMessage(id, entry) => self.messages.insert(id, entry),
            Control::AddJoin(id, entry) => self.joins.insert(id, entry),
            Control::AddConnected(id, handler) => self.connected.insert(id, handler),
            Control::AddDisconnected(id, handler) => self.disconnected.insert(id, handler),
            Control::Remove(kind, id) => {
                self.remove(kind, id);
            }
            Control::Quit { reason, done } => self.quit(reason, done),
            Control::Stats(tx) => {
                let _ = tx.send(self.stats());
            }
        }
        Ok(())
    }

    pub(super) fn remove(&mut self, kind: HandlerKind, id: HandlerId) -> bool {
        let removed = match kind {
            HandlerKind::Command => self.commands.remove(id),
            HandlerKind::Message => self.messages.remove(id),
            HandlerKind::Join => self.joins.remove(id),
            HandlerKind::Connected => self.connected.remove(id),
            HandlerKind::Disconnected => self.disconnected.remove(id),
        };
        if removed {
            trace!(kind = kind.as_str(), handler = %id, "Removed handler");
        }
        removed
    }

    /// Run the on-disconnected callbacks off the loop, then queue `QUIT`.
    ///
    /// Lines the callbacks send are queued before `QUIT`, so they still go
    /// out first.
    fn quit(&self, reason: Option<String>, done: oneshot::Sender<()>) {
        let callbacks: Vec<_> = self
            .disconnected
            .iter()
            .map(|(id, handler)| (id, Arc::clone(handler)))
            .collect();
        let client = self.client.clone();

        tokio::spawn(async move {
            for (id, handler) in callbacks {
                supervise(
                    HandlerKind::Disconnected,
                    id,
                    handler(client.clone(), reason.clone()),
                )
                .await;
            }
            info!(reason = reason.as_deref().unwrap_or(""), "Quitting");
            let line = build(&[tokens::QUIT], None, reason.as_deref());
            if client.send_raw(line).is_ok() {
                let _ = done.send(());
            }
        });
    }

    fn stats(&self) -> RegistryStats {
        RegistryStats {
            command: self.commands.len(),
            message: self.messages.len(),
            join: self.joins.len(),
            connected: self.connected.len(),
            disconnected: self.disconnected.len(),
        }
    }
}
