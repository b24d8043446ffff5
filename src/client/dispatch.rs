//! Per-line dispatch.
//!
//! For each decoded line, in order:
//!
//! 1. `PING` is answered with `PONG` and nothing else sees the line.
//! 2. JOIN, PART, KICK, QUIT and NICK update the roster.
//! 3. Matching command handlers run inline.
//! 4. Before registration completes, processing stops here.
//! 5. PRIVMSG and NOTICE become a [`Message`] for the message handlers.
//!
//! Anything else is ignored.

use asif_proto::{ProtocolError, RawMessage, build, is_user_prefix, tokens};
use futures_util::Sink;
use tracing::{debug, info, trace};

use super::background::{spawn_isolated, supervise};
use super::event_loop::{Dispatcher, write_line};
use super::{ConnectionState, names};
use crate::error::Result;
use crate::handlers::{CommandContext, Effect, HandlerKind};
use crate::state::roster::{JoinOutcome, RecipientRef};
use crate::state::{Channel, Message, Recipient};

/// Positional parameter `index`, falling back to the trailing.
///
/// Servers differ on whether they send `JOIN #chan` or `JOIN :#chan`.
fn param_or_trailing(msg: &RawMessage, index: usize) -> Option<&str> {
    msg.param(index).or(msg.trailing.as_deref())
}

impl Dispatcher {
    pub(super) async fn handle_line<W>(&mut self, line: &str, writer: &mut W) -> Result<()>
    where
        W: Sink<String, Error = ProtocolError> + Unpin,
    {
        debug!("-> {line}");
        let Some(msg) = RawMessage::parse(line) else {
            return Ok(());
        };

        if msg.command() == tokens::PING {
            let payload = msg.trailing_or_param(1).unwrap_or_default();
            return write_line(writer, build(&[tokens::PONG], None, Some(payload))).await;
        }

        self.track_roster(&msg);
        self.run_command_handlers(&msg)?;

        if self.client.state() != ConnectionState::Connected {
            return Ok(());
        }

        if matches!(msg.command(), tokens::PRIVMSG | tokens::NOTICE) {
            self.deliver(&msg);
        }
        Ok(())
    }

    /// Apply membership and nick events to the roster.
    fn track_roster(&mut self, msg: &RawMessage) {
        let Some(prefix) = msg.prefix.as_deref() else {
            return;
        };

        match msg.command() {
            tokens::JOIN => {
                let Some(channel) = param_or_trailing(msg, 1) else {
                    return;
                };
                let (outcome, own_nick) = {
                    let mut roster = self.client.roster().write();
                    let outcome = roster.apply_join(prefix, channel);
                    (outcome, roster.own_nick().to_string())
                };
                match outcome {
                    JoinOutcome::SelfJoined => {
                        debug!(channel = %channel, "Join confirmed, gathering names");
                        names::install(&mut self.commands, channel, &own_nick);
                    }
                    JoinOutcome::OtherJoined => {
                        info!(channel = %channel, user = %prefix, "User joined");
                    }
                }
            }
            tokens::PART => {
                let Some(channel) = msg.param(1) else {
                    return;
                };
                if self.client.roster().write().apply_part(prefix, channel) {
                    info!(channel = %channel, "Left channel");
                } else {
                    info!(channel = %channel, user = %prefix, reason = msg.trailing.as_deref().unwrap_or(""), "User left");
                }
            }
            tokens::KICK => {
                let (Some(channel), Some(victim)) = (msg.param(1), msg.param(2)) else {
                    return;
                };
                if self.client.roster().write().apply_kick(channel, victim) {
                    info!(channel = %channel, by = %prefix, "Kicked from channel");
                } else {
                    info!(channel = %channel, user = %victim, by = %prefix, "User kicked");
                }
            }
            tokens::QUIT => {
                self.client.roster().write().apply_quit(prefix);
                info!(user = %prefix, reason = msg.trailing.as_deref().unwrap_or(""), "User quit");
            }
            tokens::NICK => {
                let Some(new_nick) = param_or_trailing(msg, 1) else {
                    return;
                };
                let old = self.client.roster().write().apply_nick_change(prefix, new_nick);
                info!(old = %old, new = %new_nick, "Nick changed");
            }
            _ => {}
        }
    }

    fn run_command_handlers(&mut self, msg: &RawMessage) -> Result<()> {
        let mut effects = Vec::new();
        for (id, entry) in self.commands.iter_mut() {
            if !entry.pattern.matches(msg) {
                continue;
            }
            trace!(handler = %id, command = msg.command(), "Running command handler");
            let mut ctx = CommandContext::new(&self.client, id, &mut effects);
            (entry.handler)(msg, &mut ctx)?;
        }

        for effect in effects {
            match effect {
                Effect::Remove(kind, id) => {
                    self.remove(kind, id);
                }
                Effect::Registered => self.registered(),
                Effect::JoinCompleted(channel) => self.join_completed(&channel),
            }
        }
        Ok(())
    }

    /// Mark the connection usable and start the on-connected callbacks.
    fn registered(&mut self) {
        if self.client.state() == ConnectionState::Connected {
            return;
        }
        self.client.set_state(ConnectionState::Connected);
        info!(nick = %self.client.nick(), "Registered");

        let callbacks: Vec<_> = self
            .connected
            .iter()
            .map(|(id, handler)| (id, handler.clone()))
            .collect();
        let client = self.client.clone();
        tokio::spawn(async move {
            for (id, handler) in callbacks {
                supervise(HandlerKind::Connected, id, handler(client.clone())).await;
            }
        });
    }

    fn join_completed(&mut self, name: &str) {
        let channel = Channel::new(name.to_string(), self.client.clone());
        info!(channel = %name, members = channel.members().len(), "Joined channel");

        for (id, entry) in self.joins.iter() {
            if entry.wants(name) {
                spawn_isolated(HandlerKind::Join, id, (entry.handler)(channel.clone()));
            }
        }
    }

    fn deliver(&mut self, msg: &RawMessage) {
        let Some(target) = msg.param(1) else {
            return;
        };
        let text = msg.trailing_or_param(2).unwrap_or_default().to_string();
        let notice = msg.command() == tokens::NOTICE;

        let (sender, recipient) = {
            let mut roster = self.client.roster().write();
            let sender = msg
                .prefix
                .as_deref()
                .filter(|p| is_user_prefix(p))
                .map(|p| roster.resolve_user(p))
                .and_then(|id| roster.user(id))
                .map(|state| self.client.user_handle(state));
            let recipient = match roster.resolve_recipient(target) {
                RecipientRef::Channel(name) => Recipient::Channel(Channel::new(name, self.client.clone())),
                RecipientRef::User(id) => match roster.user(id) {
                    Some(state) => Recipient::User(self.client.user_handle(state)),
                    None => return,
                },
            };
            (sender, recipient)
        };

        let message = Message {
            sender,
            recipient,
            text,
            notice,
            client: self.client.clone(),
        };

        for (id, entry) in self.messages.iter() {
            if let Some(captures) = entry.matcher.matches(&message) {
                trace!(handler = %id, "Message matched");
                spawn_isolated(
                    HandlerKind::Message,
                    id,
                    (entry.handler)(message.clone(), captures),
                );
            }
        }
    }
}
