//! Command handlers: synchronous hooks on raw protocol lines.
//!
//! A command handler runs inline in the dispatch loop for every line its
//! [`CommandPattern`] matches, before the line reaches anything else. The
//! registration handshake and the join bookkeeping are built from these.

use asif_proto::RawMessage;

use super::registry::{HandlerId, HandlerKind};
use crate::client::Client;
use crate::error::ClientError;

/// Matches a line by a prefix of its positional tokens and, optionally, an
/// exact trailing.
///
/// `["353", "me"]` matches every `353 me ...` line; the command is the
/// first token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPattern {
    tokens: Vec<String>,
    trailing: Option<String>,
}

impl CommandPattern {
    /// Match lines whose parameters start with `tokens`.
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
            trailing: None,
        }
    }

    /// Also require the trailing to equal `trailing` exactly.
    #[must_use]
    pub fn with_trailing(mut self, trailing: impl Into<String>) -> Self {
        self.trailing = Some(trailing.into());
        self
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Whether `msg` starts with every token and carries the trailing, if
    /// one was required.
    pub fn matches(&self, msg: &RawMessage) -> bool {
        if msg.params.len() < self.tokens.len() {
            return false;
        }
        let prefix_matches = self
            .tokens
            .iter()
            .zip(&msg.params)
            .all(|(want, got)| want == got);
        prefix_matches
            && self
                .trailing
                .as_ref()
                .is_none_or(|want| msg.trailing.as_ref() == Some(want))
    }
}

/// `"PRIVMSG #chan"` splits on whitespace.
impl From<&str> for CommandPattern {
    fn from(s: &str) -> Self {
        Self::new(s.split_whitespace())
    }
}

impl<const N: usize> From<[&str; N]> for CommandPattern {
    fn from(tokens: [&str; N]) -> Self {
        Self::new(tokens)
    }
}

impl From<Vec<String>> for CommandPattern {
    fn from(tokens: Vec<String>) -> Self {
        Self::new(tokens)
    }
}

/// Loop-side follow-ups requested by a command handler.
///
/// Applied once every handler has seen the current line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Effect {
    Remove(HandlerKind, HandlerId),
    /// The handshake finished; the connection is usable.
    Registered,
    /// The name list for a channel we joined is complete.
    JoinCompleted(String),
}

/// What a command handler can see and do while it runs.
pub struct CommandContext<'a> {
    client: &'a Client,
    handler_id: HandlerId,
    effects: &'a mut Vec<Effect>,
}

impl<'a> CommandContext<'a> {
    pub(crate) fn new(client: &'a Client, handler_id: HandlerId, effects: &'a mut Vec<Effect>) -> Self {
        Self {
            client,
            handler_id,
            effects,
        }
    }

    /// The client the line arrived on.
    pub fn client(&self) -> &Client {
        self.client
    }

    /// Id of the running handler.
    pub fn handler_id(&self) -> HandlerId {
        self.handler_id
    }

    /// Deregister the running handler once this line is done.
    pub fn remove_self(&mut self) {
        self.effects
            .push(Effect::Remove(HandlerKind::Command, self.handler_id));
    }

    /// Deregister another handler once this line is done.
    pub fn remove(&mut self, kind: HandlerKind, id: HandlerId) {
        self.effects.push(Effect::Remove(kind, id));
    }

    pub(crate) fn push(&mut self, effect: Effect) {
        self.effects.push(effect);
    }
}

/// Boxed command handler body.
pub type CommandFn =
    Box<dyn FnMut(&RawMessage, &mut CommandContext<'_>) -> Result<(), ClientError> + Send>;

pub(crate) struct CommandEntry {
    pub pattern: CommandPattern,
    pub handler: CommandFn,
}
