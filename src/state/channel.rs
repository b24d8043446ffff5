//! Channel handle.

use std::fmt;
use std::future::Future;
use std::hash::{Hash, Hasher};

use crate::client::{Awaiting, Client};
use crate::error::{HandlerResult, Result};
use crate::handlers::{Captures, HandlerId, Matcher};
use asif_proto::RawMessage;

use super::{Message, User};

/// A channel, addressed by name.
///
/// Membership is read from the roster on every call, so a handle stays
/// current for as long as the client knows the channel.
#[derive(Clone)]
pub struct Channel {
    name: String,
    client: Client,
}

impl Channel {
    pub(crate) fn new(name: String, client: Client) -> Self {
        Self { name, client }
    }

    /// Channel name, prefix included.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Current members, sorted by nick.
    pub fn members(&self) -> Vec<User> {
        self.members_with_modes()
            .into_iter()
            .map(|(user, _)| user)
            .collect()
    }

    /// Current members with their membership mode letter.
    pub fn members_with_modes(&self) -> Vec<(User, Option<char>)> {
        let roster = self.client.roster().read();
        roster
            .members(&self.name)
            .into_iter()
            .map(|(state, mode)| {
                (
                    User::new(state.name, state.hostmask, self.client.clone()),
                    mode,
                )
            })
            .collect()
    }

    pub fn contains(&self, user: &User) -> bool {
        self.contains_nick(user.name())
    }

    /// Whether a user called `nick` is a current member.
    pub fn contains_nick(&self, nick: &str) -> bool {
        let roster = self.client.roster().read();
        match (roster.channel(&self.name), roster.user_id(nick)) {
            (Some(channel), Some(id)) => channel.members.contains_key(&id),
            _ => false,
        }
    }

    /// Membership mode letter of `user` (`o`, `v`, ...), if any.
    pub fn mode_of(&self, user: &User) -> Option<char> {
        let roster = self.client.roster().read();
        let id = roster.user_id(user.name())?;
        roster.channel(&self.name)?.members.get(&id).copied().flatten()
    }

    /// Send a PRIVMSG (or NOTICE) to the channel.
    pub fn message(&self, text: &str, notice: bool) -> Result<()> {
        self.client.message(&self.name, text, notice)
    }

    pub fn part(&self, reason: Option<&str>) -> Result<()> {
        self.client.part(&self.name, reason)
    }

    /// See [`Client::part_and_wait`].
    pub fn part_and_wait(&self, reason: Option<&str>) -> Result<Awaiting<RawMessage>> {
        self.client.part_and_wait(&self.name, reason)
    }

    /// Register a message handler scoped to this channel.
    ///
    /// With `accept_query`, private messages from users reach the handler
    /// too, so one handler can serve both the channel and queries.
    pub fn on_message<F, Fut>(&self, matcher: Matcher, accept_query: bool, handler: F) -> HandlerId
    where
        F: Fn(Message, Captures) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.client
            .on_message(matcher.scoped_to(&self.name, accept_query), handler)
    }

    /// Register a handler for when the join of this channel completes.
    pub fn on_join<F, Fut>(&self, handler: F) -> HandlerId
    where
        F: Fn(Channel) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.client.on_join(Some(&self.name), handler)
    }
}

impl PartialEq for Channel {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Channel {}

impl Hash for Channel {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel").field("name", &self.name).finish()
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn members_read_through_roster() {
        let client = Client::new(Config::new("localhost", 6667, "me"));
        {
            let mut roster = client.roster().write();
            roster.apply_join("me!m@h", "#x");
            roster.add_member("#x", "@op");
        }

        let channel = client.channel("#x");
        let names: Vec<_> = channel.members().iter().map(|u| u.name().to_string()).collect();
        assert_eq!(names, vec!["me", "op"]);

        let op = client.get_user("op").unwrap();
        assert!(channel.contains(&op));
        assert_eq!(channel.mode_of(&op), Some('o'));
        assert!(!channel.contains_nick("nobody"));
    }
}
