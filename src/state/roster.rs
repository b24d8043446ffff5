//! The roster: every user and channel the client currently knows about.
//!
//! Users are stored under a stable [`UserId`] with a separate nick index, so
//! a rename moves one index entry and leaves channel membership untouched.
//! Only the dispatch loop mutates the roster; everything else reads it
//! through the client's `RwLock`.

use std::collections::HashMap;

use asif_proto::{PrefixSpec, split_prefix};

/// Channel prefix characters assumed until the server announces `CHANTYPES`.
pub const DEFAULT_CHANTYPES: &str = "#&";

/// Membership prefixes assumed until the server announces `PREFIX`.
pub const DEFAULT_PREFIX: &str = "(ov)@+";

/// Stable identity of a user across nick changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(u64);

/// A known user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserState {
    pub name: String,
    /// `user@host`, once seen.
    pub hostmask: Option<String>,
}

/// A known channel and its members.
#[derive(Debug, Clone, Default)]
pub struct ChannelState {
    pub name: String,
    /// Member -> membership mode letter (`o`, `v`, ...), if any.
    pub members: HashMap<UserId, Option<char>>,
}

/// Resolved target of a PRIVMSG or NOTICE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipientRef {
    User(UserId),
    Channel(String),
}

/// Who a JOIN was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The local client joined; the name list will follow.
    SelfJoined,
    /// Someone else joined a channel we are in.
    OtherJoined,
}

/// Users, channels and the server's naming rules.
#[derive(Debug)]
pub struct Roster {
    own_nick: String,
    next_id: u64,
    users: HashMap<UserId, UserState>,
    nicks: HashMap<String, UserId>,
    channels: HashMap<String, ChannelState>,
    chantypes: String,
    /// `(prefix char, mode char)` in rank order.
    prefixes: Vec<(char, char)>,
}

impl Roster {
    pub fn new(own_nick: impl Into<String>) -> Self {
        let mut roster = Self {
            own_nick: own_nick.into(),
            next_id: 0,
            users: HashMap::new(),
            nicks: HashMap::new(),
            channels: HashMap::new(),
            chantypes: DEFAULT_CHANTYPES.to_string(),
            prefixes: Vec::new(),
        };
        if let Some(spec) = PrefixSpec::parse(DEFAULT_PREFIX) {
            roster.set_prefixes(spec);
        }
        roster
    }

    // ========================================================================
    // Server features
    // ========================================================================

    pub fn own_nick(&self) -> &str {
        &self.own_nick
    }

    /// Record the nick the server knows us by.
    pub fn set_own_nick(&mut self, nick: impl Into<String>) {
        self.own_nick = nick.into();
    }

    pub fn is_own_nick(&self, nick: &str) -> bool {
        self.own_nick == nick
    }

    pub fn chantypes(&self) -> &str {
        &self.chantypes
    }

    pub fn set_chantypes(&mut self, chantypes: &str) {
        self.chantypes = chantypes.to_string();
    }

    pub fn set_prefixes(&mut self, spec: PrefixSpec<'_>) {
        self.prefixes = spec.pairs().collect();
    }

    /// Whether `token` names a channel under the current `CHANTYPES`.
    pub fn is_channel_name(&self, token: &str) -> bool {
        token
            .chars()
            .next()
            .is_some_and(|c| self.chantypes.contains(c))
    }

    fn mode_for_prefix(&self, prefix: char) -> Option<char> {
        self.prefixes
            .iter()
            .find(|(p, _)| *p == prefix)
            .map(|(_, m)| *m)
    }

    // ========================================================================
    // Resolution (get-or-create)
    // ========================================================================

    /// Look up or create the user named by a nick or a full prefix.
    ///
    /// A hostmask carried by the prefix is recorded if none is known yet.
    pub fn resolve_user(&mut self, prefix_or_nick: &str) -> UserId {
        let (nick, hostmask) = split_prefix(prefix_or_nick);

        if let Some(&id) = self.nicks.get(nick) {
            if let (Some(user), Some(mask)) = (self.users.get_mut(&id), hostmask) {
                if user.hostmask.is_none() {
                    user.hostmask = Some(mask.to_string());
                }
            }
            return id;
        }

        let id = UserId(self.next_id);
        self.next_id += 1;
        self.users.insert(
            id,
            UserState {
                name: nick.to_string(),
                hostmask: hostmask.map(str::to_string),
            },
        );
        self.nicks.insert(nick.to_string(), id);
        id
    }

    /// Look up or create a channel.
    pub fn resolve_channel(&mut self, name: &str) -> &mut ChannelState {
        self.channels
            .entry(name.to_string())
            .or_insert_with(|| ChannelState {
                name: name.to_string(),
                members: HashMap::new(),
            })
    }

    /// Resolve a PRIVMSG/NOTICE target to a channel or a user.
    pub fn resolve_recipient(&mut self, token: &str) -> RecipientRef {
        if self.is_channel_name(token) {
            self.resolve_channel(token);
            RecipientRef::Channel(token.to_string())
        } else {
            RecipientRef::User(self.resolve_user(token))
        }
    }

    // ========================================================================
    // Events
    // ========================================================================

    pub fn apply_join(&mut self, actor: &str, channel: &str) -> JoinOutcome {
        let id = self.resolve_user(actor);
        let outcome = if self.user_is_self(id) {
            JoinOutcome::SelfJoined
        } else {
            JoinOutcome::OtherJoined
        };
        self.resolve_channel(channel).members.entry(id).or_insert(None);
        outcome
    }

    /// Returns `true` if the local client left and the channel was dropped.
    pub fn apply_part(&mut self, actor: &str, channel: &str) -> bool {
        let id = self.resolve_user(actor);
        self.leave(id, channel)
    }

    /// Returns `true` if the local client was kicked and the channel dropped.
    pub fn apply_kick(&mut self, channel: &str, victim: &str) -> bool {
        let id = self.resolve_user(victim);
        self.leave(id, channel)
    }

    fn leave(&mut self, id: UserId, channel: &str) -> bool {
        if self.user_is_self(id) {
            return self.channels.remove(channel).is_some();
        }
        if let Some(state) = self.channels.get_mut(channel) {
            state.members.remove(&id);
        }
        false
    }

    /// Remove a user from every channel and from the roster.
    pub fn apply_quit(&mut self, actor: &str) {
        let id = self.resolve_user(actor);
        self.forget(id);
    }

    fn forget(&mut self, id: UserId) {
        for channel in self.channels.values_mut() {
            channel.members.remove(&id);
        }
        if let Some(user) = self.users.remove(&id) {
            self.nicks.remove(&user.name);
        }
    }

    /// Rename a user in place. Returns the old nick.
    ///
    /// A stale entry already holding `new_name` is dropped first: the server
    /// just told us that nick belongs to someone else now.
    pub fn apply_nick_change(&mut self, actor: &str, new_name: &str) -> String {
        let id = self.resolve_user(actor);
        let Some(old) = self.users.get(&id).map(|u| u.name.clone()) else {
            return String::new();
        };
        if old == new_name {
            return old;
        }

        if let Some(&stale) = self.nicks.get(new_name) {
            self.forget(stale);
        }

        self.nicks.remove(&old);
        self.nicks.insert(new_name.to_string(), id);
        if let Some(user) = self.users.get_mut(&id) {
            user.name = new_name.to_string();
        }
        if self.own_nick == old {
            self.own_nick = new_name.to_string();
        }
        old
    }

    /// Record one name-list token (`@nick`, `+nick`, `nick`) as a member.
    ///
    /// Every leading membership prefix is stripped; the first one decides
    /// the recorded mode. Returns the member's id, or `None` for a token
    /// that is only prefix characters.
    pub fn add_member(&mut self, channel: &str, token: &str) -> Option<UserId> {
        let nick = token.trim_start_matches(|c| self.mode_for_prefix(c).is_some());
        if nick.is_empty() {
            return None;
        }
        let mode = token.chars().next().and_then(|c| self.mode_for_prefix(c));
        let id = self.resolve_user(nick);
        self.resolve_channel(channel).members.insert(id, mode);
        Some(id)
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub fn user(&self, id: UserId) -> Option<&UserState> {
        self.users.get(&id)
    }

    pub fn user_id(&self, nick: &str) -> Option<UserId> {
        self.nicks.get(nick).copied()
    }

    pub fn user_by_name(&self, nick: &str) -> Option<&UserState> {
        self.user_id(nick).and_then(|id| self.users.get(&id))
    }

    pub fn channel(&self, name: &str) -> Option<&ChannelState> {
        self.channels.get(name)
    }

    pub fn channel_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.channels.keys().cloned().collect();
        names.sort();
        names
    }

    /// Members of `channel` as `(user, mode)`, sorted by nick.
    pub fn members(&self, channel: &str) -> Vec<(UserState, Option<char>)> {
        let Some(state) = self.channels.get(channel) else {
            return Vec::new();
        };
        let mut members: Vec<_> = state
            .members
            .iter()
            .filter_map(|(id, mode)| self.users.get(id).map(|u| (u.clone(), *mode)))
            .collect();
        members.sort_by(|a, b| a.0.name.cmp(&b.0.name));
        members
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    fn user_is_self(&self, id: UserId) -> bool {
        self.users
            .get(&id)
            .is_some_and(|u| u.name == self.own_nick)
    }
}
