//! Message matchers.
//!
//! A [`Matcher`] is a conjunction of rules evaluated left to right. The
//! first rule that fails rejects the message; pattern rules that succeed
//! contribute their named groups to the [`Captures`] handed to the handler.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::error::{ClientError, Result};
use crate::state::{Channel, Message, Recipient, User};

/// Named groups captured while matching, merged across rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captures(HashMap<String, String>);

impl Captures {
    /// Value of the named group `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// All captured `(name, value)` pairs, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn absorb(&mut self, re: &Regex, haystack: &str) -> bool {
        let Some(caps) = re.captures(haystack) else {
            return false;
        };
        for name in re.capture_names().flatten() {
            if let Some(m) = caps.name(name) {
                self.0.insert(name.to_string(), m.as_str().to_string());
            }
        }
        true
    }
}

/// Custom predicate over a whole message.
pub type Predicate = Arc<dyn Fn(&Message) -> bool + Send + Sync>;

#[derive(Clone)]
enum Rule {
    TextEquals(String),
    TextPattern(Regex),
    SenderName(String),
    SenderPattern(Regex),
    ChannelName(String),
    ChannelPattern(Regex),
    /// Sent to this channel, or privately by a user.
    ChannelOrQuery(String),
    Notice(bool),
    Custom(Predicate),
}

impl Rule {
    fn apply(&self, msg: &Message, captures: &mut Captures) -> bool {
        match self {
            Self::TextEquals(text) => msg.text == *text,
            Self::TextPattern(re) => captures.absorb(re, &msg.text),
            Self::SenderName(name) => msg.sender.as_ref().is_some_and(|s| s.name() == name),
            Self::SenderPattern(re) => msg
                .sender
                .as_ref()
                .is_some_and(|s| captures.absorb(re, s.name())),
            Self::ChannelName(name) => msg.channel().is_some_and(|c| c.name() == name),
            Self::ChannelPattern(re) => msg
                .channel()
                .is_some_and(|c| captures.absorb(re, c.name())),
            Self::ChannelOrQuery(name) => match &msg.recipient {
                Recipient::Channel(channel) => channel.name() == name,
                Recipient::User(_) => msg.sender.is_some(),
            },
            Self::Notice(notice) => msg.notice == *notice,
            Self::Custom(predicate) => predicate(msg),
        }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TextEquals(s) => write!(f, "text == {s:?}"),
            Self::TextPattern(re) => write!(f, "text ~ /{re}/"),
            Self::SenderName(s) => write!(f, "sender == {s:?}"),
            Self::SenderPattern(re) => write!(f, "sender ~ /{re}/"),
            Self::ChannelName(s) => write!(f, "channel == {s:?}"),
            Self::ChannelPattern(re) => write!(f, "channel ~ /{re}/"),
            Self::ChannelOrQuery(s) => write!(f, "channel == {s:?} or query"),
            Self::Notice(b) => write!(f, "notice == {b}"),
            Self::Custom(_) => f.write_str("custom"),
        }
    }
}

/// Decides whether a message handler fires.
///
/// Build one with [`Matcher::builder`]; [`Matcher::any`] accepts every
/// message.
#[derive(Clone, Debug, Default)]
pub struct Matcher {
    rules: Vec<Rule>,
}

impl Matcher {
    /// A matcher without rules.
    pub fn any() -> Self {
        Self::default()
    }

    /// Start an empty [`MatcherBuilder`].
    pub fn builder() -> MatcherBuilder {
        MatcherBuilder::default()
    }

    /// Evaluate every rule in order. `None` means no match.
    pub fn matches(&self, msg: &Message) -> Option<Captures> {
        let mut captures = Captures::default();
        self.rules
            .iter()
            .all(|rule| rule.apply(msg, &mut captures))
            .then_some(captures)
    }

    /// Restrict to `channel`, or to `channel` plus private messages.
    pub(crate) fn scoped_to(mut self, channel: &str, accept_query: bool) -> Self {
        let rule = if accept_query {
            Rule::ChannelOrQuery(channel.to_string())
        } else {
            Rule::ChannelName(channel.to_string())
        };
        self.rules.push(rule);
        self
    }
}

#[derive(Debug)]
enum Filter {
    Literal(String),
    Pattern(String),
}

/// Collects filters and validates them in [`build`](Self::build).
///
/// Each of text, sender and channel takes at most one filter; giving two
/// is a [`ClientError::ConflictingFilter`]. Patterns are compiled at build
/// time, so a bad one surfaces as [`ClientError::InvalidPattern`] before
/// anything is registered.
#[derive(Default)]
pub struct MatcherBuilder {
    text: Option<Filter>,
    sender: Option<Filter>,
    channel: Option<Filter>,
    notice: Option<bool>,
    custom: Vec<Predicate>,
    conflict: Option<&'static str>,
}

impl MatcherBuilder {
    fn set(slot: &mut Option<Filter>, conflict: &mut Option<&'static str>, field: &'static str, filter: Filter) {
        if slot.is_some() {
            conflict.get_or_insert(field);
        }
        *slot = Some(filter);
    }

    /// Text equals `text` exactly.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        Self::set(&mut self.text, &mut self.conflict, "text", Filter::Literal(text.into()));
        self
    }

    /// Text matches `pattern` anywhere; named groups are captured.
    pub fn text_pattern(mut self, pattern: impl Into<String>) -> Self {
        Self::set(&mut self.text, &mut self.conflict, "text", Filter::Pattern(pattern.into()));
        self
    }

    /// Sent by `nick`. Server messages never match.
    pub fn sender(mut self, nick: impl Into<String>) -> Self {
        Self::set(&mut self.sender, &mut self.conflict, "sender", Filter::Literal(nick.into()));
        self
    }

    pub fn sender_user(self, user: &User) -> Self {
        self.sender(user.name())
    }

    /// Sender nick matches `pattern`; named groups are captured.
    pub fn sender_pattern(mut self, pattern: impl Into<String>) -> Self {
        Self::set(&mut self.sender, &mut self.conflict, "sender", Filter::Pattern(pattern.into()));
        self
    }

    /// Sent to the channel named `name`. Private messages never match.
    pub fn channel(mut self, name: impl Into<String>) -> Self {
        Self::set(&mut self.channel, &mut self.conflict, "channel", Filter::Literal(name.into()));
        self
    }

    pub fn channel_is(self, channel: &Channel) -> Self {
        self.channel(channel.name())
    }

    /// Channel name matches `pattern`; named groups are captured.
    pub fn channel_pattern(mut self, pattern: impl Into<String>) -> Self {
        Self::set(&mut self.channel, &mut self.conflict, "channel", Filter::Pattern(pattern.into()));
        self
    }

    /// Only NOTICEs with `true`, only PRIVMSGs with `false`.
    pub fn notice(mut self, notice: bool) -> Self {
        if self.notice.is_some() {
            self.conflict.get_or_insert("notice");
        }
        self.notice = Some(notice);
        self
    }

    /// Arbitrary predicate, evaluated after the built-in rules.
    pub fn custom<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Message) -> bool + Send + Sync + 'static,
    {
        self.custom.push(Arc::new(predicate));
        self
    }

    /// Validate the filters and compile every pattern.
    pub fn build(self) -> Result<Matcher> {
        if let Some(field) = self.conflict {
            return Err(ClientError::ConflictingFilter(field));
        }

        let mut rules = Vec::new();
        if let Some(filter) = self.text {
            rules.push(match filter {
                Filter::Literal(s) => Rule::TextEquals(s),
                Filter::Pattern(p) => Rule::TextPattern(compile(p)?),
            });
        }
        if let Some(filter) = self.sender {
            rules.push(match filter {
                Filter::Literal(s) => Rule::SenderName(s),
                Filter::Pattern(p) => Rule::SenderPattern(compile(p)?),
            });
        }
        if let Some(filter) = self.channel {
            rules.push(match filter {
                Filter::Literal(s) => Rule::ChannelName(s),
                Filter::Pattern(p) => Rule::ChannelPattern(compile(p)?),
            });
        }
        if let Some(notice) = self.notice {
            rules.push(Rule::Notice(notice));
        }
        rules.extend(self.custom.into_iter().map(Rule::Custom));

        Ok(Matcher { rules })
    }
}

fn compile(pattern: String) -> Result<Regex> {
    Regex::new(&pattern).map_err(|source| ClientError::InvalidPattern { pattern, source })
}
