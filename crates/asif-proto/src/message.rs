//! Raw line parsing and building.
//!
//! A line has the shape `[:prefix ]param1 param2 ... [:trailing]`. The
//! command is the first positional parameter. Parsing is deliberately
//! lenient: anything that has at least a command token decodes.

use std::fmt::{self, Display, Formatter};

/// One decoded protocol line.
///
/// Produced by [`RawMessage::parse`] and never mutated by the client after
/// that. `params[0]` is the command token.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct RawMessage {
    /// Origin annotation without the leading `:`.
    pub prefix: Option<String>,
    /// Positional tokens, command first.
    pub params: Vec<String>,
    /// Final parameter introduced by ` :`; may contain spaces.
    pub trailing: Option<String>,
}

impl RawMessage {
    /// Create a message from positional tokens.
    pub fn new<I, S>(params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefix: None,
            params: params.into_iter().map(Into::into).collect(),
            trailing: None,
        }
    }

    /// Set the prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Set the trailing parameter.
    #[must_use]
    pub fn with_trailing(mut self, trailing: impl Into<String>) -> Self {
        self.trailing = Some(trailing.into());
        self
    }

    /// Parse one line.
    ///
    /// Returns `None` for an empty line or a line without a command token.
    /// A trailing `\r\n` is ignored.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            return None;
        }

        let (prefix, rest) = match line.strip_prefix(':') {
            Some(stripped) => {
                let (prefix, rest) = stripped.split_once(' ')?;
                (Some(prefix.to_owned()), rest)
            }
            None => (None, line),
        };

        let (head, trailing) = match rest.split_once(" :") {
            Some((head, trailing)) => (head, Some(trailing.to_owned())),
            None => (rest, None),
        };

        let params: Vec<String> = head.split_whitespace().map(str::to_owned).collect();
        if params.is_empty() {
            return None;
        }

        Some(Self {
            prefix,
            params,
            trailing,
        })
    }

    /// The command token (`params[0]`).
    pub fn command(&self) -> &str {
        self.params.first().map(String::as_str).unwrap_or_default()
    }

    /// Positional parameter `index`, counting the command as 0.
    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    /// Trailing text, or the positional parameter at `index` when the
    /// sender omitted the ` :` separator.
    pub fn trailing_or_param(&self, index: usize) -> Option<&str> {
        self.trailing.as_deref().or_else(|| self.param(index))
    }
}

impl Display for RawMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(ref prefix) = self.prefix {
            write!(f, ":{} ", prefix)?;
        }

        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", param)?;
        }

        if let Some(ref trailing) = self.trailing {
            write!(f, " :{}", trailing)?;
        }

        Ok(())
    }
}

/// Build one outbound line (without the line terminator).
///
/// The trailing text is neither escaped nor length-checked; callers must
/// not pass embedded line terminators.
pub fn build<S: AsRef<str>>(params: &[S], prefix: Option<&str>, trailing: Option<&str>) -> String {
    let mut line = String::new();
    if let Some(prefix) = prefix {
        line.push(':');
        line.push_str(prefix);
        line.push(' ');
    }

    for (i, param) in params.iter().enumerate() {
        if i > 0 {
            line.push(' ');
        }
        line.push_str(param.as_ref());
    }

    if let Some(trailing) = trailing {
        line.push_str(" :");
        line.push_str(trailing);
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_user_privmsg() {
        let msg = RawMessage::parse(":nick!user@host PRIVMSG #chan :hello world").unwrap();
        assert_eq!(msg.prefix.as_deref(), Some("nick!user@host"));
        assert_eq!(msg.params, vec!["PRIVMSG", "#chan"]);
        assert_eq!(msg.trailing.as_deref(), Some("hello world"));
        assert_eq!(msg.command(), "PRIVMSG");
    }

    #[test]
    fn parses_ping_without_prefix() {
        let msg = RawMessage::parse("PING :abc").unwrap();
        assert_eq!(msg.prefix, None);
        assert_eq!(msg.params, vec!["PING"]);
        assert_eq!(msg.trailing.as_deref(), Some("abc"));
    }

    #[test]
    fn parses_without_trailing() {
        let msg = RawMessage::parse(":irc.example.net 005 me CHANTYPES=# PREFIX=(ov)@+").unwrap();
        assert_eq!(msg.trailing, None);
        assert_eq!(msg.params, vec!["005", "me", "CHANTYPES=#", "PREFIX=(ov)@+"]);
    }

    #[test]
    fn keeps_colons_inside_trailing() {
        let msg = RawMessage::parse("PRIVMSG #c :a :b: c").unwrap();
        assert_eq!(msg.trailing.as_deref(), Some("a :b: c"));
    }

    #[test]
    fn collapses_repeated_spaces() {
        let msg = RawMessage::parse("MODE   #c  +o   nick").unwrap();
        assert_eq!(msg.params, vec!["MODE", "#c", "+o", "nick"]);
    }

    #[test]
    fn strips_line_terminator() {
        let msg = RawMessage::parse("PING :x\r\n").unwrap();
        assert_eq!(msg.trailing.as_deref(), Some("x"));
    }

    #[test]
    fn rejects_empty_and_commandless_lines() {
        assert_eq!(RawMessage::parse(""), None);
        assert_eq!(RawMessage::parse("\r\n"), None);
        assert_eq!(RawMessage::parse(":prefix.only"), None);
        assert_eq!(RawMessage::parse(":server   "), None);
    }

    #[test]
    fn builds_full_line() {
        let line = build(&["PRIVMSG", "#chan"], Some("me!u@h"), Some("hi there"));
        assert_eq!(line, ":me!u@h PRIVMSG #chan :hi there");
    }

    #[test]
    fn builds_empty_trailing() {
        assert_eq!(build(&["TOPIC", "#c"], None, Some("")), "TOPIC #c :");
    }

    #[test]
    fn display_matches_build() {
        let msg = RawMessage::new(["USER", "bot", "0", "*"]).with_trailing("The Bot");
        assert_eq!(msg.to_string(), build(&["USER", "bot", "0", "*"], None, Some("The Bot")));
    }

    #[test]
    fn trailing_or_param_falls_back() {
        let msg = RawMessage::parse(":a!b@c JOIN #rust").unwrap();
        assert_eq!(msg.trailing_or_param(1), Some("#rust"));
        let msg = RawMessage::parse(":a!b@c JOIN :#rust").unwrap();
        assert_eq!(msg.trailing_or_param(1), Some("#rust"));
    }
}
