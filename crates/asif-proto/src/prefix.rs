//! Message prefix helpers.
//!
//! A prefix is either a server name or a `nick[!user][@host]` mask.

/// Split a prefix (or bare nick) into the nick and its hostmask.
///
/// The nick runs up to the first `!` or `@`. The hostmask is the `user@host`
/// part after `!`; a mask without `!` carries no hostmask.
///
/// ```
/// use asif_proto::split_prefix;
///
/// assert_eq!(split_prefix("a!u@h"), ("a", Some("u@h")));
/// assert_eq!(split_prefix("a"), ("a", None));
/// ```
pub fn split_prefix(prefix: &str) -> (&str, Option<&str>) {
    let end = prefix.find(['!', '@']).unwrap_or(prefix.len());
    let nick = &prefix[..end];
    let hostmask = prefix[end..].strip_prefix('!').filter(|mask| !mask.is_empty());
    (nick, hostmask)
}

/// Whether a prefix names a user (`nick!user@host`) rather than a server.
pub fn is_user_prefix(prefix: &str) -> bool {
    prefix.contains('!') && prefix.contains('@')
}
