//! Protocol tokens consumed by the client core.
//!
//! Only the commands and numerics the handshake, roster and dispatch loop
//! react to live here; applications match anything else by literal.

/// Keepalive request.
pub const PING: &str = "PING";
/// Keepalive reply.
pub const PONG: &str = "PONG";
/// Connection password.
pub const PASS: &str = "PASS";
/// Nick registration or change.
pub const NICK: &str = "NICK";
/// User registration.
pub const USER: &str = "USER";
/// Channel join.
pub const JOIN: &str = "JOIN";
/// Channel part.
pub const PART: &str = "PART";
/// Channel kick.
pub const KICK: &str = "KICK";
/// Disconnect.
pub const QUIT: &str = "QUIT";
/// Chat message.
pub const PRIVMSG: &str = "PRIVMSG";
/// Chat notice.
pub const NOTICE: &str = "NOTICE";

/// Registration accepted; `params[1]` is the nick the server assigned.
pub const RPL_WELCOME: &str = "001";
/// Feature announcement (`KEY=VALUE` tokens).
pub const RPL_ISUPPORT: &str = "005";
/// Name-list entry for a channel.
pub const RPL_NAMREPLY: &str = "353";
/// End of a channel's name list.
pub const RPL_ENDOFNAMES: &str = "366";
/// End of the message of the day.
pub const RPL_ENDOFMOTD: &str = "376";
/// No message of the day configured.
pub const ERR_NOMOTD: &str = "422";
/// Requested nick is taken.
pub const ERR_NICKNAMEINUSE: &str = "433";

/// Name-list visibility markers: public, private, secret.
pub const NAMES_VISIBILITY: [&str; 3] = ["=", "*", "@"];
