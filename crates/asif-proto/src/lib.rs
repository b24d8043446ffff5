//! # asif-proto
//!
//! Wire-level building blocks for the `asif` IRC client.
//!
//! ## Features
//!
//! - Lenient line parsing into [`RawMessage`] (prefix, params, trailing)
//! - Line building for outbound traffic
//! - `nick[!user][@host]` prefix splitting
//! - ISUPPORT (`RPL_ISUPPORT`) token parsing
//! - Optional Tokio line framing ([`LineCodec`])
//!
//! ## Quick Start
//!
//! ```rust
//! use asif_proto::RawMessage;
//!
//! let msg = RawMessage::parse(":nick!user@host PRIVMSG #chan :hello world").unwrap();
//! assert_eq!(msg.command(), "PRIVMSG");
//! assert_eq!(msg.trailing.as_deref(), Some("hello world"));
//!
//! let line = asif_proto::build(&["PRIVMSG", "#chan"], None, Some("hi"));
//! assert_eq!(line, "PRIVMSG #chan :hi");
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
pub mod isupport;
#[cfg(feature = "tokio")]
pub mod line;
pub mod message;
pub mod prefix;
pub mod tokens;

pub use self::error::{ProtocolError, Result};
pub use self::isupport::{Isupport, IsupportEntry, PrefixSpec};
#[cfg(feature = "tokio")]
pub use self::line::LineCodec;
pub use self::message::{build, RawMessage};
pub use self::prefix::{is_user_prefix, split_prefix};
