//! Conversation state.
//!
//! [`Roster`] is the single source of truth, owned by the client and
//! mutated only by the dispatch loop. [`User`], [`Channel`] and [`Message`]
//! are cheap handles given to application code; they read the roster on
//! demand and send through the client.

mod channel;
mod message;
pub mod roster;
mod user;

pub use channel::Channel;
pub use message::{Message, Recipient};
pub use roster::Roster;
pub use user::User;
