//! Incoming chat messages.

use crate::client::Client;
use crate::error::{ClientError, Result};

use super::{Channel, User};

/// Where a message was sent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Recipient {
    User(User),
    Channel(Channel),
}

impl Recipient {
    /// Nick or channel name of the recipient.
    pub fn name(&self) -> &str {
        match self {
            Self::User(user) => user.name(),
            Self::Channel(channel) => channel.name(),
        }
    }
}

/// One PRIVMSG or NOTICE.
///
/// `sender` is `None` when the line came from a server rather than a user.
#[derive(Clone, Debug)]
pub struct Message {
    pub sender: Option<User>,
    pub recipient: Recipient,
    pub text: String,
    pub notice: bool,
    pub(crate) client: Client,
}

impl Message {
    /// The channel the message was sent to, if any.
    pub fn channel(&self) -> Option<&Channel> {
        match &self.recipient {
            Recipient::Channel(channel) => Some(channel),
            Recipient::User(_) => None,
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Answer where the message came from.
    ///
    /// In a channel the reply goes to the channel, addressed to the sender
    /// as `"<sender>: <text>"`. Anywhere else it goes back to the sender.
    /// `notice` defaults to the flag of this message.
    pub fn reply(&self, text: &str, notice: Option<bool>) -> Result<()> {
        let notice = notice.unwrap_or(self.notice);
        match (&self.recipient, &self.sender) {
            (Recipient::Channel(channel), Some(sender)) => {
                channel.message(&format!("{}: {}", sender.name(), text), notice)
            }
            (Recipient::Channel(channel), None) => channel.message(text, notice),
            (Recipient::User(_), Some(sender)) => sender.message(text, notice),
            (Recipient::User(_), None) => Err(ClientError::NoReplyTarget),
        }
    }
}
