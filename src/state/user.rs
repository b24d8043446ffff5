//! User handle.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::client::Client;
use crate::error::Result;

/// A user as seen when the handle was taken.
///
/// Two handles with the same nick are equal, whatever their hostmask.
#[derive(Clone)]
pub struct User {
    name: String,
    hostmask: Option<String>,
    client: Client,
}

impl User {
    pub(crate) fn new(name: String, hostmask: Option<String>, client: Client) -> Self {
        Self {
            name,
            hostmask,
            client,
        }
    }

    /// The user's nick.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `user@host`, if the server has shown it.
    pub fn hostmask(&self) -> Option<&str> {
        self.hostmask.as_deref()
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Send a PRIVMSG (or NOTICE) to this user.
    pub fn message(&self, text: &str, notice: bool) -> Result<()> {
        self.client.message(&self.name, text, notice)
    }
}

impl PartialEq for User {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for User {}

impl Hash for User {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("name", &self.name)
            .field("hostmask", &self.hostmask)
            .finish()
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::collections::HashSet;

    #[test]
    fn equality_ignores_hostmask() {
        let client = Client::new(Config::new("localhost", 6667, "me"));
        let a = User::new("alice".into(), Some("a@h".into()), client.clone());
        let b = User::new("alice".into(), None, client.clone());
        let c = User::new("bob".into(), None, client);

        assert_eq!(a, b);
        assert_ne!(a, c);
        let set: HashSet<_> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }
}
