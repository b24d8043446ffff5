//! Ordered handler registries.
//!
//! Every registry is a `Vec` kept in registration order, which is also
//! dispatch order. Registries live inside the dispatch loop and are only
//! mutated between lines, never while one is being iterated.

use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide handler id counter.
///
/// Ids are unique across clients, so a module can hand out an id before it
/// knows which client it will be attached to.
static NEXT_HANDLER_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one registered handler, used to remove it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

impl HandlerId {
    pub(crate) fn next() -> Self {
        Self(NEXT_HANDLER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for HandlerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which registry a handler lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    Command,
    Message,
    Join,
    Connected,
    Disconnected,
}

impl HandlerKind {
    /// Label used in log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Command => "command",
            Self::Message => "message",
            Self::Join => "join",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
        }
    }
}

/// Number of handlers currently registered, per registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub command: usize,
    pub message: usize,
    pub join: usize,
    pub connected: usize,
    pub disconnected: usize,
}

/// One ordered registry.
pub(crate) struct Registry<E> {
    entries: Vec<(HandlerId, E)>,
}

impl<E> Registry<E> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn insert(&mut self, id: HandlerId, entry: E) {
        self.entries.push((id, entry));
    }

    /// Remove `id`. Removing an unknown id is a no-op.
    pub fn remove(&mut self, id: HandlerId) -> bool {
        match self.entries.iter().position(|(i, _)| *i == id) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (HandlerId, &E)> {
        self.entries.iter().map(|(id, e)| (*id, e))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (HandlerId, &mut E)> {
        self.entries.iter_mut().map(|(id, e)| (*id, e))
    }
}

impl<E> Default for Registry<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let a = HandlerId::next();
        let b = HandlerId::next();
        assert_ne!(a, b);
    }

    #[test]
    fn keeps_registration_order() {
        let mut registry = Registry::new();
        let ids: Vec<_> = (0..3).map(|_| HandlerId::next()).collect();
        for (n, id) in ids.iter().enumerate() {
            registry.insert(*id, n);
        }
        assert!(registry.remove(ids[1]));
        assert!(!registry.remove(ids[1]));

        let seen: Vec<_> = registry.iter().map(|(_, n)| *n).collect();
        assert_eq!(seen, vec![0, 2]);
        assert_eq!(registry.len(), 2);
    }
}
