//! Subscriber types for the reactive system.
//!
//! A Subscriber is any computation that depends on reactive values: render
//! watchers, user watchers and computed properties. Dependency nodes hold
//! subscribers weakly and call back into them through this trait.

use std::sync::atomic::{AtomicU64, Ordering};

use super::Dep;

/// Unique, creation-ordered identifier for a subscriber.
///
/// Ordering matters: the scheduler runs queued watchers in ascending id
/// order, so a parent (created first) always updates before its children and
/// user watchers run before the render watcher of the same instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// A computation that can be registered with a [`Dep`].
pub trait Subscriber {
    /// Stable identity, also the scheduling order.
    fn id(&self) -> SubscriberId;

    /// Record that the current evaluation read `dep`.
    fn add_dep(&self, dep: &Dep);

    /// Called when one of the dependencies changed.
    fn update(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscriber_ids_are_unique() {
        let id1 = SubscriberId::new();
        let id2 = SubscriberId::new();
        let id3 = SubscriberId::new();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn subscriber_ids_follow_creation_order() {
        let first = SubscriberId::new();
        let second = SubscriberId::new();
        assert!(first < second);
        assert!(first.as_u64() < second.as_u64());
    }
}
