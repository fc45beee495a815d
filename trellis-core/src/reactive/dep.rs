//! Dependency Node
//!
//! A `Dep` is the observable end of a reactive property or container. It
//! keeps the list of subscribers that read it during their last evaluation
//! and notifies them when the value changes.
//!
//! # How Deps Work
//!
//! 1. A reactive getter calls [`Dep::depend`]. If a subscriber is evaluating,
//!    it is asked to record the dep ([`Subscriber::add_dep`]), and it calls
//!    back [`Dep::add_sub`] when the dep is new to it.
//!
//! 2. A reactive setter calls [`Dep::notify`], which snapshots the subscriber
//!    list and calls `update` on each entry.
//!
//! Subscribers are held weakly. A dropped watcher simply disappears from the
//! list the next time it is notified.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::trace;

use super::context::ReactiveContext;
use super::runtime::Runtime;
use super::{Subscriber, SubscriberId};

/// Unique identifier of a dependency node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DepId(u64);

fn next_dep_id() -> DepId {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    DepId(COUNTER.fetch_add(1, Ordering::Relaxed))
}

struct DepInner {
    id: DepId,
    subs: RefCell<Vec<(SubscriberId, Weak<dyn Subscriber>)>>,
}

/// A handle to a dependency node. Clones share the node.
#[derive(Clone)]
pub struct Dep(Rc<DepInner>);

impl Dep {
    pub fn new() -> Self {
        Self(Rc::new(DepInner {
            id: next_dep_id(),
            subs: RefCell::new(Vec::new()),
        }))
    }

    pub fn id(&self) -> DepId {
        self.0.id
    }

    /// Append a subscriber. Adding the same subscriber twice is a no-op.
    pub fn add_sub(&self, id: SubscriberId, sub: Weak<dyn Subscriber>) {
        let mut subs = self.0.subs.borrow_mut();
        if !subs.iter().any(|(existing, _)| *existing == id) {
            subs.push((id, sub));
        }
    }

    pub fn remove_sub(&self, id: SubscriberId) {
        self.0.subs.borrow_mut().retain(|(existing, _)| *existing != id);
    }

    /// Register this dep with the currently evaluating subscriber, if any.
    pub fn depend(&self) {
        if let Some(target) = ReactiveContext::current() {
            target.add_dep(self);
        }
    }

    /// Notify every subscriber.
    ///
    /// The list is snapshotted first, so subscribers added or removed while
    /// notifying do not affect this round. Without batching the snapshot is
    /// sorted by creation order, since the scheduler will not sort it.
    pub fn notify(&self) {
        let mut snapshot: Vec<Rc<dyn Subscriber>> = {
            let mut subs = self.0.subs.borrow_mut();
            subs.retain(|(_, weak)| weak.strong_count() > 0);
            subs.iter().filter_map(|(_, weak)| weak.upgrade()).collect()
        };

        if !Runtime::config().async_mode {
            snapshot.sort_by_key(|sub| sub.id());
        }

        trace!(dep = self.0.id.0, subscribers = snapshot.len(), "notify");

        for sub in snapshot {
            sub.update();
        }
    }

    /// Ids of the live subscribers, in insertion order.
    pub fn subscriber_ids(&self) -> Vec<SubscriberId> {
        self.0
            .subs
            .borrow()
            .iter()
            .filter(|(_, weak)| weak.strong_count() > 0)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscriber_ids().len()
    }
}

impl Default for Dep {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Dep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dep")
            .field("id", &self.0.id)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Recorder {
        id: SubscriberId,
        this: Weak<Recorder>,
        updates: Cell<u32>,
        log: Rc<RefCell<Vec<SubscriberId>>>,
    }

    impl Recorder {
        fn new(log: &Rc<RefCell<Vec<SubscriberId>>>) -> Rc<Self> {
            Rc::new_cyclic(|this| Recorder {
                id: SubscriberId::new(),
                this: this.clone(),
                updates: Cell::new(0),
                log: log.clone(),
            })
        }
    }

    impl Subscriber for Recorder {
        fn id(&self) -> SubscriberId {
            self.id
        }

        fn add_dep(&self, dep: &Dep) {
            let weak: Weak<dyn Subscriber> = self.this.clone();
            dep.add_sub(self.id, weak);
        }

        fn update(&self) {
            self.updates.set(self.updates.get() + 1);
            self.log.borrow_mut().push(self.id);
        }
    }

    fn weak_of(rec: &Rc<Recorder>) -> Weak<dyn Subscriber> {
        let rc: Rc<dyn Subscriber> = rec.clone();
        Rc::downgrade(&rc)
    }

    #[test]
    fn depend_registers_the_active_subscriber() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let rec = Recorder::new(&log);
        let dep = Dep::new();

        dep.depend();
        assert_eq!(dep.subscriber_count(), 0);

        {
            let target: Rc<dyn Subscriber> = rec.clone();
            let _ctx = ReactiveContext::enter(Some(target));
            dep.depend();
            dep.depend();
        }
        assert_eq!(dep.subscriber_ids(), vec![rec.id]);
    }

    #[test]
    fn notify_updates_each_subscriber_once() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let a = Recorder::new(&log);
        let b = Recorder::new(&log);
        let dep = Dep::new();
        dep.add_sub(a.id, weak_of(&a));
        dep.add_sub(b.id, weak_of(&b));
        dep.add_sub(a.id, weak_of(&a));

        dep.notify();

        assert_eq!(a.updates.get(), 1);
        assert_eq!(b.updates.get(), 1);
    }

    #[test]
    fn remove_sub_stops_notifications() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let a = Recorder::new(&log);
        let dep = Dep::new();
        dep.add_sub(a.id, weak_of(&a));
        dep.remove_sub(a.id);

        dep.notify();
        assert_eq!(a.updates.get(), 0);
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let dep = Dep::new();
        {
            let a = Recorder::new(&log);
            dep.add_sub(a.id, weak_of(&a));
            assert_eq!(dep.subscriber_count(), 1);
        }
        dep.notify();
        assert_eq!(dep.subscriber_count(), 0);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn sync_mode_notifies_in_creation_order() {
        Runtime::configure(crate::config::ReactiveConfig {
            async_mode: false,
            ..Default::default()
        });

        let log = Rc::new(RefCell::new(Vec::new()));
        let first = Recorder::new(&log);
        let second = Recorder::new(&log);
        let dep = Dep::new();
        dep.add_sub(second.id, weak_of(&second));
        dep.add_sub(first.id, weak_of(&first));

        dep.notify();
        assert_eq!(*log.borrow(), vec![first.id, second.id]);

        Runtime::configure(Default::default());
    }
}
