//! Reactive Engine
//!
//! This module implements dependency tracking over plain data: observed
//! records and sequences, dependency nodes, watchers, and the scheduler that
//! batches watcher re-runs.
//!
//! # Concepts
//!
//! ## Observed containers
//!
//! A [`Record`] or [`Sequence`] becomes reactive once [`observe`]d. Every
//! record property then owns a [`Dep`], and every container owns one more
//! (through its [`Observer`]) for key additions, removals and sequence
//! mutations.
//!
//! ## Dependency nodes
//!
//! A [`Dep`] keeps the set of subscribers that read it. Reading a reactive
//! property while a subscriber is active (see [`ReactiveContext`]) registers
//! the subscriber; writing it notifies every subscriber.
//!
//! ## Watchers
//!
//! A [`Watcher`] evaluates a getter, remembers what it read, and re-runs when
//! any of it changes. Render watchers, user watchers and computed properties
//! are all watchers with different options.
//!
//! ## Scheduling
//!
//! Notified watchers are queued on the [`Scheduler`] and flushed once per
//! tick ([`Runtime::tick`]), in creation order.
//!
//! # Implementation Notes
//!
//! Everything here is single-threaded: handles are `Rc` based and the active
//! watcher stack, the scheduler queue and the runtime configuration live in
//! thread-locals.

mod context;
mod dep;
mod instance;
mod observer;
mod record;
mod runtime;
mod scheduler;
mod sequence;
mod subscriber;
mod traverse;
mod watcher;

pub use context::{untracked, ReactiveContext};
pub use dep::{Dep, DepId};
pub use instance::{Hook, Instance, InstanceOptions, MethodFn, WatchOptions, WeakInstance};
pub use observer::{delete_property, depend_array, observe, set_property, toggle_observing, Observer};
pub use record::Record;
pub use runtime::Runtime;
pub use scheduler::{FlushOutcome, Scheduler};
pub use sequence::{Sequence, MAX_HOLES};
pub use subscriber::{Subscriber, SubscriberId};
pub use traverse::traverse;
pub use watcher::{GetterFn, WatchCallback, WatchSource, Watcher, WatcherOptions};
