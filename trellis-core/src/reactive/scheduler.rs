//! Update Scheduler
//!
//! The scheduler batches watcher re-runs. A notified watcher is queued once
//! per flush, and the flush runs on the next tick (or inline when batching is
//! disabled).
//!
//! # Algorithm
//!
//! 1. `queue_watcher` drops duplicates by id. While a flush is running, a new
//!    watcher is inserted after the current position at its id-sorted place,
//!    so it still runs in this flush.
//! 2. `flush` sorts the queue by id (creation order): parents before children,
//!    user watchers before their instance's render watcher.
//! 3. For each watcher: run its `before` hook, clear its dedup entry, run it.
//!    A watcher that re-queued itself more than the configured limit aborts
//!    the flush with [`ReactiveError::InfiniteUpdateLoop`].
//! 4. Reset the queue, the dedup set and the circular counters, then call
//!    `updated` hooks in reverse queue order.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use super::runtime::Runtime;
use super::watcher::Watcher;
use super::SubscriberId;
use crate::error::ReactiveError;

#[derive(Default)]
struct SchedulerState {
    queue: Vec<Watcher>,
    has: HashSet<SubscriberId>,
    circular: HashMap<SubscriberId, u32>,
    waiting: bool,
    flushing: bool,
    index: usize,
}

thread_local! {
    static STATE: RefCell<SchedulerState> = RefCell::new(SchedulerState::default());
}

/// What one flush did.
#[derive(Debug, Default)]
pub struct FlushOutcome {
    /// Number of watcher runs.
    pub ran: usize,
    /// Errors returned by internal watchers, plus an infinite-loop error when
    /// the flush was aborted.
    pub errors: Vec<ReactiveError>,
}

impl FlushOutcome {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// The per-thread watcher queue.
pub struct Scheduler;

impl Scheduler {
    /// Queue a watcher for the next flush. Already queued watchers are
    /// skipped.
    pub fn queue_watcher(watcher: Watcher) {
        let id = watcher.id();
        let schedule_flush = STATE.with(|state| {
            let mut state = state.borrow_mut();
            if !state.has.insert(id) {
                return false;
            }

            if !state.flushing {
                state.queue.push(watcher);
            } else {
                let mut at = state.queue.len();
                while at > state.index + 1 && state.queue[at - 1].id() > id {
                    at -= 1;
                }
                state.queue.insert(at, watcher);
            }

            if state.waiting {
                false
            } else {
                state.waiting = true;
                true
            }
        });

        if !schedule_flush {
            return;
        }
        if Runtime::config().async_mode {
            Runtime::next_tick(|| report(Scheduler::flush()));
        } else {
            report(Scheduler::flush());
        }
    }

    /// Run every queued watcher.
    pub fn flush() -> FlushOutcome {
        let limit = Runtime::config().max_update_count;
        let queued = STATE.with(|state| {
            let mut state = state.borrow_mut();
            state.flushing = true;
            state.queue.sort_by_key(Watcher::id);
            state.queue.len()
        });
        debug!(queued, "flush start");

        let mut outcome = FlushOutcome::default();
        let mut index = 0;
        loop {
            let next = STATE.with(|state| {
                let mut state = state.borrow_mut();
                state.index = index;
                state.queue.get(index).cloned()
            });
            let Some(watcher) = next else { break };
            let id = watcher.id();

            watcher.run_before();
            STATE.with(|state| state.borrow_mut().has.remove(&id));
            if let Err(err) = watcher.run() {
                outcome.errors.push(err);
            }
            outcome.ran += 1;

            let overflowed = STATE.with(|state| {
                let mut state = state.borrow_mut();
                if !state.has.contains(&id) {
                    return false;
                }
                let count = state.circular.entry(id).or_insert(0);
                *count += 1;
                *count > limit
            });
            if overflowed {
                outcome.errors.push(ReactiveError::InfiniteUpdateLoop {
                    expression: watcher.expression().to_string(),
                    limit,
                });
                break;
            }
            index += 1;
        }

        let queue = STATE.with(|state| {
            let mut state = state.borrow_mut();
            let queue = std::mem::take(&mut state.queue);
            state.has.clear();
            state.circular.clear();
            state.waiting = false;
            state.flushing = false;
            state.index = 0;
            queue
        });

        call_updated_hooks(&queue);
        debug!(ran = outcome.ran, errors = outcome.errors.len(), "flush done");
        outcome
    }

    /// Number of watchers waiting in the queue.
    pub fn pending() -> usize {
        STATE.with(|state| state.borrow().queue.len())
    }

    pub fn is_flushing() -> bool {
        STATE.with(|state| state.borrow().flushing)
    }
}

fn report(outcome: FlushOutcome) {
    for err in outcome.errors {
        if matches!(err, ReactiveError::InfiniteUpdateLoop { .. }) {
            warn!(error = %err, "flush aborted");
        }
        Runtime::handle_error(err);
    }
}

fn call_updated_hooks(queue: &[Watcher]) {
    for watcher in queue.iter().rev() {
        if !watcher.is_render_watcher() {
            continue;
        }
        let Some(vm) = watcher.owner() else { continue };
        let is_current = vm.render_watcher().is_some_and(|w| w.id() == watcher.id());
        if is_current && vm.is_mounted() && !vm.is_destroyed() {
            vm.call_updated_hooks();
        }
    }
}
