//! Reactive Context
//!
//! The reactive context tracks which computation is currently evaluating.
//! When an observed property is read, its dependency node asks the context for
//! the active subscriber and registers it.
//!
//! # Implementation
//!
//! We use a thread-local stack. Entering a context pushes an entry and returns
//! a guard; dropping the guard pops it, so push and pop stay paired even when
//! an evaluation returns early with `?` or unwinds.
//!
//! An entry may be empty (`None`): that suspends tracking for nested code,
//! for example while an `immediate` watcher callback runs.

use std::cell::RefCell;
use std::rc::Rc;

use super::Subscriber;

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<Option<Rc<dyn Subscriber>>>> = const { RefCell::new(Vec::new()) };
}

/// Guard that pops the context when dropped.
pub struct ReactiveContext {
    depth: usize,
}

impl ReactiveContext {
    /// Enter a new reactive context for the given subscriber.
    ///
    /// While this context is active, observed reads register `target` as a
    /// dependent. Passing `None` suspends tracking.
    pub fn enter(target: Option<Rc<dyn Subscriber>>) -> Self {
        let depth = CONTEXT_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            stack.push(target);
            stack.len()
        });
        Self { depth }
    }

    /// Check if a subscriber is currently collecting dependencies.
    pub fn is_active() -> bool {
        CONTEXT_STACK.with(|stack| matches!(stack.borrow().last(), Some(Some(_))))
    }

    /// The subscriber currently collecting dependencies, if any.
    pub fn current() -> Option<Rc<dyn Subscriber>> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().cloned().flatten())
    }

    /// Number of entries on the stack.
    pub fn depth() -> usize {
        CONTEXT_STACK.with(|stack| stack.borrow().len())
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        CONTEXT_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            debug_assert_eq!(
                stack.len(),
                self.depth,
                "ReactiveContext dropped out of order"
            );
            stack.pop();
        });
    }
}

/// Run `f` with dependency tracking suspended.
pub fn untracked<T>(f: impl FnOnce() -> T) -> T {
    let _ctx = ReactiveContext::enter(None);
    f()
}
