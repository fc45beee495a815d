//! Reactive Runtime
//!
//! Per-thread coordination state that does not belong to any single watcher:
//!
//! - the active [`ReactiveConfig`];
//! - the error channel that user-watcher failures are routed to;
//! - the warning channel for non-fatal diagnostics;
//! - the tick queue that batched flushes wait on.
//!
//! # Ticks
//!
//! There is no ambient event loop, so the host decides where a tick ends.
//! [`Runtime::next_tick`] queues a callback and [`Runtime::tick`] drains the
//! queue, including callbacks queued while draining. The scheduler uses the
//! same queue for its flush.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use tracing::{error, warn};

use crate::config::ReactiveConfig;
use crate::error::ReactiveError;

type ErrorHandler = Rc<dyn Fn(&ReactiveError)>;
type WarnHandler = Rc<dyn Fn(&str)>;

#[derive(Default)]
struct RuntimeState {
    config: ReactiveConfig,
    error_handler: Option<ErrorHandler>,
    warn_handler: Option<WarnHandler>,
    ticks: VecDeque<Box<dyn FnOnce()>>,
}

thread_local! {
    static RUNTIME: RefCell<RuntimeState> = RefCell::new(RuntimeState::default());
}

/// The per-thread reactive runtime.
pub struct Runtime;

impl Runtime {
    /// Replace the active configuration for this thread.
    pub fn configure(config: ReactiveConfig) {
        RUNTIME.with(|rt| rt.borrow_mut().config = config);
    }

    /// The active configuration.
    pub fn config() -> ReactiveConfig {
        RUNTIME.with(|rt| rt.borrow().config.clone())
    }

    /// Install the handler that receives routed errors.
    pub fn set_error_handler<F>(handler: F)
    where
        F: Fn(&ReactiveError) + 'static,
    {
        RUNTIME.with(|rt| rt.borrow_mut().error_handler = Some(Rc::new(handler)));
    }

    /// Install the handler that receives non-fatal diagnostics.
    pub fn set_warn_handler<F>(handler: F)
    where
        F: Fn(&str) + 'static,
    {
        RUNTIME.with(|rt| rt.borrow_mut().warn_handler = Some(Rc::new(handler)));
    }

    /// Remove both installed handlers.
    pub fn clear_handlers() {
        RUNTIME.with(|rt| {
            let mut rt = rt.borrow_mut();
            rt.error_handler = None;
            rt.warn_handler = None;
        });
    }

    /// Report an error that must not abort the caller.
    pub fn handle_error(err: ReactiveError) {
        error!(error = %err, "reactive error");
        let handler = RUNTIME.with(|rt| rt.borrow().error_handler.clone());
        if let Some(handler) = handler {
            handler(&err);
        }
    }

    /// Report a non-fatal diagnostic. Silent in production mode.
    pub fn warn(message: &str) {
        let (production, handler) = RUNTIME.with(|rt| {
            let rt = rt.borrow();
            (rt.config.production, rt.warn_handler.clone())
        });
        if production {
            return;
        }
        warn!("{message}");
        if let Some(handler) = handler {
            handler(message);
        }
    }

    /// Queue a callback for the next tick.
    pub fn next_tick<F>(callback: F)
    where
        F: FnOnce() + 'static,
    {
        RUNTIME.with(|rt| rt.borrow_mut().ticks.push_back(Box::new(callback)));
    }

    /// Number of callbacks waiting for the next tick.
    pub fn pending_ticks() -> usize {
        RUNTIME.with(|rt| rt.borrow().ticks.len())
    }

    /// Run every queued callback. Returns how many ran.
    pub fn tick() -> usize {
        let mut ran = 0;
        loop {
            let next = RUNTIME.with(|rt| rt.borrow_mut().ticks.pop_front());
            match next {
                Some(callback) => {
                    callback();
                    ran += 1;
                }
                None => return ran,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn configure_replaces_thread_config() {
        Runtime::configure(ReactiveConfig {
            max_update_count: 7,
            ..Default::default()
        });
        assert_eq!(Runtime::config().max_update_count, 7);
        Runtime::configure(ReactiveConfig::default());
        assert_eq!(Runtime::config().max_update_count, 100);
    }

    #[test]
    fn tick_drains_callbacks_queued_while_draining() {
        let count = Rc::new(Cell::new(0));
        let outer = count.clone();
        Runtime::next_tick(move || {
            outer.set(outer.get() + 1);
            let inner = outer.clone();
            Runtime::next_tick(move || inner.set(inner.get() + 1));
        });

        assert_eq!(Runtime::pending_ticks(), 1);
        assert_eq!(Runtime::tick(), 2);
        assert_eq!(count.get(), 2);
        assert_eq!(Runtime::pending_ticks(), 0);
    }

    #[test]
    fn errors_reach_the_installed_handler() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        Runtime::set_error_handler(move |err| sink.borrow_mut().push(err.to_string()));

        Runtime::handle_error(ReactiveError::MissingRenderProgram("app".into()));

        assert_eq!(seen.borrow().len(), 1);
        assert!(seen.borrow()[0].contains("app"));
        Runtime::clear_handlers();
    }

    #[test]
    fn production_mode_silences_warnings() {
        let count = Rc::new(Cell::new(0));
        let sink = count.clone();
        Runtime::set_warn_handler(move |_| sink.set(sink.get() + 1));

        Runtime::warn("first");
        Runtime::configure(ReactiveConfig {
            production: true,
            ..Default::default()
        });
        Runtime::warn("second");

        assert_eq!(count.get(), 1);
        Runtime::configure(ReactiveConfig::default());
        Runtime::clear_handlers();
    }
}
