//! Observer
//!
//! [`observe`] turns a plain container into an observed one: it attaches an
//! [`Observer`] (which owns the container-level [`Dep`]) and converts every
//! property of a record, or every element of a sequence, recursively.
//!
//! Adding and removing keys cannot be intercepted, so both go through the
//! explicit [`set_property`] and [`delete_property`] functions, which notify
//! the container dep.

use std::cell::Cell;
use std::rc::Rc;

use tracing::trace;

use super::runtime::Runtime;
use super::{Dep, Sequence};
use crate::value::{parse_index, Value};

/// Attached to every observed container.
#[derive(Debug)]
pub struct Observer {
    dep: Dep,
    root_count: Cell<usize>,
}

impl Observer {
    fn new() -> Self {
        Self {
            dep: Dep::new(),
            root_count: Cell::new(0),
        }
    }

    /// The container-level dependency node, notified on key addition and
    /// removal and on sequence mutation.
    pub fn dep(&self) -> &Dep {
        &self.dep
    }

    /// How many instances use the container as their root data.
    pub fn root_count(&self) -> usize {
        self.root_count.get()
    }

    pub(crate) fn release_root(&self) {
        self.root_count.set(self.root_count.get().saturating_sub(1));
    }
}

thread_local! {
    static SHOULD_OBSERVE: Cell<bool> = const { Cell::new(true) };
}

/// Globally enable or disable creation of new observers on this thread.
pub fn toggle_observing(enabled: bool) {
    SHOULD_OBSERVE.with(|flag| flag.set(enabled));
}

fn should_observe() -> bool {
    SHOULD_OBSERVE.with(Cell::get)
}

/// Observe `value`, returning its observer.
///
/// Primitives, callables and render nodes are never observed. An already
/// observed container returns its existing observer. Frozen containers are
/// skipped. `as_root` marks the container as some instance's root data.
pub fn observe(value: &Value, as_root: bool) -> Option<Rc<Observer>> {
    let observer = match value {
        Value::Record(record) => match record.observer() {
            Some(existing) => Some(existing),
            None if should_observe() && record.is_extensible() => {
                let observer = Rc::new(Observer::new());
                record.attach_observer(observer.clone());
                record.walk();
                trace!(keys = record.len(), "observed record");
                Some(observer)
            }
            None => None,
        },
        Value::Sequence(seq) => match seq.observer() {
            Some(existing) => Some(existing),
            None if should_observe() && seq.is_extensible() => {
                let observer = Rc::new(Observer::new());
                seq.attach_observer(observer.clone());
                for item in seq.to_vec() {
                    observe(&item, false);
                }
                trace!(len = seq.len(), "observed sequence");
                Some(observer)
            }
            None => None,
        },
        _ => None,
    };

    if as_root {
        if let Some(observer) = &observer {
            observer.root_count.set(observer.root_count.get() + 1);
        }
    }
    observer
}

/// Depend on every observed element of `seq`, recursing into nested
/// sequences. Element reads are not intercepted, so a subscriber that reads
/// a sequence has to depend on its elements up front.
pub fn depend_array(seq: &Sequence) {
    for item in seq.to_vec() {
        match &item {
            Value::Record(record) => {
                if let Some(observer) = record.observer() {
                    observer.dep.depend();
                }
            }
            Value::Sequence(inner) => {
                if let Some(observer) = inner.observer() {
                    observer.dep.depend();
                }
                depend_array(inner);
            }
            _ => {}
        }
    }
}

/// Add or overwrite a property so that it is reactive, notifying the
/// container. Returns the written value.
///
/// Sequences accept a canonical index and write through `splice`. Root data
/// of an instance refuses new keys with a warning.
pub fn set_property(target: &Value, key: &str, value: Value) -> Value {
    match target {
        Value::Sequence(seq) => {
            if let Some(index) = parse_index(key) {
                seq.set(index, value.clone());
            } else {
                Runtime::warn(&format!(
                    "Cannot set non-index property \"{key}\" on a sequence"
                ));
            }
            value
        }
        Value::Record(record) => {
            if record.has(key) {
                record.set(key, value.clone());
                return value;
            }
            let Some(observer) = record.observer() else {
                record.set(key, value.clone());
                return value;
            };
            if observer.root_count() > 0 {
                Runtime::warn(&format!(
                    "Avoid adding reactive properties to an instance's root data at runtime - declare \"{key}\" upfront in the data option."
                ));
                return value;
            }
            record.define_reactive(key, value.clone());
            observer.dep.notify();
            value
        }
        other => {
            Runtime::warn(&format!(
                "Cannot set reactive property on undefined, null, or primitive value: {}",
                other.to_js_string()
            ));
            value
        }
    }
}

/// Remove a property, notifying the container when it was observed and the
/// key existed.
pub fn delete_property(target: &Value, key: &str) {
    match target {
        Value::Sequence(seq) => {
            if let Some(index) = parse_index(key) {
                if index < seq.len() {
                    seq.splice(index as isize, Some(1), Vec::new());
                }
            }
        }
        Value::Record(record) => {
            let observer = record.observer();
            if observer.as_ref().is_some_and(|ob| ob.root_count() > 0) {
                Runtime::warn(&format!(
                    "Avoid deleting properties on an instance's root data - just set \"{key}\" to null."
                ));
                return;
            }
            if record.remove_raw(key).is_none() {
                return;
            }
            if let Some(observer) = observer {
                observer.dep.notify();
            }
        }
        other => Runtime::warn(&format!(
            "Cannot delete reactive property on undefined, null, or primitive value: {}",
            other.to_js_string()
        )),
    }
}
