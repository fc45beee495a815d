//! Reactive Records
//!
//! A [`Record`] is an insertion-ordered string-keyed map. Once observed (see
//! [`observe`](super::observe)) every property it had at that moment carries
//! its own [`Dep`]:
//!
//! - reading the property with [`Record::get`] registers the active
//!   subscriber with that dep, with the observer dep of the child container,
//!   and with every observed element when the child is a sequence;
//! - writing it with [`Record::set`] skips same-value writes, observes the
//!   new value and notifies.
//!
//! Keys written after observation are plain: they are stored but not
//! reactive. Use [`set_property`](super::set_property) to add a reactive key.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use indexmap::IndexMap;

use super::observer::{depend_array, observe, Observer};
use super::Dep;
use crate::value::Value;

struct Slot {
    value: Value,
    dep: Option<Dep>,
}

struct RecordInner {
    props: RefCell<IndexMap<String, Slot>>,
    observer: RefCell<Option<Rc<Observer>>>,
    extensible: Cell<bool>,
}

/// A handle to a reactive record. Clones share the record.
#[derive(Clone)]
pub struct Record(Rc<RecordInner>);

impl Record {
    pub fn new() -> Self {
        Self(Rc::new(RecordInner {
            props: RefCell::new(IndexMap::new()),
            observer: RefCell::new(None),
            extensible: Cell::new(true),
        }))
    }

    /// Builder-style insert, for constructing literal records.
    pub fn with(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(&key.into(), value.into());
        self
    }

    /// Read a property, tracking it when a subscriber is evaluating.
    pub fn get(&self, key: &str) -> Value {
        let (value, dep) = {
            let props = self.0.props.borrow();
            match props.get(key) {
                Some(slot) => (slot.value.clone(), slot.dep.clone()),
                None => return Value::Undefined,
            }
        };

        if let Some(dep) = dep {
            dep.depend();
            if let Some(child) = observer_of(&value) {
                child.dep().depend();
                if let Value::Sequence(seq) = &value {
                    depend_array(seq);
                }
            }
        }
        value
    }

    /// Read a property without tracking.
    pub fn get_untracked(&self, key: &str) -> Value {
        self.0
            .props
            .borrow()
            .get(key)
            .map(|slot| slot.value.clone())
            .unwrap_or_default()
    }

    /// Write a property.
    ///
    /// Reactive properties ignore same-value writes, observe the new value
    /// and notify. Plain properties are overwritten silently. Unknown keys are
    /// added as plain properties unless the record is frozen.
    pub fn set(&self, key: &str, value: Value) {
        let dep = {
            let mut props = self.0.props.borrow_mut();
            match props.get_mut(key) {
                Some(slot) => match &slot.dep {
                    Some(dep) => {
                        if slot.value.same_value(&value) {
                            return;
                        }
                        slot.value = value.clone();
                        dep.clone()
                    }
                    None => {
                        slot.value = value;
                        return;
                    }
                },
                None => {
                    if self.0.extensible.get() {
                        props.insert(key.to_string(), Slot { value, dep: None });
                    }
                    return;
                }
            }
        };

        observe(&value, false);
        dep.notify();
    }

    /// Define (or redefine) `key` as a reactive property holding `value`.
    pub(crate) fn define_reactive(&self, key: &str, value: Value) {
        observe(&value, false);
        self.0.props.borrow_mut().insert(
            key.to_string(),
            Slot {
                value,
                dep: Some(Dep::new()),
            },
        );
    }

    /// Convert every plain property into a reactive one.
    pub(crate) fn walk(&self) {
        let plain: Vec<(String, Value)> = self
            .0
            .props
            .borrow()
            .iter()
            .filter(|(_, slot)| slot.dep.is_none())
            .map(|(key, slot)| (key.clone(), slot.value.clone()))
            .collect();

        for (key, value) in plain {
            observe(&value, false);
            if let Some(slot) = self.0.props.borrow_mut().get_mut(&key) {
                slot.dep.get_or_insert_with(Dep::new);
            }
        }
    }

    /// Remove a property without notifying. Returns the removed value.
    pub(crate) fn remove_raw(&self, key: &str) -> Option<Value> {
        self.0
            .props
            .borrow_mut()
            .shift_remove(key)
            .map(|slot| slot.value)
    }

    pub fn has(&self, key: &str) -> bool {
        self.0.props.borrow().contains_key(key)
    }

    /// Whether `key` exists and carries its own dependency node.
    pub fn is_reactive(&self, key: &str) -> bool {
        self.0
            .props
            .borrow()
            .get(key)
            .is_some_and(|slot| slot.dep.is_some())
    }

    /// The dependency node of a reactive property.
    pub fn dep_of(&self, key: &str) -> Option<Dep> {
        self.0.props.borrow().get(key).and_then(|slot| slot.dep.clone())
    }

    /// Own keys in insertion order. Enumerating keys is not tracked.
    pub fn keys(&self) -> Vec<String> {
        self.0.props.borrow().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.0.props.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Prevent new keys and observation, like `Object.freeze` on the shape.
    pub fn freeze(&self) {
        self.0.extensible.set(false);
    }

    pub fn is_extensible(&self) -> bool {
        self.0.extensible.get()
    }

    pub fn observer(&self) -> Option<Rc<Observer>> {
        self.0.observer.borrow().clone()
    }

    pub(crate) fn attach_observer(&self, observer: Rc<Observer>) {
        *self.0.observer.borrow_mut() = Some(observer);
    }

    pub fn ptr_eq(&self, other: &Record) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }
}

fn observer_of(value: &Value) -> Option<Rc<Observer>> {
    match value {
        Value::Record(r) => r.observer(),
        Value::Sequence(s) => s.observer(),
        _ => None,
    }
}

impl Default for Record {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> FromIterator<(K, V)> for Record
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let record = Record::new();
        for (key, value) in iter {
            record.set(&key.into(), value.into());
        }
        record
    }
}

impl std::fmt::Debug for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let props = self.0.props.borrow();
        f.debug_map()
            .entries(props.iter().map(|(k, slot)| (k, &slot.value)))
            .finish()
    }
}
