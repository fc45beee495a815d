//! Reactive Sequences
//!
//! A [`Sequence`] is an ordered list of values. Indexed reads are untracked:
//! a subscriber depends on a sequence through the property that holds it,
//! which registers with the sequence's observer dep (see
//! [`Record::get`](super::Record::get)).
//!
//! The mutating methods (`push`, `pop`, `shift`, `unshift`, `splice`, `sort`,
//! `reverse`) perform the mutation, observe inserted elements, and notify the
//! observer dep when the sequence is observed.

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::rc::Rc;

use super::observer::{observe, Observer};
use super::runtime::Runtime;
use crate::value::Value;

/// Most `Undefined` slots a single indexed write may append.
pub const MAX_HOLES: usize = 1 << 16;

struct SequenceInner {
    items: RefCell<Vec<Value>>,
    observer: RefCell<Option<Rc<Observer>>>,
    extensible: Cell<bool>,
}

/// A handle to a reactive sequence. Clones share the sequence.
#[derive(Clone)]
pub struct Sequence(Rc<SequenceInner>);

impl Sequence {
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    pub fn from_vec(items: Vec<Value>) -> Self {
        Self(Rc::new(SequenceInner {
            items: RefCell::new(items),
            observer: RefCell::new(None),
            extensible: Cell::new(true),
        }))
    }

    /// Element at `index`, or `Undefined`.
    pub fn get(&self, index: usize) -> Value {
        self.0.items.borrow().get(index).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.0.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the elements.
    pub fn to_vec(&self) -> Vec<Value> {
        self.0.items.borrow().clone()
    }

    /// Append an element. Returns the new length.
    pub fn push(&self, value: Value) -> usize {
        let len = {
            let mut items = self.0.items.borrow_mut();
            items.push(value.clone());
            items.len()
        };
        self.after_mutation(&[value]);
        len
    }

    /// Remove and return the last element.
    pub fn pop(&self) -> Value {
        let removed = self.0.items.borrow_mut().pop().unwrap_or_default();
        self.after_mutation(&[]);
        removed
    }

    /// Remove and return the first element.
    pub fn shift(&self) -> Value {
        let removed = {
            let mut items = self.0.items.borrow_mut();
            if items.is_empty() {
                Value::Undefined
            } else {
                items.remove(0)
            }
        };
        self.after_mutation(&[]);
        removed
    }

    /// Prepend elements. Returns the new length.
    pub fn unshift(&self, values: Vec<Value>) -> usize {
        let len = {
            let mut items = self.0.items.borrow_mut();
            items.splice(0..0, values.iter().cloned());
            items.len()
        };
        self.after_mutation(&values);
        len
    }

    /// Remove `delete_count` elements at `start` and insert `insert` there.
    ///
    /// A negative `start` counts from the end. `None` deletes to the end.
    /// Returns the removed elements.
    pub fn splice(&self, start: isize, delete_count: Option<usize>, insert: Vec<Value>) -> Vec<Value> {
        let removed = {
            let mut items = self.0.items.borrow_mut();
            let len = items.len();
            let start = if start < 0 {
                len.saturating_sub(start.unsigned_abs())
            } else {
                (start as usize).min(len)
            };
            let end = match delete_count {
                Some(count) => start.saturating_add(count).min(len),
                None => len,
            };
            items.splice(start..end, insert.iter().cloned()).collect()
        };
        self.after_mutation(&insert);
        removed
    }

    /// Sort with the default ordering: undefined last, everything else by
    /// string conversion.
    pub fn sort(&self) {
        self.sort_by(default_compare);
    }

    pub fn sort_by<F>(&self, mut compare: F)
    where
        F: FnMut(&Value, &Value) -> Ordering,
    {
        // The comparator may read this sequence, so sort a copy.
        let mut sorted = self.to_vec();
        sorted.sort_by(|a, b| compare(a, b));
        *self.0.items.borrow_mut() = sorted;
        self.after_mutation(&[]);
    }

    pub fn reverse(&self) {
        self.0.items.borrow_mut().reverse();
        self.after_mutation(&[]);
    }

    /// Write one slot with reactive semantics: the sequence grows with
    /// `Undefined` holes when needed and the write goes through `splice`.
    /// A write more than [`MAX_HOLES`] past the end is refused with a
    /// warning.
    pub fn set(&self, index: usize, value: Value) {
        if !self.grow_to(index) {
            return;
        }
        self.splice(index as isize, Some(1), vec![value]);
    }

    /// Write one slot without notifying, like an indexed assignment.
    pub fn write_silently(&self, index: usize, value: Value) {
        if self.grow_to(index) {
            self.0.items.borrow_mut()[index] = value;
        }
    }

    /// Make `index` addressable. False when that would take more than
    /// [`MAX_HOLES`] holes.
    fn grow_to(&self, index: usize) -> bool {
        let len = self.len();
        if index < len {
            return true;
        }
        if index - len > MAX_HOLES {
            Runtime::warn(&format!(
                "Refusing to write index {index} of a sequence of length {len}: it would create more than {MAX_HOLES} empty slots."
            ));
            return false;
        }
        self.0.items.borrow_mut().resize(index + 1, Value::Undefined);
        true
    }

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

    pub fn ptr_eq(&self, other: &Sequence) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    fn after_mutation(&self, inserted: &[Value]) {
        if let Some(observer) = self.observer() {
            for value in inserted {
                observe(value, false);
            }
            observer.dep().notify();
        }
    }
}

fn default_compare(a: &Value, b: &Value) -> Ordering {
    match (a.is_undefined(), b.is_undefined()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.to_js_string().cmp(&b.to_js_string()),
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<Value> for Sequence {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl std::fmt::Debug for Sequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.0.items.borrow().iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers(seq: &Sequence) -> Vec<f64> {
        seq.to_vec().iter().map(Value::to_number).collect()
    }

    fn seq_of(items: &[i32]) -> Sequence {
        items.iter().map(|&n| Value::from(n)).collect()
    }

    #[test]
    fn mutators_behave_like_array_methods() {
        let seq = seq_of(&[1, 2, 3]);
        assert_eq!(seq.push(Value::from(4)), 4);
        assert_eq!(seq.pop(), Value::from(4));
        assert_eq!(seq.shift(), Value::from(1));
        assert_eq!(seq.unshift(vec![Value::from(0)]), 3);
        assert_eq!(numbers(&seq), vec![0.0, 2.0, 3.0]);

        seq.reverse();
        assert_eq!(numbers(&seq), vec![3.0, 2.0, 0.0]);
    }

    #[test]
    fn splice_handles_negative_start_and_open_count() {
        let seq = seq_of(&[1, 2, 3, 4]);
        let removed = seq.splice(-2, None, vec![Value::from(9)]);
        assert_eq!(removed.len(), 2);
        assert_eq!(numbers(&seq), vec![1.0, 2.0, 9.0]);

        let removed = seq.splice(0, Some(0), vec![Value::from(0)]);
        assert!(removed.is_empty());
        assert_eq!(numbers(&seq), vec![0.0, 1.0, 2.0, 9.0]);
    }

    #[test]
    fn default_sort_compares_as_strings() {
        let seq = seq_of(&[10, 9, 1]);
        seq.sort();
        assert_eq!(numbers(&seq), vec![1.0, 10.0, 9.0]);
    }

    #[test]
    fn set_past_the_end_fills_holes() {
        let seq = seq_of(&[1]);
        seq.set(3, Value::from(4));
        assert_eq!(seq.len(), 4);
        assert!(seq.get(2).is_undefined());
        assert_eq!(seq.get(3), Value::from(4));
    }

    #[test]
    fn writes_far_past_the_end_are_refused() {
        let warnings = Rc::new(RefCell::new(Vec::new()));
        let sink = warnings.clone();
        Runtime::set_warn_handler(move |msg| sink.borrow_mut().push(msg.to_string()));

        let seq = seq_of(&[1]);
        seq.set(4_294_967_295, Value::from(2));
        seq.write_silently(usize::MAX, Value::from(3));
        assert_eq!(seq.len(), 1);
        assert_eq!(warnings.borrow().len(), 2);
        assert!(warnings.borrow()[0].contains("index 4294967295"));

        seq.set(1 + MAX_HOLES, Value::from(4));
        assert_eq!(seq.len(), MAX_HOLES + 2);
        Runtime::clear_handlers();
    }

    #[test]
    fn comparator_may_read_the_sequence() {
        let seq = seq_of(&[3, 1, 2]);
        let inner = seq.clone();
        seq.sort_by(|a, b| {
            assert_eq!(inner.len(), 3);
            a.to_number().total_cmp(&b.to_number())
        });
        assert_eq!(numbers(&seq), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn mutation_observes_inserted_containers() {
        let seq = Sequence::new();
        observe(&Value::from(seq.clone()), false);

        let child = crate::reactive::Record::new().with("a", 1);
        seq.push(Value::from(child.clone()));
        assert!(child.observer().is_some());
    }
}
