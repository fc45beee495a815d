//! Deep traversal for `deep` watchers: touch every nested reactive property so
//! the evaluating watcher depends on all of them.

use std::collections::HashSet;

use crate::value::Value;

pub fn traverse(value: &Value) {
    let mut seen = HashSet::new();
    walk(value, &mut seen);
}

fn walk(value: &Value, seen: &mut HashSet<usize>) {
    match value {
        Value::Record(record) => {
            if !record.is_extensible() || !seen.insert(record.addr()) {
                return;
            }
            for key in record.keys() {
                walk(&record.get(&key), seen);
            }
        }
        Value::Sequence(seq) => {
            if !seq.is_extensible() || !seen.insert(seq.addr()) {
                return;
            }
            for item in seq.to_vec() {
                walk(&item, seen);
            }
        }
        _ => {}
    }
}
