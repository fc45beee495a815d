//! Render helpers: the short-named functions generated render source calls.
//!
//! | helper | purpose |
//! |--------|---------|
//! | `_c`   | create an element node |
//! | `_v`   | create a text node |
//! | `_s`   | display string of a value |
//! | `_e`   | empty (comment) node |
//! | `_l`   | render a list (`v-for`) |
//! | `_m`   | render a cached static tree |
//! | `_o`   | mark a `v-once` tree |
//! | `_t`   | render a slot |
//! | `_f`   | resolve a filter |
//! | `_k`   | key code mismatch check for key modifiers |
//! | `_b`   | merge a `v-bind="object"` into the data object |
//! | `_g`   | merge a `v-on="object"` into the data object |
//! | `_u`   | resolve scoped slot functions |
//! | `_d`   | bind dynamic argument keys |
//! | `_p`   | prepend an event modifier marker to a dynamic event name |
//! | `_n`   | number cast for `v-model.number` |
//! | `_q`   | loose equality |
//! | `_i`   | loose index-of |

use std::rc::Rc;

use crate::compiler::must_use_prop;
use crate::error::EvalError;
use crate::reactive::{delete_property, set_property, Instance, Record, Runtime, Sequence};
use crate::util::{camelize, hyphenate};
use crate::value::{parse_float, Value};

use super::vnode::{mark_static, VNode};

const HELPERS: &[&str] = &[
    "_c", "_v", "_s", "_e", "_l", "_m", "_o", "_t", "_f", "_k", "_b", "_g", "_u", "_d", "_p",
    "_n", "_q", "_i", "$set", "$delete",
];

pub fn is_helper(name: &str) -> bool {
    HELPERS.contains(&name)
}

fn arg(args: &[Value], i: usize) -> Value {
    args.get(i).cloned().unwrap_or_default()
}

/// Dispatch a helper call on behalf of `vm`.
pub fn call_helper(vm: &Instance, name: &str, args: &[Value]) -> Result<Value, EvalError> {
    match name {
        "_c" => Ok(create_element(args)),
        "_v" => Ok(Value::Node(Rc::new(VNode::text(arg(args, 0).to_js_string())))),
        "_s" => Ok(Value::from(arg(args, 0).to_display_string())),
        "_e" => {
            let text = args.first().map(Value::to_js_string).unwrap_or_default();
            Ok(Value::Node(Rc::new(VNode::empty(text))))
        }
        "_l" => render_list(&arg(args, 0), &arg(args, 1)),
        "_m" => vm.render_static(
            arg(args, 0).to_number() as usize,
            arg(args, 1).is_truthy(),
        ),
        "_o" => Ok(mark_once(&arg(args, 0), &arg(args, 1), &arg(args, 2))),
        "_t" => render_slot(vm, args),
        "_f" => Ok(resolve_filter(vm, &arg(args, 0).to_js_string())),
        "_k" => Ok(Value::Bool(check_key_codes(args))),
        "_b" => Ok(bind_object_props(args)),
        "_g" => Ok(bind_object_listeners(&arg(args, 0), &arg(args, 1))),
        "_u" => Ok(Value::Record(resolve_scoped_slots(
            &arg(args, 0),
            arg(args, 1).as_record().cloned(),
            arg(args, 2).is_truthy(),
            &arg(args, 3),
        ))),
        "_d" => Ok(bind_dynamic_keys(&arg(args, 0), &arg(args, 1))),
        "_p" => Ok(prepend_modifier(&arg(args, 0), &arg(args, 1))),
        "_n" => Ok(to_number(&arg(args, 0))),
        "_q" => Ok(Value::Bool(loose_equal(&arg(args, 0), &arg(args, 1)))),
        "_i" => Ok(Value::from(loose_index_of(&arg(args, 0), &arg(args, 1)))),
        "$set" => Ok(set_property(
            &arg(args, 0),
            &arg(args, 1).to_js_string(),
            arg(args, 2),
        )),
        "$delete" => {
            delete_property(&arg(args, 0), &arg(args, 1).to_js_string());
            Ok(Value::Undefined)
        }
        other => Err(EvalError::NotCallable(other.to_string())),
    }
}

fn is_primitive(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

/// `_c(tag, data?, children?, normalization?)`. The data argument may be
/// omitted, in which case the children take its place.
fn create_element(args: &[Value]) -> Value {
    let mut data = arg(args, 1);
    let mut children = arg(args, 2);
    if matches!(data, Value::Sequence(_)) || is_primitive(&data) {
        children = data;
        data = Value::Undefined;
    }
    let data = data.as_record().cloned();

    let mut tag = match arg(args, 0) {
        Value::Undefined | Value::Null => String::new(),
        other => other.to_js_string(),
    };
    if let Some(is) = data.as_ref().map(|d| d.get_untracked("is")) {
        if !is.is_nullish() {
            tag = is.to_js_string();
        }
    }
    if tag.is_empty() {
        return Value::Node(Rc::new(VNode::empty("")));
    }

    let children = normalize_children(&children);
    Value::Node(Rc::new(VNode::element(tag, data, children)))
}

/// Flatten nested child sequences into nodes, turning primitives into text
/// nodes and merging adjacent text.
pub fn normalize_children(children: &Value) -> Vec<Rc<VNode>> {
    let mut out = Vec::new();
    match children {
        Value::Sequence(seq) => flatten_into(&seq.to_vec(), &mut out),
        Value::Node(node) => out.push(node.clone()),
        value if is_primitive(value) => out.push(Rc::new(VNode::text(value.to_js_string()))),
        _ => {}
    }
    out
}

fn flatten_into(items: &[Value], out: &mut Vec<Rc<VNode>>) {
    for item in items {
        match item {
            Value::Sequence(inner) => flatten_into(&inner.to_vec(), out),
            Value::Node(node) => push_merging_text(out, node.clone()),
            Value::String(_) | Value::Number(_) => {
                let text = item.to_js_string();
                if text.is_empty() && !out.last().is_some_and(|l| l.is_text()) {
                    continue;
                }
                push_merging_text(out, Rc::new(VNode::text(text)));
            }
            _ => {}
        }
    }
}

fn push_merging_text(out: &mut Vec<Rc<VNode>>, node: Rc<VNode>) {
    if node.is_text() {
        if let Some(last) = out.last_mut() {
            if last.is_text() {
                let merged = format!(
                    "{}{}",
                    last.text.as_deref().unwrap_or(""),
                    node.text.as_deref().unwrap_or("")
                );
                *last = Rc::new(VNode::text(merged));
                return;
            }
        }
    }
    out.push(node);
}

/// `_l(source, render)`: sequences and strings by element, numbers as
/// `1..=n`, records by key (`render(value, key, index)`).
fn render_list(source: &Value, render: &Value) -> Result<Value, EvalError> {
    let mut out = Vec::new();
    match source {
        Value::Sequence(seq) => {
            for (i, item) in seq.to_vec().into_iter().enumerate() {
                out.push(render.call(&[item, Value::from(i)])?);
            }
        }
        Value::String(s) => {
            for (i, c) in s.chars().enumerate() {
                out.push(render.call(&[Value::from(c.to_string()), Value::from(i)])?);
            }
        }
        Value::Number(n) => {
            for i in 0..(n.max(0.0) as usize) {
                out.push(render.call(&[Value::from(i + 1), Value::from(i)])?);
            }
        }
        Value::Record(record) => {
            for (i, key) in record.keys().into_iter().enumerate() {
                let value = record.get(&key);
                out.push(render.call(&[value, Value::from(key), Value::from(i)])?);
            }
        }
        _ => {}
    }
    Ok(Value::Sequence(Sequence::from_vec(out)))
}

fn mark_once(tree: &Value, index: &Value, key: &Value) -> Value {
    let mut id = format!("__once__{}", index.to_js_string());
    if key.is_truthy() {
        id.push('_');
        id.push_str(&key.to_js_string());
    }
    mark_static(tree, &id, true)
}

/// `_t(name, fallback, props, bind_object)`.
fn render_slot(vm: &Instance, args: &[Value]) -> Result<Value, EvalError> {
    let name = arg(args, 0).to_js_string();
    let fallback = arg(args, 1);
    let render_fallback = || match &fallback {
        Value::Function(f) => f.call(&[]),
        other => Ok(other.clone()),
    };

    if let Some(scoped) = vm.scoped_slot(&name) {
        let props = Record::new();
        let bind = arg(args, 3);
        match &bind {
            Value::Record(bound) => {
                for key in bound.keys() {
                    props.set(&key, bound.get(&key));
                }
            }
            Value::Undefined | Value::Null => {}
            _ => Runtime::warn("slot v-bind without argument expects an Object"),
        }
        if let Value::Record(own) = arg(args, 2) {
            for key in own.keys() {
                props.set(&key, own.get(&key));
            }
        }
        let nodes = scoped.call(&[Value::Record(props)])?;
        return if nodes.is_nullish() { render_fallback() } else { Ok(nodes) };
    }

    match vm.slot(&name) {
        Some(nodes) => Ok(nodes),
        None => render_fallback(),
    }
}

fn resolve_filter(vm: &Instance, id: &str) -> Value {
    match vm.filter(id) {
        Some(filter) => filter,
        None => {
            Runtime::warn(&format!("Failed to resolve filter: {id}"));
            Value::function("identity", |args| Ok(arg(args, 0)))
        }
    }
}

fn key_not_match(expected: &Value, actual: &Value) -> bool {
    match expected {
        Value::Sequence(seq) => !seq.to_vec().iter().any(|v| v.strict_eq(actual)),
        other => !other.strict_eq(actual),
    }
}

/// `_k(event_key_code, key, builtin_key_code, event_key_name, builtin_key_name)`:
/// true when the event does NOT match the modifier key.
fn check_key_codes(args: &[Value]) -> bool {
    let event_key_code = arg(args, 0);
    let key = arg(args, 1).to_js_string();
    let builtin_key_code = arg(args, 2);
    let event_key_name = arg(args, 3);
    let builtin_key_name = arg(args, 4);

    if builtin_key_name.is_truthy() && event_key_name.is_truthy() {
        key_not_match(&builtin_key_name, &event_key_name)
    } else if builtin_key_code.is_truthy() {
        key_not_match(&builtin_key_code, &event_key_code)
    } else if event_key_name.is_truthy() {
        hyphenate(&event_key_name.to_js_string()) != key
    } else {
        event_key_code.is_undefined()
    }
}

fn is_reserved_attribute(key: &str) -> bool {
    matches!(key, "key" | "ref" | "slot" | "slot-scope" | "is")
}

/// Get `data[group]`, creating an empty record when missing.
fn group(data: &Record, name: &str) -> Record {
    match data.get_untracked(name) {
        Value::Record(existing) => existing,
        _ => {
            let created = Record::new();
            data.set(name, Value::Record(created.clone()));
            created
        }
    }
}

/// `_b(data, tag, value, as_prop, is_sync)`.
fn bind_object_props(args: &[Value]) -> Value {
    let data_value = arg(args, 0);
    let Some(data) = data_value.as_record().cloned() else {
        return data_value;
    };
    let tag = arg(args, 1).to_js_string();
    let value = arg(args, 2);
    let as_prop = arg(args, 3).is_truthy();
    let is_sync = arg(args, 4).is_truthy();

    let source = match &value {
        Value::Undefined | Value::Null | Value::Bool(false) => return data_value,
        Value::Record(record) => record.clone(),
        Value::Sequence(seq) => {
            let merged = Record::new();
            for item in seq.to_vec() {
                if let Value::Record(part) = item {
                    for key in part.keys() {
                        merged.set(&key, part.get(&key));
                    }
                }
            }
            merged
        }
        _ => {
            Runtime::warn("v-bind without argument expects an Object or Array value");
            return data_value;
        }
    };

    for key in source.keys() {
        let target = if key == "class" || key == "style" || is_reserved_attribute(&key) {
            data.clone()
        } else {
            let ty = data
                .get_untracked("attrs")
                .as_record()
                .map(|a| a.get_untracked("type").to_js_string());
            if as_prop || must_use_prop(&tag, ty.as_deref(), &key) {
                group(&data, "domProps")
            } else {
                group(&data, "attrs")
            }
        };
        let camelized = camelize(&key);
        let hyphenated = hyphenate(&key);
        if target.has(&camelized) || target.has(&hyphenated) {
            continue;
        }
        target.set(&key, source.get(&key));

        if is_sync {
            let on = group(&data, "on");
            let owner = source.clone();
            let prop = key.clone();
            on.set(
                &format!("update:{key}"),
                Value::function(format!("update:{key}"), move |args| {
                    owner.set(&prop, arg(args, 0));
                    Ok(Value::Undefined)
                }),
            );
        }
    }
    data_value
}

/// `_g(data, listeners)`.
fn bind_object_listeners(data_value: &Value, value: &Value) -> Value {
    let Some(data) = data_value.as_record() else {
        return data_value.clone();
    };
    let Value::Record(listeners) = value else {
        if !value.is_nullish() {
            Runtime::warn("v-on without argument expects an Object value");
        }
        return data_value.clone();
    };
    let on = group(data, "on");
    for key in listeners.keys() {
        let ours = listeners.get(&key);
        let merged = match on.get_untracked(&key) {
            Value::Undefined => ours,
            Value::Sequence(existing) => {
                let mut all = existing.to_vec();
                all.push(ours);
                Value::Sequence(Sequence::from_vec(all))
            }
            existing => Value::Sequence(Sequence::from_vec(vec![existing, ours])),
        };
        on.set(&key, merged);
    }
    data_value.clone()
}

/// `_u(slots, res, has_dynamic_keys, content_hash_key)`: turn the generated
/// `[{key, fn}]` list into a record of slot functions.
fn resolve_scoped_slots(
    fns: &Value,
    res: Option<Record>,
    has_dynamic_keys: bool,
    content_hash_key: &Value,
) -> Record {
    let res = res.unwrap_or_else(|| Record::new().with("$stable", !has_dynamic_keys));
    if let Value::Sequence(slots) = fns {
        for slot in slots.to_vec() {
            match &slot {
                Value::Sequence(_) => {
                    resolve_scoped_slots(&slot, Some(res.clone()), has_dynamic_keys, &Value::Undefined);
                }
                Value::Record(entry) => {
                    let key = entry.get_untracked("key").to_js_string();
                    res.set(&key, entry.get_untracked("fn"));
                }
                _ => {}
            }
        }
    }
    if content_hash_key.is_truthy() {
        res.set("$key", content_hash_key.clone());
    }
    res
}

/// `_d(base, [key1, value1, key2, value2, ...])`.
fn bind_dynamic_keys(base: &Value, values: &Value) -> Value {
    let (Some(record), Some(values)) = (base.as_record(), values.as_sequence()) else {
        return base.clone();
    };
    let values = values.to_vec();
    for pair in values.chunks(2) {
        let key = &pair[0];
        match key {
            Value::String(s) if !s.is_empty() => {
                record.set(s, pair.get(1).cloned().unwrap_or_default());
            }
            Value::String(_) | Value::Null => {}
            other => Runtime::warn(&format!(
                "Invalid value for dynamic directive argument (expected string or null): {}",
                other.to_js_string()
            )),
        }
    }
    base.clone()
}

fn prepend_modifier(value: &Value, symbol: &Value) -> Value {
    match value {
        Value::String(s) => Value::from(format!("{}{}", symbol.to_js_string(), s)),
        other => other.clone(),
    }
}

fn to_number(value: &Value) -> Value {
    let n = parse_float(&value.to_js_string());
    if n.is_nan() {
        value.clone()
    } else {
        Value::Number(n)
    }
}

/// Structural equality for `v-model` on checkboxes, radios and selects.
pub fn loose_equal(a: &Value, b: &Value) -> bool {
    if a.strict_eq(b) {
        return true;
    }
    let is_object = |v: &Value| matches!(v, Value::Record(_) | Value::Sequence(_));
    match (a, b) {
        (Value::Sequence(x), Value::Sequence(y)) => {
            let (x, y) = (x.to_vec(), y.to_vec());
            x.len() == y.len() && x.iter().zip(&y).all(|(p, q)| loose_equal(p, q))
        }
        (Value::Record(x), Value::Record(y)) => {
            let keys = x.keys();
            keys.len() == y.len()
                && keys
                    .iter()
                    .all(|k| y.has(k) && loose_equal(&x.get(k), &y.get(k)))
        }
        _ if is_object(a) || is_object(b) => false,
        _ => a.to_js_string() == b.to_js_string(),
    }
}

pub fn loose_index_of(list: &Value, value: &Value) -> i64 {
    match list {
        Value::Sequence(seq) => seq
            .to_vec()
            .iter()
            .position(|item| loose_equal(item, value))
            .map_or(-1, |i| i as i64),
        _ => -1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::InstanceOptions;

    fn vm() -> Instance {
        Instance::new(InstanceOptions::new()).unwrap()
    }

    fn node(value: Value) -> Rc<VNode> {
        value.as_node().cloned().unwrap()
    }

    #[test]
    fn create_element_shifts_children_into_place() {
        let vm = vm();
        let children = Value::from(vec![Value::from("a"), Value::from("b")]);
        let el = node(call_helper(&vm, "_c", &[Value::from("p"), children]).unwrap());
        assert!(el.data.is_none());
        assert_eq!(el.children.len(), 1);
        assert_eq!(el.text_content(), "ab");
    }

    #[test]
    fn normalization_flattens_and_skips_nullish() {
        let nested = Value::from(vec![
            Value::from(vec![Value::Node(Rc::new(VNode::element("i", None, vec![])))]),
            Value::Null,
            Value::from(true),
            Value::from(1),
        ]);
        let children = normalize_children(&nested);
        assert_eq!(children.len(), 2);
        assert_eq!(children[1].text.as_deref(), Some("1"));
    }

    #[test]
    fn render_list_over_numbers_and_records() {
        let vm = vm();
        let render = Value::function("r", |args| {
            Ok(Value::from(format!("{}:{}", args[0].to_js_string(), args[1].to_js_string())))
        });
        let out = call_helper(&vm, "_l", &[Value::from(3), render.clone()]).unwrap();
        assert_eq!(
            out.as_sequence().unwrap().to_vec(),
            vec![Value::from("1:0"), Value::from("2:1"), Value::from("3:2")]
        );

        let record = Record::new().with("a", 1).with("b", 2);
        let out = call_helper(&vm, "_l", &[Value::from(record), render]).unwrap();
        assert_eq!(out.as_sequence().unwrap().get(1), Value::from("2:b"));
    }

    #[test]
    fn key_code_check() {
        // Named key matches.
        assert!(!check_key_codes(&[
            Value::from(13),
            Value::from("enter"),
            Value::from(13),
            Value::from("Enter"),
            Value::from("Enter"),
        ]));
        // Falls back to the key code when the event has no key name.
        assert!(check_key_codes(&[
            Value::from(27),
            Value::from("enter"),
            Value::from(13),
            Value::Undefined,
            Value::from("Enter"),
        ]));
        // Custom key names compare hyphenated.
        assert!(!check_key_codes(&[
            Value::Undefined,
            Value::from("page-down"),
            Value::Undefined,
            Value::from("PageDown"),
            Value::Undefined,
        ]));
    }

    #[test]
    fn bind_object_routes_props_and_attrs() {
        let data = Record::new();
        let value = Record::new().with("value", "x").with("title", "t").with("key", 1);
        bind_object_props(&[
            Value::from(data.clone()),
            Value::from("input"),
            Value::from(value),
            Value::from(false),
            Value::from(false),
        ]);
        assert_eq!(data.get("key"), Value::from(1));
        let attrs = data.get("attrs");
        assert_eq!(attrs.get_member("title").unwrap(), Value::from("t"));
        let props = data.get("domProps");
        assert_eq!(props.get_member("value").unwrap(), Value::from("x"));
    }

    #[test]
    fn bind_listeners_merges_existing_handlers() {
        let first = Value::function("a", |_| Ok(Value::Undefined));
        let second = Value::function("b", |_| Ok(Value::Undefined));
        let data = Record::new().with("on", Record::new().with("click", first));
        bind_object_listeners(
            &Value::from(data.clone()),
            &Value::from(Record::new().with("click", second)),
        );
        let click = data.get("on").get_member("click").unwrap();
        assert_eq!(click.as_sequence().unwrap().len(), 2);
    }

    #[test]
    fn dynamic_keys_skip_null_and_warn_on_garbage() {
        let warnings = Rc::new(std::cell::RefCell::new(0));
        let counter = warnings.clone();
        Runtime::set_warn_handler(move |_| *counter.borrow_mut() += 1);

        let base = Record::new();
        let values = Value::from(vec![
            Value::from("id"),
            Value::from("main"),
            Value::Null,
            Value::from("skipped"),
            Value::from(5),
            Value::from("bad"),
        ]);
        bind_dynamic_keys(&Value::from(base.clone()), &values);
        assert_eq!(base.keys(), vec!["id".to_string()]);
        assert_eq!(*warnings.borrow(), 1);
        Runtime::clear_handlers();
    }

    #[test]
    fn number_cast_keeps_non_numeric_input() {
        assert_eq!(to_number(&Value::from("12.5px")), Value::from(12.5));
        assert_eq!(to_number(&Value::from("abc")), Value::from("abc"));
    }

    #[test]
    fn loose_equality() {
        assert!(loose_equal(&Value::from(1), &Value::from("1")));
        let a = Value::from(Record::new().with("x", 1));
        let b = Value::from(Record::new().with("x", "1"));
        assert!(loose_equal(&a, &b));
        assert!(!loose_equal(&a, &Value::from("[object Object]")));
        let list = Value::from(vec![Value::from("a"), Value::from("b")]);
        assert_eq!(loose_index_of(&list, &Value::from("b")), 1);
    }

    #[test]
    fn missing_filter_warns_and_passes_through() {
        let warnings = Rc::new(std::cell::RefCell::new(Vec::new()));
        let sink = warnings.clone();
        Runtime::set_warn_handler(move |msg| sink.borrow_mut().push(msg.to_string()));

        let vm = vm();
        let filter = call_helper(&vm, "_f", &[Value::from("nope")]).unwrap();
        assert_eq!(filter.call(&[Value::from(3)]).unwrap(), Value::from(3));
        assert_eq!(warnings.borrow()[0], "Failed to resolve filter: nope");
        Runtime::clear_handlers();
    }
}
