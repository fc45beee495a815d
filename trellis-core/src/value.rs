//! Dynamic Values
//!
//! [`Value`] is the data a template reads and a render procedure produces:
//! primitives, the two observable container kinds ([`Record`] and
//! [`Sequence`]), callables and render nodes.
//!
//! Containers are reference types. Cloning a `Value::Record` clones a handle,
//! not the data, so two clones observe and mutate the same record.
//!
//! # Equality
//!
//! Three comparisons exist and each has its own caller:
//!
//! - [`Value::strict_eq`]: `===`, containers compare by identity, `NaN` is
//!   unequal to itself. This is also the `PartialEq` impl.
//! - [`Value::same_value`]: like `strict_eq` but `NaN` equals `NaN`. Reactive
//!   setters use it to skip no-op writes.
//! - [`Value::abstract_eq`]: `==` with the usual primitive coercions.

use std::fmt;
use std::rc::Rc;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::EvalError;
use crate::reactive::{Record, Sequence};
use crate::render::VNode;

/// Something a template can call.
pub trait Callable {
    fn call(&self, args: &[Value]) -> Result<Value, EvalError>;

    /// Name used in diagnostics.
    fn name(&self) -> &str {
        "anonymous"
    }
}

type NativeBody = dyn Fn(&[Value]) -> Result<Value, EvalError>;

/// A host function exposed to templates (methods, filters).
pub struct NativeFunction {
    name: String,
    body: Box<NativeBody>,
}

impl NativeFunction {
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, EvalError> + 'static,
    {
        Self {
            name: name.into(),
            body: Box::new(body),
        }
    }
}

impl Callable for NativeFunction {
    fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
        (self.body)(args)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A dynamically typed value.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Record(Record),
    Sequence(Sequence),
    Function(Rc<dyn Callable>),
    Node(Rc<VNode>),
}

impl Value {
    /// Wrap a host closure as a callable value.
    pub fn function<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, EvalError> + 'static,
    {
        Value::Function(Rc::new(NativeFunction::new(name, body)))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Records, sequences and render nodes: the values for which a watcher
    /// callback fires even when the new value is identical to the old one.
    pub fn is_object(&self) -> bool {
        matches!(self, Value::Record(_) | Value::Sequence(_) | Value::Node(_))
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&Sequence> {
        match self {
            Value::Sequence(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&Rc<VNode>> {
        match self {
            Value::Node(n) => Some(n),
            _ => None,
        }
    }

    /// The `typeof` operator.
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Function(_) => "function",
            Value::Null | Value::Record(_) | Value::Sequence(_) | Value::Node(_) => "object",
        }
    }

    /// `===`.
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => a.ptr_eq(b),
            (Value::Sequence(a), Value::Sequence(b)) => a.ptr_eq(b),
            (Value::Function(a), Value::Function(b)) => {
                std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
            }
            (Value::Node(a), Value::Node(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// `===`, except that `NaN` equals `NaN`.
    pub fn same_value(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) if a.is_nan() && b.is_nan() => true,
            _ => self.strict_eq(other),
        }
    }

    /// `==`.
    pub fn abstract_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (a, b) if a.is_nullish() && b.is_nullish() => true,
            (a, b) if a.is_nullish() || b.is_nullish() => false,
            (Value::Number(_), Value::String(_)) | (Value::String(_), Value::Number(_)) => {
                self.to_number() == other.to_number()
            }
            (Value::Bool(_), _) => Value::Number(self.to_number()).abstract_eq(other),
            (_, Value::Bool(_)) => self.abstract_eq(&Value::Number(other.to_number())),
            (a, b) if a.is_object() && !b.is_object() && !matches!(b, Value::Function(_)) => {
                Value::from(a.to_js_string()).abstract_eq(b)
            }
            (a, b) if b.is_object() && !a.is_object() && !matches!(a, Value::Function(_)) => {
                a.abstract_eq(&Value::from(b.to_js_string()))
            }
            _ => self.strict_eq(other),
        }
    }

    /// Numeric conversion (`+value`).
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::String(s) => string_to_number(s),
            Value::Sequence(seq) => match seq.len() {
                0 => 0.0,
                1 => string_to_number(&seq.get(0).to_js_string()),
                _ => f64::NAN,
            },
            _ => f64::NAN,
        }
    }

    /// String conversion (`String(value)`).
    pub fn to_js_string(&self) -> String {
        match self {
            Value::Undefined => "undefined".into(),
            Value::Null => "null".into(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::String(s) => s.to_string(),
            Value::Record(_) => "[object Object]".into(),
            Value::Sequence(seq) => seq
                .to_vec()
                .iter()
                .map(|v| if v.is_nullish() { String::new() } else { v.to_js_string() })
                .collect::<Vec<_>>()
                .join(","),
            Value::Function(f) => format!("function {}() {{ [native code] }}", f.name()),
            Value::Node(node) => node.text_content(),
        }
    }

    /// Text shown for an interpolation: nullish values render empty and
    /// containers render as indented JSON.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Undefined | Value::Null => String::new(),
            Value::Record(_) | Value::Sequence(_) => {
                serde_json::to_string_pretty(&self.to_json()).unwrap_or_default()
            }
            other => other.to_js_string(),
        }
    }

    /// Convert to JSON the way `JSON.stringify` would. Reads go through the
    /// reactive getters, so a render that stringifies a record depends on all
    /// of its nested properties.
    pub fn to_json(&self) -> serde_json::Value {
        let mut visiting = Vec::new();
        self.to_json_inner(&mut visiting)
    }

    fn to_json_inner(&self, visiting: &mut Vec<usize>) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Undefined | Value::Function(_) | Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 {
                    Json::from(*n as i64)
                } else {
                    serde_json::Number::from_f64(*n).map_or(Json::Null, Json::Number)
                }
            }
            Value::String(s) => Json::String(s.to_string()),
            Value::Node(node) => Json::String(node.text_content()),
            Value::Record(record) => {
                let addr = record.addr();
                if visiting.contains(&addr) {
                    return Json::Null;
                }
                visiting.push(addr);
                let mut map = serde_json::Map::new();
                for key in record.keys() {
                    let value = record.get(&key);
                    if matches!(value, Value::Undefined | Value::Function(_)) {
                        continue;
                    }
                    map.insert(key, value.to_json_inner(visiting));
                }
                visiting.pop();
                Json::Object(map)
            }
            Value::Sequence(seq) => {
                let addr = seq.addr();
                if visiting.contains(&addr) {
                    return Json::Null;
                }
                visiting.push(addr);
                let items = seq
                    .to_vec()
                    .iter()
                    .map(|item| item.to_json_inner(visiting))
                    .collect();
                visiting.pop();
                Json::Array(items)
            }
        }
    }

    /// Build a value from JSON. Objects become records and arrays become
    /// sequences, neither observed yet.
    pub fn from_json(json: &serde_json::Value) -> Value {
        use serde_json::Value as Json;
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            Json::String(s) => Value::from(s.as_str()),
            Json::Array(items) => {
                Value::Sequence(items.iter().map(Value::from_json).collect())
            }
            Json::Object(map) => Value::Record(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Property read (`value.key` / `value[key]`).
    pub fn get_member(&self, key: &str) -> Result<Value, EvalError> {
        match self {
            Value::Undefined | Value::Null => Err(EvalError::NullishAccess {
                property: key.to_string(),
                target: if self.is_undefined() { "undefined" } else { "null" },
            }),
            Value::Record(record) => Ok(record.get(key)),
            Value::Sequence(seq) => Ok(if key == "length" {
                Value::from(seq.len())
            } else {
                parse_index(key).map_or(Value::Undefined, |i| seq.get(i))
            }),
            Value::String(s) => Ok(if key == "length" {
                Value::from(s.encode_utf16().count())
            } else {
                parse_index(key)
                    .and_then(|i| s.chars().nth(i))
                    .map_or(Value::Undefined, |c| Value::from(c.to_string()))
            }),
            Value::Node(node) => Ok(match key {
                "tag" => node.tag.clone().map_or(Value::Undefined, Value::from),
                "text" => node.text.clone().map_or(Value::Undefined, Value::from),
                "key" => node.key.clone().unwrap_or_default(),
                _ => Value::Undefined,
            }),
            _ => Ok(Value::Undefined),
        }
    }

    /// Invoke a callable value.
    pub fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
        match self {
            Value::Function(f) => f.call(args),
            other => Err(EvalError::NotCallable(other.to_js_string())),
        }
    }
}

/// Parse a canonical array index (`"0"`, `"12"`, not `"01"` or `"-1"`).
pub fn parse_index(key: &str) -> Option<usize> {
    if key.is_empty() || (key.len() > 1 && key.starts_with('0')) {
        return None;
    }
    if !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    key.parse().ok()
}

fn string_to_number(s: &str) -> f64 {
    let s = s.trim();
    if s.is_empty() {
        return 0.0;
    }
    match s {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16).map_or(f64::NAN, |n| n as f64);
    }
    if s.bytes().all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E')) {
        s.parse().unwrap_or(f64::NAN)
    } else {
        f64::NAN
    }
}

static FLOAT_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:Infinity|\d+\.?\d*(?:[eE][+-]?\d+)?|\.\d+(?:[eE][+-]?\d+)?)")
        .expect("valid float prefix pattern")
});

/// `parseFloat`: the longest numeric prefix, `NaN` when there is none.
pub fn parse_float(s: &str) -> f64 {
    let s = s.trim_start();
    match FLOAT_PREFIX.find(s) {
        Some(m) => string_to_number(m.as_str()),
        None => f64::NAN,
    }
}

/// Format a number the way script engines print them.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".into();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity".into() } else { "-Infinity".into() };
    }
    if n == 0.0 {
        return "0".into();
    }
    let magnitude = n.abs();
    if n.fract() == 0.0 && magnitude < 1e21 {
        return format!("{n:.0}");
    }
    if (1e-6..1e21).contains(&magnitude) {
        return format!("{n}");
    }
    let formatted = format!("{n:e}");
    match formatted.split_once('e') {
        Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
        _ => formatted,
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.strict_eq(other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "Undefined"),
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Number(n) => write!(f, "Number({})", format_number(*n)),
            Value::String(s) => write!(f, "String({:?})", &**s),
            Value::Record(r) => write!(f, "Record{:?}", r.keys()),
            Value::Sequence(s) => write!(f, "Sequence(len={})", s.len()),
            Value::Function(func) => write!(f, "Function({})", func.name()),
            Value::Node(node) => write!(f, "Node({:?})", node.tag),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_js_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<Record> for Value {
    fn from(r: Record) -> Self {
        Value::Record(r)
    }
}

impl From<Sequence> for Value {
    fn from(s: Sequence) -> Self {
        Value::Sequence(s)
    }
}

impl From<Rc<VNode>> for Value {
    fn from(node: Rc<VNode>) -> Self {
        Value::Node(node)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Sequence(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Undefined, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_is_same_value_but_not_strictly_equal() {
        let a = Value::from(f64::NAN);
        let b = Value::from(f64::NAN);
        assert!(a.same_value(&b));
        assert!(!a.strict_eq(&b));
    }

    #[test]
    fn containers_compare_by_identity() {
        let a = Record::new();
        let b = Record::new();
        assert!(Value::from(a.clone()).strict_eq(&Value::from(a)));
        assert!(!Value::from(b).strict_eq(&Value::from(Record::new())));
    }

    #[test]
    fn abstract_equality_coerces() {
        assert!(Value::Null.abstract_eq(&Value::Undefined));
        assert!(Value::from(1).abstract_eq(&Value::from("1")));
        assert!(Value::from(true).abstract_eq(&Value::from(1)));
        assert!(!Value::Null.abstract_eq(&Value::from(0)));
    }

    #[test]
    fn numbers_format_like_script_engines() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(1e21), "1e+21");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn string_to_number_conversion() {
        assert_eq!(Value::from(" 42 ").to_number(), 42.0);
        assert_eq!(Value::from("").to_number(), 0.0);
        assert!(Value::from("12px").to_number().is_nan());
        assert_eq!(Value::from("0x10").to_number(), 16.0);
        assert_eq!(parse_float("12px"), 12.0);
        assert!(parse_float("px").is_nan());
    }

    #[test]
    fn display_string_renders_containers_as_json() {
        let record: Record = [("a", Value::from(1))].into_iter().collect();
        assert_eq!(
            Value::from(record).to_display_string(),
            "{\n  \"a\": 1\n}"
        );
        assert_eq!(Value::Null.to_display_string(), "");
        assert_eq!(Value::from(vec![1, 2]).to_js_string(), "1,2");
    }

    #[test]
    fn member_access_on_nullish_fails() {
        let err = Value::Undefined.get_member("x").unwrap_err();
        assert!(matches!(err, EvalError::NullishAccess { .. }));
        assert_eq!(Value::from("abc").get_member("length").unwrap(), Value::from(3));
    }

    #[test]
    fn canonical_indices_only() {
        assert_eq!(parse_index("3"), Some(3));
        assert_eq!(parse_index("03"), None);
        assert_eq!(parse_index("-1"), None);
        assert_eq!(parse_index("x"), None);
    }
}
