//! Built-in globals and the methods templates call on sequences, strings and
//! numbers.

use std::cmp::Ordering;

use crate::error::EvalError;
use crate::reactive::{Record, Sequence};
use crate::value::{format_number, parse_float, Value};

fn arg(args: &[Value], i: usize) -> Value {
    args.get(i).cloned().unwrap_or_default()
}

fn callback(args: &[Value], method: &str) -> Result<Value, EvalError> {
    match args.first() {
        Some(f @ Value::Function(_)) => Ok(f.clone()),
        Some(other) => Err(EvalError::NotCallable(format!(
            "{} passed to {method}",
            other.to_js_string()
        ))),
        None => Err(EvalError::NotCallable(format!("undefined passed to {method}"))),
    }
}

/// Resolve a relative index the way `slice` does: negative counts from the
/// end, the result is clamped to `0..=len`.
fn relative_index(value: &Value, len: usize, default: usize) -> usize {
    if value.is_undefined() {
        return default;
    }
    let n = value.to_number();
    if n.is_nan() {
        return 0;
    }
    let n = n.trunc();
    if n < 0.0 {
        (len as f64 + n).max(0.0) as usize
    } else {
        (n as usize).min(len)
    }
}

/// Call a sequence method. `None` means the sequence has no such method.
pub fn sequence_method(
    seq: &Sequence,
    name: &str,
    args: &[Value],
) -> Option<Result<Value, EvalError>> {
    let result = match name {
        "push" => {
            for item in args {
                seq.push(item.clone());
            }
            Ok(Value::from(seq.len()))
        }
        "pop" => Ok(seq.pop()),
        "shift" => Ok(seq.shift()),
        "unshift" => {
            seq.unshift(args.to_vec());
            Ok(Value::from(seq.len()))
        }
        "splice" => {
            let len = seq.len();
            let start = relative_index(&arg(args, 0), len, 0);
            let delete = if args.len() < 2 {
                None
            } else {
                Some(arg(args, 1).to_number().max(0.0) as usize)
            };
            let insert = args.iter().skip(2).cloned().collect();
            let removed = seq.splice(start as isize, delete, insert);
            Ok(Value::Sequence(Sequence::from_vec(removed)))
        }
        "sort" => match args.first() {
            Some(Value::Function(compare)) => {
                let compare = compare.clone();
                let mut failure = None;
                seq.sort_by(|a, b| {
                    if failure.is_some() {
                        return Ordering::Equal;
                    }
                    match compare.call(&[a.clone(), b.clone()]) {
                        Ok(v) => v.to_number().partial_cmp(&0.0).unwrap_or(Ordering::Equal),
                        Err(err) => {
                            failure = Some(err);
                            Ordering::Equal
                        }
                    }
                });
                match failure {
                    Some(err) => Err(err),
                    None => Ok(Value::Sequence(seq.clone())),
                }
            }
            _ => {
                seq.sort();
                Ok(Value::Sequence(seq.clone()))
            }
        },
        "reverse" => {
            seq.reverse();
            Ok(Value::Sequence(seq.clone()))
        }
        "indexOf" => {
            let needle = arg(args, 0);
            let index = seq.to_vec().iter().position(|v| v.strict_eq(&needle));
            Ok(Value::from(index.map_or(-1.0, |i| i as f64)))
        }
        "includes" => {
            let needle = arg(args, 0);
            Ok(Value::from(
                seq.to_vec().iter().any(|v| v.same_value(&needle)),
            ))
        }
        "join" => {
            let sep = match args.first() {
                None | Some(Value::Undefined) => ",".to_string(),
                Some(v) => v.to_js_string(),
            };
            let parts: Vec<String> = seq
                .to_vec()
                .iter()
                .map(|v| if v.is_nullish() { String::new() } else { v.to_js_string() })
                .collect();
            Ok(Value::from(parts.join(&sep)))
        }
        "slice" => {
            let items = seq.to_vec();
            let start = relative_index(&arg(args, 0), items.len(), 0);
            let end = relative_index(&arg(args, 1), items.len(), items.len());
            let out = if start < end { items[start..end].to_vec() } else { Vec::new() };
            Ok(Value::Sequence(Sequence::from_vec(out)))
        }
        "concat" => {
            let mut out = seq.to_vec();
            for extra in args {
                match extra {
                    Value::Sequence(other) => out.extend(other.to_vec()),
                    other => out.push(other.clone()),
                }
            }
            Ok(Value::Sequence(Sequence::from_vec(out)))
        }
        "map" | "filter" | "find" | "findIndex" | "some" | "every" | "forEach" => {
            return Some(iterate(seq, name, args));
        }
        "reduce" => {
            return Some(reduce(seq, args));
        }
        "toString" => Ok(Value::from(Value::Sequence(seq.clone()).to_js_string())),
        _ => return None,
    };
    Some(result)
}

fn iterate(seq: &Sequence, name: &str, args: &[Value]) -> Result<Value, EvalError> {
    let f = callback(args, name)?;
    let items = seq.to_vec();
    let this = Value::Sequence(seq.clone());
    let mut mapped = Vec::new();
    for (i, item) in items.iter().enumerate() {
        let result = f.call(&[item.clone(), Value::from(i), this.clone()])?;
        match name {
            "map" => mapped.push(result),
            "filter" if result.is_truthy() => mapped.push(item.clone()),
            "find" if result.is_truthy() => return Ok(item.clone()),
            "findIndex" if result.is_truthy() => return Ok(Value::from(i)),
            "some" if result.is_truthy() => return Ok(Value::from(true)),
            "every" if !result.is_truthy() => return Ok(Value::from(false)),
            _ => {}
        }
    }
    Ok(match name {
        "map" | "filter" => Value::Sequence(Sequence::from_vec(mapped)),
        "findIndex" => Value::from(-1),
        "some" => Value::from(false),
        "every" => Value::from(true),
        _ => Value::Undefined,
    })
}

fn reduce(seq: &Sequence, args: &[Value]) -> Result<Value, EvalError> {
    let f = callback(args, "reduce")?;
    let mut items = seq.to_vec().into_iter().enumerate();
    let mut acc = match args.get(1) {
        Some(initial) => initial.clone(),
        None => match items.next() {
            Some((_, first)) => first,
            None => {
                return Err(EvalError::thrown(
                    "Reduce of empty array with no initial value",
                ))
            }
        },
    };
    for (i, item) in items {
        acc = f.call(&[acc, item, Value::from(i)])?;
    }
    Ok(acc)
}

/// Call a string method. `None` means strings have no such method.
pub fn string_method(s: &str, name: &str, args: &[Value]) -> Option<Result<Value, EvalError>> {
    let chars: Vec<char> = s.chars().collect();
    let value = match name {
        "toUpperCase" => Value::from(s.to_uppercase()),
        "toLowerCase" => Value::from(s.to_lowercase()),
        "trim" => Value::from(s.trim()),
        "trimStart" => Value::from(s.trim_start()),
        "trimEnd" => Value::from(s.trim_end()),
        "toString" | "valueOf" => Value::from(s),
        "charAt" => {
            let i = arg(args, 0).to_number();
            let i = if i.is_nan() { 0.0 } else { i };
            Value::from(
                chars
                    .get(i as usize)
                    .filter(|_| i >= 0.0)
                    .map(char::to_string)
                    .unwrap_or_default(),
            )
        }
        "indexOf" => {
            let needle = arg(args, 0).to_js_string();
            Value::from(
                s.find(&needle)
                    .map_or(-1.0, |byte| s[..byte].chars().count() as f64),
            )
        }
        "includes" => Value::from(s.contains(&arg(args, 0).to_js_string())),
        "startsWith" => Value::from(s.starts_with(&arg(args, 0).to_js_string())),
        "endsWith" => Value::from(s.ends_with(&arg(args, 0).to_js_string())),
        "slice" | "substring" => {
            let len = chars.len();
            let (mut start, mut end) = (
                relative_index(&arg(args, 0), len, 0),
                relative_index(&arg(args, 1), len, len),
            );
            if name == "substring" {
                let clamp = |v: &Value, default: usize| {
                    if v.is_undefined() {
                        default
                    } else {
                        v.to_number().max(0.0).min(len as f64) as usize
                    }
                };
                start = clamp(&arg(args, 0), 0);
                end = clamp(&arg(args, 1), len);
                if start > end {
                    std::mem::swap(&mut start, &mut end);
                }
            }
            let out: String = if start < end { chars[start..end].iter().collect() } else { String::new() };
            Value::from(out)
        }
        "split" => {
            let parts: Vec<Value> = match args.first() {
                None | Some(Value::Undefined) => vec![Value::from(s)],
                Some(sep) => {
                    let sep = sep.to_js_string();
                    if sep.is_empty() {
                        chars.iter().map(|c| Value::from(c.to_string())).collect()
                    } else {
                        s.split(sep.as_str()).map(Value::from).collect()
                    }
                }
            };
            Value::Sequence(Sequence::from_vec(parts))
        }
        "replace" => {
            let pattern = arg(args, 0).to_js_string();
            let replacement = arg(args, 1).to_js_string();
            Value::from(s.replacen(&pattern, &replacement, 1))
        }
        "repeat" => {
            let n = arg(args, 0).to_number();
            if n < 0.0 || n.is_infinite() {
                return Some(Err(EvalError::thrown(format!(
                    "Invalid count value: {}",
                    format_number(n)
                ))));
            }
            Value::from(s.repeat(n as usize))
        }
        "padStart" | "padEnd" => {
            let width = arg(args, 0).to_number().max(0.0) as usize;
            let fill = match args.get(1) {
                Some(v) if !v.is_undefined() => v.to_js_string(),
                _ => " ".to_string(),
            };
            if chars.len() >= width || fill.is_empty() {
                Value::from(s)
            } else {
                let pad: String = fill.chars().cycle().take(width - chars.len()).collect();
                if name == "padStart" {
                    Value::from(format!("{pad}{s}"))
                } else {
                    Value::from(format!("{s}{pad}"))
                }
            }
        }
        "concat" => {
            let mut out = s.to_string();
            for a in args {
                out.push_str(&a.to_js_string());
            }
            Value::from(out)
        }
        _ => return None,
    };
    Some(Ok(value))
}

/// Call a number method. `None` means numbers have no such method.
pub fn number_method(n: f64, name: &str, args: &[Value]) -> Option<Result<Value, EvalError>> {
    let value = match name {
        "toFixed" => {
            let digits = arg(args, 0).to_number();
            let digits = if digits.is_nan() { 0 } else { digits as usize };
            if !n.is_finite() {
                Value::from(format_number(n))
            } else {
                Value::from(format!("{n:.digits$}"))
            }
        }
        "toString" | "valueOf" => Value::from(format_number(n)),
        _ => return None,
    };
    Some(Ok(value))
}

/// A global binding, resolved after the local scope and the instance.
pub fn global(name: &str) -> Option<Value> {
    let value = match name {
        "NaN" => Value::Number(f64::NAN),
        "Infinity" => Value::Number(f64::INFINITY),
        "parseFloat" => Value::function("parseFloat", |args| {
            Ok(Value::from(parse_float(&arg(args, 0).to_js_string())))
        }),
        "parseInt" => Value::function("parseInt", |args| {
            Ok(Value::Number(parse_int(&arg(args, 0).to_js_string())))
        }),
        "isNaN" => Value::function("isNaN", |args| {
            Ok(Value::from(arg(args, 0).to_number().is_nan()))
        }),
        "String" => Value::function("String", |args| {
            Ok(Value::from(arg(args, 0).to_js_string()))
        }),
        "Number" => Value::function("Number", |args| {
            Ok(Value::Number(match args.first() {
                Some(v) => v.to_number(),
                None => 0.0,
            }))
        }),
        "Boolean" => Value::function("Boolean", |args| Ok(Value::from(arg(args, 0).is_truthy()))),
        "Math" => math(),
        "JSON" => json(),
        "Array" => Record::new()
            .with(
                "isArray",
                Value::function("isArray", |args| {
                    Ok(Value::from(matches!(args.first(), Some(Value::Sequence(_)))))
                }),
            )
            .into(),
        "Object" => Record::new()
            .with(
                "keys",
                Value::function("keys", |args| {
                    let keys = match args.first() {
                        Some(Value::Record(r)) => r.keys().into_iter().map(Value::from).collect(),
                        Some(Value::Sequence(s)) => (0..s.len()).map(|i| Value::from(i.to_string())).collect(),
                        _ => Vec::new(),
                    };
                    Ok(Value::Sequence(Sequence::from_vec(keys)))
                }),
            )
            .into(),
        _ => return None,
    };
    Some(value)
}

fn parse_int(s: &str) -> f64 {
    let s = s.trim_start();
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return f64::NAN;
    }
    digits[..end].parse::<f64>().map_or(f64::NAN, |n| sign * n)
}

fn math() -> Value {
    fn unary(name: &'static str, f: fn(f64) -> f64) -> Value {
        Value::function(name, move |args| Ok(Value::Number(f(arg(args, 0).to_number()))))
    }
    fn fold(name: &'static str, init: f64, pick: fn(f64, f64) -> f64) -> Value {
        Value::function(name, move |args| {
            let mut acc = init;
            for a in args {
                let n = a.to_number();
                if n.is_nan() {
                    return Ok(Value::Number(f64::NAN));
                }
                acc = pick(acc, n);
            }
            Ok(Value::Number(acc))
        })
    }

    Record::new()
        .with("PI", std::f64::consts::PI)
        .with("floor", unary("floor", f64::floor))
        .with("ceil", unary("ceil", f64::ceil))
        .with("round", unary("round", |n| (n + 0.5).floor()))
        .with("abs", unary("abs", f64::abs))
        .with("sqrt", unary("sqrt", f64::sqrt))
        .with("trunc", unary("trunc", f64::trunc))
        .with("max", fold("max", f64::NEG_INFINITY, f64::max))
        .with("min", fold("min", f64::INFINITY, f64::min))
        .with(
            "pow",
            Value::function("pow", |args| {
                Ok(Value::Number(arg(args, 0).to_number().powf(arg(args, 1).to_number())))
            }),
        )
        .into()
}

fn json() -> Value {
    Record::new()
        .with(
            "stringify",
            Value::function("stringify", |args| {
                let value = arg(args, 0);
                if value.is_undefined() || matches!(value, Value::Function(_)) {
                    return Ok(Value::Undefined);
                }
                let json = value.to_json();
                let indent = arg(args, 2);
                let text = if indent.to_number() > 0.0 {
                    serde_json::to_string_pretty(&json)
                } else {
                    serde_json::to_string(&json)
                };
                text.map(Value::from)
                    .map_err(|err| EvalError::thrown(err.to_string()))
            }),
        )
        .with(
            "parse",
            Value::function("parse", |args| {
                let json: serde_json::Value = serde_json::from_str(&arg(args, 0).to_js_string())
                    .map_err(|err| EvalError::thrown(format!("JSON.parse: {err}")))?;
                Ok(Value::from_json(&json))
            }),
        )
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(items: &[i32]) -> Sequence {
        items.iter().map(|&n| Value::from(n)).collect()
    }

    #[test]
    fn sequence_search_and_join() {
        let s = seq(&[1, 2, 3]);
        assert_eq!(
            sequence_method(&s, "indexOf", &[Value::from(2)]).unwrap().unwrap(),
            Value::from(1)
        );
        assert_eq!(
            sequence_method(&s, "join", &[Value::from("-")]).unwrap().unwrap(),
            Value::from("1-2-3")
        );
        assert!(sequence_method(&s, "nope", &[]).is_none());
    }

    #[test]
    fn sequence_higher_order_methods() {
        let s = seq(&[1, 2, 3, 4]);
        let even = Value::function("even", |args| Ok(Value::from(args[0].to_number() % 2.0 == 0.0)));
        let out = sequence_method(&s, "filter", &[even]).unwrap().unwrap();
        assert_eq!(out.as_sequence().unwrap().to_vec(), vec![Value::from(2), Value::from(4)]);

        let add = Value::function("add", |args| Ok(Value::from(args[0].to_number() + args[1].to_number())));
        let sum = sequence_method(&s, "reduce", &[add, Value::from(0)]).unwrap().unwrap();
        assert_eq!(sum, Value::from(10));
    }

    #[test]
    fn slice_handles_negative_indices() {
        let s = seq(&[1, 2, 3, 4]);
        let out = sequence_method(&s, "slice", &[Value::from(-2)]).unwrap().unwrap();
        assert_eq!(out.as_sequence().unwrap().len(), 2);
        assert_eq!(
            string_method("hello", "slice", &[Value::from(1), Value::from(-1)]).unwrap().unwrap(),
            Value::from("ell")
        );
    }

    #[test]
    fn string_methods() {
        assert_eq!(
            string_method(" Hi ", "trim", &[]).unwrap().unwrap(),
            Value::from("Hi")
        );
        let parts = string_method("a,b", "split", &[Value::from(",")]).unwrap().unwrap();
        assert_eq!(parts.as_sequence().unwrap().len(), 2);
        assert_eq!(
            string_method("5", "padStart", &[Value::from(3), Value::from("0")]).unwrap().unwrap(),
            Value::from("005")
        );
    }

    #[test]
    fn number_formatting() {
        assert_eq!(
            number_method(3.14159, "toFixed", &[Value::from(2)]).unwrap().unwrap(),
            Value::from("3.14")
        );
    }

    #[test]
    fn globals() {
        let parse_int = global("parseInt").unwrap();
        assert_eq!(parse_int.call(&[Value::from("42px")]).unwrap(), Value::from(42));
        let math = global("Math").unwrap();
        let max = math.get_member("max").unwrap();
        assert_eq!(max.call(&[Value::from(1), Value::from(9)]).unwrap(), Value::from(9));
        assert!(global("window").is_none());
    }
}
