//! Interpolated text.
//!
//! `Hello {{ name | upper }}!` becomes the expression
//! `"Hello "+_s(_f("upper")(name))+"!"` and the token list
//! `["Hello ", {"@binding": ...}, "!"]`.

use std::collections::HashMap;
use std::sync::LazyLock;

use parking_lot::Mutex;
use regex::Regex;

use super::ast::TextToken;
use super::filter_parser::parse_filters;
use super::helpers::quote;

static DEFAULT_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{\{(.+?)\}\}").expect("valid interpolation regex"));

static DELIMITER_CACHE: LazyLock<Mutex<HashMap<(String, String), Regex>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

fn delimiter_regex(open: &str, close: &str) -> Regex {
    let mut cache = DELIMITER_CACHE.lock();
    cache
        .entry((open.to_string(), close.to_string()))
        .or_insert_with(|| {
            Regex::new(&format!(
                "(?s){}(.+?){}",
                regex::escape(open),
                regex::escape(close)
            ))
            .expect("escaped delimiters form a valid regex")
        })
        .clone()
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextParseResult {
    pub expression: String,
    pub tokens: Vec<TextToken>,
}

/// Split `text` on interpolations. Returns `None` when there are none.
pub fn parse_text(text: &str, delimiters: Option<&(String, String)>) -> Option<TextParseResult> {
    let custom;
    let re = match delimiters {
        Some((open, close)) => {
            custom = delimiter_regex(open, close);
            &custom
        }
        None => &*DEFAULT_TAG_RE,
    };
    if !re.is_match(text) {
        return None;
    }

    let mut parts = Vec::new();
    let mut tokens = Vec::new();
    let mut last_index = 0;
    for caps in re.captures_iter(text) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() > last_index {
            let literal = &text[last_index..whole.start()];
            parts.push(quote(literal));
            tokens.push(TextToken::Literal(literal.to_string()));
        }
        let exp = parse_filters(inner.as_str().trim());
        parts.push(format!("_s({exp})"));
        tokens.push(TextToken::Binding { binding: exp });
        last_index = whole.end();
    }
    if last_index < text.len() {
        let literal = &text[last_index..];
        parts.push(quote(literal));
        tokens.push(TextToken::Literal(literal.to_string()));
    }

    Some(TextParseResult {
        expression: parts.join("+"),
        tokens,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_has_no_result() {
        assert_eq!(parse_text("hello", None), None);
    }

    #[test]
    fn literals_and_bindings_alternate() {
        let res = parse_text("a {{ b }} c", None).unwrap();
        assert_eq!(res.expression, r#""a "+_s(b)+" c""#);
        assert_eq!(
            res.tokens,
            vec![
                TextToken::Literal("a ".into()),
                TextToken::Binding { binding: "b".into() },
                TextToken::Literal(" c".into()),
            ]
        );
    }

    #[test]
    fn filters_apply_inside_bindings() {
        let res = parse_text("{{ msg | upper }}", None).unwrap();
        assert_eq!(res.expression, r#"_s(_f("upper")(msg))"#);
    }

    #[test]
    fn custom_delimiters() {
        let delimiters = ("${".to_string(), "}".to_string());
        let res = parse_text("x ${ y }", Some(&delimiters)).unwrap();
        assert_eq!(res.expression, r#""x "+_s(y)"#);
        assert_eq!(parse_text("{{ y }}", Some(&delimiters)), None);
    }

    #[test]
    fn bindings_may_span_lines() {
        let res = parse_text("{{ a +\n b }}", None).unwrap();
        assert_eq!(res.expression, "_s(a +\n b)");
    }
}
