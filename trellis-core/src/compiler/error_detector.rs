//! Expression checks.
//!
//! After compilation every binding in the tree is run through the same
//! expression front end the render procedures use, so that a typo in
//! `:title="user.name +"` (or a construct the evaluator cannot run) is
//! reported against the template instead of failing at render time.

use std::sync::LazyLock;

use regex::Regex;

use super::ast::{AstElement, AstNode};
use super::diagnostics::{Diagnostics, Span};
use super::filter_parser::parse_filters;
use crate::expr::{is_reserved_word, parse_params, parse_program};

static DIR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^v-|^@|^:|^#").expect("valid directive regex"));
static ON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@|^v-on:").expect("valid v-on regex"));

static PROHIBITED_KEYWORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    let keywords = "do,if,for,let,new,try,var,case,else,with,await,break,catch,class,const,\
                    super,throw,while,yield,delete,export,import,return,switch,default,\
                    extends,finally,continue,debugger,function,arguments";
    let alternation = keywords
        .split(',')
        .map(|k| format!(r"\b{k}\b"))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&alternation).expect("valid keyword regex")
});

static UNARY_OPERATORS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bdelete\s*\([^\)]*\)|\btypeof\s*\([^\)]*\)|\bvoid\s*\([^\)]*\)")
        .expect("valid unary operator regex")
});

/// String literals and template-literal text, which may contain anything.
static STRIP_STRING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"'(?:[^'\\]|\\.)*'|"(?:[^"\\]|\\.)*"|`(?:[^`\\]|\\.)*\$\{|\}(?:[^`\\]|\\.)*`|`(?:[^`\\]|\\.)*`"#,
    )
    .expect("valid string literal regex")
});

/// Report every binding in `ast` that does not parse.
pub fn detect_errors(ast: Option<&AstElement>, diagnostics: &mut Diagnostics) {
    if let Some(root) = ast {
        check_element(root, diagnostics);
    }
}

fn check_element(el: &AstElement, diagnostics: &mut Diagnostics) {
    for (name, value) in &el.attrs_map {
        if !DIR_RE.is_match(name) || value.is_empty() {
            continue;
        }
        let text = format!("{name}=\"{value}\"");
        let span = Span::from(el.raw_attrs_map.get(name.as_str()));
        if name == "v-for" {
            check_for(el, &text, span, diagnostics);
        } else if name.starts_with("v-slot") || name.starts_with('#') {
            check_function_parameters(value, &text, span, diagnostics);
        } else if ON_RE.is_match(name) {
            check_event(value, &text, span, diagnostics);
        } else {
            check_expression(&parse_filters(value), &text, span, diagnostics);
        }
    }

    for child in &el.children {
        match child {
            AstNode::Element(child) => check_element(child, diagnostics),
            AstNode::Expression(e) => check_expression(
                &e.expression,
                &e.text,
                Span {
                    start: e.start,
                    end: e.end,
                },
                diagnostics,
            ),
            AstNode::Text(_) => {}
        }
    }
    for condition in &el.if_conditions {
        check_element(&condition.block, diagnostics);
    }
    for slot in el.scoped_slots.values() {
        check_element(slot, diagnostics);
    }
}

fn check_for(el: &AstElement, text: &str, span: Span, diagnostics: &mut Diagnostics) {
    let exp = el.for_exp.as_deref().unwrap_or_default();
    check_expression(&parse_filters(exp), text, span, diagnostics);
    for (ident, kind) in [
        (&el.alias, "v-for alias"),
        (&el.iterator1, "v-for iterator"),
        (&el.iterator2, "v-for iterator"),
    ] {
        if let Some(ident) = ident {
            check_identifier(ident, kind, text, span, diagnostics);
        }
    }
}

fn check_identifier(ident: &str, kind: &str, text: &str, span: Span, diagnostics: &mut Diagnostics) {
    let valid = !is_reserved_word(ident) && parse_params(ident).is_ok_and(|params| params.len() == 1);
    if !valid {
        diagnostics.error(
            format!("invalid {kind} \"{ident}\" in expression: {}", text.trim()),
            span,
        );
    }
}

fn check_event(exp: &str, text: &str, span: Span, diagnostics: &mut Diagnostics) {
    let stripped = STRIP_STRING_RE.replace_all(exp, "");
    if let Some(m) = UNARY_OPERATORS_RE.find(&stripped) {
        if !stripped[..m.start()].ends_with('$') {
            diagnostics.error(
                format!(
                    "avoid using JavaScript unary operator as property name: \"{}\" in expression {}",
                    m.as_str(),
                    text.trim()
                ),
                span,
            );
        }
    }
    check_expression(exp, text, span, diagnostics);
}

fn check_expression(exp: &str, text: &str, span: Span, diagnostics: &mut Diagnostics) {
    let Err(err) = parse_program(&format!("return {exp}")) else {
        return;
    };
    let stripped = STRIP_STRING_RE.replace_all(exp, "");
    let message = match PROHIBITED_KEYWORD_RE.find(&stripped) {
        Some(keyword) => format!(
            "avoid using JavaScript keyword as property name: \"{}\"\n  Raw expression: {}",
            keyword.as_str(),
            text.trim()
        ),
        None => format!(
            "invalid expression: {err} in\n\n    {exp}\n\n  Raw expression: {}\n",
            text.trim()
        ),
    };
    diagnostics.error(message, span);
}

fn check_function_parameters(exp: &str, text: &str, span: Span, diagnostics: &mut Diagnostics) {
    if let Err(err) = parse_params(exp) {
        diagnostics.error(
            format!(
                "invalid function parameter expression: {err} in\n\n    {exp}\n\n  Raw expression: {}\n",
                text.trim()
            ),
            span,
        );
    }
}
