//! Template parser.
//!
//! Drives the [tokenizer](super::html_parser) and turns its events into an
//! [`AstElement`] tree, extracting structural directives as it goes.
//!
//! # Element Processing
//!
//! When a tag opens, `v-pre`, `v-for`, `v-if` / `v-else-if` / `v-else` and
//! `v-once` are extracted. When it closes (and its children are known),
//! the rest follows in a fixed order: `key`, `ref`, slot syntax, `<slot>`
//! outlets, `is`, module transforms, and finally every remaining attribute
//! (`v-bind`, `v-on`, custom directives, static attributes).
//!
//! Structural mistakes are reported as diagnostics and parsing carries on
//! with a best-effort tree.

use std::sync::LazyLock;

use regex::Regex;

use super::ast::{AstAttr, AstElement, AstExpression, AstNode, AstText, IfCondition, Modifiers};
use super::diagnostics::{Diagnostics, Span};
use super::directives::gen_assignment_code;
use super::entities::decode_html;
use super::filter_parser::parse_filters;
use super::helpers::quote;
use super::html_parser::{parse_html, HtmlSink};
use super::modules::TransformContext;
use super::options::{CompilerOptions, WhitespaceMode};
use super::text_parser::parse_text;
use crate::util::{camelize, hyphenate};

static DIR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^v-|^@|^:|^#").expect("valid directive regex"));
static ON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@|^v-on:").expect("valid v-on regex"));
static BIND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^:|^v-bind:").expect("valid v-bind regex"));
static DYNAMIC_ARG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[.*\]$").expect("valid dynamic argument regex"));
static SLOT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^v-slot(:|$)|^#").expect("valid slot regex"));
static FOR_ALIAS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)(.*?)\s+(?:in|of)\s+(.*)").expect("valid v-for regex"));
static FOR_ITERATOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r",([^,\}\]]*)(?:,([^,\}\]]*))?$").expect("valid v-for iterator regex")
});
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \f\t\r\n]+").expect("valid whitespace regex"));
static INVALID_ATTRIBUTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[\s"'<>/=]"#).expect("valid attribute name regex"));

/// Slot scope of a `v-slot` without a value.
pub const EMPTY_SLOT_SCOPE_TOKEN: &str = "_empty_";

/// The pieces of a `v-for` expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForParseResult {
    pub for_exp: String,
    pub alias: String,
    pub iterator1: Option<String>,
    pub iterator2: Option<String>,
}

/// Split `(item, index) in list` into its parts.
pub fn parse_for(exp: &str) -> Option<ForParseResult> {
    let caps = FOR_ALIAS_RE.captures(exp)?;
    let for_exp = caps[2].trim().to_string();
    let alias = caps[1].trim();
    let alias = alias.strip_prefix('(').unwrap_or(alias);
    let alias = alias.strip_suffix(')').unwrap_or(alias);

    match FOR_ITERATOR_RE.captures(alias) {
        Some(it) => {
            let iterator2 = it
                .get(2)
                .map(|m| m.as_str().trim().to_string())
                .filter(|s| !s.is_empty());
            Some(ForParseResult {
                for_exp,
                alias: FOR_ITERATOR_RE.replace(alias, "").trim().to_string(),
                iterator1: Some(it[1].trim().to_string()),
                iterator2,
            })
        }
        None => Some(ForParseResult {
            for_exp,
            alias: alias.to_string(),
            iterator1: None,
            iterator2: None,
        }),
    }
}

/// Parse `template` into its root element.
pub fn parse(
    template: &str,
    options: &CompilerOptions,
    diagnostics: &mut Diagnostics,
) -> Option<AstElement> {
    let mut builder = TreeBuilder {
        template,
        options,
        diagnostics,
        stack: Vec::new(),
        root: None,
        root_seen: false,
        in_v_pre: false,
        in_pre: false,
        warned: false,
        preserve_whitespace: options.preserve_whitespace != Some(false),
        whitespace: options.whitespace,
        with_ranges: options.output_source_range.unwrap_or(false),
    };
    parse_html(template, options, &mut builder);
    builder.root
}

struct TreeBuilder<'a> {
    template: &'a str,
    options: &'a CompilerOptions,
    diagnostics: &'a mut Diagnostics,
    stack: Vec<AstElement>,
    root: Option<AstElement>,
    root_seen: bool,
    in_v_pre: bool,
    in_pre: bool,
    warned: bool,
    preserve_whitespace: bool,
    whitespace: Option<WhitespaceMode>,
    with_ranges: bool,
}

fn element_span(el: &AstElement) -> Span {
    Span {
        start: el.start,
        end: None,
    }
}

fn is_text_tag(el: &AstElement) -> bool {
    el.tag == "script" || el.tag == "style"
}

fn is_forbidden_tag(el: &AstElement) -> bool {
    el.tag == "style"
        || (el.tag == "script"
            && el
                .attr("type")
                .map_or(true, |ty| ty.is_empty() || ty == "text/javascript"))
}

impl TreeBuilder<'_> {
    fn warn_once(&mut self, message: impl Into<String>, span: Span) {
        if !self.warned {
            self.warned = true;
            self.diagnostics.error(message, span);
        }
    }

    fn check_root_constraints(&mut self, el: &AstElement) {
        if el.tag == "slot" || el.tag == "template" {
            self.warn_once(
                format!(
                    "Cannot use <{}> as component root element because it may \
                     contain multiple nodes.",
                    el.tag
                ),
                element_span(el),
            );
        }
        if el.has_attr("v-for") {
            self.warn_once(
                "Cannot use v-for on stateful component root element because \
                 it renders multiple elements.",
                Span::from(el.raw_attrs_map.get("v-for")),
            );
        }
    }

    fn trim_ending_whitespace(&self, el: &mut AstElement) {
        if self.in_pre {
            return;
        }
        while matches!(el.children.last(), Some(AstNode::Text(t)) if t.text == " ") {
            el.children.pop();
        }
    }

    fn close_element(&mut self, mut element: AstElement) {
        self.trim_ending_whitespace(&mut element);
        if !self.in_v_pre && !element.processed {
            let mut cx = TransformContext {
                options: self.options,
                diagnostics: &mut *self.diagnostics,
                ancestors: &self.stack,
            };
            process_element(&mut element, &self.stack, &mut cx);
        }
        self.trim_ending_whitespace(&mut element);

        if element.pre {
            self.in_v_pre = false;
        }
        if self.options.pre(&element.tag) {
            self.in_pre = false;
        }
        for module in &self.options.modules {
            let mut cx = TransformContext {
                options: self.options,
                diagnostics: &mut *self.diagnostics,
                ancestors: &self.stack,
            };
            module.post_transform_node(&mut element, &mut cx);
        }

        if self.stack.is_empty() {
            self.attach_to_root(element);
        } else if !element.forbidden {
            self.attach_to_parent(element);
        }
    }

    fn attach_to_root(&mut self, element: AstElement) {
        let chains_root = match &self.root {
            None => {
                self.root = Some(element);
                return;
            }
            Some(root) => {
                root.if_exp.is_some() && (element.else_if.is_some() || element.is_else)
            }
        };
        if chains_root {
            self.check_root_constraints(&element);
            if let Some(root) = self.root.as_mut() {
                root.if_conditions.push(IfCondition {
                    exp: element.else_if.clone(),
                    block: element,
                });
            }
        } else {
            self.warn_once(
                "Component template should contain exactly one root element. \
                 If you are using v-if on multiple elements, \
                 use v-else-if to chain them instead.",
                element_span(&element),
            );
        }
    }

    fn attach_to_parent(&mut self, element: AstElement) {
        let Some(parent) = self.stack.last_mut() else {
            return;
        };
        if element.else_if.is_some() || element.is_else {
            process_if_conditions(element, parent, self.diagnostics);
        } else if element.slot_scope.is_some() {
            let name = element
                .slot_target
                .clone()
                .unwrap_or_else(|| "\"default\"".to_string());
            parent.scoped_slots.insert(name, element);
        } else {
            parent.children.push(AstNode::Element(Box::new(element)));
        }
    }
}

impl HtmlSink for TreeBuilder<'_> {
    fn start(&mut self, tag: &str, attrs: Vec<AstAttr>, unary: bool, start: usize, end: usize) {
        let ns = self
            .stack
            .last()
            .and_then(|parent| parent.ns.clone())
            .or_else(|| self.options.namespace(tag));

        let mut seen = std::collections::HashSet::new();
        for attr in &attrs {
            if !seen.insert(attr.name.as_str()) {
                self.diagnostics
                    .error(format!("duplicate attribute: {}", attr.name), Span::from(attr));
            }
        }

        let mut element = AstElement::new(tag, attrs);
        element.ns = ns;

        if self.with_ranges {
            element.start = Some(start);
            element.end = Some(end);
            element.raw_attrs_map = element
                .attrs_list
                .iter()
                .map(|attr| (attr.name.clone(), attr.clone()))
                .collect();
        }
        for attr in &element.attrs_list {
            if INVALID_ATTRIBUTE_RE.is_match(&attr.name) {
                let span = match attr.start {
                    Some(s) => Span::new(
                        s + attr.name.find('[').unwrap_or(0),
                        s + attr.name.len(),
                    ),
                    None => Span::NONE,
                };
                self.diagnostics.error(
                    "Invalid dynamic argument expression: attribute names cannot contain \
                     spaces, quotes, <, >, / or =.",
                    span,
                );
            }
        }

        if is_forbidden_tag(&element) {
            element.forbidden = true;
            self.diagnostics.error(
                format!(
                    "Templates should only be responsible for mapping the state to the \
                     UI. Avoid placing tags with side-effects in your templates, such as \
                     <{tag}>, as they will not be parsed."
                ),
                element_span(&element),
            );
        }

        for module in &self.options.modules {
            let mut cx = TransformContext {
                options: self.options,
                diagnostics: &mut *self.diagnostics,
                ancestors: &self.stack,
            };
            module.pre_transform_node(&mut element, &mut cx);
        }

        if !self.in_v_pre {
            if element.get_and_remove_attr("v-pre", false).is_some() {
                element.pre = true;
                self.in_v_pre = true;
            }
        }
        if self.options.pre(&element.tag) {
            self.in_pre = true;
        }
        if self.in_v_pre {
            process_raw_attrs(&mut element);
        } else {
            process_for(&mut element, self.diagnostics);
            process_if(&mut element);
            if element.get_and_remove_attr("v-once", false).is_some() {
                element.once = true;
            }
        }

        if !self.root_seen {
            self.root_seen = true;
            self.check_root_constraints(&element);
        }

        if unary {
            self.close_element(element);
        } else {
            self.stack.push(element);
        }
    }

    fn end(&mut self, _tag: &str, _start: usize, end: usize) {
        let Some(mut element) = self.stack.pop() else {
            return;
        };
        if self.with_ranges {
            element.end = Some(end);
        }
        self.close_element(element);
    }

    fn chars(&mut self, text: &str, start: Option<usize>, end: Option<usize>) {
        let Some(parent) = self.stack.last_mut() else {
            let span = Span { start, end: None };
            if text == self.template {
                self.warn_once(
                    "Component template requires a root element, rather than just text.",
                    span,
                );
            } else if !text.trim().is_empty() {
                self.warn_once(
                    format!("text \"{}\" outside root element will be ignored.", text.trim()),
                    span,
                );
            }
            return;
        };

        let mut text = if self.in_pre || !text.trim().is_empty() {
            if is_text_tag(parent) {
                text.to_string()
            } else {
                decode_html(text)
            }
        } else if parent.children.is_empty() {
            String::new()
        } else if let Some(mode) = self.whitespace {
            match mode {
                WhitespaceMode::Condense if text.contains(['\r', '\n']) => String::new(),
                _ => " ".to_string(),
            }
        } else if self.preserve_whitespace {
            " ".to_string()
        } else {
            String::new()
        };

        if text.is_empty() {
            return;
        }
        if !self.in_pre && self.whitespace == Some(WhitespaceMode::Condense) {
            text = WHITESPACE_RE.replace_all(&text, " ").into_owned();
        }

        let (start, end) = if self.with_ranges { (start, end) } else { (None, None) };
        let parsed = if !self.in_v_pre && text != " " {
            parse_text(&text, self.options.delimiters.as_ref())
        } else {
            None
        };
        let child = match parsed {
            Some(res) => Some(AstNode::Expression(AstExpression {
                expression: res.expression,
                tokens: res.tokens,
                text,
                is_static: false,
                start,
                end,
            })),
            None => {
                let after_space = parent.children.last().and_then(AstNode::text) == Some(" ");
                (text != " " || parent.children.is_empty() || !after_space).then(|| {
                    AstNode::Text(AstText {
                        start,
                        end,
                        ..AstText::new(text)
                    })
                })
            }
        };
        if let Some(child) = child {
            parent.children.push(child);
        }
    }

    fn comment(&mut self, text: &str, start: usize, end: usize) {
        let with_ranges = self.with_ranges;
        if let Some(parent) = self.stack.last_mut() {
            let mut node = AstText::new(text);
            node.is_comment = true;
            if with_ranges {
                node.start = Some(start);
                node.end = Some(end);
            }
            parent.children.push(AstNode::Text(node));
        }
    }

    fn warn(&mut self, message: String, span: Span) {
        self.diagnostics.error(message, span);
    }
}

fn process_raw_attrs(el: &mut AstElement) {
    if el.attrs_list.is_empty() {
        if !el.pre {
            el.plain = true;
        }
        return;
    }
    el.attrs = el
        .attrs_list
        .iter()
        .map(|attr| AstAttr {
            value: quote(&attr.value),
            ..attr.clone()
        })
        .collect();
}

pub(crate) fn process_for(el: &mut AstElement, diagnostics: &mut Diagnostics) {
    let Some(exp) = el.get_and_remove_attr("v-for", false).filter(|e| !e.is_empty()) else {
        return;
    };
    match parse_for(&exp) {
        Some(res) => {
            el.for_exp = Some(res.for_exp);
            el.alias = Some(res.alias);
            el.iterator1 = res.iterator1;
            el.iterator2 = res.iterator2;
        }
        None => diagnostics.error(
            format!("Invalid v-for expression: {exp}"),
            Span::from(el.raw_attrs_map.get("v-for")),
        ),
    }
}

fn process_if(el: &mut AstElement) {
    if let Some(exp) = el.get_and_remove_attr("v-if", false).filter(|e| !e.is_empty()) {
        el.if_exp = Some(exp);
        return;
    }
    if el.get_and_remove_attr("v-else", false).is_some() {
        el.is_else = true;
    }
    if let Some(exp) = el.get_and_remove_attr("v-else-if", false).filter(|e| !e.is_empty()) {
        el.else_if = Some(exp);
    }
}

/// Attach a `v-else-if` / `v-else` element to the `v-if` sibling before it.
fn process_if_conditions(el: AstElement, parent: &mut AstElement, diagnostics: &mut Diagnostics) {
    // Text between the branches is dropped.
    while let Some(last) = parent.children.last() {
        if last.as_element().is_some() {
            break;
        }
        if let Some(text) = last.text().filter(|t| *t != " ") {
            let span = match last {
                AstNode::Expression(e) => Span { start: e.start, end: e.end },
                AstNode::Text(t) => Span { start: t.start, end: t.end },
                AstNode::Element(_) => Span::NONE,
            };
            diagnostics.error(
                format!(
                    "text \"{}\" between v-if and v-else(-if) will be ignored.",
                    text.trim()
                ),
                span,
            );
        }
        parent.children.pop();
    }

    let prev = parent
        .children
        .last_mut()
        .and_then(AstNode::as_element_mut)
        .filter(|prev| prev.if_exp.is_some());
    match prev {
        Some(prev) => prev.if_conditions.push(IfCondition {
            exp: el.else_if.clone(),
            block: el,
        }),
        None => {
            let (message, attr) = match &el.else_if {
                Some(exp) => (format!("v-else-if=\"{exp}\""), "v-else-if"),
                None => ("v-else".to_string(), "v-else"),
            };
            diagnostics.error(
                format!(
                    "{message} used on element <{}> without corresponding v-if.",
                    el.tag
                ),
                Span::from(el.raw_attrs_map.get(attr)),
            );
        }
    }
}

/// Whether `el` may be a component rather than a platform element.
fn maybe_component(el: &AstElement, options: &CompilerOptions) -> bool {
    el.component.is_some()
        || el.has_attr(":is")
        || el.has_attr("v-bind:is")
        || !match el.attr("is") {
            Some(is) => options.reserved(is),
            None => options.reserved(&el.tag),
        }
}

/// Finish an element whose children are known. `ancestors` are the open
/// elements above it, outermost first.
pub(crate) fn process_element(
    el: &mut AstElement,
    ancestors: &[AstElement],
    cx: &mut TransformContext<'_>,
) {
    process_key(el, ancestors, cx.diagnostics);

    el.plain = el.key.is_none() && el.scoped_slots.is_empty() && el.attrs_list.is_empty();

    if let Some(r) = el.get_binding_attr("ref", true) {
        el.ref_exp = Some(r);
        el.ref_in_for = el.for_exp.is_some() || ancestors.iter().any(|a| a.for_exp.is_some());
    }

    process_slot_content(el, ancestors.last(), cx);
    process_slot_outlet(el, cx.diagnostics);

    if let Some(binding) = el.get_binding_attr("is", true) {
        el.component = Some(binding);
    }
    if el.get_and_remove_attr("inline-template", false).is_some() {
        el.inline_template = true;
    }

    for module in &cx.options.modules {
        module.transform_node(el, cx);
    }

    process_attrs(el, ancestors, cx);
}

fn process_key(el: &mut AstElement, ancestors: &[AstElement], diagnostics: &mut Diagnostics) {
    let Some(exp) = el.get_binding_attr("key", true) else {
        return;
    };
    if el.tag == "template" {
        diagnostics.error(
            "<template> cannot be keyed. Place the key on real elements instead.",
            Span::from(el.get_raw_binding_attr("key")),
        );
    }
    if el.for_exp.is_some() {
        let iterator = el.iterator2.as_ref().or(el.iterator1.as_ref());
        let in_transition_group = ancestors.last().is_some_and(|p| p.tag == "transition-group");
        if iterator == Some(&exp) && in_transition_group {
            diagnostics.tip(
                "Do not use v-for index as key on <transition-group> children, \
                 this is the same as not using keys.",
                Span::from(el.get_raw_binding_attr("key")),
            );
        }
    }
    el.key = Some(exp);
}

fn process_slot_content(
    el: &mut AstElement,
    parent: Option<&AstElement>,
    cx: &mut TransformContext<'_>,
) {
    if el.tag == "template" {
        let scope = el.get_and_remove_attr("scope", false);
        if scope.is_some() {
            cx.diagnostics.tip(
                "the \"scope\" attribute for scoped slots have been deprecated and \
                 replaced by \"slot-scope\" since 2.5. The new \"slot-scope\" attribute \
                 can also be used on plain elements in addition to <template> to \
                 denote scoped slots.",
                Span::from(el.raw_attrs_map.get("scope")),
            );
        }
        el.slot_scope = scope.or_else(|| el.get_and_remove_attr("slot-scope", false));
    } else if let Some(scope) = el.get_and_remove_attr("slot-scope", false) {
        if el.has_attr("v-for") {
            cx.diagnostics.tip(
                format!(
                    "Ambiguous combined usage of slot-scope and v-for on <{}> \
                     (v-for takes higher priority). Use a wrapper <template> for the \
                     scoped slot to make it clearer.",
                    el.tag
                ),
                Span::from(el.raw_attrs_map.get("slot-scope")),
            );
        }
        el.slot_scope = Some(scope);
    }

    if let Some(target) = el.get_binding_attr("slot", true) {
        el.slot_target = Some(if target == "\"\"" {
            "\"default\"".to_string()
        } else {
            target.clone()
        });
        el.slot_target_dynamic = el.has_attr(":slot") || el.has_attr("v-bind:slot");
        if el.tag != "template" && el.slot_scope.is_none() {
            let span = Span::from(el.get_raw_binding_attr("slot"));
            el.add_attr("slot", &target, span, false);
        }
    }

    let Some(binding) = el.get_and_remove_attr_by_regex(&SLOT_RE) else {
        return;
    };
    let binding_span = Span::from(&binding);

    if el.tag == "template" {
        if el.slot_target.is_some() || el.slot_scope.is_some() {
            cx.diagnostics
                .error("Unexpected mixed usage of different slot syntaxes.", element_span(el));
        }
        if parent.is_some_and(|p| !maybe_component(p, cx.options)) {
            cx.diagnostics.error(
                "<template v-slot> can only appear at the root level inside \
                 the receiving component",
                element_span(el),
            );
        }
        let (name, dynamic) = slot_name(&binding, cx.diagnostics);
        el.slot_target = Some(name);
        el.slot_target_dynamic = dynamic;
        el.slot_scope = Some(non_empty_scope(&binding.value));
        return;
    }

    if !maybe_component(el, cx.options) {
        cx.diagnostics
            .error("v-slot can only be used on components or <template>.", binding_span);
    }
    if el.slot_scope.is_some() || el.slot_target.is_some() {
        cx.diagnostics
            .error("Unexpected mixed usage of different slot syntaxes.", element_span(el));
    }
    if !el.scoped_slots.is_empty() {
        cx.diagnostics.error(
            "To avoid scope ambiguity, the default slot should also use \
             <template> syntax when there are other named slots.",
            binding_span,
        );
    }
    let (name, dynamic) = slot_name(&binding, cx.diagnostics);
    let mut container = AstElement::new("template", Vec::new());
    container.slot_target = Some(name.clone());
    container.slot_target_dynamic = dynamic;
    container.children = std::mem::take(&mut el.children);
    container.slot_scope = Some(non_empty_scope(&binding.value));
    el.scoped_slots.insert(name, container);
    el.plain = false;
}

fn non_empty_scope(value: &str) -> String {
    if value.is_empty() {
        EMPTY_SLOT_SCOPE_TOKEN.to_string()
    } else {
        value.to_string()
    }
}

/// `v-slot:header` → `"header"`, `#[name]` → `name` (dynamic).
fn slot_name(binding: &AstAttr, diagnostics: &mut Diagnostics) -> (String, bool) {
    let mut name = SLOT_RE.replace(&binding.name, "").into_owned();
    if name.is_empty() {
        if binding.name.starts_with('#') {
            diagnostics.error("v-slot shorthand syntax requires a slot name.", Span::from(binding));
        } else {
            name = "default".to_string();
        }
    }
    if DYNAMIC_ARG_RE.is_match(&name) {
        (name[1..name.len() - 1].to_string(), true)
    } else {
        (format!("\"{name}\""), false)
    }
}

fn process_slot_outlet(el: &mut AstElement, diagnostics: &mut Diagnostics) {
    if el.tag != "slot" {
        return;
    }
    el.slot_name = el.get_binding_attr("name", true);
    if el.key.is_some() {
        diagnostics.error(
            "`key` does not work on <slot> because slots are abstract outlets \
             and can possibly expand into multiple elements. \
             Use the key on a wrapping element instead.",
            Span::from(el.get_raw_binding_attr("key")),
        );
    }
}

/// Split `click.stop.prevent` into `click` and its modifiers. Dots inside
/// a dynamic argument (`[a.b]`) are not modifiers.
fn split_modifiers(name: &str) -> (String, Option<Modifiers>) {
    let tail_start = name.rfind(']').map_or(0, |i| i + 1);
    let Some(dot) = name[tail_start..].find('.') else {
        return (name.to_string(), None);
    };
    let modifiers: Modifiers = name[tail_start + dot + 1..]
        .split('.')
        .filter(|m| !m.is_empty())
        .collect();
    if modifiers.is_empty() {
        return (name.to_string(), None);
    }
    (name[..tail_start + dot].to_string(), Some(modifiers))
}

fn strip_dynamic(name: &str) -> (String, bool) {
    if DYNAMIC_ARG_RE.is_match(name) {
        (name[1..name.len() - 1].to_string(), true)
    } else {
        (name.to_string(), false)
    }
}

fn process_attrs(el: &mut AstElement, ancestors: &[AstElement], cx: &mut TransformContext<'_>) {
    let list = el.attrs_list.clone();
    for attr in &list {
        let raw_name = attr.name.as_str();
        let span = Span::from(attr);

        if !DIR_RE.is_match(raw_name) {
            if parse_text(&attr.value, cx.options.delimiters.as_ref()).is_some() {
                cx.diagnostics.error(
                    format!(
                        "{raw_name}=\"{}\": Interpolation inside attributes has been removed. \
                         Use v-bind or the colon shorthand instead. For example, \
                         instead of <div id=\"{{{{ val }}}}\">, use <div :id=\"val\">.",
                        attr.value
                    ),
                    span,
                );
            }
            el.add_attr(raw_name, &quote(&attr.value), span, false);
            if el.component.is_none()
                && raw_name == "muted"
                && cx.options.uses_prop(&el.tag, el.attr("type"), raw_name)
            {
                el.add_prop(raw_name, "true", span, false);
            }
            continue;
        }

        el.has_bindings = true;
        let stripped = DIR_RE.replace(raw_name, "");
        let (_, modifiers) = split_modifiers(&stripped);
        let name = if modifiers.is_some() {
            split_modifiers(raw_name).0
        } else {
            raw_name.to_string()
        };

        if BIND_RE.is_match(&name) {
            let (mut name, dynamic) = strip_dynamic(&BIND_RE.replace(&name, ""));
            let value = parse_filters(&attr.value);
            if value.trim().is_empty() {
                cx.diagnostics.error(
                    format!(
                        "The value for a v-bind expression cannot be empty. Found in \"v-bind:{name}\""
                    ),
                    Span::NONE,
                );
            }
            let has = |m: &str| modifiers.as_ref().is_some_and(|mods| mods.has(m));
            if has("prop") && !dynamic {
                name = camelize(&name);
                if name == "innerHtml" {
                    name = "innerHTML".to_string();
                }
            }
            if has("camel") && !dynamic {
                name = camelize(&name);
            }
            if has("sync") {
                let sync_gen = gen_assignment_code(&value, "$event");
                if dynamic {
                    el.add_handler(
                        &format!("\"update:\"+({name})"),
                        &sync_gen,
                        None,
                        false,
                        Some(&mut *cx.diagnostics),
                        span,
                        true,
                    );
                } else {
                    let camel = camelize(&name);
                    let hyphen = hyphenate(&name);
                    el.add_handler(
                        &format!("update:{camel}"),
                        &sync_gen,
                        None,
                        false,
                        Some(&mut *cx.diagnostics),
                        span,
                        false,
                    );
                    if hyphen != camel {
                        el.add_handler(
                            &format!("update:{hyphen}"),
                            &sync_gen,
                            None,
                            false,
                            Some(&mut *cx.diagnostics),
                            span,
                            false,
                        );
                    }
                }
            }
            let as_prop = has("prop")
                || (el.component.is_none() && cx.options.uses_prop(&el.tag, el.attr("type"), &name));
            if as_prop {
                el.add_prop(&name, &value, span, dynamic);
            } else {
                el.add_attr(&name, &value, span, dynamic);
            }
        } else if ON_RE.is_match(&name) {
            let (name, dynamic) = strip_dynamic(&ON_RE.replace(&name, ""));
            el.add_handler(
                &name,
                &attr.value,
                modifiers,
                false,
                Some(&mut *cx.diagnostics),
                span,
                dynamic,
            );
        } else {
            let mut name = DIR_RE.replace(&name, "").into_owned();
            let mut arg = None;
            let mut dynamic = false;
            if let Some(colon) = name.find(':') {
                let raw_arg = name[colon + 1..].to_string();
                name.truncate(colon);
                let (stripped, is_dynamic) = strip_dynamic(&raw_arg);
                dynamic = is_dynamic;
                arg = Some(stripped).filter(|a| !a.is_empty());
            }
            el.add_directive(&name, raw_name, &attr.value, arg, dynamic, modifiers, span);
            if name == "model" {
                check_for_alias_model(el, &attr.value, ancestors, cx.diagnostics);
            }
        }
    }
}

fn check_for_alias_model(
    el: &AstElement,
    value: &str,
    ancestors: &[AstElement],
    diagnostics: &mut Diagnostics,
) {
    let chain = std::iter::once(el).chain(ancestors.iter().rev());
    for scope in chain {
        if scope.for_exp.is_some() && scope.alias.as_deref() == Some(value) {
            diagnostics.error(
                format!(
                    "<{} v-model=\"{value}\">: You are binding v-model directly to a v-for \
                     iteration alias. This will not be able to modify the v-for source array \
                     because writing to the alias is like modifying a function local variable. \
                     Consider using an array of objects and use v-model on an object property \
                     instead.",
                    el.tag
                ),
                Span::from(el.raw_attrs_map.get("v-model")),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_web(template: &str) -> (Option<AstElement>, Diagnostics) {
        parse_with(template, &CompilerOptions::web())
    }

    fn parse_with(template: &str, options: &CompilerOptions) -> (Option<AstElement>, Diagnostics) {
        let mut diagnostics = Diagnostics::default();
        let root = parse(template, options, &mut diagnostics);
        (root, diagnostics)
    }

    fn messages(diagnostics: &Diagnostics) -> Vec<String> {
        diagnostics.errors().iter().map(|d| d.message.clone()).collect()
    }

    #[test]
    fn v_for_alias_and_iterators() {
        let res = parse_for("item in list").unwrap();
        assert_eq!(res.alias, "item");
        assert_eq!(res.for_exp, "list");
        assert_eq!(res.iterator1, None);

        let res = parse_for("(item, idx) in list").unwrap();
        assert_eq!(res.alias, "item");
        assert_eq!(res.iterator1.as_deref(), Some("idx"));

        let res = parse_for("(v, k, i) of obj").unwrap();
        assert_eq!(res.iterator2.as_deref(), Some("i"));

        let res = parse_for("{ a, b } in list").unwrap();
        assert_eq!(res.alias, "{ a, b }");
        assert_eq!(res.iterator1, None);

        assert!(parse_for("nonsense").is_none());
    }

    #[test]
    fn interpolation_becomes_an_expression_node() {
        let (root, diagnostics) = parse_web("<div>{{ msg }}</div>");
        let root = root.unwrap();
        assert!(diagnostics.errors().is_empty());
        match &root.children[0] {
            AstNode::Expression(e) => assert_eq!(e.expression, "_s(msg)"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn mismatched_close_tag_still_yields_root() {
        let (root, diagnostics) = parse_web("<div><span></div>");
        let root = root.unwrap();
        assert_eq!(root.tag, "div");
        assert_eq!(root.element_children().next().unwrap().tag, "span");
        assert!(messages(&diagnostics)
            .iter()
            .any(|m| m == "tag <span> has no matching end tag."));
    }

    #[test]
    fn if_chains_collect_branches_and_drop_text_between() {
        let (root, diagnostics) =
            parse_web("<div><p v-if=\"a\">A</p> junk <p v-else-if=\"b\">B</p><p v-else>C</p></div>");
        let root = root.unwrap();
        let children: Vec<_> = root.element_children().collect();
        assert_eq!(children.len(), 1);
        let first = children[0];
        assert_eq!(first.if_exp.as_deref(), Some("a"));
        assert_eq!(first.if_conditions.len(), 2);
        assert_eq!(first.if_conditions[0].exp.as_deref(), Some("b"));
        assert_eq!(first.if_conditions[1].exp, None);
        assert!(messages(&diagnostics)
            .iter()
            .any(|m| m == "text \"junk\" between v-if and v-else(-if) will be ignored."));
    }

    #[test]
    fn else_without_if_is_dropped() {
        let (root, diagnostics) = parse_web("<div><p v-else>x</p></div>");
        assert!(root.unwrap().children.is_empty());
        assert_eq!(
            messages(&diagnostics),
            vec!["v-else used on element <p> without corresponding v-if."]
        );
    }

    #[test]
    fn root_constraints() {
        let (_, d) = parse_web("<div v-for=\"i in list\"></div>");
        assert!(messages(&d)[0].starts_with("Cannot use v-for on stateful component root"));

        let (_, d) = parse_web("<template><div></div></template>");
        assert!(messages(&d)[0].starts_with("Cannot use <template> as component root"));

        let (_, d) = parse_web("<div></div><p></p>");
        assert!(messages(&d)[0].starts_with("Component template should contain exactly one root"));

        let (root, d) = parse_web("<div v-if=\"a\"></div><p v-else></p>");
        assert!(d.errors().is_empty());
        assert_eq!(root.unwrap().if_conditions.len(), 1);
    }

    #[test]
    fn text_outside_root() {
        let (root, d) = parse_web("just text");
        assert!(root.is_none());
        assert_eq!(
            messages(&d),
            vec!["Component template requires a root element, rather than just text."]
        );
    }

    #[test]
    fn bindings_events_and_directives() {
        let (root, _) = parse_web(
            "<input :value=\"v\" @click.stop=\"go\" v-focus:arg.lazy=\"x\" :[key]=\"y\" title=\"t\">",
        );
        let root = root.unwrap();
        assert!(root.has_bindings);
        assert_eq!(root.props[0].name, "value");
        assert_eq!(root.events["click"][0].value, "go");
        assert_eq!(root.directives[0].name, "focus");
        assert_eq!(root.directives[0].arg.as_deref(), Some("arg"));
        assert!(root.directives[0].modifiers.as_ref().unwrap().has("lazy"));
        assert_eq!(root.dynamic_attrs[0].name, "key");
        assert_eq!(root.attrs.iter().find(|a| a.name == "title").unwrap().value, "\"t\"");
    }

    #[test]
    fn sync_modifier_adds_update_handlers() {
        let (root, _) = parse_web("<comp :foo-bar.sync=\"x\"></comp>");
        let root = root.unwrap();
        assert_eq!(root.events["update:fooBar"][0].value, "x=$event");
        assert_eq!(root.events["update:foo-bar"][0].value, "x=$event");
    }

    #[test]
    fn key_ref_and_once() {
        let (root, d) = parse_web(
            "<ul><li v-for=\"i in list\" :key=\"i.id\" ref=\"item\" v-once>{{ i }}</li></ul>",
        );
        assert!(d.errors().is_empty());
        let root = root.unwrap();
        let li = root.element_children().next().unwrap();
        assert_eq!(li.key.as_deref(), Some("i.id"));
        assert_eq!(li.ref_exp.as_deref(), Some("\"item\""));
        assert!(li.ref_in_for);
        assert!(li.once);
    }

    #[test]
    fn keyed_template_and_keyed_slot_are_reported() {
        let (_, d) = parse_web("<div><template :key=\"a\"><p></p></template><slot :key=\"b\"></slot></div>");
        let m = messages(&d);
        assert!(m.iter().any(|m| m.starts_with("<template> cannot be keyed")));
        assert!(m.iter().any(|m| m.starts_with("`key` does not work on <slot>")));
    }

    #[test]
    fn scoped_slots_move_out_of_children() {
        let (root, d) = parse_web(
            "<comp><template v-slot:item=\"{ x }\"><b>{{ x }}</b></template><p>rest</p></comp>",
        );
        assert!(d.errors().is_empty());
        let root = root.unwrap();
        assert_eq!(root.element_children().count(), 1);
        let slot = &root.scoped_slots["\"item\""];
        assert_eq!(slot.slot_scope.as_deref(), Some("{ x }"));
    }

    #[test]
    fn v_slot_on_component_wraps_default_content() {
        let (root, _) = parse_web("<comp v-slot=\"props\"><b>{{ props.a }}</b></comp>");
        let root = root.unwrap();
        assert!(root.children.is_empty());
        let slot = &root.scoped_slots["\"default\""];
        assert_eq!(slot.tag, "template");
        assert_eq!(slot.children.len(), 1);
    }

    #[test]
    fn v_slot_on_plain_element_is_an_error() {
        let (_, d) = parse_web("<div v-slot=\"p\"></div>");
        assert_eq!(messages(&d), vec!["v-slot can only be used on components or <template>."]);
    }

    #[test]
    fn v_pre_keeps_raw_content() {
        let (root, _) = parse_web("<div v-pre :a=\"b\">{{ raw }}</div>");
        let root = root.unwrap();
        assert!(root.pre);
        assert_eq!(root.attrs[0].name, ":a");
        assert_eq!(root.attrs[0].value, "\"b\"");
        assert!(matches!(&root.children[0], AstNode::Text(t) if t.text == "{{ raw }}"));
    }

    #[test]
    fn whitespace_handling() {
        let (root, _) = parse_web("<div>  <span>a</span>   <span>b</span>  </div>");
        let root = root.unwrap();
        // Leading whitespace is dropped, inner collapses, trailing is trimmed.
        assert_eq!(root.children.len(), 3);
        assert_eq!(root.children[1].text(), Some(" "));

        let condense = CompilerOptions::web().with_whitespace(WhitespaceMode::Condense);
        let (root, _) = parse_with("<div><span>a</span>\n  <span>b</span> x   y</div>", &condense);
        let root = root.unwrap();
        assert_eq!(root.children.len(), 3);
        assert_eq!(root.children[2].text(), Some(" x y"));

        let drop = CompilerOptions {
            preserve_whitespace: Some(false),
            ..CompilerOptions::web()
        };
        let (root, _) = parse_with("<div><span>a</span> <span>b</span></div>", &drop);
        assert_eq!(root.unwrap().children.len(), 2);
    }

    #[test]
    fn pre_keeps_whitespace() {
        let (root, _) = parse_web("<pre>\n  a  \n</pre>");
        let root = root.unwrap();
        assert_eq!(root.children[0].text(), Some("  a  \n"));
    }

    #[test]
    fn entities_are_decoded_in_text() {
        let (root, _) = parse_web("<p>a &amp; b</p>");
        assert_eq!(root.unwrap().children[0].text(), Some("a & b"));
    }

    #[test]
    fn misc_diagnostics() {
        let (_, d) = parse_web("<div id=\"{{ a }}\" :b=\"\" id=\"x\"></div>");
        let m = messages(&d);
        assert!(m.iter().any(|m| m == "duplicate attribute: id"));
        assert!(m.iter().any(|m| m.contains("Interpolation inside attributes has been removed")));
        assert!(m.iter().any(|m| m.starts_with("The value for a v-bind expression cannot be empty")));

        let (_, d) = parse_web("<div><p v-for=\"item in items\"><input v-model=\"item\"></p></div>");
        assert!(messages(&d)[0].contains("You are binding v-model directly to a v-for iteration alias"));

        let (root, d) = parse_web("<div><style>a{}</style></div>");
        assert!(messages(&d)[0].starts_with("Templates should only be responsible"));
        assert!(root.unwrap().children.is_empty());
    }

    #[test]
    fn svg_namespace_is_inherited() {
        let (root, _) = parse_web("<svg><g><circle></circle></g></svg>");
        let root = root.unwrap();
        assert_eq!(root.ns.as_deref(), Some("svg"));
        let g = root.element_children().next().unwrap();
        assert_eq!(g.ns.as_deref(), Some("svg"));
    }

    #[test]
    fn source_ranges_when_requested() {
        let options = CompilerOptions::web().with_source_range(true);
        let (root, _) = parse_with("<div id=\"a\">x</div>", &options);
        let root = root.unwrap();
        assert_eq!(root.start, Some(0));
        assert_eq!(root.end, Some(19));
        assert_eq!(root.raw_attrs_map["id"].start, Some(5));
    }

    #[test]
    fn modifiers_after_dynamic_argument() {
        assert_eq!(
            split_modifiers("@[a.b].stop"),
            ("@[a.b]".to_string(), Some(["stop"].into_iter().collect()))
        );
        assert_eq!(split_modifiers("@[a.b]"), ("@[a.b]".to_string(), None));
    }
}
