//! Code generator.
//!
//! Turns an optimized AST into render source for the expression engine:
//! `with(this){return _c('div',{attrs:{"id":"app"}},[_v(_s(msg))])}`.
//! Hoisted static sub-trees become separate procedures referenced with
//! `_m(index)`.
//!
//! # Element Order
//!
//! An element is emitted as the first that applies: static root, `v-once`,
//! `v-for`, `v-if`, `<template>` (children only), `<slot>`, component
//! (`is`), plain element. Each path marks the element processed and
//! re-enters, so `<li v-for v-if>` becomes a list of conditionals.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;

use super::ast::{AstAttr, AstElement, AstHandler, AstNode, Modifiers};
use super::diagnostics::{Diagnostics, Span};
use super::directives::{base_directives, DirectiveFn};
use super::helpers::quote;
use super::options::CompilerOptions;
use super::parser::EMPTY_SLOT_SCOPE_TOKEN;
use crate::util::camelize;

static FN_EXP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([\w$]+|\([^)]*?\))\s*=>|^function(?:\s+[\w$]+)?\s*\(")
        .expect("valid function expression regex")
});
static FN_INVOKE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*?\);*$").expect("valid invocation regex"));
static SIMPLE_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^[A-Za-z_$][\w$]*(?:\.[A-Za-z_$][\w$]*|\['[^']*?'\]|\["[^"]*?"\]|\[\d+\]|\[[A-Za-z_$][\w$]*\])*$"#,
    )
    .expect("valid method path regex")
});

/// Render source for a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodegenResult {
    pub render: String,
    pub static_render_fns: Vec<String>,
}

/// Generate render source for `ast`. An absent root renders an empty
/// `<div>`.
pub fn generate(
    ast: Option<&AstElement>,
    options: &CompilerOptions,
    diagnostics: &mut Diagnostics,
) -> CodegenResult {
    let mut state = CodegenState::new(options, diagnostics);
    let code = match ast {
        None => "_c(\"div\")".to_string(),
        Some(root) if root.tag == "script" => "null".to_string(),
        Some(root) => {
            let mut root = root.clone();
            inherit_pre(&mut root, false);
            state.gen_element(&mut root)
        }
    };
    CodegenResult {
        render: format!("with(this){{return {code}}}"),
        static_render_fns: state.static_render_fns,
    }
}

/// Everything below a `v-pre` element is emitted raw.
fn inherit_pre(el: &mut AstElement, parent_pre: bool) {
    el.pre |= parent_pre;
    let pre = el.pre;
    for child in &mut el.children {
        if let AstNode::Element(child) = child {
            inherit_pre(child, pre);
        }
    }
    for condition in &mut el.if_conditions {
        inherit_pre(&mut condition.block, parent_pre);
    }
    for slot in el.scoped_slots.values_mut() {
        inherit_pre(slot, pre);
    }
}

/// What the generator needs to know about an enclosing element.
struct Ancestor {
    has_for: bool,
    has_if: bool,
    key: Option<String>,
    slot_scope: Option<String>,
}

impl Ancestor {
    fn of(el: &AstElement) -> Self {
        Self {
            has_for: el.for_exp.is_some(),
            has_if: el.if_exp.is_some(),
            key: el.key.clone(),
            slot_scope: el.slot_scope.clone(),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum BranchGen {
    Element,
    ScopedSlot,
}

struct CodegenState<'a> {
    options: &'a CompilerOptions,
    diagnostics: &'a mut Diagnostics,
    directives: IndexMap<String, DirectiveFn>,
    ancestors: Vec<Ancestor>,
    static_render_fns: Vec<String>,
    once_id: usize,
    pre: bool,
}

impl<'a> CodegenState<'a> {
    fn new(options: &'a CompilerOptions, diagnostics: &'a mut Diagnostics) -> Self {
        let mut directives = base_directives();
        for (name, directive) in &options.directives {
            directives.insert(name.clone(), directive.clone());
        }
        Self {
            options,
            diagnostics,
            directives,
            ancestors: Vec::new(),
            static_render_fns: Vec::new(),
            once_id: 0,
            pre: false,
        }
    }

    fn maybe_component(&self, el: &AstElement) -> bool {
        el.component.is_some() || !self.options.reserved(&el.tag)
    }

    fn gen_element(&mut self, el: &mut AstElement) -> String {
        if el.static_root && !el.static_processed {
            return self.gen_static(el);
        }
        if el.once && !el.once_processed {
            return self.gen_once(el);
        }
        if el.for_exp.is_some() && !el.for_processed {
            return self.gen_for(el, BranchGen::Element);
        }
        if el.if_exp.is_some() && !el.if_processed {
            return self.gen_if(el, BranchGen::Element, "_e()");
        }
        if el.tag == "template" && el.slot_target.is_none() && !self.pre {
            return self
                .gen_children(el, false)
                .unwrap_or_else(|| "void 0".to_string());
        }
        if el.tag == "slot" {
            return self.gen_slot(el);
        }

        if let Some(component) = el.component.clone() {
            let data = self.gen_data(el);
            let children = if el.inline_template {
                None
            } else {
                self.gen_children(el, true)
            };
            return match children {
                Some(children) => format!("_c({component},{data},{children})"),
                None => format!("_c({component},{data})"),
            };
        }

        let data = (!el.plain || (el.pre && self.maybe_component(el))).then(|| self.gen_data(el));
        let children = if el.inline_template {
            None
        } else {
            self.gen_children(el, true)
        };
        let mut code = format!("_c('{}'", el.tag);
        if let Some(data) = data {
            code.push(',');
            code.push_str(&data);
        }
        if let Some(children) = children {
            code.push(',');
            code.push_str(&children);
        }
        code.push(')');
        code
    }

    fn gen_static(&mut self, el: &mut AstElement) -> String {
        el.static_processed = true;
        let original_pre = self.pre;
        if el.pre {
            self.pre = true;
        }
        let code = self.gen_element(el);
        self.static_render_fns.push(format!("with(this){{return {code}}}"));
        self.pre = original_pre;
        format!(
            "_m({}{})",
            self.static_render_fns.len() - 1,
            if el.static_in_for { ",true" } else { "" }
        )
    }

    fn gen_once(&mut self, el: &mut AstElement) -> String {
        el.once_processed = true;
        if el.if_exp.is_some() && !el.if_processed {
            return self.gen_if(el, BranchGen::Element, "_e()");
        }
        if !el.static_in_for {
            return self.gen_static(el);
        }

        let key = self
            .ancestors
            .iter()
            .rev()
            .find(|a| a.has_for)
            .and_then(|a| a.key.clone());
        match key {
            Some(key) => {
                let code = self.gen_element(el);
                let id = self.once_id;
                self.once_id += 1;
                format!("_o({code},{id},{key})")
            }
            None => {
                self.diagnostics.error(
                    "v-once can only be used inside v-for that is keyed. ",
                    Span::from(el.raw_attrs_map.get("v-once")),
                );
                self.gen_element(el)
            }
        }
    }

    fn gen_branch(&mut self, el: &mut AstElement, gen: BranchGen) -> String {
        match gen {
            BranchGen::ScopedSlot => self.gen_scoped_slot(el),
            BranchGen::Element if el.once => self.gen_once(el),
            BranchGen::Element => self.gen_element(el),
        }
    }

    /// `(a)?A:(b)?B:C`, falling back to `empty` when no branch matches.
    fn gen_if(&mut self, el: &mut AstElement, gen: BranchGen, empty: &str) -> String {
        el.if_processed = true;
        let mut rest = std::mem::take(&mut el.if_conditions);

        let mut branches = vec![(el.if_exp.clone(), self.gen_branch(el, gen))];
        if branches[0].0.is_some() {
            for condition in &mut rest {
                let code = self.gen_branch(&mut condition.block, gen);
                let exp = condition.exp.clone();
                let last = exp.is_none();
                branches.push((exp, code));
                if last {
                    break;
                }
            }
        }
        el.if_conditions = rest;

        branches
            .into_iter()
            .rev()
            .fold(empty.to_string(), |otherwise, (exp, code)| match exp {
                Some(exp) => format!("({exp})?{code}:{otherwise}"),
                None => code,
            })
    }

    fn gen_for(&mut self, el: &mut AstElement, gen: BranchGen) -> String {
        let exp = el.for_exp.clone().unwrap_or_default();
        let alias = el.alias.clone().unwrap_or_default();
        let iterator1 = el.iterator1.as_ref().map(|i| format!(",{i}")).unwrap_or_default();
        let iterator2 = el.iterator2.as_ref().map(|i| format!(",{i}")).unwrap_or_default();

        if self.maybe_component(el) && el.tag != "slot" && el.tag != "template" && el.key.is_none() {
            self.diagnostics.tip(
                format!(
                    "<{} v-for=\"{alias} in {exp}\">: component lists rendered with \
                     v-for should have explicit keys. \
                     See https://vuejs.org/guide/list.html#key for more info.",
                    el.tag
                ),
                Span::from(el.raw_attrs_map.get("v-for")),
            );
        }

        el.for_processed = true;
        let body = match gen {
            BranchGen::Element => self.gen_element(el),
            BranchGen::ScopedSlot => self.gen_scoped_slot(el),
        };
        format!("_l(({exp}),function({alias}{iterator1}{iterator2}){{return {body}}})")
    }

    fn gen_data(&mut self, el: &mut AstElement) -> String {
        let mut data = String::from("{");

        // Directives run first: they may add props and handlers.
        if let Some(dirs) = self.gen_directives(el) {
            data.push_str(&dirs);
            data.push(',');
        }
        if let Some(key) = &el.key {
            data.push_str(&format!("key:{key},"));
        }
        if let Some(r) = &el.ref_exp {
            data.push_str(&format!("ref:{r},"));
        }
        if el.ref_in_for {
            data.push_str("refInFor:true,");
        }
        if el.pre {
            data.push_str("pre:true,");
        }
        if el.component.is_some() {
            data.push_str(&format!("tag:\"{}\",", el.tag));
        }
        for module in &self.options.modules {
            data.push_str(&module.gen_data(el));
        }
        if !el.attrs.is_empty() {
            data.push_str(&format!("attrs:{},", gen_props(&el.attrs)));
        }
        if !el.props.is_empty() {
            data.push_str(&format!("domProps:{},", gen_props(&el.props)));
        }
        if !el.events.is_empty() {
            data.push_str(&gen_handlers(&el.events, false));
            data.push(',');
        }
        if !el.native_events.is_empty() {
            data.push_str(&gen_handlers(&el.native_events, true));
            data.push(',');
        }
        if let (Some(target), None) = (&el.slot_target, &el.slot_scope) {
            data.push_str(&format!("slot:{target},"));
        }
        if !el.scoped_slots.is_empty() {
            let slots = self.gen_scoped_slots(el);
            data.push_str(&slots);
            data.push(',');
        }
        if let Some(model) = &el.model {
            data.push_str(&format!(
                "model:{{value:{},callback:{},expression:{}}},",
                model.value, model.callback, model.expression
            ));
        }
        if el.inline_template {
            if let Some(inline) = self.gen_inline_template(el) {
                data.push_str(&inline);
                data.push(',');
            }
        }
        if data.ends_with(',') {
            data.pop();
        }
        data.push('}');

        if !el.dynamic_attrs.is_empty() {
            data = format!("_b({data},\"{}\",{})", el.tag, gen_props(&el.dynamic_attrs));
        }
        if let Some(bind) = &el.bind_object {
            data = format!(
                "_b({data},'{}',{},{}{})",
                el.tag,
                bind.value,
                if bind.prop { "true" } else { "false" },
                if bind.sync { ",true" } else { "" }
            );
        }
        if let Some(listeners) = &el.listener_object {
            data = format!("_g({data},{listeners})");
        }
        data
    }

    fn gen_directives(&mut self, el: &mut AstElement) -> Option<String> {
        if el.directives.is_empty() {
            return None;
        }
        let dirs = el.directives.clone();
        let mut runtime = Vec::new();
        for dir in &dirs {
            let needs_runtime = match self.directives.get(&dir.name).cloned() {
                Some(handler) => handler(el, dir, self.diagnostics),
                None => true,
            };
            if !needs_runtime {
                continue;
            }
            let mut code = format!("{{name:\"{}\",rawName:\"{}\"", dir.name, dir.raw_name);
            if !dir.value.is_empty() {
                code.push_str(&format!(",value:({}),expression:{}", dir.value, quote(&dir.value)));
            }
            if let Some(arg) = &dir.arg {
                if dir.is_dynamic_arg {
                    code.push_str(&format!(",arg:{arg}"));
                } else {
                    code.push_str(&format!(",arg:\"{arg}\""));
                }
            }
            if let Some(modifiers) = &dir.modifiers {
                code.push_str(&format!(",modifiers:{}", modifiers_json(modifiers)));
            }
            code.push('}');
            runtime.push(code);
        }
        (!runtime.is_empty()).then(|| format!("directives:[{}]", runtime.join(",")))
    }

    fn gen_inline_template(&mut self, el: &AstElement) -> Option<String> {
        let single_element = el.children.len() == 1 && el.children[0].as_element().is_some();
        if !single_element {
            self.diagnostics.error(
                "Inline-template components must have exactly one child element.",
                Span {
                    start: el.start,
                    end: None,
                },
            );
        }
        let ast = el.children.first()?.as_element()?;
        let inline = generate(Some(ast), self.options, self.diagnostics);
        let static_fns: Vec<String> = inline
            .static_render_fns
            .iter()
            .map(|code| format!("function(){{{code}}}"))
            .collect();
        Some(format!(
            "inlineTemplate:{{render:function(){{{}}},staticRenderFns:[{}]}}",
            inline.render,
            static_fns.join(",")
        ))
    }

    fn gen_scoped_slots(&mut self, el: &mut AstElement) -> String {
        // Slots that close over loop variables, or whose shape may change,
        // must be re-rendered whenever the parent is.
        let mut needs_force_update = el.for_exp.is_some()
            || el.scoped_slots.values().any(|slot| {
                slot.slot_target_dynamic
                    || slot.if_exp.is_some()
                    || slot.for_exp.is_some()
                    || contains_slot_child(slot)
            });
        let mut needs_key = el.if_exp.is_some();
        if !needs_force_update {
            for parent in self.ancestors.iter().rev() {
                let scoped = parent
                    .slot_scope
                    .as_deref()
                    .is_some_and(|s| s != EMPTY_SLOT_SCOPE_TOKEN);
                if scoped || parent.has_for {
                    needs_force_update = true;
                    break;
                }
                if parent.has_if {
                    needs_key = true;
                }
            }
        }

        self.ancestors.push(Ancestor::of(el));
        let mut slots = std::mem::take(&mut el.scoped_slots);
        let generated: Vec<String> = slots
            .values_mut()
            .map(|slot| self.gen_scoped_slot(slot))
            .collect();
        el.scoped_slots = slots;
        self.ancestors.pop();

        let generated = generated.join(",");
        let mut code = format!("scopedSlots:_u([{generated}]");
        if needs_force_update {
            code.push_str(",null,true");
        } else if needs_key {
            code.push_str(&format!(",null,false,{}", hash(&generated)));
        }
        code.push(')');
        code
    }

    fn gen_scoped_slot(&mut self, el: &mut AstElement) -> String {
        let legacy = el.has_attr("slot-scope");
        if el.if_exp.is_some() && !el.if_processed && !legacy {
            return self.gen_if(el, BranchGen::ScopedSlot, "null");
        }
        if el.for_exp.is_some() && !el.for_processed {
            return self.gen_for(el, BranchGen::ScopedSlot);
        }

        let scope = match el.slot_scope.as_deref() {
            Some(EMPTY_SLOT_SCOPE_TOKEN) => String::new(),
            Some(scope) => scope.to_string(),
            None => "undefined".to_string(),
        };
        let body = if el.tag == "template" {
            let children = self
                .gen_children(el, false)
                .unwrap_or_else(|| "undefined".to_string());
            match (&el.if_exp, legacy) {
                (Some(exp), true) => format!("({exp})?{children}:undefined"),
                _ => children,
            }
        } else {
            self.gen_element(el)
        };
        let key = el
            .slot_target
            .clone()
            .unwrap_or_else(|| "\"default\"".to_string());
        let proxy = if scope.is_empty() { ",proxy:true" } else { "" };
        format!("{{key:{key},fn:function({scope}){{return {body}}}{proxy}}}")
    }

    fn gen_children(&mut self, el: &mut AstElement, check_skip: bool) -> Option<String> {
        if el.children.is_empty() {
            return None;
        }
        self.ancestors.push(Ancestor::of(el));
        let code = self.gen_child_list(&mut el.children, check_skip);
        self.ancestors.pop();
        Some(code)
    }

    fn gen_child_list(&mut self, children: &mut [AstNode], check_skip: bool) -> String {
        if let [AstNode::Element(only)] = children {
            if only.for_exp.is_some() && only.tag != "template" && only.tag != "slot" {
                let normalization = match (check_skip, self.maybe_component(only)) {
                    (false, _) => "",
                    (true, true) => ",1",
                    (true, false) => ",0",
                };
                return format!("{}{normalization}", self.gen_element(only));
            }
        }

        let normalization = if check_skip {
            self.normalization_type(children)
        } else {
            0
        };
        let nodes: Vec<String> = children.iter_mut().map(|c| self.gen_node(c)).collect();
        if normalization == 0 {
            format!("[{}]", nodes.join(","))
        } else {
            format!("[{}],{normalization}", nodes.join(","))
        }
    }

    /// 0: no normalization, 1: simple (components may return arrays),
    /// 2: full (nested arrays from `v-for`, `<template>` or `<slot>`).
    fn normalization_type(&self, children: &[AstNode]) -> u8 {
        let needs_normalization =
            |el: &AstElement| el.for_exp.is_some() || el.tag == "template" || el.tag == "slot";
        let mut res = 0;
        for el in children.iter().filter_map(AstNode::as_element) {
            let branches = || std::iter::once(el).chain(el.if_conditions.iter().map(|c| &c.block));
            if branches().any(needs_normalization) {
                return 2;
            }
            if branches().any(|b| self.maybe_component(b)) {
                res = 1;
            }
        }
        res
    }

    fn gen_node(&mut self, node: &mut AstNode) -> String {
        match node {
            AstNode::Element(el) => self.gen_element(el),
            AstNode::Expression(e) => format!("_v({})", e.expression),
            AstNode::Text(t) if t.is_comment => format!("_e({})", quote(&t.text)),
            AstNode::Text(t) => format!("_v({})", transform_special_newlines(&quote(&t.text))),
        }
    }

    fn gen_slot(&mut self, el: &mut AstElement) -> String {
        let slot_name = el
            .slot_name
            .clone()
            .unwrap_or_else(|| "\"default\"".to_string());
        let children = self.gen_children(el, false);

        let mut res = format!("_t({slot_name}");
        if let Some(children) = &children {
            res.push_str(&format!(",function(){{return {children}}}"));
        }

        let slot_props: Vec<AstAttr> = el
            .attrs
            .iter()
            .chain(el.dynamic_attrs.iter())
            .map(|attr| AstAttr {
                name: camelize(&attr.name),
                ..attr.clone()
            })
            .collect();
        let attrs = (!slot_props.is_empty()).then(|| gen_props(&slot_props));
        let bind = el.attr("v-bind");

        if (attrs.is_some() || bind.is_some()) && children.is_none() {
            res.push_str(",null");
        }
        if let Some(attrs) = &attrs {
            res.push(',');
            res.push_str(attrs);
        }
        if let Some(bind) = bind {
            if attrs.is_none() {
                res.push_str(",null");
            }
            res.push(',');
            res.push_str(bind);
        }
        res.push(')');
        res
    }
}

fn contains_slot_child(el: &AstElement) -> bool {
    el.tag == "slot" || el.element_children().any(contains_slot_child)
}

/// djb2 over UTF-16 code units, right to left.
fn hash(s: &str) -> u32 {
    let units: Vec<u16> = s.encode_utf16().collect();
    let mut h: i32 = 5381;
    for &unit in units.iter().rev() {
        h = h.wrapping_mul(33) ^ i32::from(unit);
    }
    h as u32
}

fn transform_special_newlines(s: &str) -> String {
    s.replace('\u{2028}', "\\u2028").replace('\u{2029}', "\\u2029")
}

fn modifiers_json(modifiers: &Modifiers) -> String {
    let map: serde_json::Map<String, serde_json::Value> = modifiers
        .iter()
        .map(|m| (m.to_string(), serde_json::Value::Bool(true)))
        .collect();
    serde_json::Value::Object(map).to_string()
}

/// `{"a":x}`, or `_d({"a":x},[k,v])` when some names are dynamic.
fn gen_props(props: &[AstAttr]) -> String {
    let mut static_props = Vec::new();
    let mut dynamic_props = Vec::new();
    for prop in props {
        let value = transform_special_newlines(&prop.value);
        if prop.dynamic {
            dynamic_props.push(format!("{},{value}", prop.name));
        } else {
            static_props.push(format!("\"{}\":{value}", prop.name));
        }
    }
    let static_props = format!("{{{}}}", static_props.join(","));
    if dynamic_props.is_empty() {
        static_props
    } else {
        format!("_d({static_props},[{}])", dynamic_props.join(","))
    }
}

const KEY_MODIFIERS: [&str; 4] = ["ctrl", "shift", "alt", "meta"];

fn key_code(key: &str) -> Option<&'static str> {
    Some(match key {
        "esc" => "27",
        "tab" => "9",
        "enter" => "13",
        "space" => "32",
        "up" => "38",
        "left" => "37",
        "right" => "39",
        "down" => "40",
        "delete" => "[8,46]",
        _ => return None,
    })
}

fn key_name(key: &str) -> Option<&'static str> {
    Some(match key {
        "esc" => r#"["Esc","Escape"]"#,
        "tab" => r#""Tab""#,
        "enter" => r#""Enter""#,
        "space" => r#"[" ","Spacebar"]"#,
        "up" => r#"["Up","ArrowUp"]"#,
        "left" => r#"["Left","ArrowLeft"]"#,
        "right" => r#"["Right","ArrowRight"]"#,
        "down" => r#"["Down","ArrowDown"]"#,
        "delete" => r#"["Backspace","Delete","Del"]"#,
        _ => return None,
    })
}

fn guard(condition: &str) -> String {
    format!("if({condition})return null;")
}

fn modifier_code(modifier: &str) -> Option<String> {
    Some(match modifier {
        "stop" => "$event.stopPropagation();".to_string(),
        "prevent" => "$event.preventDefault();".to_string(),
        "self" => guard("$event.target !== $event.currentTarget"),
        "ctrl" => guard("!$event.ctrlKey"),
        "shift" => guard("!$event.shiftKey"),
        "alt" => guard("!$event.altKey"),
        "meta" => guard("!$event.metaKey"),
        "left" => guard("'button' in $event && $event.button !== 0"),
        "middle" => guard("'button' in $event && $event.button !== 1"),
        "right" => guard("'button' in $event && $event.button !== 2"),
        _ => return None,
    })
}

fn key_filter(key: &str) -> String {
    let digits: String = key.chars().take_while(char::is_ascii_digit).collect();
    if let Ok(code) = digits.parse::<u32>() {
        if code != 0 {
            return format!("$event.keyCode!=={code}");
        }
    }
    format!(
        "_k($event.keyCode,{},{},$event.key,{})",
        quote(key),
        key_code(key).unwrap_or("undefined"),
        key_name(key).unwrap_or("undefined"),
    )
}

fn gen_handlers(events: &IndexMap<String, Vec<AstHandler>>, native: bool) -> String {
    let prefix = if native { "nativeOn:" } else { "on:" };
    let mut static_handlers = Vec::new();
    let mut dynamic_handlers = Vec::new();
    for (name, handlers) in events {
        let code = match handlers.as_slice() {
            [] => "function(){}".to_string(),
            [single] => gen_handler(single),
            many => format!(
                "[{}]",
                many.iter().map(gen_handler).collect::<Vec<_>>().join(",")
            ),
        };
        match handlers.as_slice() {
            [single] if single.dynamic => dynamic_handlers.push(format!("{name},{code}")),
            _ => static_handlers.push(format!("\"{name}\":{code}")),
        }
    }
    let static_handlers = format!("{{{}}}", static_handlers.join(","));
    if dynamic_handlers.is_empty() {
        format!("{prefix}{static_handlers}")
    } else {
        format!("{prefix}_d({static_handlers},[{}])", dynamic_handlers.join(","))
    }
}

fn gen_handler(handler: &AstHandler) -> String {
    let value = handler.value.as_str();
    let is_method_path = SIMPLE_PATH_RE.is_match(value);
    let is_function_expression = FN_EXP_RE.is_match(value);
    let is_function_invocation = SIMPLE_PATH_RE.is_match(&FN_INVOKE_RE.replace(value, ""));

    let Some(modifiers) = &handler.modifiers else {
        if is_method_path || is_function_expression {
            return value.to_string();
        }
        return if is_function_invocation {
            format!("function($event){{return {value}}}")
        } else {
            format!("function($event){{{value}}}")
        };
    };

    let mut code = String::new();
    let mut modifier_guards = String::new();
    let mut keys = Vec::new();
    for modifier in modifiers.iter() {
        if let Some(snippet) = modifier_code(modifier) {
            modifier_guards.push_str(&snippet);
            if key_code(modifier).is_some() {
                keys.push(modifier);
            }
        } else if modifier == "exact" {
            let unpressed: Vec<String> = KEY_MODIFIERS
                .iter()
                .filter(|k| !modifiers.has(k))
                .map(|k| format!("$event.{k}Key"))
                .collect();
            modifier_guards.push_str(&guard(&unpressed.join("||")));
        } else {
            keys.push(modifier);
        }
    }
    if !keys.is_empty() {
        let filters: Vec<String> = keys.iter().map(|k| key_filter(k)).collect();
        code.push_str(&format!(
            "if(!$event.type.indexOf('key')&&{})return null;",
            filters.join("&&")
        ));
    }
    code.push_str(&modifier_guards);

    let handler_code = if is_method_path {
        format!("return {value}.apply(null, arguments)")
    } else if is_function_expression {
        format!("return ({value}).apply(null, arguments)")
    } else if is_function_invocation {
        format!("return {value}")
    } else {
        value.to_string()
    };
    format!("function($event){{{code}{handler_code}}}")
}
