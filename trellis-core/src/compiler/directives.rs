//! Compile-time directive handlers.
//!
//! A handler rewrites the element it sits on (adding props, handlers or a
//! model binding) and returns whether the directive still needs to be
//! present at runtime. Directives without a handler always do.
//!
//! # Base Directives
//!
//! `v-on="obj"` and `v-bind="obj"` (no argument) wrap the whole listener
//! or data object; `v-cloak` is dropped.
//!
//! # Web Directives
//!
//! `v-model`, `v-text` and `v-html`.

use std::sync::Arc;

use indexmap::IndexMap;

use super::ast::{AstDirective, AstElement, AstModel, BindObject, Modifiers};
use super::diagnostics::{Diagnostics, Span};
use super::platform;

pub type DirectiveFn =
    Arc<dyn Fn(&mut AstElement, &AstDirective, &mut Diagnostics) -> bool + Send + Sync>;

/// The `v-model` event name for range inputs; the runtime maps it to
/// `change` or `input` as the browser requires.
pub const RANGE_TOKEN: &str = "__r";

pub fn base_directives() -> IndexMap<String, DirectiveFn> {
    let mut directives: IndexMap<String, DirectiveFn> = IndexMap::new();
    directives.insert("on".into(), Arc::new(on));
    directives.insert("bind".into(), Arc::new(bind));
    directives.insert("cloak".into(), Arc::new(cloak));
    directives
}

pub fn web_directives() -> IndexMap<String, DirectiveFn> {
    let mut directives: IndexMap<String, DirectiveFn> = IndexMap::new();
    directives.insert("model".into(), Arc::new(model));
    directives.insert("text".into(), Arc::new(text));
    directives.insert("html".into(), Arc::new(html));
    directives
}

fn has_modifier(dir: &AstDirective, name: &str) -> bool {
    dir.modifiers.as_ref().is_some_and(|m| m.has(name))
}

fn on(el: &mut AstElement, dir: &AstDirective, diagnostics: &mut Diagnostics) -> bool {
    if dir.modifiers.as_ref().is_some_and(|m| !m.is_empty()) {
        diagnostics.error("v-on without argument does not support modifiers.", dir_span(dir));
    }
    el.listener_object = Some(dir.value.clone());
    false
}

fn bind(el: &mut AstElement, dir: &AstDirective, _: &mut Diagnostics) -> bool {
    el.bind_object = Some(BindObject {
        value: dir.value.clone(),
        prop: has_modifier(dir, "prop"),
        sync: has_modifier(dir, "sync"),
    });
    false
}

fn cloak(_: &mut AstElement, _: &AstDirective, _: &mut Diagnostics) -> bool {
    false
}

fn text(el: &mut AstElement, dir: &AstDirective, _: &mut Diagnostics) -> bool {
    if !dir.value.is_empty() {
        el.add_prop("textContent", &format!("_s({})", dir.value), dir_span(dir), false);
    }
    false
}

fn html(el: &mut AstElement, dir: &AstDirective, _: &mut Diagnostics) -> bool {
    if !dir.value.is_empty() {
        el.add_prop("innerHTML", &format!("_s({})", dir.value), dir_span(dir), false);
    }
    false
}

fn model(el: &mut AstElement, dir: &AstDirective, diagnostics: &mut Diagnostics) -> bool {
    let value = dir.value.as_str();
    let modifiers = dir.modifiers.as_ref();
    let ty = el.attr("type").map(str::to_string);
    let span = Span::from(el.raw_attrs_map.get("v-model"));

    if el.tag == "input" && ty.as_deref() == Some("file") {
        diagnostics.error(
            format!(
                "<{} v-model=\"{value}\" type=\"file\">:\n\
                 File inputs are read only. Use a v-on:change listener instead.",
                el.tag
            ),
            span,
        );
    }

    if el.component.is_some() {
        gen_component_model(el, value, modifiers);
        return false;
    }
    let tag = el.tag.clone();
    match (tag.as_str(), ty.as_deref()) {
        ("select", _) => gen_select(el, value, modifiers),
        ("input", Some("checkbox")) => gen_checkbox_model(el, value, modifiers),
        ("input", Some("radio")) => gen_radio_model(el, value, modifiers),
        ("input", _) | ("textarea", _) => gen_default_model(el, value, modifiers, diagnostics),
        (tag, _) if !platform::is_reserved_tag(tag) => {
            gen_component_model(el, value, modifiers);
            return false;
        }
        _ => diagnostics.error(
            format!(
                "<{} v-model=\"{value}\">: v-model is not supported on this element type. \
                 If you are working with contenteditable, it's recommended to wrap a \
                 library dedicated for that purpose inside a custom component.",
                el.tag
            ),
            span,
        ),
    }
    true
}

fn modifier(modifiers: Option<&Modifiers>, name: &str) -> bool {
    modifiers.is_some_and(|m| m.has(name))
}

/// `v-model` on a component: a `value` prop and an `input` callback.
pub fn gen_component_model(el: &mut AstElement, value: &str, modifiers: Option<&Modifiers>) {
    let base = "$$v";
    let mut value_expression = base.to_string();
    if modifier(modifiers, "trim") {
        value_expression = format!("(typeof {base} === 'string'? {base}.trim(): {base})");
    }
    if modifier(modifiers, "number") {
        value_expression = format!("_n({value_expression})");
    }
    let assignment = gen_assignment_code(value, &value_expression);
    el.model = Some(AstModel {
        value: format!("({value})"),
        expression: super::helpers::quote(value),
        callback: format!("function ({base}) {{{assignment}}}"),
    });
}

fn gen_checkbox_model(el: &mut AstElement, value: &str, modifiers: Option<&Modifiers>) {
    let value_binding = el.get_binding_attr("value", true).unwrap_or_else(|| "null".into());
    let true_binding = el.get_binding_attr("true-value", true).unwrap_or_else(|| "true".into());
    let false_binding = el.get_binding_attr("false-value", true).unwrap_or_else(|| "false".into());

    let checked_tail = if true_binding == "true" {
        format!(":({value})")
    } else {
        format!(":_q({value},{true_binding})")
    };
    el.add_prop(
        "checked",
        &format!("Array.isArray({value})?_i({value},{value_binding})>-1{checked_tail}"),
        Span::NONE,
        false,
    );

    let item = if modifier(modifiers, "number") {
        format!("_n({value_binding})")
    } else {
        value_binding
    };
    let code = format!(
        "var $$a={value},$$el=$event.target,$$c=$$el.checked?({true_binding}):({false_binding});\
         if(Array.isArray($$a)){{var $$v={item},$$i=_i($$a,$$v);\
         if($$el.checked){{$$i<0&&({add})}}\
         else{{$$i>-1&&({remove})}}}}else{{{assign}}}",
        add = gen_assignment_code(value, "$$a.concat([$$v])"),
        remove = gen_assignment_code(value, "$$a.slice(0,$$i).concat($$a.slice($$i+1))"),
        assign = gen_assignment_code(value, "$$c"),
    );
    el.add_handler("change", &code, None, true, None, Span::NONE, false);
}

fn gen_radio_model(el: &mut AstElement, value: &str, modifiers: Option<&Modifiers>) {
    let mut value_binding = el.get_binding_attr("value", true).unwrap_or_else(|| "null".into());
    if modifier(modifiers, "number") {
        value_binding = format!("_n({value_binding})");
    }
    el.add_prop("checked", &format!("_q({value},{value_binding})"), Span::NONE, false);
    let code = gen_assignment_code(value, &value_binding);
    el.add_handler("change", &code, None, true, None, Span::NONE, false);
}

fn gen_select(el: &mut AstElement, value: &str, modifiers: Option<&Modifiers>) {
    let mapped = if modifier(modifiers, "number") { "_n(val)" } else { "val" };
    let selected = format!(
        "Array.prototype.filter.call($event.target.options,function(o){{return o.selected}})\
         .map(function(o){{var val = \"_value\" in o ? o._value : o.value;return {mapped}}})"
    );
    let assignment = gen_assignment_code(
        value,
        "$event.target.multiple ? $$selectedVal : $$selectedVal[0]",
    );
    let code = format!("var $$selectedVal = {selected}; {assignment}");
    el.add_handler("change", &code, None, true, None, Span::NONE, false);
}

fn gen_default_model(
    el: &mut AstElement,
    value: &str,
    modifiers: Option<&Modifiers>,
    diagnostics: &mut Diagnostics,
) {
    let ty = el.attr("type").map(str::to_string);

    let bound_value = el.attr("v-bind:value").or_else(|| el.attr(":value"));
    let type_binding = el.attr("v-bind:type").or_else(|| el.attr(":type"));
    if let (Some(bound), None) = (bound_value, type_binding) {
        let binding = if el.has_attr("v-bind:value") { "v-bind:value" } else { ":value" };
        diagnostics.error(
            format!(
                "{binding}=\"{bound}\" conflicts with v-model on the same element \
                 because the latter already expands to a value binding internally"
            ),
            Span::from(el.raw_attrs_map.get(binding)),
        );
    }

    let lazy = modifier(modifiers, "lazy");
    let number = modifier(modifiers, "number");
    let trim = modifier(modifiers, "trim");
    let is_range = ty.as_deref() == Some("range");
    let event = if lazy {
        "change"
    } else if is_range {
        RANGE_TOKEN
    } else {
        "input"
    };

    let mut value_expression = if trim {
        "$event.target.value.trim()".to_string()
    } else {
        "$event.target.value".to_string()
    };
    if number {
        value_expression = format!("_n({value_expression})");
    }
    let mut code = gen_assignment_code(value, &value_expression);
    if !lazy && !is_range {
        code = format!("if($event.target.composing)return;{code}");
    }

    el.add_prop("value", &format!("({value})"), Span::NONE, false);
    el.add_handler(event, &code, None, true, None, Span::NONE, false);
    if trim || number {
        el.add_handler("blur", "$forceUpdate()", None, false, None, Span::NONE, false);
    }
}

/// A `v-model` target split into object and key: `a.b` → `a`, `"b"`;
/// `a[b][c]` → `a[b]`, `c`. `key` is `None` for a bare identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelTarget {
    pub exp: String,
    pub key: Option<String>,
}

pub fn parse_model(val: &str) -> ModelTarget {
    let val = val.trim();
    let len = val.len();

    let bracketed = val.contains('[') && val.rfind(']').is_some_and(|i| i + 1 >= len);
    if !bracketed {
        return match val.rfind('.') {
            Some(i) => ModelTarget {
                exp: val[..i].to_string(),
                key: Some(format!("\"{}\"", &val[i + 1..])),
            },
            None => ModelTarget {
                exp: val.to_string(),
                key: None,
            },
        };
    }

    let bytes = val.as_bytes();
    let mut index = 0;
    let mut expression_pos = 0;
    let mut expression_end = 0;

    let skip_string = |index: &mut usize, quote: u8| {
        while *index < len {
            *index += 1;
            if bytes.get(*index) == Some(&quote) {
                break;
            }
        }
    };

    while index < len {
        index += 1;
        let Some(&c) = bytes.get(index) else { break };
        if c == b'"' || c == b'\'' {
            skip_string(&mut index, c);
        } else if c == b'[' {
            let mut depth = 1;
            expression_pos = index;
            while index < len {
                index += 1;
                let Some(&c) = bytes.get(index) else { break };
                if c == b'"' || c == b'\'' {
                    skip_string(&mut index, c);
                    continue;
                }
                if c == b'[' {
                    depth += 1;
                }
                if c == b']' {
                    depth -= 1;
                }
                if depth == 0 {
                    expression_end = index;
                    break;
                }
            }
        }
    }

    ModelTarget {
        exp: val[..expression_pos].to_string(),
        key: Some(val[expression_pos + 1..expression_end.max(expression_pos + 1)].to_string()),
    }
}

/// Code that stores `assignment` into the `v-model` target `value`. Nested
/// keys go through `$set` so that new properties become reactive.
pub fn gen_assignment_code(value: &str, assignment: &str) -> String {
    let target = parse_model(value);
    match target.key {
        None => format!("{value}={assignment}"),
        Some(key) => format!("$set({}, {key}, {assignment})", target.exp),
    }
}

fn dir_span(dir: &AstDirective) -> Span {
    Span {
        start: dir.start,
        end: dir.end,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::ast::AstAttr;

    fn directive(name: &str, value: &str, modifiers: &[&str]) -> AstDirective {
        AstDirective {
            name: name.into(),
            raw_name: format!("v-{name}"),
            value: value.into(),
            arg: None,
            is_dynamic_arg: false,
            modifiers: (!modifiers.is_empty()).then(|| modifiers.iter().copied().collect()),
            start: None,
            end: None,
        }
    }

    fn input(attrs: &[(&str, &str)]) -> AstElement {
        AstElement::new(
            "input",
            attrs.iter().map(|(n, v)| AstAttr::new(*n, *v)).collect(),
        )
    }

    #[test]
    fn model_targets() {
        assert_eq!(gen_assignment_code("a", "$event"), "a=$event");
        assert_eq!(gen_assignment_code("a.b.c", "$event"), "$set(a.b, \"c\", $event)");
        assert_eq!(gen_assignment_code("a[b]", "$event"), "$set(a, b, $event)");
        assert_eq!(gen_assignment_code("a[b][c]", "$event"), "$set(a[b], c, $event)");
        assert_eq!(gen_assignment_code("a['x]']", "$event"), "$set(a, 'x]', $event)");
        assert_eq!(gen_assignment_code("a[0].b", "$event"), "$set(a[0], \"b\", $event)");
    }

    #[test]
    fn text_input_model() {
        let mut el = input(&[("v-model", "msg")]);
        let mut d = Diagnostics::default();
        assert!(model(&mut el, &directive("model", "msg", &[]), &mut d));
        assert_eq!(el.props[0].value, "(msg)");
        assert_eq!(
            el.events["input"][0].value,
            "if($event.target.composing)return;msg=$event.target.value"
        );
    }

    #[test]
    fn lazy_trimmed_number_model() {
        let mut el = input(&[]);
        let mut d = Diagnostics::default();
        model(&mut el, &directive("model", "n", &["lazy", "trim", "number"]), &mut d);
        assert_eq!(el.events["change"][0].value, "n=_n($event.target.value.trim())");
        assert_eq!(el.events["blur"][0].value, "$forceUpdate()");
    }

    #[test]
    fn checkbox_and_radio() {
        let mut el = input(&[("type", "checkbox")]);
        model(&mut el, &directive("model", "checked", &[]), &mut Diagnostics::default());
        assert_eq!(
            el.props[0].value,
            "Array.isArray(checked)?_i(checked,null)>-1:(checked)"
        );
        assert!(el.events["change"][0].value.starts_with("var $$a=checked,"));

        let mut el = input(&[("type", "radio"), ("value", "a")]);
        model(&mut el, &directive("model", "pick", &[]), &mut Diagnostics::default());
        assert_eq!(el.props[0].value, "_q(pick,\"a\")");
        assert_eq!(el.events["change"][0].value, "pick=\"a\"");
    }

    #[test]
    fn component_model_needs_no_runtime() {
        let mut el = AstElement::new("my-input", Vec::new());
        let needs_runtime = model(
            &mut el,
            &directive("model", "form.name", &["trim"]),
            &mut Diagnostics::default(),
        );
        assert!(!needs_runtime);
        let m = el.model.unwrap();
        assert_eq!(m.value, "(form.name)");
        assert_eq!(m.expression, "\"form.name\"");
        assert!(m.callback.contains("$set(form, \"name\""));
    }

    #[test]
    fn model_misuse() {
        let mut d = Diagnostics::default();
        let mut el = input(&[("type", "file")]);
        model(&mut el, &directive("model", "f", &[]), &mut d);
        let mut el = AstElement::new("div", Vec::new());
        model(&mut el, &directive("model", "x", &[]), &mut d);
        let mut el = input(&[(":value", "y")]);
        model(&mut el, &directive("model", "x", &[]), &mut d);
        let messages: Vec<_> = d.errors().iter().map(|e| e.message.as_str()).collect();
        assert!(messages[0].contains("File inputs are read only"));
        assert!(messages[1].contains("v-model is not supported on this element type"));
        assert!(messages[2].starts_with(":value=\"y\" conflicts with v-model"));
    }

    #[test]
    fn text_and_html_become_props() {
        let mut el = AstElement::new("p", Vec::new());
        text(&mut el, &directive("text", "msg", &[]), &mut Diagnostics::default());
        html(&mut el, &directive("html", "raw", &[]), &mut Diagnostics::default());
        assert_eq!(el.props[0].name, "textContent");
        assert_eq!(el.props[0].value, "_s(msg)");
        assert_eq!(el.props[1].name, "innerHTML");
    }

    #[test]
    fn object_forms_of_bind_and_on() {
        let mut el = AstElement::new("div", Vec::new());
        let mut d = Diagnostics::default();
        bind(&mut el, &directive("bind", "attrs", &["prop"]), &mut d);
        on(&mut el, &directive("on", "listeners", &["stop"]), &mut d);
        assert!(el.bind_object.as_ref().unwrap().prop);
        assert_eq!(el.listener_object.as_deref(), Some("listeners"));
        assert_eq!(d.errors().len(), 1);
    }
}
