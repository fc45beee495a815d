//! Compiler modules.
//!
//! A module hooks into element processing (before the structural
//! directives, after them, and once the element is closed) and contributes
//! a fragment to the generated data object. The web platform ships
//! [`ClassModule`], [`StyleModule`] and [`ModelModule`].

use std::sync::Arc;

use indexmap::IndexMap;

use super::ast::{AstElement, IfCondition};
use super::diagnostics::{Diagnostics, Span};
use super::helpers::quote;
use super::options::CompilerOptions;
use super::parser::{process_element, process_for};
use super::text_parser::parse_text;

/// What a module hook may consult or report to.
pub struct TransformContext<'a> {
    pub options: &'a CompilerOptions,
    pub diagnostics: &'a mut Diagnostics,
    /// Open elements above the one being transformed, outermost first.
    pub ancestors: &'a [AstElement],
}

pub trait CompilerModule: Send + Sync {
    /// AST keys this module sets that do not prevent an element from being
    /// static.
    fn static_keys(&self) -> &'static [&'static str] {
        &[]
    }

    /// Runs when the start tag is seen, before `v-for` / `v-if`.
    fn pre_transform_node(&self, _el: &mut AstElement, _cx: &mut TransformContext<'_>) {}

    /// Runs once the element's children are known, before generic
    /// attribute processing.
    fn transform_node(&self, _el: &mut AstElement, _cx: &mut TransformContext<'_>) {}

    /// Runs last, after the element is fully processed.
    fn post_transform_node(&self, _el: &mut AstElement, _cx: &mut TransformContext<'_>) {}

    /// Data object entries, each followed by a comma.
    fn gen_data(&self, _el: &AstElement) -> String {
        String::new()
    }
}

pub fn web_modules() -> Vec<Arc<dyn CompilerModule>> {
    vec![Arc::new(ClassModule), Arc::new(StyleModule), Arc::new(ModelModule)]
}

fn warn_interpolation(attr: &str, value: &str, example: &str, el: &AstElement, cx: &mut TransformContext<'_>) {
    if parse_text(value, cx.options.delimiters.as_ref()).is_some() {
        cx.diagnostics.error(
            format!(
                "{attr}=\"{value}\": Interpolation inside attributes has been removed. \
                 Use v-bind or the colon shorthand instead. For example, \
                 instead of <div {attr}=\"{{{{ val }}}}\">, use <div :{attr}=\"{example}\">."
            ),
            Span::from(el.raw_attrs_map.get(attr)),
        );
    }
}

/// `class="a b"` and `:class="..."`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassModule;

impl CompilerModule for ClassModule {
    fn static_keys(&self) -> &'static [&'static str] {
        &["staticClass"]
    }

    fn transform_node(&self, el: &mut AstElement, cx: &mut TransformContext<'_>) {
        if let Some(static_class) = el.get_and_remove_attr("class", false) {
            warn_interpolation("class", &static_class, "{ val }", el, cx);
            let collapsed = static_class.split_whitespace().collect::<Vec<_>>().join(" ");
            el.static_class = Some(quote(&collapsed));
        }
        if let Some(binding) = el.get_binding_attr("class", false) {
            el.class_binding = Some(binding);
        }
    }

    fn gen_data(&self, el: &AstElement) -> String {
        let mut data = String::new();
        if let Some(static_class) = &el.static_class {
            data.push_str(&format!("staticClass:{static_class},"));
        }
        if let Some(binding) = &el.class_binding {
            data.push_str(&format!("class:{binding},"));
        }
        data
    }
}

/// `style="color: red"` and `:style="..."`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StyleModule;

impl CompilerModule for StyleModule {
    fn static_keys(&self) -> &'static [&'static str] {
        &["staticStyle"]
    }

    fn transform_node(&self, el: &mut AstElement, cx: &mut TransformContext<'_>) {
        if let Some(static_style) = el.get_and_remove_attr("style", false) {
            warn_interpolation("style", &static_style, "val", el, cx);
            el.static_style = serde_json::to_string(&parse_style_text(&static_style)).ok();
        }
        if let Some(binding) = el.get_binding_attr("style", false) {
            el.style_binding = Some(binding);
        }
    }

    fn gen_data(&self, el: &AstElement) -> String {
        let mut data = String::new();
        if let Some(static_style) = &el.static_style {
            data.push_str(&format!("staticStyle:{static_style},"));
        }
        if let Some(binding) = &el.style_binding {
            data.push_str(&format!("style:({binding}),"));
        }
        data
    }
}

/// `<input v-model>` with a bound `type`.
///
/// The model code depends on the input type, so an input whose type is only
/// known at runtime is expanded into a `v-if` chain of three fully
/// processed copies: a checkbox, a radio and one that keeps the bound type.
/// The element's own `v-if` is folded into every branch condition and its
/// `v-else` / `v-else-if` moves to the first branch.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelModule;

impl CompilerModule for ModelModule {
    fn pre_transform_node(&self, el: &mut AstElement, cx: &mut TransformContext<'_>) {
        if el.tag != "input" || !el.has_attr("v-model") {
            return;
        }
        let mut type_binding = if el.has_attr(":type") || el.has_attr("v-bind:type") {
            el.get_binding_attr("type", false)
        } else {
            None
        };
        if type_binding.is_none() && !el.has_attr("type") {
            type_binding = el.attr("v-bind").map(|object| format!("({object}).type"));
        }
        let Some(type_binding) = type_binding else {
            return;
        };

        let if_condition = el.get_and_remove_attr("v-if", true);
        let extra = if_condition
            .as_ref()
            .map(|cond| format!("&&({cond})"))
            .unwrap_or_default();
        let has_else = el.get_and_remove_attr("v-else", true).is_some();
        let else_if = el.get_and_remove_attr("v-else-if", true);
        let ancestors = cx.ancestors;

        let mut checkbox = clone_element(el);
        process_for(&mut checkbox, cx.diagnostics);
        checkbox.add_raw_attr("type", "checkbox", Span::NONE);
        process_element(&mut checkbox, ancestors, cx);
        checkbox.processed = true;
        checkbox.if_exp = Some(format!("({type_binding})==='checkbox'{extra}"));

        let mut radio = clone_element(el);
        radio.get_and_remove_attr("v-for", true);
        radio.add_raw_attr("type", "radio", Span::NONE);
        process_element(&mut radio, ancestors, cx);
        checkbox.if_conditions.push(IfCondition {
            exp: Some(format!("({type_binding})==='radio'{extra}")),
            block: radio,
        });

        let mut other = clone_element(el);
        other.get_and_remove_attr("v-for", true);
        other.add_raw_attr(":type", &type_binding, Span::NONE);
        process_element(&mut other, ancestors, cx);
        checkbox.if_conditions.push(IfCondition {
            exp: if_condition,
            block: other,
        });

        if has_else {
            checkbox.is_else = true;
        } else if else_if.is_some() {
            checkbox.else_if = else_if;
        }
        *el = checkbox;
    }
}

/// A fresh element from the attributes `el` has not consumed yet.
fn clone_element(el: &AstElement) -> AstElement {
    let mut clone = AstElement::new(el.tag.clone(), el.attrs_list.clone());
    clone.ns = el.ns.clone();
    clone.start = el.start;
    clone.end = el.end;
    clone.raw_attrs_map = el.raw_attrs_map.clone();
    clone
}

/// Split a declaration list into property/value pairs. Semicolons inside
/// parentheses (`url(a;b)`) do not end a declaration.
pub fn parse_style_text(css: &str) -> IndexMap<String, String> {
    let mut declarations = Vec::new();
    let mut depth = 0usize;
    let mut last = 0;
    for (i, c) in css.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ';' if depth == 0 => {
                declarations.push(&css[last..i]);
                last = i + 1;
            }
            _ => {}
        }
    }
    declarations.push(&css[last..]);

    declarations
        .into_iter()
        .filter_map(|decl| {
            let (key, value) = decl.split_once(':')?;
            Some((key.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::ast::AstAttr;

    fn transform(module: &dyn CompilerModule, attrs: &[(&str, &str)]) -> (AstElement, Diagnostics) {
        let options = CompilerOptions::web();
        let mut diagnostics = Diagnostics::default();
        let mut el = AstElement::new(
            "div",
            attrs.iter().map(|(n, v)| AstAttr::new(*n, *v)).collect(),
        );
        module.transform_node(
            &mut el,
            &mut TransformContext {
                options: &options,
                diagnostics: &mut diagnostics,
                ancestors: &[],
            },
        );
        (el, diagnostics)
    }

    #[test]
    fn static_and_bound_class() {
        let (el, d) = transform(&ClassModule, &[("class", "  a\n  b "), (":class", "{ c: on }")]);
        assert!(d.errors().is_empty());
        assert_eq!(el.static_class.as_deref(), Some("\"a b\""));
        assert_eq!(ClassModule.gen_data(&el), "staticClass:\"a b\",class:{ c: on },");
        assert!(el.attrs_list.is_empty());
    }

    #[test]
    fn class_interpolation_is_reported() {
        let (_, d) = transform(&ClassModule, &[("class", "{{ c }}")]);
        assert!(d.errors()[0].message.starts_with("class=\"{{ c }}\": Interpolation"));
    }

    #[test]
    fn static_style_becomes_json() {
        let (el, _) = transform(
            &StyleModule,
            &[("style", "color: red; background: url(a;b)"), (":style", "s")],
        );
        assert_eq!(
            el.static_style.as_deref(),
            Some(r#"{"color":"red","background":"url(a;b)"}"#)
        );
        assert_eq!(
            StyleModule.gen_data(&el),
            r#"staticStyle:{"color":"red","background":"url(a;b)"},style:(s),"#
        );
    }

    #[test]
    fn style_text_keeps_colons_in_values() {
        let parsed = parse_style_text("background:url(http://x);;");
        assert_eq!(parsed["background"], "url(http://x)");
        assert_eq!(parsed.len(), 1);
    }

    fn parse_input(template: &str) -> AstElement {
        let mut diagnostics = Diagnostics::default();
        let root = crate::compiler::parse(template, &CompilerOptions::web(), &mut diagnostics).unwrap();
        assert!(diagnostics.errors().is_empty(), "{:?}", diagnostics.errors());
        let el = root.element_children().next().unwrap().clone();
        el
    }

    #[test]
    fn bound_input_type_expands_into_branches() {
        let input = parse_input("<div><input v-model=\"val\" :type=\"kind\"></div>");
        assert_eq!(input.if_exp.as_deref(), Some("(kind)==='checkbox'"));
        assert_eq!(input.attr("type"), Some("checkbox"));
        assert!(input.directives.iter().any(|d| d.name == "model"));

        assert_eq!(input.if_conditions.len(), 2);
        let radio = &input.if_conditions[0];
        assert_eq!(radio.exp.as_deref(), Some("(kind)==='radio'"));
        assert_eq!(radio.block.attr("type"), Some("radio"));

        let other = &input.if_conditions[1];
        assert_eq!(other.exp, None);
        assert_eq!(other.block.attr(":type"), Some("kind"));
    }

    #[test]
    fn model_branches_keep_the_element_condition() {
        let first = parse_input(
            "<div><p v-if=\"a\"></p><input v-else-if=\"b\" v-model=\"val\" :type=\"kind\"></div>",
        );
        assert_eq!(first.tag, "p");
        let branch = &first.if_conditions[0];
        assert_eq!(branch.exp.as_deref(), Some("b"));
        assert_eq!(branch.block.if_exp.as_deref(), Some("(kind)==='checkbox'"));

        let guarded = parse_input("<div><input v-if=\"show\" v-for=\"x in xs\" v-model=\"x.v\" :type=\"x.t\"></div>");
        assert_eq!(guarded.if_exp.as_deref(), Some("(x.t)==='checkbox'&&(show)"));
        assert_eq!(guarded.for_exp.as_deref(), Some("xs"));
        assert_eq!(guarded.if_conditions[0].exp.as_deref(), Some("(x.t)==='radio'&&(show)"));
        assert_eq!(guarded.if_conditions[1].exp.as_deref(), Some("show"));
        assert!(guarded.if_conditions[1].block.for_exp.is_none());
    }

    #[test]
    fn static_input_type_is_left_alone() {
        let input = parse_input("<div><input v-model=\"val\" type=\"text\"></div>");
        assert!(input.if_exp.is_none());
        assert!(input.if_conditions.is_empty());
    }
}
