//! Static optimizer.
//!
//! Finds sub-trees that never change between renders so the generator can
//! hoist them into static render procedures that run once.
//!
//! 1. `mark_static` flags every node whose output cannot depend on data.
//! 2. `mark_static_roots` picks the static elements worth hoisting: those
//!    with more than a single text child.

use std::collections::HashSet;

use super::ast::{AstElement, AstNode};
use super::options::CompilerOptions;
use super::platform::is_built_in_tag;

/// AST keys every element may carry without losing static status.
const BASE_STATIC_KEYS: &[&str] = &[
    "type",
    "tag",
    "attrsList",
    "attrsMap",
    "plain",
    "parent",
    "children",
    "attrs",
    "start",
    "end",
    "rawAttrsMap",
];

struct Optimizer<'a> {
    options: &'a CompilerOptions,
    static_keys: HashSet<&'a str>,
}

/// Annotate `root` in place.
pub fn optimize(root: &mut AstElement, options: &CompilerOptions) {
    let mut static_keys: HashSet<&str> = BASE_STATIC_KEYS.iter().copied().collect();
    if let Some(extra) = &options.static_keys {
        static_keys.extend(extra.iter().map(String::as_str));
    }
    let optimizer = Optimizer {
        options,
        static_keys,
    };
    optimizer.mark_static(root, false);
    optimizer.mark_static_roots(root, false);
}

impl Optimizer<'_> {
    /// `in_template_for` is set when the element sits directly below a
    /// `<template v-for>` (possibly through further `<template>`s).
    fn is_static(&self, el: &AstElement, in_template_for: bool) -> bool {
        if el.pre {
            return true;
        }
        !el.has_bindings
            && el.if_exp.is_none()
            && el.for_exp.is_none()
            && !is_built_in_tag(&el.tag)
            && self.options.reserved(&el.tag)
            && !in_template_for
            && el
                .present_keys()
                .iter()
                .all(|key| self.static_keys.contains(key))
    }

    fn mark_static(&self, el: &mut AstElement, in_template_for: bool) {
        el.is_static = self.is_static(el, in_template_for);

        // Component slot content stays dynamic.
        if !self.options.reserved(&el.tag) && el.tag != "slot" && !el.has_attr("inline-template") {
            return;
        }

        let children_in_template_for =
            el.tag == "template" && (el.for_exp.is_some() || in_template_for);
        let mut all_static = true;
        for child in &mut el.children {
            match child {
                AstNode::Element(child) => {
                    self.mark_static(child, children_in_template_for);
                    all_static &= child.is_static;
                }
                AstNode::Expression(e) => {
                    e.is_static = false;
                    all_static = false;
                }
                AstNode::Text(t) => t.is_static = true,
            }
        }
        for condition in &mut el.if_conditions {
            self.mark_static(&mut condition.block, in_template_for);
            all_static &= condition.block.is_static;
        }
        if !all_static {
            el.is_static = false;
        }
    }

    fn mark_static_roots(&self, el: &mut AstElement, in_for: bool) {
        if el.is_static || el.once {
            el.static_in_for = in_for;
        }

        // A lone text child is cheaper to re-render than to hoist.
        let only_text = el.children.len() == 1 && matches!(el.children[0], AstNode::Text(_));
        if el.is_static && !el.children.is_empty() && !only_text {
            el.static_root = true;
            return;
        }
        el.static_root = false;

        let children_in_for = in_for || el.for_exp.is_some();
        for child in &mut el.children {
            if let AstNode::Element(child) = child {
                self.mark_static_roots(child, children_in_for);
            }
        }
        for condition in &mut el.if_conditions {
            self.mark_static_roots(&mut condition.block, in_for);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::diagnostics::Diagnostics;
    use crate::compiler::parser::parse;

    fn optimized(template: &str) -> AstElement {
        let options = CompilerOptions::web();
        let mut root = parse(template, &options, &mut Diagnostics::default()).unwrap();
        optimize(&mut root, &options);
        root
    }

    fn child(el: &AstElement, i: usize) -> &AstElement {
        el.element_children().nth(i).unwrap()
    }

    #[test]
    fn plain_markup_is_a_static_root() {
        let root = optimized("<div><p>hello</p><span>world</span></div>");
        assert!(root.is_static);
        assert!(root.static_root);
    }

    #[test]
    fn single_text_child_is_not_hoisted() {
        let root = optimized("<div><p>hello</p>{{ msg }}</div>");
        assert!(!root.is_static);
        let p = child(&root, 0);
        assert!(p.is_static);
        assert!(!p.static_root);
    }

    #[test]
    fn bindings_and_structure_are_dynamic() {
        let root = optimized("<div><p :id=\"x\">a</p><p v-if=\"y\">b</p><p v-for=\"i in l\">c</p></div>");
        assert!(!root.is_static);
        for i in 0..3 {
            assert!(!child(&root, i).is_static);
        }
    }

    #[test]
    fn components_and_slots_are_dynamic() {
        let root = optimized("<div><my-comp><p>x</p></my-comp><slot></slot></div>");
        assert!(!child(&root, 0).is_static);
        assert!(!child(&root, 1).is_static);
    }

    #[test]
    fn v_pre_is_static() {
        let root = optimized("<div v-pre><p :a=\"b\">{{ raw }}</p></div>");
        assert!(root.is_static);
        assert!(root.static_root);
    }

    #[test]
    fn static_class_and_style_keep_static_status() {
        let root = optimized("<div class=\"a\" style=\"color: red\"><b>x</b></div>");
        assert!(root.static_root);
    }

    #[test]
    fn direct_children_of_template_for_are_dynamic() {
        let root = optimized("<div><template v-for=\"i in l\"><p>x</p></template></div>");
        let template = child(&root, 0);
        assert!(!child(template, 0).is_static);
    }

    #[test]
    fn static_roots_inside_for_are_flagged() {
        let root = optimized("<ul><li v-for=\"i in l\"><span><b>x</b></span></li></ul>");
        let li = child(&root, 0);
        let span = child(li, 0);
        assert!(span.static_root);
        assert!(span.static_in_for);
    }

    #[test]
    fn dynamic_else_branch_taints_the_parent() {
        let root = optimized("<div><p v-if=\"a\">x</p><p v-else>{{ y }}</p></div>");
        assert!(!root.is_static);
        let p = child(&root, 0);
        assert!(!p.if_conditions[0].block.is_static);
    }
}
