//! Template syntax tree.
//!
//! The parser builds this tree, the optimizer annotates it in place and the
//! code generator reads it. Nodes serialize (camelCase) so tooling can dump
//! the tree of a compiled template.
//!
//! # Conditional chains
//!
//! An element carrying `v-if` is the primary branch of its chain. Its
//! `v-else-if` / `v-else` siblings are moved out of the parent's children
//! into [`AstElement::if_conditions`], in source order.

use indexmap::IndexMap;
use serde::Serialize;
use smallvec::SmallVec;

fn is_false(b: &bool) -> bool {
    !*b
}

/// An attribute as written in the template, or a processed attribute whose
/// value is generated code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AstAttr {
    pub name: String,
    pub value: String,
    #[serde(skip_serializing_if = "is_false")]
    pub dynamic: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<usize>,
}

impl AstAttr {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            dynamic: false,
            start: None,
            end: None,
        }
    }
}

/// Directive modifiers in source order (`.stop.prevent` → `["stop", "prevent"]`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Modifiers(SmallVec<[String; 2]>);

impl Modifiers {
    pub fn has(&self, name: &str) -> bool {
        self.0.iter().any(|m| m == name)
    }

    pub fn insert(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.has(&name) {
            self.0.push(name);
        }
    }

    /// Remove `name`, returning whether it was present.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|m| m != name);
        self.0.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for Modifiers {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut modifiers = Modifiers::default();
        for m in iter {
            modifiers.insert(m);
        }
        modifiers
    }
}

/// An event handler registered with `v-on` / `@`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AstHandler {
    pub value: String,
    #[serde(skip_serializing_if = "is_false")]
    pub dynamic: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modifiers: Option<Modifiers>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<usize>,
}

/// A directive that is not handled by the parser itself
/// (`v-model`, `v-show`, custom directives).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AstDirective {
    pub name: String,
    pub raw_name: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arg: Option<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub is_dynamic_arg: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modifiers: Option<Modifiers>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IfCondition {
    /// `None` for `v-else`.
    pub exp: Option<String>,
    pub block: AstElement,
}

/// `v-model` on a component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AstModel {
    pub value: String,
    pub expression: String,
    pub callback: String,
}

/// `v-bind="object"` without an argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BindObject {
    pub value: String,
    pub prop: bool,
    pub sync: bool,
}

/// One piece of an interpolated text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TextToken {
    Literal(String),
    Binding {
        #[serde(rename = "@binding")]
        binding: String,
    },
}

/// Text containing at least one interpolation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AstExpression {
    pub expression: String,
    pub tokens: Vec<TextToken>,
    pub text: String,
    #[serde(rename = "static")]
    pub is_static: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<usize>,
}

/// Plain text or a comment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AstText {
    pub text: String,
    #[serde(skip_serializing_if = "is_false")]
    pub is_comment: bool,
    #[serde(rename = "static")]
    pub is_static: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<usize>,
}

impl AstText {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_comment: false,
            is_static: false,
            start: None,
            end: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AstNode {
    Element(Box<AstElement>),
    Expression(AstExpression),
    Text(AstText),
}

impl AstNode {
    pub fn as_element(&self) -> Option<&AstElement> {
        match self {
            AstNode::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut AstElement> {
        match self {
            AstNode::Element(el) => Some(el),
            _ => None,
        }
    }

    /// Raw text of a text or expression node.
    pub fn text(&self) -> Option<&str> {
        match self {
            AstNode::Element(_) => None,
            AstNode::Expression(e) => Some(&e.text),
            AstNode::Text(t) => Some(&t.text),
        }
    }

    pub fn is_static(&self) -> bool {
        match self {
            AstNode::Element(el) => el.is_static,
            AstNode::Expression(e) => e.is_static,
            AstNode::Text(t) => t.is_static,
        }
    }
}

/// An element node.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AstElement {
    pub tag: String,
    /// Attributes not yet consumed by a directive or module.
    pub attrs_list: Vec<AstAttr>,
    /// Every attribute as written, including consumed ones.
    pub attrs_map: IndexMap<String, String>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub raw_attrs_map: IndexMap<String, AstAttr>,
    pub children: Vec<AstNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ns: Option<String>,

    #[serde(skip_serializing_if = "is_false")]
    pub forbidden: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub pre: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub plain: bool,

    #[serde(rename = "for", skip_serializing_if = "Option::is_none")]
    pub for_exp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iterator1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iterator2: Option<String>,

    #[serde(rename = "if", skip_serializing_if = "Option::is_none")]
    pub if_exp: Option<String>,
    #[serde(rename = "elseif", skip_serializing_if = "Option::is_none")]
    pub else_if: Option<String>,
    #[serde(rename = "else", skip_serializing_if = "is_false")]
    pub is_else: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub if_conditions: Vec<IfCondition>,

    #[serde(skip_serializing_if = "is_false")]
    pub once: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    pub ref_exp: Option<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub ref_in_for: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot_scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot_target: Option<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub slot_target_dynamic: bool,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub scoped_slots: IndexMap<String, AstElement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub inline_template: bool,

    #[serde(skip_serializing_if = "is_false")]
    pub has_bindings: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attrs: Vec<AstAttr>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dynamic_attrs: Vec<AstAttr>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub props: Vec<AstAttr>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub events: IndexMap<String, Vec<AstHandler>>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub native_events: IndexMap<String, Vec<AstHandler>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub directives: Vec<AstDirective>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub static_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_binding: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub static_style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style_binding: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<AstModel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind_object: Option<BindObject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listener_object: Option<String>,

    #[serde(rename = "static")]
    pub is_static: bool,
    pub static_root: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub static_in_for: bool,

    #[serde(skip)]
    pub(crate) static_processed: bool,
    #[serde(skip)]
    pub(crate) once_processed: bool,
    #[serde(skip)]
    pub(crate) for_processed: bool,
    #[serde(skip)]
    pub(crate) if_processed: bool,
    /// Fully processed by a pre-transform; closing skips `process_element`.
    #[serde(skip)]
    pub(crate) processed: bool,
}

impl AstElement {
    /// A fresh element. Duplicate attribute names keep the last value in
    /// [`attrs_map`](Self::attrs_map).
    pub fn new(tag: impl Into<String>, attrs: Vec<AstAttr>) -> Self {
        let attrs_map = attrs
            .iter()
            .map(|a| (a.name.clone(), a.value.clone()))
            .collect();
        Self {
            tag: tag.into(),
            attrs_list: attrs,
            attrs_map,
            ..Self::default()
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs_map.get(name).map(String::as_str)
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs_map.contains_key(name)
    }

    /// Child elements, skipping text.
    pub fn element_children(&self) -> impl Iterator<Item = &AstElement> {
        self.children.iter().filter_map(AstNode::as_element)
    }

    /// Names of the properties this element carries, as they appear when
    /// serialized. The optimizer only hoists elements whose properties are
    /// all on its safe list.
    pub fn present_keys(&self) -> Vec<&'static str> {
        let mut keys = vec!["type", "tag", "attrsList", "attrsMap", "children", "plain"];
        let mut push = |present: bool, key: &'static str| {
            if present {
                keys.push(key);
            }
        };
        push(!self.raw_attrs_map.is_empty(), "rawAttrsMap");
        push(self.start.is_some(), "start");
        push(self.end.is_some(), "end");
        push(self.ns.is_some(), "ns");
        push(self.forbidden, "forbidden");
        push(self.pre, "pre");
        push(self.for_exp.is_some(), "for");
        push(self.alias.is_some(), "alias");
        push(self.iterator1.is_some(), "iterator1");
        push(self.iterator2.is_some(), "iterator2");
        push(self.if_exp.is_some(), "if");
        push(self.else_if.is_some(), "elseif");
        push(self.is_else, "else");
        push(!self.if_conditions.is_empty(), "ifConditions");
        push(self.once, "once");
        push(self.key.is_some(), "key");
        push(self.ref_exp.is_some(), "ref");
        push(self.ref_in_for, "refInFor");
        push(self.slot_scope.is_some(), "slotScope");
        push(self.slot_target.is_some(), "slotTarget");
        push(!self.scoped_slots.is_empty(), "scopedSlots");
        push(self.slot_name.is_some(), "slotName");
        push(self.component.is_some(), "component");
        push(self.inline_template, "inlineTemplate");
        push(self.has_bindings, "hasBindings");
        push(!self.attrs.is_empty(), "attrs");
        push(!self.dynamic_attrs.is_empty(), "dynamicAttrs");
        push(!self.props.is_empty(), "props");
        push(!self.events.is_empty(), "events");
        push(!self.native_events.is_empty(), "nativeEvents");
        push(!self.directives.is_empty(), "directives");
        push(self.static_class.is_some(), "staticClass");
        push(self.class_binding.is_some(), "classBinding");
        push(self.static_style.is_some(), "staticStyle");
        push(self.style_binding.is_some(), "styleBinding");
        push(self.model.is_some(), "model");
        push(self.bind_object.is_some(), "bindObject");
        push(self.listener_object.is_some(), "listenerObject");
        keys
    }
}
