//! Render nodes.

use std::fmt;
use std::rc::Rc;

use crate::reactive::Record;
use crate::value::Value;

/// One node of a rendered tree: an element, a text node or a comment.
///
/// Nodes are immutable once built; static trees are re-flagged by copying
/// (see [`mark_static`]).
#[derive(Debug, Clone, Default)]
pub struct VNode {
    pub tag: Option<String>,
    /// The data object built by the render procedure: `attrs`, `domProps`,
    /// `on`, `staticClass`, `key` and so on.
    pub data: Option<Record>,
    pub children: Vec<Rc<VNode>>,
    pub text: Option<String>,
    pub key: Option<Value>,
    pub is_static: bool,
    pub is_comment: bool,
    pub is_once: bool,
}

impl VNode {
    pub fn element(tag: impl Into<String>, data: Option<Record>, children: Vec<Rc<VNode>>) -> Self {
        let key = data
            .as_ref()
            .map(|d| d.get_untracked("key"))
            .filter(|k| !k.is_undefined());
        Self {
            tag: Some(tag.into()),
            data,
            children,
            key,
            ..Self::default()
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// A comment placeholder, rendered for a false `v-if` with no `v-else`.
    pub fn empty(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            is_comment: true,
            ..Self::default()
        }
    }

    pub fn is_text(&self) -> bool {
        self.tag.is_none() && !self.is_comment
    }

    /// Concatenated text of every text descendant.
    pub fn text_content(&self) -> String {
        if self.is_comment {
            return String::new();
        }
        if let Some(text) = &self.text {
            if self.tag.is_none() {
                return text.clone();
            }
        }
        self.children.iter().map(|c| c.text_content()).collect()
    }

    /// Look up `data.<group>.<name>`, e.g. `attr("attrs", "id")`.
    pub fn data_entry(&self, group: &str, name: &str) -> Option<Value> {
        let data = self.data.as_ref()?;
        let group = data.get_untracked(group);
        let value = group.as_record()?.get_untracked(name);
        (!value.is_undefined()).then_some(value)
    }

    pub fn attr(&self, name: &str) -> Option<Value> {
        self.data_entry("attrs", name)
    }

    pub fn dom_prop(&self, name: &str) -> Option<Value> {
        self.data_entry("domProps", name)
    }

    /// An `on` listener by event name.
    pub fn listener(&self, event: &str) -> Option<Value> {
        self.data_entry("on", event)
    }

    /// Direct element children (text and comments skipped).
    pub fn element_children(&self) -> impl Iterator<Item = &Rc<VNode>> {
        self.children.iter().filter(|c| c.tag.is_some())
    }

    /// Depth-first search for every element with `tag`.
    pub fn find_all(self: &Rc<Self>, tag: &str) -> Vec<Rc<VNode>> {
        let mut found = Vec::new();
        collect(self, tag, &mut found);
        found
    }

    fn class_list(&self) -> Option<String> {
        let data = self.data.as_ref()?;
        let mut classes = Vec::new();
        if let Some(s) = data.get_untracked("staticClass").as_str() {
            classes.push(s.to_string());
        }
        let dynamic = stringify_class(&data.get_untracked("class"));
        if !dynamic.is_empty() {
            classes.push(dynamic);
        }
        (!classes.is_empty()).then(|| classes.join(" "))
    }
}

fn collect(node: &Rc<VNode>, tag: &str, found: &mut Vec<Rc<VNode>>) {
    if node.tag.as_deref() == Some(tag) {
        found.push(node.clone());
    }
    for child in &node.children {
        collect(child, tag, found);
    }
}

/// Flatten a class binding: strings as is, sequences joined, records by
/// truthy keys.
pub fn stringify_class(value: &Value) -> String {
    match value {
        Value::String(s) => s.to_string(),
        Value::Sequence(seq) => seq
            .to_vec()
            .iter()
            .map(stringify_class)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
        Value::Record(record) => record
            .keys()
            .into_iter()
            .filter(|k| record.get_untracked(k).is_truthy())
            .collect::<Vec<_>>()
            .join(" "),
        _ => String::new(),
    }
}

/// Copy `tree` with the static flags set. Sequences of nodes are keyed
/// `<key>_<index>`.
pub fn mark_static(tree: &Value, key: &str, is_once: bool) -> Value {
    match tree {
        Value::Sequence(seq) => Value::Sequence(
            seq.to_vec()
                .into_iter()
                .enumerate()
                .map(|(i, item)| match &item {
                    Value::Node(node) => {
                        Value::Node(mark_node(node, &format!("{key}_{i}"), is_once))
                    }
                    _ => item,
                })
                .collect(),
        ),
        Value::Node(node) => Value::Node(mark_node(node, key, is_once)),
        other => other.clone(),
    }
}

fn mark_node(node: &Rc<VNode>, key: &str, is_once: bool) -> Rc<VNode> {
    Rc::new(VNode {
        is_static: true,
        is_once,
        key: Some(Value::from(key)),
        ..(**node).clone()
    })
}

/// Markup rendering: elements with attributes and class, escaped text,
/// comments.
impl fmt::Display for VNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_comment {
            return write!(f, "<!--{}-->", self.text.as_deref().unwrap_or(""));
        }
        let Some(tag) = &self.tag else {
            return f.write_str(&escape(self.text.as_deref().unwrap_or("")));
        };

        write!(f, "<{tag}")?;
        if let Some(class) = self.class_list() {
            write!(f, " class=\"{}\"", escape(&class))?;
        }
        if let Some(attrs) = self
            .data
            .as_ref()
            .map(|d| d.get_untracked("attrs"))
            .and_then(|a| a.as_record().cloned())
        {
            for name in attrs.keys() {
                let value = attrs.get_untracked(&name);
                match value {
                    Value::Undefined | Value::Null | Value::Bool(false) => {}
                    Value::Bool(true) => write!(f, " {name}")?,
                    other => write!(f, " {name}=\"{}\"", escape(&other.to_js_string()))?,
                }
            }
        }
        f.write_str(">")?;
        match self.dom_prop("textContent").or_else(|| self.dom_prop("innerHTML")) {
            Some(content) => f.write_str(&content.to_js_string())?,
            None => {
                for child in &self.children {
                    write!(f, "{child}")?;
                }
            }
        }
        write!(f, "</{tag}>")
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_content_skips_comments() {
        let node = VNode::element(
            "p",
            None,
            vec![
                Rc::new(VNode::text("a")),
                Rc::new(VNode::empty("")),
                Rc::new(VNode::element("b", None, vec![Rc::new(VNode::text("c"))])),
            ],
        );
        assert_eq!(node.text_content(), "ac");
    }

    #[test]
    fn key_comes_from_data() {
        let data = Record::new().with("key", "k1");
        let node = VNode::element("li", Some(data), Vec::new());
        assert_eq!(node.key, Some(Value::from("k1")));
    }

    #[test]
    fn display_renders_markup() {
        let data = Record::new()
            .with("staticClass", "box")
            .with("class", Record::new().with("on", true).with("off", false))
            .with("attrs", Record::new().with("id", "x").with("hidden", true));
        let node = VNode::element("div", Some(data), vec![Rc::new(VNode::text("a < b"))]);
        assert_eq!(node.to_string(), "<div class=\"box on\" id=\"x\" hidden>a &lt; b</div>");
    }

    #[test]
    fn mark_static_keys_sequences_by_index() {
        let nodes: Vec<Value> = vec![
            Value::Node(Rc::new(VNode::text("a"))),
            Value::Node(Rc::new(VNode::text("b"))),
        ];
        let marked = mark_static(&Value::from(nodes), "__static__0", false);
        let seq = marked.as_sequence().unwrap();
        let second = seq.get(1);
        let node = second.as_node().unwrap();
        assert!(node.is_static);
        assert_eq!(node.key, Some(Value::from("__static__0_1")));
    }
}
