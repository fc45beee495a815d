//! Compiler options.
//!
//! Scalar settings are `Option`s so that caller options can be layered over
//! platform base options with [`CompilerOptions::merged_over`]: a `None`
//! falls back to the base. Platform behaviour (tag tables, modules,
//! directives) is supplied as shared callables.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::directives::{self, DirectiveFn};
use super::modules::{self, CompilerModule};
use super::platform;

/// How whitespace-only text between tags is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WhitespaceMode {
    /// Whitespace-only text collapses to a single space.
    Preserve,
    /// Whitespace-only text containing a newline is removed, other runs of
    /// whitespace collapse to a single space.
    Condense,
}

pub type TagPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// `(tag, type attribute, attribute name)`.
pub type PropPredicate = Arc<dyn Fn(&str, Option<&str>, &str) -> bool + Send + Sync>;

pub type NamespaceResolver = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

#[derive(Clone, Default)]
pub struct CompilerOptions {
    /// Node transforms and data generators, applied in order.
    pub modules: Vec<Arc<dyn CompilerModule>>,
    /// Compile-time directive handlers by name (`model`, `text`, ...).
    pub directives: IndexMap<String, DirectiveFn>,

    /// Interpolation delimiters, `{{` `}}` when unset.
    pub delimiters: Option<(String, String)>,
    pub preserve_whitespace: Option<bool>,
    pub whitespace: Option<WhitespaceMode>,
    /// Keep comment nodes.
    pub comments: Option<bool>,
    /// Attach source offsets to AST nodes and diagnostics.
    pub output_source_range: Option<bool>,
    /// Run the static optimizer (default on).
    pub optimize: Option<bool>,
    /// Apply the HTML auto-closing rules for `<p>` and friends.
    pub expect_html: Option<bool>,
    pub should_decode_newlines: Option<bool>,
    pub should_decode_newlines_for_href: Option<bool>,
    /// Extra AST keys the optimizer treats as static.
    pub static_keys: Option<Vec<String>>,

    pub is_unary_tag: Option<TagPredicate>,
    pub can_be_left_open_tag: Option<TagPredicate>,
    pub is_reserved_tag: Option<TagPredicate>,
    pub is_pre_tag: Option<TagPredicate>,
    pub must_use_prop: Option<PropPredicate>,
    pub get_tag_namespace: Option<NamespaceResolver>,
}

impl CompilerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Base options for the web platform: the class and style modules, the
    /// `model`, `text` and `html` directives, and the HTML tag tables.
    pub fn web() -> Self {
        let modules = modules::web_modules();
        let static_keys = modules
            .iter()
            .flat_map(|m| m.static_keys().iter().map(|k| k.to_string()))
            .collect();
        Self {
            modules,
            directives: directives::web_directives(),
            expect_html: Some(true),
            static_keys: Some(static_keys),
            is_unary_tag: Some(Arc::new(platform::is_unary_tag)),
            can_be_left_open_tag: Some(Arc::new(platform::can_be_left_open_tag)),
            is_reserved_tag: Some(Arc::new(platform::is_reserved_tag)),
            is_pre_tag: Some(Arc::new(platform::is_pre_tag)),
            must_use_prop: Some(Arc::new(platform::must_use_prop)),
            get_tag_namespace: Some(Arc::new(platform::get_tag_namespace)),
            ..Self::default()
        }
    }

    pub fn with_delimiters(mut self, open: impl Into<String>, close: impl Into<String>) -> Self {
        self.delimiters = Some((open.into(), close.into()));
        self
    }

    pub fn with_whitespace(mut self, mode: WhitespaceMode) -> Self {
        self.whitespace = Some(mode);
        self
    }

    pub fn with_comments(mut self, keep: bool) -> Self {
        self.comments = Some(keep);
        self
    }

    pub fn with_source_range(mut self, on: bool) -> Self {
        self.output_source_range = Some(on);
        self
    }

    pub fn with_module(mut self, module: Arc<dyn CompilerModule>) -> Self {
        self.modules.push(module);
        self
    }

    pub fn with_directive(mut self, name: impl Into<String>, directive: DirectiveFn) -> Self {
        self.directives.insert(name.into(), directive);
        self
    }

    /// Layer `self` over `base`: modules are concatenated (base first),
    /// directives merged with `self` winning, everything else taken from
    /// `self` when set.
    pub fn merged_over(&self, base: &CompilerOptions) -> CompilerOptions {
        let mut modules = base.modules.clone();
        modules.extend(self.modules.iter().cloned());
        let mut directives = base.directives.clone();
        for (name, directive) in &self.directives {
            directives.insert(name.clone(), directive.clone());
        }
        CompilerOptions {
            modules,
            directives,
            delimiters: self.delimiters.clone().or_else(|| base.delimiters.clone()),
            preserve_whitespace: self.preserve_whitespace.or(base.preserve_whitespace),
            whitespace: self.whitespace.or(base.whitespace),
            comments: self.comments.or(base.comments),
            output_source_range: self.output_source_range.or(base.output_source_range),
            optimize: self.optimize.or(base.optimize),
            expect_html: self.expect_html.or(base.expect_html),
            should_decode_newlines: self.should_decode_newlines.or(base.should_decode_newlines),
            should_decode_newlines_for_href: self
                .should_decode_newlines_for_href
                .or(base.should_decode_newlines_for_href),
            static_keys: self.static_keys.clone().or_else(|| base.static_keys.clone()),
            is_unary_tag: self.is_unary_tag.clone().or_else(|| base.is_unary_tag.clone()),
            can_be_left_open_tag: self
                .can_be_left_open_tag
                .clone()
                .or_else(|| base.can_be_left_open_tag.clone()),
            is_reserved_tag: self.is_reserved_tag.clone().or_else(|| base.is_reserved_tag.clone()),
            is_pre_tag: self.is_pre_tag.clone().or_else(|| base.is_pre_tag.clone()),
            must_use_prop: self.must_use_prop.clone().or_else(|| base.must_use_prop.clone()),
            get_tag_namespace: self
                .get_tag_namespace
                .clone()
                .or_else(|| base.get_tag_namespace.clone()),
        }
    }

    pub(crate) fn unary(&self, tag: &str) -> bool {
        self.is_unary_tag.as_ref().is_some_and(|f| f(tag))
    }

    pub(crate) fn left_open(&self, tag: &str) -> bool {
        self.can_be_left_open_tag.as_ref().is_some_and(|f| f(tag))
    }

    pub(crate) fn reserved(&self, tag: &str) -> bool {
        self.is_reserved_tag.as_ref().is_some_and(|f| f(tag))
    }

    pub(crate) fn pre(&self, tag: &str) -> bool {
        self.is_pre_tag.as_ref().is_some_and(|f| f(tag))
    }

    pub(crate) fn uses_prop(&self, tag: &str, ty: Option<&str>, attr: &str) -> bool {
        self.must_use_prop.as_ref().is_some_and(|f| f(tag, ty, attr))
    }

    pub(crate) fn namespace(&self, tag: &str) -> Option<String> {
        self.get_tag_namespace.as_ref().and_then(|f| f(tag))
    }
}

impl fmt::Debug for CompilerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompilerOptions")
            .field("modules", &self.modules.len())
            .field("directives", &self.directives.keys().collect::<Vec<_>>())
            .field("delimiters", &self.delimiters)
            .field("preserve_whitespace", &self.preserve_whitespace)
            .field("whitespace", &self.whitespace)
            .field("comments", &self.comments)
            .field("output_source_range", &self.output_source_range)
            .field("optimize", &self.optimize)
            .field("expect_html", &self.expect_html)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_scalars_win_and_modules_concatenate() {
        let base = CompilerOptions::web();
        let caller = CompilerOptions::new()
            .with_comments(true)
            .with_module(Arc::new(modules::ClassModule));
        let merged = caller.merged_over(&base);

        assert_eq!(merged.comments, Some(true));
        assert_eq!(merged.expect_html, Some(true));
        assert_eq!(merged.modules.len(), base.modules.len() + 1);
        assert!(merged.directives.contains_key("model"));
        assert!(merged.unary("br"));
    }

    #[test]
    fn web_static_keys_come_from_modules() {
        let keys = CompilerOptions::web().static_keys.unwrap();
        assert!(keys.iter().any(|k| k == "staticClass"));
        assert!(keys.iter().any(|k| k == "staticStyle"));
    }

    #[test]
    fn empty_options_have_no_platform() {
        let options = CompilerOptions::new();
        assert!(!options.reserved("div"));
        assert!(!options.unary("br"));
        assert_eq!(options.namespace("svg"), None);
    }

    #[test]
    fn whitespace_mode_is_lowercase_in_json() {
        let mode: WhitespaceMode = serde_json::from_str("\"condense\"").unwrap();
        assert_eq!(mode, WhitespaceMode::Condense);
    }
}
