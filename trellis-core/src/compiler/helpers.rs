//! AST editing helpers shared by the parser, modules and directives.

use regex::Regex;

use super::ast::{AstAttr, AstDirective, AstElement, AstHandler, Modifiers};
use super::diagnostics::{Diagnostics, Span};
use super::filter_parser::parse_filters;

/// A string literal in generated code.
pub fn quote(s: &str) -> String {
    serde_json::Value::from(s).to_string()
}

fn with_span(mut attr: AstAttr, span: Span) -> AstAttr {
    attr.start = span.start;
    attr.end = span.end;
    attr
}

/// Prepend an event modifier marker: `!` capture, `~` once, `&` passive.
fn prepend_modifier_marker(symbol: &str, name: &str, dynamic: bool) -> String {
    if dynamic {
        format!("_p({name},\"{symbol}\")")
    } else {
        format!("{symbol}{name}")
    }
}

impl AstElement {
    pub fn add_prop(&mut self, name: &str, value: &str, span: Span, dynamic: bool) {
        let mut prop = with_span(AstAttr::new(name, value), span);
        prop.dynamic = dynamic;
        self.props.push(prop);
        self.plain = false;
    }

    pub fn add_attr(&mut self, name: &str, value: &str, span: Span, dynamic: bool) {
        let mut attr = with_span(AstAttr::new(name, value), span);
        attr.dynamic = dynamic;
        if dynamic {
            self.dynamic_attrs.push(attr);
        } else {
            self.attrs.push(attr);
        }
        self.plain = false;
    }

    /// Add an attribute as if it had been written in the template.
    pub fn add_raw_attr(&mut self, name: &str, value: &str, span: Span) {
        self.attrs_map.insert(name.to_string(), value.to_string());
        self.attrs_list.push(with_span(AstAttr::new(name, value), span));
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_directive(
        &mut self,
        name: &str,
        raw_name: &str,
        value: &str,
        arg: Option<String>,
        is_dynamic_arg: bool,
        modifiers: Option<Modifiers>,
        span: Span,
    ) {
        self.directives.push(AstDirective {
            name: name.to_string(),
            raw_name: raw_name.to_string(),
            value: value.to_string(),
            arg,
            is_dynamic_arg,
            modifiers,
            start: span.start,
            end: span.end,
        });
        self.plain = false;
    }

    /// Register an event handler, folding the `right`, `middle`,
    /// `capture`, `once`, `passive` and `native` modifiers into the event
    /// name and target map.
    #[allow(clippy::too_many_arguments)]
    pub fn add_handler(
        &mut self,
        name: &str,
        value: &str,
        modifiers: Option<Modifiers>,
        important: bool,
        diagnostics: Option<&mut Diagnostics>,
        span: Span,
        dynamic: bool,
    ) {
        let mut modifiers = modifiers;
        let mut name = name.to_string();
        let has = |m: &Option<Modifiers>, key: &str| m.as_ref().is_some_and(|m| m.has(key));
        let take = |m: &mut Option<Modifiers>, key: &str| m.as_mut().is_some_and(|m| m.remove(key));

        if let Some(diagnostics) = diagnostics {
            if has(&modifiers, "prevent") && has(&modifiers, "passive") {
                diagnostics.error(
                    "passive and prevent can't be used together. \
                     Passive handler can't prevent default event.",
                    span,
                );
            }
        }

        if has(&modifiers, "right") {
            if dynamic {
                name = format!("({name})==='click'?'contextmenu':({name})");
            } else if name == "click" {
                name = "contextmenu".to_string();
                take(&mut modifiers, "right");
            }
        } else if has(&modifiers, "middle") {
            if dynamic {
                name = format!("({name})==='click'?'mouseup':({name})");
            } else if name == "click" {
                name = "mouseup".to_string();
            }
        }

        if take(&mut modifiers, "capture") {
            name = prepend_modifier_marker("!", &name, dynamic);
        }
        if take(&mut modifiers, "once") {
            name = prepend_modifier_marker("~", &name, dynamic);
        }
        if take(&mut modifiers, "passive") {
            name = prepend_modifier_marker("&", &name, dynamic);
        }
        let native = take(&mut modifiers, "native");

        let handler = AstHandler {
            value: value.trim().to_string(),
            dynamic,
            modifiers,
            start: span.start,
            end: span.end,
        };
        let events = if native {
            &mut self.native_events
        } else {
            &mut self.events
        };
        let handlers = events.entry(name).or_default();
        if important {
            handlers.insert(0, handler);
        } else {
            handlers.push(handler);
        }
        self.plain = false;
    }

    /// The raw attribute behind `:name`, `v-bind:name` or `name`.
    pub fn get_raw_binding_attr(&self, name: &str) -> Option<&AstAttr> {
        self.raw_attrs_map
            .get(&format!(":{name}"))
            .or_else(|| self.raw_attrs_map.get(&format!("v-bind:{name}")))
            .or_else(|| self.raw_attrs_map.get(name))
    }

    /// Remove `:name` / `v-bind:name` and return its expression (filters
    /// applied); failing that, when `get_static`, remove a static `name`
    /// and return it as a string literal.
    pub fn get_binding_attr(&mut self, name: &str, get_static: bool) -> Option<String> {
        let dynamic = self
            .get_and_remove_attr(&format!(":{name}"), false)
            .or_else(|| self.get_and_remove_attr(&format!("v-bind:{name}"), false));
        match dynamic {
            Some(value) => Some(parse_filters(&value)),
            None if get_static => self
                .get_and_remove_attr(name, false)
                .map(|value| quote(&value)),
            None => None,
        }
    }

    /// Return the value of `name` and drop it from the unprocessed list.
    /// The attribute stays in `attrs_map` unless `remove_from_map`.
    pub fn get_and_remove_attr(&mut self, name: &str, remove_from_map: bool) -> Option<String> {
        let value = self.attrs_map.get(name).cloned();
        if value.is_some() {
            if let Some(i) = self.attrs_list.iter().position(|a| a.name == name) {
                self.attrs_list.remove(i);
            }
        }
        if remove_from_map {
            self.attrs_map.shift_remove(name);
        }
        value
    }

    pub fn get_and_remove_attr_by_regex(&mut self, re: &Regex) -> Option<AstAttr> {
        let i = self.attrs_list.iter().position(|a| re.is_match(&a.name))?;
        Some(self.attrs_list.remove(i))
    }
}
