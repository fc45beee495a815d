//! Template diagnostics.
//!
//! Problems found while compiling a template are collected rather than
//! raised. Errors mean the template is wrong; tips are advisory.

use std::fmt;

use serde::Serialize;

use super::ast::AstAttr;

/// A source span in template offsets. Either end may be unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Span {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<usize>,
}

impl Span {
    pub const NONE: Span = Span {
        start: None,
        end: None,
    };

    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn at(start: usize) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }
}

impl From<&AstAttr> for Span {
    fn from(attr: &AstAttr) -> Self {
        Span {
            start: attr.start,
            end: attr.end,
        }
    }
}

impl From<Option<&AstAttr>> for Span {
    fn from(attr: Option<&AstAttr>) -> Self {
        attr.map(Span::from).unwrap_or_default()
    }
}

/// One compile error or tip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<usize>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Collector threaded through every compile pass.
///
/// Ranges are only recorded when `output_source_range` is on. The template
/// is trimmed before parsing, so recorded offsets are shifted by the length
/// of the leading whitespace to point into the untrimmed source.
#[derive(Debug, Default)]
pub struct Diagnostics {
    errors: Vec<Diagnostic>,
    tips: Vec<Diagnostic>,
    with_ranges: bool,
    offset: usize,
}

impl Diagnostics {
    pub fn new(with_ranges: bool, offset: usize) -> Self {
        Self {
            with_ranges,
            offset,
            ..Self::default()
        }
    }

    fn make(&self, message: String, span: Span) -> Diagnostic {
        let (start, end) = if self.with_ranges {
            (
                span.start.map(|s| s + self.offset),
                span.end.map(|e| e + self.offset),
            )
        } else {
            (None, None)
        };
        Diagnostic {
            message,
            start,
            end,
        }
    }

    pub fn error(&mut self, message: impl Into<String>, span: impl Into<Span>) {
        let diagnostic = self.make(message.into(), span.into());
        self.errors.push(diagnostic);
    }

    pub fn tip(&mut self, message: impl Into<String>, span: impl Into<Span>) {
        let diagnostic = self.make(message.into(), span.into());
        self.tips.push(diagnostic);
    }

    pub fn errors(&self) -> &[Diagnostic] {
        &self.errors
    }

    pub fn tips(&self) -> &[Diagnostic] {
        &self.tips
    }

    pub fn into_parts(self) -> (Vec<Diagnostic>, Vec<Diagnostic>) {
        (self.errors, self.tips)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_are_dropped_unless_requested() {
        let mut diagnostics = Diagnostics::new(false, 0);
        diagnostics.error("bad", Span::new(1, 4));
        assert_eq!(diagnostics.errors()[0].start, None);
    }

    #[test]
    fn ranges_are_shifted_by_the_trimmed_prefix() {
        let mut diagnostics = Diagnostics::new(true, 3);
        diagnostics.tip("hint", Span::at(2));
        let (errors, tips) = diagnostics.into_parts();
        assert!(errors.is_empty());
        assert_eq!(tips[0].start, Some(5));
        assert_eq!(tips[0].end, None);
        assert_eq!(tips[0].to_string(), "hint");
    }
}
