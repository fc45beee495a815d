//! Template compiler.
//!
//! Turns an HTML-like template into render source that the expression
//! engine can run against an [`Instance`](crate::reactive::Instance):
//!
//! ```text
//! template --parse--> AST --optimize--> AST --generate--> render source
//!                                                   |
//!                                       detect_errors (expression checks)
//! ```
//!
//! [`compile`] returns the source and diagnostics; [`Compiler`] also parses
//! the source into [`Procedure`]s and caches the result per template.
//!
//! # Example
//!
//! ```rust
//! use trellis_core::compiler::{compile, CompilerOptions};
//!
//! let result = compile("<p>{{ msg }}</p>", &CompilerOptions::default());
//! assert_eq!(result.render, "with(this){return _c('p',[_v(_s(msg))])}");
//! assert!(result.errors.is_empty());
//! ```

pub mod ast;
pub mod codegen;
pub mod diagnostics;
pub mod directives;
mod entities;
pub mod error_detector;
pub mod filter_parser;
pub mod helpers;
pub mod html_parser;
pub mod modules;
pub mod optimizer;
pub mod options;
pub mod parser;
pub mod platform;
pub mod text_parser;
mod to_function;

use serde::Serialize;

pub use ast::{
    AstAttr, AstDirective, AstElement, AstExpression, AstHandler, AstNode, AstText, IfCondition,
    Modifiers,
};
pub use codegen::{generate, CodegenResult};
pub use diagnostics::{Diagnostic, Diagnostics, Span};
pub use directives::DirectiveFn;
pub use error_detector::detect_errors;
pub use modules::{CompilerModule, TransformContext};
pub use optimizer::optimize;
pub use options::{CompilerOptions, WhitespaceMode};
pub use parser::parse;
pub use platform::must_use_prop;
pub use to_function::{Compiler, GenerationError, Procedure, RenderProgram};

/// Output of one compile.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledResult {
    pub ast: Option<AstElement>,
    pub render: String,
    pub static_render_fns: Vec<String>,
    pub errors: Vec<Diagnostic>,
    pub tips: Vec<Diagnostic>,
}

/// Compile `template` with fully resolved `options`.
pub(crate) fn base_compile(template: &str, options: &CompilerOptions) -> CompiledResult {
    let trimmed = template.trim();
    let leading = template.len() - template.trim_start().len();
    let mut diagnostics = Diagnostics::new(options.output_source_range.unwrap_or(false), leading);

    let mut ast = parse(trimmed, options, &mut diagnostics);
    if options.optimize != Some(false) {
        if let Some(root) = ast.as_mut() {
            optimize(root, options);
        }
    }
    let code = generate(ast.as_ref(), options, &mut diagnostics);
    detect_errors(ast.as_ref(), &mut diagnostics);

    let (errors, tips) = diagnostics.into_parts();
    CompiledResult {
        ast,
        render: code.render,
        static_render_fns: code.static_render_fns,
        errors,
        tips,
    }
}

/// Compile `template` for the web platform. `options` are layered over the
/// web defaults; modules and directives are appended.
pub fn compile(template: &str, options: &CompilerOptions) -> CompiledResult {
    base_compile(template, &options.merged_over(&CompilerOptions::web()))
}
