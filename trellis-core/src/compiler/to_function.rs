//! Executable render procedures.
//!
//! Generated source is parsed once into a [`Procedure`] and cached per
//! template by [`Compiler`]. Source that fails to parse leaves a no-op
//! procedure behind and a [`GenerationError`] on the program.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, warn};

use super::diagnostics::Diagnostic;
use super::options::CompilerOptions;
use super::{base_compile, CompiledResult};
use crate::error::EvalError;
use crate::expr::{parse_program, run_program, Program};
use crate::reactive::Instance;
use crate::value::Value;

/// A parsed render or static-render body.
#[derive(Clone)]
pub struct Procedure {
    program: Option<Arc<Program>>,
    source: String,
}

impl Procedure {
    pub fn parse(source: impl Into<String>) -> Result<Self, EvalError> {
        let source = source.into();
        let program = parse_program(&source)?;
        Ok(Self {
            program: Some(Arc::new(program)),
            source,
        })
    }

    /// A procedure that renders nothing.
    pub fn noop(source: impl Into<String>) -> Self {
        Self {
            program: None,
            source: source.into(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_noop(&self) -> bool {
        self.program.is_none()
    }

    /// Run with `vm` as `this`.
    pub fn call(&self, vm: &Instance) -> Result<Value, EvalError> {
        match &self.program {
            Some(program) => run_program(program, vm),
            None => Ok(Value::Undefined),
        }
    }
}

impl fmt::Debug for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Procedure")
            .field("source", &self.source)
            .field("noop", &self.is_noop())
            .finish()
    }
}

/// Generated source that the expression engine rejected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationError {
    pub code: String,
    pub message: String,
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in\n\n{}\n", self.message, self.code)
    }
}

/// Everything an instance needs to render a template.
#[derive(Debug, Clone)]
pub struct RenderProgram {
    pub render: Procedure,
    pub static_render_fns: Vec<Procedure>,
    /// Template errors, from the parser, generator and expression checks.
    pub errors: Vec<Diagnostic>,
    pub tips: Vec<Diagnostic>,
    pub generation_errors: Vec<GenerationError>,
}

impl RenderProgram {
    /// Parse the generated sources of `compiled`.
    pub fn from_compiled(compiled: CompiledResult) -> Self {
        let mut generation_errors = Vec::new();
        let mut create = |code: String| match Procedure::parse(code.as_str()) {
            Ok(procedure) => procedure,
            Err(err) => {
                generation_errors.push(GenerationError {
                    message: err.to_string(),
                    code: code.clone(),
                });
                Procedure::noop(code)
            }
        };
        let render = create(compiled.render);
        let static_render_fns = compiled.static_render_fns.into_iter().map(&mut create).collect();
        Self {
            render,
            static_render_fns,
            errors: compiled.errors,
            tips: compiled.tips,
            generation_errors,
        }
    }
}

/// A compiler bound to platform base options, with a cache of compiled
/// programs.
pub struct Compiler {
    base: CompilerOptions,
    cache: Mutex<HashMap<String, Arc<RenderProgram>>>,
}

impl Compiler {
    pub fn new(base: CompilerOptions) -> Self {
        Self {
            base,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// A compiler for the web platform.
    pub fn web() -> Self {
        Self::new(CompilerOptions::web())
    }

    pub fn base_options(&self) -> &CompilerOptions {
        &self.base
    }

    /// Compile `template` with `options` layered over the base options.
    pub fn compile(&self, template: &str, options: &CompilerOptions) -> CompiledResult {
        base_compile(template, &options.merged_over(&self.base))
    }

    /// Compile and parse `template` into a render program. Results are
    /// cached per template and delimiters.
    pub fn compile_to_functions(&self, template: &str, options: &CompilerOptions) -> Arc<RenderProgram> {
        let key = match &options.delimiters {
            Some((open, close)) => format!("{open},{close}{template}"),
            None => template.to_string(),
        };
        if let Some(program) = self.cache.lock().get(&key) {
            return program.clone();
        }

        debug!(len = template.len(), "compiling template");
        let compiled = self.compile(template, options);
        if !compiled.errors.is_empty() {
            let listed: Vec<String> = compiled.errors.iter().map(|e| format!("- {e}")).collect();
            warn!("Error compiling template:\n\n{template}\n\n{}\n", listed.join("\n"));
        }
        for tip in &compiled.tips {
            debug!(tip = %tip, "template tip");
        }

        let program = RenderProgram::from_compiled(compiled);
        if program.errors.is_empty() && !program.generation_errors.is_empty() {
            let listed: Vec<String> =
                program.generation_errors.iter().map(ToString::to_string).collect();
            warn!("Failed to generate render function:\n\n{}", listed.join("\n"));
        }

        let program = Arc::new(program);
        self.cache.lock().insert(key, program.clone());
        program
    }

    pub fn cached(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::web()
    }
}

impl fmt::Debug for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compiler")
            .field("base", &self.base)
            .field("cached", &self.cached())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn procedures_parse_generated_source() {
        let procedure = Procedure::parse("with(this){return _c('div')}").unwrap();
        assert!(!procedure.is_noop());
        assert!(Procedure::parse("with(this){return _c(}").is_err());
    }

    #[test]
    fn programs_are_cached_per_template_and_delimiters() {
        let compiler = Compiler::web();
        let options = CompilerOptions::default();
        let a = compiler.compile_to_functions("<div>{{ a }}</div>", &options);
        let b = compiler.compile_to_functions("<div>{{ a }}</div>", &options);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(compiler.cached(), 1);

        let custom = CompilerOptions::default().with_delimiters("[[", "]]");
        let c = compiler.compile_to_functions("<div>{{ a }}</div>", &custom);
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(compiler.cached(), 2);

        compiler.clear_cache();
        assert_eq!(compiler.cached(), 0);
    }

    #[test]
    fn unparseable_source_becomes_a_generation_error() {
        let compiled = CompiledResult {
            ast: None,
            render: "with(this){return _c('div',}".to_string(),
            static_render_fns: vec!["with(this){return _c('p')}".to_string()],
            errors: Vec::new(),
            tips: Vec::new(),
        };
        let program = RenderProgram::from_compiled(compiled);
        assert!(program.render.is_noop());
        assert!(!program.static_render_fns[0].is_noop());
        assert_eq!(program.generation_errors.len(), 1);
        assert_eq!(program.generation_errors[0].code, "with(this){return _c('div',}");
    }

    #[test]
    fn template_errors_travel_with_the_program() {
        let program = Compiler::web().compile_to_functions("<div>{{ a + }}</div>", &CompilerOptions::default());
        assert_eq!(program.errors.len(), 1);
        assert!(program.generation_errors.len() <= 1);
    }
}
