//! Expression Engine
//!
//! A small JavaScript-like language: the subset used by template bindings
//! (`{{ user.name | capitalize }}`, `:class="{ active: isActive }"`,
//! `@click="count++"`) and by the render source the code generator emits
//! (`with(this){return _c('div',[_v(_s(msg))])}`).
//!
//! Source is parsed with `oxc_parser` and lowered into an owned syntax tree
//! ([`parser`], [`ast`]), then walked by the evaluator ([`eval`]) against an
//! [`Instance`](crate::reactive::Instance). Reading instance data during
//! evaluation is what registers dependencies with the active watcher.
//!
//! # Supported Syntax
//!
//! - literals: numbers, strings, template literals, `true`, `false`,
//!   `null`, `undefined`, arrays and objects (with `...` spread)
//! - member access (`a.b`, `a[b]`, `a?.b`) and calls, spread arguments
//! - unary `! - + typeof void`, `++` / `--`
//! - arithmetic (including `**`), comparison, loose and strict equality, `in`, `&&`, `||`, `??`
//! - `?:`, assignment (`=`, `+=`, `-=`, `*=`, `/=`, `%=`, `**=`), the comma
//!   operator
//! - `function (a, b) { ... }` and arrow functions, with destructuring,
//!   default and rest parameters
//! - statements: `return`, `if` / `else`, blocks, `var` / `let` / `const`,
//!   `with (this)`

pub mod ast;
mod builtins;
pub mod eval;
pub mod parser;

pub use ast::{Expr, FunctionDef, Param, Program, Stmt};
pub use eval::{evaluate, run_program, Scope};
pub use parser::{is_reserved_word, parse_expression, parse_params, parse_program};
