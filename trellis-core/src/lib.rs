//! Trellis Core
//!
//! This crate provides the core of the Trellis UI framework:
//!
//! - A dependency-tracking reactivity engine over plain data records
//! - Watchers, computed properties and a batching scheduler
//! - A template compiler producing render source
//! - An expression engine that runs render source against an instance
//! - Virtual nodes and the render helpers the generated code calls
//!
//! # Architecture
//!
//! - `reactive`: observed data, deps, watchers, scheduler and instances
//! - `compiler`: template parser, optimizer, code generator and checks
//! - `expr`: parser and evaluator for expressions and render source
//! - `render`: virtual nodes and `_c`/`_l`/`_s`-style helpers
//! - `config`: JSON-loadable runtime and compiler settings
//!
//! # Example
//!
//! ```rust
//! use trellis_core::compiler::{Compiler, CompilerOptions};
//! use trellis_core::reactive::{Instance, InstanceOptions, Record, Runtime};
//! use trellis_core::value::Value;
//!
//! let program = Compiler::web()
//!     .compile_to_functions("<p>{{ count }}</p>", &CompilerOptions::default());
//!
//! let data = Record::new().with("count", 1);
//! let vm = Instance::new(InstanceOptions::new().data(data.clone())).unwrap();
//! vm.mount(program).unwrap();
//! assert_eq!(vm.vnode().unwrap().text_content(), "1");
//!
//! data.set("count", Value::from(2));
//! Runtime::tick();
//! assert_eq!(vm.vnode().unwrap().text_content(), "2");
//! ```

pub mod compiler;
pub mod config;
pub mod error;
pub mod expr;
pub mod reactive;
pub mod render;
pub mod util;
pub mod value;

pub use config::Config;
pub use error::{ConfigError, EvalError, ReactiveError};
pub use value::Value;
