//! Configuration
//!
//! Runtime and compiler settings. Everything here is plain data that can be
//! loaded from JSON:
//!
//! ```json
//! {
//!   "reactive": { "asyncMode": true, "maxUpdateCount": 100 },
//!   "compiler": { "delimiters": ["${", "}"], "whitespace": "condense" }
//! }
//! ```
//!
//! The reactive half is applied to the current thread with
//! [`Runtime::configure`](crate::reactive::Runtime::configure). The compiler half
//! converts into [`CompilerOptions`](crate::compiler::CompilerOptions).

use serde::{Deserialize, Serialize};

use crate::compiler::{CompilerOptions, WhitespaceMode};
use crate::error::ConfigError;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub reactive: ReactiveConfig,
    pub compiler: CompilerConfig,
}

impl Config {
    /// Parse a configuration from JSON text.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.reactive.max_update_count == 0 {
            return Err(ConfigError::Invalid(
                "reactive.maxUpdateCount must be at least 1".into(),
            ));
        }
        if let Some((open, close)) = &self.compiler.delimiters {
            if open.is_empty() || close.is_empty() {
                return Err(ConfigError::Invalid(
                    "compiler.delimiters must both be non-empty".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Settings for the reactivity engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReactiveConfig {
    /// Batch watcher runs until the next tick. When false every queued watcher
    /// flushes inline and notification order follows creation order.
    pub async_mode: bool,

    /// How many times one watcher may re-queue itself within a single flush
    /// before the flush is aborted as an infinite update loop.
    pub max_update_count: u32,

    /// Suppresses non-fatal diagnostics (warnings) when set.
    pub production: bool,
}

impl Default for ReactiveConfig {
    fn default() -> Self {
        Self {
            async_mode: true,
            max_update_count: 100,
            production: false,
        }
    }
}

/// Serializable subset of the compiler options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompilerConfig {
    pub delimiters: Option<(String, String)>,
    pub preserve_whitespace: Option<bool>,
    pub whitespace: Option<WhitespaceMode>,
    pub comments: Option<bool>,
    pub output_source_range: Option<bool>,
    pub optimize: Option<bool>,
}

impl CompilerConfig {
    /// Build compiler options carrying these settings. Platform behaviour
    /// (modules, directives, tag tables) comes from the base options the
    /// result is merged over.
    pub fn to_options(&self) -> CompilerOptions {
        CompilerOptions {
            delimiters: self.delimiters.clone(),
            preserve_whitespace: self.preserve_whitespace,
            whitespace: self.whitespace,
            comments: self.comments,
            output_source_range: self.output_source_range,
            optimize: self.optimize,
            ..CompilerOptions::default()
        }
    }
}
