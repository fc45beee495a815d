//! Error Types
//!
//! Errors that cross module boundaries. Template diagnostics are *not* errors:
//! they are collected as data on the compiled result (see
//! [`crate::compiler::Diagnostic`]).

use thiserror::Error;

/// An error raised while evaluating an expression or a render procedure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// The expression source could not be parsed.
    #[error("syntax error: {message} (at offset {offset})")]
    Syntax { message: String, offset: usize },

    /// A property was read from `null` or `undefined`.
    #[error("cannot read property '{property}' of {target}")]
    NullishAccess { property: String, target: &'static str },

    /// A non-callable value was called.
    #[error("{0} is not a function")]
    NotCallable(String),

    /// The left-hand side of an assignment is not assignable.
    #[error("invalid assignment target: {0}")]
    InvalidAssignment(String),

    /// The expression uses a construct the engine does not support.
    #[error("unsupported expression: {0}")]
    Unsupported(String),

    /// The instance that owns a closure was dropped before the call.
    #[error("the owning instance is no longer alive")]
    InstanceGone,

    /// An error raised by user code (a native function, a callback).
    #[error("{0}")]
    Thrown(String),
}

impl EvalError {
    /// Convenience constructor for errors raised from host callbacks.
    pub fn thrown(message: impl Into<String>) -> Self {
        Self::Thrown(message.into())
    }
}

/// An error raised by the reactivity engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReactiveError {
    /// Evaluating a watcher getter, a callback, or a render procedure failed.
    #[error("error in {info}: {source}")]
    Evaluation {
        info: String,
        #[source]
        source: EvalError,
    },

    /// A watcher kept re-queueing itself within one flush.
    #[error("you may have an infinite update loop in watcher \"{expression}\" (more than {limit} re-runs in one flush)")]
    InfiniteUpdateLoop { expression: String, limit: u32 },

    /// A render procedure produced something other than a single node.
    #[error("render procedure must return a single root node, got {0}")]
    InvalidRenderResult(String),

    /// `mount` was called without a render program.
    #[error("instance \"{0}\" has no render program to mount")]
    MissingRenderProgram(String),
}

impl ReactiveError {
    pub(crate) fn evaluation(info: impl Into<String>, source: EvalError) -> Self {
        Self::Evaluation {
            info: info.into(),
            source,
        }
    }

    /// Unwrap into the underlying evaluation error, so that a failure inside
    /// a nested read (a computed property, a render) can propagate through
    /// an expression.
    pub fn into_eval(self) -> EvalError {
        match self {
            Self::Evaluation { source, .. } => source,
            other => EvalError::Thrown(other.to_string()),
        }
    }
}

/// An error raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluation_error_message_names_the_watcher() {
        let err = ReactiveError::evaluation(
            "getter for watcher \"a.b\"",
            EvalError::NullishAccess {
                property: "b".into(),
                target: "undefined",
            },
        );
        assert_eq!(
            err.to_string(),
            "error in getter for watcher \"a.b\": cannot read property 'b' of undefined"
        );
    }

    #[test]
    fn config_error_wraps_json_errors() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: ConfigError = json_err.into();
        assert!(err.to_string().starts_with("invalid configuration"));
    }
}
