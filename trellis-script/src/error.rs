//! Script-side error types.

use thiserror::Error;

/// A value that cannot cross the script/native boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MarshalError {
    #[error("values of type `{type_name}` cannot cross the script boundary")]
    UnsupportedType { type_name: String },

    #[error("value nested deeper than {limit} levels")]
    DepthExceeded { limit: usize },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecutorError {
    #[error("script executor is not initialized")]
    NotInitialized,

    #[error("script executor is already initialized")]
    AlreadyInitialized,

    #[error("script executor has been disposed")]
    Disposed,

    #[error("cannot invoke {target}: {reason}")]
    Invocation { target: String, reason: String },

    #[error("script error: {message}")]
    Script { message: String },

    #[error(transparent)]
    Marshal(#[from] MarshalError),

    #[error("script thread is gone")]
    ThreadGone,
}

impl From<Box<rhai::EvalAltResult>> for ExecutorError {
    fn from(err: Box<rhai::EvalAltResult>) -> Self {
        ExecutorError::Script {
            message: err.to_string(),
        }
    }
}

impl From<rhai::ParseError> for ExecutorError {
    fn from(err: rhai::ParseError) -> Self {
        ExecutorError::Script {
            message: err.to_string(),
        }
    }
}
