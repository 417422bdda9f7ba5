//! UI-side error types.

use thiserror::Error;
use trellis_api::{ProtocolError, ViewTag};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum UiError {
    #[error("no view manager registered for class `{0}`")]
    UnknownViewClass(String),

    #[error("unknown view {0}")]
    UnknownTag(ViewTag),

    #[error("view {0} already exists")]
    DuplicateTag(ViewTag),

    #[error("index {index} out of range for {parent} with {count} children")]
    IndexOutOfRange {
        parent: ViewTag,
        index: usize,
        count: usize,
    },

    #[error("invalid children for {parent}: {reason}")]
    InvalidChildren { parent: ViewTag, reason: String },

    #[error("view {tag} of class `{class_name}` cannot host children")]
    NotAContainer { tag: ViewTag, class_name: String },

    #[error("property `{property}` expects {expected}, found {found}")]
    PropertyType {
        property: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("UI thread is gone")]
    ThreadGone,
}
