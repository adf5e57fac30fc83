//! Errors raised by a dump session.
//!
//! Only contract violations surface here. Heap state that statements cannot
//! reproduce is reported through `Dumper::warn` instead and never aborts a
//! session.

use thiserror::Error;

use crate::selector::SelectorError;
use crate::sub_dumper::Do;

pub type Result<T, E = DumpError> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DumpError {
    #[error(transparent)]
    Selector(#[from] SelectorError),

    /// A selector named a variable or property that does not exist in the
    /// heap being dumped.
    #[error("no such binding: {selector}")]
    NoSuchBinding { selector: String },

    /// A binding was asked to move to a level it has already reached.
    #[error("binding {binding}: cannot move from {from:?} to {to:?}")]
    NonMonotonic { binding: String, from: Do, to: Do },

    /// A binding of an object was dumped before the object itself exists.
    #[error("binding {binding}: object has not been created yet")]
    Uncreated { binding: String },

    /// Two call scopes claim the same arguments object, or one scope claims
    /// two.
    #[error("arguments object #{arguments} is already associated with scope #{existing}, not #{scope}")]
    ArgumentsRebound {
        arguments: u32,
        existing: u32,
        scope: u32,
    },

    #[error("invalid dumper options: {0}")]
    Options(String),

    #[error("output sink rejected a write")]
    Output,
}

impl From<serde_json::Error> for DumpError {
    fn from(error: serde_json::Error) -> Self {
        DumpError::Options(error.to_string())
    }
}
