//! Error types for tree mutation, streaming, and path evaluation.

use thiserror::Error;

/// Errors that can occur while building, mutating, or querying a document tree.
#[derive(Error, Debug)]
pub enum ArborError {
    /// Malformed source text or malformed path grammar.
    /// `line`/`column` are 1-based when the source reader provides them, 0 otherwise.
    #[error("parse error at line {line}, column {column}: {message}")]
    Parse {
        line: usize,
        column: usize,
        message: String,
    },

    /// A child of the wrong kind was offered to a container.
    #[error("wrong node type: {0}")]
    WrongType(String),

    /// An operation was attempted on a node whose current state does not permit it
    /// (unparented node, mutation during notification dispatch, writer misuse).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Strict array or path indexing out of range.
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// Strict path evaluation found no matching node.
    #[error("no match: {0}")]
    NoMatch(String),
}

impl From<serde_json::Error> for ArborError {
    fn from(err: serde_json::Error) -> Self {
        ArborError::Parse {
            line: err.line(),
            column: err.column(),
            message: err.to_string(),
        }
    }
}

/// Convenience alias used throughout arbor-core.
pub type Result<T> = std::result::Result<T, ArborError>;
