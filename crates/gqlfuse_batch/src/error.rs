//! Typed errors for batch composition.
//!
//! Structural problems (a template with the wrong shape, colliding names, an
//! empty batch) are returned as [`ComposeError`]. Failures of individual
//! batch items are never errors: they are reported as data by the
//! demultiplexer.

use gqlfuse_core::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Stable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ShapeError,
    CollisionError,
    EmptyBatch,
    BatchTooLarge,
    DuplicateItem,
    UnknownVariable,
    ParseError,
    OperationNotFound,
    NoOperation,
    TransportError,
}

impl ErrorCode {
    /// Returns the string representation of the error code.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ShapeError => "SHAPE_ERROR",
            Self::CollisionError => "COLLISION_ERROR",
            Self::EmptyBatch => "EMPTY_BATCH",
            Self::BatchTooLarge => "BATCH_TOO_LARGE",
            Self::DuplicateItem => "DUPLICATE_ITEM",
            Self::UnknownVariable => "UNKNOWN_VARIABLE",
            Self::ParseError => "PARSE_ERROR",
            Self::OperationNotFound => "OPERATION_NOT_FOUND",
            Self::NoOperation => "NO_OPERATION",
            Self::TransportError => "TRANSPORT_ERROR",
        }
    }

    /// Returns true if the caller built an invalid template or batch.
    pub const fn is_client_error(&self) -> bool {
        !matches!(self, Self::TransportError)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Two names that must stay distinct ended up equal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollisionError {
    /// Both operations declare the same variable.
    #[error("variable `${name}` is declared by both operations")]
    Variable { name: String },

    /// Both operations select the same top-level response key.
    #[error("response key `{key}` is selected by both operations")]
    ResponseKey { key: String },

    /// A rename maps two distinct variables onto one name.
    #[error("variables `${first}` and `${second}` would both be named `${target}`")]
    Rename {
        first: String,
        second: String,
        target: String,
    },
}

/// The transport could not deliver the request or read the response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("transport failed: {message}")]
pub struct TransportError {
    pub message: String,
    /// Whether resending the same request may succeed.
    pub retryable: bool,
}

impl TransportError {
    /// Creates a non-retryable transport error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }

    /// Creates a retryable transport error (timeouts, refused connections).
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }
}

/// Error returned by composition, template parsing and batch execution.
#[derive(Error, Debug, Clone)]
pub enum ComposeError {
    #[error("shape error: {message}")]
    Shape { message: String },

    #[error(transparent)]
    Collision(#[from] CollisionError),

    #[error("cannot compose an empty batch")]
    EmptyBatch,

    #[error("batch of {len} items exceeds the limit of {max}")]
    BatchTooLarge { len: usize, max: usize },

    #[error("batch item at `{alias}` repeats the identity of an earlier item")]
    DuplicateItem { alias: String },

    #[error("value supplied for undeclared variable `${name}`")]
    UnknownVariable { name: String },

    #[error("template failed to parse with {} error(s):\n{rendered}", .diagnostics.len())]
    Parse {
        diagnostics: Vec<Diagnostic>,
        /// The diagnostics rendered against the template source.
        rendered: String,
    },

    #[error("operation `{name}` not found")]
    OperationNotFound { name: String },

    #[error("document does not contain exactly one operation")]
    NoOperation,

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ComposeError {
    /// Creates a shape error.
    pub fn shape(message: impl Into<String>) -> Self {
        Self::Shape {
            message: message.into(),
        }
    }

    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Shape { .. } => ErrorCode::ShapeError,
            Self::Collision(_) => ErrorCode::CollisionError,
            Self::EmptyBatch => ErrorCode::EmptyBatch,
            Self::BatchTooLarge { .. } => ErrorCode::BatchTooLarge,
            Self::DuplicateItem { .. } => ErrorCode::DuplicateItem,
            Self::UnknownVariable { .. } => ErrorCode::UnknownVariable,
            Self::Parse { .. } => ErrorCode::ParseError,
            Self::OperationNotFound { .. } => ErrorCode::OperationNotFound,
            Self::NoOperation => ErrorCode::NoOperation,
            Self::Transport(_) => ErrorCode::TransportError,
        }
    }

    /// Returns true only for transport failures flagged retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(err) if err.retryable)
    }
}

/// Type alias for composition results.
pub type ComposeResult<T> = std::result::Result<T, ComposeError>;
