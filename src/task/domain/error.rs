//! Error types for task domain validation and parsing.

use thiserror::Error;

/// Errors returned while constructing domain task values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskDomainError {
    /// The task title is empty.
    #[error("task title must not be empty")]
    EmptyTitle,

    /// The task title exceeds the permitted length.
    #[error("task title has {actual} characters, exceeds limit of {max}")]
    TitleTooLong {
        /// Maximum permitted character count.
        max: usize,
        /// Character count of the rejected title.
        actual: usize,
    },

    /// A scoping or actor identifier is empty after trimming.
    #[error("{0} must not be empty")]
    EmptyIdentifier(&'static str),

    /// An idempotency key is empty or too long.
    #[error("invalid idempotency key: {0}")]
    InvalidIdempotencyKey(String),

    /// A task version is zero or exceeds the storable range.
    #[error("task version must be between 1 and {max}, got {0}", max = i64::MAX)]
    InvalidVersion(u64),

    /// A task at the highest version cannot be changed again.
    #[error("task version {0} cannot be incremented")]
    VersionOverflow(u64),
}

/// Error returned while parsing a closed enumeration from its wire or
/// storage representation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    /// The enumeration being parsed, e.g. `task state`.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

impl ParseEnumError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}
