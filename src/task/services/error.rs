//! Service-level errors and their client-facing classification.

use crate::task::{
    domain::{
        AuthorizationFailure, IdempotencyKey, InvalidTransition, TaskDomainError, TaskId,
        TaskVersion,
    },
    ports::StoreError,
};
use thiserror::Error;

/// Service-level errors for task lifecycle operations.
#[derive(Debug, Error)]
pub enum TaskLifecycleError {
    /// Input failed domain validation.
    #[error(transparent)]
    Validation(#[from] TaskDomainError),

    /// The task does not exist in the workspace.
    #[error("task {0} not found")]
    NotFound(TaskId),

    /// The caller's role or identity does not permit the operation.
    #[error("unauthorized: {0}")]
    Unauthorized(#[from] AuthorizationFailure),

    /// The requested state edge does not exist.
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    /// The task moved past the caller's expected version.
    #[error("version conflict on task {task_id}: expected version {expected} is stale")]
    VersionConflict {
        /// Task that was targeted.
        task_id: TaskId,
        /// Version the caller supplied.
        expected: TaskVersion,
    },

    /// A list continuation cursor could not be decoded.
    #[error("invalid continuation cursor")]
    InvalidCursor,

    /// A duplicate-key conflict was reported but no winning record exists.
    #[error("idempotency record for key {0} is missing after a duplicate-key conflict")]
    IdempotencyRecordMissing(IdempotencyKey),

    /// Store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for task service operations.
pub type TaskLifecycleResult<T> = Result<T, TaskLifecycleError>;

/// Client-visible class of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorOutcome {
    /// Malformed input.
    BadRequest,
    /// Referenced task does not exist.
    NotFound,
    /// Role or ownership rule violated.
    Forbidden,
    /// Illegal transition or stale version.
    Conflict,
    /// Unclassified failure; details stay server-side.
    Internal,
}

impl ErrorOutcome {
    /// Returns the conventional HTTP status code.
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::NotFound => 404,
            Self::Forbidden => 403,
            Self::Conflict => 409,
            Self::Internal => 500,
        }
    }
}

impl TaskLifecycleError {
    /// Classifies the error for the transport layer.
    #[must_use]
    pub const fn outcome(&self) -> ErrorOutcome {
        match self {
            Self::Validation(_) | Self::InvalidCursor => ErrorOutcome::BadRequest,
            Self::NotFound(_) => ErrorOutcome::NotFound,
            Self::Unauthorized(_) => ErrorOutcome::Forbidden,
            Self::InvalidTransition(_) | Self::VersionConflict { .. } => ErrorOutcome::Conflict,
            Self::IdempotencyRecordMissing(_) | Self::Store(_) => ErrorOutcome::Internal,
        }
    }

    /// Returns a message safe to show the caller.
    ///
    /// Internal failures collapse to a generic message.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            Self::Validation(_) | Self::InvalidCursor => self.to_string(),
            Self::NotFound(_) => "Task not found".to_owned(),
            Self::Unauthorized(_) => "Forbidden".to_owned(),
            Self::InvalidTransition(edge) => {
                format!("Invalid transition {} -> {}", edge.from, edge.to)
            }
            Self::VersionConflict { .. } => {
                "Version conflict: refetch the task and retry with its current version".to_owned()
            }
            Self::IdempotencyRecordMissing(_) | Self::Store(_) => {
                "Internal Server Error".to_owned()
            }
        }
    }
}
