//! Idempotency records for retried task creation.

use super::{IdempotencyKey, TaskId};
use serde_json::Value;

/// First-write-wins mapping from a client key to the response it produced.
///
/// The response is opaque to the store and is replayed verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdempotencyRecord {
    /// Client-supplied key.
    pub key: IdempotencyKey,
    /// Task created by the first request bearing the key.
    pub task_id: TaskId,
    /// Serialized response returned on first execution.
    pub response: Value,
}

impl IdempotencyRecord {
    /// Creates a record.
    #[must_use]
    pub const fn new(key: IdempotencyKey, task_id: TaskId, response: Value) -> Self {
        Self {
            key,
            task_id,
            response,
        }
    }
}
