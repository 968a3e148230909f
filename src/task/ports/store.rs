//! Persistence ports for tasks, outbox events and idempotency records.
//!
//! Every method takes `&mut self`: implementors are transaction handles, so
//! all calls made through one handle share a single unit of work.

use crate::task::domain::{
    IdempotencyKey, IdempotencyRecord, NewTaskEvent, Task, TaskChanges, TaskEvent, TaskId,
    TaskState, TaskVersion, UserId, WorkspaceId,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Position of a task in the newest-first listing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskListPosition {
    /// Creation time of the last task already returned.
    pub created_at: DateTime<Utc>,
    /// Identifier of the last task already returned.
    pub task_id: TaskId,
}

impl TaskListPosition {
    /// Returns the listing position of `task`.
    #[must_use]
    pub const fn of(task: &Task) -> Self {
        Self {
            created_at: task.created_at(),
            task_id: task.id(),
        }
    }
}

/// Windowed, workspace-scoped task query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskListQuery {
    /// Workspace to list.
    pub workspace_id: WorkspaceId,
    /// Optional state filter.
    pub state: Option<TaskState>,
    /// Optional assignee filter.
    pub assignee_id: Option<UserId>,
    /// Only tasks strictly after this position are returned.
    pub after: Option<TaskListPosition>,
    /// Maximum number of rows to return.
    pub limit: usize,
}

/// Task row persistence.
pub trait TaskStore {
    /// Inserts a new task row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateTask`] when the identifier already exists.
    fn insert_task(&mut self, task: &Task) -> StoreResult<()>;

    /// Finds a task by identifier within a workspace.
    ///
    /// Returns `None` when the task does not exist or belongs to another
    /// workspace.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn find_task(&mut self, id: TaskId, workspace_id: &WorkspaceId) -> StoreResult<Option<Task>>;

    /// Applies `changes` and increments the version, but only where the
    /// stored version equals `expected`.
    ///
    /// Returns the number of rows affected: 1 on success, 0 when the version
    /// has already moved (or the task does not exist).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the update fails.
    fn compare_and_swap_task(
        &mut self,
        id: TaskId,
        expected: TaskVersion,
        changes: &TaskChanges,
    ) -> StoreResult<u64>;

    /// Lists tasks newest first by `(created_at, task_id)`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn list_tasks(&mut self, query: &TaskListQuery) -> StoreResult<Vec<Task>>;
}

/// Append-only outbox of task events.
pub trait TaskEventStore {
    /// Appends an event; the store assigns `created_at`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the insert fails.
    fn append_event(&mut self, event: &NewTaskEvent) -> StoreResult<()>;

    /// Returns up to `limit` events for a task, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn recent_events_for_task(&mut self, task_id: TaskId, limit: usize)
    -> StoreResult<Vec<TaskEvent>>;

    /// Returns up to `limit` events across all tasks, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn latest_events(&mut self, limit: usize) -> StoreResult<Vec<TaskEvent>>;
}

/// First-write-wins register of idempotency keys.
pub trait IdempotencyStore {
    /// Looks up a previously recorded key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn find_idempotency_record(
        &mut self,
        key: &IdempotencyKey,
    ) -> StoreResult<Option<IdempotencyRecord>>;

    /// Records a key. Never overwrites.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateIdempotencyKey`] when the key is
    /// already recorded; callers re-read instead of failing.
    fn save_idempotency_record(&mut self, record: &IdempotencyRecord) -> StoreResult<()>;
}

/// A transaction handle exposing every store.
pub trait StoreScope: TaskStore + TaskEventStore + IdempotencyStore {}

impl<T> StoreScope for T where T: TaskStore + TaskEventStore + IdempotencyStore {}

/// Errors returned by store implementations.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// A task with the same identifier already exists.
    #[error("duplicate task identifier: {0}")]
    DuplicateTask(TaskId),

    /// The idempotency key was recorded by another request.
    #[error("idempotency key already recorded: {0}")]
    DuplicateIdempotencyKey(IdempotencyKey),

    /// A stored value could not be converted to or from its domain type.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }

    /// Wraps a conversion failure.
    pub fn serialization(err: impl std::fmt::Display) -> Self {
        Self::Serialization(err.to_string())
    }
}
