//! Diesel row models for task lifecycle persistence.

use super::schema::{idempotency_keys, task_events, tasks};
use crate::task::{
    domain::{
        EventId, IdempotencyKey, IdempotencyRecord, NewTaskEvent, PersistedTaskData, Role, Task,
        TaskChange, TaskChanges, TaskEvent, TaskEventKind, TaskEventType, TaskId, TaskPriority,
        TaskState, TaskTitle, TaskVersion, TenantId, UserId, WorkspaceId,
    },
    ports::{StoreError, StoreResult},
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

/// Query result row for task records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TaskRow {
    /// Task identifier.
    pub task_id: Uuid,
    /// Owning tenant.
    pub tenant_id: String,
    /// Owning workspace.
    pub workspace_id: String,
    /// Task title.
    pub title: String,
    /// Task priority.
    pub priority: String,
    /// Lifecycle state.
    pub state: String,
    /// Current assignee.
    pub assignee_id: Option<String>,
    /// Concurrency version.
    pub version: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl TaskRow {
    /// Rebuilds the domain task from a stored row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialization`] when a column holds a value the
    /// domain rejects.
    pub fn into_domain(self) -> StoreResult<Task> {
        let version = u64::try_from(self.version).map_err(StoreError::serialization)?;
        let data = PersistedTaskData {
            id: TaskId::from_uuid(self.task_id),
            tenant_id: TenantId::new(self.tenant_id).map_err(StoreError::serialization)?,
            workspace_id: WorkspaceId::new(self.workspace_id).map_err(StoreError::serialization)?,
            title: TaskTitle::new(self.title).map_err(StoreError::serialization)?,
            priority: TaskPriority::try_from(self.priority.as_str())
                .map_err(StoreError::serialization)?,
            state: TaskState::try_from(self.state.as_str()).map_err(StoreError::serialization)?,
            assignee_id: self
                .assignee_id
                .map(UserId::new)
                .transpose()
                .map_err(StoreError::serialization)?,
            version: TaskVersion::new(version).map_err(StoreError::serialization)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        };
        Ok(Task::from_persisted(data))
    }
}

/// Insert model for task records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = tasks)]
pub struct NewTaskRow {
    /// Task identifier.
    pub task_id: Uuid,
    /// Owning tenant.
    pub tenant_id: String,
    /// Owning workspace.
    pub workspace_id: String,
    /// Task title.
    pub title: String,
    /// Task priority.
    pub priority: String,
    /// Lifecycle state.
    pub state: String,
    /// Current assignee.
    pub assignee_id: Option<String>,
    /// Concurrency version.
    pub version: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl NewTaskRow {
    /// Converts a domain task into an insertable row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialization`] when `expected` cannot be
    /// incremented.
    pub fn try_from_domain(task: &Task) -> StoreResult<Self> {
        Ok(Self {
            task_id: task.id().into_inner(),
            tenant_id: task.tenant_id().as_str().to_owned(),
            workspace_id: task.workspace_id().as_str().to_owned(),
            title: task.title().as_str().to_owned(),
            priority: task.priority().as_str().to_owned(),
            state: task.state().as_str().to_owned(),
            assignee_id: task.assignee_id().map(|user| user.as_str().to_owned()),
            version: version_column(task.version())?,
            created_at: task.created_at(),
            updated_at: task.updated_at(),
        })
    }
}

/// Change set written by the compare-and-swap update.
///
/// `None` fields are left untouched.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = tasks)]
pub struct TaskChangeRow {
    /// New lifecycle state.
    pub state: Option<String>,
    /// New assignee.
    pub assignee_id: Option<String>,
    /// Incremented version.
    pub version: i64,
    /// Mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl TaskChangeRow {
    /// Builds the change set that moves a task from `expected` to the next
    /// version.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialization`] when `expected` cannot be
    /// incremented.
    pub fn try_from_domain(expected: TaskVersion, changes: &TaskChanges) -> StoreResult<Self> {
        let (state, assignee_id) = match &changes.change {
            TaskChange::Assign { assignee_id } => (None, Some(assignee_id.as_str().to_owned())),
            TaskChange::Transition { to } => (Some(to.as_str().to_owned()), None),
        };
        Ok(Self {
            state,
            assignee_id,
            version: version_column(
                expected.next().map_err(StoreError::serialization)?,
            )?,
            updated_at: changes.updated_at,
        })
    }
}

/// Query result row for task events.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = task_events)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TaskEventRow {
    /// Event identifier.
    pub event_id: Uuid,
    /// Task the event describes.
    pub task_id: Uuid,
    /// Tenant of the acting caller.
    pub tenant_id: String,
    /// Role of the acting caller.
    pub role: String,
    /// Event type.
    pub event_type: String,
    /// Type-specific payload.
    pub payload: Value,
    /// Insertion timestamp.
    pub created_at: DateTime<Utc>,
}

impl TaskEventRow {
    /// Rebuilds the domain event from a stored row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialization`] when the type, role or payload
    /// is not recognised.
    pub fn into_domain(self) -> StoreResult<TaskEvent> {
        let event_type =
            TaskEventType::try_from(self.event_type.as_str()).map_err(StoreError::serialization)?;
        Ok(TaskEvent {
            id: EventId::from_uuid(self.event_id),
            task_id: TaskId::from_uuid(self.task_id),
            tenant_id: TenantId::new(self.tenant_id).map_err(StoreError::serialization)?,
            role: Role::try_from(self.role.as_str()).map_err(StoreError::serialization)?,
            kind: TaskEventKind::from_parts(event_type, self.payload)
                .map_err(StoreError::serialization)?,
            created_at: self.created_at,
        })
    }
}

/// Insert model for task events; `created_at` is left to the database.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = task_events)]
pub struct NewTaskEventRow {
    /// Event identifier.
    pub event_id: Uuid,
    /// Task the event describes.
    pub task_id: Uuid,
    /// Tenant of the acting caller.
    pub tenant_id: String,
    /// Role of the acting caller.
    pub role: String,
    /// Event type.
    pub event_type: String,
    /// Type-specific payload.
    pub payload: Value,
}

impl NewTaskEventRow {
    /// Converts a domain event into an insertable row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialization`] when the payload cannot be
    /// encoded.
    pub fn try_from_domain(event: &NewTaskEvent) -> StoreResult<Self> {
        Ok(Self {
            event_id: event.id.into_inner(),
            task_id: event.task_id.into_inner(),
            tenant_id: event.tenant_id.as_str().to_owned(),
            role: event.role.as_str().to_owned(),
            event_type: event.kind.event_type().as_str().to_owned(),
            payload: event.kind.payload_json().map_err(StoreError::serialization)?,
        })
    }
}

/// Query result row for idempotency records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = idempotency_keys)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct IdempotencyRow {
    /// Client-supplied key.
    pub key: String,
    /// Task created by the first request.
    pub task_id: Uuid,
    /// Response returned on first execution.
    pub response: Value,
}

impl IdempotencyRow {
    /// Rebuilds the domain record from a stored row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialization`] when the stored key is invalid.
    pub fn into_domain(self) -> StoreResult<IdempotencyRecord> {
        Ok(IdempotencyRecord::new(
            IdempotencyKey::new(self.key).map_err(StoreError::serialization)?,
            TaskId::from_uuid(self.task_id),
            self.response,
        ))
    }
}

/// Insert model for idempotency records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = idempotency_keys)]
pub struct NewIdempotencyRow {
    /// Client-supplied key.
    pub key: String,
    /// Task created by the first request.
    pub task_id: Uuid,
    /// Response returned on first execution.
    pub response: Value,
}

impl From<&IdempotencyRecord> for NewIdempotencyRow {
    fn from(record: &IdempotencyRecord) -> Self {
        Self {
            key: record.key.as_str().to_owned(),
            task_id: record.task_id.into_inner(),
            response: record.response.clone(),
        }
    }
}

/// Converts a domain version into its `BIGINT` column value.
pub(super) fn version_column(version: TaskVersion) -> StoreResult<i64> {
    i64::try_from(version.value()).map_err(StoreError::serialization)
}
