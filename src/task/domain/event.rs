//! Outbox events describing committed task changes.

use super::{EventId, ParseEnumError, Role, Task, TaskId, TaskPriority, TaskState, TenantId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Closed set of task event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskEventType {
    /// A task was created.
    TaskCreated,
    /// A task was assigned.
    TaskAssigned,
    /// A task changed lifecycle state.
    TaskStateChanged,
}

impl TaskEventType {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TaskCreated => "TaskCreated",
            Self::TaskAssigned => "TaskAssigned",
            Self::TaskStateChanged => "TaskStateChanged",
        }
    }
}

impl TryFrom<&str> for TaskEventType {
    type Error = ParseEnumError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim() {
            "TaskCreated" => Ok(Self::TaskCreated),
            "TaskAssigned" => Ok(Self::TaskAssigned),
            "TaskStateChanged" => Ok(Self::TaskStateChanged),
            _ => Err(ParseEnumError::new("task event type", value)),
        }
    }
}

impl fmt::Display for TaskEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot recorded when a task is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCreatedPayload {
    /// Title at creation.
    pub title: String,
    /// Priority at creation.
    pub priority: TaskPriority,
    /// Initial state.
    pub state: TaskState,
}

/// Snapshot recorded when a task is assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskAssignedPayload {
    /// The new assignee.
    pub assignee_id: UserId,
}

/// Snapshot recorded when a task changes state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStateChangedPayload {
    /// Previous state.
    pub from: TaskState,
    /// New state.
    pub to: TaskState,
}

/// Typed event payload; the variant determines the event type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEventKind {
    /// See [`TaskEventType::TaskCreated`].
    Created(TaskCreatedPayload),
    /// See [`TaskEventType::TaskAssigned`].
    Assigned(TaskAssignedPayload),
    /// See [`TaskEventType::TaskStateChanged`].
    StateChanged(TaskStateChangedPayload),
}

impl TaskEventKind {
    /// Builds the creation payload from a freshly created task.
    #[must_use]
    pub fn created(task: &Task) -> Self {
        Self::Created(TaskCreatedPayload {
            title: task.title().as_str().to_owned(),
            priority: task.priority(),
            state: task.state(),
        })
    }

    /// Builds an assignment payload.
    #[must_use]
    pub const fn assigned(assignee_id: UserId) -> Self {
        Self::Assigned(TaskAssignedPayload { assignee_id })
    }

    /// Builds a state-change payload.
    #[must_use]
    pub const fn state_changed(from: TaskState, to: TaskState) -> Self {
        Self::StateChanged(TaskStateChangedPayload { from, to })
    }

    /// Returns the event type for this payload.
    #[must_use]
    pub const fn event_type(&self) -> TaskEventType {
        match self {
            Self::Created(_) => TaskEventType::TaskCreated,
            Self::Assigned(_) => TaskEventType::TaskAssigned,
            Self::StateChanged(_) => TaskEventType::TaskStateChanged,
        }
    }

    /// Serializes the payload body without its type tag.
    ///
    /// # Errors
    ///
    /// Returns the underlying `serde_json` error if serialization fails.
    pub fn payload_json(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::Created(payload) => serde_json::to_value(payload),
            Self::Assigned(payload) => serde_json::to_value(payload),
            Self::StateChanged(payload) => serde_json::to_value(payload),
        }
    }

    /// Rebuilds a typed payload from its stored type and body.
    ///
    /// # Errors
    ///
    /// Returns the underlying `serde_json` error when the body does not
    /// match the schema of `event_type`.
    pub fn from_parts(event_type: TaskEventType, payload: Value) -> Result<Self, serde_json::Error> {
        Ok(match event_type {
            TaskEventType::TaskCreated => Self::Created(serde_json::from_value(payload)?),
            TaskEventType::TaskAssigned => Self::Assigned(serde_json::from_value(payload)?),
            TaskEventType::TaskStateChanged => {
                Self::StateChanged(serde_json::from_value(payload)?)
            }
        })
    }
}

/// Event about to be appended to the outbox.
///
/// The store stamps `created_at` at insert time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTaskEvent {
    /// Event identifier generated at write time.
    pub id: EventId,
    /// Task the event describes.
    pub task_id: TaskId,
    /// Tenant of the acting caller.
    pub tenant_id: TenantId,
    /// Role of the acting caller.
    pub role: Role,
    /// Typed payload.
    pub kind: TaskEventKind,
}

impl NewTaskEvent {
    /// Creates an event with a fresh identifier.
    #[must_use]
    pub fn new(task_id: TaskId, tenant_id: TenantId, role: Role, kind: TaskEventKind) -> Self {
        Self {
            id: EventId::new(),
            task_id,
            tenant_id,
            role,
            kind,
        }
    }

    /// Attaches the store-assigned timestamp, producing a persisted event.
    #[must_use]
    pub fn into_recorded(self, created_at: DateTime<Utc>) -> TaskEvent {
        TaskEvent {
            id: self.id,
            task_id: self.task_id,
            tenant_id: self.tenant_id,
            role: self.role,
            kind: self.kind,
            created_at,
        }
    }
}

/// Immutable, committed task event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskEvent {
    /// Event identifier.
    pub id: EventId,
    /// Task the event describes.
    pub task_id: TaskId,
    /// Tenant of the acting caller.
    pub tenant_id: TenantId,
    /// Role of the acting caller.
    pub role: Role,
    /// Typed payload.
    pub kind: TaskEventKind,
    /// Store-assigned insertion time.
    pub created_at: DateTime<Utc>,
}

impl TaskEvent {
    /// Returns the event type.
    #[must_use]
    pub const fn event_type(&self) -> TaskEventType {
        self.kind.event_type()
    }

    /// Sort key defining the timeline order.
    #[must_use]
    pub const fn order_key(&self) -> (DateTime<Utc>, EventId) {
        (self.created_at, self.id)
    }
}
