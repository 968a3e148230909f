//! Task aggregate root and related task lifecycle types.

use super::{
    ParseEnumError, TaskDomainError, TaskId, TaskTitle, TaskVersion, TenantId, UserId, WorkspaceId,
};
use chrono::{DateTime, SubsecRound, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Task lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    /// Task has been created but work has not started.
    New,
    /// Task is being worked on.
    InProgress,
    /// Task has been completed.
    Done,
    /// Task has been abandoned.
    Cancelled,
}

impl TaskState {
    /// Every state, in lifecycle order.
    pub const ALL: [Self; 4] = [Self::New, Self::InProgress, Self::Done, Self::Cancelled];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::InProgress => "IN_PROGRESS",
            Self::Done => "DONE",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Returns `true` when the state has no outgoing transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Cancelled)
    }

    /// Returns `true` when a task in this state may be (re)assigned.
    #[must_use]
    pub const fn is_active(self) -> bool {
        !self.is_terminal()
    }
}

impl TryFrom<&str> for TaskState {
    type Error = ParseEnumError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_uppercase();
        match normalized.as_str() {
            "NEW" => Ok(Self::New),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "DONE" => Ok(Self::Done),
            "CANCELLED" => Ok(Self::Cancelled),
            _ => Err(ParseEnumError::new("task state", value)),
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPriority {
    /// Low urgency.
    Low,
    /// Default urgency.
    #[default]
    Medium,
    /// High urgency.
    High,
}

impl TaskPriority {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

impl TryFrom<&str> for TaskPriority {
    type Error = ParseEnumError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_uppercase();
        match normalized.as_str() {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            _ => Err(ParseEnumError::new("task priority", value)),
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single mutation of a task's mutable fields.
///
/// Every variant changes either `state` or `assignee_id`, so applying one
/// always advances the version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskChange {
    /// Sets the task assignee.
    Assign {
        /// The new assignee.
        assignee_id: UserId,
    },
    /// Moves the task to another lifecycle state.
    Transition {
        /// The target state.
        to: TaskState,
    },
}

/// Change set handed to the compare-and-swap update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskChanges {
    /// The field mutation.
    pub change: TaskChange,
    /// Timestamp recorded as the task's `updated_at`.
    pub updated_at: DateTime<Utc>,
}

impl TaskChanges {
    /// Creates a change set stamped with the current clock time.
    #[must_use]
    pub fn new(change: TaskChange, clock: &impl Clock) -> Self {
        Self {
            change,
            updated_at: storage_timestamp(clock),
        }
    }
}

/// Task aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    tenant_id: TenantId,
    workspace_id: WorkspaceId,
    title: TaskTitle,
    priority: TaskPriority,
    state: TaskState,
    assignee_id: Option<UserId>,
    version: TaskVersion,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted task aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTaskData {
    /// Persisted task identifier.
    pub id: TaskId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Owning workspace.
    pub workspace_id: WorkspaceId,
    /// Task title.
    pub title: TaskTitle,
    /// Task priority.
    pub priority: TaskPriority,
    /// Persisted lifecycle state.
    pub state: TaskState,
    /// Current assignee, if any.
    pub assignee_id: Option<UserId>,
    /// Persisted concurrency version.
    pub version: TaskVersion,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a new unassigned task in [`TaskState::New`] at version 1.
    #[must_use]
    pub fn new(
        tenant_id: TenantId,
        workspace_id: WorkspaceId,
        title: TaskTitle,
        priority: TaskPriority,
        clock: &impl Clock,
    ) -> Self {
        let timestamp = storage_timestamp(clock);
        Self {
            id: TaskId::new(),
            tenant_id,
            workspace_id,
            title,
            priority,
            state: TaskState::New,
            assignee_id: None,
            version: TaskVersion::INITIAL,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskData) -> Self {
        Self {
            id: data.id,
            tenant_id: data.tenant_id,
            workspace_id: data.workspace_id,
            title: data.title,
            priority: data.priority,
            state: data.state,
            assignee_id: data.assignee_id,
            version: data.version,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the owning tenant.
    #[must_use]
    pub const fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    /// Returns the owning workspace.
    #[must_use]
    pub const fn workspace_id(&self) -> &WorkspaceId {
        &self.workspace_id
    }

    /// Returns the task title.
    #[must_use]
    pub const fn title(&self) -> &TaskTitle {
        &self.title
    }

    /// Returns the task priority.
    #[must_use]
    pub const fn priority(&self) -> TaskPriority {
        self.priority
    }

    /// Returns the task lifecycle state.
    #[must_use]
    pub const fn state(&self) -> TaskState {
        self.state
    }

    /// Returns the current assignee, if any.
    #[must_use]
    pub const fn assignee_id(&self) -> Option<&UserId> {
        self.assignee_id.as_ref()
    }

    /// Returns the concurrency version.
    #[must_use]
    pub const fn version(&self) -> TaskVersion {
        self.version
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest mutation timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the snapshot this task becomes once `changes` commit.
    ///
    /// The version advances by exactly one. Callers validate legality and
    /// authorization before building the change set.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::VersionOverflow`] when the task is already at
    /// [`TaskVersion::MAX`].
    pub fn with_changes(&self, changes: &TaskChanges) -> Result<Self, TaskDomainError> {
        let mut next = self.clone();
        match &changes.change {
            TaskChange::Assign { assignee_id } => next.assignee_id = Some(assignee_id.clone()),
            TaskChange::Transition { to } => next.state = *to,
        }
        next.version = self.version.next()?;
        next.updated_at = changes.updated_at;
        Ok(next)
    }
}

/// Current time at the microsecond precision `PostgreSQL` stores.
fn storage_timestamp(clock: &impl Clock) -> DateTime<Utc> {
    clock.utc().trunc_subsecs(6)
}
