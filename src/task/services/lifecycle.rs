//! Task mutations: create, assign and transition.
//!
//! Each mutation runs as one unit of work through a [`TransactionRunner`]:
//! the task write, its outbox event and (for create) the idempotency record
//! commit together or not at all.

use super::error::{ErrorOutcome, TaskLifecycleError, TaskLifecycleResult};
use crate::task::{
    domain::{
        IdempotencyKey, IdempotencyRecord, NewTaskEvent, Role, Task, TaskChange, TaskChanges,
        TaskEventKind, TaskId, TaskPriority, TaskState, TaskTitle, TaskVersion, TenantId, UserId,
        WorkspaceId, assert_legal, authorize_assigner, authorize_assignment_target,
        authorize_transition,
    },
    ports::{IdempotencyStore, StoreError, TaskEventStore, TaskStore, TransactionRunner},
};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Identity of the party issuing a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerContext {
    tenant_id: TenantId,
    role: Role,
    user_id: Option<UserId>,
}

impl CallerContext {
    /// Creates a caller context without an acting user.
    #[must_use]
    pub const fn new(tenant_id: TenantId, role: Role) -> Self {
        Self {
            tenant_id,
            role,
            user_id: None,
        }
    }

    /// Sets the acting user.
    #[must_use]
    pub fn with_user_id(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Returns the tenant.
    #[must_use]
    pub const fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    /// Returns the role.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Returns the acting user, when supplied.
    #[must_use]
    pub const fn user_id(&self) -> Option<&UserId> {
        self.user_id.as_ref()
    }
}

/// Request payload for creating a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTaskRequest {
    workspace_id: WorkspaceId,
    title: String,
    priority: Option<TaskPriority>,
    idempotency_key: Option<IdempotencyKey>,
}

impl CreateTaskRequest {
    /// Creates a request with the required fields.
    #[must_use]
    pub fn new(workspace_id: WorkspaceId, title: impl Into<String>) -> Self {
        Self {
            workspace_id,
            title: title.into(),
            priority: None,
            idempotency_key: None,
        }
    }

    /// Sets the priority. Defaults to [`TaskPriority::Medium`].
    #[must_use]
    pub const fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Sets the idempotency key.
    #[must_use]
    pub fn with_idempotency_key(mut self, key: IdempotencyKey) -> Self {
        self.idempotency_key = Some(key);
        self
    }
}

/// Response returned by create, and replayed verbatim for a repeated
/// idempotency key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTaskResponse {
    /// Identifier of the created task.
    pub task_id: TaskId,
    /// State at creation.
    pub state: TaskState,
    /// Version at creation.
    pub version: TaskVersion,
}

impl From<&Task> for CreateTaskResponse {
    fn from(task: &Task) -> Self {
        Self {
            task_id: task.id(),
            state: task.state(),
            version: task.version(),
        }
    }
}

/// Request payload for assigning a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignTaskRequest {
    task_id: TaskId,
    workspace_id: WorkspaceId,
    assignee_id: UserId,
    expected_version: TaskVersion,
}

impl AssignTaskRequest {
    /// Creates an assignment request.
    #[must_use]
    pub const fn new(
        task_id: TaskId,
        workspace_id: WorkspaceId,
        assignee_id: UserId,
        expected_version: TaskVersion,
    ) -> Self {
        Self {
            task_id,
            workspace_id,
            assignee_id,
            expected_version,
        }
    }
}

/// Request payload for moving a task to another state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionTaskRequest {
    task_id: TaskId,
    workspace_id: WorkspaceId,
    to_state: TaskState,
    expected_version: TaskVersion,
}

impl TransitionTaskRequest {
    /// Creates a transition request.
    #[must_use]
    pub const fn new(
        task_id: TaskId,
        workspace_id: WorkspaceId,
        to_state: TaskState,
        expected_version: TaskVersion,
    ) -> Self {
        Self {
            task_id,
            workspace_id,
            to_state,
            expected_version,
        }
    }
}

/// Task lifecycle orchestration service.
#[derive(Clone)]
pub struct TaskLifecycleService<R, C>
where
    R: TransactionRunner,
    C: Clock + Send + Sync,
{
    runner: Arc<R>,
    clock: Arc<C>,
}

impl<R, C> TaskLifecycleService<R, C>
where
    R: TransactionRunner,
    C: Clock + Send + Sync,
{
    /// Creates a new task lifecycle service.
    #[must_use]
    pub const fn new(runner: Arc<R>, clock: Arc<C>) -> Self {
        Self { runner, clock }
    }

    /// Creates a task in state `NEW` at version 1.
    ///
    /// A previously recorded idempotency key short-circuits everything else,
    /// including title validation, and returns the stored response.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Validation`] for an invalid title, or
    /// [`TaskLifecycleError::Store`] when persistence fails.
    #[instrument(
        skip_all,
        fields(workspace_id = %request.workspace_id, tenant_id = %caller.tenant_id())
    )]
    pub async fn create_task(
        &self,
        caller: &CallerContext,
        request: CreateTaskRequest,
    ) -> TaskLifecycleResult<CreateTaskResponse> {
        let CreateTaskRequest {
            workspace_id,
            title,
            priority,
            idempotency_key,
        } = request;

        let replayed = match &idempotency_key {
            Some(key) => self.replay(key).await?,
            None => None,
        };
        if let Some(stored) = replayed {
            debug!(task_id = %stored.task_id, "replaying idempotent create");
            return Ok(stored);
        }

        let task = Task::new(
            caller.tenant_id().clone(),
            workspace_id,
            TaskTitle::new(title)?,
            priority.unwrap_or_default(),
            &*self.clock,
        );
        let response = CreateTaskResponse::from(&task);
        let event = NewTaskEvent::new(
            task.id(),
            caller.tenant_id().clone(),
            caller.role(),
            TaskEventKind::created(&task),
        );
        let record = idempotency_key
            .map(|key| -> TaskLifecycleResult<IdempotencyRecord> {
                let stored = serde_json::to_value(&response).map_err(StoreError::serialization)?;
                Ok(IdempotencyRecord::new(key, task.id(), stored))
            })
            .transpose()?;

        let result = self
            .runner
            .run_in_transaction(move |scope| -> TaskLifecycleResult<CreateTaskResponse> {
                scope.insert_task(&task)?;
                scope.append_event(&event)?;
                if let Some(record) = &record {
                    scope.save_idempotency_record(record)?;
                }
                Ok(response)
            })
            .await;

        match result {
            Err(TaskLifecycleError::Store(StoreError::DuplicateIdempotencyKey(key))) => {
                warn!(%key, "lost idempotency race, returning the recorded response");
                let replayed = self.replay(&key).await.and_then(|stored| {
                    stored.ok_or(TaskLifecycleError::IdempotencyRecordMissing(key))
                });
                record_outcome("create", replayed)
            }
            other => record_outcome("create", other),
        }
    }

    /// Assigns a task to a user. Only managers may assign, and only active
    /// tasks accept an assignee.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Unauthorized`],
    /// [`TaskLifecycleError::NotFound`] or
    /// [`TaskLifecycleError::VersionConflict`]; nothing is written in any of
    /// those cases.
    #[instrument(
        skip_all,
        fields(
            task_id = %request.task_id,
            workspace_id = %request.workspace_id,
            expected_version = %request.expected_version,
        )
    )]
    pub async fn assign_task(
        &self,
        caller: &CallerContext,
        request: AssignTaskRequest,
    ) -> TaskLifecycleResult<Task> {
        authorize_assigner(caller.role())?;

        let AssignTaskRequest {
            task_id,
            workspace_id,
            assignee_id,
            expected_version,
        } = request;
        let changes = TaskChanges::new(
            TaskChange::Assign {
                assignee_id: assignee_id.clone(),
            },
            &*self.clock,
        );
        let tenant_id = caller.tenant_id().clone();
        let role = caller.role();

        let result = self
            .runner
            .run_in_transaction(move |scope| -> TaskLifecycleResult<Task> {
                let task = scope
                    .find_task(task_id, &workspace_id)?
                    .ok_or(TaskLifecycleError::NotFound(task_id))?;
                authorize_assignment_target(&task)?;
                let updated = compare_and_swap(scope, &task, expected_version, &changes)?;
                scope.append_event(&NewTaskEvent::new(
                    task_id,
                    tenant_id,
                    role,
                    TaskEventKind::assigned(assignee_id),
                ))?;
                Ok(updated)
            })
            .await;
        record_outcome("assign", result)
    }

    /// Moves a task along a legal edge of the state machine.
    ///
    /// Checks run in order: existence, edge legality, caller authorization,
    /// then the version compare-and-swap.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`],
    /// [`TaskLifecycleError::InvalidTransition`],
    /// [`TaskLifecycleError::Unauthorized`] or
    /// [`TaskLifecycleError::VersionConflict`]; nothing is written in any of
    /// those cases.
    #[instrument(
        skip_all,
        fields(
            task_id = %request.task_id,
            workspace_id = %request.workspace_id,
            to_state = %request.to_state,
            expected_version = %request.expected_version,
        )
    )]
    pub async fn transition_task(
        &self,
        caller: &CallerContext,
        request: TransitionTaskRequest,
    ) -> TaskLifecycleResult<Task> {
        let TransitionTaskRequest {
            task_id,
            workspace_id,
            to_state,
            expected_version,
        } = request;
        let changes = TaskChanges::new(TaskChange::Transition { to: to_state }, &*self.clock);
        let actor = caller.clone();

        let result = self
            .runner
            .run_in_transaction(move |scope| -> TaskLifecycleResult<Task> {
                let task = scope
                    .find_task(task_id, &workspace_id)?
                    .ok_or(TaskLifecycleError::NotFound(task_id))?;
                let from_state = task.state();
                assert_legal(from_state, to_state)?;
                authorize_transition(actor.role(), actor.user_id(), &task, to_state)?;
                let updated = compare_and_swap(scope, &task, expected_version, &changes)?;
                scope.append_event(&NewTaskEvent::new(
                    task_id,
                    actor.tenant_id().clone(),
                    actor.role(),
                    TaskEventKind::state_changed(from_state, to_state),
                ))?;
                Ok(updated)
            })
            .await;
        record_outcome("transition", result)
    }

    async fn replay(
        &self,
        key: &IdempotencyKey,
    ) -> TaskLifecycleResult<Option<CreateTaskResponse>> {
        let lookup = key.clone();
        let record = self
            .runner
            .run_read_only(move |scope| -> TaskLifecycleResult<Option<IdempotencyRecord>> {
                Ok(scope.find_idempotency_record(&lookup)?)
            })
            .await?;
        record
            .map(|stored| {
                serde_json::from_value(stored.response)
                    .map_err(|err| TaskLifecycleError::Store(StoreError::serialization(err)))
            })
            .transpose()
    }
}

/// Applies `changes` only if `task` is still at `expected`.
///
/// `task` must have been read in the same unit of work. A stale read version
/// is rejected before writing so the checks made against `task` hold for the
/// row that gets updated.
fn compare_and_swap<S>(
    scope: &mut S,
    task: &Task,
    expected: TaskVersion,
    changes: &TaskChanges,
) -> TaskLifecycleResult<Task>
where
    S: TaskStore + ?Sized,
{
    let conflict = TaskLifecycleError::VersionConflict {
        task_id: task.id(),
        expected,
    };
    if task.version() != expected {
        return Err(conflict);
    }
    let updated = task.with_changes(changes)?;
    match scope.compare_and_swap_task(task.id(), expected, changes)? {
        0 => Err(conflict),
        _ => Ok(updated),
    }
}

fn record_outcome<T>(
    operation: &'static str,
    result: TaskLifecycleResult<T>,
) -> TaskLifecycleResult<T> {
    match &result {
        Ok(_) => info!(operation, "task mutation committed"),
        Err(err) => match err.outcome() {
            ErrorOutcome::Internal => error!(operation, error = %err, "task mutation failed"),
            ErrorOutcome::Conflict => warn!(operation, error = %err, "task mutation rejected"),
            ErrorOutcome::BadRequest | ErrorOutcome::NotFound | ErrorOutcome::Forbidden => {
                debug!(operation, error = %err, "task mutation refused");
            }
        },
    }
    result
}
