//! Read-side task queries: timeline, paginated listing and audit feed.

use super::{
    config::LifecycleConfig,
    cursor,
    error::{TaskLifecycleError, TaskLifecycleResult},
};
use crate::task::{
    domain::{Task, TaskEvent, TaskId, TaskState, UserId, WorkspaceId},
    ports::{TaskEventStore, TaskListPosition, TaskListQuery, TaskStore, TransactionRunner},
};
use std::sync::Arc;
use tracing::instrument;

/// A task together with its most recent events, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskWithTimeline {
    /// The task snapshot.
    pub task: Task,
    /// Most recent events for the task, newest first.
    pub timeline: Vec<TaskEvent>,
}

/// Filter and window for a task listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListTasksRequest {
    workspace_id: WorkspaceId,
    state: Option<TaskState>,
    assignee_id: Option<UserId>,
    limit: Option<usize>,
    cursor: Option<String>,
}

impl ListTasksRequest {
    /// Lists every task in a workspace, first page.
    #[must_use]
    pub const fn new(workspace_id: WorkspaceId) -> Self {
        Self {
            workspace_id,
            state: None,
            assignee_id: None,
            limit: None,
            cursor: None,
        }
    }

    /// Restricts the listing to one state.
    #[must_use]
    pub const fn with_state(mut self, state: TaskState) -> Self {
        self.state = Some(state);
        self
    }

    /// Restricts the listing to one assignee.
    #[must_use]
    pub fn with_assignee(mut self, assignee_id: UserId) -> Self {
        self.assignee_id = Some(assignee_id);
        self
    }

    /// Requests a page size; clamped by [`LifecycleConfig::page_size`].
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Continues from a cursor returned by a previous page.
    #[must_use]
    pub fn with_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }
}

/// One page of a task listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskPage {
    /// Tasks on this page, newest first.
    pub tasks: Vec<Task>,
    /// Cursor for the next page; `None` on the last page.
    pub next_cursor: Option<String>,
}

/// Read-only task query service.
#[derive(Clone)]
pub struct TaskQueryService<R>
where
    R: TransactionRunner,
{
    runner: Arc<R>,
    config: LifecycleConfig,
}

impl<R> TaskQueryService<R>
where
    R: TransactionRunner,
{
    /// Creates a query service with default limits.
    #[must_use]
    pub fn new(runner: Arc<R>) -> Self {
        Self::with_config(runner, LifecycleConfig::default())
    }

    /// Creates a query service with explicit limits.
    #[must_use]
    pub const fn with_config(runner: Arc<R>, config: LifecycleConfig) -> Self {
        Self { runner, config }
    }

    /// Returns the limits in force.
    #[must_use]
    pub const fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Fetches a task and its most recent events.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`] when the task is absent from
    /// the workspace, or [`TaskLifecycleError::Store`] on lookup failure.
    #[instrument(skip_all, fields(task_id = %task_id, workspace_id = %workspace_id))]
    pub async fn get_task_with_timeline(
        &self,
        task_id: TaskId,
        workspace_id: &WorkspaceId,
    ) -> TaskLifecycleResult<TaskWithTimeline> {
        let workspace = workspace_id.clone();
        let limit = self.config.timeline_limit;
        self.runner
            .run_read_only(move |scope| -> TaskLifecycleResult<TaskWithTimeline> {
                let task = scope
                    .find_task(task_id, &workspace)?
                    .ok_or(TaskLifecycleError::NotFound(task_id))?;
                let timeline = scope.recent_events_for_task(task_id, limit)?;
                Ok(TaskWithTimeline { task, timeline })
            })
            .await
    }

    /// Lists workspace tasks newest first.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::InvalidCursor`] for a malformed cursor,
    /// or [`TaskLifecycleError::Store`] on query failure.
    #[instrument(skip_all, fields(workspace_id = %request.workspace_id))]
    pub async fn list_tasks(&self, request: ListTasksRequest) -> TaskLifecycleResult<TaskPage> {
        let after = request
            .cursor
            .as_deref()
            .map(|token| cursor::decode(token).ok_or(TaskLifecycleError::InvalidCursor))
            .transpose()?;
        let page_size = self.config.page_size(request.limit);
        let query = TaskListQuery {
            workspace_id: request.workspace_id,
            state: request.state,
            assignee_id: request.assignee_id,
            after,
            limit: page_size.saturating_add(1),
        };

        let mut tasks = self
            .runner
            .run_read_only(move |scope| -> TaskLifecycleResult<Vec<Task>> {
                Ok(scope.list_tasks(&query)?)
            })
            .await?;

        let has_more = tasks.len() > page_size;
        tasks.truncate(page_size);
        let next_cursor = tasks
            .last()
            .filter(|_| has_more)
            .map(|last| cursor::encode(TaskListPosition::of(last)));
        Ok(TaskPage { tasks, next_cursor })
    }

    /// Returns the most recent events across all tasks, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Store`] on query failure.
    #[instrument(skip(self))]
    pub async fn latest_events(
        &self,
        limit: Option<usize>,
    ) -> TaskLifecycleResult<Vec<TaskEvent>> {
        let feed_size = self.config.audit_feed_size(limit);
        self.runner
            .run_read_only(move |scope| -> TaskLifecycleResult<Vec<TaskEvent>> {
                Ok(scope.latest_events(feed_size)?)
            })
            .await
    }
}
