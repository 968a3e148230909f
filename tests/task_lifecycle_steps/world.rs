//! Shared world state for task lifecycle BDD scenarios.

use std::sync::Arc;

use mockable::DefaultClock;
use rstest::fixture;
use tasklane::task::{
    adapters::memory::InMemoryTaskStore,
    domain::{Role, Task, TaskId, TaskVersion, TenantId, UserId, WorkspaceId},
    services::{
        CallerContext, CreateTaskResponse, TaskLifecycleError, TaskLifecycleService,
        TaskQueryService,
    },
};

/// Lifecycle service type used by the BDD world.
pub type TestLifecycle = TaskLifecycleService<InMemoryTaskStore, DefaultClock>;

/// Scenario world for task lifecycle behaviour tests.
pub struct LifecycleWorld {
    pub lifecycle: TestLifecycle,
    pub queries: TaskQueryService<InMemoryTaskStore>,
    pub workspace: WorkspaceId,
    pub task_id: Option<TaskId>,
    pub first_create: Option<CreateTaskResponse>,
    pub last_create: Option<CreateTaskResponse>,
    pub last_result: Option<Result<Task, TaskLifecycleError>>,
}

impl LifecycleWorld {
    /// Creates a world over an empty in-memory store.
    ///
    /// # Errors
    ///
    /// Returns an error if the fixed workspace identifier is rejected.
    pub fn new() -> Result<Self, eyre::Report> {
        let store = Arc::new(InMemoryTaskStore::new());
        Ok(Self {
            lifecycle: TaskLifecycleService::new(Arc::clone(&store), Arc::new(DefaultClock)),
            queries: TaskQueryService::new(store),
            workspace: WorkspaceId::new("bdd-workspace")?,
            task_id: None,
            first_create: None,
            last_create: None,
            last_result: None,
        })
    }

    /// Returns the task under test.
    ///
    /// # Errors
    ///
    /// Returns an error if no task has been created yet.
    pub fn task_id(&self) -> Result<TaskId, eyre::Report> {
        self.task_id
            .ok_or_else(|| eyre::eyre!("missing created task in scenario world"))
    }

    /// Returns the last mutation result.
    ///
    /// # Errors
    ///
    /// Returns an error if no mutation has been attempted.
    pub fn last_result(&self) -> Result<&Result<Task, TaskLifecycleError>, eyre::Report> {
        self.last_result
            .as_ref()
            .ok_or_else(|| eyre::eyre!("missing mutation result in scenario world"))
    }
}

/// Fixture that creates a new scenario world.
///
/// # Panics
///
/// Panics if the world cannot be built.
#[fixture]
pub fn world() -> LifecycleWorld {
    LifecycleWorld::new().expect("scenario world should build")
}

/// Builds a caller with the given role and optional acting user.
///
/// # Errors
///
/// Returns an error if an identifier is rejected.
pub fn caller(role: Role, user: Option<&str>) -> Result<CallerContext, eyre::Report> {
    let context = CallerContext::new(TenantId::new("bdd-tenant")?, role);
    Ok(match user {
        Some(id) => context.with_user_id(UserId::new(id)?),
        None => context,
    })
}

/// Parses a version number from a step.
///
/// # Errors
///
/// Returns an error for version 0.
pub fn version(value: u64) -> Result<TaskVersion, eyre::Report> {
    Ok(TaskVersion::new(value)?)
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
