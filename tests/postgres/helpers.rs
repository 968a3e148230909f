//! Shared helpers for `PostgreSQL` integration tests.
//!
//! Tests receive the embedded cluster through the `shared_test_cluster`
//! fixture. Each test clones a migrated template into its own database.

use std::sync::Arc;

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use mockable::DefaultClock;
use pg_embedded_setup_unpriv::TestCluster;
use tasklane::task::{
    adapters::postgres::{PostgresTransactionRunner, TaskPgPool},
    domain::{IdempotencyKey, Role, TaskId, TaskVersion, TenantId, UserId, WorkspaceId},
    services::{CallerContext, CreateTaskRequest, TaskLifecycleService, TaskQueryService},
};
use tokio::runtime::Runtime;
use uuid::Uuid;

/// Boxed error type used by helpers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// SQL creating the task lifecycle schema.
pub const CREATE_SCHEMA_SQL: &str =
    include_str!("../../migrations/2026-10-16-000000_create_task_lifecycle_tables/up.sql");

/// Template database holding the migrated schema.
pub const TEMPLATE_DB: &str = "tasklane_test_template";

/// Builds the runtime that drives async services from sync tests.
///
/// # Errors
///
/// Returns an error if the runtime cannot be built.
pub fn test_runtime() -> Result<Runtime, BoxError> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()?)
}

/// Ensures the template database exists with the migrations applied.
///
/// # Errors
///
/// Returns an error if the template cannot be created or migrated.
pub fn ensure_template(cluster: &TestCluster) -> Result<(), BoxError> {
    cluster
        .ensure_template_exists(TEMPLATE_DB, |db_name| {
            let url = cluster.connection().database_url(db_name);
            let mut conn = PgConnection::establish(&url).map_err(|err| eyre::eyre!("{err}"))?;
            conn.batch_execute(CREATE_SCHEMA_SQL)
                .map_err(|err| eyre::eyre!("migration failed: {err}"))?;
            Ok(())
        })
        .map_err(|err| Box::new(err) as BoxError)?;
    Ok(())
}

/// Drops the per-test database when the context goes away.
pub struct CleanupGuard {
    cluster: &'static TestCluster,
    db_name: String,
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        // A database still held by a closing backend is left for the cluster
        // teardown.
        drop(self.cluster.drop_database(self.db_name.as_str()));
    }
}

/// Services wired to a fresh database cloned from the migrated template.
///
/// Field order matters: pools close before the database is dropped.
pub struct PgContext {
    /// Runner shared by both services.
    pub runner: Arc<PostgresTransactionRunner>,
    /// Mutation service.
    pub lifecycle: Arc<TaskLifecycleService<PostgresTransactionRunner, DefaultClock>>,
    /// Read service.
    pub queries: TaskQueryService<PostgresTransactionRunner>,
    runtime: Runtime,
    _cleanup: CleanupGuard,
}

impl PgContext {
    /// Runs `future` to completion on the context runtime.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Opens a raw connection to the test database.
    ///
    /// # Errors
    ///
    /// Returns an error if no pooled connection is available.
    pub fn connection(
        &self,
    ) -> Result<diesel::r2d2::PooledConnection<ConnectionManager<PgConnection>>, BoxError> {
        Ok(self.runner.pool().get()?)
    }
}

/// Creates a database from the template and wires services over it.
///
/// # Errors
///
/// Returns an error if template setup, database creation or pool setup
/// fails.
pub fn pg_context(cluster: &'static TestCluster, pool_size: u32) -> Result<PgContext, BoxError> {
    ensure_template(cluster)?;
    let db_name = format!("tasklane_test_{}", Uuid::new_v4().simple());
    cluster
        .create_database_from_template(db_name.as_str(), TEMPLATE_DB)
        .map_err(|err| Box::new(err) as BoxError)?;
    let cleanup = CleanupGuard {
        cluster,
        db_name: db_name.clone(),
    };
    let url = cluster.connection().database_url(&db_name);
    let pool: TaskPgPool = Pool::builder()
        .max_size(pool_size)
        .build(ConnectionManager::<PgConnection>::new(url))?;
    let runner = Arc::new(PostgresTransactionRunner::new(pool));
    Ok(PgContext {
        lifecycle: Arc::new(TaskLifecycleService::new(
            Arc::clone(&runner),
            Arc::new(DefaultClock),
        )),
        queries: TaskQueryService::new(Arc::clone(&runner)),
        runner,
        runtime: test_runtime()?,
        _cleanup: cleanup,
    })
}

/// Workspace used by every test.
#[must_use]
pub fn workspace() -> WorkspaceId {
    WorkspaceId::new("pg-ws").expect("valid workspace")
}

/// Manager caller.
#[must_use]
pub fn manager() -> CallerContext {
    CallerContext::new(TenantId::new("pg-tenant").expect("valid tenant"), Role::Manager)
}

/// Agent caller acting as `user`.
#[must_use]
pub fn agent(user: &str) -> CallerContext {
    CallerContext::new(TenantId::new("pg-tenant").expect("valid tenant"), Role::Agent)
        .with_user_id(user_id(user))
}

/// Builds a user identifier.
#[must_use]
pub fn user_id(value: &str) -> UserId {
    UserId::new(value).expect("valid user")
}

/// Builds an idempotency key.
#[must_use]
pub fn idempotency_key(value: &str) -> IdempotencyKey {
    IdempotencyKey::new(value).expect("valid key")
}

/// Builds a task version.
#[must_use]
pub fn version(value: u64) -> TaskVersion {
    TaskVersion::new(value).expect("valid version")
}

/// Creates a task as a manager and returns its identifier.
///
/// # Errors
///
/// Returns an error if creation fails.
pub async fn create_task(context: &PgContext, title: &str) -> Result<TaskId, BoxError> {
    let created = context
        .lifecycle
        .create_task(&manager(), CreateTaskRequest::new(workspace(), title))
        .await?;
    Ok(created.task_id)
}

/// Row count helper for raw verification queries.
#[derive(QueryableByName)]
pub struct CountRow {
    /// Counted rows.
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    pub count: i64,
}

/// Counts rows of `table` referencing `task_id`.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn count_for_task(
    context: &PgContext,
    table: &'static str,
    task_id: TaskId,
) -> Result<i64, BoxError> {
    let mut conn = context.connection()?;
    let row: CountRow = diesel::sql_query(format!(
        "SELECT COUNT(*) AS count FROM {table} WHERE task_id = $1"
    ))
    .bind::<diesel::sql_types::Uuid, _>(task_id.into_inner())
    .get_result(&mut conn)?;
    Ok(row.count)
}
