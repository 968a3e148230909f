//! Diesel-backed transaction runner.

use crate::task::ports::{StoreError, TransactionRunner};
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::result::Error as DieselError;

/// `PostgreSQL` connection pool type used by task adapters.
pub type TaskPgPool = Pool<ConnectionManager<PgConnection>>;

type PooledConn = PooledConnection<ConnectionManager<PgConnection>>;

/// `PostgreSQL`-backed transaction runner.
///
/// Each unit of work borrows one pooled connection on a blocking thread via
/// [`tokio::task::spawn_blocking`].
#[derive(Debug, Clone)]
pub struct PostgresTransactionRunner {
    pool: TaskPgPool,
}

impl PostgresTransactionRunner {
    /// Creates a runner from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: TaskPgPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    #[must_use]
    pub const fn pool(&self) -> &TaskPgPool {
        &self.pool
    }
}

/// Failure inside a Diesel transaction: either the unit of work's own error
/// or a driver error raised while beginning or committing.
enum TransactionFailure<E> {
    Work(E),
    Database(DieselError),
}

impl<E> From<DieselError> for TransactionFailure<E> {
    fn from(err: DieselError) -> Self {
        Self::Database(err)
    }
}

impl<E> TransactionFailure<E>
where
    E: From<StoreError>,
{
    fn into_inner(self) -> E {
        match self {
            Self::Work(err) => err,
            Self::Database(err) => E::from(StoreError::persistence(err)),
        }
    }
}

async fn run_blocking<F, T, E>(f: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: From<StoreError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|err| E::from(StoreError::persistence(err)))?
}

fn get_conn<E>(pool: &TaskPgPool) -> Result<PooledConn, E>
where
    E: From<StoreError>,
{
    pool.get()
        .map_err(|err| E::from(StoreError::persistence(err)))
}

#[async_trait]
impl TransactionRunner for PostgresTransactionRunner {
    type Scope = PgConnection;

    async fn run_in_transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self::Scope) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<StoreError> + Send + 'static,
    {
        let pool = self.pool.clone();
        run_blocking(move || {
            let mut pooled = get_conn::<E>(&pool)?;
            let connection: &mut PgConnection = &mut pooled;
            connection
                .transaction::<T, TransactionFailure<E>, _>(|scope| {
                    work(scope).map_err(TransactionFailure::Work)
                })
                .map_err(TransactionFailure::into_inner)
        })
        .await
    }

    async fn run_read_only<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self::Scope) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<StoreError> + Send + 'static,
    {
        let pool = self.pool.clone();
        run_blocking(move || {
            let mut pooled = get_conn::<E>(&pool)?;
            let connection: &mut PgConnection = &mut pooled;
            work(connection)
        })
        .await
    }
}
