//! Unit-of-work port.

use super::{StoreError, StoreScope};
use async_trait::async_trait;

/// Runs work against the backing store through a scoped handle.
///
/// `run_in_transaction` commits only when `work` returns `Ok`; any error,
/// domain or storage, rolls back every write made through the handle.
/// `work` is synchronous and may block, so adapters are free to run it on a
/// blocking thread.
#[async_trait]
pub trait TransactionRunner: Send + Sync {
    /// Handle type passed to units of work.
    type Scope: StoreScope;

    /// Executes `work` atomically.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `work`, or a [`StoreError`] converted
    /// into `E` when the transaction cannot be opened or committed.
    async fn run_in_transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self::Scope) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<StoreError> + Send + 'static;

    /// Executes read-only `work` without opening a transaction.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `work`, or a [`StoreError`] converted
    /// into `E` when no connection is available.
    async fn run_read_only<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self::Scope) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<StoreError> + Send + 'static;
}
