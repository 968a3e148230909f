//! `PostgreSQL` adapters for task lifecycle persistence.
//!
//! Schema lives in `migrations/`; pool construction is left to the caller.

mod models;
mod runner;
mod schema;
mod store;

pub use runner::{PostgresTransactionRunner, TaskPgPool};
