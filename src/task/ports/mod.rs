//! Port contracts for task lifecycle management.
//!
//! Ports define infrastructure-agnostic interfaces used by task services.

pub mod store;
pub mod transaction;

pub use store::{
    IdempotencyStore, StoreError, StoreResult, StoreScope, TaskEventStore, TaskListPosition,
    TaskListQuery, TaskStore,
};
pub use transaction::TransactionRunner;
