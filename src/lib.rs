//! Tasklane: a task lifecycle engine with optimistic concurrency.
//!
//! Tasks move through a closed state machine (`NEW`, `IN_PROGRESS`, `DONE`,
//! `CANCELLED`) under role-based rules. Every mutation is a compare-and-swap
//! on the task version, written in the same transaction as an outbox event,
//! and creates may carry an idempotency key so that retries replay the first
//! response.
//!
//! # Architecture
//!
//! Tasklane follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for storage and units of work
//! - **Adapters**: In-memory and `PostgreSQL` implementations of the ports
//!
//! # Modules
//!
//! - [`task`]: Task lifecycle domain, ports, adapters and services

pub mod task;
