//! Unit tests for the task module.
//!
//! Tests are organised by concern: domain values, the state machine, the
//! authorization policy, the service protocol against mocked stores, and
//! service behaviour against the in-memory adapter.
