//! Task lifecycle management.
//!
//! Creating tasks (optionally idempotent), assigning them, moving them
//! through the state machine under optimistic concurrency, and reading them
//! back with their event timeline. The module follows hexagonal
//! architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
