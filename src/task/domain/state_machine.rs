//! Legal task-state transitions.
//!
//! ```text
//! NEW ──► IN_PROGRESS ──► DONE
//!  │            │
//!  └────────────┴──────► CANCELLED
//! ```
//!
//! `DONE` and `CANCELLED` are terminal and self-transitions are never legal.
//! Everything here is pure and safe to call outside a transaction.

use super::TaskState;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error raised when a requested state edge does not exist.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("invalid transition {from} -> {to}")]
pub struct InvalidTransition {
    /// State the task is currently in.
    pub from: TaskState,
    /// State that was requested.
    pub to: TaskState,
}

/// Returns `true` when `from -> to` is an edge of the lifecycle graph.
#[must_use]
pub const fn is_legal_transition(from: TaskState, to: TaskState) -> bool {
    matches!(
        (from, to),
        (TaskState::New, TaskState::InProgress | TaskState::Cancelled)
            | (TaskState::InProgress, TaskState::Done | TaskState::Cancelled)
    )
}

/// Fails with [`InvalidTransition`] unless `from -> to` is legal.
///
/// # Errors
///
/// Returns [`InvalidTransition`] carrying the attempted edge.
pub const fn assert_legal(from: TaskState, to: TaskState) -> Result<(), InvalidTransition> {
    if is_legal_transition(from, to) {
        Ok(())
    } else {
        Err(InvalidTransition { from, to })
    }
}

impl TaskState {
    /// Returns `true` when this state may move to `target`.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        is_legal_transition(self, target)
    }

    /// Returns the states reachable from this state in one step.
    #[must_use]
    pub fn successors(self) -> Vec<Self> {
        Self::ALL
            .into_iter()
            .filter(|target| self.can_transition_to(*target))
            .collect()
    }
}
