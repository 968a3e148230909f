//! Role-based authorization rules for task mutations.

use super::{ParseEnumError, Task, TaskState, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Authorization role of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Works on tasks assigned to them.
    Agent,
    /// Assigns and cancels tasks.
    Manager,
}

impl Role {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Agent => "agent",
            Self::Manager => "manager",
        }
    }
}

impl TryFrom<&str> for Role {
    type Error = ParseEnumError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "agent" => Ok(Self::Agent),
            "manager" => Ok(Self::Manager),
            _ => Err(ParseEnumError::new("role", value)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reason a caller was refused a task mutation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthorizationFailure {
    /// Only managers may assign tasks.
    #[error("role {0} may not assign tasks")]
    RoleCannotAssign(Role),

    /// Assignment is only meaningful on active tasks.
    #[error("task in state {0} cannot be assigned")]
    TaskNotAssignable(TaskState),

    /// Agents may only move tasks assigned to them.
    #[error("agent is not the task assignee")]
    NotAssignee,

    /// Managers may only cancel.
    #[error("manager may only transition tasks to CANCELLED, not {0}")]
    ManagerMayOnlyCancel(TaskState),
}

/// Checks that `role` may assign tasks at all.
///
/// # Errors
///
/// Returns [`AuthorizationFailure::RoleCannotAssign`] for non-managers.
pub const fn authorize_assigner(role: Role) -> Result<(), AuthorizationFailure> {
    match role {
        Role::Manager => Ok(()),
        Role::Agent => Err(AuthorizationFailure::RoleCannotAssign(role)),
    }
}

/// Checks that `task` is in a state that accepts assignment.
///
/// # Errors
///
/// Returns [`AuthorizationFailure::TaskNotAssignable`] for terminal tasks.
pub const fn authorize_assignment_target(task: &Task) -> Result<(), AuthorizationFailure> {
    let state = task.state();
    if state.is_active() {
        Ok(())
    } else {
        Err(AuthorizationFailure::TaskNotAssignable(state))
    }
}

/// Checks that the caller may drive `task` to `target`.
///
/// Agents need an acting user id equal to the current assignee. Managers may
/// only cancel.
///
/// # Errors
///
/// Returns [`AuthorizationFailure::NotAssignee`] or
/// [`AuthorizationFailure::ManagerMayOnlyCancel`].
pub fn authorize_transition(
    role: Role,
    acting_user_id: Option<&UserId>,
    task: &Task,
    target: TaskState,
) -> Result<(), AuthorizationFailure> {
    match role {
        Role::Agent => {
            let is_assignee = acting_user_id.is_some_and(|user| task.assignee_id() == Some(user));
            if is_assignee {
                Ok(())
            } else {
                Err(AuthorizationFailure::NotAssignee)
            }
        }
        Role::Manager if target == TaskState::Cancelled => Ok(()),
        Role::Manager => Err(AuthorizationFailure::ManagerMayOnlyCancel(target)),
    }
}
