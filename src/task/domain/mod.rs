//! Domain model for task lifecycle management.
//!
//! Tasks, their outbox events, idempotency records, the lifecycle state
//! machine and the authorization policy. Nothing here touches storage.

mod error;
mod event;
mod idempotency;
mod ids;
mod policy;
mod state_machine;
mod task;

pub use error::{ParseEnumError, TaskDomainError};
pub use event::{
    NewTaskEvent, TaskAssignedPayload, TaskCreatedPayload, TaskEvent, TaskEventKind,
    TaskEventType, TaskStateChangedPayload,
};
pub use idempotency::IdempotencyRecord;
pub use ids::{
    EventId, IdempotencyKey, TaskId, TaskTitle, TaskVersion, TenantId, UserId, WorkspaceId,
};
pub use policy::{
    AuthorizationFailure, Role, authorize_assigner, authorize_assignment_target,
    authorize_transition,
};
pub use state_machine::{InvalidTransition, assert_legal, is_legal_transition};
pub use task::{PersistedTaskData, Task, TaskChange, TaskChanges, TaskPriority, TaskState};
