//! Application services for task lifecycle orchestration.

mod config;
mod cursor;
mod error;
mod lifecycle;
mod query;

pub use config::LifecycleConfig;
pub use error::{ErrorOutcome, TaskLifecycleError, TaskLifecycleResult};
pub use lifecycle::{
    AssignTaskRequest, CallerContext, CreateTaskRequest, CreateTaskResponse, TaskLifecycleService,
    TransitionTaskRequest,
};
pub use query::{ListTasksRequest, TaskPage, TaskQueryService, TaskWithTimeline};
