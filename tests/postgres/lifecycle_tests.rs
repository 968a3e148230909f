//! Mutations, outbox events and rollback against `PostgreSQL`.

use super::helpers::{
    BoxError, agent, count_for_task, create_task, idempotency_key, manager, pg_context, user_id,
    version, workspace,
};
use pg_embedded_setup_unpriv::{TestCluster, test_support::shared_test_cluster};
use rstest::rstest;
use tasklane::task::{
    domain::{TaskEventKind, TaskPriority, TaskState},
    services::{AssignTaskRequest, CreateTaskRequest, TaskLifecycleError, TransitionTaskRequest},
};

#[rstest]
fn postgres_full_lifecycle_round_trips(
    shared_test_cluster: &'static TestCluster,
) -> Result<(), BoxError> {
    let context = pg_context(shared_test_cluster, 2)?;
    context.block_on(async {
        let created = context
            .lifecycle
            .create_task(
                &manager(),
                CreateTaskRequest::new(workspace(), "Ship release")
                    .with_priority(TaskPriority::High),
            )
            .await?;
        let task_id = created.task_id;
        context
            .lifecycle
            .assign_task(
                &manager(),
                AssignTaskRequest::new(task_id, workspace(), user_id("u1"), version(1)),
            )
            .await?;
        context
            .lifecycle
            .transition_task(
                &agent("u1"),
                TransitionTaskRequest::new(task_id, workspace(), TaskState::InProgress, version(2)),
            )
            .await?;
        let done = context
            .lifecycle
            .transition_task(
                &agent("u1"),
                TransitionTaskRequest::new(task_id, workspace(), TaskState::Done, version(3)),
            )
            .await?;

        let view = context
            .queries
            .get_task_with_timeline(task_id, &workspace())
            .await?;
        assert_eq!(view.task, done);
        assert_eq!(view.task.version(), version(4));
        assert_eq!(view.task.priority(), TaskPriority::High);
        assert_eq!(view.timeline.len(), 4);
        let Some(TaskEventKind::StateChanged(latest)) =
            view.timeline.first().map(|event| &event.kind)
        else {
            panic!("newest event should be a state change");
        };
        assert_eq!(latest.from, TaskState::InProgress);
        assert_eq!(latest.to, TaskState::Done);
        Ok::<(), BoxError>(())
    })
}

#[rstest]
fn postgres_conflict_leaves_no_event(
    shared_test_cluster: &'static TestCluster,
) -> Result<(), BoxError> {
    let context = pg_context(shared_test_cluster, 2)?;
    context.block_on(async {
        let task_id = create_task(&context, "Stale writer").await?;
        context
            .lifecycle
            .assign_task(
                &manager(),
                AssignTaskRequest::new(task_id, workspace(), user_id("u1"), version(1)),
            )
            .await?;

        let stale = context
            .lifecycle
            .assign_task(
                &manager(),
                AssignTaskRequest::new(task_id, workspace(), user_id("u2"), version(1)),
            )
            .await;

        assert!(matches!(
            stale,
            Err(TaskLifecycleError::VersionConflict { .. })
        ));
        assert_eq!(count_for_task(&context, "task_events", task_id)?, 2);
        let view = context
            .queries
            .get_task_with_timeline(task_id, &workspace())
            .await?;
        assert_eq!(view.task.assignee_id(), Some(&user_id("u1")));
        Ok::<(), BoxError>(())
    })
}

#[rstest]
fn postgres_refused_transition_rolls_back(
    shared_test_cluster: &'static TestCluster,
) -> Result<(), BoxError> {
    let context = pg_context(shared_test_cluster, 2)?;
    context.block_on(async {
        let task_id = create_task(&context, "Manager overreach").await?;

        let result = context
            .lifecycle
            .transition_task(
                &manager(),
                TransitionTaskRequest::new(task_id, workspace(), TaskState::InProgress, version(1)),
            )
            .await;

        assert!(matches!(result, Err(TaskLifecycleError::Unauthorized(_))));
        assert_eq!(count_for_task(&context, "task_events", task_id)?, 1);
        Ok::<(), BoxError>(())
    })
}

#[rstest]
fn postgres_idempotency_record_references_task(
    shared_test_cluster: &'static TestCluster,
) -> Result<(), BoxError> {
    let context = pg_context(shared_test_cluster, 2)?;
    context.block_on(async {
        let first = context
            .lifecycle
            .create_task(
                &manager(),
                CreateTaskRequest::new(workspace(), "Once")
                    .with_idempotency_key(idempotency_key("pg-1")),
            )
            .await?;
        let replay = context
            .lifecycle
            .create_task(
                &manager(),
                CreateTaskRequest::new(workspace(), "Twice")
                    .with_idempotency_key(idempotency_key("pg-1")),
            )
            .await?;

        assert_eq!(first, replay);
        assert_eq!(count_for_task(&context, "idempotency_keys", first.task_id)?, 1);
        assert_eq!(count_for_task(&context, "tasks", first.task_id)?, 1);
        Ok::<(), BoxError>(())
    })
}
