//! Racing writers against one task version or one idempotency key.

use std::collections::HashSet;
use std::sync::Arc;

use super::helpers::{
    Services, assign, create_task, idempotency_key, manager, services, user_id, version,
    workspace,
};
use rstest::rstest;
use tasklane::task::{
    domain::TaskEventType,
    services::{AssignTaskRequest, CreateTaskRequest, ListTasksRequest, TaskLifecycleError},
};
use tokio::sync::Barrier;

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_assigns_at_one_version_have_one_winner(services: Services) {
    let task_id = create_task(&services, "Contended")
        .await
        .expect("create should succeed");
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = ["u1", "u2"]
        .into_iter()
        .map(|assignee| {
            let lifecycle = Arc::clone(&services.lifecycle);
            let gate = Arc::clone(&barrier);
            tokio::spawn(async move {
                gate.wait().await;
                let result = lifecycle
                    .assign_task(
                        &manager(),
                        AssignTaskRequest::new(task_id, workspace(), user_id(assignee), version(1)),
                    )
                    .await;
                (assignee, result)
            })
        })
        .collect();

    let mut winners = Vec::new();
    let mut conflicts = 0;
    for handle in handles {
        let (assignee, result) = handle.await.expect("task should not panic");
        match result {
            Ok(task) => {
                assert_eq!(task.version(), version(2));
                winners.push(assignee);
            }
            Err(TaskLifecycleError::VersionConflict { expected, .. }) => {
                assert_eq!(expected, version(1));
                conflicts += 1;
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(winners.len(), 1);
    assert_eq!(conflicts, 1);
    let view = services
        .queries
        .get_task_with_timeline(task_id, &workspace())
        .await
        .expect("lookup should succeed");
    assert_eq!(view.task.version(), version(2));
    assert_eq!(
        view.task.assignee_id().map(|user| user.as_str()),
        winners.first().copied()
    );
    let assigned_events = view
        .timeline
        .iter()
        .filter(|event| event.event_type() == TaskEventType::TaskAssigned)
        .count();
    assert_eq!(assigned_events, 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_creates_with_one_key_share_one_task(services: Services) {
    const RACERS: usize = 8;
    let barrier = Arc::new(Barrier::new(RACERS));

    let handles: Vec<_> = (0..RACERS)
        .map(|racer| {
            let lifecycle = Arc::clone(&services.lifecycle);
            let gate = Arc::clone(&barrier);
            tokio::spawn(async move {
                gate.wait().await;
                lifecycle
                    .create_task(
                        &manager(),
                        CreateTaskRequest::new(workspace(), format!("Racer {racer}"))
                            .with_idempotency_key(idempotency_key("nightly-build")),
                    )
                    .await
            })
        })
        .collect();

    let mut task_ids = HashSet::new();
    for handle in handles {
        let response = handle
            .await
            .expect("task should not panic")
            .expect("every racer should see a response");
        assert_eq!(response.version, version(1));
        task_ids.insert(response.task_id);
    }

    assert_eq!(task_ids.len(), 1);
    let page = services
        .queries
        .list_tasks(ListTasksRequest::new(workspace()))
        .await
        .expect("list should succeed");
    assert_eq!(page.tasks.len(), 1);
    assert_eq!(
        services
            .queries
            .latest_events(None)
            .await
            .expect("feed should load")
            .len(),
        1
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sequential_retries_with_fresh_versions_all_commit(services: Services) {
    let task_id = create_task(&services, "Hot potato")
        .await
        .expect("create should succeed");

    for (expected, assignee) in (1..=5).zip(["a", "b", "c", "d", "e"]) {
        assign(&services, task_id, assignee, expected)
            .await
            .expect("assign at current version should succeed");
    }

    let view = services
        .queries
        .get_task_with_timeline(task_id, &workspace())
        .await
        .expect("lookup should succeed");
    assert_eq!(view.task.version(), version(6));
    assert_eq!(view.timeline.len(), 6);
}
