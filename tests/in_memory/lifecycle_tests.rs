//! End-to-end lifecycle behaviour through the public API.

use super::helpers::{
    Services, agent, assign, create_task, manager, services, transition, user_id, version,
    workspace,
};
use rstest::rstest;
use tasklane::task::{
    domain::{TaskEventKind, TaskEventType, TaskState},
    services::{AssignTaskRequest, TaskLifecycleError},
};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn versions_and_events_track_each_commit(services: Services) {
    let task_id = create_task(&services, "Ship release")
        .await
        .expect("create should succeed");
    assign(&services, task_id, "u1", 1)
        .await
        .expect("assign should succeed");
    services
        .lifecycle
        .transition_task(&agent("u1"), transition(task_id, TaskState::InProgress, 2))
        .await
        .expect("start should succeed");
    services
        .lifecycle
        .transition_task(&agent("u1"), transition(task_id, TaskState::Done, 3))
        .await
        .expect("finish should succeed");

    let view = services
        .queries
        .get_task_with_timeline(task_id, &workspace())
        .await
        .expect("lookup should succeed");

    assert_eq!(view.task.version(), version(4));
    assert_eq!(view.task.state(), TaskState::Done);
    let types: Vec<TaskEventType> = view.timeline.iter().map(|event| event.event_type()).collect();
    assert_eq!(
        types,
        vec![
            TaskEventType::TaskStateChanged,
            TaskEventType::TaskStateChanged,
            TaskEventType::TaskAssigned,
            TaskEventType::TaskCreated,
        ]
    );
    assert!(view.timeline.iter().all(|event| event.task_id == task_id));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn terminal_tasks_reject_every_further_transition(services: Services) {
    let task_id = create_task(&services, "Short lived")
        .await
        .expect("create should succeed");
    services
        .lifecycle
        .transition_task(&manager(), transition(task_id, TaskState::Cancelled, 1))
        .await
        .expect("cancel should succeed");

    for target in TaskState::ALL {
        let result = services
            .lifecycle
            .transition_task(&manager(), transition(task_id, target, 2))
            .await;
        assert!(
            matches!(result, Err(TaskLifecycleError::InvalidTransition(edge)) if edge.from == TaskState::Cancelled),
            "transition to {target} should be rejected, got {result:?}"
        );
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn reassigning_the_same_user_still_advances_the_version(services: Services) {
    let task_id = create_task(&services, "Sticky owner")
        .await
        .expect("create should succeed");
    assign(&services, task_id, "u1", 1)
        .await
        .expect("first assign should succeed");

    let again = services
        .lifecycle
        .assign_task(
            &manager(),
            AssignTaskRequest::new(task_id, workspace(), user_id("u1"), version(2)),
        )
        .await
        .expect("second assign should succeed");

    assert_eq!(again.version(), version(3));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn state_change_events_agree_with_the_task(services: Services) {
    let task_id = create_task(&services, "Audit me")
        .await
        .expect("create should succeed");
    assign(&services, task_id, "u7", 1)
        .await
        .expect("assign should succeed");
    services
        .lifecycle
        .transition_task(&agent("u7"), transition(task_id, TaskState::InProgress, 2))
        .await
        .expect("start should succeed");

    let view = services
        .queries
        .get_task_with_timeline(task_id, &workspace())
        .await
        .expect("lookup should succeed");
    let latest_change = view.timeline.iter().find_map(|event| match &event.kind {
        TaskEventKind::StateChanged(payload) => Some(*payload),
        _ => None,
    });

    let payload = latest_change.expect("a state change event");
    assert_eq!(payload.from, TaskState::New);
    assert_eq!(payload.to, view.task.state());
}
