//! When steps for task lifecycle BDD scenarios.

use super::world::{LifecycleWorld, caller, run_async, version};
use eyre::WrapErr;
use rstest_bdd_macros::when;
use tasklane::task::{
    domain::{IdempotencyKey, Role, TaskState, UserId},
    services::{AssignTaskRequest, CreateTaskRequest, TransitionTaskRequest},
};

#[when(r#"the manager assigns the task to "{assignee}" at version {expected:u64}"#)]
fn manager_assigns(
    world: &mut LifecycleWorld,
    assignee: String,
    expected: u64,
) -> Result<(), eyre::Report> {
    let manager = caller(Role::Manager, None)?;
    let request = AssignTaskRequest::new(
        world.task_id()?,
        world.workspace.clone(),
        UserId::new(assignee)?,
        version(expected)?,
    );
    world.last_result = Some(run_async(world.lifecycle.assign_task(&manager, request)));
    Ok(())
}

fn transition(
    world: &mut LifecycleWorld,
    role: Role,
    user: Option<&str>,
    target: &str,
    expected: u64,
) -> Result<(), eyre::Report> {
    let actor = caller(role, user)?;
    let to_state = TaskState::try_from(target)
        .map_err(|err| eyre::eyre!("invalid target state in scenario: {err}"))?;
    let request = TransitionTaskRequest::new(
        world.task_id()?,
        world.workspace.clone(),
        to_state,
        version(expected)?,
    );
    world.last_result = Some(run_async(world.lifecycle.transition_task(&actor, request)));
    Ok(())
}

#[when(r#"agent "{user}" transitions the task to "{target}" at version {expected:u64}"#)]
fn agent_transitions(
    world: &mut LifecycleWorld,
    user: String,
    target: String,
    expected: u64,
) -> Result<(), eyre::Report> {
    transition(world, Role::Agent, Some(&user), &target, expected)
}

#[when(r#"the manager transitions the task to "{target}" at version {expected:u64}"#)]
fn manager_transitions(
    world: &mut LifecycleWorld,
    target: String,
    expected: u64,
) -> Result<(), eyre::Report> {
    transition(world, Role::Manager, None, &target, expected)
}

#[when(r#"a task titled "{title}" is created with idempotency key "{key}""#)]
fn create_with_key(
    world: &mut LifecycleWorld,
    title: String,
    key: String,
) -> Result<(), eyre::Report> {
    let manager = caller(Role::Manager, None)?;
    let request = CreateTaskRequest::new(world.workspace.clone(), title)
        .with_idempotency_key(IdempotencyKey::new(key)?);
    let created = run_async(world.lifecycle.create_task(&manager, request))
        .wrap_err("repeat keyed create")?;
    world.last_create = Some(created);
    Ok(())
}
