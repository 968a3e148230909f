//! Store ports implemented directly on a Diesel `PgConnection`.
//!
//! Inside [`super::PostgresTransactionRunner::run_in_transaction`] the
//! connection is already in a transaction, so every call below joins it.

use super::{
    models::{
        IdempotencyRow, NewIdempotencyRow, NewTaskEventRow, NewTaskRow, TaskChangeRow,
        TaskEventRow, TaskRow, version_column,
    },
    schema::{idempotency_keys, task_events, tasks},
};
use crate::task::{
    domain::{
        IdempotencyKey, IdempotencyRecord, NewTaskEvent, Task, TaskChanges, TaskEvent, TaskId,
        TaskVersion, WorkspaceId,
    },
    ports::{
        IdempotencyStore, StoreError, StoreResult, TaskEventStore, TaskListQuery, TaskStore,
    },
};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};

fn is_unique_violation(err: &DieselError) -> bool {
    matches!(
        err,
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)
    )
}

/// Limits beyond `BIGINT` mean "no limit" in practice.
fn row_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

impl TaskStore for PgConnection {
    fn insert_task(&mut self, task: &Task) -> StoreResult<()> {
        let row = NewTaskRow::try_from_domain(task)?;
        diesel::insert_into(tasks::table)
            .values(&row)
            .execute(self)
            .map_err(|err| {
                if is_unique_violation(&err) {
                    StoreError::DuplicateTask(task.id())
                } else {
                    StoreError::persistence(err)
                }
            })?;
        Ok(())
    }

    fn find_task(&mut self, id: TaskId, workspace_id: &WorkspaceId) -> StoreResult<Option<Task>> {
        tasks::table
            .filter(tasks::task_id.eq(id.into_inner()))
            .filter(tasks::workspace_id.eq(workspace_id.as_str()))
            .select(TaskRow::as_select())
            .first::<TaskRow>(self)
            .optional()
            .map_err(StoreError::persistence)?
            .map(TaskRow::into_domain)
            .transpose()
    }

    fn compare_and_swap_task(
        &mut self,
        id: TaskId,
        expected: TaskVersion,
        changes: &TaskChanges,
    ) -> StoreResult<u64> {
        let change_row = TaskChangeRow::try_from_domain(expected, changes)?;
        let affected = diesel::update(
            tasks::table
                .filter(tasks::task_id.eq(id.into_inner()))
                .filter(tasks::version.eq(version_column(expected)?)),
        )
        .set(&change_row)
        .execute(self)
        .map_err(StoreError::persistence)?;
        u64::try_from(affected).map_err(StoreError::serialization)
    }

    fn list_tasks(&mut self, query: &TaskListQuery) -> StoreResult<Vec<Task>> {
        let mut statement = tasks::table
            .select(TaskRow::as_select())
            .filter(tasks::workspace_id.eq(query.workspace_id.as_str().to_owned()))
            .into_boxed();

        if let Some(state) = query.state {
            statement = statement.filter(tasks::state.eq(state.as_str()));
        }
        if let Some(assignee) = &query.assignee_id {
            statement = statement.filter(tasks::assignee_id.eq(assignee.as_str().to_owned()));
        }
        if let Some(after) = query.after {
            statement = statement.filter(
                tasks::created_at.lt(after.created_at).or(tasks::created_at
                    .eq(after.created_at)
                    .and(tasks::task_id.lt(after.task_id.into_inner()))),
            );
        }

        let rows = statement
            .order((tasks::created_at.desc(), tasks::task_id.desc()))
            .limit(row_limit(query.limit))
            .load::<TaskRow>(self)
            .map_err(StoreError::persistence)?;
        rows.into_iter().map(TaskRow::into_domain).collect()
    }
}

impl TaskEventStore for PgConnection {
    fn append_event(&mut self, event: &NewTaskEvent) -> StoreResult<()> {
        let row = NewTaskEventRow::try_from_domain(event)?;
        diesel::insert_into(task_events::table)
            .values(&row)
            .execute(self)
            .map_err(StoreError::persistence)?;
        Ok(())
    }

    fn recent_events_for_task(
        &mut self,
        task_id: TaskId,
        limit: usize,
    ) -> StoreResult<Vec<TaskEvent>> {
        let rows = task_events::table
            .filter(task_events::task_id.eq(task_id.into_inner()))
            .order((task_events::created_at.desc(), task_events::event_id.desc()))
            .limit(row_limit(limit))
            .select(TaskEventRow::as_select())
            .load::<TaskEventRow>(self)
            .map_err(StoreError::persistence)?;
        rows.into_iter().map(TaskEventRow::into_domain).collect()
    }

    fn latest_events(&mut self, limit: usize) -> StoreResult<Vec<TaskEvent>> {
        let rows = task_events::table
            .order((task_events::created_at.desc(), task_events::event_id.desc()))
            .limit(row_limit(limit))
            .select(TaskEventRow::as_select())
            .load::<TaskEventRow>(self)
            .map_err(StoreError::persistence)?;
        rows.into_iter().map(TaskEventRow::into_domain).collect()
    }
}

impl IdempotencyStore for PgConnection {
    fn find_idempotency_record(
        &mut self,
        key: &IdempotencyKey,
    ) -> StoreResult<Option<IdempotencyRecord>> {
        idempotency_keys::table
            .filter(idempotency_keys::key.eq(key.as_str()))
            .select(IdempotencyRow::as_select())
            .first::<IdempotencyRow>(self)
            .optional()
            .map_err(StoreError::persistence)?
            .map(IdempotencyRow::into_domain)
            .transpose()
    }

    fn save_idempotency_record(&mut self, record: &IdempotencyRecord) -> StoreResult<()> {
        diesel::insert_into(idempotency_keys::table)
            .values(NewIdempotencyRow::from(record))
            .execute(self)
            .map_err(|err| {
                if is_unique_violation(&err) {
                    StoreError::DuplicateIdempotencyKey(record.key.clone())
                } else {
                    StoreError::persistence(err)
                }
            })?;
        Ok(())
    }
}
