//! In-memory transaction runner and stores.
//!
//! A transaction works on a private copy of the state and publishes it only
//! when the unit of work succeeds. The state lock is held for the whole
//! unit of work, so transactions are serialized.

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::task::{
    domain::{
        IdempotencyKey, IdempotencyRecord, NewTaskEvent, Task, TaskChanges, TaskEvent, TaskId,
        TaskVersion, WorkspaceId,
    },
    ports::{
        IdempotencyStore, StoreError, StoreResult, TaskEventStore, TaskListQuery, TaskStore,
        TransactionRunner,
    },
};

/// Thread-safe in-memory task, event and idempotency store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskStore {
    state: Arc<Mutex<InMemoryScope>>,
}

/// Store handle passed to in-memory units of work.
#[derive(Debug, Clone, Default)]
pub struct InMemoryScope {
    tasks: HashMap<TaskId, Task>,
    events: Vec<TaskEvent>,
    idempotency: HashMap<IdempotencyKey, IdempotencyRecord>,
    last_event_at: Option<DateTime<Utc>>,
}

impl InMemoryTaskStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, InMemoryScope>> {
        self.state
            .lock()
            .map_err(|err| StoreError::persistence(std::io::Error::other(err.to_string())))
    }
}

#[async_trait]
impl TransactionRunner for InMemoryTaskStore {
    type Scope = InMemoryScope;

    async fn run_in_transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self::Scope) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<StoreError> + Send + 'static,
    {
        let mut committed = self.lock()?;
        let mut staged = committed.clone();
        let output = work(&mut staged)?;
        *committed = staged;
        Ok(output)
    }

    async fn run_read_only<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self::Scope) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<StoreError> + Send + 'static,
    {
        let mut snapshot = self.lock()?.clone();
        work(&mut snapshot)
    }
}

impl InMemoryScope {
    /// Returns a strictly increasing insertion timestamp at microsecond
    /// precision.
    fn next_event_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now().trunc_subsecs(6);
        let stamped = match self.last_event_at {
            Some(previous) if now <= previous => previous + TimeDelta::microseconds(1),
            _ => now,
        };
        self.last_event_at = Some(stamped);
        stamped
    }
}

/// Sorts events newest first and keeps at most `limit`.
fn newest_first(mut events: Vec<TaskEvent>, limit: usize) -> Vec<TaskEvent> {
    events.sort_by(|left, right| right.order_key().cmp(&left.order_key()));
    events.truncate(limit);
    events
}

impl TaskStore for InMemoryScope {
    fn insert_task(&mut self, task: &Task) -> StoreResult<()> {
        if self.tasks.contains_key(&task.id()) {
            return Err(StoreError::DuplicateTask(task.id()));
        }
        self.tasks.insert(task.id(), task.clone());
        Ok(())
    }

    fn find_task(&mut self, id: TaskId, workspace_id: &WorkspaceId) -> StoreResult<Option<Task>> {
        Ok(self
            .tasks
            .get(&id)
            .filter(|task| task.workspace_id() == workspace_id)
            .cloned())
    }

    fn compare_and_swap_task(
        &mut self,
        id: TaskId,
        expected: TaskVersion,
        changes: &TaskChanges,
    ) -> StoreResult<u64> {
        let Some(stored) = self.tasks.get_mut(&id) else {
            return Ok(0);
        };
        if stored.version() != expected {
            return Ok(0);
        }
        *stored = stored
            .with_changes(changes)
            .map_err(StoreError::serialization)?;
        Ok(1)
    }

    fn list_tasks(&mut self, query: &TaskListQuery) -> StoreResult<Vec<Task>> {
        let mut tasks: Vec<Task> = self
            .tasks
            .values()
            .filter(|task| task.workspace_id() == &query.workspace_id)
            .filter(|task| query.state.is_none_or(|state| task.state() == state))
            .filter(|task| {
                query
                    .assignee_id
                    .as_ref()
                    .is_none_or(|assignee| task.assignee_id() == Some(assignee))
            })
            .filter(|task| {
                query.after.is_none_or(|after| {
                    (task.created_at(), task.id()) < (after.created_at, after.task_id)
                })
            })
            .cloned()
            .collect();
        tasks.sort_by(|left, right| {
            (right.created_at(), right.id()).cmp(&(left.created_at(), left.id()))
        });
        tasks.truncate(query.limit);
        Ok(tasks)
    }
}

impl TaskEventStore for InMemoryScope {
    fn append_event(&mut self, event: &NewTaskEvent) -> StoreResult<()> {
        let created_at = self.next_event_timestamp();
        self.events.push(event.clone().into_recorded(created_at));
        Ok(())
    }

    fn recent_events_for_task(
        &mut self,
        task_id: TaskId,
        limit: usize,
    ) -> StoreResult<Vec<TaskEvent>> {
        let events = self
            .events
            .iter()
            .filter(|event| event.task_id == task_id)
            .cloned()
            .collect();
        Ok(newest_first(events, limit))
    }

    fn latest_events(&mut self, limit: usize) -> StoreResult<Vec<TaskEvent>> {
        Ok(newest_first(self.events.clone(), limit))
    }
}

impl IdempotencyStore for InMemoryScope {
    fn find_idempotency_record(
        &mut self,
        key: &IdempotencyKey,
    ) -> StoreResult<Option<IdempotencyRecord>> {
        Ok(self.idempotency.get(key).cloned())
    }

    fn save_idempotency_record(&mut self, record: &IdempotencyRecord) -> StoreResult<()> {
        if self.idempotency.contains_key(&record.key) {
            return Err(StoreError::DuplicateIdempotencyKey(record.key.clone()));
        }
        self.idempotency.insert(record.key.clone(), record.clone());
        Ok(())
    }
}
