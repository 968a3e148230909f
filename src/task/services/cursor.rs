//! Opaque continuation cursors for task listings.
//!
//! Format: `v1.<created_at micros>.<task uuid, simple form>`.

use crate::task::{domain::TaskId, ports::TaskListPosition};
use chrono::DateTime;
use uuid::Uuid;

const VERSION_TAG: &str = "v1";

/// Encodes a listing position as a cursor token.
pub(super) fn encode(position: TaskListPosition) -> String {
    format!(
        "{VERSION_TAG}.{}.{}",
        position.created_at.timestamp_micros(),
        position.task_id.into_inner().simple()
    )
}

/// Decodes a cursor token. Returns `None` for anything [`encode`] did not
/// produce.
pub(super) fn decode(token: &str) -> Option<TaskListPosition> {
    let mut parts = token.split('.');
    let (Some(VERSION_TAG), Some(micros), Some(id), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return None;
    };
    let created_at = DateTime::from_timestamp_micros(micros.parse().ok()?)?;
    let task_id = TaskId::from_uuid(Uuid::try_parse(id).ok()?);
    Some(TaskListPosition {
        created_at,
        task_id,
    })
}
