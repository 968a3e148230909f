//! Diesel schema for task lifecycle persistence.

diesel::table! {
    /// Task aggregate rows.
    tasks (task_id) {
        /// Task identifier.
        task_id -> Uuid,
        /// Owning tenant.
        tenant_id -> Text,
        /// Owning workspace.
        workspace_id -> Text,
        /// Task title.
        title -> Text,
        /// Task priority.
        priority -> Text,
        /// Lifecycle state.
        state -> Text,
        /// Current assignee.
        assignee_id -> Nullable<Text>,
        /// Optimistic-concurrency version.
        version -> Int8,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last mutation timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Append-only task event outbox.
    task_events (event_id) {
        /// Event identifier.
        event_id -> Uuid,
        /// Task the event describes.
        task_id -> Uuid,
        /// Tenant of the acting caller.
        tenant_id -> Text,
        /// Role of the acting caller.
        role -> Text,
        /// Event type.
        #[sql_name = "type"]
        event_type -> Text,
        /// Type-specific payload.
        payload -> Jsonb,
        /// Insertion timestamp, assigned by the database.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Idempotency keys for task creation.
    idempotency_keys (key) {
        /// Client-supplied key.
        key -> Text,
        /// Task created by the first request.
        task_id -> Uuid,
        /// Response returned on first execution.
        response -> Jsonb,
        /// Insertion timestamp.
        created_at -> Timestamptz,
    }
}

diesel::joinable!(task_events -> tasks (task_id));
diesel::joinable!(idempotency_keys -> tasks (task_id));
diesel::allow_tables_to_appear_in_same_query!(tasks, task_events, idempotency_keys);
