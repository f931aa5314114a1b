use thiserror::Error;

/// Errors raised by a [`crate::store::TaskStore`] backend.
///
/// The service never lets these reach a caller: reads degrade to "absent"
/// and writes are logged and skipped.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// A stored JSON column could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Errors surfaced by [`crate::service::TaskService`].
#[derive(Debug, Error)]
pub enum TaskError {
    /// No task with the requested id exists.
    #[error("task {0} not found")]
    NotFound(String),
}
