//! Task store abstraction.
//!
//! [`TaskStore`] is the persistence collaborator of the simulator.  Two
//! backends ship with the crate: [`MemoryStore`] and [`SqliteStore`].  The
//! rest of the crate holds an `Arc<dyn TaskStore>` and never cares which.

pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::StoreError;
use crate::types::{Task, TaskResult, TaskUpdate};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Row counts, for the debug endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreCounts {
    pub tasks: u64,
    pub results: u64,
}

#[async_trait]
pub trait TaskStore: Send + Sync + std::fmt::Debug + 'static {
    async fn insert_task(&self, task: Task) -> Result<(), StoreError>;

    async fn find_task(&self, id: &str) -> Result<Option<Task>, StoreError>;

    /// Overwrite status, progress, message and (if given) the result link,
    /// stamping `updated_at` with the current time.  Unknown ids are ignored.
    async fn update_task(&self, id: &str, update: TaskUpdate) -> Result<(), StoreError>;

    /// All tasks, newest first.
    async fn list_tasks(&self) -> Result<Vec<Task>, StoreError>;

    async fn insert_result(&self, result: TaskResult) -> Result<(), StoreError>;

    async fn find_result(&self, id: &str) -> Result<Option<TaskResult>, StoreError>;

    async fn counts(&self) -> Result<StoreCounts, StoreError>;
}

/// Open the store named by `url`.
///
/// `""` or `"memory"` selects [`MemoryStore`].  Anything else is treated as a
/// SQLite URL; if it cannot be opened the failure is logged and an empty
/// in-memory store is returned so the service stays available.
pub async fn open_store(url: &str) -> Arc<dyn TaskStore> {
    let url = url.trim();
    if url.is_empty() || url.eq_ignore_ascii_case("memory") {
        info!("using in-memory task store");
        return Arc::new(MemoryStore::new());
    }
    match SqliteStore::connect(url).await {
        Ok(store) => {
            info!(database_url = %url, "sqlite task store ready");
            Arc::new(store)
        }
        Err(e) => {
            warn!(
                database_url = %url,
                error = %e,
                "failed to open task store; falling back to empty in-memory store"
            );
            Arc::new(MemoryStore::new())
        }
    }
}
