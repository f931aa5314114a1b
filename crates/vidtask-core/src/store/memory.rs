use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{StoreCounts, TaskStore};
use crate::error::StoreError;
use crate::types::{Task, TaskResult, TaskUpdate};

#[derive(Debug, Default)]
struct Tables {
    tasks: HashMap<String, Task>,
    results: HashMap<String, TaskResult>,
}

/// Process-local task store.
///
/// Uses a `tokio::sync::RwLock<HashMap>` so many pollers can read while
/// runners write.  Contents are lost when the process exits.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn insert_task(&self, task: Task) -> Result<(), StoreError> {
        self.inner.write().await.tasks.insert(task.id.clone(), task);
        Ok(())
    }

    async fn find_task(&self, id: &str) -> Result<Option<Task>, StoreError> {
        Ok(self.inner.read().await.tasks.get(id).cloned())
    }

    async fn update_task(&self, id: &str, update: TaskUpdate) -> Result<(), StoreError> {
        if let Some(task) = self.inner.write().await.tasks.get_mut(id) {
            task.status = update.status;
            task.progress = update.progress;
            task.message = update.message;
            if update.result_id.is_some() {
                task.result_id = update.result_id;
            }
            task.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn list_tasks(&self) -> Result<Vec<Task>, StoreError> {
        let mut tasks: Vec<Task> = self.inner.read().await.tasks.values().cloned().collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tasks)
    }

    async fn insert_result(&self, result: TaskResult) -> Result<(), StoreError> {
        self.inner.write().await.results.insert(result.id.clone(), result);
        Ok(())
    }

    async fn find_result(&self, id: &str) -> Result<Option<TaskResult>, StoreError> {
        Ok(self.inner.read().await.results.get(id).cloned())
    }

    async fn counts(&self) -> Result<StoreCounts, StoreError> {
        let guard = self.inner.read().await;
        Ok(StoreCounts {
            tasks: guard.tasks.len() as u64,
            results: guard.results.len() as u64,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::types::TaskStatus;

    #[tokio::test]
    async fn update_overwrites_fields_and_keeps_result_link() {
        let store = MemoryStore::new();
        let task = Task::new(serde_json::json!({}));
        let id = task.id.clone();
        store.insert_task(task).await.expect("insert");

        store
            .update_task(&id, TaskUpdate {
                status: TaskStatus::Completed,
                progress: 100,
                message: "done".into(),
                result_id: Some("r-1".into()),
            })
            .await
            .expect("update");
        // A later update without a result id must not unlink the result.
        store
            .update_task(&id, TaskUpdate {
                status: TaskStatus::Completed,
                progress: 100,
                message: "done".into(),
                result_id: None,
            })
            .await
            .expect("update");

        let stored = store.find_task(&id).await.expect("find").expect("present");
        assert_eq!(stored.status, TaskStatus::Completed);
        assert_eq!(stored.progress, 100);
        assert_eq!(stored.result_id.as_deref(), Some("r-1"));
        assert!(stored.updated_at >= stored.created_at);
    }

    #[tokio::test]
    async fn update_of_unknown_task_is_ignored() {
        let store = MemoryStore::new();
        store
            .update_task("missing", TaskUpdate {
                status: TaskStatus::Processing,
                progress: 10,
                message: "x".into(),
                result_id: None,
            })
            .await
            .expect("update");
        assert_eq!(store.counts().await.expect("counts").tasks, 0);
    }
}
