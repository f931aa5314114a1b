//! SQLite implementation of [`TaskStore`].
//!
//! Migrations under `./migrations` are embedded at compile time (the path is
//! resolved relative to `CARGO_MANIFEST_DIR`) and run by
//! [`SqliteStore::connect`].  Queries use the runtime-checked `sqlx::query`
//! form so no `DATABASE_URL` is needed to build the crate.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::warn;

use super::{StoreCounts, TaskStore};
use crate::error::StoreError;
use crate::types::{Task, TaskResult, TaskStatus, TaskUpdate};

type TaskRow = (String, String, i64, String, String, String, String, Option<String>);
type ResultRow = (String, String, bool, Option<String>, String, Option<i64>);

const TASK_COLUMNS: &str =
    "id, status, progress, message, request_data, created_at, updated_at, result_id";

#[derive(Clone, Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database at `url` and run pending migrations.
    ///
    /// `url` is a sqlx SQLite URL such as `"sqlite://vidtask.db"`, or
    /// `"sqlite::memory:"` for tests.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        // Every connection to `:memory:` is its own database.
        let max_connections = if url.contains(":memory:") { 1 } else { 8 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }
}

fn parse_timestamp(raw: &str, column: &str) -> DateTime<Utc> {
    raw.parse().unwrap_or_else(|e: chrono::ParseError| {
        warn!(raw = %raw, column, error = %e, "failed to parse task timestamp; using now");
        Utc::now()
    })
}

fn task_from_row(row: TaskRow) -> Result<Task, StoreError> {
    let (id, status, progress, message, request_data, created_at, updated_at, result_id) = row;
    let status = TaskStatus::from_str(&status).unwrap_or_else(|_| {
        warn!(task_id = %id, raw = %status, "unknown stored task status; treating as pending");
        TaskStatus::Pending
    });
    Ok(Task {
        status,
        progress: progress.clamp(0, 100) as u8,
        message,
        request_data: serde_json::from_str(&request_data)?,
        created_at: parse_timestamp(&created_at, "created_at"),
        updated_at: parse_timestamp(&updated_at, "updated_at"),
        result_id,
        id,
    })
}

fn result_from_row(row: ResultRow) -> Result<TaskResult, StoreError> {
    let (id, task_id, success, data, message, error_code) = row;
    let data = match data {
        Some(raw) => Some(serde_json::from_str(&raw)?),
        None => None,
    };
    Ok(TaskResult {
        id,
        task_id,
        success,
        data,
        message,
        error_code: error_code.and_then(|c| u16::try_from(c).ok()),
    })
}

#[async_trait]
impl TaskStore for SqliteStore {
    async fn insert_task(&self, task: Task) -> Result<(), StoreError> {
        let request_data = serde_json::to_string(&task.request_data)?;
        sqlx::query(
            "INSERT INTO tasks (id, status, progress, message, request_data, created_at, updated_at, result_id) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&task.id)
        .bind(task.status.as_ref())
        .bind(i64::from(task.progress))
        .bind(&task.message)
        .bind(&request_data)
        .bind(task.created_at.to_rfc3339())
        .bind(task.updated_at.to_rfc3339())
        .bind(&task.result_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_task(&self, id: &str) -> Result<Option<Task>, StoreError> {
        let row: Option<TaskRow> =
            sqlx::query_as(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(task_from_row).transpose()
    }

    async fn update_task(&self, id: &str, update: TaskUpdate) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE tasks SET status = ?1, progress = ?2, message = ?3, \
             result_id = COALESCE(?4, result_id), updated_at = ?5 WHERE id = ?6",
        )
        .bind(update.status.as_ref())
        .bind(i64::from(update.progress))
        .bind(&update.message)
        .bind(&update.result_id)
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_tasks(&self) -> Result<Vec<Task>, StoreError> {
        let rows: Vec<TaskRow> =
            sqlx::query_as(&format!("SELECT {TASK_COLUMNS} FROM tasks ORDER BY created_at DESC"))
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(task_from_row).collect()
    }

    async fn insert_result(&self, result: TaskResult) -> Result<(), StoreError> {
        let data = result.data.as_ref().map(serde_json::to_string).transpose()?;
        sqlx::query(
            "INSERT INTO task_results (id, task_id, success, data, message, error_code) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&result.id)
        .bind(&result.task_id)
        .bind(result.success)
        .bind(&data)
        .bind(&result.message)
        .bind(result.error_code.map(i64::from))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_result(&self, id: &str) -> Result<Option<TaskResult>, StoreError> {
        let row: Option<ResultRow> = sqlx::query_as(
            "SELECT id, task_id, success, data, message, error_code FROM task_results WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(result_from_row).transpose()
    }

    async fn counts(&self) -> Result<StoreCounts, StoreError> {
        let (tasks, results): (i64, i64) = sqlx::query_as(
            "SELECT (SELECT COUNT(*) FROM tasks), (SELECT COUNT(*) FROM task_results)",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(StoreCounts { tasks: tasks.max(0) as u64, results: results.max(0) as u64 })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::outcome::{build_failure_result, build_success_result};

    async fn memory_store() -> SqliteStore {
        SqliteStore::connect("sqlite::memory:").await.expect("in-memory sqlite")
    }

    #[tokio::test]
    async fn task_round_trips_through_sqlite() {
        let store = memory_store().await;
        let task = Task::new(serde_json::json!({ "url": "https://v.example/abc", "quality": "hd" }));
        let id = task.id.clone();
        store.insert_task(task.clone()).await.expect("insert");

        let loaded = store.find_task(&id).await.expect("find").expect("present");
        assert_eq!(loaded.id, task.id);
        assert_eq!(loaded.status, TaskStatus::Pending);
        assert_eq!(loaded.request_data, task.request_data);
        assert_eq!(loaded.created_at.timestamp_millis(), task.created_at.timestamp_millis());
        assert!(store.find_task("missing").await.expect("find").is_none());
    }

    #[tokio::test]
    async fn update_links_result_once() {
        let store = memory_store().await;
        let task = Task::new(serde_json::json!({}));
        let id = task.id.clone();
        store.insert_task(task).await.expect("insert");

        let result = build_failure_result(&id, 3);
        let result_id = result.id.clone();
        store.insert_result(result.clone()).await.expect("insert result");
        store
            .update_task(&id, TaskUpdate {
                status: TaskStatus::Failed,
                progress: 70,
                message: result.message.clone(),
                result_id: Some(result_id.clone()),
            })
            .await
            .expect("update");

        let loaded = store.find_task(&id).await.expect("find").expect("present");
        assert_eq!(loaded.status, TaskStatus::Failed);
        assert_eq!(loaded.progress, 70);
        assert_eq!(loaded.result_id.as_deref(), Some(result_id.as_str()));

        let stored = store.find_result(&result_id).await.expect("find").expect("present");
        assert_eq!(stored, result);
    }

    #[tokio::test]
    async fn success_payload_survives_storage() {
        let store = memory_store().await;
        let result = build_success_result("t-9");
        store.insert_result(result.clone()).await.expect("insert");
        let stored = store.find_result(&result.id).await.expect("find").expect("present");
        assert_eq!(stored.data, result.data);
        assert_eq!(stored.error_code, None);
    }

    #[tokio::test]
    async fn counts_and_listing() {
        let store = memory_store().await;
        for n in 0..3 {
            store
                .insert_task(Task::new(serde_json::json!({ "n": n })))
                .await
                .expect("insert");
        }
        store.insert_result(build_success_result("t")).await.expect("insert");

        assert_eq!(store.counts().await.expect("counts"), StoreCounts { tasks: 3, results: 1 });
        assert_eq!(store.list_tasks().await.expect("list").len(), 3);
    }
}
