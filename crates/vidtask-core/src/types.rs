use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Lifecycle state of a simulated job.
///
/// Transitions only move forward: `pending → processing → completed | failed`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    /// Returns `true` once no further transitions can occur.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

/// A submitted job as persisted in the task store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub status: TaskStatus,
    /// Percentage in `0..=100`; never decreases over a task's lifetime.
    pub progress: u8,
    pub message: String,
    /// The submitted request body, stored verbatim.
    #[schema(value_type = Object)]
    pub request_data: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_id: Option<String>,
}

/// Message attached to every freshly created task.
pub const TASK_CREATED_MESSAGE: &str = "任务已创建，等待处理";

impl Task {
    /// Allocate a new pending task for `request_data`.
    pub fn new(request_data: serde_json::Value) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            status: TaskStatus::Pending,
            progress: 0,
            message: TASK_CREATED_MESSAGE.to_owned(),
            request_data,
            created_at: now,
            updated_at: now,
            result_id: None,
        }
    }
}

/// Fields written by [`crate::store::TaskStore::update_task`].
///
/// `updated_at` is stamped by the store itself.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskUpdate {
    pub status: TaskStatus,
    pub progress: u8,
    pub message: String,
    pub result_id: Option<String>,
}

/// One processed video in a success payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VideoDescriptor {
    pub url: String,
    pub cover_url: String,
    /// Length in seconds.
    pub duration: u32,
    pub format: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProcessedVideos {
    pub watermarked_video: VideoDescriptor,
    pub non_watermarked_video: VideoDescriptor,
}

/// Terminal outcome of a task. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TaskResult {
    pub id: String,
    #[serde(rename = "taskId")]
    pub task_id: String,
    pub success: bool,
    pub data: Option<ProcessedVideos>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<u16>,
}

/// What a status query observes: the live task, or its result once terminal.
///
/// Serialised untagged so the wire body is exactly a [`Task`] or a
/// [`TaskResult`].
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(untagged)]
pub enum TaskStatusView {
    Snapshot(Task),
    Finished(TaskResult),
}

impl TaskStatusView {
    pub fn is_terminal(&self) -> bool {
        match self {
            TaskStatusView::Snapshot(task) => task.status.is_terminal(),
            TaskStatusView::Finished(_) => true,
        }
    }
}
