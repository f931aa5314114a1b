//! Status polling endpoint.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;
use vidtask_core::TaskStatusView;
use vidtask_core::types::{ProcessedVideos, Task, TaskResult, TaskStatus, VideoDescriptor};

use crate::error::ServerError;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(get_task_status),
    components(schemas(
        TaskStatusView,
        Task,
        TaskResult,
        TaskStatus,
        ProcessedVideos,
        VideoDescriptor
    ))
)]
pub struct TasksApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/task-status/{id}", get(get_task_status))
}

/// Poll a task.
///
/// Returns the task snapshot while it is pending or processing, and the
/// final result object once it has completed or failed.
#[utoipa::path(
    get,
    path = "/api/task-status/{id}",
    tag = "tasks",
    params(
        ("id" = String, Path, description = "Task id returned on submission")
    ),
    responses(
        (status = 200, description = "Task snapshot or final result", body = TaskStatusView),
        (status = 404, description = "Task not found"),
    )
)]
pub async fn get_task_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TaskStatusView>, ServerError> {
    Ok(Json(state.service.get_status(&id).await?))
}
