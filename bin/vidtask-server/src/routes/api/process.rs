//! Video submission endpoint.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;
use tracing::debug;
use utoipa::OpenApi;
use vidtask_core::SubmitReceipt;

use crate::error::ServerError;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(process_video), components(schemas(SubmitReceipt)))]
pub struct ProcessApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/process-video", post(process_video))
}

/// Submit a video for watermark removal.
///
/// The payload is stored as-is on the task. An empty body is accepted and
/// recorded as `{}`. The call returns immediately; poll
/// `/api/task-status/{id}` for progress.
#[utoipa::path(
    post,
    path = "/api/process-video",
    tag = "tasks",
    request_body(content = Value, description = "Opaque request payload", content_type = "application/json"),
    responses(
        (status = 200, description = "Task accepted", body = SubmitReceipt),
        (status = 400, description = "Body is not valid JSON"),
    )
)]
pub async fn process_video(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<SubmitReceipt>, ServerError> {
    let request_data = parse_payload(&body)?;
    let receipt = state.service.submit(request_data).await;
    debug!(task_id = %receipt.task_id, "submission accepted");
    Ok(Json(receipt))
}

fn parse_payload(body: &[u8]) -> Result<Value, ServerError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_slice(body)
        .map_err(|e| ServerError::BadRequest(format!("invalid JSON payload: {e}")))
}
