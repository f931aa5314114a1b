use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::schemas::api::debug::DebugResponse;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(get_debug), components(schemas(DebugResponse)))]
pub struct DebugApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/debug", get(get_debug))
}

/// Runner and store counters.
#[utoipa::path(
    get,
    path = "/api/debug",
    tag = "debug",
    responses(
        (status = 200, description = "Current counters", body = DebugResponse)
    )
)]
pub async fn get_debug(State(state): State<Arc<AppState>>) -> Json<DebugResponse> {
    Json(state.service.stats().await.into())
}
