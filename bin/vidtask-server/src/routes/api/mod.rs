//! `/api` routes.

mod debug;
mod process;
mod tasks;

use std::sync::Arc;

use axum::Router;
use utoipa::OpenApi;

use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(process::router())
        .merge(tasks::router())
        .merge(debug::router())
}

pub fn api_docs() -> utoipa::openapi::OpenApi {
    let mut doc = process::ProcessApi::openapi();
    doc.merge(tasks::TasksApi::openapi());
    doc.merge(debug::DebugApi::openapi());
    doc
}
