//! Axum router construction.
//!
//! [`build`] assembles the complete application router:
//! - `/api` task routes (submission, status polling, debug counters)
//! - `/health`
//! - `/api-docs/openapi.json` when `VIDTASK_ENABLE_DOCS` is on
//! - CORS and per-request trace-id middleware

mod api;
pub mod doc;
mod health;

use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router, middleware};
use tower::ServiceBuilder;

use crate::middleware::{cors, trace};
use crate::state::AppState;

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .merge(health::router())
        .nest("/api", api::router());

    if state.config.enable_docs {
        let api_doc = doc::get_docs();
        app = app.route(
            "/api-docs/openapi.json",
            get(move || {
                let doc = api_doc.clone();
                async move { Json(doc) }
            }),
        );
    }

    app.layer(
        ServiceBuilder::new()
            .layer(cors::cors_layer(&state))
            .layer(middleware::from_fn(trace::trace_middleware)),
    )
    .with_state(state)
}
