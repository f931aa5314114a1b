//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use vidtask_core::runner::build_runner;
use vidtask_core::{TaskService, TaskStore};

use crate::config::Config;

/// State shared across all HTTP handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Submission and status lookup, bound to one store and one runner.
    pub service: TaskService,
}

impl AppState {
    /// Wire the task service for `config` on top of `store`.
    ///
    /// The runner strategy is fixed here, once per process.
    pub fn new(config: Config, store: Arc<dyn TaskStore>) -> Self {
        let outcomes = Arc::new(config.outcome_generator());
        let runner = build_runner(config.runner, Arc::clone(&store), outcomes);
        Self {
            config: Arc::new(config),
            service: TaskService::new(store, runner),
        }
    }
}
