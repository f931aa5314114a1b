use serde::Serialize;
use utoipa::ToSchema;
use vidtask_core::{RunnerStrategy, ServiceStats};

/// Operational snapshot served by `GET /api/debug`.
///
/// Not part of the client contract; fields may change without notice.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DebugResponse {
    pub runner: RunnerStrategy,
    /// Tasks currently held by the store.
    pub tasks: u64,
    /// Results currently held by the store.
    pub results: u64,
    /// Driven: simulations still running.  Projected: plans held in memory.
    pub active: usize,
}

impl From<ServiceStats> for DebugResponse {
    fn from(stats: ServiceStats) -> Self {
        Self {
            runner: stats.runner.strategy,
            tasks: stats.store.tasks,
            results: stats.store.results,
            active: stats.runner.active,
        }
    }
}
