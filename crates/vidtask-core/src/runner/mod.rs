//! Task runners: the two ways a planned timeline becomes observable state.
//!
//! | Strategy    | Where state lives            | Suspension points        |
//! |-------------|------------------------------|--------------------------|
//! | `Driven`    | written to the task store    | one sleep per checkpoint |
//! | `Projected` | derived from elapsed time    | none                     |
//!
//! Both produce the same sequence of observations for a given outcome; a
//! poller cannot tell them apart.  The strategy is chosen once per process.

pub mod driven;
pub mod projected;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use strum::{Display, EnumString};
use utoipa::ToSchema;

use crate::outcome::OutcomeGenerator;
use crate::store::TaskStore;
use crate::types::{Task, TaskStatusView};

pub use driven::DrivenRunner;
pub use projected::ProjectedRunner;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum RunnerStrategy {
    /// Long-lived process: timers mutate the stored task.
    Driven,
    /// Stateless hosting: state is projected from a frozen plan on each query.
    Projected,
}

/// Introspection counters for the debug endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct RunnerStats {
    pub strategy: RunnerStrategy,
    /// Driven: simulations still sleeping.  Projected: plans held in memory.
    pub active: usize,
}

#[async_trait]
pub trait TaskRunner: Send + Sync + std::fmt::Debug + 'static {
    fn strategy(&self) -> RunnerStrategy;

    /// Begin simulating a freshly persisted pending task.
    ///
    /// Must return without waiting on the simulation itself.
    async fn start(&self, task: &Task);

    /// Current view of `task` as last read from the store.
    async fn observe(&self, task: Task) -> TaskStatusView;

    async fn stats(&self) -> RunnerStats;
}

/// Construct the runner for `strategy`.
pub fn build_runner(
    strategy: RunnerStrategy,
    store: Arc<dyn TaskStore>,
    outcomes: Arc<OutcomeGenerator>,
) -> Arc<dyn TaskRunner> {
    match strategy {
        RunnerStrategy::Driven => Arc::new(DrivenRunner::new(store, outcomes)),
        RunnerStrategy::Projected => Arc::new(ProjectedRunner::new(outcomes)),
    }
}
