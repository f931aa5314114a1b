//! Driven runner: one tokio task per job sleeps through the timeline and
//! writes every observation to the task store as it is reached.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::{RunnerStats, RunnerStrategy, TaskRunner};
use crate::outcome::{self, OutcomeGenerator};
use crate::store::TaskStore;
use crate::timeline::{Observation, Timeline};
use crate::types::{Task, TaskResult, TaskStatusView};

/// Ids of simulations that have not reached a terminal state yet.
#[derive(Debug, Default)]
pub struct ActiveRuns {
    ids: Mutex<HashSet<String>>,
}

impl ActiveRuns {
    /// Register `id`; it is removed again when the returned guard drops.
    fn enter(self: &Arc<Self>, id: &str) -> ActiveGuard {
        if let Ok(mut ids) = self.ids.lock() {
            ids.insert(id.to_owned());
        }
        ActiveGuard { runs: Arc::clone(self), id: id.to_owned() }
    }

    pub fn len(&self) -> usize {
        self.ids.lock().map(|ids| ids.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.lock().map(|ids| ids.contains(id)).unwrap_or(false)
    }
}

struct ActiveGuard {
    runs: Arc<ActiveRuns>,
    id: String,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        if let Ok(mut ids) = self.runs.ids.lock() {
            ids.remove(&self.id);
        }
    }
}

#[derive(Debug)]
pub struct DrivenRunner {
    store: Arc<dyn TaskStore>,
    outcomes: Arc<OutcomeGenerator>,
    active: Arc<ActiveRuns>,
}

impl DrivenRunner {
    pub fn new(store: Arc<dyn TaskStore>, outcomes: Arc<OutcomeGenerator>) -> Self {
        Self { store, outcomes, active: Arc::new(ActiveRuns::default()) }
    }

    pub fn active_runs(&self) -> &ActiveRuns {
        &self.active
    }
}

#[async_trait]
impl TaskRunner for DrivenRunner {
    fn strategy(&self) -> RunnerStrategy {
        RunnerStrategy::Driven
    }

    async fn start(&self, task: &Task) {
        let outcome = self.outcomes.decide();
        debug!(task_id = %task.id, ?outcome, "driven simulation scheduled");

        let guard = self.active.enter(&task.id);
        let store = Arc::clone(&self.store);
        let task_id = task.id.clone();
        tokio::spawn(async move {
            drive(store.as_ref(), &task_id, Timeline::new(outcome)).await;
            drop(guard);
        });
    }

    async fn observe(&self, task: Task) -> TaskStatusView {
        let Some(result_id) = task.result_id.as_deref() else {
            return TaskStatusView::Snapshot(task);
        };
        match self.store.find_result(result_id).await {
            Ok(Some(result)) => TaskStatusView::Finished(result),
            Ok(None) => {
                warn!(task_id = %task.id, result_id, "linked result is missing; returning snapshot");
                TaskStatusView::Snapshot(task)
            }
            Err(e) => {
                warn!(task_id = %task.id, result_id, error = %e, "failed to read task result; returning snapshot");
                TaskStatusView::Snapshot(task)
            }
        }
    }

    async fn stats(&self) -> RunnerStats {
        RunnerStats { strategy: RunnerStrategy::Driven, active: self.active.len() }
    }
}

/// Play `timeline` out against the store.  Always runs to the terminal
/// observation; store failures are logged and the simulation carries on.
async fn drive(store: &dyn TaskStore, task_id: &str, timeline: Timeline) {
    let outcome = timeline.outcome();
    let mut elapsed = Duration::ZERO;

    // The pending observation at offset zero was persisted at submission.
    for observation in timeline.skip(1) {
        tokio::time::sleep(observation.offset.saturating_sub(elapsed)).await;
        elapsed = observation.offset;

        if observation.is_terminal() {
            finish(store, task_id, &observation, outcome::build_result(task_id, outcome)).await;
        } else {
            debug!(task_id, progress = observation.progress, "checkpoint reached");
            write(store, task_id, &observation, None).await;
        }
    }
}

async fn finish(
    store: &dyn TaskStore,
    task_id: &str,
    observation: &Observation,
    result: TaskResult,
) {
    let result_id = result.id.clone();
    let linked = match store.insert_result(result).await {
        Ok(()) => Some(result_id),
        Err(e) => {
            warn!(task_id, error = %e, "failed to persist task result");
            None
        }
    };
    write(store, task_id, observation, linked).await;
    info!(
        task_id,
        status = %observation.status,
        error_code = ?observation.error_code,
        "simulated task finished"
    );
}

async fn write(
    store: &dyn TaskStore,
    task_id: &str,
    observation: &Observation,
    result_id: Option<String>,
) {
    if let Err(e) = store.update_task(task_id, observation.to_update(result_id)).await {
        warn!(task_id, error = %e, "failed to write task progress");
    }
}
