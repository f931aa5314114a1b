//! Projected runner: the plan and its result are frozen when the task starts;
//! every query derives the current state from elapsed time alone.
//!
//! Plans live only in this process.  After a restart the stored pending
//! snapshot is all that remains of a projected task.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::TimeDelta;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

use super::{RunnerStats, RunnerStrategy, TaskRunner};
use crate::outcome::{self, OutcomeGenerator};
use crate::timeline::TimelinePlan;
use crate::types::{Task, TaskResult, TaskStatusView};

/// Everything decided for one task at start time.  Never mutated.
#[derive(Debug)]
struct FrozenRun {
    plan: TimelinePlan,
    result: TaskResult,
    created_at: Instant,
}

#[derive(Debug)]
pub struct ProjectedRunner {
    outcomes: Arc<OutcomeGenerator>,
    runs: RwLock<HashMap<String, Arc<FrozenRun>>>,
}

impl ProjectedRunner {
    pub fn new(outcomes: Arc<OutcomeGenerator>) -> Self {
        Self { outcomes, runs: RwLock::new(HashMap::new()) }
    }

    /// The frozen plan for `task_id`, if this process started it.
    pub async fn plan(&self, task_id: &str) -> Option<TimelinePlan> {
        self.runs.read().await.get(task_id).map(|run| run.plan.clone())
    }
}

#[async_trait]
impl TaskRunner for ProjectedRunner {
    fn strategy(&self) -> RunnerStrategy {
        RunnerStrategy::Projected
    }

    async fn start(&self, task: &Task) {
        let mut runs = self.runs.write().await;
        if runs.contains_key(&task.id) {
            // A plan is never re-drawn.
            return;
        }
        let outcome = self.outcomes.decide();
        let run = FrozenRun {
            plan: TimelinePlan::new(outcome),
            result: outcome::build_result(&task.id, outcome),
            created_at: Instant::now(),
        };
        debug!(
            task_id = %task.id,
            ?outcome,
            total_ms = run.plan.total_duration().as_millis() as u64,
            "projected plan frozen"
        );
        runs.insert(task.id.clone(), Arc::new(run));
    }

    async fn observe(&self, task: Task) -> TaskStatusView {
        let Some(run) = self.runs.read().await.get(&task.id).cloned() else {
            debug!(task_id = %task.id, "no plan held for task; returning stored snapshot");
            return TaskStatusView::Snapshot(task);
        };

        let observation = run.plan.observe(run.created_at.elapsed());
        if observation.is_terminal() {
            return TaskStatusView::Finished(run.result.clone());
        }

        let reached_at = task.created_at
            + TimeDelta::from_std(observation.offset).unwrap_or_else(|_| TimeDelta::zero());
        TaskStatusView::Snapshot(Task {
            status: observation.status,
            progress: observation.progress,
            message: observation.message.to_owned(),
            updated_at: reached_at.max(task.updated_at),
            ..task
        })
    }

    async fn stats(&self) -> RunnerStats {
        RunnerStats { strategy: RunnerStrategy::Projected, active: self.runs.read().await.len() }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::time::Duration;

    use crate::outcome::Outcome;
    use crate::stage;
    use crate::types::TaskStatus;

    fn runner(outcome: Outcome) -> ProjectedRunner {
        ProjectedRunner::new(Arc::new(OutcomeGenerator::fixed(outcome)))
    }

    fn progress_of(view: &TaskStatusView) -> u8 {
        match view {
            TaskStatusView::Snapshot(task) => task.progress,
            TaskStatusView::Finished(_) => 100,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn projection_advances_with_time_only() {
        let runner = runner(Outcome::Succeed);
        let task = Task::new(serde_json::json!({}));
        runner.start(&task).await;

        let view = runner.observe(task.clone()).await;
        assert_eq!(view, TaskStatusView::Snapshot(task.clone()));

        tokio::time::advance(stage::checkpoint_offset(2)).await;
        match runner.observe(task.clone()).await {
            TaskStatusView::Snapshot(current) => {
                assert_eq!(current.status, TaskStatus::Processing);
                assert_eq!(current.progress, stage::CHECKPOINTS[2].progress);
                assert!(current.updated_at > task.created_at);
            }
            other => panic!("expected processing snapshot, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_queries_never_regress_and_converge() {
        let runner = runner(Outcome::Fail { checkpoint: 3 });
        let task = Task::new(serde_json::json!({}));
        runner.start(&task).await;
        let total = runner.plan(&task.id).await.expect("plan").total_duration();

        let mut last_progress = 0;
        let mut elapsed = Duration::ZERO;
        while elapsed <= total {
            let first = runner.observe(task.clone()).await;
            let again = runner.observe(task.clone()).await;
            assert_eq!(first, again, "same instant, same answer");
            assert!(progress_of(&first) >= last_progress);
            last_progress = progress_of(&first);
            tokio::time::advance(Duration::from_millis(250)).await;
            elapsed += Duration::from_millis(250);
        }

        let terminal = runner.observe(task.clone()).await;
        let TaskStatusView::Finished(result) = &terminal else {
            panic!("expected terminal result, got {terminal:?}");
        };
        assert_eq!(result.error_code, Some(503));

        tokio::time::advance(Duration::from_secs(24 * 3600)).await;
        assert_eq!(runner.observe(task.clone()).await, terminal);
    }

    #[tokio::test]
    async fn start_is_idempotent_per_task() {
        let runner = ProjectedRunner::new(Arc::new(OutcomeGenerator::seeded(0.5, 9)));
        let task = Task::new(serde_json::json!({}));
        runner.start(&task).await;
        let first = runner.plan(&task.id).await.expect("plan");
        for _ in 0..20 {
            runner.start(&task).await;
        }
        assert_eq!(runner.plan(&task.id).await.expect("plan"), first);
        assert_eq!(runner.stats().await.active, 1);
    }

    #[tokio::test]
    async fn unknown_plan_falls_back_to_snapshot() {
        let runner = runner(Outcome::Succeed);
        let task = Task::new(serde_json::json!({}));
        assert_eq!(runner.observe(task.clone()).await, TaskStatusView::Snapshot(task));
    }
}
