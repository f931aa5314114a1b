//! Task service: submission and status lookup on top of a store and a runner.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::error::TaskError;
use crate::runner::{RunnerStats, TaskRunner};
use crate::store::{StoreCounts, TaskStore};
use crate::types::{Task, TaskStatus, TaskStatusView};

pub const SUBMITTED_MESSAGE: &str = "任务已提交，正在处理中";

/// Immediate answer to a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SubmitReceipt {
    pub task_id: String,
    pub status: TaskStatus,
    pub message: String,
}

/// Operational counters. Not part of the API contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServiceStats {
    pub runner: RunnerStats,
    pub store: StoreCounts,
}

#[derive(Debug, Clone)]
pub struct TaskService {
    store: Arc<dyn TaskStore>,
    runner: Arc<dyn TaskRunner>,
}

impl TaskService {
    pub fn new(store: Arc<dyn TaskStore>, runner: Arc<dyn TaskRunner>) -> Self {
        Self { store, runner }
    }

    pub fn runner(&self) -> &Arc<dyn TaskRunner> {
        &self.runner
    }

    /// Persist a new pending task and start simulating it.
    ///
    /// Returns as soon as the task is stored and its runner has been kicked
    /// off; never waits for processing.
    pub async fn submit(&self, request_data: serde_json::Value) -> SubmitReceipt {
        let task = Task::new(request_data);
        if let Err(e) = self.store.insert_task(task.clone()).await {
            warn!(task_id = %task.id, error = %e, "failed to persist submitted task");
        }
        self.runner.start(&task).await;
        info!(task_id = %task.id, runner = %self.runner.strategy(), "task submitted");

        SubmitReceipt {
            task_id: task.id,
            status: TaskStatus::Pending,
            message: SUBMITTED_MESSAGE.to_owned(),
        }
    }

    /// Current state of `task_id`: the live snapshot, or the result once the
    /// task is terminal.
    pub async fn get_status(&self, task_id: &str) -> Result<TaskStatusView, TaskError> {
        let task = match self.store.find_task(task_id).await {
            Ok(task) => task,
            Err(e) => {
                warn!(task_id, error = %e, "failed to read task; treating as absent");
                None
            }
        };
        let task = task.ok_or_else(|| TaskError::NotFound(task_id.to_owned()))?;
        Ok(self.runner.observe(task).await)
    }

    pub async fn stats(&self) -> ServiceStats {
        let store = self.store.counts().await.unwrap_or_else(|e| {
            warn!(error = %e, "failed to count stored tasks");
            StoreCounts::default()
        });
        ServiceStats { runner: self.runner.stats().await, store }
    }
}
