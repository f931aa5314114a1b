//! vidtask-core – the task lifecycle simulator behind the video job API.
//!
//! A submitted job never performs real media work.  Instead an
//! [`outcome::OutcomeGenerator`] decides once whether the job fails, the
//! [`timeline`] planner expands the [`stage`] table into a schedule of
//! observations, and a [`runner::TaskRunner`] turns that schedule into state a
//! poller can see over time.  [`service::TaskService`] ties the pieces to a
//! [`store::TaskStore`].

pub mod error;
pub mod outcome;
pub mod runner;
pub mod service;
pub mod stage;
pub mod store;
pub mod timeline;
pub mod types;


pub use error::{StoreError, TaskError};
pub use outcome::{Outcome, OutcomeGenerator};
pub use runner::{RunnerStats, RunnerStrategy, TaskRunner};
pub use service::{ServiceStats, SubmitReceipt, TaskService};
pub use store::{open_store, MemoryStore, SqliteStore, StoreCounts, TaskStore};
pub use types::{
    ProcessedVideos, Task, TaskResult, TaskStatus, TaskStatusView, TaskUpdate, VideoDescriptor,
};
