//! Timeline planner.
//!
//! [`Timeline`] walks the [`stage`](crate::stage) table lazily for one
//! [`Outcome`], yielding the observations a poller should see and the offset
//! (from submission) at which each one becomes visible:
//!
//! ```text
//! offset 0            pending     0%
//! INITIAL_DELAY       processing  checkpoint 0
//! + d0                processing  checkpoint 1
//! ...
//! + d0..d(n-1)        completed   last checkpoint   (or failed at the injected one)
//! ```
//!
//! The driven runner consumes the iterator step by step; the projected runner
//! collects it once into a [`TimelinePlan`].

use std::time::Duration;

use crate::outcome::Outcome;
use crate::stage::{self, CHECKPOINTS, INITIAL_DELAY};
use crate::types::{TASK_CREATED_MESSAGE, TaskStatus, TaskUpdate};

/// A single planned state of a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub status: TaskStatus,
    pub progress: u8,
    pub message: &'static str,
    /// Time from submission at which this observation is reached.
    pub offset: Duration,
    pub error_code: Option<u16>,
}

impl Observation {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// The store write that realises this observation.
    pub fn to_update(&self, result_id: Option<String>) -> TaskUpdate {
        TaskUpdate {
            status: self.status,
            progress: self.progress,
            message: self.message.to_owned(),
            result_id,
        }
    }
}

/// Lazy observation sequence for one outcome.
#[derive(Debug, Clone)]
pub struct Timeline {
    outcome: Outcome,
    next: Cursor,
    offset: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    Start,
    Checkpoint(usize),
    Done,
}

impl Timeline {
    pub fn new(outcome: Outcome) -> Self {
        Self { outcome, next: Cursor::Start, offset: Duration::ZERO }
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }
}

impl Iterator for Timeline {
    type Item = Observation;

    fn next(&mut self) -> Option<Observation> {
        match self.next {
            Cursor::Done => None,
            Cursor::Start => {
                self.next = Cursor::Checkpoint(0);
                self.offset = INITIAL_DELAY;
                Some(Observation {
                    status: TaskStatus::Pending,
                    progress: 0,
                    message: TASK_CREATED_MESSAGE,
                    offset: Duration::ZERO,
                    error_code: None,
                })
            }
            Cursor::Checkpoint(index) => {
                let checkpoint = &CHECKPOINTS[index];
                let offset = self.offset;

                if self.outcome.failure_checkpoint() == Some(index) {
                    self.next = Cursor::Done;
                    return Some(Observation {
                        status: TaskStatus::Failed,
                        progress: checkpoint.progress,
                        message: stage::failure_message(index).unwrap_or(checkpoint.message),
                        offset,
                        error_code: Some(stage::failure_code(index)),
                    });
                }

                let status = if index == stage::last_checkpoint() {
                    self.next = Cursor::Done;
                    TaskStatus::Completed
                } else {
                    self.next = Cursor::Checkpoint(index + 1);
                    self.offset += checkpoint.duration;
                    TaskStatus::Processing
                };

                Some(Observation {
                    status,
                    progress: checkpoint.progress,
                    message: checkpoint.message,
                    offset,
                    error_code: None,
                })
            }
        }
    }
}

/// Expand the stage table for `outcome` into its full observation sequence.
pub fn plan(outcome: Outcome) -> Vec<Observation> {
    Timeline::new(outcome).collect()
}

/// A frozen, fully materialised timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelinePlan {
    outcome: Outcome,
    observations: Vec<Observation>,
}

impl TimelinePlan {
    pub fn new(outcome: Outcome) -> Self {
        Self { outcome, observations: plan(outcome) }
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Offset of the terminal observation.
    pub fn total_duration(&self) -> Duration {
        self.terminal().offset
    }

    pub fn terminal(&self) -> &Observation {
        // A plan always holds at least the pending observation and a terminal one.
        &self.observations[self.observations.len() - 1]
    }

    /// The last observation reached once `elapsed` has passed since submission.
    pub fn observe(&self, elapsed: Duration) -> &Observation {
        let reached = self
            .observations
            .partition_point(|obs| obs.offset <= elapsed);
        &self.observations[reached.saturating_sub(1)]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn success_plan_walks_every_checkpoint() {
        let observations = plan(Outcome::Succeed);
        assert_eq!(observations.len(), CHECKPOINTS.len() + 1);
        assert_eq!(observations[0].status, TaskStatus::Pending);
        assert_eq!(observations[0].offset, Duration::ZERO);
        assert_eq!(observations[1].offset, INITIAL_DELAY);
        for obs in &observations[1..observations.len() - 1] {
            assert_eq!(obs.status, TaskStatus::Processing);
        }
        let last = observations.last().expect("terminal observation");
        assert_eq!(last.status, TaskStatus::Completed);
        assert_eq!(last.progress, 100);
        assert_eq!(last.offset, stage::total_duration());
    }

    #[test]
    fn failure_plan_stops_at_injected_checkpoint() {
        let observations = plan(Outcome::Fail { checkpoint: 2 });
        // pending, checkpoint 0, checkpoint 1, failed at 2
        assert_eq!(observations.len(), 4);
        let last = &observations[3];
        assert_eq!(last.status, TaskStatus::Failed);
        assert_eq!(last.progress, CHECKPOINTS[2].progress);
        assert_eq!(last.message, "水印区域识别失败");
        assert_eq!(last.error_code, Some(502));
        assert_eq!(last.offset, stage::checkpoint_offset(2));
    }

    #[test]
    fn plans_are_deterministic() {
        for outcome in [
            Outcome::Succeed,
            Outcome::Fail { checkpoint: 1 },
            Outcome::Fail { checkpoint: 4 },
        ] {
            assert_eq!(plan(outcome), plan(outcome));
        }
    }

    #[test]
    fn offsets_and_progress_never_decrease() {
        for outcome in [Outcome::Succeed, Outcome::Fail { checkpoint: 3 }] {
            for pair in plan(outcome).windows(2) {
                assert!(pair[0].offset < pair[1].offset);
                assert!(pair[0].progress <= pair[1].progress);
                assert!(pair[0].status <= pair[1].status);
            }
        }
    }

    #[test]
    fn observe_picks_last_reached_observation() {
        let plan = TimelinePlan::new(Outcome::Succeed);
        assert_eq!(plan.observe(Duration::ZERO).status, TaskStatus::Pending);
        assert_eq!(plan.observe(INITIAL_DELAY - Duration::from_millis(1)).status, TaskStatus::Pending);
        assert_eq!(plan.observe(INITIAL_DELAY).progress, CHECKPOINTS[0].progress);
        assert_eq!(
            plan.observe(stage::checkpoint_offset(3) + Duration::from_millis(10)).progress,
            CHECKPOINTS[3].progress
        );
        assert_eq!(plan.observe(plan.total_duration()).status, TaskStatus::Completed);
        assert_eq!(plan.observe(Duration::from_secs(3600)), plan.terminal());
    }

    #[test]
    fn projection_is_monotonic_in_elapsed_time() {
        let plan = TimelinePlan::new(Outcome::Fail { checkpoint: 4 });
        let mut previous = plan.observe(Duration::ZERO).clone();
        let mut t = Duration::ZERO;
        while t <= plan.total_duration() + Duration::from_secs(2) {
            let current = plan.observe(t);
            assert!(current.progress >= previous.progress);
            assert!(current.status >= previous.status);
            previous = current.clone();
            t += Duration::from_millis(137);
        }
        assert_eq!(previous.status, TaskStatus::Failed);
    }
}
