//! Outcome generator: decides whether a run fails, and builds the terminal
//! [`TaskResult`] for either branch.

use std::str::FromStr;
use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::stage::{self, FAILURE_INJECTIONS};
use crate::types::{ProcessedVideos, TaskResult, VideoDescriptor};

/// Default probability that a run fails.
pub const DEFAULT_FAILURE_RATE: f64 = 0.2;

pub const SUCCESS_MESSAGE: &str = "视频处理成功";

/// The single fail/succeed decision made for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Succeed,
    /// Fail when the run reaches the stage table entry at `checkpoint`.
    Fail { checkpoint: usize },
}

impl Outcome {
    pub fn failure_checkpoint(&self) -> Option<usize> {
        match self {
            Outcome::Succeed => None,
            Outcome::Fail { checkpoint } => Some(*checkpoint),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OutcomeParseError {
    #[error("unrecognised outcome '{0}'; expected 'success' or 'fail:<checkpoint>'")]
    Unrecognised(String),

    #[error("checkpoint {0} has no failure injection")]
    NotInjectable(usize),
}

impl FromStr for Outcome {
    type Err = OutcomeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("success") {
            return Ok(Outcome::Succeed);
        }
        let index = s
            .strip_prefix("fail:")
            .and_then(|n| n.trim().parse::<usize>().ok())
            .ok_or_else(|| OutcomeParseError::Unrecognised(s.to_owned()))?;
        if stage::failure_message(index).is_none() {
            return Err(OutcomeParseError::NotInjectable(index));
        }
        Ok(Outcome::Fail { checkpoint: index })
    }
}

/// Draw an outcome: fail with probability `failure_rate`, then pick a failure
/// injection uniformly.
pub fn decide_outcome<R: Rng>(rng: &mut R, failure_rate: f64) -> Outcome {
    if rng.r#gen::<f64>() < failure_rate {
        let pick = rng.gen_range(0..FAILURE_INJECTIONS.len());
        Outcome::Fail { checkpoint: FAILURE_INJECTIONS[pick].checkpoint }
    } else {
        Outcome::Succeed
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutcomeMode {
    Random { failure_rate: f64 },
    Fixed(Outcome),
}

/// Shared outcome source, configured once per process.
#[derive(Debug)]
pub struct OutcomeGenerator {
    mode: OutcomeMode,
    rng: Mutex<StdRng>,
}

impl OutcomeGenerator {
    pub fn random(failure_rate: f64) -> Self {
        Self::with_rng(
            OutcomeMode::Random { failure_rate: failure_rate.clamp(0.0, 1.0) },
            StdRng::from_entropy(),
        )
    }

    /// Deterministic draws, for reproducible runs.
    pub fn seeded(failure_rate: f64, seed: u64) -> Self {
        Self::with_rng(
            OutcomeMode::Random { failure_rate: failure_rate.clamp(0.0, 1.0) },
            StdRng::seed_from_u64(seed),
        )
    }

    /// Every task gets `outcome`.
    pub fn fixed(outcome: Outcome) -> Self {
        Self::with_rng(OutcomeMode::Fixed(outcome), StdRng::seed_from_u64(0))
    }

    fn with_rng(mode: OutcomeMode, rng: StdRng) -> Self {
        Self { mode, rng: Mutex::new(rng) }
    }

    pub fn mode(&self) -> OutcomeMode {
        self.mode
    }

    pub fn decide(&self) -> Outcome {
        match self.mode {
            OutcomeMode::Fixed(outcome) => outcome,
            OutcomeMode::Random { failure_rate } => {
                let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
                decide_outcome(&mut *rng, failure_rate)
            }
        }
    }
}

impl Default for OutcomeGenerator {
    fn default() -> Self {
        Self::random(DEFAULT_FAILURE_RATE)
    }
}

fn video(kind: &str, duration: u32) -> VideoDescriptor {
    VideoDescriptor {
        url: format!("https://cdn.vidtask.example/videos/{kind}.mp4"),
        cover_url: format!("https://cdn.vidtask.example/covers/{kind}.jpg"),
        duration,
        format: "mp4".to_owned(),
    }
}

/// The fixed success payload. Identical for every input.
pub fn build_success_result(task_id: &str) -> TaskResult {
    TaskResult {
        id: uuid::Uuid::new_v4().to_string(),
        task_id: task_id.to_owned(),
        success: true,
        data: Some(ProcessedVideos {
            watermarked_video: video("watermarked", 30),
            non_watermarked_video: video("non_watermarked", 30),
        }),
        message: SUCCESS_MESSAGE.to_owned(),
        error_code: None,
    }
}

pub fn build_failure_result(task_id: &str, checkpoint: usize) -> TaskResult {
    let message = stage::failure_message(checkpoint).unwrap_or("视频处理失败");
    TaskResult {
        id: uuid::Uuid::new_v4().to_string(),
        task_id: task_id.to_owned(),
        success: false,
        data: None,
        message: message.to_owned(),
        error_code: Some(stage::failure_code(checkpoint)),
    }
}

/// Build the terminal result matching `outcome`.
pub fn build_result(task_id: &str, outcome: Outcome) -> TaskResult {
    match outcome {
        Outcome::Succeed => build_success_result(task_id),
        Outcome::Fail { checkpoint } => build_failure_result(task_id, checkpoint),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashMap;

    const DRAWS: usize = 100_000;

    #[test]
    fn failure_rate_converges_to_twenty_percent() {
        let mut rng = StdRng::seed_from_u64(7);
        let failures = (0..DRAWS)
            .filter(|_| decide_outcome(&mut rng, DEFAULT_FAILURE_RATE) != Outcome::Succeed)
            .count();
        let rate = failures as f64 / DRAWS as f64;
        assert!((rate - 0.2).abs() < 0.01, "observed failure rate {rate}");
    }

    #[test]
    fn failure_checkpoints_are_uniform() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut counts: HashMap<usize, usize> = HashMap::new();
        let mut total = 0usize;
        for _ in 0..DRAWS {
            if let Outcome::Fail { checkpoint } = decide_outcome(&mut rng, DEFAULT_FAILURE_RATE) {
                *counts.entry(checkpoint).or_default() += 1;
                total += 1;
            }
        }
        assert_eq!(counts.len(), FAILURE_INJECTIONS.len());
        let expected = total as f64 / FAILURE_INJECTIONS.len() as f64;
        for f in FAILURE_INJECTIONS {
            let seen = counts[&f.checkpoint] as f64;
            assert!(
                (seen - expected).abs() < expected * 0.1,
                "checkpoint {} drawn {seen} times, expected ~{expected}",
                f.checkpoint
            );
        }
    }

    #[test]
    fn zero_and_one_rates_are_absolute() {
        let mut rng = StdRng::seed_from_u64(3);
        assert!((0..1000).all(|_| decide_outcome(&mut rng, 0.0) == Outcome::Succeed));
        assert!((0..1000).all(|_| decide_outcome(&mut rng, 1.0) != Outcome::Succeed));
    }

    #[test]
    fn fixed_generator_always_returns_its_outcome() {
        let generator = OutcomeGenerator::fixed(Outcome::Fail { checkpoint: 3 });
        for _ in 0..10 {
            assert_eq!(generator.decide(), Outcome::Fail { checkpoint: 3 });
        }
    }

    #[test]
    fn seeded_generators_agree() {
        let a = OutcomeGenerator::seeded(0.5, 42);
        let b = OutcomeGenerator::seeded(0.5, 42);
        let left: Vec<_> = (0..50).map(|_| a.decide()).collect();
        let right: Vec<_> = (0..50).map(|_| b.decide()).collect();
        assert_eq!(left, right);
    }

    #[test]
    fn parses_outcome_overrides() {
        assert_eq!("success".parse::<Outcome>(), Ok(Outcome::Succeed));
        assert_eq!("fail:2".parse::<Outcome>(), Ok(Outcome::Fail { checkpoint: 2 }));
        assert_eq!("fail:0".parse::<Outcome>(), Err(OutcomeParseError::NotInjectable(0)));
        assert!(matches!("sometimes".parse::<Outcome>(), Err(OutcomeParseError::Unrecognised(_))));
    }

    #[test]
    fn failure_result_carries_checkpoint_code() {
        let result = build_failure_result("t-1", 2);
        assert!(!result.success);
        assert!(result.data.is_none());
        assert_eq!(result.error_code, Some(502));
        assert_eq!(result.message, "水印区域识别失败");
        assert_eq!(result.task_id, "t-1");
    }

    #[test]
    fn success_payload_is_input_independent() {
        let a = build_success_result("a");
        let b = build_success_result("b");
        assert!(a.success);
        assert_eq!(a.data, b.data);
        assert_eq!(a.message, SUCCESS_MESSAGE);
        assert_ne!(a.id, b.id);
    }
}
