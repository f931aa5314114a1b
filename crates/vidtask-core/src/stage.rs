//! Static stage table: the checkpoints every simulated job walks through and
//! the points at which a run may be made to fail.

use std::time::Duration;

/// A nominal progress milestone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    pub progress: u8,
    pub message: &'static str,
    pub duration: Duration,
}

/// A designed-in failure at a given checkpoint index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureInjection {
    pub checkpoint: usize,
    pub message: &'static str,
}

/// Delay between submission and the first checkpoint.
pub const INITIAL_DELAY: Duration = Duration::from_millis(1000);

/// Ordered checkpoints. The last entry is the completion checkpoint.
pub const CHECKPOINTS: [Checkpoint; 6] = [
    Checkpoint { progress: 10, message: "正在解析视频链接", duration: Duration::from_millis(2000) },
    Checkpoint { progress: 30, message: "正在下载视频", duration: Duration::from_millis(3000) },
    Checkpoint { progress: 50, message: "正在识别水印区域", duration: Duration::from_millis(3000) },
    Checkpoint { progress: 70, message: "正在去除水印", duration: Duration::from_millis(4000) },
    Checkpoint { progress: 90, message: "正在合成视频", duration: Duration::from_millis(2000) },
    Checkpoint { progress: 100, message: "视频处理完成", duration: Duration::from_millis(1000) },
];

pub const FAILURE_INJECTIONS: [FailureInjection; 4] = [
    FailureInjection { checkpoint: 1, message: "视频下载失败，请检查链接是否有效" },
    FailureInjection { checkpoint: 2, message: "水印区域识别失败" },
    FailureInjection { checkpoint: 3, message: "水印去除失败，视频格式不受支持" },
    FailureInjection { checkpoint: 4, message: "视频合成失败，请稍后重试" },
];

/// Error codes for simulated failures are `500 + checkpoint index`.
pub const FAILURE_CODE_BASE: u16 = 500;

/// Index of the completion checkpoint.
pub const fn last_checkpoint() -> usize {
    CHECKPOINTS.len() - 1
}

/// Failure message for `checkpoint`, if that checkpoint can fail.
pub fn failure_message(checkpoint: usize) -> Option<&'static str> {
    FAILURE_INJECTIONS
        .iter()
        .find(|f| f.checkpoint == checkpoint)
        .map(|f| f.message)
}

pub fn failure_code(checkpoint: usize) -> u16 {
    FAILURE_CODE_BASE + checkpoint as u16
}

/// Offset from submission at which `checkpoint` is reached.
pub fn checkpoint_offset(checkpoint: usize) -> Duration {
    CHECKPOINTS[..checkpoint]
        .iter()
        .fold(INITIAL_DELAY, |acc, c| acc + c.duration)
}

/// Nominal time for a successful run to reach its terminal observation.
pub fn total_duration() -> Duration {
    checkpoint_offset(last_checkpoint())
}
