//! The persisted progress record of a fill job.

use pregen_common::{ChunkBounds, ChunkCoord, SchemaVersion};
use serde::{Deserialize, Serialize};

use crate::error::{JobError, JobResult};
use crate::walker::GridWalker;

/// Checkpoint layout written by this build.
pub const CHECKPOINT_FORMAT: u16 = SchemaVersion::CHECKPOINT.major;

/// Parameters an operator chooses when starting a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobParams {
    /// Max cells per tick
    pub freq: u32,
    /// Chunks added around the border rectangle on every side
    pub pad: i32,
    /// Max cells per step
    pub step: u32,
}

impl JobParams {
    /// Creates parameters, clamping `freq >= 1` and `step >= freq`.
    #[must_use]
    pub fn new(freq: u32, pad: i32, step: u32) -> Self {
        let freq = freq.max(1);
        Self {
            freq,
            pad,
            step: step.max(freq),
        }
    }
}

/// Progress of a fill job.
///
/// The cursor `(cur_x, cur_z)` is the only thing coverage depends on; `done`
/// feeds progress reports and is rewound together with the cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobState {
    /// Checkpoint layout version (0 for records without one)
    #[serde(default)]
    pub format: u16,
    /// Job is active
    #[serde(default)]
    pub running: bool,
    /// Max cells per tick
    pub freq: u32,
    /// Padding the bounds were expanded by
    #[serde(default)]
    pub pad: i32,
    /// Max cells per step
    pub step: u32,
    /// Lowest chunk X (inclusive)
    pub cmin_x: i32,
    /// Highest chunk X (inclusive)
    pub cmax_x: i32,
    /// Lowest chunk Z (inclusive)
    pub cmin_z: i32,
    /// Highest chunk Z (inclusive)
    pub cmax_z: i32,
    /// Cells in the bounds
    pub total: u64,
    /// `ceil(total / step)`, at least 1
    pub total_steps: u32,
    /// Column of the next cell
    pub cur_x: i32,
    /// Row of the next cell
    pub cur_z: i32,
    /// Cells processed so far
    pub done: u64,
    /// 1-based step in progress
    pub current_step: u32,
    /// Cells processed in the current step
    #[serde(default)]
    pub this_step: u32,
}

impl JobState {
    /// Creates a fresh job over `bounds` with the cursor on the first cell.
    #[must_use]
    pub fn new(bounds: ChunkBounds, params: JobParams) -> Self {
        let params = JobParams::new(params.freq, params.pad, params.step);
        let total = bounds.chunk_count();
        let total_steps = total.div_ceil(u64::from(params.step)).max(1);

        Self {
            format: CHECKPOINT_FORMAT,
            running: true,
            freq: params.freq,
            pad: params.pad,
            step: params.step,
            cmin_x: bounds.min_x,
            cmax_x: bounds.max_x,
            cmin_z: bounds.min_z,
            cmax_z: bounds.max_z,
            total,
            total_steps: u32::try_from(total_steps).unwrap_or(u32::MAX),
            cur_x: bounds.min_x,
            cur_z: bounds.min_z,
            done: 0,
            current_step: 1,
            this_step: 0,
        }
    }

    /// The grid this job walks.
    #[must_use]
    pub const fn bounds(&self) -> ChunkBounds {
        ChunkBounds::new(self.cmin_x, self.cmax_x, self.cmin_z, self.cmax_z)
    }

    /// The next cell to process, as stored.
    #[must_use]
    pub const fn cursor(&self) -> ChunkCoord {
        ChunkCoord::new(self.cur_x, self.cur_z)
    }

    /// Whether the cursor has passed the last column.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        GridWalker::from_state(self).is_exhausted()
    }

    /// Whether the current step has used up its cell budget.
    #[must_use]
    pub const fn step_finished(&self) -> bool {
        self.this_step >= self.step
    }

    /// Percentage of `total` done, held below 100 until the cursor finishes.
    #[must_use]
    pub fn progress_percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        let percent = self.done as f64 / self.total as f64 * 100.0;
        if percent >= 100.0 && !self.is_complete() {
            99.99
        } else {
            percent
        }
    }

    /// Checks the invariants a record must satisfy before it can drive a walk.
    pub fn validate(&self) -> JobResult<()> {
        let inconsistent = |msg: String| Err(JobError::Inconsistent(msg));

        if self.freq == 0 || self.step == 0 {
            return inconsistent(format!("freq={} step={}", self.freq, self.step));
        }
        if self.current_step == 0 {
            return inconsistent("currentStep must be 1-based".into());
        }
        if self.this_step > self.step {
            return inconsistent(format!(
                "thisStep={} exceeds step={}",
                self.this_step, self.step
            ));
        }
        if self.cur_x < self.cmin_x {
            return inconsistent(format!("curX={} below cminX={}", self.cur_x, self.cmin_x));
        }
        if self.cur_x <= self.cmax_x
            && (self.cur_z < self.cmin_z || self.cur_z > self.cmax_z.saturating_add(1))
        {
            return inconsistent(format!(
                "curZ={} outside [{}, {}]",
                self.cur_z,
                self.cmin_z,
                self.cmax_z.saturating_add(1)
            ));
        }
        Ok(())
    }

    /// One-line progress summary for operators.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "step {}/{}: {} / {} chunks ({:.2}%), next chunk ({}, {})",
            self.current_step,
            self.total_steps,
            self.done,
            self.total,
            self.progress_percent(),
            self.cur_x,
            self.cur_z
        )
    }
}
