//! The `fill [freq] [pad] [step]` start command.

use std::fmt;

use pregen_common::ChunkBounds;

use crate::config::JobConfig;
use crate::state::{JobParams, JobState};

/// Parsed start command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillCommand {
    /// Job parameters after defaults and clamping
    pub params: JobParams,
}

impl FillCommand {
    /// Parses up to three positional integers `freq pad step`.
    ///
    /// A missing or unparseable value keeps the configured default for that
    /// position. `freq` is raised to at least 1 and `step` to at least
    /// `freq`.
    pub fn parse<S: AsRef<str>>(args: &[S], config: &JobConfig) -> Self {
        let arg = |i: usize| args.get(i).map(|a| a.as_ref().trim());

        let freq = arg(0)
            .and_then(|a| a.parse::<i64>().ok())
            .map_or(config.default_freq, |v| v.clamp(1, i64::from(u32::MAX)) as u32);
        let pad = arg(1)
            .and_then(|a| a.parse::<i32>().ok())
            .unwrap_or(config.default_pad);
        let step = arg(2)
            .and_then(|a| a.parse::<i64>().ok())
            .map_or(config.default_step, |v| v.clamp(0, i64::from(u32::MAX)) as u32);

        Self {
            params: JobParams::new(freq, pad, step),
        }
    }

    /// Chunk range the job covers: the border range grown by `pad`.
    #[must_use]
    pub const fn bounds(&self, border: ChunkBounds) -> ChunkBounds {
        border.expanded(self.params.pad)
    }

    /// Fresh job state for this command over `border`.
    #[must_use]
    pub fn into_state(self, border: ChunkBounds) -> JobState {
        JobState::new(self.bounds(border), self.params)
    }
}

/// Confirmation returned when a job starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartAck {
    /// Chunks to visit
    pub total: u64,
    /// Steps the job is split into
    pub total_steps: u32,
    /// Chunks per step
    pub step: u32,
    /// Chunks per tick
    pub freq: u32,
    /// Chunk range
    pub bounds: ChunkBounds,
}

impl StartAck {
    /// Acknowledgment for a freshly created job.
    pub fn for_state(state: &JobState) -> Self {
        Self {
            total: state.total,
            total_steps: state.total_steps,
            step: state.step,
            freq: state.freq,
            bounds: state.bounds(),
        }
    }
}

impl fmt::Display for StartAck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Starting pre-generation: {} chunks in {} steps of {} chunks ({} per tick), chunks x {}..{} z {}..{}",
            self.total,
            self.total_steps,
            self.step,
            self.freq,
            self.bounds.min_x,
            self.bounds.max_x,
            self.bounds.min_z,
            self.bounds.max_z
        )
    }
}
