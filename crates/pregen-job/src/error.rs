//! Error types for the fill job.

use thiserror::Error;

/// Errors raised while persisting or restoring job progress.
#[derive(Debug, Error)]
pub enum JobError {
    /// Checkpoint file could not be read or written
    #[error("Checkpoint I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Checkpoint record could not be encoded
    #[error("Failed to encode checkpoint: {0}")]
    Encode(#[from] toml::ser::Error),

    /// Checkpoint record could not be parsed
    #[error("Failed to parse checkpoint: {0}")]
    Parse(#[from] toml::de::Error),

    /// Checkpoint was written by a newer format
    #[error("Checkpoint format {found} is newer than supported format {supported}")]
    UnsupportedFormat {
        /// Format found in the record
        found: u16,
        /// Newest format this build reads
        supported: u16,
    },

    /// Checkpoint fields break the job invariants
    #[error("Inconsistent checkpoint: {0}")]
    Inconsistent(String),
}

/// Result type for job operations.
pub type JobResult<T> = Result<T, JobError>;

/// Reasons a start command is refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StartError {
    /// Another job holds the single-job lock
    #[error("A pre-generation job is already in progress (step {current_step} of {total_steps})")]
    AlreadyRunning {
        /// Step the active job is on
        current_step: u32,
        /// Steps the active job expects in total
        total_steps: u32,
    },
}
