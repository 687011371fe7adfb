//! # Pregen Job
//!
//! Resumable chunk pre-generation over a rectangular chunk range.
//!
//! The job walks every chunk of the range once in row-major order, a few
//! chunks per host tick, and checkpoints its cursor after every batch. Work
//! is split into steps; at the end of each step the world is flushed, the
//! cursor is rewound over a few columns, and the host is restarted to give
//! back the memory the step accumulated.
//!
//! - [`GridWalker`]: the row-major cursor
//! - [`StepScheduler`]: one bounded batch per tick
//! - [`RestartCoordinator`]: rewind, flush and save at a step boundary
//! - [`CheckpointStore`]: the durable job record
//! - [`ResumeBootstrapper`]: picks the job back up on host start
//! - [`JobSupervisor`]: the single-job lock and lifecycle

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod bootstrap;
pub mod checkpoint;
pub mod command;
pub mod config;
pub mod error;
pub mod restart;
pub mod scheduler;
pub mod state;
pub mod supervisor;
pub mod walker;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::bootstrap::*;
    pub use crate::checkpoint::*;
    pub use crate::command::*;
    pub use crate::config::*;
    pub use crate::error::*;
    pub use crate::restart::*;
    pub use crate::scheduler::*;
    pub use crate::state::*;
    pub use crate::supervisor::*;
    pub use crate::walker::*;
}

pub use prelude::*;
