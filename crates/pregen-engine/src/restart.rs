//! Host side of the step restart.

use std::sync::Arc;

use pregen_job::{ResetInPlace, RestartOutcome, RestartPolicy};
use pregen_world::ChunkManager;
use tracing::{info, warn};

use crate::config::RestartMode;

/// Restart policy chosen by `server.restart_mode`.
pub enum HostRestart {
    /// Leave the tick loop and exit; the job resumes on the next start
    Exit,
    /// Drop every loaded chunk and resume from the checkpoint at once
    InProcess(ResetInPlace<Box<dyn FnMut()>>),
}

impl HostRestart {
    /// Policy for `mode`, unloading `world` when restarting in place.
    pub fn new(mode: RestartMode, world: Arc<ChunkManager>) -> Self {
        match mode {
            RestartMode::Exit => Self::Exit,
            RestartMode::InProcess => {
                let reset: Box<dyn FnMut()> = Box::new(move || match world.unload_all() {
                    Ok(saved) => info!("Released all chunks ({saved} written)"),
                    Err(e) => warn!("Failed to write chunks while releasing them: {e}"),
                });
                Self::InProcess(ResetInPlace::new(reset))
            },
        }
    }
}

impl RestartPolicy for HostRestart {
    fn restart(&mut self) -> RestartOutcome {
        match self {
            Self::Exit => {
                info!("Shutting down now to start the next step");
                RestartOutcome::Terminating
            },
            Self::InProcess(reset) => {
                info!("Restarting in place for the next step");
                reset.restart()
            },
        }
    }
}
