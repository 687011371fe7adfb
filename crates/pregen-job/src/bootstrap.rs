//! Picks a job back up when the host starts.

use pregen_common::DurableFlush;
use tracing::{debug, info, warn};

use crate::checkpoint::CheckpointStore;
use crate::restart::RestartCoordinator;
use crate::state::JobState;

/// What the host should do after boot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resume {
    /// Nothing to resume; wait for a start command
    Idle,
    /// Continue this job after the warm-up delay
    Running(JobState),
}

/// Reads the checkpoint on host start and decides whether a job resumes.
pub struct ResumeBootstrapper<'a, F> {
    store: &'a CheckpointStore,
    coordinator: &'a RestartCoordinator<F>,
}

impl<'a, F: DurableFlush> ResumeBootstrapper<'a, F> {
    /// Bootstrapper reading `store` and finishing interrupted handoffs
    /// through `coordinator`.
    pub fn new(store: &'a CheckpointStore, coordinator: &'a RestartCoordinator<F>) -> Self {
        Self { store, coordinator }
    }

    /// Loads the checkpoint and returns the job to continue, if any.
    ///
    /// A record whose step had already used its budget means the process
    /// died between the step boundary and the rewound save; the handoff is
    /// redone before the job runs again.
    pub fn resume(&self) -> Resume {
        let Some(mut state) = self.store.load() else {
            debug!("No fill job to resume");
            return Resume::Idle;
        };

        if !state.running {
            debug!("Fill job record is not running");
            return Resume::Idle;
        }

        if state.is_complete() {
            info!("Fill job record was already complete, removing it");
            if let Err(e) = self.store.clear() {
                warn!("Failed to remove finished fill job record: {e}");
            }
            return Resume::Idle;
        }

        if state.step_finished() {
            warn!(
                step = state.current_step,
                "Previous run stopped at a step boundary before saving, redoing the handoff"
            );
            self.coordinator.advance_step(&mut state);
        }

        info!(
            "Resuming pre-generation job, starting step {} of {} ({} / {} chunks)",
            state.current_step, state.total_steps, state.done, state.total
        );
        Resume::Running(state)
    }
}
