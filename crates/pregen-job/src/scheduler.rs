//! Tick-budgeted batches over the job grid.

use pregen_common::ChunkPopulator;
use tracing::{debug, info, warn};

use crate::checkpoint::CheckpointStore;
use crate::state::JobState;
use crate::walker::GridWalker;

/// Where the job stands after a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// More cells remain in this step
    Running,
    /// The step used up its cell budget; hand off to the restart coordinator
    StepBoundary,
    /// Every cell has been visited and the checkpoint is gone
    JobComplete,
}

/// Result of one [`StepScheduler::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// Cells populated during this tick
    pub processed: u32,
    /// State of the job after the batch
    pub outcome: TickOutcome,
}

/// Runs one bounded batch of the job per host tick.
///
/// A batch stops after `freq` cells, at the end of the grid, or when the
/// step budget runs out, whichever comes first. The checkpoint is written
/// once per batch.
pub struct StepScheduler<P> {
    state: JobState,
    populator: P,
    store: CheckpointStore,
    log_frequency: u64,
    log_counter: u64,
}

impl<P: ChunkPopulator> StepScheduler<P> {
    /// Scheduler continuing `state` at its stored cursor.
    pub fn new(state: JobState, populator: P, store: CheckpointStore, log_frequency: u64) -> Self {
        Self {
            state,
            populator,
            store,
            log_frequency: log_frequency.max(1),
            log_counter: 0,
        }
    }

    /// Current progress.
    pub fn state(&self) -> &JobState {
        &self.state
    }

    /// Mutable progress, used by the restart handoff.
    pub fn state_mut(&mut self) -> &mut JobState {
        &mut self.state
    }

    /// Gives back the job state.
    pub fn into_state(self) -> JobState {
        self.state
    }

    /// Processes one batch.
    pub fn tick(&mut self) -> TickReport {
        let mut walker = GridWalker::from_state(&self.state);
        let mut processed = 0u32;

        while processed < self.state.freq && !self.state.step_finished() {
            let Some(cell) = walker.next() else {
                break;
            };

            if let Err(e) = self.populator.populate(cell) {
                warn!("Failed to populate chunk {cell}: {e}");
            }

            self.state.done = self.state.done.saturating_add(1).min(self.state.total);
            self.state.this_step += 1;
            processed += 1;
            self.log_progress();
        }

        walker.normalize();
        let cursor = walker.cursor();
        self.state.cur_x = cursor.x;
        self.state.cur_z = cursor.z;

        let outcome = if walker.is_exhausted() {
            self.finish();
            TickOutcome::JobComplete
        } else {
            if let Err(e) = self.store.save(&self.state) {
                warn!("Failed to save fill job progress: {e}");
            }
            if self.state.step_finished() {
                info!(
                    step = self.state.current_step,
                    total_steps = self.state.total_steps,
                    "Step finished, {} of {} chunks done",
                    self.state.done,
                    self.state.total
                );
                TickOutcome::StepBoundary
            } else {
                TickOutcome::Running
            }
        };

        TickReport { processed, outcome }
    }

    fn log_progress(&mut self) {
        self.log_counter += 1;
        if self.log_counter < self.log_frequency {
            return;
        }
        self.log_counter = 0;
        info!(
            done = self.state.done,
            total = self.state.total,
            step = self.state.current_step,
            "Pre-generation progress: {:.2}%",
            self.state.progress_percent()
        );
    }

    fn finish(&mut self) {
        self.state.running = false;
        self.state.this_step = 0;
        match self.store.clear() {
            Ok(()) => debug!("Fill job record removed"),
            Err(e) => warn!("Failed to remove fill job record: {e}"),
        }
        info!(total = self.state.total, "Pre-generation complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::JobParams;
    use pregen_common::{ChunkBounds, ChunkCoord, WorldError, WorldResult};
    use std::cell::RefCell;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Recorder {
        visited: RefCell<Vec<ChunkCoord>>,
        fail_on: Option<ChunkCoord>,
    }

    impl ChunkPopulator for Recorder {
        fn populate(&self, coord: ChunkCoord) -> WorldResult<()> {
            self.visited.borrow_mut().push(coord);
            if self.fail_on == Some(coord) {
                return Err(WorldError::PopulateFailed {
                    x: coord.x,
                    z: coord.z,
                    reason: "test".into(),
                });
            }
            Ok(())
        }
    }

    fn scheduler<'a>(
        dir: &TempDir,
        bounds: ChunkBounds,
        params: JobParams,
        recorder: &'a Recorder,
    ) -> (StepScheduler<&'a Recorder>, CheckpointStore) {
        let store = CheckpointStore::in_dir(dir.path(), "fill_job.toml");
        let state = JobState::new(bounds, params);
        (StepScheduler::new(state, recorder, store.clone(), 1000), store)
    }

    #[test]
    fn test_batch_limited_by_freq() {
        let dir = TempDir::new().expect("temp dir");
        let recorder = Recorder::default();
        let (mut scheduler, store) =
            scheduler(&dir, ChunkBounds::new(0, 3, 0, 3), JobParams::new(3, 0, 100), &recorder);

        let report = scheduler.tick();
        assert_eq!(report.processed, 3);
        assert_eq!(report.outcome, TickOutcome::Running);
        assert_eq!(
            *recorder.visited.borrow(),
            vec![ChunkCoord::new(0, 0), ChunkCoord::new(0, 1), ChunkCoord::new(0, 2)]
        );

        let saved = store.load().expect("progress saved after the batch");
        assert_eq!(saved.cursor(), ChunkCoord::new(0, 3));
        assert_eq!(saved.done, 3);
        assert_eq!(saved.this_step, 3);
    }

    #[test]
    fn test_batch_stops_at_step_budget() {
        let dir = TempDir::new().expect("temp dir");
        let recorder = Recorder::default();
        let (mut scheduler, _) =
            scheduler(&dir, ChunkBounds::new(0, 3, 0, 3), JobParams::new(4, 0, 6), &recorder);

        assert_eq!(scheduler.tick().outcome, TickOutcome::Running);
        let report = scheduler.tick();
        assert_eq!(report.processed, 2);
        assert_eq!(report.outcome, TickOutcome::StepBoundary);
        // cursor normalized onto the next column
        assert_eq!(scheduler.state().cursor(), ChunkCoord::new(1, 2));
    }

    #[test]
    fn test_completion_wins_over_step_boundary() {
        let dir = TempDir::new().expect("temp dir");
        let recorder = Recorder::default();
        let (mut scheduler, store) =
            scheduler(&dir, ChunkBounds::new(0, 1, 0, 1), JobParams::new(4, 0, 4), &recorder);
        store.save(scheduler.state()).expect("save");

        let report = scheduler.tick();
        assert_eq!(report.processed, 4);
        assert_eq!(report.outcome, TickOutcome::JobComplete);
        assert!(!scheduler.state().running);
        assert_eq!(scheduler.state().cursor(), ChunkCoord::new(2, 0));
        assert!(!store.exists());
    }

    #[test]
    fn test_empty_grid_completes_without_populating() {
        let dir = TempDir::new().expect("temp dir");
        let recorder = Recorder::default();
        let (mut scheduler, _) = scheduler(
            &dir,
            ChunkBounds::new(0, 1, 0, 1).expanded(-1),
            JobParams::new(5, -1, 10),
            &recorder,
        );

        let report = scheduler.tick();
        assert_eq!(report.processed, 0);
        assert_eq!(report.outcome, TickOutcome::JobComplete);
        assert!(recorder.visited.borrow().is_empty());
    }

    #[test]
    fn test_populate_failure_still_advances() {
        let dir = TempDir::new().expect("temp dir");
        let recorder = Recorder {
            fail_on: Some(ChunkCoord::new(0, 1)),
            ..Recorder::default()
        };
        let (mut scheduler, _) =
            scheduler(&dir, ChunkBounds::new(0, 0, 0, 2), JobParams::new(5, 0, 5), &recorder);

        assert_eq!(scheduler.tick().outcome, TickOutcome::JobComplete);
        assert_eq!(recorder.visited.borrow().len(), 3);
        assert_eq!(scheduler.state().done, 3);
    }

    #[test]
    fn test_unwritable_checkpoint_keeps_job_going() {
        let dir = TempDir::new().expect("temp dir");
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"file").expect("write blocker");
        let store = CheckpointStore::in_dir(&blocker, "fill_job.toml");
        let recorder = Recorder::default();
        let state = JobState::new(ChunkBounds::new(0, 1, 0, 2), JobParams::new(2, 0, 4));
        let mut scheduler = StepScheduler::new(state, &recorder, store.clone(), 1000);

        let report = scheduler.tick();
        assert_eq!(report.outcome, TickOutcome::Running);
        assert_eq!(scheduler.state().cursor(), ChunkCoord::new(0, 2));

        let report = scheduler.tick();
        assert_eq!(report.outcome, TickOutcome::StepBoundary);
        assert_eq!(scheduler.state().cursor(), ChunkCoord::new(1, 1));
        assert_eq!(scheduler.state().done, 4);
        assert!(!store.exists());

        // next step, as the handoff would open it
        scheduler.state_mut().this_step = 0;
        let report = scheduler.tick();
        assert_eq!(report.processed, 2);
        assert_eq!(report.outcome, TickOutcome::JobComplete);
        assert_eq!(recorder.visited.borrow().len(), 6);
    }

    #[test]
    fn test_done_saturates_at_total() {
        let dir = TempDir::new().expect("temp dir");
        let recorder = Recorder::default();
        let store = CheckpointStore::in_dir(dir.path(), "fill_job.toml");
        let mut state = JobState::new(ChunkBounds::new(0, 1, 0, 1), JobParams::new(1, 0, 10));
        // a rewound record whose counter was not rewound with it
        state.cur_x = 1;
        state.done = 4;
        let mut scheduler = StepScheduler::new(state, &recorder, store, 1000);

        scheduler.tick();
        assert_eq!(scheduler.state().done, 4);
        assert!((scheduler.state().progress_percent() - 99.99).abs() < 1e-9);
    }
}
