//! Step boundary handoff: overlap rewind, durable flush, rewound checkpoint,
//! and the restart policy that follows.

use pregen_common::{ChunkCoord, DurableFlush};
use tracing::{error, info, warn};

use crate::checkpoint::CheckpointStore;
use crate::state::JobState;
use crate::walker::GridWalker;

/// How far a step boundary moved the cursor back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rewind {
    /// Normalized cursor before the rewind
    pub from: ChunkCoord,
    /// Cursor the next step starts at
    pub to: ChunkCoord,
    /// Columns stepped back over
    pub columns: u32,
    /// Cells that will be walked again
    pub cells: u64,
}

/// Computes where the next step starts after a boundary.
///
/// The cursor moves back `overlap_columns` whole columns to the top of a
/// column, but never to or before the first cell of the step that just
/// ended: if the full overlap would reach that far, it stops at the first
/// column start inside the step, and if the step never crossed a column
/// start it does not move at all. Each step therefore ends strictly past
/// where the previous one started.
#[must_use]
pub fn overlap_rewind(state: &JobState, overlap_columns: u32) -> Rewind {
    let bounds = state.bounds();
    let walker = GridWalker::from_state(state);
    let index = walker.linear_index();
    let from = GridWalker::cursor_at(bounds, index);
    let height = bounds.height();

    let unchanged = Rewind {
        from,
        to: from,
        columns: 0,
        cells: 0,
    };
    if height == 0 {
        return unchanged;
    }

    let step_start = index.saturating_sub(u64::from(state.this_step));
    let mut target = (index / height).saturating_sub(u64::from(overlap_columns)) * height;
    if target <= step_start {
        target = (step_start / height + 1) * height;
    }
    if target > index {
        return unchanged;
    }

    let to = GridWalker::cursor_at(bounds, target);
    Rewind {
        from,
        to,
        columns: (i64::from(from.x) - i64::from(to.x)).max(0) as u32,
        cells: index - target,
    }
}

/// Applies the step boundary handoff to a job.
pub struct RestartCoordinator<F> {
    flusher: F,
    store: CheckpointStore,
    overlap_columns: u32,
}

impl<F: DurableFlush> RestartCoordinator<F> {
    /// Coordinator flushing through `flusher` and saving to `store`.
    pub fn new(flusher: F, store: CheckpointStore, overlap_columns: u32) -> Self {
        Self {
            flusher,
            store,
            overlap_columns,
        }
    }

    /// The record the rewound state is written to.
    pub fn store(&self) -> &CheckpointStore {
        &self.store
    }

    /// Rewinds the cursor, opens the next step, flushes the world and saves.
    ///
    /// Safe to repeat on a record that still shows the ended step: the
    /// result depends only on the cursor and `this_step`, which are
    /// unchanged until the save lands.
    pub fn advance_step(&self, state: &mut JobState) -> Rewind {
        let rewind = overlap_rewind(state, self.overlap_columns);

        state.cur_x = rewind.to.x;
        state.cur_z = rewind.to.z;
        state.done = state.done.saturating_sub(rewind.cells);
        state.current_step = state.current_step.saturating_add(1);
        state.this_step = 0;

        info!(
            columns = rewind.columns,
            cells = rewind.cells,
            "Rewound from {} to {} for step {} of {}",
            rewind.from,
            rewind.to,
            state.current_step,
            state.total_steps
        );

        match self.flusher.flush_all() {
            Ok(count) => info!("Flushed {count} chunks before restart"),
            Err(e) => error!("World flush failed before restart: {e}"),
        }

        if let Err(e) = self.store.save(state) {
            warn!("Failed to save rewound fill job: {e}");
        }

        rewind
    }
}

/// What a restart policy did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartOutcome {
    /// The process is going away; the next boot resumes from the checkpoint
    Terminating,
    /// Memory was released in place; resume from the checkpoint now
    ResumeInProcess,
}

/// Releases the memory a step accumulated once its checkpoint is durable.
pub trait RestartPolicy {
    /// Performs the restart.
    fn restart(&mut self) -> RestartOutcome;
}

/// Restart policy that runs a reset callback and keeps the process alive.
pub struct ResetInPlace<F> {
    reset: F,
}

impl<F: FnMut()> ResetInPlace<F> {
    /// Policy calling `reset` on every restart.
    pub fn new(reset: F) -> Self {
        Self { reset }
    }
}

impl<F: FnMut()> RestartPolicy for ResetInPlace<F> {
    fn restart(&mut self) -> RestartOutcome {
        (self.reset)();
        RestartOutcome::ResumeInProcess
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::JobParams;
    use pregen_common::{ChunkBounds, WorldError, WorldResult};
    use std::cell::Cell;
    use tempfile::TempDir;

    fn at_boundary(bounds: ChunkBounds, step: u32, index: u64) -> JobState {
        let mut state = JobState::new(bounds, JobParams::new(1, 0, step));
        let cursor = GridWalker::cursor_at(bounds, index);
        state.cur_x = cursor.x;
        state.cur_z = cursor.z;
        state.done = index;
        state.this_step = step;
        state
    }

    #[test]
    fn test_full_overlap() {
        // 40 columns of 4, step ended at column 30 after 60 cells
        let bounds = ChunkBounds::new(0, 39, 0, 3);
        let state = at_boundary(bounds, 60, 120);
        let rewind = overlap_rewind(&state, 10);

        assert_eq!(rewind.from, ChunkCoord::new(30, 0));
        assert_eq!(rewind.to, ChunkCoord::new(20, 0));
        assert_eq!(rewind.columns, 10);
        assert_eq!(rewind.cells, 40);
    }

    #[test]
    fn test_mid_column_rewinds_to_column_start() {
        let bounds = ChunkBounds::new(0, 39, 0, 3);
        let state = at_boundary(bounds, 60, 122);
        let rewind = overlap_rewind(&state, 10);

        assert_eq!(rewind.from, ChunkCoord::new(30, 2));
        assert_eq!(rewind.to, ChunkCoord::new(20, 0));
        assert_eq!(rewind.cells, 42);
    }

    #[test]
    fn test_overlap_limited_to_current_step() {
        // step of 8 cells, two columns; overlap would reach back before it
        let bounds = ChunkBounds::new(0, 39, 0, 3);
        let state = at_boundary(bounds, 8, 20);
        let rewind = overlap_rewind(&state, 10);

        assert_eq!(rewind.to, ChunkCoord::new(4, 0));
        assert_eq!(rewind.cells, 4);
    }

    #[test]
    fn test_no_column_start_inside_step() {
        let bounds = ChunkBounds::new(0, 9, 0, 99);
        let state = at_boundary(bounds, 10, 150);
        let rewind = overlap_rewind(&state, 10);

        assert_eq!(rewind.to, rewind.from);
        assert_eq!(rewind.cells, 0);
    }

    #[test]
    fn test_first_column_clamped() {
        let bounds = ChunkBounds::new(0, 1, 0, 1);
        let state = at_boundary(bounds, 2, 2);
        let rewind = overlap_rewind(&state, 10);

        // the only column start after the step's first cell is the cursor itself
        assert_eq!(rewind.from, ChunkCoord::new(1, 0));
        assert_eq!(rewind.to, ChunkCoord::new(1, 0));
    }

    #[test]
    fn test_unnormalized_cursor() {
        let bounds = ChunkBounds::new(-5, 5, -2, 1);
        let mut state = at_boundary(bounds, 16, 16);
        state.cur_x = -2;
        state.cur_z = 2;
        let rewind = overlap_rewind(&state, 2);

        assert_eq!(rewind.from, ChunkCoord::new(-1, -2));
        assert_eq!(rewind.to, ChunkCoord::new(-3, -2));
        assert_eq!(rewind.cells, 8);
    }

    struct Flusher {
        calls: Cell<u32>,
        fail: bool,
    }

    impl DurableFlush for Flusher {
        fn flush_all(&self) -> WorldResult<usize> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                Err(WorldError::SaveFailed("disk full".into()))
            } else {
                Ok(3)
            }
        }
    }

    #[test]
    fn test_advance_step_flushes_then_saves() {
        let dir = TempDir::new().expect("temp dir");
        let store = CheckpointStore::in_dir(dir.path(), "fill_job.toml");
        let flusher = Flusher {
            calls: Cell::new(0),
            fail: false,
        };
        let coordinator = RestartCoordinator::new(&flusher, store.clone(), 10);

        let bounds = ChunkBounds::new(0, 39, 0, 3);
        let mut state = at_boundary(bounds, 60, 120);
        coordinator.advance_step(&mut state);

        assert_eq!(flusher.calls.get(), 1);
        assert_eq!(state.cursor(), ChunkCoord::new(20, 0));
        assert_eq!(state.done, 80);
        assert_eq!(state.current_step, 2);
        assert_eq!(state.this_step, 0);
        assert_eq!(store.load(), Some(state));
    }

    #[test]
    fn test_advance_step_is_repeatable_from_the_old_record() {
        let dir = TempDir::new().expect("temp dir");
        let store = CheckpointStore::in_dir(dir.path(), "fill_job.toml");
        let flusher = Flusher {
            calls: Cell::new(0),
            fail: false,
        };
        let coordinator = RestartCoordinator::new(&flusher, store, 10);

        let bounds = ChunkBounds::new(0, 39, 0, 3);
        let boundary = at_boundary(bounds, 60, 120);
        let mut first = boundary.clone();
        let mut second = boundary;
        coordinator.advance_step(&mut first);
        coordinator.advance_step(&mut second);
        assert_eq!(first, second);
    }

    #[test]
    fn test_flush_failure_still_saves() {
        let dir = TempDir::new().expect("temp dir");
        let store = CheckpointStore::in_dir(dir.path(), "fill_job.toml");
        let flusher = Flusher {
            calls: Cell::new(0),
            fail: true,
        };
        let coordinator = RestartCoordinator::new(&flusher, store.clone(), 10);

        let mut state = at_boundary(ChunkBounds::new(0, 39, 0, 3), 60, 120);
        coordinator.advance_step(&mut state);
        assert_eq!(store.load().map(|s| s.current_step), Some(2));
    }

    #[test]
    fn test_unwritable_checkpoint_still_advances() {
        let dir = TempDir::new().expect("temp dir");
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"file").expect("write blocker");
        let store = CheckpointStore::in_dir(&blocker, "fill_job.toml");
        let flusher = Flusher {
            calls: Cell::new(0),
            fail: false,
        };
        let coordinator = RestartCoordinator::new(&flusher, store.clone(), 10);

        let mut state = at_boundary(ChunkBounds::new(0, 39, 0, 3), 60, 120);
        let rewind = coordinator.advance_step(&mut state);

        assert_eq!(rewind.to, ChunkCoord::new(20, 0));
        assert_eq!(state.cursor(), ChunkCoord::new(20, 0));
        assert_eq!(state.current_step, 2);
        assert_eq!(flusher.calls.get(), 1);
        assert!(!store.exists());
    }

    #[test]
    fn test_reset_in_place() {
        let mut resets = 0;
        let mut policy = ResetInPlace::new(|| resets += 1);
        assert_eq!(policy.restart(), RestartOutcome::ResumeInProcess);
        assert_eq!(policy.restart(), RestartOutcome::ResumeInProcess);
        drop(policy);
        assert_eq!(resets, 2);
    }
}
