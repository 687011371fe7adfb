//! Row-major cursor over a rectangular chunk range.

use std::iter::FusedIterator;

use pregen_common::{ChunkBounds, ChunkCoord};

use crate::state::JobState;

/// Walks every chunk of a [`ChunkBounds`] once, Z fastest, then X.
///
/// The walker is nothing but the cursor, so saving `cursor()` and rebuilding
/// with [`GridWalker::at`] replays exactly the chunks not yet yielded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridWalker {
    bounds: ChunkBounds,
    cur_x: i32,
    cur_z: i32,
}

impl GridWalker {
    /// Walker positioned on the first chunk of `bounds`.
    #[must_use]
    pub const fn new(bounds: ChunkBounds) -> Self {
        Self {
            bounds,
            cur_x: bounds.min_x,
            cur_z: bounds.min_z,
        }
    }

    /// Walker resuming at `cursor`.
    #[must_use]
    pub const fn at(bounds: ChunkBounds, cursor: ChunkCoord) -> Self {
        Self {
            bounds,
            cur_x: cursor.x,
            cur_z: cursor.z,
        }
    }

    /// Walker resuming at the cursor stored in a job record.
    #[must_use]
    pub const fn from_state(state: &JobState) -> Self {
        Self::at(state.bounds(), state.cursor())
    }

    /// The bounds being walked.
    #[must_use]
    pub const fn bounds(&self) -> ChunkBounds {
        self.bounds
    }

    /// The next chunk to yield (may sit one past the last row until
    /// normalized).
    #[must_use]
    pub const fn cursor(&self) -> ChunkCoord {
        ChunkCoord::new(self.cur_x, self.cur_z)
    }

    /// Moves a cursor that ran off the bottom of a column to the top of the
    /// next one. A range with no rows is finished at once.
    pub fn normalize(&mut self) {
        if self.cur_x > self.bounds.max_x {
            return;
        }
        if self.bounds.height() == 0 {
            self.cur_x = self.bounds.max_x.saturating_add(1);
            self.cur_z = self.bounds.min_z;
            return;
        }
        if self.cur_z > self.bounds.max_z {
            self.cur_z = self.bounds.min_z;
            self.cur_x = self.cur_x.saturating_add(1);
        }
    }

    /// Whether every chunk has been yielded.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        let mut probe = *self;
        probe.normalize();
        probe.cur_x > probe.bounds.max_x
    }

    /// Number of chunks before the cursor in walk order.
    #[must_use]
    pub fn linear_index(&self) -> u64 {
        let mut probe = *self;
        probe.normalize();
        if probe.cur_x > probe.bounds.max_x {
            return self.bounds.chunk_count();
        }
        let column = (i64::from(probe.cur_x) - i64::from(self.bounds.min_x)) as u64;
        let row = (i64::from(probe.cur_z) - i64::from(self.bounds.min_z)) as u64;
        column * self.bounds.height() + row
    }

    /// Chunks left to yield.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.bounds.chunk_count() - self.linear_index()
    }

    /// Cursor sitting `index` chunks into the walk of `bounds`.
    ///
    /// `index == chunk_count` gives the finished cursor.
    #[must_use]
    pub fn cursor_at(bounds: ChunkBounds, index: u64) -> ChunkCoord {
        let height = bounds.height();
        if height == 0 || index >= bounds.chunk_count() {
            return ChunkCoord::new(bounds.max_x.saturating_add(1), bounds.min_z);
        }
        let x = i64::from(bounds.min_x) + (index / height) as i64;
        let z = i64::from(bounds.min_z) + (index % height) as i64;
        ChunkCoord::new(x as i32, z as i32)
    }
}

impl Iterator for GridWalker {
    type Item = ChunkCoord;

    fn next(&mut self) -> Option<ChunkCoord> {
        self.normalize();
        if self.cur_x > self.bounds.max_x {
            return None;
        }
        let cell = self.cursor();
        self.cur_z += 1;
        Some(cell)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.remaining()).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

impl FusedIterator for GridWalker {}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_row_major_order() {
        let cells: Vec<_> = GridWalker::new(ChunkBounds::new(0, 1, 5, 7)).collect();
        let expected: Vec<_> = [(0, 5), (0, 6), (0, 7), (1, 5), (1, 6), (1, 7)]
            .into_iter()
            .map(|(x, z)| ChunkCoord::new(x, z))
            .collect();
        assert_eq!(cells, expected);
    }

    #[test]
    fn test_resume_from_unnormalized_cursor() {
        let bounds = ChunkBounds::new(0, 1, 0, 1);
        let mut walker = GridWalker::at(bounds, ChunkCoord::new(0, 2));
        assert_eq!(walker.linear_index(), 2);
        assert_eq!(walker.next(), Some(ChunkCoord::new(1, 0)));
        assert_eq!(walker.next(), Some(ChunkCoord::new(1, 1)));
        assert_eq!(walker.next(), None);
        assert_eq!(walker.next(), None);
        assert!(walker.is_exhausted());
        assert_eq!(walker.cursor(), ChunkCoord::new(2, 0));
    }

    #[test]
    fn test_exhausted_after_last_column_normalizes() {
        let bounds = ChunkBounds::new(0, 0, 0, 0);
        let mut walker = GridWalker::new(bounds);
        assert_eq!(walker.next(), Some(ChunkCoord::new(0, 0)));
        assert!(walker.is_exhausted());
        walker.normalize();
        assert_eq!(walker.cursor(), ChunkCoord::new(1, 0));
    }

    #[test]
    fn test_no_rows_is_exhausted() {
        let mut walker = GridWalker::new(ChunkBounds::new(0, 9, 3, 2));
        assert!(walker.is_exhausted());
        assert_eq!(walker.next(), None);
        assert_eq!(walker.cursor(), ChunkCoord::new(10, 3));
    }

    #[test]
    fn test_no_columns_is_exhausted() {
        let mut walker = GridWalker::new(ChunkBounds::new(4, 3, 0, 9));
        assert!(walker.is_exhausted());
        assert_eq!(walker.next(), None);
    }

    #[test]
    fn test_cursor_at_round_trips_linear_index() {
        let bounds = ChunkBounds::new(-3, 2, -1, 3);
        for index in 0..=bounds.chunk_count() {
            let cursor = GridWalker::cursor_at(bounds, index);
            assert_eq!(GridWalker::at(bounds, cursor).linear_index(), index);
        }
    }

    proptest! {
        #[test]
        fn walk_is_strictly_increasing_and_complete(
            min_x in -20i32..20, w in 0i32..9,
            min_z in -20i32..20, h in 0i32..9,
        ) {
            let bounds = ChunkBounds::new(min_x, min_x + w - 1, min_z, min_z + h - 1);
            let cells: Vec<_> = GridWalker::new(bounds).collect();
            prop_assert_eq!(cells.len() as u64, bounds.chunk_count());
            for pair in cells.windows(2) {
                prop_assert!(pair[0] < pair[1]);
            }
            for cell in &cells {
                prop_assert!(bounds.contains(*cell));
            }
        }

        #[test]
        fn split_walk_matches_single_walk(
            w in 1i32..7, h in 1i32..7, cut in 0usize..49,
        ) {
            let bounds = ChunkBounds::new(0, w - 1, 0, h - 1);
            let whole: Vec<_> = GridWalker::new(bounds).collect();
            let cut = cut.min(whole.len());

            let mut first = GridWalker::new(bounds);
            let mut pieces: Vec<_> = first.by_ref().take(cut).collect();
            let resumed = GridWalker::at(bounds, first.cursor());
            pieces.extend(resumed);

            prop_assert_eq!(pieces, whole);
        }
    }
}
