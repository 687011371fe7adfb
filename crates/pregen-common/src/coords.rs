//! Coordinate types for block positions, chunk positions and chunk ranges.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Width of a chunk in blocks along both horizontal axes.
pub const CHUNK_SIZE: u32 = 16;

/// Block position on the horizontal plane (global position).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct WorldCoord {
    /// X coordinate in block space
    pub x: i64,
    /// Z coordinate in block space
    pub z: i64,
}

impl WorldCoord {
    /// Creates a new world coordinate.
    #[must_use]
    pub const fn new(x: i64, z: i64) -> Self {
        Self { x, z }
    }

    /// Converts a fractional position by truncating toward zero, the way
    /// block positions are derived from actor positions.
    #[must_use]
    pub fn from_position(x: f64, z: f64) -> Self {
        Self {
            x: x as i64,
            z: z as i64,
        }
    }

    /// Converts to chunk coordinate given chunk size.
    #[must_use]
    pub const fn to_chunk_coord(self, chunk_size: u32) -> ChunkCoord {
        let size = chunk_size as i64;
        ChunkCoord {
            x: self.x.div_euclid(size) as i32,
            z: self.z.div_euclid(size) as i32,
        }
    }
}

/// Chunk coordinate (identifies a cell of the world grid).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Pod,
    Zeroable,
)]
#[repr(C)]
pub struct ChunkCoord {
    /// X coordinate in chunk space
    pub x: i32,
    /// Z coordinate in chunk space
    pub z: i32,
}

impl ChunkCoord {
    /// Creates a new chunk coordinate.
    #[must_use]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Converts to world coordinate (north-west corner of chunk).
    #[must_use]
    pub const fn to_world_coord(self, chunk_size: u32) -> WorldCoord {
        WorldCoord {
            x: (self.x as i64) * (chunk_size as i64),
            z: (self.z as i64) * (chunk_size as i64),
        }
    }
}

impl std::fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// Inclusive rectangular range of chunks.
///
/// Bounds may be degenerate (`min > max` on either axis), in which case the
/// range holds no chunks at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkBounds {
    /// Lowest chunk X (inclusive)
    pub min_x: i32,
    /// Highest chunk X (inclusive)
    pub max_x: i32,
    /// Lowest chunk Z (inclusive)
    pub min_z: i32,
    /// Highest chunk Z (inclusive)
    pub max_z: i32,
}

impl ChunkBounds {
    /// Creates bounds from inclusive limits.
    #[must_use]
    pub const fn new(min_x: i32, max_x: i32, min_z: i32, max_z: i32) -> Self {
        Self {
            min_x,
            max_x,
            min_z,
            max_z,
        }
    }

    /// Chunk range covering a block rectangle given by two opposite corners.
    ///
    /// Corners are truncated to whole blocks first, then shifted down to
    /// chunk units, so negative positions round toward negative infinity.
    #[must_use]
    pub fn from_block_rect(x1: f64, z1: f64, x2: f64, z2: f64) -> Self {
        let a = WorldCoord::from_position(x1.min(x2), z1.min(z2)).to_chunk_coord(CHUNK_SIZE);
        let b = WorldCoord::from_position(x1.max(x2), z1.max(z2)).to_chunk_coord(CHUNK_SIZE);
        Self::new(a.x, b.x, a.z, b.z)
    }

    /// Grows the range by `pad` chunks on every side (shrinks when negative).
    #[must_use]
    pub const fn expanded(self, pad: i32) -> Self {
        Self {
            min_x: self.min_x.saturating_sub(pad),
            max_x: self.max_x.saturating_add(pad),
            min_z: self.min_z.saturating_sub(pad),
            max_z: self.max_z.saturating_add(pad),
        }
    }

    /// Number of columns (X values), zero when degenerate.
    #[must_use]
    pub fn width(&self) -> u64 {
        span(self.min_x, self.max_x)
    }

    /// Number of chunks in one column (Z values), zero when degenerate.
    #[must_use]
    pub fn height(&self) -> u64 {
        span(self.min_z, self.max_z)
    }

    /// Total number of chunks in the range.
    #[must_use]
    pub fn chunk_count(&self) -> u64 {
        self.width() * self.height()
    }

    /// Whether the range contains no chunks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunk_count() == 0
    }

    /// Checks if a chunk lies inside the range.
    #[must_use]
    pub const fn contains(&self, coord: ChunkCoord) -> bool {
        coord.x >= self.min_x
            && coord.x <= self.max_x
            && coord.z >= self.min_z
            && coord.z <= self.max_z
    }
}

fn span(min: i32, max: i32) -> u64 {
    if max < min {
        0
    } else {
        (i64::from(max) - i64::from(min) + 1) as u64
    }
}
