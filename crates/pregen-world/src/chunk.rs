//! A square column of cells and its on-disk encoding.
//!
//! A stored chunk is a little-endian `u32` length, a bincode header,
//! then the cell array as size-prefixed lz4.

use pregen_common::{ChunkCoord, MagicBytes, SchemaVersion};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cell::Cell;

/// Chunk encoding errors.
#[derive(Debug, Error)]
pub enum ChunkError {
    /// Header could not be encoded
    #[error("Cannot encode chunk header: {0}")]
    Encode(String),
    /// Stored bytes are not a readable chunk
    #[error("Corrupt chunk data: {0}")]
    Corrupt(String),
    /// Stored bytes belong to some other format
    #[error("Invalid chunk format")]
    InvalidFormat,
    /// Written by a newer layout than this build reads
    #[error("Chunk layout {found} is newer than supported {supported}")]
    NewerLayout {
        /// Layout found on disk
        found: String,
        /// Layout this build writes
        supported: String,
    },
    /// File system error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for chunk operations.
pub type ChunkResult<T> = Result<T, ChunkError>;

#[derive(Serialize, Deserialize)]
struct StoredHeader {
    magic: [u8; 4],
    layout: SchemaVersion,
    coord: ChunkCoord,
    size: u32,
    populated: bool,
}

impl StoredHeader {
    fn check(&self) -> ChunkResult<()> {
        if self.magic != MagicBytes::CHUNK.0 {
            return Err(ChunkError::InvalidFormat);
        }
        if !SchemaVersion::CHUNK_HEADER.can_read(&self.layout) {
            return Err(ChunkError::NewerLayout {
                found: self.layout.to_string(),
                supported: SchemaVersion::CHUNK_HEADER.to_string(),
            });
        }
        Ok(())
    }
}

/// A chunk of the world.
///
/// `dirty` tracks whether the in-memory copy differs from disk; `populated`
/// is persisted so the populate pass never runs twice on the same chunk.
#[derive(Debug)]
pub struct Chunk {
    coord: ChunkCoord,
    size: u32,
    cells: Vec<Cell>,
    populated: bool,
    dirty: bool,
}

impl Chunk {
    /// Creates an all-air chunk.
    #[must_use]
    pub fn new(coord: ChunkCoord, size: u32) -> Self {
        Self {
            coord,
            size,
            cells: vec![Cell::default(); (size * size) as usize],
            populated: false,
            dirty: false,
        }
    }

    /// Returns the chunk coordinate.
    #[must_use]
    pub const fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// Width and depth in cells.
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Returns whether the chunk differs from its saved copy.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Flags the chunk for the next save.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Records that the chunk matches disk.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Returns whether the populate pass has run.
    #[must_use]
    pub const fn is_populated(&self) -> bool {
        self.populated
    }

    /// Records that the populate pass has run.
    pub fn mark_populated(&mut self) {
        self.populated = true;
        self.dirty = true;
    }

    fn index(&self, x: u32, z: u32) -> Option<usize> {
        (x < self.size && z < self.size).then(|| (z * self.size + x) as usize)
    }

    /// Gets a cell at local coordinates.
    #[must_use]
    pub fn get_cell(&self, x: u32, z: u32) -> Option<&Cell> {
        self.index(x, z).and_then(|i| self.cells.get(i))
    }

    /// Sets a cell at local coordinates. Returns false when out of range.
    pub fn set_cell(&mut self, x: u32, z: u32, cell: Cell) -> bool {
        let Some(slot) = self.index(x, z).and_then(|i| self.cells.get_mut(i)) else {
            return false;
        };
        *slot = cell;
        self.dirty = true;
        true
    }

    /// All cells, row by row along z.
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Mutable access to all cells; marks the chunk dirty.
    pub fn cells_mut(&mut self) -> &mut [Cell] {
        self.dirty = true;
        &mut self.cells
    }

    /// Encodes the chunk for storage.
    pub fn to_bytes(&self) -> ChunkResult<Vec<u8>> {
        let header = StoredHeader {
            magic: MagicBytes::CHUNK.0,
            layout: SchemaVersion::CHUNK_HEADER,
            coord: self.coord,
            size: self.size,
            populated: self.populated,
        };
        let header = bincode::serialize(&header).map_err(|e| ChunkError::Encode(e.to_string()))?;
        let body = lz4_flex::compress_prepend_size(bytemuck::cast_slice(&self.cells));

        let mut out = Vec::with_capacity(4 + header.len() + body.len());
        out.extend_from_slice(&(header.len() as u32).to_le_bytes());
        out.extend_from_slice(&header);
        out.extend_from_slice(&body);
        Ok(out)
    }

    /// Decodes a stored chunk. The result is clean.
    pub fn from_bytes(bytes: &[u8]) -> ChunkResult<Self> {
        if bytes.len() < 4 {
            return Err(ChunkError::Corrupt("missing header length".into()));
        }
        let (len, rest) = bytes.split_at(4);
        let len = u32::from_le_bytes([len[0], len[1], len[2], len[3]]) as usize;
        if rest.len() < len {
            return Err(ChunkError::Corrupt("truncated header".into()));
        }
        let (header, body) = rest.split_at(len);

        let header: StoredHeader =
            bincode::deserialize(header).map_err(|e| ChunkError::Corrupt(e.to_string()))?;
        header.check()?;

        let raw = lz4_flex::decompress_size_prepended(body)
            .map_err(|e| ChunkError::Corrupt(e.to_string()))?;
        let cell_size = std::mem::size_of::<Cell>();
        if raw.len() != (header.size * header.size) as usize * cell_size {
            return Err(ChunkError::Corrupt("cell count does not match size".into()));
        }

        Ok(Self {
            coord: header.coord,
            size: header.size,
            cells: raw
                .chunks_exact(cell_size)
                .map(bytemuck::pod_read_unaligned)
                .collect(),
            populated: header.populated,
            dirty: false,
        })
    }
}
