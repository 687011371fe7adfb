//! Block cell data stored inside chunks.

use bytemuck::{Pod, Zeroable};

/// A single column cell of a chunk.
///
/// 6 bytes, no padding, so whole chunks can be cast to bytes for storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct Cell {
    /// Material type ID (0 = air/void)
    pub material: u16,
    /// Cell flags (see CellFlags)
    pub flags: u8,
    /// Biome index the terrain pass assigned
    pub biome: u8,
    /// Surface height above sea level
    pub height: u16,
}

impl Default for Cell {
    fn default() -> Self {
        Self::air()
    }
}

impl Cell {
    /// Creates a new cell with the given material.
    #[must_use]
    pub const fn new(material: u16) -> Self {
        Self {
            material,
            flags: 0,
            biome: 0,
            height: 0,
        }
    }

    /// Creates an air/void cell.
    #[must_use]
    pub const fn air() -> Self {
        Self::new(0)
    }

    /// Checks if this cell is empty (air/void).
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.material == 0
    }

    /// Checks if the populate pass placed a feature here.
    #[must_use]
    pub const fn is_decorated(&self) -> bool {
        self.flags & CellFlags::DECORATED != 0
    }
}

/// Bit flags stored in [`Cell::flags`].
pub struct CellFlags;

impl CellFlags {
    /// Feature placed by the populate pass.
    pub const DECORATED: u8 = 1 << 0;
    /// Cell is underwater.
    pub const SUBMERGED: u8 = 1 << 1;
}

/// Material IDs produced by generation.
pub mod material {
    /// Air/void
    pub const AIR: u16 = 0;
    /// Water
    pub const WATER: u16 = 1;
    /// Sand (beaches)
    pub const SAND: u16 = 2;
    /// Grass
    pub const GRASS: u16 = 3;
    /// Dirt
    pub const DIRT: u16 = 4;
    /// Stone
    pub const STONE: u16 = 5;
    /// Snow (peaks)
    pub const SNOW: u16 = 6;
    /// Tree trunk placed by the populate pass
    pub const TREE: u16 = 7;
    /// Exposed ore placed by the populate pass
    pub const ORE: u16 = 8;
}
