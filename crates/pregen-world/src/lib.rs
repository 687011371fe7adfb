//! # Pregen World
//!
//! The host world the pre-generation job drives.
//!
//! This crate handles:
//! - Terrain generation and the per-chunk populate pass
//! - Chunk loading/unloading
//! - World-to-disk serialization
//!
//! [`ChunkManager`] implements the [`pregen_common::ChunkPopulator`] and
//! [`pregen_common::DurableFlush`] capabilities.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod cell;
pub mod chunk;
pub mod generation;
pub mod streaming;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::cell::*;
    pub use crate::chunk::*;
    pub use crate::generation::*;
    pub use crate::streaming::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;
    use pregen_common::ChunkCoord;

    #[test]
    fn test_chunk_creation() {
        let coord = ChunkCoord::new(0, 0);
        let chunk = Chunk::new(coord, 16);
        assert_eq!(chunk.coord(), coord);
        assert!(!chunk.is_dirty());
        assert!(!chunk.is_populated());
    }

    #[test]
    fn test_generated_chunk_serialization() {
        let generator = WorldGenerator::with_seed(1);
        let chunk = generator.generate_chunk(ChunkCoord::new(1, 2));
        let bytes = chunk.to_bytes().expect("encode");
        let loaded = Chunk::from_bytes(&bytes).expect("decode");
        assert_eq!(loaded.coord(), ChunkCoord::new(1, 2));
        assert_eq!(loaded.cells(), chunk.cells());
    }
}
