//! # Pregen Common
//!
//! Common types, utilities, and shared abstractions for the pregen workspace.
//!
//! This crate provides foundational types used across all pregen crates:
//! - Coordinate types (block, chunk, chunk ranges)
//! - Actor IDs for the border collaborator
//! - Host capability traits consumed by the fill job
//! - Version information for on-disk schemas
//! - Common error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod coords;
pub mod error;
pub mod host;
pub mod ids;
pub mod version;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::coords::*;
    pub use crate::error::*;
    pub use crate::host::*;
    pub use crate::ids::*;
    pub use crate::version::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_chunk_coords_conversion() {
        let world = WorldCoord::new(100, -200);
        let chunk = world.to_chunk_coord(CHUNK_SIZE);
        assert_eq!(chunk, ChunkCoord::new(6, -13));
        assert_eq!(chunk.to_world_coord(CHUNK_SIZE), WorldCoord::new(96, -208));
    }

    #[test]
    fn test_actor_id_generation() {
        let id1 = ActorId::new();
        let id2 = ActorId::new();
        assert_ne!(id1, id2);
        assert_eq!(ActorId::from_raw(7).raw(), 7);
    }

    #[test]
    fn test_version_compatibility() {
        let v1 = SchemaVersion::new(1, 0, 0);
        let v2 = SchemaVersion::new(1, 1, 0);
        let v3 = SchemaVersion::new(2, 0, 0);

        assert!(v2.is_compatible_with(&v1));
        assert!(!v1.is_compatible_with(&v3));
        assert!(SchemaVersion::CHECKPOINT.can_read(&v2));
    }

    proptest! {
        #[test]
        fn chunk_count_matches_width_times_height(
            min_x in -500i32..500, w in 0i32..64,
            min_z in -500i32..500, h in 0i32..64,
            pad in -40i32..40,
        ) {
            let bounds = ChunkBounds::new(min_x, min_x + w - 1, min_z, min_z + h - 1).expanded(pad);
            let mut counted = 0u64;
            for x in bounds.min_x..=bounds.max_x {
                for z in bounds.min_z..=bounds.max_z {
                    prop_assert!(bounds.contains(ChunkCoord::new(x, z)));
                    counted += 1;
                }
            }
            prop_assert_eq!(counted, bounds.chunk_count());
        }
    }
}
