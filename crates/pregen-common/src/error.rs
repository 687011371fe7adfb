//! Error types shared across the pregen crates.

use thiserror::Error;

/// Top-level error type for pregen operations.
#[derive(Debug, Error)]
pub enum PregenError {
    /// World/chunk errors
    #[error("World error: {0}")]
    World(#[from] WorldError),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Schema version mismatch
    #[error("Schema version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        /// Expected version
        expected: String,
        /// Actual version found
        actual: String,
    },
}

/// World and chunk errors reported by host capabilities.
#[derive(Debug, Error)]
pub enum WorldError {
    /// Chunk not found
    #[error("Chunk not found at ({x}, {z})")]
    ChunkNotFound {
        /// X coordinate
        x: i32,
        /// Z coordinate
        z: i32,
    },

    /// Chunk load failed
    #[error("Failed to load chunk: {0}")]
    LoadFailed(String),

    /// Chunk save failed
    #[error("Failed to save chunk: {0}")]
    SaveFailed(String),

    /// Populate pass failed
    #[error("Failed to populate chunk ({x}, {z}): {reason}")]
    PopulateFailed {
        /// X coordinate
        x: i32,
        /// Z coordinate
        z: i32,
        /// What went wrong
        reason: String,
    },

    /// Invalid chunk data
    #[error("Invalid chunk data: {0}")]
    InvalidData(String),
}

/// Result type alias for pregen operations.
pub type PregenResult<T> = Result<T, PregenError>;

/// Result type alias for host world operations.
pub type WorldResult<T> = Result<T, WorldError>;
