//! World streaming and chunk management.

use dashmap::DashMap;
use parking_lot::RwLock;
use pregen_common::{
    ChunkCoord, ChunkPopulator, DurableFlush, WorldError, WorldResult, CHUNK_SIZE,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::chunk::{Chunk, ChunkResult};
use crate::generation::WorldGenerator;

/// Chunk manager configuration.
#[derive(Debug, Clone)]
pub struct StreamingConfig {
    /// World save directory
    pub save_dir: PathBuf,
    /// Maximum loaded chunks
    pub max_loaded_chunks: usize,
    /// Chunk size
    pub chunk_size: u32,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            save_dir: PathBuf::from("saves/world"),
            max_loaded_chunks: 1024,
            chunk_size: CHUNK_SIZE,
        }
    }
}

/// Manages chunk loading, unloading, and persistence.
///
/// Every method takes `&self`, so one manager can be shared between the
/// fill job and the border collaborator behind an `Arc`.
pub struct ChunkManager {
    /// Configuration
    config: StreamingConfig,
    /// Loaded chunks
    chunks: DashMap<ChunkCoord, Arc<RwLock<Chunk>>>,
    /// World generator
    generator: WorldGenerator,
}

impl ChunkManager {
    /// Creates a new chunk manager.
    #[must_use]
    pub fn new(config: StreamingConfig, generator: WorldGenerator) -> Self {
        Self {
            config,
            chunks: DashMap::new(),
            generator,
        }
    }

    /// Gets or loads a chunk at the given coordinate, generating it when it
    /// has never been saved.
    pub fn get_chunk(&self, coord: ChunkCoord) -> Arc<RwLock<Chunk>> {
        if let Some(chunk) = self.chunks.get(&coord) {
            return Arc::clone(chunk.value());
        }

        let chunk = match self.load_from_disk(coord) {
            Ok(c) => c,
            Err(e) => {
                if self.chunk_path(coord).exists() {
                    warn!("Regenerating unreadable chunk {coord}: {e}");
                }
                let mut generated = self.generator.generate_chunk(coord);
                generated.mark_dirty();
                generated
            },
        };

        let chunk_arc = Arc::new(RwLock::new(chunk));
        self.chunks.insert(coord, Arc::clone(&chunk_arc));
        chunk_arc
    }

    /// Checks if a chunk is loaded.
    #[must_use]
    pub fn is_loaded(&self, coord: ChunkCoord) -> bool {
        self.chunks.contains_key(&coord)
    }

    /// Checks if a chunk exists on disk.
    #[must_use]
    pub fn is_saved(&self, coord: ChunkCoord) -> bool {
        self.chunk_path(coord).exists()
    }

    /// Returns the number of loaded chunks.
    #[must_use]
    pub fn loaded_count(&self) -> usize {
        self.chunks.len()
    }

    /// Saves all dirty chunks to disk.
    ///
    /// Every chunk is attempted; the first failure is reported after the
    /// rest have been written.
    pub fn save_all(&self) -> WorldResult<usize> {
        let mut saved = 0;
        let mut first_error = None;
        for entry in &self.chunks {
            let mut chunk = entry.value().write();
            if !chunk.is_dirty() {
                continue;
            }
            match self.save_to_disk(&chunk) {
                Ok(()) => {
                    chunk.mark_clean();
                    saved += 1;
                },
                Err(e) => {
                    warn!("Failed to save chunk {}: {e}", chunk.coord());
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                },
            }
        }
        info!("Saved {saved} chunks");
        match first_error {
            Some(e) => Err(WorldError::SaveFailed(e.to_string())),
            None => Ok(saved),
        }
    }

    /// Saves everything and drops all loaded chunks, releasing their memory.
    pub fn unload_all(&self) -> WorldResult<usize> {
        let saved = self.save_all()?;
        self.chunks.clear();
        debug!("Unloaded all chunks");
        Ok(saved)
    }

    /// Loads a chunk from disk.
    fn load_from_disk(&self, coord: ChunkCoord) -> ChunkResult<Chunk> {
        let bytes = std::fs::read(self.chunk_path(coord))?;
        Chunk::from_bytes(&bytes)
    }

    /// Saves a chunk to disk.
    fn save_to_disk(&self, chunk: &Chunk) -> ChunkResult<()> {
        let path = self.chunk_path(chunk.coord());
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let bytes = chunk.to_bytes()?;
        std::fs::write(&path, bytes)?;
        Ok(())
    }

    /// Returns the file path for a chunk.
    fn chunk_path(&self, coord: ChunkCoord) -> PathBuf {
        self.config
            .save_dir
            .join(format!("chunk_{}_{}.pgch", coord.x, coord.z))
    }

    /// Unloads chunks if over the limit.
    ///
    /// A dirty chunk is only dropped once it is on disk. One that fails to
    /// save stays loaded and dirty so the next `save_all` retries it.
    fn maybe_unload_chunks(&self) {
        if self.chunks.len() <= self.config.max_loaded_chunks {
            return;
        }

        let to_remove = self.chunks.len() - self.config.max_loaded_chunks;
        let coords: Vec<_> = self
            .chunks
            .iter()
            .take(to_remove)
            .map(|e| *e.key())
            .collect();

        for coord in coords {
            let Some(chunk) = self.chunks.get(&coord).map(|e| Arc::clone(e.value())) else {
                continue;
            };
            {
                let mut c = chunk.write();
                if c.is_dirty() {
                    if let Err(e) = self.save_to_disk(&c) {
                        warn!("Keeping chunk {coord} loaded, eviction save failed: {e}");
                        continue;
                    }
                    c.mark_clean();
                }
            }
            self.chunks.remove(&coord);
        }
    }
}

impl ChunkPopulator for ChunkManager {
    fn populate(&self, coord: ChunkCoord) -> WorldResult<()> {
        let chunk = self.get_chunk(coord);
        {
            let mut guard = chunk.write();
            if self.generator.populate(&mut guard) {
                debug!("Populated chunk {coord}");
            }
        }
        self.maybe_unload_chunks();
        Ok(())
    }
}

impl DurableFlush for ChunkManager {
    fn flush_all(&self) -> WorldResult<usize> {
        self.save_all()
    }
}
