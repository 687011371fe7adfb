//! Capabilities the host world lends to the pre-generation job.
//!
//! The job never owns world content. It only asks the host to populate a
//! chunk and, at step boundaries, to make everything it holds in memory
//! durable. Both calls happen on the host tick thread.

use std::rc::Rc;
use std::sync::Arc;

use crate::coords::ChunkCoord;
use crate::error::WorldResult;

/// Materializes a chunk: generate it if missing, then run its populate pass.
///
/// Must be idempotent: calling it on a chunk that is already populated
/// leaves the world unchanged. The overlap rewind at step boundaries
/// re-walks chunks and relies on this.
pub trait ChunkPopulator {
    /// Populates the chunk at `coord`.
    fn populate(&self, coord: ChunkCoord) -> WorldResult<()>;
}

/// Forces all in-memory world state to durable storage.
pub trait DurableFlush {
    /// Flushes everything; returns how many units (chunks) were written.
    fn flush_all(&self) -> WorldResult<usize>;
}

impl<T: ChunkPopulator + ?Sized> ChunkPopulator for &T {
    fn populate(&self, coord: ChunkCoord) -> WorldResult<()> {
        (**self).populate(coord)
    }
}

impl<T: ChunkPopulator + ?Sized> ChunkPopulator for Arc<T> {
    fn populate(&self, coord: ChunkCoord) -> WorldResult<()> {
        (**self).populate(coord)
    }
}

impl<T: ChunkPopulator + ?Sized> ChunkPopulator for Rc<T> {
    fn populate(&self, coord: ChunkCoord) -> WorldResult<()> {
        (**self).populate(coord)
    }
}

impl<T: DurableFlush + ?Sized> DurableFlush for &T {
    fn flush_all(&self) -> WorldResult<usize> {
        (**self).flush_all()
    }
}

impl<T: DurableFlush + ?Sized> DurableFlush for Arc<T> {
    fn flush_all(&self) -> WorldResult<usize> {
        (**self).flush_all()
    }
}

impl<T: DurableFlush + ?Sized> DurableFlush for Rc<T> {
    fn flush_all(&self) -> WorldResult<usize> {
        (**self).flush_all()
    }
}
