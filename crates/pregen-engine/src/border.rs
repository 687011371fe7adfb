//! World border: the rectangle the fill job covers and the guard that keeps
//! actors inside it.

use dashmap::DashMap;
use pregen_common::{ActorId, ChunkBounds, ChunkPopulator, WorldCoord, CHUNK_SIZE};
use tracing::{debug, warn};

use crate::config::BorderConfig;

/// Ticks an actor is left alone after being moved by the border.
pub const IGNORE_TICKS: u32 = 3;

/// A position in block units.
pub type Position = (f64, f64);

/// The configured border rectangle.
#[derive(Debug, Clone)]
pub struct WorldBorder {
    enabled: bool,
    loop_mode: bool,
    min_x: f64,
    max_x: f64,
    min_z: f64,
    max_z: f64,
    buffer: f64,
}

impl WorldBorder {
    /// Border from config, with corners in any order.
    #[must_use]
    pub fn new(config: &BorderConfig) -> Self {
        Self {
            enabled: config.enabled,
            loop_mode: config.loop_mode,
            min_x: config.x1.min(config.x2),
            max_x: config.x1.max(config.x2),
            min_z: config.z1.min(config.z2),
            max_z: config.z1.max(config.z2),
            buffer: config.buffer,
        }
    }

    /// Chunk range covering the rectangle.
    #[must_use]
    pub fn chunk_bounds(&self) -> ChunkBounds {
        ChunkBounds::from_block_rect(self.min_x, self.min_z, self.max_x, self.max_z)
    }

    /// Whether `(x, z)` is inside the rectangle (edges included).
    #[must_use]
    pub fn contains(&self, (x, z): Position) -> bool {
        x >= self.min_x && x <= self.max_x && z >= self.min_z && z <= self.max_z
    }

    /// Where an actor moving from `from` to `to` must be put instead, if the
    /// move leaves the rectangle.
    ///
    /// In loop mode the actor wraps to the opposite edge, `buffer` blocks
    /// inside it. Otherwise it goes back to `from`, clamped into the
    /// rectangle.
    #[must_use]
    pub fn correct(&self, from: Position, to: Position) -> Option<Position> {
        if !self.enabled || self.contains(to) {
            return None;
        }

        let (to_x, to_z) = to;
        if self.loop_mode {
            let x = if to_x < self.min_x {
                self.max_x - self.buffer
            } else if to_x > self.max_x {
                self.min_x + self.buffer
            } else {
                to_x
            };
            let z = if to_z < self.min_z {
                self.max_z - self.buffer
            } else if to_z > self.max_z {
                self.min_z + self.buffer
            } else {
                to_z
            };
            Some((x, z))
        } else {
            let (from_x, from_z) = from;
            Some((
                from_x.clamp(self.min_x, self.max_x),
                from_z.clamp(self.min_z, self.max_z),
            ))
        }
    }

    /// One-line description for the startup log.
    #[must_use]
    pub fn describe(&self) -> String {
        format!(
            "Border is at ({}, {}) to ({}, {}). Loop mode: {}",
            self.min_x, self.min_z, self.max_x, self.max_z, self.loop_mode
        )
    }
}

/// Actors the border leaves alone for a few ticks after moving them.
///
/// Written from whichever thread reports movement and counted down once
/// per tick by the host loop.
#[derive(Debug, Default)]
pub struct IgnoreWindow {
    remaining: DashMap<ActorId, u32>,
}

impl IgnoreWindow {
    /// Empty window.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ignores `actor` for the next [`IGNORE_TICKS`] ticks.
    pub fn ignore(&self, actor: ActorId) {
        self.remaining.insert(actor, IGNORE_TICKS);
    }

    /// Whether `actor` is currently ignored.
    #[must_use]
    pub fn is_ignored(&self, actor: ActorId) -> bool {
        self.remaining.contains_key(&actor)
    }

    /// Counts every entry down by one tick, dropping expired ones.
    pub fn tick(&self) {
        self.remaining.retain(|_, ticks| {
            *ticks = ticks.saturating_sub(1);
            *ticks > 0
        });
    }

    /// Actors currently ignored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.remaining.len()
    }

    /// Whether no actor is ignored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.remaining.is_empty()
    }
}

/// Applies the border to actor movement.
#[derive(Debug)]
pub struct BorderGuard {
    border: WorldBorder,
    ignore: IgnoreWindow,
}

impl BorderGuard {
    /// Guard for `border`.
    #[must_use]
    pub fn new(border: WorldBorder) -> Self {
        Self {
            border,
            ignore: IgnoreWindow::new(),
        }
    }

    /// The guarded border.
    #[must_use]
    pub fn border(&self) -> &WorldBorder {
        &self.border
    }

    /// The ignore window.
    #[must_use]
    pub fn ignore_window(&self) -> &IgnoreWindow {
        &self.ignore
    }

    /// Handles a move of `actor` from `from` to `to`. Returns where the
    /// actor ends up when the border had to move it.
    pub fn on_move<P: ChunkPopulator>(
        &self,
        actor: ActorId,
        from: Position,
        to: Position,
        populator: &P,
    ) -> Option<Position> {
        if self.ignore.is_ignored(actor) {
            return None;
        }
        let destination = self.border.correct(from, to)?;
        self.teleport(actor, destination, populator);
        Some(destination)
    }

    /// Moves `actor` to `destination`: the border ignores it for a few
    /// ticks and the destination chunk is populated before it arrives.
    pub fn teleport<P: ChunkPopulator>(&self, actor: ActorId, destination: Position, populator: &P) {
        self.ignore.ignore(actor);
        let chunk = WorldCoord::from_position(destination.0, destination.1).to_chunk_coord(CHUNK_SIZE);
        match populator.populate(chunk) {
            Ok(()) => debug!("Teleported {actor} into chunk {chunk}"),
            Err(e) => warn!("Failed to prepare chunk {chunk} for {actor}: {e}"),
        }
    }

    /// Advances the ignore window by one tick.
    pub fn tick(&self) {
        self.ignore.tick();
    }
}
