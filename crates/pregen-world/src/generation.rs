//! Procedural terrain generation and the per-chunk populate pass.

use noise::{NoiseFn, Perlin};
use pregen_common::{ChunkCoord, CHUNK_SIZE};

use crate::cell::{material, Cell, CellFlags};
use crate::chunk::Chunk;

/// Multipliers mixing chunk coordinates into the populate seed.
const POPULATE_SEED_X: u64 = 341_873_128_712;
const POPULATE_SEED_Z: u64 = 132_897_987_541;

/// World generator configuration.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// World seed
    pub seed: u32,
    /// Chunk size in cells
    pub chunk_size: u32,
    /// Terrain scale (larger = smoother)
    pub terrain_scale: f64,
    /// Height scale
    pub height_scale: f64,
    /// Chance per grass cell to grow a tree during populate
    pub tree_chance: f64,
    /// Chance per stone cell to expose ore during populate
    pub ore_chance: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: 12345,
            chunk_size: CHUNK_SIZE,
            terrain_scale: 100.0,
            height_scale: 50.0,
            tree_chance: 0.04,
            ore_chance: 0.02,
        }
    }
}

/// Procedural world generator.
pub struct WorldGenerator {
    /// Configuration
    config: GeneratorConfig,
    /// Terrain noise
    terrain_noise: Perlin,
    /// Detail noise
    detail_noise: Perlin,
}

impl WorldGenerator {
    /// Creates a new generator with the given config.
    #[must_use]
    pub fn new(config: GeneratorConfig) -> Self {
        let terrain_noise = Perlin::new(config.seed);
        let detail_noise = Perlin::new(config.seed.wrapping_add(1));

        Self {
            config,
            terrain_noise,
            detail_noise,
        }
    }

    /// Creates a generator with default config.
    #[must_use]
    pub fn with_seed(seed: u32) -> Self {
        Self::new(GeneratorConfig {
            seed,
            ..Default::default()
        })
    }

    /// Generates the bare terrain of a chunk. The populate pass has not run.
    #[must_use]
    pub fn generate_chunk(&self, coord: ChunkCoord) -> Chunk {
        let size = self.config.chunk_size;
        let mut chunk = Chunk::new(coord, size);
        let world_x = f64::from(coord.x) * f64::from(size);
        let world_z = f64::from(coord.z) * f64::from(size);

        let cells = chunk.cells_mut();

        for z in 0..size {
            for x in 0..size {
                let wx = (world_x + f64::from(x)) / self.config.terrain_scale;
                let wz = (world_z + f64::from(z)) / self.config.terrain_scale;

                let height = self.terrain_noise.get([wx, wz]);
                let detail = self.detail_noise.get([wx * 4.0, wz * 4.0]) * 0.1;
                let combined = ((height + detail + 1.0) / 2.0).clamp(0.0, 1.0);

                let mut cell = Cell::new(Self::height_to_material(combined));
                cell.height = (combined * self.config.height_scale) as u16;
                cell.biome = (combined * 8.0) as u8;
                if cell.material == material::WATER {
                    cell.flags |= CellFlags::SUBMERGED;
                }

                let index = (z * size + x) as usize;
                cells[index] = cell;
            }
        }

        chunk.mark_clean();
        chunk
    }

    /// Runs the populate pass on a generated chunk.
    ///
    /// The feature layout depends only on the world seed and the chunk
    /// coordinate. Returns `false` without touching the chunk when it was
    /// already populated.
    pub fn populate(&self, chunk: &mut Chunk) -> bool {
        if chunk.is_populated() {
            return false;
        }

        let mut rng = fastrand::Rng::with_seed(self.populate_seed(chunk.coord()));
        let size = chunk.size();

        for z in 0..size {
            for x in 0..size {
                let Some(&cell) = chunk.get_cell(x, z) else {
                    continue;
                };
                let placed = match cell.material {
                    material::GRASS if rng.f64() < self.config.tree_chance => material::TREE,
                    material::STONE if rng.f64() < self.config.ore_chance => material::ORE,
                    _ => continue,
                };
                chunk.set_cell(
                    x,
                    z,
                    Cell {
                        material: placed,
                        flags: cell.flags | CellFlags::DECORATED,
                        ..cell
                    },
                );
            }
        }

        chunk.mark_populated();
        true
    }

    fn populate_seed(&self, coord: ChunkCoord) -> u64 {
        (coord.x as i64 as u64)
            .wrapping_mul(POPULATE_SEED_X)
            .wrapping_add((coord.z as i64 as u64).wrapping_mul(POPULATE_SEED_Z))
            ^ u64::from(self.config.seed)
    }

    /// Converts a height value (0-1) to a material ID.
    fn height_to_material(height: f64) -> u16 {
        match height {
            h if h < 0.3 => material::WATER,
            h if h < 0.35 => material::SAND,
            h if h < 0.6 => material::GRASS,
            h if h < 0.7 => material::DIRT,
            h if h < 0.85 => material::STONE,
            _ => material::SNOW,
        }
    }

    /// Returns the generator configuration.
    #[must_use]
    pub const fn config(&self) -> &GeneratorConfig {
        &self.config
    }
}
