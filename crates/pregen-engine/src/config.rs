//! Engine configuration.
//!
//! Border rectangle, world, fill job and server tick settings, read from
//! `config.toml` in the data directory. A missing file is created with the
//! defaults on first start.

use pregen_job::JobConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Configuration file name.
pub const CONFIG_FILE: &str = "config.toml";

/// World border rectangle in block units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BorderConfig {
    /// Whether actors are kept inside the border
    pub enabled: bool,
    /// Wrap actors to the opposite edge instead of pushing them back
    pub loop_mode: bool,
    /// First corner X
    pub x1: f64,
    /// First corner Z
    pub z1: f64,
    /// Opposite corner X
    pub x2: f64,
    /// Opposite corner Z
    pub z2: f64,
    /// Distance from the edge an actor lands at after wrapping
    pub buffer: f64,
}

impl Default for BorderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            loop_mode: true,
            x1: -5376.0,
            z1: -2688.0,
            x2: 5376.0,
            z2: 2688.0,
            buffer: 2.0,
        }
    }
}

/// World storage and generation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// World seed
    pub seed: u32,
    /// Cells per chunk side
    pub chunk_size: u32,
    /// Chunk directory, relative to the data directory
    pub save_dir: PathBuf,
    /// Chunks kept in memory before the oldest are written out
    pub max_loaded_chunks: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: 12345,
            chunk_size: 16,
            save_dir: PathBuf::from("world"),
            max_loaded_chunks: 1024,
        }
    }
}

/// How the host gives back memory at a step boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestartMode {
    /// Exit the process; an outer supervisor starts it again
    #[default]
    Exit,
    /// Unload every chunk and keep running
    InProcess,
}

/// Tick loop settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Ticks per second
    pub tick_rate: u32,
    /// Restart behavior at step boundaries
    pub restart_mode: RestartMode,
    /// Process exit code used for a step restart
    pub exit_code: i32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick_rate: 20,
            restart_mode: RestartMode::Exit,
            exit_code: 0,
        }
    }
}

/// Engine configuration parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// World border
    pub border: BorderConfig,
    /// World storage
    pub world: WorldConfig,
    /// Fill job tunables
    pub job: JobConfig,
    /// Tick loop
    pub server: ServerConfig,
}

impl EngineConfig {
    /// Loads `config.toml` from `data_dir`, writing the defaults there first
    /// if the file does not exist yet.
    pub fn load_or_create(data_dir: &Path) -> Self {
        let path = Self::config_path(data_dir);
        if !path.exists() {
            let config = Self::default();
            if let Err(e) = config.save_to(&path) {
                warn!("Could not write default config: {e}");
            }
            return config;
        }
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        let mut config = match fs::File::open(path) {
            Ok(mut file) => {
                let mut contents = String::new();
                if let Err(e) = file.read_to_string(&mut contents) {
                    warn!("Failed to read config file: {e}");
                    return Self::default();
                }

                match toml::from_str::<Self>(&contents) {
                    Ok(config) => {
                        info!("Loaded config from {}", path.display());
                        config
                    },
                    Err(e) => {
                        warn!("Failed to parse config file: {e}");
                        return Self::default();
                    },
                }
            },
            Err(e) => {
                warn!("Failed to open config file: {e}");
                return Self::default();
            },
        };

        config.validate();
        config
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Path of the configuration file inside `data_dir`.
    pub fn config_path(data_dir: &Path) -> PathBuf {
        data_dir.join(CONFIG_FILE)
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        if !self.border.buffer.is_finite() || self.border.buffer < 0.0 {
            self.border.buffer = BorderConfig::default().buffer;
        }

        self.world.chunk_size = self.world.chunk_size.clamp(4, 64);
        self.world.max_loaded_chunks = self.world.max_loaded_chunks.max(16);

        self.job.validate();

        self.server.tick_rate = self.server.tick_rate.clamp(1, 1000);
    }
}
