//! Tunables for the fill job.

use serde::{Deserialize, Serialize};

/// Default cells processed per tick.
pub const DEFAULT_FILL_FREQ: u32 = 5;

/// Default padding (in chunks) around the border rectangle.
pub const DEFAULT_FILL_PAD: i32 = 0;

/// Default cells per step before a restart.
pub const DEFAULT_FILL_STEP: u32 = 40_000;

/// Default number of columns re-walked after a restart.
pub const DEFAULT_OVERLAP_COLUMNS: u32 = 10;

/// Default checkpoint file name inside the data directory.
pub const DEFAULT_CHECKPOINT_FILE: &str = "fill_job.toml";

/// Fill job configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// `freq` used when the start command omits it
    pub default_freq: u32,
    /// `pad` used when the start command omits it
    pub default_pad: i32,
    /// `step` used when the start command omits it
    pub default_step: u32,
    /// Leading columns re-walked after every step boundary
    pub overlap_columns: u32,
    /// Ticks to wait after start or resume before the first batch
    pub warmup_ticks: u32,
    /// Ticks between the step boundary and the rewind/flush/save
    pub handoff_delay_ticks: u32,
    /// Ticks between the rewound save and the restart
    pub restart_delay_ticks: u32,
    /// Cells between two progress log lines
    pub log_frequency: u64,
    /// Checkpoint file name inside the data directory
    pub checkpoint_file: String,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            default_freq: DEFAULT_FILL_FREQ,
            default_pad: DEFAULT_FILL_PAD,
            default_step: DEFAULT_FILL_STEP,
            overlap_columns: DEFAULT_OVERLAP_COLUMNS,
            warmup_ticks: 20,
            handoff_delay_ticks: 20,
            restart_delay_ticks: 100,
            log_frequency: 1000,
            checkpoint_file: DEFAULT_CHECKPOINT_FILE.to_string(),
        }
    }
}

impl JobConfig {
    /// Clamp values to ranges the scheduler can work with.
    pub fn validate(&mut self) {
        self.default_freq = self.default_freq.max(1);
        self.default_step = self.default_step.max(self.default_freq);
        self.log_frequency = self.log_frequency.max(1);
        if self.checkpoint_file.trim().is_empty() {
            self.checkpoint_file = DEFAULT_CHECKPOINT_FILE.to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_clamps() {
        let mut config = JobConfig {
            default_freq: 0,
            default_step: 0,
            log_frequency: 0,
            checkpoint_file: "  ".into(),
            ..JobConfig::default()
        };
        config.validate();
        assert_eq!(config.default_freq, 1);
        assert_eq!(config.default_step, 1);
        assert_eq!(config.log_frequency, 1);
        assert_eq!(config.checkpoint_file, DEFAULT_CHECKPOINT_FILE);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: JobConfig = toml::from_str("overlap_columns = 3").expect("parse");
        assert_eq!(config.overlap_columns, 3);
        assert_eq!(config.default_step, DEFAULT_FILL_STEP);
    }
}
