// config.rs - Engine configuration (can be loaded from YAML)

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{EngineError, Result};
use crate::partition::Partition;

pub const DEFAULT_GRID_SIZE: usize = 1000;
pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_RANDOM_DENSITY: f64 = 0.15;   // random fill: 15% of cells come alive
pub const DEFAULT_STALL_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_HISTORY_LEN: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Side length of the square population grid.
    pub grid_size: usize,
    /// Number of chunk workers; the grid is split into this many regions.
    pub workers: usize,
    /// Probability used by random fills that do not carry their own density.
    pub random_density: f64,
    /// How long the coordinator waits for a chunk, while running, before
    /// treating the generation as stalled.
    pub stall_timeout_ms: u64,
    /// Pause automatically when a merged generation repeats a recent one.
    pub pause_on_repeat: bool,
    /// Number of recent generation hashes kept for repeat detection.
    pub history_len: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            grid_size: DEFAULT_GRID_SIZE,
            workers: DEFAULT_WORKERS,
            random_density: DEFAULT_RANDOM_DENSITY,
            stall_timeout_ms: DEFAULT_STALL_TIMEOUT_MS,
            pause_on_repeat: false,
            history_len: DEFAULT_HISTORY_LEN,
        }
    }
}

impl EngineConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: EngineConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn stall_timeout(&self) -> Duration {
        Duration::from_millis(self.stall_timeout_ms)
    }

    /// Checks every field and that the worker count tiles the grid.
    pub fn validate(&self) -> Result<()> {
        if self.grid_size == 0 {
            return Err(EngineError::InvalidConfig("grid_size must be at least 1".into()));
        }
        if self.workers == 0 {
            return Err(EngineError::InvalidConfig("workers must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.random_density) {
            return Err(EngineError::InvalidConfig(format!(
                "random_density must be within [0, 1], got {}",
                self.random_density
            )));
        }
        if self.stall_timeout_ms == 0 {
            return Err(EngineError::InvalidConfig("stall_timeout_ms must be positive".into()));
        }
        if self.pause_on_repeat && self.history_len == 0 {
            return Err(EngineError::InvalidConfig(
                "history_len must be positive when pause_on_repeat is set".into(),
            ));
        }
        Partition::new(self.grid_size, self.workers)?;
        Ok(())
    }
}
