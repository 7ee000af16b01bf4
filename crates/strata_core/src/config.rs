//! # Engine Configuration
//!
//! Loaded once at startup from TOML. Every field has a default, so a partial
//! file (or an empty one) is valid:
//!
//! ```toml
//! [world]
//! min_id = 1000
//! max_id = 2000
//!
//! [scheduler]
//! fixed_time_step_ms = 16
//! game_speed = 1
//! max_physics_loop_count = 0
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ecs::IdAllocator;
use crate::error::{ConfigError, ConfigResult};

/// Configuration of a [`World`](crate::World).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Smallest id handed out by the allocator.
    pub min_id: u32,
    /// Largest id handed out before wrapping to `min_id`.
    pub max_id: u32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            min_id: IdAllocator::DEFAULT_MIN,
            max_id: IdAllocator::DEFAULT_MAX,
        }
    }
}

impl WorldConfig {
    /// Checks the id range.
    ///
    /// # Errors
    ///
    /// Same rules as [`IdAllocator::new`].
    pub fn validate(&self) -> ConfigResult<()> {
        IdAllocator::validate(self.min_id, self.max_id)
    }
}

/// Configuration of a [`Scheduler`](crate::Scheduler).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Length of one physics tick in milliseconds.
    pub fixed_time_step_ms: u64,
    /// Multiplier applied to frame time before it feeds the accumulator.
    pub game_speed: u32,
    /// Physics ticks allowed per frame before the backlog is dropped.
    /// `0` never drops.
    pub max_physics_loop_count: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            fixed_time_step_ms: 16,
            game_speed: 1,
            max_physics_loop_count: 0,
        }
    }
}

impl SchedulerConfig {
    /// Fixed time step as a [`Duration`].
    #[must_use]
    pub fn fixed_time_step(&self) -> Duration {
        Duration::from_millis(self.fixed_time_step_ms)
    }

    /// Checks the time step.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidTimeStep`] if the step is zero.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.fixed_time_step_ms == 0 {
            return Err(ConfigError::InvalidTimeStep);
        }
        Ok(())
    }
}

/// Top-level configuration file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// World section.
    pub world: WorldConfig,
    /// Scheduler section.
    pub scheduler: SchedulerConfig,
}

impl EngineConfig {
    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Fails on malformed TOML or on values [`EngineConfig::validate`]
    /// rejects.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read, or for the reasons of
    /// [`EngineConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "loaded engine configuration");
        Ok(config)
    }

    /// Validates every section.
    ///
    /// # Errors
    ///
    /// Returns the first rejected section's error.
    pub fn validate(&self) -> ConfigResult<()> {
        self.world.validate()?;
        self.scheduler.validate()
    }
}
