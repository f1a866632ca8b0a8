//! Engine configuration, validation, and error types.
//!
//! [`LightConfig`] is the input to [`LevelLightEngine::new`](crate::LevelLightEngine::new)
//! and [`LightEngine::new`](crate::LightEngine::new).
//! [`validate()`](LightConfig::validate) checks it before anything is
//! allocated.

use std::error::Error;
use std::fmt;

use lumen_core::LevelError;

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected while building a light engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Both block and sky light are disabled.
    NoLayers,
    /// `updates_per_tick` is zero, so a tick could never make progress.
    ZeroBudget,
    /// `bulk_clear_threshold` is zero.
    ZeroBulkClearThreshold,
    /// A propagator rejected its level count.
    Level(LevelError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoLayers => write!(f, "at least one of block_light and sky_light must be enabled"),
            Self::ZeroBudget => write!(f, "updates_per_tick must be at least 1"),
            Self::ZeroBulkClearThreshold => write!(f, "bulk_clear_threshold must be at least 1"),
            Self::Level(e) => write!(f, "propagator: {e}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Level(e) => Some(e),
            _ => None,
        }
    }
}

impl From<LevelError> for ConfigError {
    fn from(e: LevelError) -> Self {
        Self::Level(e)
    }
}

// ── LightConfig ────────────────────────────────────────────────────

/// Configuration for the light engines.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LightConfig {
    /// Propagate light emitted by voxels. Default: true.
    pub block_light: bool,
    /// Propagate light from the open sky. Default: true.
    pub sky_light: bool,
    /// Budget used by [`LevelLightEngine::tick`](crate::LevelLightEngine::tick).
    /// Default: 65 536.
    pub updates_per_tick: usize,
    /// Initial capacity of each priority bucket. Default: 256.
    pub bucket_capacity: usize,
    /// Initial capacity of the pending-level map. Default: 8192.
    pub pending_capacity: usize,
    /// Queue size below which clearing a section's queued voxels scans the
    /// queue; at or above it, the section's 4096 voxels are removed one by
    /// one instead. Default: 8192.
    pub bulk_clear_threshold: usize,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            block_light: true,
            sky_light: true,
            updates_per_tick: 65_536,
            bucket_capacity: 256,
            pending_capacity: 8192,
            bulk_clear_threshold: 8192,
        }
    }
}

impl LightConfig {
    /// Block light only.
    pub fn block_only() -> Self {
        Self {
            sky_light: false,
            ..Self::default()
        }
    }

    /// Sky light only.
    pub fn sky_only() -> Self {
        Self {
            block_light: false,
            ..Self::default()
        }
    }

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.block_light && !self.sky_light {
            return Err(ConfigError::NoLayers);
        }
        if self.updates_per_tick == 0 {
            return Err(ConfigError::ZeroBudget);
        }
        if self.bulk_clear_threshold == 0 {
            return Err(ConfigError::ZeroBulkClearThreshold);
        }
        Ok(())
    }
}
