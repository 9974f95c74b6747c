use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::StreamError;

/// Most tiles a single range query may cover. With the default 16-unit edge
/// this allows a radius of up to 2040 world units.
pub const MAX_TILES_IN_RANGE: usize = 256 * 256;

/// Streaming parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Horizontal distance, in world units, that tiles are kept around the observer.
    pub radius: f32,
    /// Tile edge length in world units.
    pub tile_edge: i32,
    /// Sleep between passes of each background loop.
    pub tick_interval_ms: u64,
    /// Maximum tiles created per generation pass.
    pub generation_budget: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            radius: 64.0,
            tile_edge: 16,
            tick_interval_ms: 4,
            generation_budget: 8,
        }
    }
}

impl StreamConfig {
    pub fn validate(&self) -> Result<(), StreamError> {
        if !self.radius.is_finite() || self.radius <= 0.0 {
            return Err(StreamError::InvalidConfig(format!(
                "radius must be positive, got {}",
                self.radius
            )));
        }
        if self.tile_edge <= 0 {
            return Err(StreamError::InvalidConfig(format!(
                "tile_edge must be positive, got {}",
                self.tile_edge
            )));
        }
        let per_axis = self.tiles_per_axis();
        if per_axis.saturating_mul(per_axis) > MAX_TILES_IN_RANGE {
            return Err(StreamError::InvalidConfig(format!(
                "radius {} covers up to {per_axis}x{per_axis} tiles of edge {}, limit is {MAX_TILES_IN_RANGE}",
                self.radius, self.tile_edge
            )));
        }
        if self.generation_budget == 0 {
            return Err(StreamError::InvalidConfig(
                "generation_budget must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Most tiles one axis of the range can hold.
    pub fn tiles_per_axis(&self) -> usize {
        let per_axis = (2.0 * f64::from(self.radius) / f64::from(self.tile_edge)).floor();
        (per_axis as usize).saturating_add(1)
    }
}
