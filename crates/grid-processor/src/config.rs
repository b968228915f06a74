//! Configuration for the reprojector.

use serde::{Deserialize, Serialize};

use crate::error::{GridProcessorError, Result};

/// Default nearest-neighbour cut-off in degrees (about 15 km).
pub const DEFAULT_MAX_DISTANCE_DEG: f64 = 0.15;

/// Settings for nearest-neighbour reprojection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReprojectionConfig {
    /// Destination cells farther than this from every native point are masked.
    #[serde(default = "default_max_distance_deg")]
    pub max_distance_deg: f64,
}

fn default_max_distance_deg() -> f64 {
    DEFAULT_MAX_DISTANCE_DEG
}

impl Default for ReprojectionConfig {
    fn default() -> Self {
        Self {
            max_distance_deg: DEFAULT_MAX_DISTANCE_DEG,
        }
    }
}

impl ReprojectionConfig {
    pub fn new(max_distance_deg: f64) -> Self {
        Self { max_distance_deg }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("WIND_MAX_DISTANCE_DEG") {
            if let Ok(deg) = val.parse() {
                config.max_distance_deg = deg;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !self.max_distance_deg.is_finite() || self.max_distance_deg <= 0.0 {
            return Err(GridProcessorError::config(format!(
                "max_distance_deg must be a positive number, got {}",
                self.max_distance_deg
            )));
        }
        Ok(())
    }
}
