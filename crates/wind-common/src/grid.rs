//! Destination grid specification.

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};

/// A geographic bounding box in degrees (EPSG:4326).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub west: f64,
    pub east: f64,
    pub south: f64,
    pub north: f64,
}

impl GeoBounds {
    pub fn new(west: f64, east: f64, south: f64, north: f64) -> Self {
        Self {
            west,
            east,
            south,
            north,
        }
    }

    /// Width in degrees of longitude.
    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    /// Height in degrees of latitude.
    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    /// Check if a point is contained within these bounds.
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.west && lon <= self.east && lat >= self.south && lat <= self.north
    }
}

/// A regular lat/lon output grid. Row 0 is the northernmost row.
///
/// Cell coordinates include both edges of the bounding box: column 0 sits on
/// `west`, the last column on `east`, row 0 on `north`, the last row on `south`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestinationGrid {
    pub bounds: GeoBounds,
    pub width: usize,
    pub height: usize,
}

impl DestinationGrid {
    pub fn new(bounds: GeoBounds, width: usize, height: usize) -> Self {
        Self {
            bounds,
            width,
            height,
        }
    }

    /// Continental US grid at roughly HRRR resolution.
    pub fn conus() -> Self {
        Self::new(GeoBounds::new(-134.1, -60.9, 21.1, 52.6), 1799, 1059)
    }

    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(PipelineError::config(format!(
                "grid dimensions must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if !(self.bounds.east > self.bounds.west) {
            return Err(PipelineError::config(format!(
                "grid east ({}) must be greater than west ({})",
                self.bounds.east, self.bounds.west
            )));
        }
        if !(self.bounds.north > self.bounds.south) {
            return Err(PipelineError::config(format!(
                "grid north ({}) must be greater than south ({})",
                self.bounds.north, self.bounds.south
            )));
        }
        Ok(())
    }

    /// Column centre longitudes, west to east.
    pub fn longitudes(&self) -> Vec<f64> {
        linspace(self.bounds.west, self.bounds.east, self.width)
    }

    /// Row centre latitudes, north to south.
    pub fn latitudes(&self) -> Vec<f64> {
        linspace(self.bounds.north, self.bounds.south, self.height)
    }

    /// Longitude of one column.
    pub fn lon_at(&self, col: usize) -> f64 {
        linspace_at(self.bounds.west, self.bounds.east, self.width, col)
    }

    /// Latitude of one row.
    pub fn lat_at(&self, row: usize) -> f64 {
        linspace_at(self.bounds.north, self.bounds.south, self.height, row)
    }

    /// Degrees between adjacent columns and rows.
    pub fn resolution(&self) -> (f64, f64) {
        let step = |span: f64, n: usize| if n > 1 { span / (n - 1) as f64 } else { 0.0 };
        (
            step(self.bounds.width(), self.width),
            step(self.bounds.height(), self.height),
        )
    }
}

impl Default for DestinationGrid {
    fn default() -> Self {
        Self::conus()
    }
}

fn linspace_at(start: f64, end: f64, n: usize, i: usize) -> f64 {
    if n <= 1 || i == 0 {
        start
    } else if i == n - 1 {
        end
    } else {
        start + (end - start) * i as f64 / (n - 1) as f64
    }
}

fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    (0..n).map(|i| linspace_at(start, end, n, i)).collect()
}
