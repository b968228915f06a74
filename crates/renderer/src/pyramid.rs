//! Web Mercator XYZ tiles cut from an encoded wind raster.
//!
//! Each output pixel samples the nearest raster cell of the regular lat/lon
//! grid, so channel bytes are copied, never blended. Pixels outside the
//! raster or on masked cells get the calm value with alpha 0.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use tracing::debug;

use wind_common::{DestinationGrid, GeoBounds};

use crate::png;
use crate::wind_tile::{EncodedTile, EncodingError, CHANNELS};

/// Web Mercator latitude limit.
const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;

/// Deepest zoom level a pyramid may request.
pub const MAX_ZOOM: u32 = 22;

/// Zoom range and tile size for the pyramid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PyramidConfig {
    #[serde(default)]
    pub min_zoom: u32,
    #[serde(default = "default_max_zoom")]
    pub max_zoom: u32,
    #[serde(default = "default_tile_size")]
    pub tile_size: usize,
}

fn default_max_zoom() -> u32 {
    6
}

fn default_tile_size() -> usize {
    256
}

impl Default for PyramidConfig {
    fn default() -> Self {
        Self {
            min_zoom: 0,
            max_zoom: default_max_zoom(),
            tile_size: default_tile_size(),
        }
    }
}

/// One rendered XYZ tile.
#[derive(Debug, Clone)]
pub struct PyramidTile {
    pub z: u32,
    pub x: u32,
    pub y: u32,
    pub png: Vec<u8>,
}

impl PyramidTile {
    /// Relative path `{z}/{x}/{y}.png`.
    pub fn relative_path(&self) -> String {
        format!("{}/{}/{}.png", self.z, self.x, self.y)
    }
}

/// Geographic bounds of a Web Mercator tile.
pub fn tile_bounds(z: u32, x: u32, y: u32) -> GeoBounds {
    let n = 2_u32.pow(z) as f64;
    let lat_at = |ty: f64| (PI * (1.0 - 2.0 * ty / n)).sinh().atan().to_degrees();
    GeoBounds::new(
        x as f64 / n * 360.0 - 180.0,
        (x + 1) as f64 / n * 360.0 - 180.0,
        lat_at((y + 1) as f64),
        lat_at(y as f64),
    )
}

/// Tile containing a geographic point.
pub fn coords_to_tile(lon: f64, lat: f64, z: u32) -> (u32, u32) {
    let n = 2_u32.pow(z);
    let lat = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians();
    let x = ((lon + 180.0) / 360.0 * n as f64).floor();
    let y = ((1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * n as f64).floor();
    let max = (n - 1) as f64;
    (x.clamp(0.0, max) as u32, y.clamp(0.0, max) as u32)
}

/// Tile index ranges `(x0..=x1, y0..=y1)` covering the grid at one zoom.
pub fn tile_range(bounds: &GeoBounds, z: u32) -> ((u32, u32), (u32, u32)) {
    let (x0, y0) = coords_to_tile(bounds.west, bounds.north, z);
    let (x1, y1) = coords_to_tile(bounds.east, bounds.south, z);
    ((x0, x1), (y0, y1))
}

/// Render every tile of the configured zoom range that overlaps `grid`.
pub fn build_pyramid(
    tile: &EncodedTile,
    grid: &DestinationGrid,
    config: &PyramidConfig,
) -> Result<Vec<PyramidTile>, EncodingError> {
    let mut tiles = Vec::new();
    for z in config.min_zoom..=config.max_zoom {
        let ((x0, x1), (y0, y1)) = tile_range(&grid.bounds, z);
        for x in x0..=x1 {
            for y in y0..=y1 {
                let rgba = sample_tile(tile, grid, z, x, y, config.tile_size);
                let png = png::create_png(&rgba, config.tile_size, config.tile_size)
                    .map_err(EncodingError::Png)?;
                tiles.push(PyramidTile { z, x, y, png });
            }
        }
        debug!(zoom = z, tiles = (x1 - x0 + 1) * (y1 - y0 + 1), "Rendered pyramid level");
    }
    Ok(tiles)
}

/// RGBA pixels for one XYZ tile.
pub fn sample_tile(
    tile: &EncodedTile,
    grid: &DestinationGrid,
    z: u32,
    x: u32,
    y: u32,
    size: usize,
) -> Vec<u8> {
    let n = 2_u32.pow(z) as f64;
    let (dlon, dlat) = grid.resolution();
    let calm = [tile.params.zero_offset, tile.params.zero_offset, 0, 0];
    let mut out = Vec::with_capacity(size * size * 4);

    for py in 0..size {
        let ty = y as f64 + (py as f64 + 0.5) / size as f64;
        let lat = (PI * (1.0 - 2.0 * ty / n)).sinh().atan().to_degrees();
        let row = raster_index(grid.bounds.north - lat, dlat, grid.height);

        for px in 0..size {
            let tx = x as f64 + (px as f64 + 0.5) / size as f64;
            let lon = tx / n * 360.0 - 180.0;
            let col = raster_index(lon - grid.bounds.west, dlon, grid.width);

            match (row, col) {
                (Some(r), Some(c)) if tile.mask[r * tile.width + c] => {
                    let i = (r * tile.width + c) * CHANNELS;
                    out.extend_from_slice(&tile.data[i..i + CHANNELS]);
                    out.push(255);
                }
                _ => out.extend_from_slice(&calm),
            }
        }
    }
    out
}

/// Nearest cell index for an offset from the grid origin, if inside.
fn raster_index(offset: f64, step: f64, len: usize) -> Option<usize> {
    if len == 1 {
        return (offset.abs() <= f64::EPSILON).then_some(0);
    }
    let idx = (offset / step).round();
    (idx >= 0.0 && idx < len as f64).then_some(idx as usize)
}
