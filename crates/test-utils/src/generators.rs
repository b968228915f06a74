//! Generators for synthetic native wind fields.
//!
//! These produce predictable, verifiable patterns so reprojection and
//! encoding results can be checked cell by cell.

use projection::LambertConformal;
use wind_common::NativeField;

/// U component that varies with row: -20 m/s in row 0 up to +20 m/s in the last row.
pub fn create_u_wind_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        let lat_factor = (row as f32 / height.max(1) as f32 - 0.5) * 2.0;
        data.extend(std::iter::repeat(lat_factor * 20.0).take(width));
    }
    data
}

/// V component that varies with column: -15 m/s at column 0 up to +15 m/s at the east edge.
pub fn create_v_wind_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for _row in 0..height {
        for col in 0..width {
            let lon_factor = (col as f32 / width.max(1) as f32 - 0.5) * 2.0;
            data.push(lon_factor * 15.0);
        }
    }
    data
}

/// Grid filled with a constant value.
pub fn create_constant_grid(width: usize, height: usize, value: f32) -> Vec<f32> {
    vec![value; width * height]
}

/// Native field on a regular lattice starting at (`lat0`, `lon0`).
///
/// Row `j` sits at `lat0 + j * step`; column `i` at `lon0 + i * step`.
/// Each cell holds `u = i`, `v = -j` so tests can recover the source cell
/// from the resampled value.
pub fn lattice_field(lat0: f64, lon0: f64, step: f64, nx: usize, ny: usize) -> NativeField {
    let mut lat = Vec::with_capacity(nx * ny);
    let mut lon = Vec::with_capacity(nx * ny);
    let mut u = Vec::with_capacity(nx * ny);
    let mut v = Vec::with_capacity(nx * ny);
    for j in 0..ny {
        for i in 0..nx {
            lat.push(lat0 + j as f64 * step);
            lon.push(lon0 + i as f64 * step);
            u.push(i as f32);
            v.push(-(j as f32));
        }
    }
    NativeField::new(nx, ny, lat, lon, u, v)
}

/// Regular lattice spanning `[south, north] x [west, east]` with the
/// row/column wind pattern of [`create_u_wind_grid`] and [`create_v_wind_grid`].
pub fn banded_field(south: f64, north: f64, west: f64, east: f64, step: f64) -> NativeField {
    let nx = ((east - west) / step).round() as usize + 1;
    let ny = ((north - south) / step).round() as usize + 1;
    let mut field = lattice_field(south, west, step, nx, ny);
    field.u = create_u_wind_grid(nx, ny);
    field.v = create_v_wind_grid(nx, ny);
    field
}

/// Curvilinear HRRR-shaped field, keeping every `stride`-th native point.
///
/// Wind is a uniform westerly of `speed` m/s.
pub fn lambert_field(stride: usize, speed: f32) -> NativeField {
    let proj = LambertConformal::hrrr_thinned(stride);
    let (lat, lon) = proj.grid_coordinates();
    let n = lat.len();
    NativeField::new(
        proj.nx,
        proj.ny,
        lat,
        lon,
        create_constant_grid(n, 1, speed),
        create_constant_grid(n, 1, 0.0),
    )
}
