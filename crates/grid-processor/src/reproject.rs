//! Nearest-neighbour reprojection from a native curvilinear grid onto a
//! regular lat/lon destination grid.
//!
//! Each destination cell takes the `u`/`v` of the single closest native
//! point. Closeness is planar distance in degrees (see
//! [`projection::kdtree`]). Cells whose nearest native point lies beyond
//! `max_distance_deg` are outside the model footprint: they are masked and
//! hold zero.

use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info, instrument};

use projection::KdTree;
use wind_common::{DestinationGrid, NativeField, ResampledField};

use crate::config::ReprojectionConfig;
use crate::error::{GridProcessorError, Result};

/// Resample `field` onto `grid`.
///
/// # Errors
/// * [`GridProcessorError::InvalidField`] when array lengths disagree with
///   `nx * ny` or the field is empty
/// * [`GridProcessorError::NoSourcePoints`] when no native coordinate is finite
/// * [`GridProcessorError::ConfigError`] for a bad threshold or grid
#[instrument(skip_all, fields(nx = field.nx, ny = field.ny, width = grid.width, height = grid.height))]
pub fn reproject(
    field: &NativeField,
    grid: &DestinationGrid,
    config: &ReprojectionConfig,
) -> Result<ResampledField> {
    config.validate()?;
    grid.validate().map_err(|e| GridProcessorError::config(e.to_string()))?;
    field
        .check_shape()
        .map_err(|e| GridProcessorError::invalid_field(e.to_string()))?;

    let started = Instant::now();
    let index = KdTree::from_coordinates(&field.lat, &field.lon);
    if index.is_empty() {
        return Err(GridProcessorError::NoSourcePoints);
    }
    debug!(
        points = index.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Built nearest-neighbour index"
    );

    let resampled = resample_with_index(field, &index, grid, config.max_distance_deg);

    info!(
        valid_pct = format!("{:.1}", resampled.valid_fraction() * 100.0),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Reprojected native field"
    );
    Ok(resampled)
}

/// Resample using a prebuilt index over `field`'s coordinates.
///
/// Rows are processed in parallel. A neighbour with non-finite `u` or `v`
/// counts as missing data and leaves the cell masked.
pub fn resample_with_index(
    field: &NativeField,
    index: &KdTree,
    grid: &DestinationGrid,
    max_distance_deg: f64,
) -> ResampledField {
    let width = grid.width;
    let lons = grid.longitudes();
    let lats = grid.latitudes();
    let mut out = ResampledField::empty(width, grid.height);

    out.u
        .par_chunks_mut(width)
        .zip(out.v.par_chunks_mut(width))
        .zip(out.mask.par_chunks_mut(width))
        .enumerate()
        .for_each(|(row, ((u_row, v_row), mask_row))| {
            let lat = lats[row];
            for (col, &lon) in lons.iter().enumerate() {
                let Some(hit) = index.nearest(lat, lon) else {
                    continue;
                };
                if hit.distance > max_distance_deg {
                    continue;
                }
                let (u, v) = (field.u[hit.index], field.v[hit.index]);
                if u.is_finite() && v.is_finite() {
                    u_row[col] = u;
                    v_row[col] = v;
                    mask_row[col] = true;
                }
            }
        });

    out
}
