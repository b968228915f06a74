//! Integration tests for nearest-neighbour reprojection.
//!
//! Covers exact copies at coincident coordinates, masking outside the native
//! footprint, and the curvilinear HRRR-shaped case.

use grid_processor::{reproject, GridProcessorError, ReprojectionConfig};
use test_utils::{assert_approx_eq, banded_field, fixtures, lambert_field, lattice_field};
use wind_common::{DestinationGrid, GeoBounds, PipelineError};

// ============================================================================
// Coincident coordinates
// ============================================================================

#[test]
fn test_round_trip_on_shared_coordinates() {
    // Native lattice at 0.5 degrees; destination samples every other point.
    let field = lattice_field(30.0, -100.0, 0.5, 21, 21);
    let grid = DestinationGrid::new(GeoBounds::new(-100.0, -90.0, 30.0, 40.0), 11, 11);
    let out = reproject(&field, &grid, &ReprojectionConfig::default()).unwrap();

    assert_eq!(out.valid_count(), 121);
    for row in 0..11 {
        for col in 0..11 {
            let idx = out.index(row, col);
            // destination row 0 is lat 40 => native j = 20
            let j = 20 - 2 * row;
            let i = 2 * col;
            assert_eq!(out.u[idx], i as f32);
            assert_eq!(out.v[idx], -(j as f32));
        }
    }
}

// ============================================================================
// Footprint masking
// ============================================================================

#[test]
fn test_rows_outside_native_latitudes_are_masked() {
    // Native coverage 25..50N across the whole CONUS longitude span.
    let field = banded_field(25.0, 50.0, -134.2, -60.8, 0.1);
    let grid = fixtures::grid::conus_small();
    let config = ReprojectionConfig::default();
    let out = reproject(&field, &grid, &config).unwrap();

    let lats = grid.latitudes();
    for (row, &lat) in lats.iter().enumerate() {
        let start = row * out.width;
        if lat < 25.0 - config.max_distance_deg || lat > 50.0 + config.max_distance_deg {
            assert!(out.row_is_masked(row), "row {} at lat {:.3} should be masked", row, lat);
            assert!(out.u[start..start + out.width].iter().all(|&u| u == 0.0));
            assert!(out.v[start..start + out.width].iter().all(|&v| v == 0.0));
        } else if (25.0..=50.0).contains(&lat) {
            assert!(
                out.mask[start..start + out.width].iter().all(|&m| m),
                "row {} at lat {:.3} should be fully valid",
                row,
                lat
            );
        }
    }

    let expected = (50.0 - 25.0) / (52.6 - 21.1);
    assert_approx_eq!(out.valid_fraction(), expected, 0.03);
}

#[test]
fn test_threshold_controls_masking() {
    let field = lattice_field(30.0, -100.0, 1.0, 3, 3);
    // Destination points offset by 0.3 degrees in longitude from the lattice.
    let grid = DestinationGrid::new(GeoBounds::new(-99.7, -97.7, 30.0, 32.0), 3, 3);

    let strict = reproject(&field, &grid, &ReprojectionConfig::new(0.15)).unwrap();
    assert_eq!(strict.valid_count(), 0);

    let loose = reproject(&field, &grid, &ReprojectionConfig::new(0.5)).unwrap();
    assert_eq!(loose.valid_count(), 9);
}

// ============================================================================
// Curvilinear grids
// ============================================================================

#[test]
fn test_lambert_grid_covers_interior() {
    // Every 10th HRRR point => ~30 km spacing, so widen the threshold.
    let field = lambert_field(10, 12.5);
    let grid = fixtures::grid::conus_small();
    let out = reproject(&field, &grid, &ReprojectionConfig::new(0.3)).unwrap();

    // Kansas
    let (dlon, dlat) = grid.resolution();
    let col = ((-98.0 - grid.bounds.west) / dlon).round() as usize;
    let row = ((grid.bounds.north - 38.5) / dlat).round() as usize;
    assert!(out.is_valid(row, col));
    assert_eq!(out.u[out.index(row, col)], 12.5);

    // North-west corner lies outside the HRRR cone
    assert!(!out.is_valid(0, 0));
    assert!(out.valid_fraction() > 0.5 && out.valid_fraction() < 1.0);
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_mismatched_shapes_map_to_projection_failure() {
    let mut field = lattice_field(30.0, -100.0, 1.0, 4, 4);
    field.u.truncate(10);
    let err = reproject(&field, &fixtures::grid::simple_10x10(), &ReprojectionConfig::default())
        .unwrap_err();
    assert!(matches!(err, GridProcessorError::InvalidField(_)));
    assert!(matches!(
        PipelineError::from(err),
        PipelineError::ProjectionFailure(_)
    ));
}

#[test]
fn test_bad_threshold_maps_to_config_error() {
    let field = lattice_field(30.0, -100.0, 1.0, 4, 4);
    let err = reproject(&field, &fixtures::grid::simple_10x10(), &ReprojectionConfig::new(0.0))
        .unwrap_err();
    assert!(matches!(PipelineError::from(err), PipelineError::Config(_)));
}
