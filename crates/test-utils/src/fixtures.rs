//! Common test fixtures for wind-tiles tests.

use std::path::PathBuf;

use tempfile::TempDir;
use wind_common::{DestinationGrid, GeoBounds};

/// Destination grids used across the test suite.
pub mod grid {
    use super::*;

    /// Full-size CONUS output grid (1799 x 1059).
    pub fn conus() -> DestinationGrid {
        DestinationGrid::conus()
    }

    /// CONUS footprint at a resolution small enough for unit tests.
    pub fn conus_small() -> DestinationGrid {
        DestinationGrid::new(GeoBounds::new(-134.1, -60.9, 21.1, 52.6), 184, 106)
    }

    /// 10 x 10 grid over a 9-degree square.
    pub fn simple_10x10() -> DestinationGrid {
        DestinationGrid::new(GeoBounds::new(-100.0, -91.0, 30.0, 39.0), 10, 10)
    }
}

/// Common time values for testing.
pub mod time {
    /// A fixed reference time for tests
    pub const REFERENCE_TIME: &str = "2024-01-15T12:00:00Z";

    /// Fixed reference time with a minute component
    pub const REFERENCE_TIME_OFF_HOUR: &str = "2024-01-15T12:37:00Z";

    /// Lead-time offsets most tests request
    pub const OFFSETS: [u32; 3] = [0, 1, 2];
}

/// A fresh temporary directory and its path.
///
/// Keep the `TempDir` alive for as long as the path is used.
pub fn temp_output_dir() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = dir.path().to_path_buf();
    (dir, path)
}
