//! Vector wind fields before and after reprojection.

use crate::error::{PipelineError, PipelineResult};

/// Wind components on the model's native (possibly curvilinear) grid.
///
/// All four arrays are row-major with `nx * ny` entries. Longitudes are in
/// `[-180, 180)`; sources normalise before building a field.
#[derive(Debug, Clone, Default)]
pub struct NativeField {
    pub nx: usize,
    pub ny: usize,
    pub lat: Vec<f64>,
    pub lon: Vec<f64>,
    pub u: Vec<f32>,
    pub v: Vec<f32>,
}

impl NativeField {
    pub fn new(nx: usize, ny: usize, lat: Vec<f64>, lon: Vec<f64>, u: Vec<f32>, v: Vec<f32>) -> Self {
        Self {
            nx,
            ny,
            lat,
            lon,
            u,
            v,
        }
    }

    /// `nx * ny`, saturating on overflow.
    pub fn len(&self) -> usize {
        self.nx.saturating_mul(self.ny)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check that every array matches the declared shape.
    pub fn check_shape(&self) -> PipelineResult<()> {
        if self.is_empty() {
            return Err(PipelineError::projection(format!(
                "native field is empty ({}x{})",
                self.nx, self.ny
            )));
        }
        let expected = self.nx.checked_mul(self.ny).ok_or_else(|| {
            PipelineError::projection(format!(
                "native field shape {}x{} overflows",
                self.nx, self.ny
            ))
        })?;
        for (name, len) in [
            ("lat", self.lat.len()),
            ("lon", self.lon.len()),
            ("u", self.u.len()),
            ("v", self.v.len()),
        ] {
            if len != expected {
                return Err(PipelineError::projection(format!(
                    "{} has {} values, expected {} ({}x{})",
                    name, len, expected, self.nx, self.ny
                )));
            }
        }
        Ok(())
    }

    /// (min_lat, max_lat, min_lon, max_lon) over finite coordinates.
    pub fn coordinate_extent(&self) -> Option<(f64, f64, f64, f64)> {
        let mut extent: Option<(f64, f64, f64, f64)> = None;
        for (&lat, &lon) in self.lat.iter().zip(&self.lon) {
            if !lat.is_finite() || !lon.is_finite() {
                continue;
            }
            extent = Some(match extent {
                None => (lat, lat, lon, lon),
                Some((a, b, c, d)) => (a.min(lat), b.max(lat), c.min(lon), d.max(lon)),
            });
        }
        extent
    }
}

/// Wind components on a destination grid plus the validity mask.
///
/// Masked cells hold zero in `u` and `v`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResampledField {
    pub width: usize,
    pub height: usize,
    pub u: Vec<f32>,
    pub v: Vec<f32>,
    pub mask: Vec<bool>,
}

impl ResampledField {
    /// A fully masked field.
    pub fn empty(width: usize, height: usize) -> Self {
        let n = width * height;
        Self {
            width,
            height,
            u: vec![0.0; n],
            v: vec![0.0; n],
            mask: vec![false; n],
        }
    }

    #[inline]
    pub fn index(&self, row: usize, col: usize) -> usize {
        row * self.width + col
    }

    pub fn is_valid(&self, row: usize, col: usize) -> bool {
        self.mask[self.index(row, col)]
    }

    pub fn valid_count(&self) -> usize {
        self.mask.iter().filter(|&&m| m).count()
    }

    /// Share of cells that are valid, in `[0, 1]`.
    pub fn valid_fraction(&self) -> f64 {
        if self.mask.is_empty() {
            return 0.0;
        }
        self.valid_count() as f64 / self.mask.len() as f64
    }

    /// Whether every cell of a row is masked.
    pub fn row_is_masked(&self, row: usize) -> bool {
        let start = row * self.width;
        self.mask[start..start + self.width].iter().all(|&m| !m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(nx: usize, ny: usize) -> NativeField {
        let n = nx * ny;
        NativeField::new(nx, ny, vec![0.0; n], vec![0.0; n], vec![0.0; n], vec![0.0; n])
    }

    #[test]
    fn test_shape_ok() {
        assert!(field(3, 2).check_shape().is_ok());
    }

    #[test]
    fn test_shape_mismatch_is_projection_failure() {
        let mut f = field(3, 2);
        f.v.pop();
        let err = f.check_shape().unwrap_err();
        assert!(matches!(err, PipelineError::ProjectionFailure(_)));
        assert!(err.to_string().contains("v has 5 values"));
    }

    #[test]
    fn test_overflowing_shape_is_projection_failure() {
        let f = NativeField::new(usize::MAX, 2, vec![], vec![], vec![], vec![]);
        assert_eq!(f.len(), usize::MAX);
        let err = f.check_shape().unwrap_err();
        assert!(err.to_string().contains("overflows"));
    }

    #[test]
    fn test_empty_is_projection_failure() {
        assert!(matches!(
            field(0, 4).check_shape(),
            Err(PipelineError::ProjectionFailure(_))
        ));
    }

    #[test]
    fn test_extent_skips_non_finite() {
        let mut f = field(2, 2);
        f.lat = vec![25.0, 50.0, f64::NAN, 30.0];
        f.lon = vec![-100.0, -90.0, -80.0, -95.0];
        assert_eq!(f.coordinate_extent(), Some((25.0, 50.0, -100.0, -90.0)));
    }

    #[test]
    fn test_valid_fraction() {
        let mut r = ResampledField::empty(2, 2);
        assert_eq!(r.valid_fraction(), 0.0);
        r.mask[0] = true;
        assert_eq!(r.valid_count(), 1);
        assert_eq!(r.valid_fraction(), 0.25);
        assert!(!r.row_is_masked(0));
        assert!(r.row_is_masked(1));
    }
}
