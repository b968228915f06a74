//! Lambert Conformal Conic projection.
//!
//! HRRR publishes its fields on this projection. Grid points are evenly
//! spaced in projected metres, so their geographic coordinates form a
//! curvilinear lattice.
//!
//! Parameters follow GRIB2 template 3.30:
//! - LoV: central meridian
//! - Latin1 / Latin2: standard parallels (equal for a tangent cone)
//! - La1 / Lo1: first grid point
//! - Dx / Dy: grid spacing in metres

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

/// Earth radius used by NCEP for HRRR (metres).
const EARTH_RADIUS: f64 = 6_371_229.0;

/// Lambert Conformal Conic grid definition.
#[derive(Debug, Clone)]
pub struct LambertConformal {
    /// Central meridian in radians
    pub lov: f64,
    /// First standard parallel in radians
    pub latin1: f64,
    /// Second standard parallel in radians
    pub latin2: f64,
    /// Grid spacing in X (metres)
    pub dx: f64,
    /// Grid spacing in Y (metres)
    pub dy: f64,
    /// Points along X
    pub nx: usize,
    /// Points along Y
    pub ny: usize,
    /// Cone constant
    n: f64,
    /// Scaled F constant (R * F)
    rf: f64,
    /// Polar radius of the first grid point
    rho1: f64,
    /// Projected coordinates of the first grid point
    origin: (f64, f64),
}

impl LambertConformal {
    /// Build a projection from GRIB2 grid parameters (all angles in degrees).
    #[allow(clippy::too_many_arguments)]
    pub fn from_grib2(
        lat1_deg: f64,
        lon1_deg: f64,
        lov_deg: f64,
        latin1_deg: f64,
        latin2_deg: f64,
        dx: f64,
        dy: f64,
        nx: usize,
        ny: usize,
    ) -> Self {
        let lat1 = lat1_deg.to_radians();
        let lon1 = lon1_deg.to_radians();
        let lov = lov_deg.to_radians();
        let latin1 = latin1_deg.to_radians();
        let latin2 = latin2_deg.to_radians();

        let n = if (latin1 - latin2).abs() < 1e-10 {
            latin1.sin()
        } else {
            (latin1.cos() / latin2.cos()).ln()
                / (half_colat_tan(latin2) / half_colat_tan(latin1)).ln()
        };
        let rf = EARTH_RADIUS * latin1.cos() * half_colat_tan(latin1).powf(n) / n;
        let rho1 = rf / half_colat_tan(lat1).powf(n);

        let theta1 = n * wrap_pi(lon1 - lov);
        let origin = (rho1 * theta1.sin(), rho1 - rho1 * theta1.cos());

        Self {
            lov,
            latin1,
            latin2,
            dx,
            dy,
            nx,
            ny,
            n,
            rf,
            rho1,
            origin,
        }
    }

    /// The operational HRRR CONUS grid (1799 x 1059, 3 km).
    pub fn hrrr() -> Self {
        Self::from_grib2(
            21.138123,   // La1
            -122.719528, // Lo1 (237.280472E)
            -97.5,       // LoV (262.5E)
            38.5,
            38.5,
            3000.0,
            3000.0,
            1799,
            1059,
        )
    }

    /// The HRRR grid keeping every `stride`-th point in each direction.
    ///
    /// Covers the same footprint with fewer, coarser cells.
    pub fn hrrr_thinned(stride: usize) -> Self {
        let stride = stride.max(1);
        let full = Self::hrrr();
        Self::from_grib2(
            21.138123,
            -122.719528,
            -97.5,
            38.5,
            38.5,
            full.dx * stride as f64,
            full.dy * stride as f64,
            (full.nx - 1) / stride + 1,
            (full.ny - 1) / stride + 1,
        )
    }

    /// Geographic (lat, lon) in degrees to fractional grid indices (i, j).
    pub fn geo_to_grid(&self, lat_deg: f64, lon_deg: f64) -> (f64, f64) {
        let lat = lat_deg.to_radians();
        let lon = lon_deg.to_radians();

        let rho = self.rf / half_colat_tan(lat).powf(self.n);
        let theta = self.n * wrap_pi(lon - self.lov);

        let x = rho * theta.sin();
        let y = self.rho1 - rho * theta.cos();

        ((x - self.origin.0) / self.dx, (y - self.origin.1) / self.dy)
    }

    /// Grid indices (i, j) to geographic (lat, lon) in degrees.
    ///
    /// Longitudes come back in `[-180, 180)`.
    pub fn grid_to_geo(&self, i: f64, j: f64) -> (f64, f64) {
        let x = self.origin.0 + i * self.dx;
        let y = self.origin.1 + j * self.dy;

        let dy = self.rho1 - y;
        let rho = (x * x + dy * dy).sqrt().copysign(self.n);
        let theta = (x / dy).atan();

        let lat = 2.0 * (self.rf / rho).powf(1.0 / self.n).atan() - FRAC_PI_2;
        let lon = wrap_pi(self.lov + theta / self.n);

        (lat.to_degrees(), lon.to_degrees())
    }

    /// Coordinates of every grid point, row-major with row 0 at j = 0.
    ///
    /// Returns (lat, lon) arrays of `nx * ny` entries each.
    pub fn grid_coordinates(&self) -> (Vec<f64>, Vec<f64>) {
        let mut lat = Vec::with_capacity(self.nx * self.ny);
        let mut lon = Vec::with_capacity(self.nx * self.ny);
        for j in 0..self.ny {
            for i in 0..self.nx {
                let (la, lo) = self.grid_to_geo(i as f64, j as f64);
                lat.push(la);
                lon.push(lo);
            }
        }
        (lat, lon)
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.nx, self.ny)
    }
}

/// tan(pi/4 + phi/2)
fn half_colat_tan(phi: f64) -> f64 {
    (FRAC_PI_4 + phi / 2.0).tan()
}

/// Wrap an angle into [-pi, pi).
fn wrap_pi(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped >= PI {
        wrapped - 2.0 * PI
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hrrr_first_grid_point() {
        let proj = LambertConformal::hrrr();
        let (i, j) = proj.geo_to_grid(21.138123, -122.719528);
        assert!(i.abs() < 0.1, "i should be ~0, got {}", i);
        assert!(j.abs() < 0.1, "j should be ~0, got {}", j);
    }

    #[test]
    fn test_hrrr_roundtrip() {
        let proj = LambertConformal::hrrr();
        let (lat, lon) = proj.grid_to_geo(900.0, 500.0);
        let (i, j) = proj.geo_to_grid(lat, lon);
        assert!((i - 900.0).abs() < 0.01, "i roundtrip failed: {}", i);
        assert!((j - 500.0).abs() < 0.01, "j roundtrip failed: {}", j);
    }

    #[test]
    fn test_kansas_city_is_central() {
        let (i, j) = LambertConformal::hrrr().geo_to_grid(39.0, -94.5);
        assert!(i > 700.0 && i < 1100.0, "i {}", i);
        assert!(j > 400.0 && j < 700.0, "j {}", j);
    }

    #[test]
    fn test_thinned_grid_shares_footprint() {
        let full = LambertConformal::hrrr();
        let thin = LambertConformal::hrrr_thinned(10);
        assert_eq!(thin.dimensions(), (180, 106));

        let (lat_a, lon_a) = full.grid_to_geo(1790.0, 1050.0);
        let (lat_b, lon_b) = thin.grid_to_geo(179.0, 105.0);
        assert!((lat_a - lat_b).abs() < 1e-6);
        assert!((lon_a - lon_b).abs() < 1e-6);
    }

    #[test]
    fn test_grid_coordinates_are_row_major() {
        let proj = LambertConformal::hrrr_thinned(100);
        let (lat, lon) = proj.grid_coordinates();
        assert_eq!(lat.len(), proj.nx * proj.ny);
        assert!((lat[0] - 21.138123).abs() < 1e-4);
        assert!((lon[0] + 122.719528).abs() < 1e-4);
        // latitude increases with j along the central column
        let mid = proj.nx / 2;
        assert!(lat[proj.nx + mid] > lat[mid]);
        assert!(lon.iter().all(|&l| (-180.0..180.0).contains(&l)));
    }

    #[test]
    fn test_wrap_pi() {
        assert!((wrap_pi(3.0 * PI / 2.0) + PI / 2.0).abs() < 1e-12);
        assert!((wrap_pi(-3.0 * PI / 2.0) - PI / 2.0).abs() < 1e-12);
        assert!((wrap_pi(0.25) - 0.25).abs() < 1e-12);
    }
}
