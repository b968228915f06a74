//! Generated HRRR-shaped fields for tests and dry runs.

use std::collections::BTreeSet;

use async_trait::async_trait;
use projection::LambertConformal;
use tracing::{debug, instrument};
use wind_common::{LeadTime, ModelRun, NativeField};

use super::{normalize_longitudes, FieldSource};
use crate::error::{IngestionError, Result};
use crate::variables::VariableSet;

/// Deterministic wind on a (thinned) HRRR Lambert grid.
///
/// The pattern is a smooth function of position, cycle hour and lead time,
/// so repeated fetches return identical fields.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    projection: LambertConformal,
    unavailable: BTreeSet<u32>,
    positive_longitudes: bool,
}

impl SyntheticSource {
    /// HRRR footprint keeping every `stride`-th native point.
    pub fn new(stride: usize) -> Self {
        Self {
            projection: LambertConformal::hrrr_thinned(stride),
            unavailable: BTreeSet::new(),
            positive_longitudes: false,
        }
    }

    /// Report these lead times as not yet published.
    pub fn with_unavailable_leads(mut self, leads: impl IntoIterator<Item = u32>) -> Self {
        self.unavailable.extend(leads);
        self
    }

    /// Emit longitudes in `[0, 360)` before normalisation, as GRIB sources do.
    pub fn with_positive_longitudes(mut self) -> Self {
        self.positive_longitudes = true;
        self
    }

    pub fn dimensions(&self) -> (usize, usize) {
        self.projection.dimensions()
    }

    /// Wind at a point: a westerly jet varying with latitude plus a
    /// meridional wave, both drifting with valid hour.
    pub fn wind_at(lat: f64, lon: f64, valid_hour: u32) -> (f32, f32) {
        let phase = valid_hour as f64 * 0.25;
        let u = 12.0 * (lat.to_radians() * 4.0 + phase).cos() + 4.0;
        let v = 9.0 * (lon.to_radians() * 3.0 - phase).sin();
        (u as f32, v as f32)
    }
}

#[async_trait]
impl FieldSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    #[instrument(skip(self, _variables), fields(model_run = %run, lead_time = %lead))]
    async fn fetch(
        &self,
        run: &ModelRun,
        lead: LeadTime,
        _variables: &VariableSet,
    ) -> Result<NativeField> {
        if self.unavailable.contains(&lead.hours()) {
            return Err(IngestionError::unavailable(
                run,
                lead,
                "lead configured as unpublished",
            ));
        }

        let (lat, mut lon) = self.projection.grid_coordinates();
        if self.positive_longitudes {
            for value in lon.iter_mut().filter(|v| **v < 0.0) {
                *value += 360.0;
            }
        }
        normalize_longitudes(&mut lon);

        let valid_hour = run.cycle_hour() + lead.hours();
        let (u, v): (Vec<f32>, Vec<f32>) = lat
            .iter()
            .zip(&lon)
            .map(|(&la, &lo)| Self::wind_at(la, lo, valid_hour))
            .unzip();

        let (nx, ny) = self.projection.dimensions();
        debug!(nx, ny, "Generated synthetic field");
        Ok(NativeField::new(nx, ny, lat, lon, u, v))
    }
}
