//! Run metadata and per-offset sidecar records.
//!
//! Every artifact of a run carries the run's headline date and cycle plus
//! the *requested* offset, so clients fill [`NAMING_TEMPLATE`] from
//! `metadata.json` alone. The run and lead time actually fetched for each
//! frame are recorded in its sidecar.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use renderer::{ChannelSpec, EncodingParams, PyramidConfig};
use wind_common::{DestinationGrid, LeadTime, ModelRun, PipelineStage};

use crate::orchestrator::OffsetFailure;

pub const METADATA_FILE: &str = "metadata.json";

/// How clients build a tile file name from `date`, `cycle` and an entry
/// of `forecast_hours`.
pub const NAMING_TEMPLATE: &str = "wind_{date}_t{cycle}z_f{forecast}.png";

/// `wind_{YYYYMMDD}_t{HH}z_f{kk}` for a run and requested offset.
pub fn artifact_stem(run: &ModelRun, requested_offset: u32) -> String {
    format!(
        "wind_{}_t{:02}z_f{:02}",
        run.date_label(),
        run.cycle_hour(),
        requested_offset
    )
}

/// Label used in `forecast_hours`, e.g. `01`.
pub fn offset_label(requested_offset: u32) -> String {
    format!("{:02}", requested_offset)
}

/// Sidecar written next to each tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub requested_offset: u32,
    pub forecast: String,
    pub file: String,
    pub model_run: ModelRun,
    pub lead_time: LeadTime,
    pub valid_time: DateTime<Utc>,
    pub valid_fraction: f64,
    /// Component values clamped into the encoding range.
    pub clamped_values: usize,
    /// True when the cycle resolver fell back to its fixed choice.
    pub fallback: bool,
}

/// One failed offset as reported in metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub requested_offset: u32,
    pub model_run: ModelRun,
    pub lead_time: LeadTime,
    pub stage: PipelineStage,
    pub kind: String,
    pub message: String,
    pub retryable: bool,
}

impl From<&OffsetFailure> for FailureRecord {
    fn from(f: &OffsetFailure) -> Self {
        Self {
            requested_offset: f.requested_offset,
            model_run: f.model_run,
            lead_time: f.lead_time,
            stage: f.stage,
            kind: f.error.kind().to_string(),
            message: f.error.to_string(),
            retryable: f.error.is_retryable(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodingRecord {
    pub channels: Vec<ChannelSpec>,
    pub scale: f64,
    pub alpha_mask: bool,
}

impl EncodingRecord {
    pub fn new(params: &EncodingParams, alpha_mask: bool) -> Self {
        Self {
            channels: params.channels(),
            scale: params.scale,
            alpha_mask,
        }
    }
}

/// XYZ pyramid location, present when tiles were cut.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TilesRecord {
    pub url_template: String,
    pub tile_size: usize,
    pub min_zoom: u32,
    pub max_zoom: u32,
}

impl From<&PyramidConfig> for TilesRecord {
    fn from(c: &PyramidConfig) -> Self {
        Self {
            url_template: "tiles/f{forecast}/{z}/{x}/{y}.png".to_string(),
            tile_size: c.tile_size,
            min_zoom: c.min_zoom,
            max_zoom: c.max_zoom,
        }
    }
}

/// Everything a client needs to locate and decode a run's tiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub run_id: Uuid,
    pub model: String,
    pub model_run: ModelRun,
    /// `YYYYMMDD` of `model_run`, the issuance date.
    pub date: String,
    /// Two-digit cycle hour of `model_run`.
    pub cycle: String,
    pub generated_at: DateTime<Utc>,
    /// Produced requested offsets, ascending.
    pub forecast_hours: Vec<String>,
    pub frames: Vec<FrameRecord>,
    pub grid: DestinationGrid,
    pub encoding: EncodingRecord,
    pub naming_template: String,
    pub failures: Vec<FailureRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tiles: Option<TilesRecord>,
}

impl RunMetadata {
    /// Build from successful frames, which must be non-empty.
    ///
    /// `model_run` is the headline run every artifact name was built from.
    pub fn new(
        run_id: Uuid,
        model: &str,
        model_run: ModelRun,
        frames: Vec<FrameRecord>,
        failures: &[OffsetFailure],
        grid: &DestinationGrid,
        encoding: EncodingRecord,
    ) -> Option<Self> {
        if frames.is_empty() {
            return None;
        }
        let mut frames = frames;
        frames.sort_by_key(|f| f.requested_offset);

        Some(Self {
            run_id,
            model: model.to_string(),
            model_run,
            date: model_run.date_label(),
            cycle: format!("{:02}", model_run.cycle_hour()),
            generated_at: Utc::now(),
            forecast_hours: frames.iter().map(|f| f.forecast.clone()).collect(),
            frames,
            grid: grid.clone(),
            encoding,
            naming_template: NAMING_TEMPLATE.to_string(),
            failures: failures.iter().map(FailureRecord::from).collect(),
            tiles: None,
        })
    }

    pub fn with_tiles(mut self, tiles: Option<TilesRecord>) -> Self {
        self.tiles = tiles;
        self
    }

    /// File name of a frame, per [`NAMING_TEMPLATE`].
    pub fn frame_file(&self, forecast: &str) -> String {
        NAMING_TEMPLATE
            .replace("{date}", &self.date)
            .replace("{cycle}", &self.cycle)
            .replace("{forecast}", forecast)
    }

    /// Requested offsets that produced a tile.
    pub fn produced_offsets(&self) -> Vec<u32> {
        self.frames.iter().map(|f| f.requested_offset).collect()
    }
}
