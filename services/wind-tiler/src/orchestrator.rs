//! Run orchestration.
//!
//! ```text
//!   clear output ──► spawn one chain per requested offset ──► join all ──► metadata ──► publish
//!                    resolve → fetch → reproject → encode → write
//! ```
//!
//! Chains share nothing mutable. Each writes into a per-run staging
//! directory and renames its files into the output directory only once the
//! whole chain succeeded: PNG, then pyramid tiles, then the sidecar. Metadata
//! is renamed last. A failed or cancelled run removes the staging directory.
//!
//! The output directory is wiped at the start of every run, so it must be
//! empty, absent, or carry [`OUTPUT_MARKER`] from an earlier run.

use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn, Span};
use uuid::Uuid;

use grid_processor::{reproject, ReprojectionConfig};
use ingestion::{FieldSource, VariableSet};
use renderer::{build_pyramid, encode, EncodingParams, PyramidConfig, PyramidTile};
use storage::{Publisher, StoragePath};
use wind_common::{
    resolve_cycle, CyclePolicy, DestinationGrid, LeadTime, ModelRun, NativeField, PipelineError,
    PipelineResult, PipelineStage, Resolution,
};

use crate::config::TilerConfig;
use crate::metadata::{
    artifact_stem, offset_label, EncodingRecord, FrameRecord, RunMetadata, TilesRecord,
    METADATA_FILE,
};

/// Directory, below the output directory, holding pyramid tiles.
pub const TILES_DIR: &str = "tiles";

/// Empty file marking a directory as tiler output.
pub const OUTPUT_MARKER: &str = ".wind-tiler";

/// Coarse run progress, observable through [`Orchestrator::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    /// Removing the previous run's output.
    Clearing,
    /// Per-offset chains in flight.
    Processing,
    Aggregating,
    Publishing,
    Done,
    Failed,
    Cancelled,
}

/// A requested offset that produced no tile.
#[derive(Debug)]
pub struct OffsetFailure {
    pub requested_offset: u32,
    pub model_run: ModelRun,
    pub lead_time: LeadTime,
    pub stage: PipelineStage,
    pub error: PipelineError,
}

impl fmt::Display for OffsetFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "offset {} (run {}, lead {}) failed while {}: {}",
            self.requested_offset, self.model_run, self.lead_time, self.stage, self.error
        )
    }
}

/// Outcome of a run that produced at least one tile.
#[derive(Debug)]
pub struct RunSummary {
    pub metadata: RunMetadata,
    /// Every file this run made visible in the output directory.
    pub artifacts: Vec<PathBuf>,
    pub failures: Vec<OffsetFailure>,
    /// Object keys written by the publisher.
    pub published: Vec<String>,
    pub publication_errors: Vec<PipelineError>,
}

impl RunSummary {
    /// Some requested offsets failed.
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Everything a per-offset chain needs, shared read-only across tasks.
struct OffsetContext {
    reference_time: DateTime<Utc>,
    /// Run whose date and cycle name every artifact.
    headline: ModelRun,
    cycle: CyclePolicy,
    grid: Arc<DestinationGrid>,
    reprojection: ReprojectionConfig,
    params: EncodingParams,
    alpha_mask: bool,
    pyramid: Option<PyramidConfig>,
    variables: VariableSet,
    source: Arc<dyn FieldSource>,
    staging: PathBuf,
    output_dir: PathBuf,
}

impl OffsetContext {
    fn resolve(&self, requested_offset: u32) -> Resolution {
        let target = self.reference_time + Duration::hours(requested_offset as i64);
        resolve_cycle(target, &self.cycle)
    }
}

/// A successful chain.
struct FrameOutput {
    record: FrameRecord,
    artifacts: Vec<PathBuf>,
}

/// Results of the CPU-bound stages.
struct Rendered {
    png: Vec<u8>,
    valid_fraction: f64,
    clamped_values: usize,
    tiles: Vec<PyramidTile>,
}

/// Drives resolve → fetch → reproject → encode across requested offsets.
pub struct Orchestrator {
    config: TilerConfig,
    grid: Arc<DestinationGrid>,
    params: EncodingParams,
    variables: VariableSet,
    source: Arc<dyn FieldSource>,
    publisher: Option<Arc<dyn Publisher>>,
    state: watch::Sender<RunState>,
}

impl Orchestrator {
    /// Validate `config` and build an orchestrator reading from `source`.
    pub fn new(config: TilerConfig, source: Arc<dyn FieldSource>) -> PipelineResult<Self> {
        config.validate()?;
        let params = config.encoding.params()?;
        let variables = VariableSet::from_names(&config.variables)?;
        let grid = Arc::new(config.destination_grid());
        let (state, _) = watch::channel(RunState::Idle);

        Ok(Self {
            config,
            grid,
            params,
            variables,
            source,
            publisher: None,
            state,
        })
    }

    /// Upload artifacts through `publisher` after each successful run.
    pub fn with_publisher(mut self, publisher: Arc<dyn Publisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn config(&self) -> &TilerConfig {
        &self.config
    }

    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.state.subscribe()
    }

    fn set_state(&self, state: RunState) {
        debug!(?state, "Run state");
        self.state.send_replace(state);
    }

    /// Run to completion.
    pub async fn run(&self, reference_time: DateTime<Utc>) -> PipelineResult<RunSummary> {
        self.run_until(reference_time, std::future::pending()).await
    }

    /// Run until done or until `shutdown` resolves, whichever is first.
    ///
    /// On cancellation in-flight chains are dropped, the staging directory is
    /// removed and [`PipelineError::Cancelled`] is returned. Files already
    /// promoted into the output directory are complete.
    pub async fn run_until<F>(
        &self,
        reference_time: DateTime<Utc>,
        shutdown: F,
    ) -> PipelineResult<RunSummary>
    where
        F: Future<Output = ()>,
    {
        let run_id = Uuid::new_v4();
        let staging = self.config.output_dir.join(format!(".staging-{}", run_id));

        let outcome = tokio::select! {
            result = self.execute(run_id, reference_time, &staging) => result,
            _ = shutdown => {
                warn!(%run_id, "Run cancelled");
                Err(PipelineError::Cancelled)
            }
        };

        if let Err(e) = &outcome {
            if let Err(cleanup) = remove_dir_if_exists(&staging).await {
                warn!(error = %cleanup, path = %staging.display(), "Failed to remove staging directory");
            }
            self.set_state(match e {
                PipelineError::Cancelled => RunState::Cancelled,
                _ => RunState::Failed,
            });
        }
        outcome
    }

    #[instrument(skip(self, staging), fields(model = %self.config.model))]
    async fn execute(
        &self,
        run_id: Uuid,
        reference_time: DateTime<Utc>,
        staging: &Path,
    ) -> PipelineResult<RunSummary> {
        let offsets = self.config.offsets();
        let output_dir = self.config.output_dir.clone();
        info!(
            offsets = ?offsets,
            reference_time = %reference_time,
            source = self.source.name(),
            "Starting wind tile run"
        );

        self.set_state(RunState::Clearing);
        ensure_clearable(&output_dir).await?;
        remove_dir_if_exists(&output_dir).await?;
        tokio::fs::create_dir_all(staging).await?;
        tokio::fs::write(output_dir.join(OUTPUT_MARKER), b"").await?;

        self.set_state(RunState::Processing);
        // Run current at the reference time; names every artifact.
        let headline = resolve_cycle(reference_time, &self.config.cycle).model_run;
        let ctx = Arc::new(OffsetContext {
            reference_time,
            headline,
            cycle: self.config.cycle,
            grid: self.grid.clone(),
            reprojection: self.config.reprojection,
            params: self.params,
            alpha_mask: self.config.encoding.alpha_mask,
            pyramid: self.config.pyramid,
            variables: self.variables.clone(),
            source: self.source.clone(),
            staging: staging.to_path_buf(),
            output_dir: output_dir.clone(),
        });

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_offsets));
        let mut tasks = JoinSet::new();
        for &offset in &offsets {
            let ctx = ctx.clone();
            let semaphore = semaphore.clone();
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                (offset, process_offset(&ctx, offset).await)
            });
        }

        let mut frames = Vec::new();
        let mut artifacts = Vec::new();
        let mut failures = Vec::new();
        let mut finished = BTreeSet::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((offset, Ok(frame))) => {
                    finished.insert(offset);
                    artifacts.extend(frame.artifacts);
                    frames.push(frame.record);
                }
                Ok((offset, Err(failure))) => {
                    finished.insert(offset);
                    warn!(
                        requested_offset = failure.requested_offset,
                        model_run = %failure.model_run,
                        lead_time = failure.lead_time.hours(),
                        stage = %failure.stage,
                        retryable = failure.error.is_retryable(),
                        error = %failure.error,
                        "Offset failed"
                    );
                    failures.push(failure);
                }
                Err(e) => error!(error = %e, "Offset task did not complete"),
            }
        }

        self.set_state(RunState::Aggregating);
        for &offset in offsets.iter().filter(|o| !finished.contains(o)) {
            let resolution = ctx.resolve(offset);
            failures.push(OffsetFailure {
                requested_offset: offset,
                model_run: resolution.model_run,
                lead_time: resolution.lead_time,
                stage: PipelineStage::Aggregating,
                error: PipelineError::Io("offset task aborted".to_string()),
            });
        }
        failures.sort_by_key(|f| f.requested_offset);

        let Some(metadata) = RunMetadata::new(
            run_id,
            &self.config.model,
            headline,
            frames,
            &failures,
            &self.grid,
            EncodingRecord::new(&self.params, self.config.encoding.alpha_mask),
        ) else {
            error!(attempted = offsets.len(), "No requested offset produced a tile");
            return Err(PipelineError::TotalFailure {
                attempted: offsets.len(),
            });
        };
        let metadata = metadata.with_tiles(self.config.pyramid.as_ref().map(TilesRecord::from));

        let staged = staging.join(METADATA_FILE);
        tokio::fs::write(&staged, serde_json::to_vec_pretty(&metadata)?).await?;
        let metadata_path = output_dir.join(METADATA_FILE);
        tokio::fs::rename(&staged, &metadata_path).await?;
        artifacts.push(metadata_path);
        remove_dir_if_exists(staging).await?;

        info!(
            model_run = %metadata.model_run,
            produced = ?metadata.forecast_hours,
            failed = failures.len(),
            "Wrote run metadata"
        );

        let mut summary = RunSummary {
            metadata,
            artifacts,
            failures,
            published: Vec::new(),
            publication_errors: Vec::new(),
        };

        if let Some(publisher) = &self.publisher {
            self.set_state(RunState::Publishing);
            self.publish(publisher.as_ref(), &mut summary).await;
        }

        self.set_state(RunState::Done);
        Ok(summary)
    }

    /// Upload every artifact. Failures are collected, never fatal.
    #[instrument(skip_all, fields(publisher = publisher.name()))]
    async fn publish(&self, publisher: &dyn Publisher, summary: &mut RunSummary) {
        let prefix = self
            .config
            .publish
            .as_ref()
            .map(|p| p.prefix.as_str())
            .unwrap_or_default();
        let run = summary.metadata.model_run;
        let output_dir = &self.config.output_dir;
        let tiles_dir = output_dir.join(TILES_DIR);

        let mut uploads: Vec<(PathBuf, String)> = summary
            .artifacts
            .iter()
            .filter(|path| !path.starts_with(&tiles_dir))
            .filter_map(|path| {
                let name = path.file_name()?.to_str()?;
                Some((path.clone(), StoragePath::wind_tile(prefix, &run, name)))
            })
            .collect();
        uploads.push((
            output_dir.join(METADATA_FILE),
            StoragePath::latest_metadata(prefix),
        ));

        for (path, key) in uploads {
            match publisher.publish_file(&path, &key).await {
                Ok(_) => summary.published.push(key),
                Err(e) => {
                    error!(key = %key, error = %e, "Publication failed");
                    summary.publication_errors.push(e.into());
                }
            }
        }

        if self.config.pyramid.is_some() && tiles_dir.is_dir() {
            let key = StoragePath::wind_tile(prefix, &run, TILES_DIR);
            match publisher.publish_directory(&tiles_dir, &key).await {
                Ok(_) => summary.published.push(key),
                Err(e) => {
                    error!(key = %key, error = %e, "Tile pyramid publication failed");
                    summary.publication_errors.push(e.into());
                }
            }
        }

        info!(
            published = summary.published.len(),
            failed = summary.publication_errors.len(),
            "Publication finished"
        );
    }
}

/// One requested offset: resolve, fetch, render off the async runtime,
/// then stage and promote the files.
#[instrument(
    skip(ctx),
    fields(requested_offset = offset, model_run = tracing::field::Empty, lead_time = tracing::field::Empty)
)]
async fn process_offset(ctx: &OffsetContext, offset: u32) -> Result<FrameOutput, OffsetFailure> {
    let resolution = ctx.resolve(offset);
    let span = Span::current();
    span.record("model_run", tracing::field::display(&resolution.model_run));
    span.record("lead_time", resolution.lead_time.hours());
    if resolution.fallback {
        warn!("No run within the horizon; using fallback cycle");
    }

    let fail = |stage: PipelineStage, error: PipelineError| OffsetFailure {
        requested_offset: offset,
        model_run: resolution.model_run,
        lead_time: resolution.lead_time,
        stage,
        error,
    };

    let field = ctx
        .source
        .fetch(&resolution.model_run, resolution.lead_time, &ctx.variables)
        .await
        .map_err(|e| fail(PipelineStage::Retrieving, e.into()))?;
    debug!(nx = field.nx, ny = field.ny, "Fetched native field");

    let grid = ctx.grid.clone();
    let reprojection = ctx.reprojection;
    let params = ctx.params;
    let alpha_mask = ctx.alpha_mask;
    let pyramid = ctx.pyramid;
    let rendered = tokio::task::spawn_blocking(move || {
        span.in_scope(|| {
            render(
                field,
                &grid,
                &reprojection,
                &params,
                alpha_mask,
                pyramid.as_ref(),
            )
        })
    })
    .await
    .map_err(|e| {
        fail(
            PipelineStage::Reprojecting,
            PipelineError::projection(format!("render worker failed: {}", e)),
        )
    })?
    .map_err(|(stage, e)| fail(stage, e))?;

    let stem = artifact_stem(&ctx.headline, offset);
    let record = FrameRecord {
        requested_offset: offset,
        forecast: offset_label(offset),
        file: format!("{}.png", stem),
        model_run: resolution.model_run,
        lead_time: resolution.lead_time,
        valid_time: resolution.model_run.valid_time(resolution.lead_time),
        valid_fraction: rendered.valid_fraction,
        clamped_values: rendered.clamped_values,
        fallback: resolution.fallback,
    };

    let artifacts = write_frame(ctx, offset, &stem, &record, &rendered)
        .await
        .map_err(|e| fail(PipelineStage::Writing, e))?;

    info!(
        file = %record.file,
        valid_pct = format!("{:.1}", record.valid_fraction * 100.0),
        "Offset complete"
    );
    Ok(FrameOutput { record, artifacts })
}

/// Reproject, encode and optionally cut the pyramid.
fn render(
    field: NativeField,
    grid: &DestinationGrid,
    reprojection: &ReprojectionConfig,
    params: &EncodingParams,
    alpha_mask: bool,
    pyramid: Option<&PyramidConfig>,
) -> Result<Rendered, (PipelineStage, PipelineError)> {
    let resampled = reproject(&field, grid, reprojection)
        .map_err(|e| (PipelineStage::Reprojecting, e.into()))?;
    drop(field);

    let encoding = |e: renderer::EncodingError| (PipelineStage::Encoding, PipelineError::from(e));
    let (tile, report) = encode(&resampled, params).map_err(encoding)?;
    let png = tile.to_png(alpha_mask).map_err(encoding)?;
    let tiles = match pyramid {
        Some(config) => build_pyramid(&tile, grid, config).map_err(encoding)?,
        None => Vec::new(),
    };

    Ok(Rendered {
        png,
        valid_fraction: resampled.valid_fraction(),
        clamped_values: report.out_of_range,
        tiles,
    })
}

/// Write a frame into staging, then rename it into the output directory.
async fn write_frame(
    ctx: &OffsetContext,
    offset: u32,
    stem: &str,
    record: &FrameRecord,
    rendered: &Rendered,
) -> PipelineResult<Vec<PathBuf>> {
    let png_name = format!("{}.png", stem);
    let sidecar_name = format!("{}.json", stem);
    tokio::fs::write(ctx.staging.join(&png_name), &rendered.png).await?;
    tokio::fs::write(
        ctx.staging.join(&sidecar_name),
        serde_json::to_vec_pretty(record)?,
    )
    .await?;

    let frame_tiles = Path::new(TILES_DIR).join(format!("f{}", offset_label(offset)));
    let mut tile_paths = Vec::with_capacity(rendered.tiles.len());
    for tile in &rendered.tiles {
        let relative = frame_tiles.join(tile.relative_path());
        let staged = ctx.staging.join(&relative);
        if let Some(parent) = staged.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&staged, &tile.png).await?;
        tile_paths.push(relative);
    }

    let staged_tiles = (!tile_paths.is_empty()).then_some(frame_tiles.as_path());
    let mut promoted = Vec::with_capacity(3);
    if let Err(e) = promote_frame(ctx, &png_name, staged_tiles, &sidecar_name, &mut promoted).await {
        discard(&promoted).await;
        return Err(e.into());
    }

    let mut artifacts = vec![
        ctx.output_dir.join(&png_name),
        ctx.output_dir.join(&sidecar_name),
    ];
    artifacts.extend(tile_paths.iter().map(|p| ctx.output_dir.join(p)));
    Ok(artifacts)
}

/// Rename a staged frame into the output directory. The sidecar goes last,
/// so its presence means the PNG and tiles are in place.
async fn promote_frame(
    ctx: &OffsetContext,
    png_name: &str,
    frame_tiles: Option<&Path>,
    sidecar_name: &str,
    promoted: &mut Vec<PathBuf>,
) -> std::io::Result<()> {
    let png = ctx.output_dir.join(png_name);
    tokio::fs::rename(ctx.staging.join(png_name), &png).await?;
    promoted.push(png);

    if let Some(frame_tiles) = frame_tiles {
        tokio::fs::create_dir_all(ctx.output_dir.join(TILES_DIR)).await?;
        let dest = ctx.output_dir.join(frame_tiles);
        tokio::fs::rename(ctx.staging.join(frame_tiles), &dest).await?;
        promoted.push(dest);
    }

    let sidecar = ctx.output_dir.join(sidecar_name);
    tokio::fs::rename(ctx.staging.join(sidecar_name), &sidecar).await?;
    promoted.push(sidecar);
    Ok(())
}

/// Best-effort removal of partially promoted files.
async fn discard(paths: &[PathBuf]) {
    for path in paths {
        let removed = match tokio::fs::symlink_metadata(path).await {
            Ok(meta) if meta.is_dir() => tokio::fs::remove_dir_all(path).await,
            Ok(_) => tokio::fs::remove_file(path).await,
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        };
        if let Err(e) = removed {
            warn!(path = %path.display(), error = %e, "Failed to remove partial frame");
        }
    }
}

/// Refuse to wipe a filesystem root or a non-empty directory this tool did
/// not create.
async fn ensure_clearable(dir: &Path) -> PipelineResult<()> {
    if dir.file_name().is_none() {
        return Err(PipelineError::config(format!(
            "refusing to clear output directory {:?}",
            dir
        )));
    }
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };
    if entries.next_entry().await?.is_none() {
        return Ok(());
    }
    if tokio::fs::try_exists(dir.join(OUTPUT_MARKER)).await? {
        Ok(())
    } else {
        Err(PipelineError::config(format!(
            "{} is not empty and has no {} marker; refusing to clear it",
            dir.display(),
            OUTPUT_MARKER
        )))
    }
}

async fn remove_dir_if_exists(path: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_dir_all(path).await {
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use wind_common::GeoBounds;

    fn lattice(nx: usize, ny: usize) -> NativeField {
        let mut lat = Vec::new();
        let mut lon = Vec::new();
        for j in 0..ny {
            for i in 0..nx {
                lat.push(30.0 + j as f64);
                lon.push(-100.0 + i as f64);
            }
        }
        let n = nx * ny;
        NativeField::new(nx, ny, lat, lon, vec![5.0; n], vec![-5.0; n])
    }

    #[test]
    fn test_render_reports_coverage() {
        let grid = DestinationGrid::new(GeoBounds::new(-100.0, -94.0, 30.0, 33.0), 7, 4);
        let rendered = render(
            lattice(4, 4),
            &grid,
            &ReprojectionConfig::default(),
            &EncodingParams::default(),
            false,
            None,
        )
        .unwrap();

        // Columns -96..-94 lie east of the native lattice.
        assert!((rendered.valid_fraction - 16.0 / 28.0).abs() < 1e-9);
        assert_eq!(rendered.clamped_values, 0);
        assert!(rendered.tiles.is_empty());
        assert_eq!(&rendered.png[1..4], b"PNG");
    }

    #[test]
    fn test_render_fails_in_reprojection_stage() {
        let mut field = lattice(2, 2);
        field.lat = vec![f64::NAN; 4];
        let grid = DestinationGrid::new(GeoBounds::new(-100.0, -99.0, 30.0, 31.0), 2, 2);
        let Err((stage, _)) = render(
            field,
            &grid,
            &ReprojectionConfig::default(),
            &EncodingParams::default(),
            false,
            None,
        ) else {
            panic!("render should fail without finite coordinates");
        };
        assert_eq!(stage, PipelineStage::Reprojecting);
    }

    #[test]
    fn test_offset_failure_display() {
        let failure = OffsetFailure {
            requested_offset: 3,
            model_run: ModelRun::new(Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap()),
            lead_time: LeadTime::new(4),
            stage: PipelineStage::Retrieving,
            error: PipelineError::Cancelled,
        };
        let text = failure.to_string();
        assert!(text.starts_with("offset 3 (run 2024-01-15T09:00Z, lead f04) failed while retrieving"));
    }

    fn context(output_dir: &Path) -> OffsetContext {
        let reference_time = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        OffsetContext {
            reference_time,
            headline: ModelRun::new(reference_time),
            cycle: CyclePolicy::default(),
            grid: Arc::new(DestinationGrid::conus()),
            reprojection: ReprojectionConfig::default(),
            params: EncodingParams::default(),
            alpha_mask: false,
            pyramid: None,
            variables: VariableSet::default(),
            source: Arc::new(ingestion::SyntheticSource::new(4)),
            staging: output_dir.join(".staging-test"),
            output_dir: output_dir.to_path_buf(),
        }
    }

    fn record(file: &str) -> FrameRecord {
        let run = ModelRun::new(Utc.with_ymd_and_hms(2024, 1, 15, 11, 0, 0).unwrap());
        FrameRecord {
            requested_offset: 0,
            forecast: offset_label(0),
            file: file.to_string(),
            model_run: run,
            lead_time: LeadTime::new(1),
            valid_time: run.valid_time(LeadTime::new(1)),
            valid_fraction: 1.0,
            clamped_values: 0,
            fallback: false,
        }
    }

    fn rendered_with_tile() -> Rendered {
        Rendered {
            png: vec![1, 2, 3],
            valid_fraction: 1.0,
            clamped_values: 0,
            tiles: vec![PyramidTile {
                z: 0,
                x: 0,
                y: 0,
                png: vec![4, 5, 6],
            }],
        }
    }

    #[tokio::test]
    async fn test_write_frame_promotes_sidecar_with_png_and_tiles() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        tokio::fs::create_dir_all(&ctx.staging).await.unwrap();

        let stem = "wind_20240115_t12z_f00";
        let artifacts = write_frame(&ctx, 0, stem, &record("x.png"), &rendered_with_tile())
            .await
            .unwrap();

        assert_eq!(artifacts.len(), 3);
        assert_eq!(std::fs::read(dir.path().join(format!("{stem}.png"))).unwrap(), vec![1, 2, 3]);
        assert!(dir.path().join(format!("{stem}.json")).is_file());
        assert!(dir.path().join("tiles/f00/0/0/0.png").is_file());
        assert!(!ctx.staging.join(format!("{stem}.png")).exists());
    }

    #[tokio::test]
    async fn test_failed_sidecar_rename_rolls_back_frame() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        tokio::fs::create_dir_all(&ctx.staging).await.unwrap();

        // A non-empty directory in the sidecar's place makes its rename fail.
        let stem = "wind_20240115_t12z_f00";
        std::fs::create_dir_all(dir.path().join(format!("{stem}.json/keep"))).unwrap();

        let result = write_frame(&ctx, 0, stem, &record("x.png"), &rendered_with_tile()).await;

        assert!(result.is_err());
        assert!(!dir.path().join(format!("{stem}.png")).exists());
        assert!(!dir.path().join("tiles/f00").exists());
        assert!(dir.path().join(format!("{stem}.json/keep")).is_dir());
    }

    #[tokio::test]
    async fn test_ensure_clearable() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        ensure_clearable(&out).await.unwrap();

        std::fs::create_dir_all(&out).unwrap();
        ensure_clearable(&out).await.unwrap();

        std::fs::write(out.join("notes.txt"), b"keep").unwrap();
        assert!(matches!(
            ensure_clearable(&out).await,
            Err(PipelineError::Config(_))
        ));

        std::fs::write(out.join(OUTPUT_MARKER), b"").unwrap();
        ensure_clearable(&out).await.unwrap();

        assert!(matches!(
            ensure_clearable(Path::new("/")).await,
            Err(PipelineError::Config(_))
        ));
        assert!(matches!(
            ensure_clearable(Path::new(".")).await,
            Err(PipelineError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_remove_missing_dir_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        remove_dir_if_exists(&dir.path().join("absent")).await.unwrap();
        assert!(dir.path().exists());
    }
}
