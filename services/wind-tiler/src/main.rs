//! Wind tile generator.
//!
//! Produces one 8-bit wind PNG per requested forecast offset plus a
//! `metadata.json` describing the run, then optionally publishes them.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Timelike, Utc};
use clap::Parser;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use wind_common::{parse_valid_time, PipelineError};
use wind_tiler::config::{parse_offsets, SourceConfig, TilerConfig};
use wind_tiler::{build_publisher, build_source, Orchestrator};

#[derive(Parser, Debug)]
#[command(name = "wind-tiler")]
#[command(about = "Generate 8-bit wind tiles from regional model forecasts")]
struct Args {
    /// YAML configuration file
    #[arg(short, long, env = "WIND_CONFIG")]
    config: Option<PathBuf>,

    /// Forecast offsets in hours, e.g. "0,1,2" or "0-3"
    #[arg(short, long)]
    forecast_hours: Option<String>,

    /// Reference time (ISO 8601, UTC if no zone); defaults to now
    #[arg(long)]
    valid_time: Option<String>,

    /// Output directory for tiles and metadata
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Read native fields from this directory
    #[arg(long, conflicts_with = "synthetic")]
    source_dir: Option<PathBuf>,

    /// Use generated fields instead of model data
    #[arg(long)]
    synthetic: bool,

    /// Write local artifacts only, skip publication
    #[arg(long)]
    dry_run: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Human-readable logs instead of JSON
    #[arg(long)]
    pretty_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args)?;

    info!("Starting wind tiler");

    let config = load_config(&args)?;
    let reference_time = match &args.valid_time {
        Some(s) => parse_valid_time(s).with_context(|| format!("Invalid --valid-time: {}", s))?,
        None => {
            let now = Utc::now();
            now.with_nanosecond(0).unwrap_or(now)
        }
    };

    let source = build_source(&config.source, &config.model);
    let publisher = match (&config.publish, args.dry_run) {
        (Some(publish), false) => Some(build_publisher(publish)?),
        (Some(_), true) => {
            info!("Dry run, publication skipped");
            None
        }
        (None, _) => None,
    };

    let mut orchestrator = Orchestrator::new(config, source).context("Invalid configuration")?;
    if let Some(publisher) = publisher {
        orchestrator = orchestrator.with_publisher(publisher);
    }

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
        info!("Received shutdown signal");
    };

    match orchestrator.run_until(reference_time, shutdown).await {
        Ok(summary) => {
            if summary.is_partial() {
                warn!(
                    produced = ?summary.metadata.forecast_hours,
                    failed = summary.failures.len(),
                    "Run finished with failed offsets"
                );
            }
            if !summary.publication_errors.is_empty() {
                warn!(
                    errors = summary.publication_errors.len(),
                    "Some artifacts were not published"
                );
            }
            info!(
                model_run = %summary.metadata.model_run,
                artifacts = summary.artifacts.len(),
                published = summary.published.len(),
                "Wind tiler finished"
            );
            Ok(())
        }
        Err(e @ PipelineError::TotalFailure { .. }) => {
            error!(error = %e, "Run produced no tiles");
            Err(e.into())
        }
        Err(e) => Err(anyhow::Error::new(e).context("Run failed")),
    }
}

fn init_tracing(args: &Args) -> Result<()> {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true);

    if args.pretty_logs {
        tracing::subscriber::set_global_default(builder.finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    }
    Ok(())
}

/// File and environment first, then command-line overrides.
fn load_config(args: &Args) -> Result<TilerConfig> {
    let mut config = TilerConfig::load(args.config.as_deref())?;

    if let Some(spec) = &args.forecast_hours {
        config.forecast_offsets =
            parse_offsets(spec).with_context(|| format!("Invalid --forecast-hours: {}", spec))?;
    }
    if let Some(dir) = &args.output {
        config.output_dir = dir.clone();
    }
    if let Some(root) = &args.source_dir {
        config.source = SourceConfig::Directory { root: root.clone() };
    } else if args.synthetic && !matches!(config.source, SourceConfig::Synthetic { .. }) {
        config.source = SourceConfig::default();
    }

    info!(
        model = %config.model,
        offsets = ?config.offsets(),
        output_dir = %config.output_dir.display(),
        publish = config.publish.is_some(),
        "Loaded configuration"
    );
    Ok(config)
}
