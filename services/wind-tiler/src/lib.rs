//! Wind tile generation service.
//!
//! Resolves model cycles for a set of forecast offsets, retrieves native
//! wind fields, reprojects them onto a regular grid and writes 8-bit PNG
//! wind tiles plus run metadata, optionally publishing to object storage.

pub mod config;
pub mod metadata;
pub mod orchestrator;

use std::sync::Arc;

use anyhow::{Context, Result};

use ingestion::{DirectorySource, FieldSource, SyntheticSource};
use storage::{ObjectStorage, ObjectStorePublisher, Publisher};

pub use config::{PublishConfig, PublishTarget, SourceConfig, TilerConfig};
pub use metadata::{FrameRecord, RunMetadata, METADATA_FILE, NAMING_TEMPLATE};
pub use orchestrator::{
    OffsetFailure, Orchestrator, RunState, RunSummary, OUTPUT_MARKER, TILES_DIR,
};

/// Build the field source described by `config`.
pub fn build_source(config: &SourceConfig, model: &str) -> Arc<dyn FieldSource> {
    match config {
        SourceConfig::Directory { root } => Arc::new(DirectorySource::new(root, model)),
        SourceConfig::Synthetic {
            stride,
            unavailable_leads,
        } => Arc::new(
            SyntheticSource::new(*stride).with_unavailable_leads(unavailable_leads.iter().copied()),
        ),
    }
}

/// Build the publisher described by `config`. A local target's root is
/// created if missing.
pub fn build_publisher(config: &PublishConfig) -> Result<Arc<dyn Publisher>> {
    let storage = match &config.target {
        PublishTarget::S3(target) => ObjectStorage::new(&target.into())
            .context("Failed to create S3 client")?,
        PublishTarget::Local { root } => {
            std::fs::create_dir_all(root)
                .with_context(|| format!("Failed to create {}", root.display()))?;
            ObjectStorage::local(root)
                .with_context(|| format!("Failed to open local store at {}", root.display()))?
        }
    };
    Ok(Arc::new(ObjectStorePublisher::new(storage)))
}
