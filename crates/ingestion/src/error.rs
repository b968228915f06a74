//! Error types for the ingestion crate.

use thiserror::Error;
use wind_common::{LeadTime, ModelRun, PipelineError};

/// Errors that can occur while fetching a native field.
#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("No data published for run {run} lead {lead}: {reason}")]
    Unavailable {
        run: ModelRun,
        lead: LeadTime,
        reason: String,
    },

    #[error("Variable {variable} missing for run {run} lead {lead}")]
    MissingVariable {
        variable: String,
        run: ModelRun,
        lead: LeadTime,
    },

    #[error("Invalid native field: {0}")]
    InvalidData(String),

    #[error("Failed to read file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl IngestionError {
    pub fn unavailable(run: &ModelRun, lead: LeadTime, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            run: *run,
            lead,
            reason: reason.into(),
        }
    }
}

impl From<IngestionError> for PipelineError {
    fn from(err: IngestionError) -> Self {
        match err {
            IngestionError::Unavailable { run, lead, reason } => {
                PipelineError::source_unavailable(run, lead.hours(), reason)
            }
            IngestionError::MissingVariable {
                variable,
                run,
                lead,
            } => PipelineError::source_unavailable(
                run,
                lead.hours(),
                format!("variable {} not published", variable),
            ),
            IngestionError::InvalidData(msg) => PipelineError::ProjectionFailure(msg),
            IngestionError::FileRead(e) => PipelineError::Io(e.to_string()),
            IngestionError::Manifest(e) => PipelineError::Serialization(e.to_string()),
            IngestionError::InvalidConfig(msg) => PipelineError::Config(msg),
        }
    }
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestionError>;
