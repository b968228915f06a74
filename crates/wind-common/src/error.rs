//! Error types for the wind tile pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using PipelineError.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Primary error type for pipeline operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    // === Retrieval Errors ===
    #[error("Source unavailable for run {model_run} lead f{lead_time:02}: {reason}")]
    SourceUnavailable {
        model_run: String,
        lead_time: u32,
        reason: String,
    },

    // === Processing Errors ===
    #[error("Projection failure: {0}")]
    ProjectionFailure(String),

    /// Reported after clamping; never returned as a failure by the encoder.
    #[error("Encoding range exceeded: {clamped} of {total} values clamped")]
    EncodingRangeExceeded { clamped: usize, total: usize },

    // === Output Errors ===
    #[error("Publication failure: {0}")]
    PublicationFailure(String),

    #[error("Total failure: none of {attempted} requested offsets produced a tile")]
    TotalFailure { attempted: usize },

    // === Infrastructure Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Run cancelled")]
    Cancelled,
}

impl PipelineError {
    pub fn source_unavailable(
        model_run: impl fmt::Display,
        lead_time: u32,
        reason: impl Into<String>,
    ) -> Self {
        Self::SourceUnavailable {
            model_run: model_run.to_string(),
            lead_time,
            reason: reason.into(),
        }
    }

    pub fn projection(msg: impl Into<String>) -> Self {
        Self::ProjectionFailure(msg.into())
    }

    pub fn publication(msg: impl Into<String>) -> Self {
        Self::PublicationFailure(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether a collaborator may retry the operation that produced this error.
    ///
    /// The pipeline itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PipelineError::SourceUnavailable { .. } | PipelineError::PublicationFailure(_)
        )
    }

    /// Short machine-readable kind, used in failure reports.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::SourceUnavailable { .. } => "SourceUnavailable",
            PipelineError::ProjectionFailure(_) => "ProjectionFailure",
            PipelineError::EncodingRangeExceeded { .. } => "EncodingRangeExceeded",
            PipelineError::PublicationFailure(_) => "PublicationFailure",
            PipelineError::TotalFailure { .. } => "TotalFailure",
            PipelineError::Config(_) => "Config",
            PipelineError::Io(_) => "Io",
            PipelineError::Serialization(_) => "Serialization",
            PipelineError::Cancelled => "Cancelled",
        }
    }
}

/// Stage of the per-offset chain at which a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Resolving,
    Retrieving,
    Reprojecting,
    Encoding,
    Writing,
    Aggregating,
    Publishing,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineStage::Resolving => "resolving",
            PipelineStage::Retrieving => "retrieving",
            PipelineStage::Reprojecting => "reprojecting",
            PipelineStage::Encoding => "encoding",
            PipelineStage::Writing => "writing",
            PipelineStage::Aggregating => "aggregating",
            PipelineStage::Publishing => "publishing",
        };
        f.write_str(s)
    }
}

// Conversion from common error types
impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Serialization(format!("JSON error: {}", err))
    }
}
