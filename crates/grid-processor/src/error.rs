//! Error types for grid processing.

use thiserror::Error;
use wind_common::PipelineError;

/// Errors that can occur while reprojecting a field.
#[derive(Error, Debug)]
pub enum GridProcessorError {
    /// Native arrays disagree with the declared shape, or are empty.
    #[error("invalid native field: {0}")]
    InvalidField(String),

    /// No native point has finite coordinates.
    #[error("native field has no finite coordinates")]
    NoSourcePoints,

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl GridProcessorError {
    /// Create an InvalidField error.
    pub fn invalid_field(msg: impl Into<String>) -> Self {
        Self::InvalidField(msg.into())
    }

    /// Create a ConfigError.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}

impl From<GridProcessorError> for PipelineError {
    fn from(err: GridProcessorError) -> Self {
        match err {
            GridProcessorError::ConfigError(msg) => PipelineError::Config(msg),
            other => PipelineError::ProjectionFailure(other.to_string()),
        }
    }
}

/// Result type for grid processor operations.
pub type Result<T> = std::result::Result<T, GridProcessorError>;
