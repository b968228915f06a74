//! Storage error types.

use thiserror::Error;
use wind_common::PipelineError;

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to create object store client: {0}")]
    Client(String),

    #[error("Failed to write {path}: {message}")]
    Write { path: String, message: String },

    #[error("Local file error: {0}")]
    Local(String),
}

impl StorageError {
    pub fn write(path: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Write {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::Local(err.to_string())
    }
}

impl From<walkdir::Error> for StorageError {
    fn from(err: walkdir::Error) -> Self {
        Self::Local(err.to_string())
    }
}

impl From<StorageError> for PipelineError {
    fn from(err: StorageError) -> Self {
        PipelineError::PublicationFailure(err.to_string())
    }
}
