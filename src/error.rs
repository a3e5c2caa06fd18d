//! Error types for nestlink.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, NestError>;

#[derive(Error, Debug)]
pub enum NestError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unrecognised file name {path}: {reason}")]
    InvalidFileName { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A condition the pipeline relies on does not hold. Never recovered.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

impl NestError {
    pub(crate) fn file_name(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        NestError::InvalidFileName {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
