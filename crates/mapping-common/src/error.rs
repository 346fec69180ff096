//! Error types for the settlement-mapper pipeline.

use std::path::PathBuf;

use thiserror::Error;

use crate::crs::CrsParseError;
use crate::window::Window;

/// Result type alias using MappingError.
pub type MappingResult<T> = Result<T, MappingError>;

/// Primary error type shared by the pipeline crates.
#[derive(Debug, Error)]
pub enum MappingError {
    // === Fatal, surfaced before any work ===
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Validation failed for {path}: {field} is {observed}, expected {expected}")]
    Validation {
        path: PathBuf,
        field: String,
        expected: String,
        observed: String,
    },

    #[error("Projection error: {0}")]
    Projection(String),

    // === Per-window, recoverable ===
    #[error("Failed to read window {window} of {path}: {message}")]
    RasterRead {
        path: PathBuf,
        window: Window,
        message: String,
    },

    // === I/O and collaborators ===
    #[error("Failed to open raster {path}: {message}")]
    RasterOpen { path: PathBuf, message: String },

    #[error("Invalid vector data: {0}")]
    Vector(String),

    #[error("Classifier error: {0}")]
    Classifier(String),

    #[error("Image encoding error: {0}")]
    Image(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MappingError {
    /// Create a Configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a Projection error.
    pub fn projection(msg: impl Into<String>) -> Self {
        Self::Projection(msg.into())
    }

    /// Create a Validation error for a named raster property.
    pub fn validation(
        path: impl Into<PathBuf>,
        field: impl Into<String>,
        expected: impl ToString,
        observed: impl ToString,
    ) -> Self {
        Self::Validation {
            path: path.into(),
            field: field.into(),
            expected: expected.to_string(),
            observed: observed.to_string(),
        }
    }

    /// Whether the error only affects a single window and the raster loop may continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, MappingError::RasterRead { .. })
    }
}

impl From<CrsParseError> for MappingError {
    fn from(err: CrsParseError) -> Self {
        MappingError::Configuration(err.to_string())
    }
}
