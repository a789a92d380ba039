//! Error types for the retrieval pipeline.
//!
//! Per-pixel and per-cell numerical failures never surface here: they degrade to
//! no-data sentinels inside the retrieval core. These errors cover I/O, malformed
//! inputs and inconsistent configuration.

use thiserror::Error;

use crate::config::ConfigError;
use crate::readers::ReadError;

#[derive(Error, Debug)]
pub enum ScapeError {
    /// The lookup table could not be located or opened.
    #[error("lookup table error: {0}")]
    Lut(String),

    /// The lookup table payload does not follow the expected record layout.
    #[error("malformed lookup table {path}: {reason}")]
    LutFormat { path: String, reason: String },

    /// An input raster could not be read.
    #[error("raster error: {0}")]
    Raster(#[from] ReadError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Input rasters or tables disagree on their shape.
    #[error("{what}: expected {expected}, found {found}")]
    DimensionMismatch {
        what: String,
        expected: String,
        found: String,
    },

    /// An output product could not be written.
    #[error("output error: {0}")]
    Output(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ScapeError {
    pub fn lut_format(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::LutFormat {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn dimension_mismatch(
        what: impl Into<String>,
        expected: impl std::fmt::Display,
        found: impl std::fmt::Display,
    ) -> Self {
        Self::DimensionMismatch {
            what: what.into(),
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScapeError>;
