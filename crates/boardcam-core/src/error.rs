//! Error handling for boardcam layer data
//!
//! Covers the failures that can happen while resolving board layers:
//! - a layer required by a machining phase is absent
//! - a file in the board directory cannot be classified
//! - a layer file cannot be read or scanned
//!
//! All error types use `thiserror` for ergonomic error handling.

use crate::layer::LayerType;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for board layer handling
#[derive(Error, Debug)]
pub enum Error {
    /// A phase needs a layer the board does not provide
    #[error("Missing layer: {} ({})", .0, .0.as_str())]
    MissingLayer(LayerType),

    /// File name does not map to any known layer
    #[error("Unable to guess layer type for {0}")]
    UnknownLayerType(String),

    /// Layer file content could not be scanned
    #[error("Failed to read layer {}: {}", .path.display(), .reason)]
    LayerParse {
        /// The file that failed.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a layer scan error for `path`
    pub fn layer_parse(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::LayerParse {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Check if this is a missing layer error
    pub fn is_missing_layer(&self) -> bool {
        matches!(self, Error::MissingLayer(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
