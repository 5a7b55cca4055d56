//! Error types for the CAM tools crate.
//!
//! Generation fails on bad configuration or missing layers. Running the
//! generated script fails on a missing or broken FlatCAM installation.

use boardcam_core::LayerType;
use boardcam_settings::ConfigError;
use std::io;
use thiserror::Error;

/// Errors that can occur while generating or running a FlatCAM process.
#[derive(Error, Debug)]
pub enum CamToolError {
    /// The machining configuration is malformed or contradictory.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// A layer needed by a phase is missing or unreadable.
    #[error("Layer error: {0}")]
    Layer(#[from] boardcam_core::Error),

    /// The external CAM program exited with a failure status.
    #[error("{program} exited with status {status}")]
    Execution { program: String, status: i32 },

    /// No FlatCAM location has been saved yet.
    #[error("FlatCAM is not configured, run setup-flatcam first")]
    FlatcamNotConfigured,

    /// FlatCAM could not be started or does not support shell scripts.
    #[error("FlatCAM is unavailable: {0}")]
    FlatcamUnavailable(String),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
}

impl CamToolError {
    /// Shorthand for a missing layer error
    pub fn missing_layer(layer_type: LayerType) -> Self {
        Self::Layer(boardcam_core::Error::MissingLayer(layer_type))
    }

    /// Whether this error comes from the configuration
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Whether this error is a missing layer
    pub fn is_missing_layer(&self) -> bool {
        matches!(self, Self::Layer(err) if err.is_missing_layer())
    }
}

/// Result type for CAM tool operations.
pub type Result<T> = std::result::Result<T, CamToolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_layer_is_classified() {
        let err = CamToolError::missing_layer(LayerType::EdgeCuts);
        assert!(err.is_missing_layer());
        assert!(!err.is_configuration());
        assert!(err.to_string().contains("edge_cuts"));
    }

    #[test]
    fn test_execution_error_display() {
        let err = CamToolError::Execution {
            program: "python".to_string(),
            status: 2,
        };
        assert_eq!(err.to_string(), "python exited with status 2");
    }
}
