//! Error types for the settings crate.
//!
//! This module provides structured error types for machining configuration
//! validation, config file loading and environment settings persistence.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or saving settings.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// No registered configuration has this name.
    #[error("Config '{0}' not found")]
    ConfigNotFound(String),

    /// A configuration includes itself, directly or indirectly.
    #[error("Include cycle detected at {}", .0.display())]
    IncludeCycle(PathBuf),

    /// The file extension does not name a supported document format.
    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    /// The configuration directory could not be found or created.
    #[error("Config directory error: {0}")]
    ConfigDirectory(String),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// YAML serialization/deserialization error.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml_ng::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// TOML deserialization error.
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("TOML error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    /// The loaded document is not a valid machining configuration.
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Errors describing a malformed or contradictory machining configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A profile lists a sub-operation its kind does not support.
    #[error("{kind} profile '{profile}' does not support '{operation}' operations")]
    UnexpectedOperation {
        /// Name of the offending profile.
        profile: String,
        /// Profile kind (drill or slot).
        kind: String,
        /// The rejected sub-operation type.
        operation: String,
    },

    /// Multi-depth cutting was requested without a depth per pass.
    #[error("{section}: multi_depth requires depth_per_pass")]
    MissingDepthPerPass {
        /// Where the job spec lives in the document.
        section: String,
    },

    /// A value is present but unusable.
    #[error("{section}: {reason}")]
    InvalidValue {
        /// Where the value lives in the document.
        section: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The document could not be decoded into a configuration.
    #[error("{0}")]
    Malformed(String),
}

/// Result type alias for settings operations.
pub type SettingsResult<T> = Result<T, SettingsError>;

/// Result type alias for configuration validation.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_error_display() {
        let err = SettingsError::ConfigNotFound("two-sided".to_string());
        assert_eq!(err.to_string(), "Config 'two-sided' not found");

        let err = SettingsError::UnsupportedFormat("ini".to_string());
        assert_eq!(err.to_string(), "Unsupported config format: ini");
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::UnexpectedOperation {
            profile: "small".to_string(),
            kind: "slot".to_string(),
            operation: "cnc_drill".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "slot profile 'small' does not support 'cnc_drill' operations"
        );

        let err = ConfigError::MissingDepthPerPass {
            section: "edge_cuts".to_string(),
        };
        assert_eq!(err.to_string(), "edge_cuts: multi_depth requires depth_per_pass");
    }

    #[test]
    fn test_error_conversion() {
        let config_err = ConfigError::Malformed("missing field `cut_z`".to_string());
        let settings_err: SettingsError = config_err.into();
        assert!(matches!(settings_err, SettingsError::Config(_)));

        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let settings_err: SettingsError = io_err.into();
        assert!(matches!(settings_err, SettingsError::IoError(_)));
    }
}
