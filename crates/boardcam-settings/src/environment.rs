//! Environment settings
//!
//! Where FlatCAM lives on this machine. Persisted as TOML next to the user's
//! configurations; a missing file means nothing has been set up yet.

use crate::error::{SettingsError, SettingsResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Interpreter used when none is configured
pub const DEFAULT_PYTHON_BIN: &str = "python";

/// Per-machine settings for running FlatCAM
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Path to `FlatCAM.py`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flatcam_path: Option<PathBuf>,
    /// Python interpreter used to run FlatCAM
    #[serde(skip_serializing_if = "Option::is_none")]
    pub python_bin: Option<String>,
}

impl EnvironmentConfig {
    /// Location of the environment settings file
    pub fn default_path() -> SettingsResult<PathBuf> {
        Ok(crate::persistence::app_config_dir()?.join("config.toml"))
    }

    /// Load from the default location
    pub fn load() -> SettingsResult<Self> {
        Self::load_from_file(&Self::default_path()?)
    }

    /// Load from `path`, falling back to defaults when it does not exist
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        if !path.exists() {
            tracing::debug!("No environment settings at {}", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Save to the default location
    pub fn save(&self) -> SettingsResult<PathBuf> {
        let path = Self::default_path()?;
        self.save_to_file(&path)?;
        Ok(path)
    }

    /// Save to `path`, creating parent directories
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                SettingsError::ConfigDirectory(format!("{}: {}", parent.display(), e))
            })?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn python_bin(&self) -> &str {
        self.python_bin.as_deref().unwrap_or(DEFAULT_PYTHON_BIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = EnvironmentConfig::load_from_file(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, EnvironmentConfig::default());
        assert_eq!(config.python_bin(), "python");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = EnvironmentConfig {
            flatcam_path: Some(PathBuf::from("/opt/flatcam/FlatCAM.py")),
            python_bin: Some("python3".to_string()),
        };

        config.save_to_file(&path).unwrap();
        let loaded = EnvironmentConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.python_bin(), "python3");
    }
}
