//! Config Persistence
//!
//! Loads machining configuration documents from disk and resolves them by
//! name. Documents may pull in other documents through `include`; included
//! documents are merged first and the including document is layered on top.
//!
//! Registered names come from, in increasing priority:
//! 1. the built-in documents shipped with boardcam
//! 2. the user's config directory
//! 3. any extra directories handed to [`ConfigRegistry::discover`]

use crate::config::ConfigDocument;
use crate::error::{ConfigError, SettingsError, SettingsResult};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// The bundled template, also written out by `generate-config`
pub const DEFAULT_TEMPLATE: &str = include_str!("../configs/default.yaml");

/// Built-in documents, by registered name
pub const BUILTIN_CONFIGS: &[(&str, &str)] = &[("default", DEFAULT_TEMPLATE)];

/// Directory for boardcam's own settings
pub fn app_config_dir() -> SettingsResult<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join("boardcam"))
        .ok_or_else(|| SettingsError::ConfigDirectory("no config directory on this platform".to_string()))
}

/// Directory holding the user's registered configurations
pub fn user_config_dir() -> SettingsResult<PathBuf> {
    Ok(app_config_dir()?.join("configs"))
}

/// Serialization format of a document, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Json,
    Toml,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> SettingsResult<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Ok(Self::Yaml),
            Some("json") => Ok(Self::Json),
            Some("toml") => Ok(Self::Toml),
            Some(other) => Err(SettingsError::UnsupportedFormat(other.to_string())),
            None => Err(SettingsError::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// Decode a document without validating it
    pub fn decode(&self, content: &str) -> Result<ConfigDocument, ConfigError> {
        if content.trim().is_empty() {
            return Ok(ConfigDocument::new());
        }
        match self {
            Self::Yaml => serde_yaml_ng::from_str(content).map_err(|e| ConfigError::Malformed(e.to_string())),
            Self::Json => serde_json::from_str(content).map_err(|e| ConfigError::Malformed(e.to_string())),
            Self::Toml => toml::from_str(content).map_err(|e| ConfigError::Malformed(e.to_string())),
        }
    }
}

/// Whether an include entry names a file rather than a registered config
fn is_file_reference(reference: &str) -> bool {
    matches!(
        Path::new(reference).extension().and_then(|ext| ext.to_str()),
        Some("yaml") | Some("yml")
    )
}

/// Read and validate a single document, without resolving its includes
pub fn read_document(path: &Path) -> SettingsResult<ConfigDocument> {
    let format = DocumentFormat::from_path(path)?;
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => SettingsError::ConfigNotFound(path.display().to_string()),
        _ => SettingsError::from(e),
    })?;
    let document = format
        .decode(&content)
        .map_err(|e| ConfigError::Malformed(format!("{}: {}", path.display(), e)))?;
    document.validate()?;
    Ok(document)
}

/// Where a registered configuration comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Builtin {
        name: &'static str,
        content: &'static str,
    },
    File(PathBuf),
}

impl ConfigSource {
    fn key(&self) -> String {
        match self {
            Self::Builtin { name, .. } => format!("builtin:{}", name),
            Self::File(path) => std::fs::canonicalize(path)
                .unwrap_or_else(|_| path.clone())
                .display()
                .to_string(),
        }
    }

    fn location(&self) -> PathBuf {
        match self {
            Self::Builtin { name, .. } => PathBuf::from(format!("<builtin>/{}.yaml", name)),
            Self::File(path) => path.clone(),
        }
    }
}

/// Registered configurations, by name
#[derive(Debug, Clone, Default)]
pub struct ConfigRegistry {
    entries: BTreeMap<String, ConfigSource>,
}

impl ConfigRegistry {
    /// A registry with nothing registered
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding only the built-in documents
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for &(name, content) in BUILTIN_CONFIGS {
            registry
                .entries
                .insert(name.to_string(), ConfigSource::Builtin { name, content });
        }
        registry
    }

    /// Built-ins, then the user config directory, then `extra_dirs`
    pub fn discover(extra_dirs: &[PathBuf]) -> SettingsResult<Self> {
        let user_dir = match user_config_dir() {
            Ok(dir) => Some(dir),
            Err(e) => {
                debug!("Skipping user configs: {}", e);
                None
            }
        };
        Self::discover_in(user_dir.as_deref(), extra_dirs)
    }

    /// Built-ins, then `user_dir` if there is one, then `extra_dirs`
    pub fn discover_in(user_dir: Option<&Path>, extra_dirs: &[PathBuf]) -> SettingsResult<Self> {
        let mut registry = Self::builtin();
        if let Some(dir) = user_dir {
            registry.scan_dir(dir)?;
        }
        for dir in extra_dirs {
            registry.scan_dir(dir)?;
        }
        Ok(registry)
    }

    /// Register every `.yaml`/`.yml` file in `dir`, overriding same names.
    ///
    /// A directory that does not exist registers nothing.
    pub fn scan_dir(&mut self, dir: &Path) -> SettingsResult<usize> {
        if !dir.is_dir() {
            debug!("Config directory {} does not exist", dir.display());
            return Ok(0);
        }

        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file())
            .collect();
        paths.sort();

        let mut count = 0;
        for path in paths {
            let name = path.file_stem().and_then(|stem| stem.to_str());
            if let (Some(name), true) = (name, is_file_reference(&path.to_string_lossy())) {
                debug!("Registered config '{}' at {}", name, path.display());
                self.entries.insert(name.to_string(), ConfigSource::File(path.clone()));
                count += 1;
            }
        }
        Ok(count)
    }

    /// Register a single file under `name`
    pub fn register_file(&mut self, name: impl Into<String>, path: impl Into<PathBuf>) {
        self.entries.insert(name.into(), ConfigSource::File(path.into()));
    }

    /// Registered names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn source(&self, name: &str) -> Option<&ConfigSource> {
        self.entries.get(name)
    }

    /// Load a registered configuration with its includes resolved
    pub fn load(&self, name: &str) -> SettingsResult<ConfigDocument> {
        let source = self
            .entries
            .get(name)
            .ok_or_else(|| SettingsError::ConfigNotFound(name.to_string()))?;
        self.load_source(source, &mut Vec::new())
    }

    /// Load a configuration file with its includes resolved
    pub fn load_file(&self, path: &Path) -> SettingsResult<ConfigDocument> {
        self.load_source(&ConfigSource::File(path.to_path_buf()), &mut Vec::new())
    }

    /// Load a reference given on the command line: a path if it names a
    /// file, otherwise a registered name
    pub fn resolve(&self, reference: &str) -> SettingsResult<ConfigDocument> {
        let path = Path::new(reference);
        if path.is_file() || (is_file_reference(reference) && !self.contains(reference)) {
            self.load_file(path)
        } else {
            self.load(reference)
        }
    }

    /// Resolve each reference and merge them left to right
    pub fn merged<S: AsRef<str>>(&self, references: &[S]) -> SettingsResult<ConfigDocument> {
        let documents = references
            .iter()
            .map(|reference| self.resolve(reference.as_ref()))
            .collect::<SettingsResult<Vec<_>>>()?;
        let merged = ConfigDocument::merge(&documents);
        info!(
            "Merged {} configuration(s): {} drill and {} slot profile(s)",
            documents.len(),
            merged.drill.len(),
            merged.slot.len()
        );
        Ok(merged)
    }

    fn load_source(
        &self,
        source: &ConfigSource,
        stack: &mut Vec<String>,
    ) -> SettingsResult<ConfigDocument> {
        let key = source.key();
        if stack.contains(&key) {
            return Err(SettingsError::IncludeCycle(source.location()));
        }
        stack.push(key);

        let (document, base_dir) = match source {
            ConfigSource::Builtin { name, content } => {
                let document = DocumentFormat::Yaml
                    .decode(content)
                    .map_err(|e| ConfigError::Malformed(format!("builtin '{}': {}", name, e)))?;
                document.validate()?;
                (document, None)
            }
            ConfigSource::File(path) => {
                debug!("Loading configuration from {}", path.display());
                (read_document(path)?, path.parent().map(Path::to_path_buf))
            }
        };

        let mut layers = Vec::with_capacity(document.include.len() + 1);
        for include in &document.include {
            let included = if is_file_reference(include) {
                let path = match &base_dir {
                    Some(dir) => dir.join(include),
                    None => PathBuf::from(include),
                };
                self.load_source(&ConfigSource::File(path), stack)?
            } else {
                let included = self
                    .entries
                    .get(include)
                    .ok_or_else(|| SettingsError::ConfigNotFound(include.clone()))?;
                self.load_source(included, stack)?
            };
            layers.push(included);
        }
        layers.push(document.clone());

        // The including document knows what it layers, so its own
        // description survives the merge.
        let mut merged = ConfigDocument::merge(&layers);
        merged.description = document.description;

        stack.pop();
        Ok(merged)
    }
}
