//! Machining configuration documents
//!
//! A [`ConfigDocument`] describes how a board is machined:
//! - alignment holes, isolation routing and board cutout (at most one each)
//! - named drill and slot tool profiles
//!
//! Documents are layered: later documents override the singleton sections
//! of earlier ones and add to or replace their named profiles.

use crate::error::{ConfigError, ConfigResult};
use crate::job::{AlignmentHolesJobSpec, BoardCutoutJobSpec, IsolationRoutingJobSpec};
use crate::profile::{ProfileKind, ToolProfileSpec};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

/// Profiles by name, in declaration order
pub type ProfileMap = IndexMap<String, ToolProfileSpec>;

/// A bare `drill:` or `slot:` key is an empty map
fn profiles_or_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ProfileMap, D::Error> {
    Ok(Option::<ProfileMap>::deserialize(deserializer)?.unwrap_or_default())
}

/// One machining configuration document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigDocument {
    /// Free text shown when listing configurations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Documents merged in before this one (file paths or registered names)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alignment_holes: Option<AlignmentHolesJobSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isolation_routing: Option<IsolationRoutingJobSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edge_cuts: Option<BoardCutoutJobSpec>,
    #[serde(
        skip_serializing_if = "IndexMap::is_empty",
        deserialize_with = "profiles_or_empty"
    )]
    pub drill: ProfileMap,
    #[serde(
        skip_serializing_if = "IndexMap::is_empty",
        deserialize_with = "profiles_or_empty"
    )]
    pub slot: ProfileMap,
}

impl ConfigDocument {
    /// The empty document; merging starts from here
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode and validate a YAML document
    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let document: Self = serde_yaml_ng::from_str(content)
            .map_err(|e| ConfigError::Malformed(e.to_string()))?;
        document.validate()?;
        Ok(document)
    }

    /// Layer `right` over `self`.
    ///
    /// Singleton sections present in `right` replace ours, profile maps are
    /// merged key-wise, and the description is dropped. Includes are not
    /// carried; they are resolved before merging.
    pub fn combine(&self, right: &ConfigDocument) -> ConfigDocument {
        let mut merged = self.clone();

        if let Some(spec) = &right.alignment_holes {
            merged.alignment_holes = Some(spec.clone());
        }
        if let Some(spec) = &right.isolation_routing {
            merged.isolation_routing = Some(spec.clone());
        }
        if let Some(spec) = &right.edge_cuts {
            merged.edge_cuts = Some(spec.clone());
        }

        // A redeclared profile keeps its original position
        merged.drill.extend(right.drill.clone());
        merged.slot.extend(right.slot.clone());

        merged.description = None;
        merged.include.clear();
        merged
    }

    /// Fold `documents` left to right over the empty document
    pub fn merge<'a, I>(documents: I) -> ConfigDocument
    where
        I: IntoIterator<Item = &'a ConfigDocument>,
    {
        documents
            .into_iter()
            .fold(ConfigDocument::new(), |merged, document| merged.combine(document))
    }

    /// Profiles of the given kind
    pub fn profiles(&self, kind: ProfileKind) -> &ProfileMap {
        match kind {
            ProfileKind::Drill => &self.drill,
            ProfileKind::Slot => &self.slot,
        }
    }

    /// Whether the document configures nothing at all
    pub fn is_empty(&self) -> bool {
        self.alignment_holes.is_none()
            && self.isolation_routing.is_none()
            && self.edge_cuts.is_none()
            && self.drill.is_empty()
            && self.slot.is_empty()
    }

    /// Check every section and profile
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(spec) = &self.alignment_holes {
            spec.job.validate("alignment_holes")?;
            if spec.hole_size <= 0.0 {
                return Err(ConfigError::InvalidValue {
                    section: "alignment_holes".to_string(),
                    reason: format!("hole_size must be > 0, got {}", spec.hole_size),
                });
            }
        }
        if let Some(spec) = &self.isolation_routing {
            spec.job.validate("isolation_routing")?;
            if spec.pass_count() == 0 {
                return Err(ConfigError::InvalidValue {
                    section: "isolation_routing".to_string(),
                    reason: "passes must be at least 1".to_string(),
                });
            }
        }
        if let Some(spec) = &self.edge_cuts {
            spec.job.validate("edge_cuts")?;
        }

        for kind in [ProfileKind::Drill, ProfileKind::Slot] {
            for (name, profile) in self.profiles(kind).iter() {
                profile.validate(kind, name)?;
            }
        }

        Ok(())
    }
}
