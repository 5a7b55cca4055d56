//! Tool profiles
//!
//! A tool profile binds an ordered list of [`ProfileOperation`]s to the
//! physical tools it applies to, either by explicit diameter or by a
//! diameter range. When several profiles accept a tool, the ranking rule in
//! [`ToolProfileSpec::is_better_match_than`] picks one.

use crate::error::{ConfigError, ConfigResult};
use crate::job::ProfileOperation;
use serde::{Deserialize, Serialize};

/// Upper end of a range that declares only `min_size`
pub const DEFAULT_MAX_SIZE: f64 = 999.0;

/// Two diameters closer than this are the same size
pub const SIZE_TOLERANCE: f64 = 1e-6;

/// Which layer records a profile applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileKind {
    /// Round holes; runs `cnc_drill` and `mill_holes`
    Drill,
    /// Slots; runs `mill_slots`
    Slot,
}

impl ProfileKind {
    /// Whether a profile of this kind may run `operation`
    pub fn allows(&self, operation: &ProfileOperation) -> bool {
        match self {
            Self::Drill => matches!(
                operation,
                ProfileOperation::CncDrill(_) | ProfileOperation::MillHoles(_)
            ),
            Self::Slot => matches!(operation, ProfileOperation::MillSlots(_)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Drill => "drill",
            Self::Slot => "slot",
        }
    }
}

impl std::fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Named bucket of operations for tools of matching size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolProfileSpec {
    /// Diameters this profile always accepts
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sizes: Vec<f64>,
    /// Lower end of the accepted range (inclusive)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_size: Option<f64>,
    /// Upper end of the accepted range (inclusive)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_size: Option<f64>,
    /// Operations run, in order, on every tool assigned to this profile
    pub specs: Vec<ProfileOperation>,
}

impl ToolProfileSpec {
    pub fn min_size(&self) -> f64 {
        self.min_size.unwrap_or(0.0)
    }

    pub fn max_size(&self) -> f64 {
        self.max_size.unwrap_or(DEFAULT_MAX_SIZE)
    }

    pub fn range(&self) -> (f64, f64) {
        (self.min_size(), self.max_size())
    }

    pub fn range_center(&self) -> f64 {
        self.min_size() + (self.max_size() - self.min_size()) / 2.0
    }

    /// Whether the document declared a range at all
    pub fn has_range(&self) -> bool {
        self.min_size.is_some() || self.max_size.is_some()
    }

    /// Whether `diameter` is one of the explicit sizes
    pub fn has_exact_size(&self, diameter: f64) -> bool {
        self.sizes
            .iter()
            .any(|size| (size - diameter).abs() < SIZE_TOLERANCE)
    }

    pub fn allowed_for_tool_size(&self, diameter: f64) -> bool {
        if self.has_exact_size(diameter) {
            return true;
        }
        self.has_range() && self.min_size() <= diameter && diameter <= self.max_size()
    }

    /// Ranking between two candidate profiles for the same tool.
    ///
    /// An explicit size match beats a range match. Between two of the same
    /// sort, the profile whose range center lies closer to `diameter` wins;
    /// equal distance is not better. Any profile beats no candidate.
    pub fn is_better_match_than(&self, diameter: f64, other: Option<&ToolProfileSpec>) -> bool {
        let Some(other) = other else {
            return true;
        };

        let exact = self.has_exact_size(diameter);
        if exact != other.has_exact_size(diameter) {
            return exact;
        }

        (diameter - self.range_center()).abs() < (diameter - other.range_center()).abs()
    }

    /// Check the profile as a `kind` profile called `name`
    pub fn validate(&self, kind: ProfileKind, name: &str) -> ConfigResult<()> {
        let section = format!("{}.{}", kind, name);

        if self.min_size() > self.max_size() {
            return Err(ConfigError::InvalidValue {
                section,
                reason: format!(
                    "min_size {} is larger than max_size {}",
                    self.min_size(),
                    self.max_size()
                ),
            });
        }

        for (idx, operation) in self.specs.iter().enumerate() {
            if !kind.allows(operation) {
                return Err(ConfigError::UnexpectedOperation {
                    profile: name.to_string(),
                    kind: kind.to_string(),
                    operation: operation.type_name().to_string(),
                });
            }
            operation
                .job()
                .validate(&format!("{}.specs[{}]", section, idx))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{JobSpec, MillHolesJobSpec, MillSlotsJobSpec};

    fn job(tool_size: f64) -> JobSpec {
        JobSpec {
            tool_size,
            cut_z: -1.8,
            travel_z: 2.0,
            feed_rate: 60.0,
            spindle_speed: 12000,
            multi_depth: false,
            depth_per_pass: None,
        }
    }

    fn profile(sizes: Vec<f64>, min: Option<f64>, max: Option<f64>) -> ToolProfileSpec {
        ToolProfileSpec {
            sizes,
            min_size: min,
            max_size: max,
            specs: vec![ProfileOperation::MillHoles(MillHolesJobSpec { job: job(0.8) })],
        }
    }

    #[test]
    fn test_explicit_size_only() {
        let p = profile(vec![0.8], None, None);
        assert!(p.allowed_for_tool_size(0.8));
        assert!(!p.allowed_for_tool_size(0.801));
        assert!(!p.has_range());
    }

    #[test]
    fn test_range_is_inclusive() {
        let p = profile(vec![], Some(0.5), Some(1.0));
        assert!(p.allowed_for_tool_size(0.5));
        assert!(p.allowed_for_tool_size(1.0));
        assert!(!p.allowed_for_tool_size(1.01));
        assert!(!p.allowed_for_tool_size(0.49));
        assert_eq!(p.range_center(), 0.75);
    }

    #[test]
    fn test_open_ended_range_uses_defaults() {
        let p = profile(vec![], Some(2.0), None);
        assert_eq!(p.range(), (2.0, DEFAULT_MAX_SIZE));
        assert!(p.allowed_for_tool_size(50.0));

        let p = profile(vec![], None, Some(1.0));
        assert_eq!(p.range(), (0.0, 1.0));
        assert!(p.allowed_for_tool_size(0.1));
    }

    #[test]
    fn test_exact_match_beats_range_either_way() {
        let exact = profile(vec![0.8], None, None);
        let range = profile(vec![], Some(0.5), Some(1.0));

        assert!(exact.is_better_match_than(0.8, Some(&range)));
        assert!(!range.is_better_match_than(0.8, Some(&exact)));
    }

    #[test]
    fn test_closer_center_wins() {
        let narrow = profile(vec![], Some(0.7), Some(0.9));
        let wide = profile(vec![], Some(0.0), Some(3.0));

        assert!(narrow.is_better_match_than(0.8, Some(&wide)));
        assert!(!wide.is_better_match_than(0.8, Some(&narrow)));
        assert!(!narrow.is_better_match_than(0.8, Some(&narrow.clone())));
        assert!(wide.is_better_match_than(0.8, None));
    }

    #[test]
    fn test_slot_profile_rejects_drill_operations() {
        let p = profile(vec![], Some(0.5), Some(1.0));
        assert_eq!(
            p.validate(ProfileKind::Slot, "small"),
            Err(ConfigError::UnexpectedOperation {
                profile: "small".to_string(),
                kind: "slot".to_string(),
                operation: "mill_holes".to_string(),
            })
        );
        assert!(p.validate(ProfileKind::Drill, "small").is_ok());
    }

    #[test]
    fn test_drill_profile_rejects_slot_operations() {
        let mut p = profile(vec![], Some(0.5), Some(1.0));
        p.specs = vec![ProfileOperation::MillSlots(MillSlotsJobSpec { job: job(0.8) })];
        assert!(matches!(
            p.validate(ProfileKind::Drill, "slotty"),
            Err(ConfigError::UnexpectedOperation { .. })
        ));
        assert!(p.validate(ProfileKind::Slot, "slotty").is_ok());
    }

    #[test]
    fn test_inverted_range_is_invalid() {
        let p = profile(vec![], Some(2.0), Some(1.0));
        assert!(matches!(
            p.validate(ProfileKind::Drill, "odd"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
