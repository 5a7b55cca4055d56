//! Tool matching
//!
//! Assigns the physical tools of a drill layer to configured tool profiles.

use boardcam_core::{HitKind, Layer};
use boardcam_settings::{ProfileKind, ProfileMap, ToolProfileSpec};
use tracing::{debug, error};

/// Pick the profile that fits a tool of `diameter` best.
///
/// Profiles are visited in declaration order and a later profile only
/// replaces the current pick when it ranks strictly better, so ties go to
/// the profile declared first.
pub fn select_profile(diameter: f64, profiles: &ProfileMap) -> Option<&str> {
    let mut best: Option<(&str, &ToolProfileSpec)> = None;

    for (name, profile) in profiles.iter() {
        if profile.allowed_for_tool_size(diameter)
            && profile.is_better_match_than(diameter, best.map(|(_, spec)| spec))
        {
            best = Some((name.as_str(), profile));
        }
    }

    best.map(|(name, _)| name)
}

/// Tools assigned to one profile
#[derive(Debug, Clone, PartialEq)]
pub struct ToolAssignment {
    pub profile: String,
    /// Tool numbers in tool table order
    pub tools: Vec<u32>,
    /// Diameter of each tool in `tools`
    pub diameters: Vec<f64>,
}

impl ToolAssignment {
    fn new(profile: &str) -> Self {
        Self {
            profile: profile.to_string(),
            tools: Vec::new(),
            diameters: Vec::new(),
        }
    }
}

fn hit_kind(kind: ProfileKind) -> HitKind {
    match kind {
        ProfileKind::Drill => HitKind::Hole,
        ProfileKind::Slot => HitKind::Slot,
    }
}

/// Group the tools of `layer` that have `kind` hits by their best profile.
///
/// Tools without hits of that kind are skipped. Tools no profile accepts
/// are reported and left out. Groups are ordered by first assignment.
pub fn assign_tools(
    layer: &Layer,
    kind: ProfileKind,
    profiles: &ProfileMap,
) -> Vec<ToolAssignment> {
    let mut assignments: Vec<ToolAssignment> = Vec::new();

    for (&tool, &diameter) in &layer.tools {
        if layer.hit_count(tool, hit_kind(kind)) == 0 {
            debug!("Tool {} ({} dia) has no {} hits.", tool, diameter, kind);
            continue;
        }

        let Some(profile) = select_profile(diameter, profiles) else {
            error!(
                "Unable to find compatible {} profile for tool #{} having diameter {}; omitting from output.",
                kind, tool, diameter
            );
            continue;
        };

        debug!(
            "Assigning tool {} ({} dia) to {} process {}.",
            tool, diameter, kind, profile
        );
        let index = match assignments.iter().position(|a| a.profile == profile) {
            Some(index) => index,
            None => {
                assignments.push(ToolAssignment::new(profile));
                assignments.len() - 1
            }
        };
        assignments[index].tools.push(tool);
        assignments[index].diameters.push(diameter);
    }

    assignments
}
