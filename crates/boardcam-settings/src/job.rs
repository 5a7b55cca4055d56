//! Job specifications
//!
//! A job specification holds the numeric parameters of one machining
//! operation. [`JobSpec`] carries the fields every operation shares; the
//! other types embed it (flattened in the document) and add what their
//! operation needs.

use crate::error::{ConfigError, ConfigResult};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

fn is_false(value: &bool) -> bool {
    !*value
}

fn default_pass_overlap() -> f64 {
    1.0
}

/// Parameters shared by every machining operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    /// Cutter diameter (mm)
    pub tool_size: f64,
    /// Depth of the cut (mm, negative is into the material)
    pub cut_z: f64,
    /// Safe height for moves between cuts (mm)
    pub travel_z: f64,
    /// Feed rate (mm/min)
    pub feed_rate: f64,
    /// Spindle speed (RPM)
    #[serde(deserialize_with = "deserialize_whole_number")]
    pub spindle_speed: u32,
    /// Reach `cut_z` over several passes
    #[serde(default, skip_serializing_if = "is_false")]
    pub multi_depth: bool,
    /// Depth of each pass when cutting in several passes (mm)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth_per_pass: Option<f64>,
}

impl JobSpec {
    /// Depth per pass to hand to the CAM job, if the job is cut in passes
    pub fn pass_depth(&self) -> Option<f64> {
        match self.depth_per_pass {
            Some(dpp) if self.multi_depth || dpp != 0.0 => Some(dpp),
            _ => None,
        }
    }

    /// Check the parameters; `section` names the spec in error messages
    pub fn validate(&self, section: &str) -> ConfigResult<()> {
        if self.multi_depth && self.depth_per_pass.is_none() {
            return Err(ConfigError::MissingDepthPerPass {
                section: section.to_string(),
            });
        }
        if self.tool_size <= 0.0 {
            return Err(ConfigError::InvalidValue {
                section: section.to_string(),
                reason: format!("tool_size must be > 0, got {}", self.tool_size),
            });
        }
        if let Some(dpp) = self.depth_per_pass {
            if dpp < 0.0 {
                return Err(ConfigError::InvalidValue {
                    section: section.to_string(),
                    reason: format!("depth_per_pass must not be negative, got {}", dpp),
                });
            }
        }
        Ok(())
    }
}

/// Mill round holes with an end mill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MillHolesJobSpec {
    #[serde(flatten)]
    pub job: JobSpec,
}

/// Mill slots with an end mill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MillSlotsJobSpec {
    #[serde(flatten)]
    pub job: JobSpec,
}

/// Plunge holes with a drill bit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrillHolesJobSpec {
    #[serde(flatten)]
    pub job: JobSpec,
    /// Drilling depth (mm); falls back to `cut_z`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drill_z: Option<f64>,
}

impl DrillHolesJobSpec {
    pub fn drill_depth(&self) -> f64 {
        self.drill_z.unwrap_or(self.job.cut_z)
    }
}

/// Isolation routing around copper features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationRoutingJobSpec {
    #[serde(flatten)]
    pub job: JobSpec,
    /// Number of isolation passes; fractions are dropped
    pub passes: f64,
    /// Overlap between passes, as a fraction of the tool diameter
    #[serde(default = "default_pass_overlap")]
    pub pass_overlap: f64,
}

impl IsolationRoutingJobSpec {
    /// Whole passes handed to the isolate command
    pub fn pass_count(&self) -> u32 {
        self.passes.trunc().clamp(0.0, f64::from(u32::MAX)) as u32
    }
}

/// Cut the board out of the stock, leaving holding tabs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardCutoutJobSpec {
    #[serde(flatten)]
    pub job: JobSpec,
    /// Distance between the outline and the cut (mm)
    pub margin: f64,
    /// Width of each holding tab (mm)
    pub gap_size: f64,
    /// Tab placement, e.g. `tb`, `lr`, `4`
    #[serde(deserialize_with = "deserialize_gaps")]
    pub gaps: String,
}

/// Axis the back side is flipped about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MirrorAxis {
    #[serde(alias = "x")]
    X,
    #[serde(alias = "y")]
    Y,
}

impl Default for MirrorAxis {
    fn default() -> Self {
        Self::X
    }
}

impl std::fmt::Display for MirrorAxis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::X => write!(f, "X"),
            Self::Y => write!(f, "Y"),
        }
    }
}

/// Alignment holes for registering the second side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentHolesJobSpec {
    #[serde(flatten)]
    pub job: JobSpec,
    #[serde(default)]
    pub mirror_axis: MirrorAxis,
    /// Diameter of each alignment hole (mm)
    pub hole_size: f64,
    /// Clearance between the hole edge and the board outline (mm)
    pub hole_offset: f64,
}

/// Operation a tool profile can run on the tools it matches.
///
/// Encoded in documents as `{type: <name>, params: {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "params", rename_all = "snake_case")]
pub enum ProfileOperation {
    CncDrill(DrillHolesJobSpec),
    MillHoles(MillHolesJobSpec),
    MillSlots(MillSlotsJobSpec),
}

impl ProfileOperation {
    pub fn job(&self) -> &JobSpec {
        match self {
            Self::CncDrill(spec) => &spec.job,
            Self::MillHoles(spec) => &spec.job,
            Self::MillSlots(spec) => &spec.job,
        }
    }

    /// Name of the operation as written in documents
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::CncDrill(_) => "cnc_drill",
            Self::MillHoles(_) => "mill_holes",
            Self::MillSlots(_) => "mill_slots",
        }
    }
}

fn deserialize_whole_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    // `20000.0` is as good as `20000`
    let value = f64::deserialize(deserializer)?;
    if value.fract() != 0.0 || value < 0.0 || value > f64::from(u32::MAX) {
        return Err(D::Error::custom(format!(
            "expected a whole non-negative number, got {}",
            value
        )));
    }
    Ok(value as u32)
}

fn deserialize_gaps<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    // `gaps: 4` arrives as a number
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Gaps {
        Text(String),
        Count(u64),
    }

    Ok(match Gaps::deserialize(deserializer)? {
        Gaps::Text(text) => text,
        Gaps::Count(count) => count.to_string(),
    })
}
