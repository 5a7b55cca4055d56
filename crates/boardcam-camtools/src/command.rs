//! FlatCAM shell commands
//!
//! A [`Command`] is one line of a FlatCAM shell script:
//! `name arg... -key value...`. The constructors below encode the parameter
//! set of every machining step the process generator emits.

use boardcam_settings::{
    AlignmentHolesJobSpec, BoardCutoutJobSpec, DrillHolesJobSpec, IsolationRoutingJobSpec,
    JobSpec, MirrorAxis,
};
use std::fmt;
use std::path::Path;

/// Object names the generated script creates inside FlatCAM
pub mod alias {
    /// Drill object `aligndrill` derives from the outline
    pub const ALIGNMENT: &str = "edge_cuts_aligndrill";
    pub const ALIGNMENT_PATH: &str = "alignment_path";
    pub const ALIGNMENT_CNC: &str = "alignment_cnc";
    pub const B_CU: &str = "b_cu";
    pub const B_CU_PATH: &str = "b_cu_path";
    pub const B_CU_CNC: &str = "b_cu_cnc";
    pub const F_CU: &str = "f_cu";
    pub const F_CU_PATH: &str = "f_cu_path";
    pub const F_CU_CNC: &str = "f_cu_cnc";
    pub const EDGE_CUTS: &str = "edge_cuts";
    /// Geometry `cutout` derives from the outline
    pub const EDGE_CUTS_PATH: &str = "edge_cuts_cutout";
    pub const EDGE_CUTS_CNC: &str = "edge_cuts_cnc";
    pub const DRILL: &str = "drill";

    /// Machining job derived from the geometry `alias`
    pub fn cnc(alias: &str) -> String {
        format!("{}_cnc", alias)
    }
}

/// Render a number the way FlatCAM's shell reads it back.
///
/// Whole numbers keep one decimal (`1.0`); everything else uses the
/// shortest form that round-trips (`0.8`, `-0.07`).
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

/// Comma-joined diameter list, as taken by `-drilled_dias`/`-milled_dias`
pub fn format_diameters(diameters: &[f64]) -> String {
    diameters
        .iter()
        .map(|dia| format_number(*dia))
        .collect::<Vec<_>>()
        .join(",")
}

/// A named parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(value) => write!(f, "{}", value),
            Value::Float(value) => f.write_str(&format_number(*value)),
            Value::Text(value) => f.write_str(value),
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<MirrorAxis> for Value {
    fn from(value: MirrorAxis) -> Self {
        Value::Text(value.to_string())
    }
}

/// One FlatCAM shell command
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    name: String,
    args: Vec<String>,
    params: Vec<(String, Value)>,
}

impl Command {
    /// A command with no arguments
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            params: Vec::new(),
        }
    }

    /// Append a positional argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append a named parameter
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn params(&self) -> &[(String, Value)] {
        &self.params
    }

    /// Value of the named parameter `key`
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.params
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }

    /// Whether this command writes a G-code file
    pub fn writes_output(&self) -> bool {
        self.name == "write_gcode"
    }

    /// Open a photoplot file as `outname`
    pub fn open_gerber(path: &Path, outname: &str) -> Self {
        Self::new("open_gerber")
            .arg(path.display().to_string())
            .param("outname", outname)
    }

    /// Open a drill file as `outname`
    pub fn open_excellon(path: &Path, outname: &str) -> Self {
        Self::new("open_excellon")
            .arg(path.display().to_string())
            .param("outname", outname)
    }

    /// Create the alignment drill object next to the outline
    pub fn align_drill(spec: &AlignmentHolesJobSpec, holes: &[(f64, f64)], dist: f64) -> Self {
        let holes = holes
            .iter()
            .map(|(x, y)| format!("({}, {})", format_number(*x), format_number(*y)))
            .collect::<Vec<_>>()
            .join(",");

        Self::new("aligndrill")
            .arg(alias::EDGE_CUTS)
            .param("axis", spec.mirror_axis)
            .param("dia", spec.hole_size)
            .param("holes", format!("\"{}\"", holes))
            .param("dist", dist)
    }

    /// Mirror `layer` about `axis`, using the outline as reference box
    pub fn mirror(layer: &str, axis: MirrorAxis) -> Self {
        Self::new("mirror")
            .arg(layer)
            .param("axis", axis)
            .param("box", alias::EDGE_CUTS)
    }

    /// Mill the holes of the listed diameters
    pub fn mill_holes(job: &JobSpec, input: &str, output: &str, diameters: &[f64]) -> Self {
        Self::new("milldrills")
            .arg(input)
            .param("tooldia", job.tool_size)
            .param("milled_dias", format_diameters(diameters))
            .param("outname", output)
    }

    /// Mill the slots of the listed diameters
    pub fn mill_slots(job: &JobSpec, input: &str, output: &str, diameters: &[f64]) -> Self {
        Self::new("millslots")
            .arg(input)
            .param("tooldia", job.tool_size)
            .param("milled_dias", format_diameters(diameters))
            .param("outname", output)
    }

    /// Turn a geometry into a machining job
    pub fn cnc_job(job: &JobSpec, input: &str, output: &str) -> Self {
        let mut command = Self::new("cncjob")
            .arg(input)
            .param("z_cut", job.cut_z)
            .param("z_move", job.travel_z)
            .param("feedrate", job.feed_rate)
            .param("dia", job.tool_size)
            .param("spindlespeed", job.spindle_speed);
        if let Some(dpp) = job.pass_depth() {
            command = command.param("dpp", dpp);
        }
        command.param("outname", output)
    }

    /// Drill the holes of the listed diameters
    pub fn drill_cnc_job(spec: &DrillHolesJobSpec, input: &str, output: &str, diameters: &[f64]) -> Self {
        Self::new("drillcncjob")
            .arg(input)
            .param("drilled_dias", format_diameters(diameters))
            .param("drillz", spec.drill_depth())
            .param("travelz", spec.job.travel_z)
            .param("feedrate_z", spec.job.feed_rate)
            .param("spindlespeed", spec.job.spindle_speed)
            .param("outname", output)
    }

    /// Isolation routing around the copper of `input`
    pub fn isolate(spec: &IsolationRoutingJobSpec, input: &str, output: &str) -> Self {
        Self::new("isolate")
            .arg(input)
            .param("dia", spec.job.tool_size)
            .param("passes", spec.pass_count())
            .param("overlap", spec.pass_overlap)
            .param("combine", 1i64)
            .param("outname", output)
    }

    /// Board cutout with holding tabs
    pub fn cutout(spec: &BoardCutoutJobSpec) -> Self {
        Self::new("cutout")
            .arg(alias::EDGE_CUTS)
            .param("dia", spec.job.tool_size)
            .param("margin", spec.margin)
            .param("gapsize", spec.gap_size)
            .param("gaps", spec.gaps.as_str())
    }

    /// Write the machining job `layer` to
    /// `<directory>/<NN>.<step>.<tool_size>.<tool_name>.gcode`
    pub fn write_gcode(
        layer: &str,
        directory: &Path,
        counter: u32,
        step: &str,
        tool_name: &str,
        tool_size: f64,
    ) -> Self {
        let filename = format!(
            "{:02}.{}.{}.{}.gcode",
            counter,
            step,
            format_number(tool_size),
            tool_name
        );
        Self::new("write_gcode")
            .arg(layer)
            .arg(directory.join(filename).display().to_string())
    }

    pub fn quit() -> Self {
        Self::new("quit_flatcam")
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        for (key, value) in &self.params {
            write!(f, " -{} {}", key, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn job() -> JobSpec {
        JobSpec {
            tool_size: 1.0,
            cut_z: -1.8,
            travel_z: 2.0,
            feed_rate: 60.0,
            spindle_speed: 12000,
            multi_depth: false,
            depth_per_pass: None,
        }
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1.0), "1.0");
        assert_eq!(format_number(0.8), "0.8");
        assert_eq!(format_number(-0.07), "-0.07");
        assert_eq!(format_number(40.0), "40.0");
        assert_eq!(format_number(12000.0), "12000.0");
    }

    #[test]
    fn test_render_args_then_params() {
        let command = Command::new("open_gerber")
            .arg("board-F.Cu.gbr")
            .param("outname", "f_cu");
        assert_eq!(command.to_string(), "open_gerber board-F.Cu.gbr -outname f_cu");
        assert_eq!(Command::quit().to_string(), "quit_flatcam");
    }

    #[test]
    fn test_cnc_job_adds_dpp_only_for_multi_depth() {
        let single = Command::cnc_job(&job(), "a_path", "a_cnc");
        assert_eq!(
            single.to_string(),
            "cncjob a_path -z_cut -1.8 -z_move 2.0 -feedrate 60.0 -dia 1.0 -spindlespeed 12000 -outname a_cnc"
        );

        let mut multi = job();
        multi.multi_depth = true;
        multi.depth_per_pass = Some(0.6);
        let command = Command::cnc_job(&multi, "a_path", "a_cnc");
        assert_eq!(command.get("dpp"), Some(&Value::Float(0.6)));
        assert!(command.to_string().ends_with("-dpp 0.6 -outname a_cnc"));
    }

    #[test]
    fn test_write_gcode_filename() {
        let command = Command::write_gcode(
            "b_cu_cnc",
            &PathBuf::from("/boards/demo"),
            3,
            "b_cu",
            "engraving_bit",
            0.1,
        );
        assert!(command.writes_output());
        assert_eq!(
            command.to_string(),
            "write_gcode b_cu_cnc /boards/demo/03.b_cu.0.1.engraving_bit.gcode"
        );
    }

    #[test]
    fn test_drill_cnc_job_lists_diameters() {
        let spec = DrillHolesJobSpec {
            job: job(),
            drill_z: None,
        };
        let command = Command::drill_cnc_job(&spec, "drill", "drill_small_0", &[0.8, 1.0]);
        assert_eq!(
            command.to_string(),
            "drillcncjob drill -drilled_dias 0.8,1.0 -drillz -1.8 -travelz 2.0 -feedrate_z 60.0 -spindlespeed 12000 -outname drill_small_0"
        );
    }

    #[test]
    fn test_isolate_truncates_pass_count() {
        let spec = IsolationRoutingJobSpec {
            job: job(),
            passes: 2.7,
            pass_overlap: 0.5,
        };
        assert_eq!(
            Command::isolate(&spec, "b_cu", "b_cu_path").to_string(),
            "isolate b_cu -dia 1.0 -passes 2 -overlap 0.5 -combine 1 -outname b_cu_path"
        );
    }
}
