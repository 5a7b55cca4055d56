//! FlatCAM process generation
//!
//! Walks a board's layers and a merged machining configuration and produces
//! the FlatCAM shell commands that machine the board, in a fixed order:
//!
//! 1. open every layer
//! 2. alignment holes (and mirroring of the back copper)
//! 3. isolation routing of back then front copper
//! 4. drilling
//! 5. slot milling
//! 6. board cutout
//! 7. quit
//!
//! Each machining step ends in a `write_gcode` whose file name carries a
//! run-wide counter, so output files sort in the order they must be run.

use crate::command::{alias, Command};
use crate::error::{CamToolError, Result};
use crate::matcher::{assign_tools, ToolAssignment};
use boardcam_core::{BoardProject, LayerType};
use boardcam_settings::{ConfigDocument, ConfigError, ProfileKind, ProfileOperation};
use std::collections::VecDeque;
use std::iter::FusedIterator;
use tracing::{debug, info};

/// Stages of a generation run, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    LoadLayers,
    AlignmentHoles,
    Copper,
    Drill,
    Slot,
    EdgeCuts,
    Quit,
}

impl Phase {
    pub const ALL: [Phase; 7] = [
        Phase::LoadLayers,
        Phase::AlignmentHoles,
        Phase::Copper,
        Phase::Drill,
        Phase::Slot,
        Phase::EdgeCuts,
        Phase::Quit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::LoadLayers => "load layers",
            Phase::AlignmentHoles => "alignment holes",
            Phase::Copper => "isolation routing",
            Phase::Drill => "drills",
            Phase::Slot => "slots",
            Phase::EdgeCuts => "edge cuts",
            Phase::Quit => "quit",
        }
    }
}

/// Generates the FlatCAM process for one board
#[derive(Debug, Clone)]
pub struct ProcessGenerator {
    project: BoardProject,
    config: ConfigDocument,
    counter: u32,
}

impl ProcessGenerator {
    /// Create a generator, rejecting an invalid configuration up front
    pub fn new(project: BoardProject, config: ConfigDocument) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            project,
            config,
            counter: 0,
        })
    }

    pub fn project(&self) -> &BoardProject {
        &self.project
    }

    pub fn config(&self) -> &ConfigDocument {
        &self.config
    }

    /// Number of output files written so far
    pub fn counter(&self) -> u32 {
        self.counter
    }

    /// The commands of the whole run, produced one phase at a time.
    ///
    /// The sequence ends after the first error.
    pub fn processes(self) -> Processes {
        Processes {
            generator: self,
            phases: Phase::ALL.iter(),
            pending: VecDeque::new(),
            done: false,
        }
    }

    /// Run every phase and collect the commands
    pub fn generate(self) -> Result<Vec<Command>> {
        self.processes().collect()
    }

    /// Commands for a single phase
    pub fn run_phase(&mut self, phase: Phase) -> Result<Vec<Command>> {
        debug!("Phase: {}", phase.as_str());
        match phase {
            Phase::LoadLayers => Ok(self.load_layers()),
            Phase::AlignmentHoles => self.alignment_holes(),
            Phase::Copper => self.copper(),
            Phase::Drill => self.drill(),
            Phase::Slot => self.slot(),
            Phase::EdgeCuts => self.edge_cuts(),
            Phase::Quit => Ok(vec![Command::quit()]),
        }
    }

    fn next_counter(&mut self) -> u32 {
        self.counter += 1;
        self.counter
    }

    fn write_gcode(&mut self, layer: &str, step: &str, tool_name: &str, tool_size: f64) -> Command {
        let counter = self.next_counter();
        Command::write_gcode(
            layer,
            self.project.directory(),
            counter,
            step,
            tool_name,
            tool_size,
        )
    }

    fn load_layers(&self) -> Vec<Command> {
        self.project
            .layers
            .iter()
            .map(|layer| {
                if layer.layer_type.is_drill() {
                    Command::open_excellon(&layer.path, layer.layer_type.as_str())
                } else {
                    Command::open_gerber(&layer.path, layer.layer_type.as_str())
                }
            })
            .collect()
    }

    fn alignment_holes(&mut self) -> Result<Vec<Command>> {
        let Some(spec) = self.config.alignment_holes.clone() else {
            return Ok(Vec::new());
        };
        info!("Processing alignment holes...");

        let layers = &self.project.layers;
        let bounds = layers.require(LayerType::EdgeCuts)?.bounds;
        layers.require(LayerType::BCu)?;

        let offset = spec.hole_size / 2.0 + spec.hole_offset;
        let holes = [
            (bounds.min_x + offset, bounds.min_y - offset),
            (bounds.max_x - offset, bounds.min_y - offset),
        ];

        let mut commands = vec![
            Command::align_drill(&spec, &holes, bounds.max_y / 2.0),
            Command::mirror(alias::B_CU, spec.mirror_axis),
            Command::mill_holes(
                &spec.job,
                alias::ALIGNMENT,
                alias::ALIGNMENT_PATH,
                &[spec.hole_size],
            ),
            Command::cnc_job(&spec.job, alias::ALIGNMENT_PATH, alias::ALIGNMENT_CNC),
        ];
        commands.push(self.write_gcode(
            alias::ALIGNMENT_CNC,
            "alignment_holes",
            "end_mill",
            spec.job.tool_size,
        ));
        Ok(commands)
    }

    fn copper(&mut self) -> Result<Vec<Command>> {
        let Some(spec) = self.config.isolation_routing.clone() else {
            return Ok(Vec::new());
        };
        info!("Processing isolation routing...");

        let sides = [
            (LayerType::BCu, alias::B_CU, alias::B_CU_PATH, alias::B_CU_CNC),
            (LayerType::FCu, alias::F_CU, alias::F_CU_PATH, alias::F_CU_CNC),
        ];
        for (layer_type, ..) in &sides {
            self.project.layers.require(*layer_type)?;
        }

        let mut commands = Vec::with_capacity(6);
        for (_, layer, path, cnc) in sides {
            commands.push(Command::isolate(&spec, layer, path));
            commands.push(Command::cnc_job(&spec.job, path, cnc));
            commands.push(self.write_gcode(cnc, layer, "engraving_bit", spec.job.tool_size));
        }
        Ok(commands)
    }

    fn assignments(&self, kind: ProfileKind) -> Result<Vec<ToolAssignment>> {
        let layer = self.project.layers.require(LayerType::Drill)?;
        Ok(assign_tools(layer, kind, self.config.profiles(kind)))
    }

    fn drill(&mut self) -> Result<Vec<Command>> {
        if self.config.drill.is_empty() {
            return Ok(Vec::new());
        }
        info!("Processing drills...");

        let mut commands = Vec::new();
        for assignment in self.assignments(ProfileKind::Drill)? {
            let Some(profile) = self.config.drill.get(&assignment.profile).cloned() else {
                continue;
            };
            let step = format!("drill_{}", assignment.profile);

            for (idx, operation) in profile.specs.iter().enumerate() {
                let layer = format!("drill_{}_{}", assignment.profile, idx);
                match operation {
                    ProfileOperation::CncDrill(spec) => {
                        commands.push(Command::drill_cnc_job(
                            spec,
                            alias::DRILL,
                            &layer,
                            &assignment.diameters,
                        ));
                        commands.push(self.write_gcode(&layer, &step, "drill", spec.job.tool_size));
                    }
                    ProfileOperation::MillHoles(spec) => {
                        let cnc = alias::cnc(&layer);
                        commands.push(Command::mill_holes(
                            &spec.job,
                            alias::DRILL,
                            &layer,
                            &assignment.diameters,
                        ));
                        commands.push(Command::cnc_job(&spec.job, &layer, &cnc));
                        commands.push(self.write_gcode(&cnc, &step, "end_mill", spec.job.tool_size));
                    }
                    ProfileOperation::MillSlots(_) => {
                        return Err(unexpected(ProfileKind::Drill, &assignment.profile, operation));
                    }
                }
            }
        }
        Ok(commands)
    }

    fn slot(&mut self) -> Result<Vec<Command>> {
        if self.config.slot.is_empty() {
            return Ok(Vec::new());
        }
        info!("Processing slots...");

        let mut commands = Vec::new();
        for assignment in self.assignments(ProfileKind::Slot)? {
            let Some(profile) = self.config.slot.get(&assignment.profile).cloned() else {
                continue;
            };
            let step = format!("slot_{}", assignment.profile);

            for (idx, operation) in profile.specs.iter().enumerate() {
                let ProfileOperation::MillSlots(spec) = operation else {
                    return Err(unexpected(ProfileKind::Slot, &assignment.profile, operation));
                };
                let layer = format!("slot_{}_{}", assignment.profile, idx);
                let cnc = alias::cnc(&layer);
                commands.push(Command::mill_slots(
                    &spec.job,
                    alias::DRILL,
                    &layer,
                    &assignment.diameters,
                ));
                commands.push(Command::cnc_job(&spec.job, &layer, &cnc));
                commands.push(self.write_gcode(&cnc, &step, "end_mill", spec.job.tool_size));
            }
        }
        Ok(commands)
    }

    fn edge_cuts(&mut self) -> Result<Vec<Command>> {
        let Some(spec) = self.config.edge_cuts.clone() else {
            return Ok(Vec::new());
        };
        info!("Processing edge cuts...");

        self.project.layers.require(LayerType::EdgeCuts)?;

        let mut commands = vec![
            Command::cutout(&spec),
            Command::cnc_job(&spec.job, alias::EDGE_CUTS_PATH, alias::EDGE_CUTS_CNC),
        ];
        commands.push(self.write_gcode(
            alias::EDGE_CUTS_CNC,
            "edge_cuts",
            "end_mill",
            spec.job.tool_size,
        ));
        Ok(commands)
    }
}

fn unexpected(kind: ProfileKind, profile: &str, operation: &ProfileOperation) -> CamToolError {
    ConfigError::UnexpectedOperation {
        profile: profile.to_string(),
        kind: kind.to_string(),
        operation: operation.type_name().to_string(),
    }
    .into()
}

/// Lazy command sequence of one generation run
#[derive(Debug)]
pub struct Processes {
    generator: ProcessGenerator,
    phases: std::slice::Iter<'static, Phase>,
    pending: VecDeque<Command>,
    done: bool,
}

impl Processes {
    /// Output files written by the commands produced so far
    pub fn counter(&self) -> u32 {
        self.generator.counter()
    }
}

impl Iterator for Processes {
    type Item = Result<Command>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(command) = self.pending.pop_front() {
                debug!("Step {} generated", command);
                return Some(Ok(command));
            }
            if self.done {
                return None;
            }

            let Some(phase) = self.phases.next() else {
                self.done = true;
                return None;
            };
            match self.generator.run_phase(*phase) {
                Ok(commands) => self.pending.extend(commands),
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }
    }
}

impl FusedIterator for Processes {}
