//! # Boardcam CAM Tools
//!
//! Turns a board's layers and a machining configuration into a FlatCAM
//! shell script.
//!
//! - [`command`]: FlatCAM shell commands and their rendering
//! - [`matcher`]: assignment of drill tools to tool profiles
//! - [`generator`]: the ordered process for a whole board
//! - [`layers`]: reading layer files from a board directory
//! - [`flatcam`]: writing the script and running FlatCAM

pub mod command;
pub mod error;
pub mod flatcam;
pub mod generator;
pub mod layers;
pub mod matcher;

pub use command::{Command, Value};
pub use error::{CamToolError, Result};
pub use flatcam::{script_path, write_script, FlatcamRunner, SCRIPT_NAME};
pub use generator::{Phase, ProcessGenerator, Processes};
pub use layers::DirectoryLayerSource;
pub use matcher::{assign_tools, select_profile, ToolAssignment};
