//! Boardcam Settings Crate
//!
//! Machining configuration: job specifications, tool profiles, layered
//! configuration documents and the files they are loaded from.

pub mod config;
pub mod environment;
pub mod error;
pub mod job;
pub mod persistence;
pub mod profile;

pub use config::{ConfigDocument, ProfileMap};
pub use environment::EnvironmentConfig;
pub use error::{ConfigError, ConfigResult, SettingsError, SettingsResult};
pub use job::{
    AlignmentHolesJobSpec, BoardCutoutJobSpec, DrillHolesJobSpec, IsolationRoutingJobSpec,
    JobSpec, MillHolesJobSpec, MillSlotsJobSpec, MirrorAxis, ProfileOperation,
};
pub use persistence::{ConfigRegistry, ConfigSource, DocumentFormat};
pub use profile::{ProfileKind, ToolProfileSpec};
