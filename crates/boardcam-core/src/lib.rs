//! # Boardcam Core
//!
//! Core types shared by the boardcam crates.
//! Provides the board layer model (layer identity, bounds, drill tool tables
//! and hit records), measurement units, and the [`LayerSource`] seam through
//! which the process generator receives parsed board data.

pub mod error;
pub mod layer;
pub mod units;

pub use error::{Error, Result};
pub use layer::{
    BoardProject, Bounds, DrillHit, HitKind, Layer, LayerSet, LayerSource, LayerType,
};
pub use units::MeasurementSystem;
