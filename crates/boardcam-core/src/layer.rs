//! Board layer model
//!
//! A board is a directory of exports, each export one [`Layer`]. Copper and
//! outline layers only contribute their bounds; the drill layer additionally
//! carries its tool table and the hole/slot hits that reference it.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Logical identity of a board layer.
///
/// Ordering is the load order used when opening layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerType {
    BCu,
    FCu,
    Alignment,
    EdgeCuts,
    Drill,
}

impl LayerType {
    /// Get all layer types in load order
    pub fn all() -> &'static [LayerType] {
        &[
            LayerType::BCu,
            LayerType::FCu,
            LayerType::Alignment,
            LayerType::EdgeCuts,
            LayerType::Drill,
        ]
    }

    /// Object alias used for this layer inside the CAM session
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BCu => "b_cu",
            Self::FCu => "f_cu",
            Self::Alignment => "alignment",
            Self::EdgeCuts => "edge_cuts",
            Self::Drill => "drill",
        }
    }

    /// Guess the layer type from a KiCad export file name
    pub fn detect(filename: &str) -> Option<LayerType> {
        if filename.contains("-B.Cu.") {
            Some(Self::BCu)
        } else if filename.contains("-F.Cu.") {
            Some(Self::FCu)
        } else if filename.contains("-Edge.Cuts.") {
            Some(Self::EdgeCuts)
        } else if filename.contains("-Alignment.") {
            Some(Self::Alignment)
        } else if filename.ends_with(".drl") {
            Some(Self::Drill)
        } else {
            None
        }
    }

    /// Whether the layer is drill data rather than a photoplot
    pub fn is_drill(&self) -> bool {
        matches!(self, Self::Drill)
    }
}

impl std::fmt::Display for LayerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BCu => write!(f, "Back Copper"),
            Self::FCu => write!(f, "Front Copper"),
            Self::Alignment => write!(f, "Alignment"),
            Self::EdgeCuts => write!(f, "Edge Cuts"),
            Self::Drill => write!(f, "Drill"),
        }
    }
}

/// Axis-aligned bounding box in millimeters
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Bounds {
    /// Build bounds from an x range and a y range
    pub fn new(x: (f64, f64), y: (f64, f64)) -> Self {
        Self {
            min_x: x.0,
            max_x: x.1,
            min_y: y.0,
            max_y: y.1,
        }
    }

    /// Smallest box containing every point, or `None` for no points
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut points = points.into_iter();
        let (x, y) = points.next()?;
        let mut bounds = Self::new((x, x), (y, y));
        for (x, y) in points {
            bounds.include(x, y);
        }
        Some(bounds)
    }

    /// Grow the box to contain `(x, y)`
    pub fn include(&mut self, x: f64, y: f64) {
        self.min_x = self.min_x.min(x);
        self.max_x = self.max_x.max(x);
        self.min_y = self.min_y.min(y);
        self.max_y = self.max_y.max(y);
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// Kind of a drill layer hit record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HitKind {
    /// A plunged hole
    Hole,
    /// A routed slot
    Slot,
}

/// One hit in a drill layer, referencing a tool number
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrillHit {
    pub tool: u32,
    pub kind: HitKind,
}

impl DrillHit {
    pub fn hole(tool: u32) -> Self {
        Self {
            tool,
            kind: HitKind::Hole,
        }
    }

    pub fn slot(tool: u32) -> Self {
        Self {
            tool,
            kind: HitKind::Slot,
        }
    }
}

/// One parsed board layer
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    /// Logical identity of the layer
    pub layer_type: LayerType,
    /// File the layer was read from
    pub path: PathBuf,
    /// Geometric extent of the layer
    pub bounds: Bounds,
    /// Tool number to diameter (mm); empty for photoplot layers
    pub tools: BTreeMap<u32, f64>,
    /// Drill and slot hits in file order; empty for photoplot layers
    pub hits: Vec<DrillHit>,
}

impl Layer {
    /// Create a photoplot (gerber) layer
    pub fn gerber(layer_type: LayerType, path: impl Into<PathBuf>, bounds: Bounds) -> Self {
        Self {
            layer_type,
            path: path.into(),
            bounds,
            tools: BTreeMap::new(),
            hits: Vec::new(),
        }
    }

    /// Create a drill (excellon) layer
    pub fn excellon(
        path: impl Into<PathBuf>,
        bounds: Bounds,
        tools: BTreeMap<u32, f64>,
        hits: Vec<DrillHit>,
    ) -> Self {
        Self {
            layer_type: LayerType::Drill,
            path: path.into(),
            bounds,
            tools,
            hits,
        }
    }

    /// Number of hits of `kind` made with `tool`
    pub fn hit_count(&self, tool: u32, kind: HitKind) -> usize {
        self.hits
            .iter()
            .filter(|hit| hit.tool == tool && hit.kind == kind)
            .count()
    }

    /// Diameter of tool `tool`, if the tool table defines it
    pub fn tool_diameter(&self, tool: u32) -> Option<f64> {
        self.tools.get(&tool).copied()
    }
}

/// The resolved layers of one board, keyed and ordered by layer type
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerSet {
    layers: BTreeMap<LayerType, Layer>,
}

impl LayerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a layer, replacing any earlier layer of the same type
    pub fn insert(&mut self, layer: Layer) -> Option<Layer> {
        self.layers.insert(layer.layer_type, layer)
    }

    pub fn get(&self, layer_type: LayerType) -> Option<&Layer> {
        self.layers.get(&layer_type)
    }

    /// Like [`LayerSet::get`] but a missing layer is an error
    pub fn require(&self, layer_type: LayerType) -> Result<&Layer> {
        self.get(layer_type)
            .ok_or(Error::MissingLayer(layer_type))
    }

    pub fn contains(&self, layer_type: LayerType) -> bool {
        self.layers.contains_key(&layer_type)
    }

    /// Layers in load order
    pub fn iter(&self) -> impl Iterator<Item = &Layer> {
        self.layers.values()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl FromIterator<Layer> for LayerSet {
    fn from_iter<T: IntoIterator<Item = Layer>>(iter: T) -> Self {
        let mut set = LayerSet::new();
        for layer in iter {
            set.insert(layer);
        }
        set
    }
}

/// A board directory together with its resolved layers
#[derive(Debug, Clone, PartialEq)]
pub struct BoardProject {
    /// Directory holding the exports; generated files are placed here
    pub directory: PathBuf,
    pub layers: LayerSet,
}

impl BoardProject {
    pub fn new(directory: impl Into<PathBuf>, layers: LayerSet) -> Self {
        Self {
            directory: directory.into(),
            layers,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

/// Something that can resolve a board's layers
pub trait LayerSource {
    /// Directory the board was exported to
    fn directory(&self) -> &Path;

    /// Resolve every recognisable layer
    fn layers(&self) -> Result<LayerSet>;

    /// Resolve the layers and bundle them with the board directory
    fn load(&self) -> Result<BoardProject> {
        Ok(BoardProject::new(self.directory(), self.layers()?))
    }
}
