//! Board directory layer source
//!
//! Reads the layer files a KiCad plot leaves in a directory. Only what the
//! process generator needs is extracted:
//! - photoplot (gerber) files: the extent of what they draw, in millimeters
//! - drill (excellon) files: the tool table and the hole and slot hits
//!
//! Gerber files go through `gerber_parser`; the drill grammar is small
//! enough to scan line by line.

use boardcam_core::{
    Bounds, DrillHit, Error, Layer, LayerSet, LayerSource, LayerType, MeasurementSystem, Result,
};
use gerber_parser::parse;
use gerber_types::{Aperture, Command, DCode, FunctionCode, Operation, Unit};
use regex::{Captures, Regex};
use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Layers found in one board directory, read once
#[derive(Debug)]
pub struct DirectoryLayerSource {
    directory: PathBuf,
    layers: OnceCell<LayerSet>,
}

impl DirectoryLayerSource {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            layers: OnceCell::new(),
        }
    }

    fn scan(&self) -> Result<LayerSet> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(&self.directory)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file())
            .collect();
        paths.sort();

        let mut layers = LayerSet::new();
        for path in paths {
            let filename = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();

            let Some(layer_type) = LayerType::detect(&filename) else {
                warn!("{}", Error::UnknownLayerType(path.display().to_string()));
                continue;
            };

            match read_layer(layer_type, &path) {
                Ok(layer) => {
                    debug!("Loaded {} as {}", path.display(), layer_type);
                    layers.insert(layer);
                }
                Err(err @ Error::LayerParse { .. }) => {
                    warn!("Skipping {}", err);
                }
                Err(err) => return Err(err),
            }
        }
        Ok(layers)
    }
}

impl LayerSource for DirectoryLayerSource {
    fn directory(&self) -> &Path {
        &self.directory
    }

    fn layers(&self) -> Result<LayerSet> {
        if let Some(layers) = self.layers.get() {
            return Ok(layers.clone());
        }
        let layers = self.scan()?;
        Ok(self.layers.get_or_init(|| layers).clone())
    }
}

/// Read one layer file as `layer_type`
pub fn read_layer(layer_type: LayerType, path: &Path) -> Result<Layer> {
    let content = std::fs::read(path)?;
    let content = String::from_utf8_lossy(&content);

    if layer_type.is_drill() {
        parse_excellon(path, &content)
    } else {
        let bounds = parse_gerber_bounds(&content).map_err(|reason| Error::layer_parse(path, reason))?;
        Ok(Layer::gerber(layer_type, path, bounds))
    }
}

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("invalid regex pattern"))
}

/// Keep the first match of `pattern`, drop the rest
fn keep_first(content: &str, pattern: &Regex) -> String {
    let mut count = 0;
    pattern
        .replace_all(content, |caps: &Captures| {
            count += 1;
            if count > 1 {
                String::new()
            } else {
                caps[0].to_string()
            }
        })
        .into_owned()
}

/// Prepare gerber text for the parser.
///
/// Repeated `%FS`/`%MO` statements are dropped. Files that omit trailing
/// zeros (`%FST...`) get their coordinate words padded to full width and
/// are declared as leading-zero omitting instead.
fn sanitize_gerber(content: &str) -> std::result::Result<String, String> {
    static FORMAT: OnceLock<Regex> = OnceLock::new();
    static MODE: OnceLock<Regex> = OnceLock::new();
    static WORD: OnceLock<Regex> = OnceLock::new();
    let format = regex(&FORMAT, r"%FS([LT]?)([AI]?)X(\d)(\d)Y(\d)(\d)\*%");
    let mode = regex(&MODE, r"%MO[A-Z]*\*%");
    let word = regex(&WORD, r"%[^%]*%|([XYIJ])([+-]?)(\d+)");

    let sanitized = keep_first(&keep_first(content, format), mode);

    let Some(caps) = format.captures(&sanitized) else {
        return Err("no coordinate format (%FS) statement".to_string());
    };
    if &caps[1] != "T" {
        return Ok(sanitized);
    }
    let digits = |int: &str, dec: &str| -> usize {
        int.parse::<usize>().unwrap_or(0) + dec.parse::<usize>().unwrap_or(0)
    };
    let x_width = digits(&caps[3], &caps[4]);
    let y_width = digits(&caps[5], &caps[6]);
    let statement = format!("%FSL{}X{}{}Y{}{}*%", &caps[2], &caps[3], &caps[4], &caps[5], &caps[6]);

    let padded = word.replace_all(&sanitized, |caps: &Captures| {
        let Some(axis) = caps.get(1) else {
            return caps[0].to_string();
        };
        let width = match axis.as_str() {
            "X" | "I" => x_width,
            _ => y_width,
        };
        format!("{}{}{:0<width$}", axis.as_str(), &caps[2], &caps[3], width = width)
    });
    Ok(format.replace(&padded, statement.as_str()).into_owned())
}

/// Half width and half height an aperture adds around its center
fn aperture_extent(aperture: Option<&Aperture>) -> (f64, f64) {
    match aperture {
        Some(Aperture::Circle(circle)) => (circle.diameter / 2.0, circle.diameter / 2.0),
        Some(Aperture::Rectangle(rect)) => (rect.x / 2.0, rect.y / 2.0),
        Some(Aperture::Obround(rect)) => (rect.x / 2.0, rect.y / 2.0),
        Some(Aperture::Polygon(polygon)) => (polygon.diameter / 2.0, polygon.diameter / 2.0),
        _ => (0.0, 0.0),
    }
}

/// Extent of everything a gerber file draws or flashes, in millimeters.
///
/// Strokes and flashes include their aperture; arcs contribute their end
/// points only.
pub fn parse_gerber_bounds(content: &str) -> std::result::Result<Bounds, String> {
    let sanitized = sanitize_gerber(content)?;
    let doc = match parse(BufReader::new(sanitized.as_bytes())) {
        Ok(doc) => doc,
        Err((doc, err)) => {
            debug!("Gerber parser stopped early, using the partial document: {:?}", err);
            doc
        }
    };

    if doc.format_specification.is_none() {
        return Err("no coordinate format (%FS) statement".to_string());
    }
    let units = match doc.units {
        Some(Unit::Inches) => MeasurementSystem::Imperial,
        _ => MeasurementSystem::Metric,
    };

    let (mut x, mut y) = (0.0, 0.0);
    let mut aperture: Option<&Aperture> = None;
    let mut points = Vec::new();

    for command in doc.commands() {
        let Command::FunctionCode(FunctionCode::DCode(dcode)) = command else {
            continue;
        };
        let operation = match dcode {
            DCode::SelectAperture(code) => {
                aperture = doc.apertures.get(code);
                continue;
            }
            DCode::Operation(operation) => operation,
        };

        let (coords, stroke, flash) = match operation {
            Operation::Interpolate(coords, _) => (coords, true, false),
            Operation::Move(coords) => (coords, false, false),
            Operation::Flash(coords) => (coords, false, true),
        };

        let start = (x, y);
        if let Some(coords) = coords {
            if let Some(value) = coords.x.as_ref() {
                x = units.to_mm(f64::from(*value));
            }
            if let Some(value) = coords.y.as_ref() {
                y = units.to_mm(f64::from(*value));
            }
        }

        let (half_w, half_h) = aperture_extent(aperture);
        let (half_w, half_h) = (units.to_mm(half_w), units.to_mm(half_h));
        let mut cover = |(px, py): (f64, f64)| {
            points.push((px - half_w, py - half_h));
            points.push((px + half_w, py + half_h));
        };
        if stroke {
            cover(start);
            cover((x, y));
        } else if flash {
            cover((x, y));
        }
    }

    Bounds::from_points(points).ok_or_else(|| "no coordinates".to_string())
}

/// Which zeros an excellon file keeps in implicit-decimal numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Zeros {
    /// `LZ`: leading zeros kept, trailing zeros dropped
    Leading,
    /// `TZ`: trailing zeros kept, leading zeros dropped
    Trailing,
}

/// Number format of an excellon file
#[derive(Debug, Clone, Copy, PartialEq)]
struct ExcellonFormat {
    units: MeasurementSystem,
    zeros: Zeros,
    integer: usize,
    decimal: usize,
}

impl ExcellonFormat {
    fn new(units: MeasurementSystem) -> Self {
        let (integer, decimal) = match units {
            MeasurementSystem::Metric => (3, 3),
            MeasurementSystem::Imperial => (2, 4),
        };
        Self {
            units,
            zeros: Zeros::Trailing,
            integer,
            decimal,
        }
    }

    /// `METRIC,TZ`, `INCH,LZ`, `METRIC,LZ,000.000`
    fn from_header(header: &str) -> Option<Self> {
        let mut fields = header.split(',').map(str::trim);
        let mut format = Self::new(fields.next()?.parse().ok()?);
        for field in fields {
            match field {
                "LZ" => format.zeros = Zeros::Leading,
                "TZ" => format.zeros = Zeros::Trailing,
                digits => {
                    if let Some((int, dec)) = digits.split_once('.') {
                        format.integer = int.len();
                        format.decimal = dec.len();
                    }
                }
            }
        }
        Some(format)
    }

    /// A coordinate or size in millimeters
    fn to_mm(&self, text: &str) -> std::result::Result<f64, String> {
        let bad = || format!("bad number '{}'", text);
        if text.contains('.') {
            return text.parse::<f64>().map(|v| self.units.to_mm(v)).map_err(|_| bad());
        }

        let (sign, digits) = match text.strip_prefix('-') {
            Some(rest) => (-1.0, rest),
            None => (1.0, text.strip_prefix('+').unwrap_or(text)),
        };
        let digits = match self.zeros {
            Zeros::Leading => format!("{:0<width$}", digits, width = self.integer + self.decimal),
            Zeros::Trailing => digits.to_string(),
        };
        let value: f64 = digits.parse().map_err(|_| bad())?;
        Ok(self.units.to_mm(sign * value / 10f64.powi(self.decimal as i32)))
    }
}

/// Tool table and hits of an excellon drill file, in millimeters
pub fn parse_excellon(path: &Path, content: &str) -> Result<Layer> {
    static TOOL_DEF: OnceLock<Regex> = OnceLock::new();
    static TOOL_SELECT: OnceLock<Regex> = OnceLock::new();
    static COORD: OnceLock<Regex> = OnceLock::new();
    let tool_def = regex(&TOOL_DEF, r"^T(\d+)(?:[FS][\d.]+)*C([\d.]+)");
    let tool_select = regex(&TOOL_SELECT, r"^T(\d+)$");
    let coord = regex(&COORD, r"X([+-]?[\d.]+)|Y([+-]?[\d.]+)");

    let mut format = ExcellonFormat::new(MeasurementSystem::Metric);
    let mut tools: BTreeMap<u32, f64> = BTreeMap::new();
    let mut hits = Vec::new();
    let mut points = Vec::new();
    let mut current: Option<u32> = None;
    let mut routing = false;
    let (mut x, mut y) = (0.0, 0.0);

    let number = |text: &str, format: &ExcellonFormat| -> Result<f64> {
        format
            .to_mm(text)
            .map_err(|reason| Error::layer_parse(path, reason))
    };

    for line in content.lines().map(str::trim) {
        if line.is_empty() || line.starts_with(';') {
            continue;
        }
        if let Some(header) = ExcellonFormat::from_header(line) {
            format = header;
            continue;
        }
        if line == "M71" || line == "M72" {
            format = ExcellonFormat::new(if line == "M71" {
                MeasurementSystem::Metric
            } else {
                MeasurementSystem::Imperial
            });
            continue;
        }
        if let Some(caps) = tool_def.captures(line) {
            let tool: u32 = caps[1]
                .parse()
                .map_err(|_| Error::layer_parse(path, format!("bad tool '{}'", line)))?;
            let diameter: f64 = caps[2]
                .parse()
                .map_err(|_| Error::layer_parse(path, format!("bad tool '{}'", line)))?;
            tools.insert(tool, format.units.to_mm(diameter));
            current = Some(tool);
            continue;
        }
        if let Some(caps) = tool_select.captures(line) {
            current = caps[1].parse().ok().filter(|tool| *tool != 0);
            continue;
        }
        if line == "M15" {
            routing = true;
            continue;
        }
        if line == "M16" || line == "M17" {
            if routing {
                if let Some(tool) = current {
                    hits.push(DrillHit::slot(tool));
                }
            }
            routing = false;
            continue;
        }

        let Some(tool) = current else {
            continue;
        };

        // `X..Y..G85X..Y..` is a slot from the first point to the second
        let segments: Vec<&str> = line.split("G85").collect();
        let mut positions = Vec::with_capacity(segments.len());
        for segment in &segments {
            let mut seen = false;
            for caps in coord.captures_iter(segment) {
                if let Some(value) = caps.get(1) {
                    x = number(value.as_str(), &format)?;
                } else if let Some(value) = caps.get(2) {
                    y = number(value.as_str(), &format)?;
                }
                seen = true;
            }
            if seen {
                positions.push((x, y));
            }
        }
        if positions.is_empty() {
            continue;
        }
        points.extend(positions.iter().copied());

        if segments.len() > 1 {
            hits.push(DrillHit::slot(tool));
        } else if !routing && !line.starts_with("G00") && !line.starts_with("G01") {
            hits.push(DrillHit::hole(tool));
        }
    }

    let bounds = Bounds::from_points(points).unwrap_or_default();
    Ok(Layer::excellon(path, bounds, tools, hits))
}
