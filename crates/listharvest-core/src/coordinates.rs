//! Coordinate list loading.
//!
//! The coordinates file is line-oriented: every non-blank, non-comment line is
//! a JSON object such as `{ "lat": 35.7, "lng": 51.4 },`. A bad line is logged
//! and skipped; it never aborts the load.

use std::path::Path;

use serde::Deserialize;

use crate::ConfigError;

/// A geographic search center. Immutable once loaded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    /// Builds a coordinate, returning `None` when either component is
    /// non-finite or outside the valid latitude/longitude range.
    #[must_use]
    pub fn new(lat: f64, lng: f64) -> Option<Self> {
        let valid = lat.is_finite()
            && lng.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lng);
        valid.then_some(Self { lat, lng })
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.lat, self.lng)
    }
}

#[derive(Debug, Deserialize)]
struct RawCoordinate {
    lat: Component,
    lng: Option<Component>,
    long: Option<Component>,
    lon: Option<Component>,
}

impl RawCoordinate {
    /// Longitude keys present on the line, in `lng`, `long`, `lon` order.
    fn longitudes(&self) -> Vec<(&'static str, &Component)> {
        [("lng", &self.lng), ("long", &self.long), ("lon", &self.lon)]
            .into_iter()
            .filter_map(|(key, value)| value.as_ref().map(|v| (key, v)))
            .collect()
    }
}

/// Coordinate files in the wild carry both `35.7` and `"35.7"`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Component {
    Number(f64),
    Text(String),
}

impl Component {
    fn value(&self) -> Option<f64> {
        match self {
            Component::Number(n) => Some(*n),
            Component::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }
}

/// Parses coordinates from the text of a coordinates file.
///
/// Blank lines and lines starting with `#` are ignored. One trailing comma is
/// tolerated. Lines that are not a JSON object with numeric `lat` and
/// `lng` (or `long`/`lon`) fields inside the valid range are skipped with a
/// warning.
#[must_use]
pub fn parse_coordinates(text: &str) -> Vec<Coordinate> {
    parse_coordinate_bytes(text.as_bytes())
}

/// Like [`parse_coordinates`], but decodes each line separately so one line
/// of invalid UTF-8 only costs that line.
fn parse_coordinate_bytes(bytes: &[u8]) -> Vec<Coordinate> {
    bytes
        .split(|b| *b == b'\n')
        .enumerate()
        .filter_map(|(idx, raw)| match std::str::from_utf8(raw) {
            Ok(line) => parse_line(idx + 1, line),
            Err(e) => {
                tracing::warn!(
                    line = idx + 1,
                    error = %e,
                    "skipping coordinate line that is not valid UTF-8"
                );
                None
            }
        })
        .collect()
}

fn parse_line(line_no: usize, line: &str) -> Option<Coordinate> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let body = line.strip_suffix(',').unwrap_or(line).trim_end();

    let raw = match serde_json::from_str::<RawCoordinate>(body) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(
                line = line_no,
                content = %line,
                error = %e,
                "skipping unparseable coordinate line"
            );
            return None;
        }
    };

    let longitudes = raw.longitudes();
    let lng_component = match longitudes.as_slice() {
        [(_, component)] => *component,
        [] => {
            tracing::warn!(
                line = line_no,
                content = %line,
                "skipping coordinate line without a longitude"
            );
            return None;
        }
        several => {
            let keys: Vec<&str> = several.iter().map(|(key, _)| *key).collect();
            tracing::warn!(
                line = line_no,
                keys = %keys.join(", "),
                "skipping coordinate line with conflicting longitude keys"
            );
            return None;
        }
    };

    let (Some(lat), Some(lng)) = (raw.lat.value(), lng_component.value()) else {
        tracing::warn!(
            line = line_no,
            content = %line,
            "skipping coordinate line with non-numeric value"
        );
        return None;
    };

    let coordinate = Coordinate::new(lat, lng);
    if coordinate.is_none() {
        tracing::warn!(line = line_no, lat, lng, "skipping out-of-range coordinate");
    }
    coordinate
}

/// Loads coordinates from `path`.
///
/// A missing file is not an error: a warning is logged and an empty list is
/// returned so the caller can decide not to harvest. Lines that are not valid
/// UTF-8 are skipped like any other bad line.
///
/// # Errors
///
/// Returns [`ConfigError::CoordinatesFileIo`] if the file exists but cannot be read.
pub fn load_coordinates(path: &Path) -> Result<Vec<Coordinate>, ConfigError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "coordinates file not found");
            return Ok(Vec::new());
        }
        Err(e) => {
            return Err(ConfigError::CoordinatesFileIo {
                path: path.display().to_string(),
                source: e,
            })
        }
    };

    let coordinates = parse_coordinate_bytes(&bytes);
    tracing::debug!(path = %path.display(), count = coordinates.len(), "loaded coordinates");
    Ok(coordinates)
}
