use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::camera::Camera;
use crate::error::{ExtractionFailure, InvalidCoordinate};
use crate::time::parse_capture_time;

/// A WGS84 position. Serialized as `[lon, lat]` or `[lon, lat, alt]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(into = "Vec<f64>", try_from = "Vec<f64>")]
pub struct Coord {
    pub lon: f64,
    pub lat: f64,
    pub alt: Option<f64>,
}

impl Coord {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self {
            lon,
            lat,
            alt: None,
        }
    }

    pub fn with_alt(mut self, alt: f64) -> Self {
        self.alt = Some(alt);
        self
    }

    pub fn checked(self) -> Result<Self, InvalidCoordinate> {
        let in_range = self.lon.is_finite()
            && self.lat.is_finite()
            && (-180.0..=180.0).contains(&self.lon)
            && (-90.0..=90.0).contains(&self.lat);
        if in_range {
            Ok(self)
        } else {
            Err(InvalidCoordinate::OutOfRange {
                lon: self.lon,
                lat: self.lat,
            })
        }
    }
}

impl From<Coord> for Vec<f64> {
    fn from(c: Coord) -> Self {
        let mut v = vec![c.lon, c.lat];
        if let Some(alt) = c.alt {
            v.push(alt);
        }
        v
    }
}

impl TryFrom<Vec<f64>> for Coord {
    type Error = String;

    fn try_from(v: Vec<f64>) -> Result<Self, Self::Error> {
        match v.as_slice() {
            [lon, lat] => Ok(Coord::new(*lon, *lat)),
            [lon, lat, alt] => Ok(Coord::new(*lon, *lat).with_alt(*alt)),
            _ => Err(format!("coordinate must have 2 or 3 members, got {}", v.len())),
        }
    }
}

/// Whatever an extractor could read from one file. Every field may be absent.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RawMetadata {
    pub capture_time: Option<String>,
    pub subsec: Option<String>,
    pub coord: Option<Coord>,
    pub speed_kph: Option<f64>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub pixel_width: Option<u32>,
    pub pixel_height: Option<u32>,
}

/// One successfully extracted image. Immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageRecord {
    pub camera: Camera,
    pub path: PathBuf,
    pub byte_size: u64,
    pub raw_capture_time: NaiveDateTime,
    pub coord: Option<Coord>,
    pub speed_kph: Option<f64>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub pixel_width: Option<u32>,
    pub pixel_height: Option<u32>,
}

impl ImageRecord {
    /// Builds a record; files without a usable capture time are rejected.
    pub fn from_metadata(
        camera: Camera,
        path: PathBuf,
        byte_size: u64,
        meta: RawMetadata,
    ) -> Result<Self, ExtractionFailure> {
        let raw_capture_time = meta
            .capture_time
            .as_deref()
            .and_then(|raw| parse_capture_time(raw, meta.subsec.as_deref()))
            .ok_or(ExtractionFailure::NoTimestamp)?;
        let coord = meta.coord.and_then(|c| match c.checked() {
            Ok(c) => Some(c),
            Err(e) => {
                log::debug!("{}: ignoring position: {}", path.display(), e);
                None
            }
        });
        Ok(Self {
            camera,
            path,
            byte_size,
            raw_capture_time,
            coord,
            speed_kph: meta.speed_kph.filter(|s| s.is_finite() && *s >= 0.0),
            make: non_empty(meta.make),
            model: non_empty(meta.model),
            pixel_width: meta.pixel_width.filter(|w| *w > 0),
            pixel_height: meta.pixel_height.filter(|h| *h > 0),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
