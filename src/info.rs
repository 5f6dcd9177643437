//! Statistics over written sequence collections.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::{Result, StreetcarError};
use crate::geojson::FeatureCollection;
use crate::record::Coord;

const EARTH_RADIUS_M: f64 = 6_371_008.8;
const METERS_PER_MILE: f64 = 1609.344;
const BYTE_UNITS: [&str; 5] = ["KB", "MB", "GB", "TB", "PB"];

#[derive(Clone, Debug, PartialEq)]
pub struct SequenceInfo {
    pub slug: String,
    pub sequence: usize,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_secs: i64,
    pub miles: f64,
    pub files: usize,
    pub bytes: u64,
}

impl SequenceInfo {
    /// Distance is measured along the first feature, normally the front camera.
    pub fn from_collection(fc: &FeatureCollection) -> Self {
        let props = &fc.collection_properties;
        let start = DateTime::from_timestamp_millis(props.time_start).unwrap_or_default();
        let end = DateTime::from_timestamp_millis(props.time_end).unwrap_or_default();
        let miles = fc
            .features
            .first()
            .map(|f| line_distance_miles(&f.geometry.coordinates))
            .unwrap_or(0.0);
        Self {
            slug: props.slug.clone(),
            sequence: props.sequence,
            start,
            end,
            duration_secs: (props.time_end - props.time_start).max(0) / 1000,
            miles,
            files: props.num_files,
            bytes: props.num_bytes,
        }
    }

    pub fn avg_mph(&self) -> Option<f64> {
        (self.duration_secs > 0).then(|| self.miles / (self.duration_secs as f64 / 3600.0))
    }

    /// Labelled values in display order.
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Slug", self.slug.clone()),
            ("Sequence", self.sequence.to_string()),
            ("Date", self.start.format("%a %b %d %Y").to_string()),
            ("Start", self.start.format("%H:%M:%S UTC").to_string()),
            ("End", self.end.format("%H:%M:%S UTC").to_string()),
            ("Duration", format_duration(self.duration_secs)),
            ("Distance", format!("{:.2} mi", self.miles)),
            (
                "Avg Speed",
                self.avg_mph()
                    .map(|mph| format!("{:.2} mph", mph))
                    .unwrap_or_else(|| "n/a".to_string()),
            ),
            ("Files", format!("{} files", self.files)),
            ("Size", format_bytes(self.bytes)),
        ]
    }
}

/// Great-circle length of a path, in miles.
pub fn line_distance_miles(coords: &[Coord]) -> f64 {
    coords
        .windows(2)
        .map(|pair| haversine_m(&pair[0], &pair[1]))
        .sum::<f64>()
        / METERS_PER_MILE
}

fn haversine_m(a: &Coord, b: &Coord) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = lat2 - lat1;
    let dlon = (b.lon - a.lon).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().atan2((1.0 - h).sqrt())
}

/// `1d 2h 3m 4s`, omitting zero parts.
pub fn format_duration(secs: i64) -> String {
    if secs <= 0 {
        return "0s".to_string();
    }
    let parts = [
        (secs / 86_400, "d"),
        (secs / 3600 % 24, "h"),
        (secs / 60 % 60, "m"),
        (secs % 60, "s"),
    ];
    parts
        .iter()
        .filter(|(n, _)| *n > 0)
        .map(|(n, unit)| format!("{}{}", n, unit))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Binary-prefixed size, two decimals at most: `512 B`, `1.5 KB`, `2.25 GB`.
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < BYTE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let text = format!("{:.2}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", text, BYTE_UNITS[unit])
}

/// Reads every `.geojson` collection in `dir`, ordered by sequence number.
pub fn load_collections(dir: &Path) -> Result<Vec<(PathBuf, FeatureCollection)>> {
    let entries = std::fs::read_dir(dir).map_err(|e| StreetcarError::fs(dir, e))?;
    let mut out = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| StreetcarError::fs(dir, e))?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("geojson") {
            continue;
        }
        let raw = std::fs::read(&path).map_err(|e| StreetcarError::fs(&path, e))?;
        let fc: FeatureCollection = serde_json::from_slice(&raw).map_err(|source| {
            StreetcarError::Decode {
                path: path.clone(),
                source,
            }
        })?;
        out.push((path, fc));
    }
    out.sort_by_key(|(_, fc)| fc.collection_properties.sequence);
    Ok(out)
}
