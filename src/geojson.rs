//! GeoJSON feature collections, one per sequence.

use std::path::Path;
use std::sync::OnceLock;

use chrono::DateTime;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::builder::{Sequence, SequenceFeature};
use crate::camera::Camera;
use crate::error::{Result, StreetcarError};
use crate::record::Coord;
use crate::time::NormalizedTime;

pub const GENERATOR: &str = env!("CARGO_PKG_NAME");
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectionType {
    FeatureCollection,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureType {
    Feature,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeometryType {
    LineString,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: CollectionType,
    pub collection_properties: CollectionProperties,
    pub features: Vec<Feature>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionProperties {
    pub generator: String,
    pub version: String,
    pub source: String,
    pub slug: String,
    pub sequence: usize,
    pub num_files: usize,
    pub num_bytes: u64,
    /// Epoch milliseconds of the first kept sample.
    pub time_start: i64,
    /// Epoch milliseconds of the last kept sample.
    pub time_end: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: FeatureType,
    pub id: Camera,
    pub bbox: [f64; 4],
    pub properties: FeatureProperties,
    pub geometry: Geometry,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureProperties {
    pub camera: Camera,
    pub camera_angle: u16,
    pub make: Option<String>,
    pub model: Option<String>,
    pub dimensions: [Option<u32>; 2],
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    #[serde(rename = "type")]
    pub kind: GeometryType,
    pub coordinates: Vec<Coord>,
}

impl From<SequenceFeature> for Feature {
    fn from(f: SequenceFeature) -> Self {
        Feature {
            kind: FeatureType::Feature,
            id: f.camera,
            bbox: f.bbox.to_array(),
            properties: FeatureProperties {
                camera: f.camera,
                camera_angle: f.bearing,
                make: f.meta.make,
                model: f.meta.model,
                dimensions: [f.meta.dim_x, f.meta.dim_y],
            },
            geometry: Geometry {
                kind: GeometryType::LineString,
                coordinates: f.coordinates,
            },
        }
    }
}

/// Run-wide values stamped onto every collection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectionContext {
    pub generator: String,
    pub version: String,
    pub source: String,
    pub location: String,
}

impl CollectionContext {
    /// Context for a run rooted at `root`; the location comes from its folder name.
    pub fn for_root(root: &Path) -> Result<Self> {
        Ok(Self {
            generator: GENERATOR.to_string(),
            version: VERSION.to_string(),
            source: root.display().to_string(),
            location: location_slug(root)?,
        })
    }
}

impl FeatureCollection {
    /// Builds the collection for a sequence. `None` when no camera kept a position.
    pub fn from_sequence(sequence: &Sequence, ctx: &CollectionContext) -> Option<Self> {
        let features: Vec<Feature> = sequence.features().into_iter().map(Feature::from).collect();
        if features.is_empty() {
            return None;
        }
        let time_start = sequence.time_start()?;
        let time_end = sequence.time_end()?;
        Some(Self {
            kind: CollectionType::FeatureCollection,
            collection_properties: CollectionProperties {
                generator: ctx.generator.clone(),
                version: ctx.version.clone(),
                source: ctx.source.clone(),
                slug: format!("{}_{}", date_slug(time_start), ctx.location),
                sequence: sequence.index,
                num_files: sequence.file_count(),
                num_bytes: sequence.byte_total(),
                time_start: time_start.millis(),
                time_end: time_end.millis(),
            },
            features,
        })
    }
}

/// `YYYY_MM_DD` of a normalized time, in UTC.
pub fn date_slug(t: NormalizedTime) -> String {
    DateTime::from_timestamp_millis(t.millis())
        .map(|d| d.format("%Y_%m_%d").to_string())
        .unwrap_or_else(|| "0000_00_00".to_string())
}

/// Lowercased folder name of `root`, from its first letter onwards.
pub fn location_slug(root: &Path) -> Result<String> {
    static LEADING_NON_ALPHA: OnceLock<Regex> = OnceLock::new();
    let re = LEADING_NON_ALPHA.get_or_init(|| {
        Regex::new(r"^[^A-Za-z]*(.*)$").expect("static regex is valid")
    });

    let name = root
        .components()
        .filter_map(|c| match c {
            std::path::Component::Normal(name) => name.to_str(),
            _ => None,
        })
        .last()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| {
            StreetcarError::config(format!(
                "{} has no folder name; run inside the capture folder",
                root.display()
            ))
        })?;

    let trimmed = re
        .captures(name)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(name);
    Ok(trimmed.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{build_sequences, BuildOptions};
    use crate::segment::segment;
    use crate::time::UtcOffset;
    use crate::timeline::assemble;
    use crate::timeline::tests::record_at;
    use serde_json::json;

    fn ctx() -> CollectionContext {
        CollectionContext {
            generator: "streetcar".into(),
            version: "0.0.0-test".into(),
            source: "/data/2017-06-12 Georgetown".into(),
            location: "georgetown".into(),
        }
    }

    #[test]
    fn location_slug_strips_leading_non_letters() {
        let slug = location_slug(Path::new("/data/2017-06-12 Georgetown")).unwrap();
        assert_eq!(slug, "georgetown");
        assert_eq!(location_slug(Path::new("Dupont")).unwrap(), "dupont");
        assert_eq!(location_slug(Path::new("/data/20170612/")).unwrap(), "20170612");
        assert!(location_slug(Path::new("/")).is_err());
    }

    #[test]
    fn date_slug_is_utc() {
        // 2017-06-12T23:30:00Z
        assert_eq!(date_slug(NormalizedTime(1_497_310_200_000)), "2017_06_12");
    }

    #[test]
    fn collection_wire_format() {
        let t0 = 1_497_310_200_000;
        let mut front = record_at(Camera::Front, "front/a.jpg", t0);
        front.coord = Some(Coord::new(-77.06, 38.90).with_alt(20.0));
        front.make = Some("GoPro".into());
        front.pixel_width = Some(4000);
        let mut right = record_at(Camera::Right, "right/a.jpg", t0 + 1000);
        right.coord = Some(Coord::new(-77.05, 38.91));

        let timeline = assemble(vec![front, right], UtcOffset::UTC);
        let seqs = build_sequences(
            &timeline,
            &segment(&timeline.keys(), 5000),
            &BuildOptions::default(),
        );
        let fc = FeatureCollection::from_sequence(&seqs[0], &ctx()).expect("features");
        let value = serde_json::to_value(&fc).unwrap();

        assert_eq!(value["type"], "FeatureCollection");
        assert_eq!(
            value["collectionProperties"],
            json!({
                "generator": "streetcar",
                "version": "0.0.0-test",
                "source": "/data/2017-06-12 Georgetown",
                "slug": "2017_06_12_georgetown",
                "sequence": 0,
                "numFiles": 2,
                "numBytes": 200,
                "timeStart": t0,
                "timeEnd": t0 + 1000
            })
        );
        assert_eq!(
            value["features"][0],
            json!({
                "type": "Feature",
                "id": "front",
                "bbox": [-77.06, 38.90, -77.06, 38.90],
                "properties": {
                    "camera": "front",
                    "cameraAngle": 0,
                    "make": "GoPro",
                    "model": null,
                    "dimensions": [4000, null]
                },
                "geometry": {
                    "type": "LineString",
                    "coordinates": [[-77.06, 38.90, 20.0]]
                }
            })
        );
        assert_eq!(value["features"][1]["properties"]["cameraAngle"], 90);

        let back: FeatureCollection = serde_json::from_value(value).unwrap();
        assert_eq!(back, fc);
    }

    #[test]
    fn sequence_without_positions_has_no_collection() {
        let timeline = assemble(
            vec![record_at(Camera::Left, "left/a.jpg", 0)],
            UtcOffset::UTC,
        );
        let seqs = build_sequences(
            &timeline,
            &segment(&timeline.keys(), 5000),
            &BuildOptions::default(),
        );
        assert!(FeatureCollection::from_sequence(&seqs[0], &ctx()).is_none());
    }
}
