//! Per-sequence, per-camera path building.
//!
//! For every sequence and camera the builder walks the sequence's time keys in
//! order, drops slow samples, optionally borrows a sibling camera's position,
//! and accumulates the path, bounding box, device metadata and totals.

use std::collections::BTreeMap;
use std::ops::Range;
use std::path::PathBuf;

use crate::camera::Camera;
use crate::record::{Coord, ImageRecord};
use crate::time::NormalizedTime;
use crate::timeline::{Timeline, TimelineSlot};

pub const DEFAULT_MIN_SPEED_KPH: f64 = 5.0;

/// Offset applied to a borrowed sibling position so it does not coincide.
pub const INFERRED_COORD_OFFSET: f64 = 0.000_001;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BuildOptions {
    /// Samples reporting a lower speed are excluded. Samples without speed are kept.
    pub min_speed_kph: f64,
    /// Borrow a sibling camera's position when a sample has none.
    pub infer_coordinates: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            min_speed_kph: DEFAULT_MIN_SPEED_KPH,
            infer_coordinates: false,
        }
    }
}

/// Device identity; the first non-empty value of each field wins.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CameraMeta {
    pub make: Option<String>,
    pub model: Option<String>,
    pub dim_x: Option<u32>,
    pub dim_y: Option<u32>,
}

impl CameraMeta {
    fn absorb(&mut self, record: &ImageRecord) {
        if self.make.is_none() {
            self.make = record.make.clone();
        }
        if self.model.is_none() {
            self.model = record.model.clone();
        }
        if self.dim_x.is_none() {
            self.dim_x = record.pixel_width;
        }
        if self.dim_y.is_none() {
            self.dim_y = record.pixel_height;
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn around(coord: &Coord) -> Self {
        Self {
            min_x: coord.lon,
            min_y: coord.lat,
            max_x: coord.lon,
            max_y: coord.lat,
        }
    }

    pub fn extend(&mut self, coord: &Coord) {
        self.min_x = self.min_x.min(coord.lon);
        self.min_y = self.min_y.min(coord.lat);
        self.max_x = self.max_x.max(coord.lon);
        self.max_y = self.max_y.max(coord.lat);
    }

    pub fn of<'a>(coords: impl IntoIterator<Item = &'a Coord>) -> Option<Self> {
        let mut iter = coords.into_iter();
        let mut bbox = Self::around(iter.next()?);
        for coord in iter {
            bbox.extend(coord);
        }
        Some(bbox)
    }

    pub fn to_array(self) -> [f64; 4] {
        [self.min_x, self.min_y, self.max_x, self.max_y]
    }
}

/// Accumulated state for one camera within one sequence.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraTrack {
    pub camera: Camera,
    pub meta: CameraMeta,
    pub bbox: Option<BoundingBox>,
    pub byte_total: u64,
    pub coord_path: Vec<Coord>,
    pub time_start: Option<NormalizedTime>,
    pub time_end: Option<NormalizedTime>,
    pub file_count: usize,
    /// Kept source files, in time order.
    pub files: Vec<PathBuf>,
    /// Samples dropped by the speed filter.
    pub excluded: usize,
    /// Path points borrowed from a sibling camera.
    pub inferred: usize,
}

impl CameraTrack {
    fn new(camera: Camera) -> Self {
        Self {
            camera,
            meta: CameraMeta::default(),
            bbox: None,
            byte_total: 0,
            coord_path: Vec::new(),
            time_start: None,
            time_end: None,
            file_count: 0,
            files: Vec::new(),
            excluded: 0,
            inferred: 0,
        }
    }

    fn push(&mut self, t: NormalizedTime, record: &ImageRecord, coord: Option<Coord>) {
        self.file_count += 1;
        self.byte_total += record.byte_size;
        self.time_start.get_or_insert(t);
        self.time_end = Some(t);
        self.files.push(record.path.clone());
        self.meta.absorb(record);

        if let Some(coord) = coord {
            match &mut self.bbox {
                Some(bbox) => bbox.extend(&coord),
                None => self.bbox = Some(BoundingBox::around(&coord)),
            }
            self.coord_path.push(coord);
        }
    }

    pub fn feature(&self) -> Option<SequenceFeature> {
        let bbox = self.bbox?;
        if self.coord_path.is_empty() {
            return None;
        }
        Some(SequenceFeature {
            camera: self.camera,
            bearing: self.camera.bearing(),
            meta: self.meta.clone(),
            bbox,
            coordinates: self.coord_path.clone(),
        })
    }
}

/// One emitted path: a camera's surviving positions within a sequence.
#[derive(Clone, Debug, PartialEq)]
pub struct SequenceFeature {
    pub camera: Camera,
    pub bearing: u16,
    pub meta: CameraMeta,
    pub bbox: BoundingBox,
    pub coordinates: Vec<Coord>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Sequence {
    pub index: usize,
    /// First and last timeline key of the sequence, before speed filtering.
    pub span: (NormalizedTime, NormalizedTime),
    pub tracks: BTreeMap<Camera, CameraTrack>,
}

impl Sequence {
    pub fn file_count(&self) -> usize {
        self.tracks.values().map(|t| t.file_count).sum()
    }

    pub fn byte_total(&self) -> u64 {
        self.tracks.values().map(|t| t.byte_total).sum()
    }

    pub fn time_start(&self) -> Option<NormalizedTime> {
        self.tracks.values().filter_map(|t| t.time_start).min()
    }

    pub fn time_end(&self) -> Option<NormalizedTime> {
        self.tracks.values().filter_map(|t| t.time_end).max()
    }

    /// One feature per camera that kept at least one position, in camera order.
    pub fn features(&self) -> Vec<SequenceFeature> {
        self.tracks.values().filter_map(CameraTrack::feature).collect()
    }
}

/// Builds every sequence from the timeline and the segmenter's key ranges.
pub fn build_sequences(
    timeline: &Timeline,
    ranges: &[Range<usize>],
    options: &BuildOptions,
) -> Vec<Sequence> {
    let keys = timeline.keys();
    ranges
        .iter()
        .filter(|range| !range.is_empty() && range.end <= keys.len())
        .enumerate()
        .map(|(index, range)| build_sequence(index, timeline, &keys[range.clone()], options))
        .collect()
}

fn build_sequence(
    index: usize,
    timeline: &Timeline,
    keys: &[NormalizedTime],
    options: &BuildOptions,
) -> Sequence {
    let mut tracks: BTreeMap<Camera, CameraTrack> = BTreeMap::new();

    for &t in keys {
        let Some(slot) = timeline.slot(t) else {
            continue;
        };
        for (&camera, record) in slot {
            let track = tracks
                .entry(camera)
                .or_insert_with(|| CameraTrack::new(camera));

            if is_too_slow(record, options.min_speed_kph) {
                track.excluded += 1;
                continue;
            }

            let mut coord = record.coord;
            if coord.is_none() && options.infer_coordinates {
                coord = sibling_coord(slot, camera);
                if coord.is_some() {
                    track.inferred += 1;
                }
            }
            track.push(t, record, coord);
        }
    }

    for track in tracks.values() {
        log::debug!(
            "sequence{} {}: {} kept, {} slow, {} points ({} inferred)",
            index,
            track.camera,
            track.file_count,
            track.excluded,
            track.coord_path.len(),
            track.inferred
        );
    }

    let sequence = Sequence {
        index,
        span: (keys[0], keys[keys.len() - 1]),
        tracks,
    };
    log::debug!(
        "sequence{}: {} key(s) from {} to {}, {} kept file(s)",
        index,
        keys.len(),
        sequence.span.0,
        sequence.span.1,
        sequence.file_count()
    );
    sequence
}

fn is_too_slow(record: &ImageRecord, min_speed_kph: f64) -> bool {
    record.speed_kph.map_or(false, |speed| speed < min_speed_kph)
}

fn sibling_coord(slot: &TimelineSlot, camera: Camera) -> Option<Coord> {
    slot.iter()
        .filter(|(other, _)| **other != camera)
        .find_map(|(_, record)| record.coord)
        .map(|c| Coord {
            lon: c.lon + INFERRED_COORD_OFFSET,
            lat: c.lat + INFERRED_COORD_OFFSET,
            alt: c.alt,
        })
}
