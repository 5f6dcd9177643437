//! Streetcar
//!
//! This crate aligns images captured simultaneously by several fixed cameras
//! on a moving vehicle and turns each contiguous recording run into one
//! GeoJSON path per camera.
//!
//! # Architecture
//!
//! Data flows one way, and no stage mutates what an earlier stage produced:
//!
//! 1. **Ingest**: camera folders are scanned and every file's capture metadata
//!    is extracted on a bounded worker pool into an owned `ExtractionSet`.
//! 2. **Normalize**: capture times are shifted to UTC by a fixed, configured
//!    offset; same-camera duplicates are nudged apart one second at a time.
//! 3. **Assemble**: records are grouped into an ordered timeline, one record
//!    per camera per instant.
//! 4. **Segment**: the timeline is cut wherever consecutive instants are at
//!    least the cut gap apart.
//! 5. **Build**: per sequence and camera, slow samples are dropped and the
//!    path, bounding box, device metadata and totals are accumulated.
//! 6. **Emit**: one feature collection per sequence, filed under the output
//!    folder, with optional symlinks back to the kept source images.
//!
//! Only step 1 is concurrent. Steps 2 to 6 are deterministic functions of
//! the extracted record set.
//!
//! # Module Structure
//!
//! - `ingest`: extractor contract, EXIF extractor, worker pool, folder scan
//! - `time`, `timeline`, `segment`, `builder`: the alignment core
//! - `geojson`, `output`: wire format and on-disk layout
//! - `pipeline`: a full run end to end
//! - `info`: statistics over written collections

pub mod builder;
pub mod camera;
pub mod config;
pub mod error;
pub mod geojson;
pub mod info;
pub mod ingest;
pub mod output;
pub mod pipeline;
pub mod record;
pub mod segment;
pub mod time;
pub mod timeline;

pub use builder::{build_sequences, BoundingBox, BuildOptions, CameraTrack, Sequence, SequenceFeature};
pub use camera::Camera;
pub use config::{ConfigOverrides, StreetcarConfig};
pub use error::{ExtractionFailure, InvalidCoordinate, Result, StreetcarError};
pub use geojson::{CollectionContext, FeatureCollection};
#[cfg(feature = "exif")]
pub use ingest::ExifExtractor;
pub use ingest::{ExtractionSet, MetadataExtractor, SourceFile};
pub use output::OutputWriter;
pub use pipeline::{Pipeline, PipelineOutput, WriteSummary};
pub use record::{Coord, ImageRecord, RawMetadata};
pub use segment::segment;
pub use time::{normalize, NormalizedTime, UtcOffset};
pub use timeline::{assemble, Timeline, TimelineSlot};
