//! Image metadata ingestion.
//!
//! This module turns camera folders into an owned `ExtractionSet`:
//! - `scan` discovers candidate files under the camera folders
//! - `pool` runs the extractor over them on a bounded set of worker threads
//! - `exif` is the default extractor (feature: exif)
//!
//! The ingestion layer is responsible for:
//! - Assigning each file to exactly one camera
//! - Recording per-file failures without aborting the run
//! - Handing a complete, immutable record set to the pipeline
//!
//! The ingestion layer MUST NOT:
//! - Normalize or reorder capture times
//! - Drop a file without recording why

#[cfg(feature = "exif")]
pub mod exif;
pub mod pool;
pub mod scan;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::camera::Camera;
use crate::error::ExtractionFailure;
use crate::record::{ImageRecord, RawMetadata};

#[cfg(feature = "exif")]
pub use self::exif::ExifExtractor;
pub use pool::extract_all;
pub use scan::scan_camera_folders;

/// Reads capture metadata from one image file.
///
/// Implementations are shared across worker threads.
pub trait MetadataExtractor: Sync {
    fn extract(&self, path: &Path) -> Result<RawMetadata, ExtractionFailure>;
}

/// A candidate file found under a camera folder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceFile {
    pub camera: Camera,
    pub path: PathBuf,
    pub byte_size: u64,
}

/// Every scanned file and what became of it, keyed by path.
#[derive(Debug, Default)]
pub struct ExtractionSet {
    outcomes: BTreeMap<PathBuf, Result<ImageRecord, ExtractionFailure>>,
    scanned_bytes: u64,
}

impl ExtractionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the outcome for one file. Each path owns exactly one slot.
    pub fn insert(
        &mut self,
        file: &SourceFile,
        outcome: Result<ImageRecord, ExtractionFailure>,
    ) {
        if self.outcomes.insert(file.path.clone(), outcome).is_none() {
            self.scanned_bytes += file.byte_size;
        }
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn scanned_bytes(&self) -> u64 {
        self.scanned_bytes
    }

    pub fn record_count(&self) -> usize {
        self.outcomes.values().filter(|o| o.is_ok()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&Path, &ExtractionFailure)> {
        self.outcomes
            .iter()
            .filter_map(|(path, outcome)| outcome.as_ref().err().map(|e| (path.as_path(), e)))
    }

    /// Consumes the set, yielding successful records in path order.
    pub fn into_records(self) -> Vec<ImageRecord> {
        self.outcomes.into_values().filter_map(Result::ok).collect()
    }
}

/// Extracts one file and builds its record.
pub fn extract_one(
    extractor: &dyn MetadataExtractor,
    file: &SourceFile,
) -> Result<ImageRecord, ExtractionFailure> {
    let meta = extractor.extract(&file.path)?;
    log::trace!("{}: {:?}", file.path.display(), meta);
    ImageRecord::from_metadata(file.camera, file.path.clone(), file.byte_size, meta)
}
