//! Filing of run results under the capture root.
//!
//! Layout:
//! - `<output_dir>/geojson/sequence<N>.geojson`, one collection per sequence
//! - `<root>/sequence<N>/<camera>/<parent folder>/<file>`, symlinks to the
//!   source images kept in that sequence
//!
//! Results of a previous run are removed by `prepare` before anything is
//! written, so the tree always reflects exactly one run.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::builder::Sequence;
use crate::error::{Result, StreetcarError};
use crate::geojson::FeatureCollection;

pub const SEQUENCE_DIR_PREFIX: &str = "sequence";
const GEOJSON_DIR: &str = "geojson";
const GEOJSON_EXT: &str = "geojson";

#[derive(Clone, Debug)]
pub struct OutputWriter {
    root: PathBuf,
    output_dir: PathBuf,
}

impl OutputWriter {
    pub fn new(root: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            output_dir: output_dir.into(),
        }
    }

    pub fn geojson_dir(&self) -> PathBuf {
        self.output_dir.join(GEOJSON_DIR)
    }

    pub fn collection_path(&self, sequence: usize) -> PathBuf {
        self.geojson_dir()
            .join(format!("{}{}.{}", SEQUENCE_DIR_PREFIX, sequence, GEOJSON_EXT))
    }

    pub fn sequence_dir(&self, sequence: usize) -> PathBuf {
        self.root.join(format!("{}{}", SEQUENCE_DIR_PREFIX, sequence))
    }

    /// Creates the output folders and removes results of earlier runs.
    pub fn prepare(&self) -> Result<()> {
        self.clear()?;
        let geojson_dir = self.geojson_dir();
        std::fs::create_dir_all(&geojson_dir).map_err(|e| StreetcarError::fs(&geojson_dir, e))
    }

    /// Removes earlier `sequence*` link folders and collections. Creates nothing.
    pub fn clear(&self) -> Result<()> {
        for entry in read_dir(&self.root)? {
            let path = entry.path();
            let is_sequence_dir = entry
                .file_name()
                .to_str()
                .map_or(false, |name| name.starts_with(SEQUENCE_DIR_PREFIX))
                && entry.file_type().map_or(false, |t| t.is_dir());
            if is_sequence_dir {
                log::debug!("removing previous {}", path.display());
                std::fs::remove_dir_all(&path).map_err(|e| StreetcarError::fs(&path, e))?;
            }
        }

        let geojson_dir = self.geojson_dir();
        if !geojson_dir.is_dir() {
            return Ok(());
        }
        for entry in read_dir(&geojson_dir)? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some(GEOJSON_EXT) {
                std::fs::remove_file(&path).map_err(|e| StreetcarError::fs(&path, e))?;
            }
        }
        Ok(())
    }

    pub fn write_collection(&self, collection: &FeatureCollection) -> Result<PathBuf> {
        let sequence = collection.collection_properties.sequence;
        let path = self.collection_path(sequence);
        let json = serde_json::to_vec(collection)
            .map_err(|source| StreetcarError::Encode { sequence, source })?;
        std::fs::write(&path, json).map_err(|e| StreetcarError::fs(&path, e))?;
        Ok(path)
    }

    /// Links every kept source file of `sequence` into its sequence folder.
    ///
    /// Returns the number of links created.
    pub fn link_sequence(&self, sequence: &Sequence) -> Result<usize> {
        let base = self.sequence_dir(sequence.index);
        let mut created = 0;
        for track in sequence.tracks.values() {
            for file in &track.files {
                let link = link_path(&base.join(track.camera.as_str()), file);
                if let Some(parent) = link.parent() {
                    std::fs::create_dir_all(parent).map_err(|e| StreetcarError::fs(parent, e))?;
                }
                let target = std::fs::canonicalize(file).map_err(|e| StreetcarError::fs(file, e))?;
                match symlink(&target, &link) {
                    Ok(()) => created += 1,
                    Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                        log::warn!("{} already linked, skipping {}", link.display(), file.display());
                    }
                    Err(e) => return Err(StreetcarError::fs(&link, e)),
                }
            }
        }
        Ok(created)
    }
}

/// `<camera_dir>/<parent folder name>/<file name>`.
fn link_path(camera_dir: &Path, file: &Path) -> PathBuf {
    let mut link = camera_dir.to_path_buf();
    if let Some(container) = file.parent().and_then(Path::file_name) {
        link.push(container);
    }
    if let Some(name) = file.file_name() {
        link.push(name);
    }
    link
}

fn read_dir(dir: &Path) -> Result<Vec<std::fs::DirEntry>> {
    std::fs::read_dir(dir)
        .and_then(|entries| entries.collect::<std::io::Result<Vec<_>>>())
        .map_err(|e| StreetcarError::fs(dir, e))
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}
