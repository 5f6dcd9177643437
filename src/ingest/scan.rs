//! Camera folder discovery.

use std::path::Path;

use walkdir::{DirEntry, WalkDir};

use super::SourceFile;
use crate::camera::Camera;
use crate::error::{Result, StreetcarError};

/// Finds every regular file under the camera folders directly below `root`.
///
/// Camera folders are matched by name (`front`, `back`, `rear`, `left`,
/// `right`, any case). Generated `sequence*` folders, the output folder and
/// hidden entries are skipped. The result is sorted by path.
pub fn scan_camera_folders(root: &Path, output_dir: &Path) -> Result<Vec<SourceFile>> {
    let entries = std::fs::read_dir(root).map_err(|e| StreetcarError::fs(root, e))?;
    let mut folders = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| StreetcarError::fs(root, e))?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        if let Some(camera) = Camera::from_folder(&path) {
            log::debug!("found {} camera at {}", camera, path.display());
            folders.push((camera, path));
        }
    }
    folders.sort();

    let mut files = Vec::new();
    for (camera, folder) in folders {
        let walker = WalkDir::new(&folder)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_skipped(e, output_dir));
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("skipping unreadable entry under {}: {}", folder.display(), e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let byte_size = match entry.metadata() {
                Ok(meta) => meta.len(),
                Err(e) => {
                    log::warn!("skipping {}: {}", entry.path().display(), e);
                    continue;
                }
            };
            files.push(SourceFile {
                camera,
                path: entry.into_path(),
                byte_size,
            });
        }
    }
    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

fn is_skipped(entry: &DirEntry, output_dir: &Path) -> bool {
    let name = entry.file_name().to_string_lossy();
    if name.starts_with('.') {
        return true;
    }
    if entry.file_type().is_dir() {
        let lower = name.to_ascii_lowercase();
        return lower.starts_with("sequence") || entry.path() == output_dir;
    }
    false
}
