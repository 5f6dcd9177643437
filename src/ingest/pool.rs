//! Bounded fan-out/fan-in over the extractor.

use std::sync::{mpsc, Mutex};
use std::thread;

use super::{extract_one, ExtractionSet, MetadataExtractor, SourceFile};

/// Runs `extractor` over `files` on at most `workers` threads.
///
/// Returns once every file has an outcome; the scope end is the join
/// barrier. `on_done` fires once per file, from the collecting thread.
pub fn extract_all(
    files: Vec<SourceFile>,
    extractor: &dyn MetadataExtractor,
    workers: usize,
    on_done: &dyn Fn(&SourceFile),
) -> ExtractionSet {
    let mut set = ExtractionSet::new();
    if files.is_empty() {
        return set;
    }
    let workers = workers.clamp(1, files.len());
    let queue = Mutex::new(files.into_iter());
    let (tx, rx) = mpsc::channel();

    thread::scope(|scope| {
        for _ in 0..workers {
            let tx = tx.clone();
            let queue = &queue;
            scope.spawn(move || loop {
                let next = match queue.lock() {
                    Ok(mut files) => files.next(),
                    Err(_) => None,
                };
                let Some(file) = next else { break };
                let outcome = extract_one(extractor, &file);
                if tx.send((file, outcome)).is_err() {
                    break;
                }
            });
        }
        drop(tx);

        for (file, outcome) in rx {
            if let Err(e) = &outcome {
                log::debug!("{}: {}", file.path.display(), e);
            }
            on_done(&file);
            set.insert(&file, outcome);
        }
    });

    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use crate::error::ExtractionFailure;
    use crate::record::RawMetadata;
    use std::cell::Cell;
    use std::path::{Path, PathBuf};

    struct EvenFilesOnly;

    impl MetadataExtractor for EvenFilesOnly {
        fn extract(&self, path: &Path) -> Result<RawMetadata, ExtractionFailure> {
            let stem: u32 = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse().ok())
                .ok_or(ExtractionFailure::NoExif)?;
            if stem % 2 == 1 {
                return Err(ExtractionFailure::NoExif);
            }
            Ok(RawMetadata {
                capture_time: Some(format!("2020:01:01 00:00:{:02}", stem)),
                ..RawMetadata::default()
            })
        }
    }

    fn files(n: u32) -> Vec<SourceFile> {
        (0..n)
            .map(|i| SourceFile {
                camera: Camera::Right,
                path: PathBuf::from(format!("right/{}.jpg", i)),
                byte_size: 10,
            })
            .collect()
    }

    #[test]
    fn every_file_gets_exactly_one_outcome() {
        let done = Cell::new(0);
        let set = extract_all(files(40), &EvenFilesOnly, 4, &|_| done.set(done.get() + 1));
        assert_eq!(done.get(), 40);
        assert_eq!(set.len(), 40);
        assert_eq!(set.record_count(), 20);
        assert_eq!(set.failures().count(), 20);
        assert_eq!(set.scanned_bytes(), 400);
    }

    #[test]
    fn result_does_not_depend_on_worker_count() {
        let one = extract_all(files(25), &EvenFilesOnly, 1, &|_| {}).into_records();
        let many = extract_all(files(25), &EvenFilesOnly, 16, &|_| {}).into_records();
        assert_eq!(one, many);
    }

    #[test]
    fn zero_workers_still_runs() {
        let set = extract_all(files(3), &EvenFilesOnly, 0, &|_| {});
        assert_eq!(set.len(), 3);
    }
}
