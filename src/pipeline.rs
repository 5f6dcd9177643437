//! End-to-end run: scan, extract, then the single-threaded core, then filing.
//!
//! Extraction is the only concurrent stage. Its result set is complete before
//! the timeline is assembled, and nothing after that point runs in parallel.

use std::path::{Path, PathBuf};

use crate::builder::{build_sequences, Sequence};
use crate::config::StreetcarConfig;
use crate::error::Result;
use crate::geojson::{CollectionContext, FeatureCollection};
use crate::ingest::{extract_all, scan_camera_folders, ExtractionSet, MetadataExtractor, SourceFile};
use crate::output::OutputWriter;
use crate::record::ImageRecord;
use crate::segment::segment;
use crate::timeline::{assemble, CollisionStats};

/// Everything the core computed for one run.
#[derive(Debug, Default)]
pub struct PipelineOutput {
    pub files_scanned: usize,
    pub bytes_scanned: u64,
    pub records: usize,
    pub failures: usize,
    pub timeline_keys: usize,
    pub collisions: CollisionStats,
    pub sequences: Vec<Sequence>,
}

impl PipelineOutput {
    /// True when no file yielded a usable record.
    pub fn is_empty(&self) -> bool {
        self.records == 0
    }
}

#[derive(Debug, Default)]
pub struct WriteSummary {
    pub collections: Vec<PathBuf>,
    pub links: usize,
}

/// Assembles, segments and builds sequences from a complete record set.
pub fn process(records: Vec<ImageRecord>, config: &StreetcarConfig) -> PipelineOutput {
    let record_count = records.len();
    let timeline = assemble(records, config.utc_offset);
    let keys = timeline.keys();
    let ranges = segment(&keys, config.cut_gap_ms());
    let sequences = build_sequences(&timeline, &ranges, &config.build_options());

    let collisions = timeline.collisions();
    if collisions != CollisionStats::default() {
        log::info!(
            "resolved duplicate capture times: {} moved back, {} deferred",
            collisions.displaced_back,
            collisions.deferred_forward
        );
    }
    log::info!(
        "{} records on {} time keys in {} sequence(s)",
        record_count,
        keys.len(),
        sequences.len()
    );

    PipelineOutput {
        records: record_count,
        timeline_keys: keys.len(),
        collisions,
        sequences,
        ..PipelineOutput::default()
    }
}

pub struct Pipeline<'a> {
    root: PathBuf,
    config: &'a StreetcarConfig,
    extractor: &'a dyn MetadataExtractor,
    context: CollectionContext,
    writer: OutputWriter,
}

impl<'a> Pipeline<'a> {
    /// Fails on configuration problems before any file is touched.
    pub fn new(
        root: &Path,
        config: &'a StreetcarConfig,
        extractor: &'a dyn MetadataExtractor,
    ) -> Result<Self> {
        let context = CollectionContext::for_root(root)?;
        let writer = OutputWriter::new(root, config.output_dir_in(root));
        Ok(Self {
            root: root.to_path_buf(),
            config,
            extractor,
            context,
            writer,
        })
    }

    pub fn writer(&self) -> &OutputWriter {
        &self.writer
    }

    pub fn scan(&self) -> Result<Vec<SourceFile>> {
        let files = scan_camera_folders(&self.root, &self.config.output_dir_in(&self.root))?;
        log::info!("found {} file(s) under {}", files.len(), self.root.display());
        Ok(files)
    }

    pub fn extract(&self, files: Vec<SourceFile>, on_done: &dyn Fn(&SourceFile)) -> ExtractionSet {
        extract_all(files, self.extractor, self.config.workers, on_done)
    }

    pub fn process(&self, set: ExtractionSet) -> PipelineOutput {
        let files_scanned = set.len();
        let bytes_scanned = set.scanned_bytes();
        let failures = set.failures().count();
        if failures > 0 {
            log::info!("{} file(s) had no usable metadata", failures);
        }
        PipelineOutput {
            files_scanned,
            bytes_scanned,
            failures,
            ..process(set.into_records(), self.config)
        }
    }

    /// Replaces the previous run's files with this run's collections and links.
    pub fn write(&self, output: &PipelineOutput) -> Result<WriteSummary> {
        self.writer.prepare()?;
        let mut summary = WriteSummary::default();
        for sequence in &output.sequences {
            let Some(collection) = FeatureCollection::from_sequence(sequence, &self.context) else {
                log::info!("sequence{}: no positions, nothing written", sequence.index);
                continue;
            };
            let path = self.writer.write_collection(&collection)?;
            log::info!(
                "sequence{}: {} feature(s), {} file(s) -> {}",
                sequence.index,
                collection.features.len(),
                collection.collection_properties.num_files,
                path.display()
            );
            summary.collections.push(path);
            if self.config.link_files {
                summary.links += self.writer.link_sequence(sequence)?;
            }
        }
        Ok(summary)
    }

    /// Full run. An empty result writes nothing but still removes the
    /// previous run's collections and links.
    pub fn run(&self) -> Result<(PipelineOutput, WriteSummary)> {
        let files = self.scan()?;
        let set = self.extract(files, &|_| {});
        let output = self.process(set);
        if output.is_empty() {
            log::warn!("no usable images found under {}", self.root.display());
            self.writer.clear()?;
            return Ok((output, WriteSummary::default()));
        }
        let summary = self.write(&output)?;
        Ok((output, summary))
    }
}
