//! streetcar_init - build per-sequence GeoJSON paths from a capture folder
//!
//! This tool:
//! 1. Finds the camera folders (front, back/rear, left, right) below the root
//! 2. Reads capture time, position and speed from every image's EXIF block
//! 3. Cuts the combined timeline into sequences at time gaps
//! 4. Writes one GeoJSON collection per sequence under the output folder
//! 5. Links each sequence's images into a `sequence<N>/` folder tree

use anyhow::{anyhow, Result};
use clap::{ArgAction, Parser};
use std::io::IsTerminal;
use std::path::PathBuf;

use streetcar::{ConfigOverrides, ExifExtractor, Pipeline, StreetcarConfig};

#[path = "../ui.rs"]
mod ui;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Capture folder containing the camera folders.
    #[arg(long, default_value = ".")]
    root: PathBuf,
    /// TOML config file (defaults to $STREETCAR_CONFIG when set).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Offset of the camera clocks from UTC, e.g. -04:00.
    #[arg(long, value_name = "OFFSET", allow_hyphen_values = true)]
    utc_offset: Option<String>,
    /// Time gap that starts a new sequence, in milliseconds.
    #[arg(long, value_name = "MS")]
    cut_gap_ms: Option<i64>,
    /// Samples slower than this are left out of the paths.
    #[arg(long, value_name = "KPH")]
    min_speed_kph: Option<f64>,
    /// Borrow a sibling camera's position when an image has none.
    #[arg(long)]
    infer_coordinates: bool,
    /// Metadata reader threads.
    #[arg(long)]
    workers: Option<usize>,
    /// Do not create the sequence<N>/ symlink folders.
    #[arg(long)]
    no_links: bool,
    /// Output folder, relative to the root unless absolute.
    #[arg(long, value_name = "PATH")]
    output_dir: Option<PathBuf>,
    /// More log output (-v info, -vv debug, -vvv every metadata record).
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,
    /// Errors only.
    #[arg(short, long)]
    quiet: bool,
    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            utc_offset: self.utc_offset.clone(),
            cut_gap_ms: self.cut_gap_ms,
            min_speed_kph: self.min_speed_kph,
            infer_coordinates: self.infer_coordinates.then_some(true),
            workers: self.workers,
            link_files: self.no_links.then_some(false),
            output_dir: self.output_dir.clone(),
        }
    }

    fn log_filter(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(args.log_filter()))
        .init();

    let mode = if args.quiet {
        ui::UiMode::Quiet
    } else {
        ui::UiMode::parse(&args.ui).ok_or_else(|| anyhow!("unknown ui mode '{}'", args.ui))?
    };
    let ui = ui::Ui::new(mode, std::io::stderr().is_terminal());

    let root = std::fs::canonicalize(&args.root)
        .map_err(|e| anyhow!("cannot open {}: {}", args.root.display(), e))?;
    let config = StreetcarConfig::load(args.config.as_deref(), args.overrides())?;
    log::info!(
        "utc offset {}, cut gap {}ms, min speed {} km/h, {} worker(s)",
        config.utc_offset,
        config.cut_gap_ms(),
        config.min_speed_kph,
        config.workers
    );

    let extractor = ExifExtractor::new();
    let pipeline = Pipeline::new(&root, &config, &extractor)?;

    let files = {
        let _stage = ui.stage("Scan camera folders");
        pipeline.scan()?
    };
    let set = {
        let stage = ui.counted_stage("Read metadata", files.len() as u64);
        pipeline.extract(files, &|_| stage.inc())
    };
    let output = {
        let _stage = ui.stage("Build sequences");
        pipeline.process(set)
    };

    if output.is_empty() {
        pipeline.writer().clear()?;
        if !args.quiet {
            println!("{} file(s), no usable images found", output.files_scanned);
        }
        return Ok(());
    }

    let summary = {
        let _stage = ui.stage("Write sequences");
        pipeline.write(&output)?
    };

    if !args.quiet {
        println!("{} file(s)", output.files_scanned);
        println!(
            "{} sequence(s) written to {}",
            summary.collections.len(),
            pipeline.writer().geojson_dir().display()
        );
    }
    Ok(())
}
