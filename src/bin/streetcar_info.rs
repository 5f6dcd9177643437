//! streetcar_info - print statistics for written sequence files

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use streetcar::info::{load_collections, SequenceInfo};
use streetcar::OutputWriter;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Capture folder that streetcar_init ran in.
    #[arg(long, default_value = ".")]
    root: PathBuf,
    /// Output folder, relative to the root unless absolute.
    #[arg(long, value_name = "PATH", default_value = ".streetcar")]
    output_dir: PathBuf,
    /// One tab-separated row per sequence, with a header row.
    #[arg(long)]
    col: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let output_dir = if args.output_dir.is_absolute() {
        args.output_dir.clone()
    } else {
        args.root.join(&args.output_dir)
    };
    let writer = OutputWriter::new(&args.root, output_dir);
    let collections = load_collections(&writer.geojson_dir())?;
    log::debug!("{} collection(s) in {}", collections.len(), writer.geojson_dir().display());

    for (i, (_, fc)) in collections.iter().enumerate() {
        let rows = SequenceInfo::from_collection(fc).rows();
        if args.col {
            if i == 0 {
                let header: Vec<&str> = rows.iter().map(|(k, _)| *k).collect();
                println!("{}", header.join("\t"));
            }
            let values: Vec<&str> = rows.iter().map(|(_, v)| v.as_str()).collect();
            println!("{}", values.join("\t"));
        } else {
            println!();
            for (label, value) in &rows {
                let pad = if label.len() < 8 { "\t" } else { "" };
                println!("\t{}:\t{}{}", label, pad, value);
            }
            println!();
        }
    }
    Ok(())
}
