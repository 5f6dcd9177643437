use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::builder::{BuildOptions, DEFAULT_MIN_SPEED_KPH};
use crate::error::{Result, StreetcarError};
use crate::segment::DEFAULT_CUT_GAP_MS;
use crate::time::UtcOffset;

const DEFAULT_OUTPUT_DIR: &str = ".streetcar";
const DEFAULT_WORKERS: usize = 4;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct StreetcarConfigFile {
    utc_offset: Option<String>,
    output_dir: Option<PathBuf>,
    sequence: Option<SequenceConfigFile>,
    extract: Option<ExtractConfigFile>,
    output: Option<OutputConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct SequenceConfigFile {
    cut_gap_ms: Option<i64>,
    min_speed_kph: Option<f64>,
    infer_coordinates: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ExtractConfigFile {
    workers: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct OutputConfigFile {
    link_files: Option<bool>,
}

/// One configuration layer. Later layers win field by field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub utc_offset: Option<String>,
    pub cut_gap_ms: Option<i64>,
    pub min_speed_kph: Option<f64>,
    pub infer_coordinates: Option<bool>,
    pub workers: Option<usize>,
    pub link_files: Option<bool>,
    pub output_dir: Option<PathBuf>,
}

impl ConfigOverrides {
    fn merge(&mut self, other: ConfigOverrides) {
        if other.utc_offset.is_some() {
            self.utc_offset = other.utc_offset;
        }
        if other.cut_gap_ms.is_some() {
            self.cut_gap_ms = other.cut_gap_ms;
        }
        if other.min_speed_kph.is_some() {
            self.min_speed_kph = other.min_speed_kph;
        }
        if other.infer_coordinates.is_some() {
            self.infer_coordinates = other.infer_coordinates;
        }
        if other.workers.is_some() {
            self.workers = other.workers;
        }
        if other.link_files.is_some() {
            self.link_files = other.link_files;
        }
        if other.output_dir.is_some() {
            self.output_dir = other.output_dir;
        }
    }
}

impl From<StreetcarConfigFile> for ConfigOverrides {
    fn from(file: StreetcarConfigFile) -> Self {
        let sequence = file.sequence.unwrap_or_default();
        Self {
            utc_offset: file.utc_offset,
            cut_gap_ms: sequence.cut_gap_ms,
            min_speed_kph: sequence.min_speed_kph,
            infer_coordinates: sequence.infer_coordinates,
            workers: file.extract.and_then(|e| e.workers),
            link_files: file.output.and_then(|o| o.link_files),
            output_dir: file.output_dir,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreetcarConfig {
    /// Offset of the cameras' clocks from UTC. Required; never guessed.
    pub utc_offset: UtcOffset,
    pub cut_gap: Duration,
    pub min_speed_kph: f64,
    pub infer_coordinates: bool,
    pub workers: usize,
    pub link_files: bool,
    pub output_dir: PathBuf,
}

impl StreetcarConfig {
    /// Defaults, then the config file, then `STREETCAR_*` variables, then `cli`.
    ///
    /// The file comes from `config_path`, or `STREETCAR_CONFIG` when that is unset.
    pub fn load(config_path: Option<&Path>, cli: ConfigOverrides) -> Result<Self> {
        let env_path = std::env::var("STREETCAR_CONFIG")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);
        let mut layers = match config_path.map(Path::to_path_buf).or(env_path) {
            Some(path) => ConfigOverrides::from(read_config_file(&path)?),
            None => ConfigOverrides::default(),
        };
        layers.merge(env_overrides()?);
        layers.merge(cli);
        Self::resolve(layers)
    }

    pub fn resolve(layers: ConfigOverrides) -> Result<Self> {
        let utc_offset = layers
            .utc_offset
            .as_deref()
            .ok_or_else(|| {
                StreetcarError::config(
                    "utc offset must be set (--utc-offset, STREETCAR_UTC_OFFSET or utc_offset in the config file)",
                )
            })?
            .parse()?;
        let cfg = Self {
            utc_offset,
            cut_gap: Duration::from_millis(
                u64::try_from(layers.cut_gap_ms.unwrap_or(DEFAULT_CUT_GAP_MS))
                    .map_err(|_| StreetcarError::config("cut gap must not be negative"))?,
            ),
            min_speed_kph: layers.min_speed_kph.unwrap_or(DEFAULT_MIN_SPEED_KPH),
            infer_coordinates: layers.infer_coordinates.unwrap_or(false),
            workers: layers.workers.unwrap_or_else(default_workers),
            link_files: layers.link_files.unwrap_or(true),
            output_dir: layers
                .output_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.cut_gap.is_zero() {
            return Err(StreetcarError::config("cut gap must be greater than zero"));
        }
        if !self.min_speed_kph.is_finite() || self.min_speed_kph < 0.0 {
            return Err(StreetcarError::config(
                "minimum speed must be a non-negative number of km/h",
            ));
        }
        if self.workers == 0 {
            return Err(StreetcarError::config("workers must be greater than zero"));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(StreetcarError::config("output dir must not be empty"));
        }
        Ok(())
    }

    pub fn cut_gap_ms(&self) -> i64 {
        i64::try_from(self.cut_gap.as_millis()).unwrap_or(i64::MAX)
    }

    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            min_speed_kph: self.min_speed_kph,
            infer_coordinates: self.infer_coordinates,
        }
    }

    /// Output folder, resolved against the capture root when relative.
    pub fn output_dir_in(&self, root: &Path) -> PathBuf {
        if self.output_dir.is_absolute() {
            self.output_dir.clone()
        } else {
            root.join(&self.output_dir)
        }
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(DEFAULT_WORKERS)
}

fn env_overrides() -> Result<ConfigOverrides> {
    Ok(ConfigOverrides {
        utc_offset: env_value("STREETCAR_UTC_OFFSET"),
        cut_gap_ms: env_parse("STREETCAR_CUT_GAP_MS", "an integer number of milliseconds")?,
        min_speed_kph: env_parse("STREETCAR_MIN_SPEED_KPH", "a number of km/h")?,
        infer_coordinates: env_parse("STREETCAR_INFER_COORDINATES", "true or false")?,
        workers: env_parse("STREETCAR_WORKERS", "a positive integer")?,
        link_files: env_parse("STREETCAR_LINK_FILES", "true or false")?,
        output_dir: env_value("STREETCAR_OUTPUT_DIR").map(PathBuf::from),
    })
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str, expected: &str) -> Result<Option<T>> {
    match env_value(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| StreetcarError::config(format!("{} must be {}", key, expected))),
        None => Ok(None),
    }
}

fn read_config_file(path: &Path) -> Result<StreetcarConfigFile> {
    let raw = std::fs::read_to_string(path).map_err(|e| StreetcarError::fs(path, e))?;
    toml::from_str(&raw).map_err(|e| {
        StreetcarError::config(format!("invalid config file {}: {}", path.display(), e))
    })
}
