use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StreetcarError>;

/// Run-level failures. Anything here stops the run.
#[derive(Debug, Error)]
pub enum StreetcarError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode sequence {sequence}: {source}")]
    Encode {
        sequence: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StreetcarError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub(crate) fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }
}

/// Per-file failures. The file is skipped; the run continues.
#[derive(Debug, Error)]
pub enum ExtractionFailure {
    #[error("unreadable: {0}")]
    Unreadable(#[from] std::io::Error),

    #[error("no exif block")]
    NoExif,

    #[error("no usable capture time")]
    NoTimestamp,
}

/// Malformed GPS fields. Treated as an absent coordinate.
#[derive(Debug, Error, PartialEq)]
pub enum InvalidCoordinate {
    #[error("missing {0}")]
    MissingField(&'static str),

    #[error("malformed {0}")]
    Malformed(&'static str),

    #[error("out of range: lon={lon}, lat={lat}")]
    OutOfRange { lon: f64, lat: f64 },
}
