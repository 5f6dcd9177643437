//! Capture time normalization.
//!
//! EXIF capture times are wall-clock readings with no zone attached. Every
//! camera on the rig shares one fixed offset from UTC, supplied by
//! configuration; nothing is auto-detected per image.

use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::StreetcarError;

const CAPTURE_TIME_FORMATS: &[&str] = &[
    "%Y:%m:%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// Capture time after timezone correction, in epoch milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedTime(pub i64);

impl NormalizedTime {
    pub fn millis(self) -> i64 {
        self.0
    }

    pub fn offset_by(self, delta_ms: i64) -> Self {
        NormalizedTime(self.0 + delta_ms)
    }
}

impl fmt::Display for NormalizedTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fixed offset of the cameras' clocks from UTC.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct UtcOffset {
    minutes: i32,
}

impl UtcOffset {
    pub const UTC: UtcOffset = UtcOffset { minutes: 0 };

    pub fn from_minutes(minutes: i32) -> Result<Self, StreetcarError> {
        if minutes.abs() >= 24 * 60 {
            return Err(StreetcarError::config(format!(
                "utc offset out of range: {} minutes",
                minutes
            )));
        }
        Ok(Self { minutes })
    }

    pub fn minutes(self) -> i32 {
        self.minutes
    }
}

impl FromStr for UtcOffset {
    type Err = StreetcarError;

    /// Accepts `Z`, `UTC`, `+HH:MM`, `-HH:MM`, `+HHMM` and `+HH`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("z") || s.eq_ignore_ascii_case("utc") {
            return Ok(Self::UTC);
        }
        let invalid = || StreetcarError::config(format!("invalid utc offset '{}'", s));

        let (sign, rest) = match s.as_bytes().first() {
            Some(b'+') => (1, &s[1..]),
            Some(b'-') => (-1, &s[1..]),
            _ => return Err(invalid()),
        };
        let digits: String = rest.chars().filter(|c| *c != ':').collect();
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let (hours, minutes) = match digits.len() {
            2 => (&digits[..2], "0"),
            4 => (&digits[..2], &digits[2..]),
            _ => return Err(invalid()),
        };
        let hours: i32 = hours.parse().map_err(|_| invalid())?;
        let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
        if minutes >= 60 {
            return Err(invalid());
        }
        Self::from_minutes(sign * (hours * 60 + minutes))
    }
}

impl fmt::Display for UtcOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.minutes < 0 { '-' } else { '+' };
        let abs = self.minutes.abs();
        write!(f, "{}{:02}:{:02}", sign, abs / 60, abs % 60)
    }
}

/// Parses an EXIF capture time, optionally refined by the sub-second tag.
///
/// Returns `None` for absent, zeroed or otherwise unparsable values.
pub fn parse_capture_time(raw: &str, subsec: Option<&str>) -> Option<NaiveDateTime> {
    let raw = raw.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    let base = CAPTURE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())?;
    match subsec.and_then(subsec_millis) {
        Some(ms) => base.checked_add_signed(TimeDelta::milliseconds(ms)),
        None => Some(base),
    }
}

fn subsec_millis(raw: &str) -> Option<i64> {
    let digits: String = raw
        .trim_matches(|c: char| c == '\0' || c.is_whitespace())
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .take(3)
        .collect();
    if digits.is_empty() {
        return None;
    }
    let padded = format!("{:0<3}", digits);
    padded.parse().ok()
}

/// Shifts a camera wall-clock time to UTC epoch milliseconds.
pub fn normalize(raw: NaiveDateTime, offset: UtcOffset) -> NormalizedTime {
    let local_ms = raw.and_utc().timestamp_millis();
    NormalizedTime(local_ms - i64::from(offset.minutes()) * 60_000)
}
