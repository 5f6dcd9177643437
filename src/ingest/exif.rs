//! EXIF-backed metadata extractor.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use exif::{Exif, Field, In, Rational, Reader, Tag, Value};

use super::MetadataExtractor;
use crate::error::{ExtractionFailure, InvalidCoordinate};
use crate::record::{Coord, RawMetadata};
use crate::time::parse_capture_time;

const KNOTS_TO_KPH: f64 = 1.852;
const MPH_TO_KPH: f64 = 1.609_344;

/// Capture time tags in fallback order, each with its sub-second companion.
const CAPTURE_TIME_TAGS: [(Tag, Tag); 3] = [
    (Tag::DateTimeOriginal, Tag::SubSecTimeOriginal),
    (Tag::DateTimeDigitized, Tag::SubSecTimeDigitized),
    (Tag::DateTime, Tag::SubSecTime),
];

/// Reads capture metadata from the EXIF block of JPEG/TIFF/HEIF containers.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExifExtractor;

impl ExifExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl MetadataExtractor for ExifExtractor {
    fn extract(&self, path: &Path) -> Result<RawMetadata, ExtractionFailure> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let exif = Reader::new()
            .read_from_container(&mut reader)
            .map_err(|e| match e {
                exif::Error::Io(io) => ExtractionFailure::Unreadable(io),
                _ => ExtractionFailure::NoExif,
            })?;

        let candidates = CAPTURE_TIME_TAGS
            .iter()
            .map(|&(time, subsec)| (ascii(&exif, time), ascii(&exif, subsec)));
        let (capture_time, subsec) =
            first_usable_time(candidates).ok_or(ExtractionFailure::NoTimestamp)?;

        let coord = match gps_coord(&exif) {
            Ok(coord) => coord,
            Err(e) => {
                log::debug!("{}: ignoring gps position: {}", path.display(), e);
                None
            }
        };

        Ok(RawMetadata {
            capture_time: Some(capture_time),
            subsec,
            coord,
            speed_kph: gps_speed_kph(&exif),
            make: ascii(&exif, Tag::Make),
            model: ascii(&exif, Tag::Model),
            pixel_width: uint(&exif, Tag::PixelXDimension),
            pixel_height: uint(&exif, Tag::PixelYDimension),
        })
    }
}

/// First `(time, subsec)` pair whose time parses. Zeroed or garbled tags fall through.
pub(crate) fn first_usable_time(
    candidates: impl IntoIterator<Item = (Option<String>, Option<String>)>,
) -> Option<(String, Option<String>)> {
    candidates.into_iter().find_map(|(time, subsec)| {
        let time = time?;
        parse_capture_time(&time, subsec.as_deref())?;
        Some((time, subsec))
    })
}

fn field(exif: &Exif, tag: Tag) -> Option<&Field> {
    exif.get_field(tag, In::PRIMARY)
}

fn ascii(exif: &Exif, tag: Tag) -> Option<String> {
    match &field(exif, tag)?.value {
        Value::Ascii(parts) => parts
            .first()
            .map(|raw| String::from_utf8_lossy(raw).trim_end_matches('\0').trim().to_string())
            .filter(|s| !s.is_empty()),
        _ => None,
    }
}

fn uint(exif: &Exif, tag: Tag) -> Option<u32> {
    field(exif, tag)?.value.get_uint(0)
}

fn rationals(exif: &Exif, tag: Tag) -> Option<&[Rational]> {
    match &field(exif, tag)?.value {
        Value::Rational(values) => Some(values.as_slice()),
        _ => None,
    }
}

/// Position from the GPS IFD. `Ok(None)` when the block carries no position.
fn gps_coord(exif: &Exif) -> Result<Option<Coord>, InvalidCoordinate> {
    let (Some(lat), Some(lon)) = (
        rationals(exif, Tag::GPSLatitude),
        rationals(exif, Tag::GPSLongitude),
    ) else {
        return Ok(None);
    };
    let lat_ref = ascii(exif, Tag::GPSLatitudeRef)
        .ok_or(InvalidCoordinate::MissingField("GPSLatitudeRef"))?;
    let lon_ref = ascii(exif, Tag::GPSLongitudeRef)
        .ok_or(InvalidCoordinate::MissingField("GPSLongitudeRef"))?;

    let lat = dms_to_decimal(&to_f64s(lat), &lat_ref, "GPSLatitude")?;
    let lon = dms_to_decimal(&to_f64s(lon), &lon_ref, "GPSLongitude")?;
    let mut coord = Coord::new(lon, lat).checked()?;

    if let Some(alt) = rationals(exif, Tag::GPSAltitude).and_then(|v| v.first()) {
        let below_sea_level = uint(exif, Tag::GPSAltitudeRef) == Some(1);
        let alt = alt.to_f64();
        if alt.is_finite() {
            coord = coord.with_alt(if below_sea_level { -alt } else { alt });
        }
    }
    Ok(Some(coord))
}

fn gps_speed_kph(exif: &Exif) -> Option<f64> {
    let speed = rationals(exif, Tag::GPSSpeed)?.first()?.to_f64();
    let unit = ascii(exif, Tag::GPSSpeedRef);
    speed_to_kph(speed, unit.as_deref())
}

fn to_f64s(values: &[Rational]) -> Vec<f64> {
    values.iter().map(Rational::to_f64).collect()
}

/// Degrees/minutes/seconds plus hemisphere reference to signed degrees.
pub(crate) fn dms_to_decimal(
    dms: &[f64],
    hemisphere: &str,
    name: &'static str,
) -> Result<f64, InvalidCoordinate> {
    let [deg, min, sec] = match dms {
        [d] => [*d, 0.0, 0.0],
        [d, m] => [*d, *m, 0.0],
        [d, m, s, ..] => [*d, *m, *s],
        [] => return Err(InvalidCoordinate::Malformed(name)),
    };
    let value = deg + min / 60.0 + sec / 3600.0;
    if !value.is_finite() {
        return Err(InvalidCoordinate::Malformed(name));
    }
    match hemisphere.trim().to_ascii_uppercase().as_str() {
        "N" | "E" => Ok(value),
        "S" | "W" => Ok(-value),
        _ => Err(InvalidCoordinate::Malformed(name)),
    }
}

/// GPSSpeed in its declared unit to km/h. Missing unit means km/h.
pub(crate) fn speed_to_kph(speed: f64, unit: Option<&str>) -> Option<f64> {
    if !speed.is_finite() || speed < 0.0 {
        return None;
    }
    match unit.map(|u| u.trim().to_ascii_uppercase()).as_deref() {
        None | Some("K") => Some(speed),
        Some("M") => Some(speed * MPH_TO_KPH),
        Some("N") => Some(speed * KNOTS_TO_KPH),
        Some(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dms_conversion_honours_hemisphere() {
        let lat = dms_to_decimal(&[38.0, 53.0, 23.0], "N", "lat").unwrap();
        assert!((lat - 38.889_722).abs() < 1e-6);
        let lon = dms_to_decimal(&[77.0, 2.0, 6.0], "W", "lon").unwrap();
        assert!((lon + 77.035).abs() < 1e-6);
    }

    #[test]
    fn dms_rejects_bad_reference() {
        assert_eq!(
            dms_to_decimal(&[1.0, 2.0, 3.0], "Q", "GPSLatitude"),
            Err(InvalidCoordinate::Malformed("GPSLatitude"))
        );
        assert!(dms_to_decimal(&[], "N", "GPSLatitude").is_err());
        assert!(dms_to_decimal(&[f64::NAN, 0.0, 0.0], "N", "GPSLatitude").is_err());
    }

    #[test]
    fn zeroed_original_time_falls_back_with_its_own_subsec() {
        let picked = first_usable_time([
            (Some("0000:00:00 00:00:00".to_string()), Some("11".to_string())),
            (Some("2017:06:12 14:03:07".to_string()), Some("42".to_string())),
            (Some("2017:06:12 14:03:09".to_string()), None),
        ]);
        assert_eq!(
            picked,
            Some(("2017:06:12 14:03:07".to_string(), Some("42".to_string())))
        );
    }

    #[test]
    fn no_parsable_time_is_none() {
        assert_eq!(
            first_usable_time([(None, Some("5".to_string())), (Some("garbage".into()), None)]),
            None
        );
    }

    #[test]
    fn speed_units() {
        assert_eq!(speed_to_kph(10.0, Some("K")), Some(10.0));
        assert_eq!(speed_to_kph(10.0, None), Some(10.0));
        assert!((speed_to_kph(10.0, Some("N")).unwrap() - 18.52).abs() < 1e-9);
        assert!((speed_to_kph(10.0, Some("m")).unwrap() - 16.093_44).abs() < 1e-9);
        assert_eq!(speed_to_kph(10.0, Some("X")), None);
        assert_eq!(speed_to_kph(-1.0, Some("K")), None);
    }

    #[test]
    fn non_image_file_is_no_exif() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        std::io::Write::write_all(&mut file, b"definitely not a jpeg").expect("write");
        let err = ExifExtractor::new().extract(file.path()).unwrap_err();
        assert!(matches!(err, ExtractionFailure::NoExif));
    }

    #[test]
    fn missing_file_is_unreadable() {
        let err = ExifExtractor::new()
            .extract(Path::new("/nonexistent/streetcar/front/0001.jpg"))
            .unwrap_err();
        assert!(matches!(err, ExtractionFailure::Unreadable(_)));
    }
}
