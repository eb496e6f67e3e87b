//! EXIF handling for stamped photos
//!
//! Loads whatever EXIF the source carries, rewrites the capture time and GPS
//! position, serializes the result as TIFF-structured EXIF and splices it into
//! the encoded output container.
//!
//! ## Stamped fields
//!
//! - `DateTime` (primary IFD): `YYYY:MM:DD HH:MM:SS`
//! - `GPSLatitude` / `GPSLongitude`: whole degrees of the magnitude as
//!   `(deg/1, 0/1, 0/1)`. No `GPSLatitudeRef`/`GPSLongitudeRef` is written, so
//!   the hemisphere is not recoverable from the file.
//!
//! Every other GPS field of the source is dropped. Non-GPS primary fields are
//! kept; thumbnail fields and IFD/strip offsets are not, since the writer
//! recomputes layout and the old thumbnail no longer matches.
//!
//! ## Example
//!
//! ```rust,ignore
//! let fields = load_fields(Path::new("photo.jpg")).unwrap_or_default();
//! let fields = apply_stamp(fields, &timestamp, -8.5194, 115.2624);
//! let tiff = serialize(&fields)?;
//! let bytes = embed(encoded, ImageOutputFormat::Jpeg, tiff)?;
//! ```

use chrono::NaiveDateTime;
use exif::{Context, Field, In, Rational, Tag, Value};
use img_parts::jpeg::Jpeg;
use img_parts::png::Png;
use img_parts::{Bytes, ImageEXIF};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::Path;
use tracing::debug;

use crate::codec::ImageOutputFormat;
use crate::error::{Result, StampError};

/// EXIF date-time layout
pub const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Tags describing file layout rather than content. The writer emits its own.
const STRUCTURAL_TAGS: [Tag; 7] = [
    Tag::ExifIFDPointer,
    Tag::GPSInfoIFDPointer,
    Tag::InteropIFDPointer,
    Tag::StripOffsets,
    Tag::StripByteCounts,
    Tag::JPEGInterchangeFormat,
    Tag::JPEGInterchangeFormatLength,
];

// ============================================================================
// Load
// ============================================================================

/// Read the source's EXIF block.
pub fn try_load(path: &Path) -> Result<exif::Exif> {
    read_exif(path).map_err(|e| StampError::MetadataLoad(format!("{}: {}", path.display(), e)))
}

fn read_exif(path: &Path) -> std::result::Result<exif::Exif, exif::Error> {
    let file = File::open(path).map_err(exif::Error::Io)?;
    let mut reader = BufReader::new(file);
    exif::Reader::new().read_from_container(&mut reader)
}

/// Primary-IFD fields of the source.
///
/// A source without EXIF yields an empty list. Unreadable or corrupt EXIF is a
/// `MetadataLoad` error, which callers may recover from by starting empty.
pub fn load_fields(path: &Path) -> Result<Vec<Field>> {
    match read_exif(path) {
        Ok(exif) => {
            let fields: Vec<Field> = exif
                .fields()
                .filter(|f| f.ifd_num == In::PRIMARY)
                .map(|f| Field {
                    tag: f.tag,
                    ifd_num: f.ifd_num,
                    value: f.value.clone(),
                })
                .collect();
            debug!("Loaded {} EXIF fields from {}", fields.len(), path.display());
            Ok(fields)
        }
        Err(exif::Error::NotFound(_)) => {
            debug!("No EXIF in {}, starting empty", path.display());
            Ok(Vec::new())
        }
        Err(e) => Err(StampError::MetadataLoad(format!("{}: {}", path.display(), e))),
    }
}

// ============================================================================
// Mutate
// ============================================================================

/// Replace the capture time and the whole GPS block.
pub fn apply_stamp(fields: Vec<Field>, timestamp: &NaiveDateTime, lat: f64, lng: f64) -> Vec<Field> {
    let mut out: Vec<Field> = fields
        .into_iter()
        .filter(|f| f.ifd_num == In::PRIMARY)
        .filter(|f| f.tag.context() != Context::Gps)
        .filter(|f| f.tag != Tag::DateTime)
        .filter(|f| !STRUCTURAL_TAGS.contains(&f.tag))
        .filter(|f| {
            let writable = !matches!(f.value, Value::Unknown(..));
            if !writable {
                debug!("Dropping EXIF field {} with unknown type", f.tag);
            }
            writable
        })
        .collect();

    out.push(Field {
        tag: Tag::DateTime,
        ifd_num: In::PRIMARY,
        value: Value::Ascii(vec![timestamp.format(EXIF_DATETIME_FORMAT).to_string().into_bytes()]),
    });
    out.push(Field {
        tag: Tag::GPSLatitude,
        ifd_num: In::PRIMARY,
        value: Value::Rational(whole_degrees(lat)),
    });
    out.push(Field {
        tag: Tag::GPSLongitude,
        ifd_num: In::PRIMARY,
        value: Value::Rational(whole_degrees(lng)),
    });
    out
}

/// `(trunc(|deg|)/1, 0/1, 0/1)`; sign and fraction are discarded.
pub fn whole_degrees(deg: f64) -> Vec<Rational> {
    vec![
        Rational { num: deg.abs().trunc() as u32, denom: 1 },
        Rational { num: 0, denom: 1 },
        Rational { num: 0, denom: 1 },
    ]
}

// ============================================================================
// Dump
// ============================================================================

/// Serialize fields as a big-endian TIFF EXIF block.
pub fn serialize(fields: &[Field]) -> Result<Vec<u8>> {
    let mut writer = exif::experimental::Writer::new();
    for field in fields {
        writer.push_field(field);
    }

    let mut buf = Cursor::new(Vec::new());
    writer
        .write(&mut buf, false)
        .map_err(|e| StampError::Encode(format!("Failed to generate EXIF data: {}", e)))?;
    Ok(buf.into_inner())
}

/// Put a TIFF EXIF block into an encoded container, replacing any existing one.
pub fn embed(encoded: Vec<u8>, format: ImageOutputFormat, tiff: Vec<u8>) -> Result<Vec<u8>> {
    let exif_bytes = Bytes::from(tiff);

    let out = match format {
        ImageOutputFormat::Jpeg => {
            let mut jpeg = Jpeg::from_bytes(Bytes::from(encoded))
                .map_err(|e| StampError::Encode(format!("Failed to parse JPEG: {}", e)))?;
            jpeg.set_exif(Some(exif_bytes));
            jpeg.encoder().bytes()
        }
        ImageOutputFormat::Png => {
            let mut png = Png::from_bytes(Bytes::from(encoded))
                .map_err(|e| StampError::Encode(format!("Failed to parse PNG: {}", e)))?;
            png.set_exif(Some(exif_bytes));
            png.encoder().bytes()
        }
    };
    Ok(out.to_vec())
}

// ============================================================================
// Read back
// ============================================================================

/// The stamped fields as found in a file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StampedMetadata {
    /// Raw `DateTime` string
    pub date_time: Option<String>,

    /// `GPSLatitude` as `(num, denom)` triples
    pub gps_latitude: Option<Vec<(u32, u32)>>,

    pub gps_longitude: Option<Vec<(u32, u32)>>,

    /// Names of all GPS tags present
    pub gps_tags: Vec<String>,

    /// Names of all primary-IFD tags present, GPS included
    pub tags: Vec<String>,
}

impl StampedMetadata {
    /// Decimal latitude from the degree/minute/second triple, unsigned.
    pub fn latitude_degrees(&self) -> Option<f64> {
        self.gps_latitude.as_deref().and_then(dms_to_degrees)
    }

    pub fn longitude_degrees(&self) -> Option<f64> {
        self.gps_longitude.as_deref().and_then(dms_to_degrees)
    }
}

/// Read the stamped fields from an image file.
pub fn read_stamp(path: &Path) -> Result<StampedMetadata> {
    let exif_data = try_load(path)?;

    let rationals = |tag: Tag| -> Option<Vec<(u32, u32)>> {
        exif_data.get_field(tag, In::PRIMARY).and_then(|f| match &f.value {
            Value::Rational(v) => Some(v.iter().map(|r| (r.num, r.denom)).collect()),
            _ => None,
        })
    };

    let date_time = exif_data
        .get_field(Tag::DateTime, In::PRIMARY)
        .and_then(|f| match &f.value {
            Value::Ascii(v) => v.first().map(|s| String::from_utf8_lossy(s).to_string()),
            _ => None,
        });

    let primary: Vec<&Field> = exif_data.fields().filter(|f| f.ifd_num == In::PRIMARY).collect();

    Ok(StampedMetadata {
        date_time,
        gps_latitude: rationals(Tag::GPSLatitude),
        gps_longitude: rationals(Tag::GPSLongitude),
        gps_tags: primary
            .iter()
            .filter(|f| f.tag.context() == Context::Gps)
            .map(|f| f.tag.to_string())
            .collect(),
        tags: primary.iter().map(|f| f.tag.to_string()).collect(),
    })
}

fn dms_to_degrees(v: &[(u32, u32)]) -> Option<f64> {
    if v.len() < 3 || v.iter().any(|&(_, d)| d == 0) {
        return None;
    }
    let part = |i: usize| v[i].0 as f64 / v[i].1 as f64;
    Some(part(0) + part(1) / 60.0 + part(2) / 3600.0)
}
