//! Annotation requests and input validation

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Result, StampError};

/// Everything needed to stamp one photo.
///
/// The timestamp is the local wall-clock time of capture; it carries no
/// offset of its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StampRequest {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub location_text: String,
    pub lat: f64,
    pub lng: f64,
    /// Meters above sea level
    pub altitude: f64,
    #[serde(with = "lenient_timestamp")]
    pub timestamp: NaiveDateTime,
}

impl StampRequest {
    /// Reject coordinates that cannot describe a point on Earth.
    pub fn validate(&self) -> Result<()> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(StampError::InvalidRequest(format!(
                "Latitude out of range: {} (must be -90 to 90)",
                self.lat
            )));
        }
        if !self.lng.is_finite() || !(-180.0..=180.0).contains(&self.lng) {
            return Err(StampError::InvalidRequest(format!(
                "Longitude out of range: {} (must be -180 to 180)",
                self.lng
            )));
        }
        if !self.altitude.is_finite() {
            return Err(StampError::InvalidRequest(format!(
                "Altitude must be finite, got {}",
                self.altitude
            )));
        }
        Ok(())
    }
}

/// Parse an ISO-like date-time string.
///
/// Every run of digits is one component in `Y M D h m s` order, so
/// `2024-03-15T14:07:00`, `2024:03:15 14:07:00` and `2024-03-15` all parse.
/// Missing trailing components default to `2000-01-01 00:00:00` piecewise,
/// and anything after the seconds (fractions, offsets) is ignored.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
    let parts: Vec<&str> = raw
        .split(|c: char| !c.is_ascii_digit())
        .filter(|p| !p.is_empty())
        .collect();
    if parts.is_empty() {
        return Err(StampError::InvalidRequest(format!("No date in timestamp: {:?}", raw)));
    }

    const DEFAULTS: [u32; 6] = [2000, 1, 1, 0, 0, 0];
    let mut fields = DEFAULTS;
    for (slot, part) in fields.iter_mut().zip(parts.iter()) {
        *slot = part
            .parse()
            .map_err(|_| StampError::InvalidRequest(format!("Bad timestamp component {:?} in {:?}", part, raw)))?;
    }
    let [year, month, day, hour, minute, second] = fields;

    NaiveDate::from_ymd_opt(year as i32, month, day)
        .and_then(|d| d.and_hms_opt(hour, minute, second))
        .ok_or_else(|| StampError::InvalidRequest(format!("Timestamp out of range: {:?}", raw)))
}

mod lenient_timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&ts.format("%Y-%m-%dT%H:%M:%S").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ts(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d).unwrap().and_hms_opt(h, mi, s).unwrap()
    }

    fn request(lat: f64, lng: f64) -> StampRequest {
        StampRequest {
            input_path: PathBuf::from("in.jpg"),
            output_path: PathBuf::from("out.jpg"),
            location_text: "Ubud, Bali".to_string(),
            lat,
            lng,
            altitude: 412.0,
            timestamp: ts(2024, 3, 15, 14, 7, 0),
        }
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert_eq!(parse_timestamp("2024-03-15T14:07:00").unwrap(), ts(2024, 3, 15, 14, 7, 0));
        assert_eq!(parse_timestamp("2024:03:15 14:07:09").unwrap(), ts(2024, 3, 15, 14, 7, 9));
        assert_eq!(parse_timestamp("2024-03-15").unwrap(), ts(2024, 3, 15, 0, 0, 0));
        assert_eq!(parse_timestamp("2024-03-15T14:07:00.250+07:00").unwrap(), ts(2024, 3, 15, 14, 7, 0));
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(matches!(parse_timestamp(""), Err(StampError::InvalidRequest(_))));
        assert!(matches!(parse_timestamp("yesterday"), Err(StampError::InvalidRequest(_))));
        assert!(matches!(parse_timestamp("2024-13-01"), Err(StampError::InvalidRequest(_))));
        assert!(matches!(parse_timestamp("2024-02-30T10:00"), Err(StampError::InvalidRequest(_))));
    }

    #[test]
    fn test_validate_ranges() {
        assert!(request(-8.5194, 115.2624).validate().is_ok());
        assert!(request(90.0, -180.0).validate().is_ok());
        assert!(request(90.5, 0.0).validate().is_err());
        assert!(request(0.0, 181.0).validate().is_err());
        assert!(request(f64::NAN, 0.0).validate().is_err());

        let mut r = request(0.0, 0.0);
        r.altitude = f64::INFINITY;
        assert!(r.validate().is_err());
    }

    #[test]
    fn test_request_from_json() {
        let value = json!({
            "input_path": "/photos/a.jpg",
            "output_path": "/photos/a_stamped.jpg",
            "location_text": "Ubud, Bali",
            "lat": -8.5194,
            "lng": 115.2624,
            "altitude": 412,
            "timestamp": "2024-03-15T14:07:00"
        });
        let r: StampRequest = serde_json::from_value(value).unwrap();
        assert_eq!(r.timestamp, ts(2024, 3, 15, 14, 7, 0));
        assert_eq!(r.altitude, 412.0);

        let back = serde_json::to_value(&r).unwrap();
        assert_eq!(back["timestamp"], "2024-03-15T14:07:00");
    }

    #[test]
    fn test_request_from_json_bad_timestamp() {
        let value = json!({
            "input_path": "a.jpg",
            "output_path": "b.jpg",
            "location_text": "",
            "lat": 0.0,
            "lng": 0.0,
            "altitude": 0,
            "timestamp": "not a date"
        });
        assert!(serde_json::from_value::<StampRequest>(value).is_err());
    }
}
