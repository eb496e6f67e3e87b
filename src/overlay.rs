//! Overlay text composition

use chrono::NaiveDateTime;

/// The four lines drawn over the photo, top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayText {
    pub lines: [String; 4],
}

impl OverlayText {
    /// Compose the overlay for one capture.
    ///
    /// The hemisphere letters are always `S` and `E`. The coordinates are
    /// printed as magnitudes, not as signed `{:.6}` floats, so `lat = -8.5194`
    /// renders `8.519400 S` rather than `-8.519400 S`. The sign of the input is
    /// therefore lost on the overlay, just as it is in the EXIF GPS fields.
    /// `timezone_label` is printed as given.
    pub fn compose(
        timestamp: &NaiveDateTime,
        timezone_label: &str,
        location_text: &str,
        lat: f64,
        lng: f64,
        altitude: f64,
    ) -> Self {
        Self {
            lines: [
                timestamp.format("%H:%M | %b %d, %Y").to_string(),
                timezone_label.to_string(),
                location_text.to_string(),
                format!("{:.6} S, {:.6} E  \u{25B2}{}m", lat.abs(), lng.abs(), altitude),
            ],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }
}

impl std::fmt::Display for OverlayText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d).unwrap().and_hms_opt(h, mi, 0).unwrap()
    }

    #[test]
    fn test_compose_ubud() {
        let text = OverlayText::compose(&ts(2024, 3, 15, 14, 7), "GMT+7", "Ubud, Bali", -8.519400, 115.262400, 412.0);
        assert_eq!(text.lines[0], "14:07 | Mar 15, 2024");
        assert_eq!(text.lines[1], "GMT+7");
        assert_eq!(text.lines[2], "Ubud, Bali");
        assert_eq!(text.lines[3], "8.519400 S, 115.262400 E  ▲412m");
    }

    #[test]
    fn test_hemisphere_letters_are_fixed() {
        let text = OverlayText::compose(&ts(2023, 11, 5, 9, 3), "GMT+7", "Oslo", 59.9139, -10.7522, 23.0);
        assert_eq!(text.lines[3], "59.913900 S, 10.752200 E  ▲23m");
        assert!(!text.lines[3].contains('-'));
    }

    #[test]
    fn test_time_is_24_hour_and_day_zero_padded() {
        let text = OverlayText::compose(&ts(2025, 1, 2, 23, 59), "GMT+7", "", 0.0, 0.0, 0.0);
        assert_eq!(text.lines[0], "23:59 | Jan 02, 2025");
        assert_eq!(text.lines[2], "");
        assert_eq!(text.lines[3], "0.000000 S, 0.000000 E  ▲0m");
    }

    #[test]
    fn test_fractional_altitude_and_multiline_display() {
        let text = OverlayText::compose(&ts(2024, 3, 15, 14, 7), "GMT+7", "Monas, Jakarta", -6.175256, 106.821367, 12.5);
        assert_eq!(text.lines[3], "6.175256 S, 106.821367 E  ▲12.5m");
        assert_eq!(
            text.to_string(),
            "14:07 | Mar 15, 2024\nGMT+7\nMonas, Jakarta\n6.175256 S, 106.821367 E  ▲12.5m"
        );
        assert_eq!(text.iter().count(), 4);
    }
}
