//! Stamp layout and output settings

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, StampError};

/// Layout, typography and encoding settings for a stamp.
///
/// Defaults reproduce the fixed layout: 28px white text at `(20, height - 220)`
/// over a black band at 150/255 opacity inset 10px from the sides and bottom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StampConfig {
    /// Em size of the overlay font, in pixels
    pub font_size: f32,
    /// Extra pixels between overlay lines
    pub line_spacing: u32,
    pub text_x: u32,
    /// Text origin sits this many pixels above the bottom edge
    pub text_offset_bottom: u32,
    pub band_margin: u32,
    pub band_alpha: u8,
    pub text_color: [u8; 3],
    /// Second overlay line, printed verbatim
    pub timezone_label: String,
    pub jpeg_quality: u8, // 1-100
    /// System font families, tried in order
    pub font_families: Vec<String>,
    /// Font file tried before any system family
    pub font_path: Option<PathBuf>,
}

impl Default for StampConfig {
    fn default() -> Self {
        Self {
            font_size: 28.0,
            line_spacing: 6,
            text_x: 20,
            text_offset_bottom: 220,
            band_margin: 10,
            band_alpha: 150,
            text_color: [255, 255, 255],
            timezone_label: "GMT+7".to_string(),
            jpeg_quality: 95,
            font_families: vec![
                "Arial".to_string(),
                "DejaVu Sans".to_string(),
                "Liberation Sans".to_string(),
            ],
            font_path: None,
        }
    }
}

impl StampConfig {
    /// Load a config from a JSON file. Missing keys keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| StampError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: StampConfig = serde_json::from_str(raw)
            .map_err(|e| StampError::Config(format!("JSON parse error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.font_size.is_finite() || self.font_size <= 0.0 {
            return Err(StampError::Config(format!(
                "font_size must be positive, got {}",
                self.font_size
            )));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(StampError::Config(format!(
                "jpeg_quality must be within 1-100, got {}",
                self.jpeg_quality
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_fixed_layout() {
        let config = StampConfig::default();
        assert_eq!(config.font_size, 28.0);
        assert_eq!(config.line_spacing, 6);
        assert_eq!(config.text_x, 20);
        assert_eq!(config.text_offset_bottom, 220);
        assert_eq!(config.band_margin, 10);
        assert_eq!(config.timezone_label, "GMT+7");
        assert_eq!(config.jpeg_quality, 95);
        assert!(config.font_path.is_none());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = StampConfig::from_json_str(r#"{ "jpeg_quality": 80, "font_path": "/fonts/x.ttf" }"#).unwrap();
        assert_eq!(config.jpeg_quality, 80);
        assert_eq!(config.font_path, Some(PathBuf::from("/fonts/x.ttf")));
        assert_eq!(config.font_size, 28.0);
        assert_eq!(config.timezone_label, "GMT+7");
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            StampConfig::from_json_str(r#"{ "jpeg_quality": 0 }"#),
            Err(StampError::Config(_))
        ));
        assert!(matches!(
            StampConfig::from_json_str(r#"{ "font_size": -3.0 }"#),
            Err(StampError::Config(_))
        ));
        assert!(matches!(
            StampConfig::from_json_str("not json"),
            Err(StampError::Config(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = StampConfig::from_json_file("/nonexistent/geostamp.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/geostamp.json"));
    }
}
