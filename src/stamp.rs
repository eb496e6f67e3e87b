//! The stamping pipeline
//!
//! decode → compose overlay → draw band and text → load EXIF → set capture
//! time and GPS → encode → embed EXIF → write beside the target → rename.
//!
//! Nothing reaches `output_path` unless every step before the rename succeeded,
//! so a failed call never leaves a truncated or half-stamped file behind.

use chrono::NaiveDateTime;
use image::DynamicImage;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::codec::{self, ImageOutputFormat};
use crate::config::StampConfig;
use crate::error::{Result, StampError};
use crate::metadata;
use crate::overlay::OverlayText;
use crate::render::{self, FontChain, FontProvider, GlyphRenderer, TextRenderer};
use crate::request::StampRequest;

/// Stamps photos with one config and one text renderer.
///
/// The renderer is shared by every call; the default one resolves its font on
/// the first photo that decodes and reuses it afterwards.
pub struct Stamper {
    config: StampConfig,
    renderer: Box<dyn TextRenderer>,
}

impl Stamper {
    /// Stamper drawing with the font chain described by `config`.
    pub fn new(config: StampConfig) -> Result<Self> {
        let chain = FontChain::for_config(&config);
        Self::with_font_provider(config, Box::new(chain))
    }

    /// Stamper drawing glyphs with fonts from `provider`.
    pub fn with_font_provider(config: StampConfig, provider: Box<dyn FontProvider>) -> Result<Self> {
        config.validate()?;
        let renderer = GlyphRenderer::from_provider(provider);
        Ok(Self::with_renderer(config, Box::new(renderer)))
    }

    /// Stamper drawing text through a caller-supplied renderer.
    pub fn with_renderer(config: StampConfig, renderer: Box<dyn TextRenderer>) -> Self {
        Self { config, renderer }
    }

    /// Stamp one photo.
    pub fn stamp(&self, request: &StampRequest) -> Result<()> {
        request.validate()?;
        let format = ImageOutputFormat::from_path(&request.output_path)?;

        let rgb = codec::decode_rgb(&request.input_path)?;
        let (width, height) = rgb.dimensions();
        debug!("Decoded {} ({}x{})", request.input_path.display(), width, height);

        let text = OverlayText::compose(
            &request.timestamp,
            &self.config.timezone_label,
            &request.location_text,
            request.lat,
            request.lng,
            request.altitude,
        );

        let mut canvas = DynamicImage::ImageRgb8(rgb).to_rgba8();
        render::draw_band(&mut canvas, &self.config);
        let origin = (
            self.config.text_x as i32,
            height as i32 - self.config.text_offset_bottom as i32,
        );
        self.renderer.draw_lines(&mut canvas, origin, &text, &self.config)?;
        let stamped = DynamicImage::ImageRgba8(canvas).to_rgb8();

        let fields = metadata::load_fields(&request.input_path).unwrap_or_else(|e| {
            warn!("Ignoring source EXIF of {}: {}", request.input_path.display(), e);
            Vec::new()
        });
        let fields = metadata::apply_stamp(fields, &request.timestamp, request.lat, request.lng);
        let tiff = metadata::serialize(&fields)?;

        let encoded = codec::encode(&stamped, format, self.config.jpeg_quality)?;
        let bytes = metadata::embed(encoded, format, tiff)?;

        write_atomic(&request.output_path, &bytes)?;

        info!(
            "Stamped {} -> {} ({} bytes)",
            request.input_path.display(),
            request.output_path.display(),
            bytes.len()
        );
        Ok(())
    }
}

/// Write `bytes` to a temp file in the target's directory, then rename it
/// over the target. The temp file is removed if anything fails.
///
/// A new target gets the same umask-governed mode as any freshly created
/// file; an existing target keeps its mode.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut builder = tempfile::Builder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        // open(2) applies the umask to this
        builder.permissions(std::fs::Permissions::from_mode(0o666));
    }
    let mut tmp = builder.tempfile_in(dir).map_err(|e| StampError::write(dir, e))?;

    if let Ok(existing) = std::fs::metadata(path) {
        tmp.as_file()
            .set_permissions(existing.permissions())
            .map_err(|e| StampError::write(tmp.path(), e))?;
    }

    tmp.write_all(bytes).map_err(|e| StampError::write(tmp.path(), e))?;
    tmp.as_file().sync_all().map_err(|e| StampError::write(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| StampError::write(path, e.error))?;
    Ok(())
}

/// Stamp one photo with the default layout and system fonts.
///
/// ```rust,no_run
/// use chrono::NaiveDate;
/// use std::path::Path;
///
/// let ts = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap().and_hms_opt(14, 7, 0).unwrap();
/// geostamp::stamp(Path::new("in.jpg"), Path::new("out.jpg"), "Ubud, Bali", -8.5194, 115.2624, 412.0, ts)?;
/// # Ok::<(), geostamp::StampError>(())
/// ```
pub fn stamp(
    input_path: &Path,
    output_path: &Path,
    location_text: &str,
    lat: f64,
    lng: f64,
    altitude: f64,
    timestamp: NaiveDateTime,
) -> Result<()> {
    let request = StampRequest {
        input_path: input_path.to_path_buf(),
        output_path: output_path.to_path_buf(),
        location_text: location_text.to_string(),
        lat,
        lng,
        altitude,
        timestamp,
    };
    Stamper::new(StampConfig::default())?.stamp(&request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_atomic_replaces_target() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("out.jpg");
        std::fs::write(&target, b"old").unwrap();

        write_atomic(&target, b"new contents").unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"new contents");

        // no stray temp files left behind
        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_write_atomic_new_file_mode_matches_plain_create() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let plain = dir.path().join("plain.jpg");
        std::fs::write(&plain, b"x").unwrap();
        let target = dir.path().join("out.jpg");

        write_atomic(&target, b"new contents").unwrap();
        let mode = |p: &Path| std::fs::metadata(p).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode(&target), mode(&plain));
    }

    #[cfg(unix)]
    #[test]
    fn test_write_atomic_keeps_existing_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let target = dir.path().join("out.jpg");
        std::fs::write(&target, b"old").unwrap();
        std::fs::set_permissions(&target, std::fs::Permissions::from_mode(0o640)).unwrap();

        write_atomic(&target, b"new contents").unwrap();
        let mode = std::fs::metadata(&target).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o640);
    }

    struct NoFonts;

    impl FontProvider for NoFonts {
        fn load_font(&self) -> Result<ab_glyph::FontArc> {
            Err(StampError::Render("no fonts".into()))
        }

        fn describe(&self) -> String {
            "none".into()
        }
    }

    fn request_for(dir: &TempDir, input: &Path) -> StampRequest {
        StampRequest {
            input_path: input.to_path_buf(),
            output_path: dir.path().join("out.jpg"),
            location_text: "Ubud, Bali".into(),
            lat: -8.5194,
            lng: 115.2624,
            altitude: 412.0,
            timestamp: chrono::NaiveDate::from_ymd_opt(2024, 3, 15)
                .unwrap()
                .and_hms_opt(14, 7, 0)
                .unwrap(),
        }
    }

    #[test]
    fn test_fontless_stamper_reports_decode_failure_first() {
        let dir = TempDir::new().unwrap();
        let stamper = Stamper::with_font_provider(StampConfig::default(), Box::new(NoFonts)).unwrap();

        let request = request_for(&dir, &dir.path().join("missing.jpg"));
        let err = stamper.stamp(&request).unwrap_err();
        assert!(matches!(err, StampError::Decode { .. }));
    }

    #[test]
    fn test_fontless_stamper_reports_render_failure_for_valid_input() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.png");
        image::RgbImage::from_pixel(320, 240, image::Rgb([40, 90, 140])).save(&input).unwrap();
        let stamper = Stamper::with_font_provider(StampConfig::default(), Box::new(NoFonts)).unwrap();

        let request = request_for(&dir, &input);
        let err = stamper.stamp(&request).unwrap_err();
        assert!(matches!(err, StampError::Render(_)));
        assert!(!request.output_path.exists());
    }

    #[test]
    fn test_write_atomic_missing_directory() {
        let err = write_atomic(Path::new("/nonexistent/dir/out.jpg"), b"x").unwrap_err();
        assert!(matches!(err, StampError::Write { .. }));
    }
}
