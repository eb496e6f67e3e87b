//! Overlay rendering
//!
//! Two pieces draw onto the decoded photo:
//! - the translucent band, pure pixel blending with no external resources
//! - the overlay text, drawn by a [`TextRenderer`] so the glyph backend and
//!   its font lookup can be swapped out
//!
//! Fonts come from a [`FontProvider`]. The default chain tries an explicit font
//! file, then preferred system families, then any installed face.

use ab_glyph::{Font, FontArc, FontVec, PxScale, ScaleFont};
use image::{Pixel, Rgba, RgbaImage};
use imageproc::drawing::draw_text_mut;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::config::StampConfig;
use crate::error::{Result, StampError};
use crate::overlay::OverlayText;

// ============================================================================
// Band
// ============================================================================

/// Blend the dark band behind the overlay text.
///
/// The band spans `band_margin` to `width - band_margin` horizontally and
/// `height - text_offset_bottom` to `height - band_margin` vertically, both
/// ends inclusive. Images too small to hold it are left untouched.
pub fn draw_band(canvas: &mut RgbaImage, config: &StampConfig) {
    let (width, height) = canvas.dimensions();
    if width == 0 || height == 0 {
        return;
    }

    let x0 = config.band_margin;
    let x1 = width.saturating_sub(config.band_margin).min(width - 1);
    let y0 = height.saturating_sub(config.text_offset_bottom);
    let y1 = height.saturating_sub(config.band_margin).min(height - 1);
    if x0 > x1 || y0 > y1 {
        debug!("Image {}x{} too small for overlay band", width, height);
        return;
    }

    let shade = Rgba([0, 0, 0, config.band_alpha]);
    for y in y0..=y1 {
        for x in x0..=x1 {
            canvas.get_pixel_mut(x, y).blend(&shade);
        }
    }
}

// ============================================================================
// Fonts
// ============================================================================

/// Resolves the font used for overlay text.
pub trait FontProvider: Send + Sync {
    fn load_font(&self) -> Result<FontArc>;

    /// Short human-readable name for logs
    fn describe(&self) -> String;
}

/// A TTF/OTF file on disk
pub struct FontFile {
    pub path: PathBuf,
}

impl FontProvider for FontFile {
    fn load_font(&self) -> Result<FontArc> {
        let data = std::fs::read(&self.path)
            .map_err(|e| StampError::Render(format!("Failed to read font {}: {}", self.path.display(), e)))?;
        FontArc::try_from_vec(data)
            .map_err(|e| StampError::Render(format!("Invalid font {}: {}", self.path.display(), e)))
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

/// Installed system fonts, looked up by family name.
///
/// Falls back to the generic sans-serif family and then to whatever face is
/// installed first, so it only fails on a system with no fonts at all.
pub struct SystemFont {
    pub families: Vec<String>,
}

impl FontProvider for SystemFont {
    fn load_font(&self) -> Result<FontArc> {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        debug!("Loaded {} system font faces", db.len());

        let mut families: Vec<fontdb::Family<'_>> =
            self.families.iter().map(|f| fontdb::Family::Name(f.as_str())).collect();
        families.push(fontdb::Family::SansSerif);

        let query = fontdb::Query {
            families: &families,
            ..fontdb::Query::default()
        };

        let id = db
            .query(&query)
            .or_else(|| db.faces().next().map(|face| face.id))
            .ok_or_else(|| StampError::Render("No system fonts installed".to_string()))?;

        let font = db
            .with_face_data(id, |data, index| FontVec::try_from_vec_and_index(data.to_vec(), index))
            .ok_or_else(|| StampError::Render("System font data unavailable".to_string()))?
            .map_err(|e| StampError::Render(format!("Invalid system font: {}", e)))?;

        if let Some(face) = db.face(id) {
            debug!("Using system font {:?}", face.post_script_name);
        }
        Ok(FontArc::new(font))
    }

    fn describe(&self) -> String {
        format!("system {:?}", self.families)
    }
}

/// Tries each provider in order and returns the first font that loads.
pub struct FontChain {
    providers: Vec<Box<dyn FontProvider>>,
}

impl FontChain {
    pub fn new(providers: Vec<Box<dyn FontProvider>>) -> Self {
        Self { providers }
    }

    /// Chain for a config: `font_path` if set, then the configured system families.
    pub fn for_config(config: &StampConfig) -> Self {
        let mut providers: Vec<Box<dyn FontProvider>> = Vec::new();
        if let Some(path) = &config.font_path {
            providers.push(Box::new(FontFile { path: path.clone() }));
        }
        providers.push(Box::new(SystemFont {
            families: config.font_families.clone(),
        }));
        Self::new(providers)
    }
}

impl FontProvider for FontChain {
    fn load_font(&self) -> Result<FontArc> {
        let mut failures = Vec::new();
        for provider in &self.providers {
            match provider.load_font() {
                Ok(font) => return Ok(font),
                Err(e) => {
                    warn!("Font source {} unavailable: {}", provider.describe(), e);
                    failures.push(e.to_string());
                }
            }
        }
        Err(StampError::Render(format!("No usable font ({})", failures.join("; "))))
    }

    fn describe(&self) -> String {
        let names: Vec<String> = self.providers.iter().map(|p| p.describe()).collect();
        format!("chain [{}]", names.join(", "))
    }
}

// ============================================================================
// Text
// ============================================================================

/// Draws the overlay lines onto the canvas, first line's top-left at `origin`.
pub trait TextRenderer: Send + Sync {
    fn draw_lines(
        &self,
        canvas: &mut RgbaImage,
        origin: (i32, i32),
        text: &OverlayText,
        config: &StampConfig,
    ) -> Result<()>;
}

/// Glyph rasterizer backed by `imageproc` with an `ab_glyph` font.
///
/// The font is resolved on the first draw and reused afterwards, so a missing
/// font only surfaces once there is something to draw.
pub struct GlyphRenderer {
    provider: Box<dyn FontProvider>,
    font: OnceLock<FontArc>,
}

impl GlyphRenderer {
    /// Renderer that resolves its font through `provider` on first use.
    pub fn from_provider(provider: Box<dyn FontProvider>) -> Self {
        Self {
            provider,
            font: OnceLock::new(),
        }
    }

    fn font(&self) -> Result<&FontArc> {
        if let Some(font) = self.font.get() {
            return Ok(font);
        }
        debug!("Resolving overlay font from {}", self.provider.describe());
        let font = self.provider.load_font()?;
        Ok(self.font.get_or_init(|| font))
    }
}

impl TextRenderer for GlyphRenderer {
    fn draw_lines(
        &self,
        canvas: &mut RgbaImage,
        origin: (i32, i32),
        text: &OverlayText,
        config: &StampConfig,
    ) -> Result<()> {
        let font = self.font()?;
        let scale = em_scale(font, config.font_size);
        let advance = font.as_scaled(scale).height().ceil() as i32 + config.line_spacing as i32;
        let [r, g, b] = config.text_color;
        let color = Rgba([r, g, b, 255]);

        let (x, mut y) = origin;
        for line in text.iter() {
            draw_text_mut(canvas, color, x, y, scale, font, line);
            y += advance;
        }
        Ok(())
    }
}

/// Pixel scale whose em square is `size` pixels tall.
///
/// `PxScale` measures ascent-to-descent, while font sizes are given per em.
pub fn em_scale(font: &impl Font, size: f32) -> PxScale {
    match font.units_per_em() {
        Some(units) if units > 0.0 => PxScale::from(size * font.height_unscaled() / units),
        _ => PxScale::from(size),
    }
}
