//! Decode and encode of the stamped photo

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbImage};
use std::path::Path;

use crate::error::{Result, StampError};

/// Containers the stamper can write EXIF into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOutputFormat {
    Jpeg,
    Png,
}

impl ImageOutputFormat {
    /// Pick the container from the output extension.
    ///
    /// No extension, or one `image` doesn't recognise, means JPEG. Known image
    /// formats without EXIF support are rejected.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => ext.to_lowercase(),
            None => return Ok(ImageOutputFormat::Jpeg),
        };

        match extension.as_str() {
            "jpg" | "jpeg" => Ok(ImageOutputFormat::Jpeg),
            "png" => Ok(ImageOutputFormat::Png),
            other if image::ImageFormat::from_extension(other).is_some() => Err(StampError::Encode(format!(
                "Format '.{}' cannot carry EXIF here. Use .jpg, .jpeg or .png",
                other
            ))),
            _ => Ok(ImageOutputFormat::Jpeg),
        }
    }

    pub fn extension(&self) -> &str {
        match self {
            ImageOutputFormat::Jpeg => "jpg",
            ImageOutputFormat::Png => "png",
        }
    }
}

/// Load any decodable image as 8-bit RGB.
pub fn decode_rgb(path: &Path) -> Result<RgbImage> {
    let img = image::open(path).map_err(|source| StampError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(img.to_rgb8())
}

/// Encode pixels into an in-memory container, without metadata.
pub fn encode(img: &RgbImage, format: ImageOutputFormat, jpeg_quality: u8) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let (width, height) = img.dimensions();

    let encoded = match format {
        ImageOutputFormat::Jpeg => JpegEncoder::new_with_quality(&mut buf, jpeg_quality)
            .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8),
        ImageOutputFormat::Png => PngEncoder::new(&mut buf)
            .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8),
    };
    encoded.map_err(|e| StampError::Encode(format!("Failed to encode {}: {}", format.extension(), e)))?;

    Ok(buf)
}
