//! geostamp - capture-time and location stamps for photos
//!
//! Draws a four-line overlay (time, timezone label, place, coordinates and
//! altitude) over a translucent band at the bottom of a photo, and writes the
//! capture time and GPS position into the file's EXIF.

pub mod codec;
pub mod config;
pub mod error;
pub mod metadata;
pub mod overlay;
pub mod render;
pub mod request;
pub mod stamp;

pub use codec::ImageOutputFormat;
pub use config::StampConfig;
pub use error::{Result, StampError};
pub use metadata::{read_stamp, StampedMetadata};
pub use overlay::OverlayText;
pub use render::{FontChain, FontFile, FontProvider, GlyphRenderer, SystemFont, TextRenderer};
pub use request::{parse_timestamp, StampRequest};
pub use stamp::{stamp, Stamper};
