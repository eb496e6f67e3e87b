use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StampError {
    #[error("Failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Render failed: {0}")]
    Render(String),

    /// Returned by `metadata::load_fields`; `stamp` recovers with an empty container.
    #[error("Metadata load failed: {0}")]
    MetadataLoad(String),

    #[error("Encode failed: {0}")]
    Encode(String),

    #[error("Write failed for {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl StampError {
    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StampError::Write { path: path.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, StampError>;
