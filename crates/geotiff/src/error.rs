//! Error types for GeoTIFF I/O.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or writing GeoTIFFs.
#[derive(Error, Debug)]
pub enum GeoTiffError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error(transparent)]
    Raster(#[from] raster::RasterError),

    /// The image has no pixels.
    #[error("{0} contains an empty image")]
    Empty(PathBuf),

    /// Sample buffer does not split evenly into bands.
    #[error("unexpected sample layout: {0}")]
    Layout(String),

    /// A GeoTIFF tag holds an unexpected value.
    #[error("invalid {tag} tag: {message}")]
    InvalidTag { tag: &'static str, message: String },
}

impl GeoTiffError {
    pub fn invalid_tag(tag: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidTag {
            tag,
            message: message.into(),
        }
    }
}

/// Result type for GeoTIFF operations.
pub type Result<T> = std::result::Result<T, GeoTiffError>;
