//! Error types for rendering.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Raster(#[from] raster::RasterError),

    #[error(transparent)]
    GeoTiff(#[from] geotiff::GeoTiffError),

    /// PNG encoding failed.
    #[error("PNG encoding failed: {0}")]
    Png(String),

    /// The input cannot be rendered (empty, all nodata, wrong band count...).
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl RenderError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, RenderError>;
