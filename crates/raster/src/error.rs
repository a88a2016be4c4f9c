//! Error types for raster operations.

use thiserror::Error;

/// Errors that can occur while building or combining rasters.
#[derive(Error, Debug)]
pub enum RasterError {
    /// Sample buffer does not match the declared dimensions.
    #[error("raster data has {actual} samples, expected {expected} ({width}x{height})")]
    SizeMismatch {
        expected: usize,
        actual: usize,
        width: usize,
        height: usize,
    },

    /// Two rasters that must be aligned have different shapes.
    #[error("raster shapes differ: {left} vs {right}")]
    ShapeMismatch { left: String, right: String },

    /// A band index is out of range (indices are 1-based).
    #[error("band {index} requested but raster has {count} band(s)")]
    BandOutOfRange { index: usize, count: usize },

    /// The raster has no pixels.
    #[error("raster is empty")]
    Empty,

    /// Every pixel is NaN or nodata.
    #[error("raster has no valid pixels")]
    NoValidPixels,

    /// Invalid argument to a raster operation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl RasterError {
    /// Create a ShapeMismatch error from two (width, height) pairs.
    pub fn shape_mismatch(left: (usize, usize), right: (usize, usize)) -> Self {
        Self::ShapeMismatch {
            left: format!("{}x{}", left.0, left.1),
            right: format!("{}x{}", right.0, right.1),
        }
    }
}

/// Result type for raster operations.
pub type Result<T> = std::result::Result<T, RasterError>;
