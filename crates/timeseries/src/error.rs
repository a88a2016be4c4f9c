//! Error types for time-series analysis.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TimeSeriesError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("GeoTIFF error: {0}")]
    GeoTiff(#[from] geotiff::GeoTiffError),

    #[error("raster error: {0}")]
    Raster(#[from] raster::RasterError),

    #[error("render error: {0}")]
    Render(#[from] renderer::RenderError),

    /// No `.tif` file in the input directory.
    #[error("no TIFF files found in {0}")]
    NoTiffs(PathBuf),

    /// TIFFs were found but none gave a dated sample.
    #[error("no valid samples in {0}")]
    NoSamples(PathBuf),

    /// The deviation filter dropped every sample.
    #[error("no samples left after the deviation filter")]
    EmptyAfterFilter,

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

impl TimeSeriesError {
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, TimeSeriesError>;
