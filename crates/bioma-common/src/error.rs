//! Error types shared by the bioma crates.

use thiserror::Error;

/// Result type alias using BiomaError.
pub type BiomaResult<T> = Result<T, BiomaError>;

/// Errors raised while parsing the common value types.
#[derive(Debug, Error)]
pub enum BiomaError {
    #[error("Invalid bounding box: {0}")]
    InvalidBbox(String),

    #[error("Unsupported CRS: {0}")]
    UnsupportedCrs(String),

    #[error("Invalid date '{value}': {message}")]
    InvalidDate { value: String, message: String },

    #[error("Invalid temporal extent: start {start} is after end {end}")]
    InvertedTemporalExtent { start: String, end: String },

    #[error("Degenerate geotransform: {0}")]
    DegenerateTransform(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BiomaError {
    pub fn invalid_date(value: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidDate {
            value: value.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for BiomaError {
    fn from(err: serde_json::Error) -> Self {
        BiomaError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, err))
    }
}
