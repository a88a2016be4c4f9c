//! Error types for coordinate transformations.

use thiserror::Error;

/// Errors that can occur while building or applying a projection.
#[derive(Error, Debug)]
pub enum ProjectionError {
    /// The WKT text could not be parsed.
    #[error("invalid WKT: {0}")]
    InvalidWkt(String),

    /// The projection method is not implemented.
    #[error("unsupported projection: {0}")]
    UnsupportedProjection(String),

    /// A required projection parameter is missing.
    #[error("missing projection parameter: {0}")]
    MissingParameter(String),

    /// The CRS code is not known.
    #[error("unsupported CRS: {0}")]
    UnsupportedCrs(String),

    /// The coordinate cannot be represented in the target projection.
    #[error("coordinate ({x}, {y}) is outside the projection domain")]
    OutOfDomain { x: f64, y: f64 },
}

impl ProjectionError {
    /// Create an InvalidWkt error.
    pub fn invalid_wkt(msg: impl Into<String>) -> Self {
        Self::InvalidWkt(msg.into())
    }
}

impl From<bioma_common::BiomaError> for ProjectionError {
    fn from(err: bioma_common::BiomaError) -> Self {
        Self::UnsupportedCrs(err.to_string())
    }
}

/// Result type for projection operations.
pub type Result<T> = std::result::Result<T, ProjectionError>;
