//! Error types for vector data.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VectorError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("shapefile error: {0}")]
    Shapefile(#[from] shapefile::Error),

    #[error(transparent)]
    Projection(#[from] projection::ProjectionError),

    /// No `.shp` file in the directory.
    #[error("no shapefile found in {0}")]
    NoShapefile(PathBuf),

    /// The layer has no vertices to take bounds from.
    #[error("{0} has no geometries")]
    Empty(PathBuf),

    /// Multipatch, or a mix of geometry kinds in one layer.
    #[error("unsupported geometry: {0}")]
    UnsupportedGeometry(String),
}

pub type Result<T> = std::result::Result<T, VectorError>;
