//! Shapefile layers: discovery, reading, reprojection and rewriting.
//!
//! Geometries are kept as 2D coordinates. M and Z values are dropped when
//! reading.

pub mod discover;
pub mod error;
pub mod geometry;
pub mod layer;

pub use discover::{area_of_interest, find_shapefile, resolve_shapefile};
pub use error::{Result, VectorError};
pub use geometry::{Coord, Geometry, Ring};
pub use layer::{Feature, Layer};
