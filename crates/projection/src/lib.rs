//! Coordinate reference system transformations.
//!
//! Implements the projections needed to move shapefiles and raster
//! coordinates between UTM, Web Mercator and geographic lon/lat, without
//! external dependencies. Datum shifts are not applied.

pub mod ellipsoid;
pub mod error;
pub mod mercator;
pub mod projection;
pub mod transform;
pub mod transverse_mercator;
pub mod wkt;

pub use ellipsoid::Ellipsoid;
pub use error::{ProjectionError, Result};
pub use mercator::WebMercator;
pub use projection::Projection;
pub use transform::Transformer;
pub use transverse_mercator::TransverseMercator;
