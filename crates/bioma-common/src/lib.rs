//! Common types shared by the bioma crates: extents, CRS codes, geotransforms
//! and the dates embedded in product file names.

pub mod bbox;
pub mod crs;
pub mod error;
pub mod geotransform;
pub mod names;
pub mod time;

pub use bbox::{BoundingBox, SpatialExtent};
pub use crs::{CrsCode, Datum};
pub use error::{BiomaError, BiomaResult};
pub use geotransform::GeoTransform;
pub use names::{date_from_segment, find_iso_date};
pub use time::TemporalExtent;
