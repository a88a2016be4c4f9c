//! GeoTIFF reading and writing.
//!
//! Decoding and encoding of the TIFF container is delegated to the `tiff`
//! crate. This crate maps the GeoTIFF tags onto [`raster`] types:
//!
//! - ModelPixelScale (33550) + ModelTiepoint (33922), or
//!   ModelTransformation (34264), become a `GeoTransform`
//! - GeoKeyDirectory (34735) gives the EPSG code
//! - GDAL_NODATA (42113) gives the nodata value
//! - DateTime (306) gives the acquisition timestamp

pub mod error;
pub mod geokeys;
pub mod reader;
pub mod writer;

pub use error::{GeoTiffError, Result};
pub use reader::{read, read_band, read_datetime};
pub use writer::{write_f32, write_rgb_f32};

/// TIFF tag numbers used by GeoTIFF and GDAL.
pub mod tags {
    pub const DATE_TIME: u16 = 306;
    pub const MODEL_PIXEL_SCALE: u16 = 33550;
    pub const MODEL_TIEPOINT: u16 = 33922;
    pub const MODEL_TRANSFORMATION: u16 = 34264;
    pub const GEO_KEY_DIRECTORY: u16 = 34735;
    pub const GDAL_NODATA: u16 = 42113;
}

/// True for `.tif` / `.tiff` paths, case-insensitive.
pub fn is_tiff_path(path: &std::path::Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("tif") || e.eq_ignore_ascii_case("tiff"))
        .unwrap_or(false)
}
