//! In-memory raster bands and the pixel math applied to them: NDVI,
//! NaN-aware statistics, percentile stretches and resampling.

pub mod band;
pub mod error;
pub mod interpolation;
pub mod ndvi;
pub mod scale;
pub mod stats;

pub use band::{MultiBand, Raster};
pub use error::{RasterError, Result};
pub use interpolation::{resample, InterpolationMethod};
pub use ndvi::{ndvi, ndvi_from_multiband};
pub use scale::{linear_scale_range, normalize_reflectance, stretch_to_u8};
pub use stats::{percentile, stats, valid_mean, BandStats};
