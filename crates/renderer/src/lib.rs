//! Image products derived from rasters and time series.
//!
//! - NDVI maps with a colorbar and lon/lat ticks
//! - Percentile-stretched true colour images
//! - Side-by-side composites with header and footer text
//! - Animated GIFs with fade transitions
//! - Time-series line charts
//!
//! PNGs are encoded in-house (zlib via flate2). Text needs a TrueType font
//! on disk; when none is found, text is skipped.

pub mod animation;
pub mod chart;
pub mod colormap;
pub mod compose;
pub mod error;
pub mod ndvi_map;
pub mod png;
pub mod rgb;
pub mod text;

pub use colormap::Colormap;
pub use error::{RenderError, Result};
pub use text::load_font;
