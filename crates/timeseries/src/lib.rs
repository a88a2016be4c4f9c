//! NDVI time series of a field.
//!
//! One mean NDVI value per GeoTIFF, sorted by the date in the file name.
//! Outliers are dropped with a percent-change filter, the rest is smoothed
//! with a centred moving average, and peaks and valleys of the smoothed
//! curve become an alternating peak / growth-or-cut event sequence.

pub mod analysis;
pub mod error;
pub mod events;
pub mod output;
pub mod peaks;
pub mod series;
pub mod smoothing;

pub use analysis::{analyze, detect, AnalysisParams, AnalysisReport, Detection};
pub use error::{Result, TimeSeriesError};
pub use events::{classify_events, Event};
pub use output::{write_filtered_csv, write_full_csv};
pub use peaks::{find_peaks, find_valleys, Peak};
pub use series::{collect_samples, Sample, Series};
pub use smoothing::{deviation_filter, rolling_mean_centered};
