//! CSV tables of the series.

use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::error::{Result, TimeSeriesError};
use crate::series::Series;

#[derive(Serialize)]
struct FullRow {
    date: String,
    mean_ndvi: f64,
}

#[derive(Serialize)]
struct FilteredRow {
    date: String,
    mean_ndvi: f64,
    /// Empty where the smoothing window is incomplete.
    smoothed_ndvi: Option<f64>,
}

/// `date,mean_ndvi` for every sample.
pub fn write_full_csv(path: &Path, series: &Series) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for s in series.samples() {
        writer.serialize(FullRow {
            date: s.date.format("%Y-%m-%d").to_string(),
            mean_ndvi: s.value,
        })?;
    }
    writer.flush()?;
    info!(path = %path.display(), rows = series.len(), "Wrote full series");
    Ok(())
}

/// `date,mean_ndvi,smoothed_ndvi` for the filtered samples.
pub fn write_filtered_csv(path: &Path, series: &Series, smoothed: &[Option<f64>]) -> Result<()> {
    if smoothed.len() != series.len() {
        return Err(TimeSeriesError::invalid_parameter(format!(
            "{} smoothed values for {} samples",
            smoothed.len(),
            series.len()
        )));
    }
    let mut writer = csv::Writer::from_path(path)?;
    for (s, smooth) in series.samples().iter().zip(smoothed) {
        writer.serialize(FilteredRow {
            date: s.date.format("%Y-%m-%d").to_string(),
            mean_ndvi: s.value,
            smoothed_ndvi: *smooth,
        })?;
    }
    writer.flush()?;
    info!(path = %path.display(), rows = series.len(), "Wrote filtered series");
    Ok(())
}
