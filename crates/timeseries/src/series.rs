//! Dated NDVI samples read from a directory of GeoTIFFs.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, TimeSeriesError};

/// Mean NDVI of one acquisition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub date: NaiveDate,
    pub value: f64,
}

/// Samples ordered by date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    samples: Vec<Sample>,
}

impl Series {
    /// Sort `samples` by date. Equal dates keep their input order.
    pub fn sorted(mut samples: Vec<Sample>) -> Self {
        samples.sort_by_key(|s| s.date);
        Self { samples }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.samples.iter().map(|s| s.date).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.value).collect()
    }
}

/// Acquisition date of a result file: the second `_` segment with `Z.tif`
/// removed, as `%Y-%m-%d`.
///
/// `openEO_2023-05-01Z.tif` gives 2023-05-01; `openEO_2023-05-01.tif` and
/// `ndvi.tif` give `None`.
pub fn sample_date(file_name: &str) -> Option<NaiveDate> {
    let segment = file_name.split('_').nth(1)?;
    NaiveDate::parse_from_str(&segment.replace("Z.tif", ""), "%Y-%m-%d").ok()
}

/// Mean of band 1 over its valid pixels, after reflectance scaling.
pub fn sample_value(path: &Path) -> Result<f64> {
    let band = geotiff::read_band(path, 1)?;
    let band = raster::normalize_reflectance(&band)?;
    Ok(raster::valid_mean(&band)?)
}

fn list_tiffs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_tif = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(".tif"));
        if path.is_file() && is_tif {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Read one sample per `*.tif` in `dir`.
///
/// Files with an undated name or unreadable contents are logged and skipped.
#[instrument(skip_all, fields(dir = %dir.display()))]
pub fn collect_samples(dir: &Path) -> Result<Series> {
    let files = list_tiffs(dir)?;
    if files.is_empty() {
        return Err(TimeSeriesError::NoTiffs(dir.to_path_buf()));
    }

    let mut samples = Vec::with_capacity(files.len());
    for path in &files {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        let Some(date) = sample_date(name) else {
            warn!(path = %path.display(), "Invalid file name or date format, skipping");
            continue;
        };
        match sample_value(path) {
            Ok(value) => {
                debug!(path = %path.display(), %date, value, "Sampled");
                samples.push(Sample { date, value });
            }
            Err(e) => warn!(path = %path.display(), error = %e, "Could not sample file, skipping"),
        }
    }

    if samples.is_empty() {
        return Err(TimeSeriesError::NoSamples(dir.to_path_buf()));
    }
    info!(files = files.len(), samples = samples.len(), "Collected samples");
    Ok(Series::sorted(samples))
}
