//! NaN-aware band statistics.

use crate::band::Raster;
use crate::error::{RasterError, Result};

/// Summary of the valid pixels of a band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandStats {
    pub min: f32,
    pub max: f32,
    pub mean: f64,
    pub valid_count: usize,
    pub total_count: usize,
}

impl BandStats {
    /// True when every valid pixel has the same value.
    pub fn is_constant(&self) -> bool {
        self.min == self.max
    }
}

/// Statistics over the valid pixels, or None when there are none.
pub fn stats(raster: &Raster) -> Option<BandStats> {
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    let mut sum = 0.0f64;
    let mut count = 0usize;

    for v in raster.valid_values() {
        min = min.min(v);
        max = max.max(v);
        sum += v as f64;
        count += 1;
    }

    if count == 0 {
        return None;
    }

    Some(BandStats {
        min,
        max,
        mean: sum / count as f64,
        valid_count: count,
        total_count: raster.data.len(),
    })
}

/// Mean of the valid pixels, failing on an empty or all-invalid band.
pub fn valid_mean(raster: &Raster) -> Result<f64> {
    if raster.is_empty() {
        return Err(RasterError::Empty);
    }
    stats(raster)
        .map(|s| s.mean)
        .ok_or(RasterError::NoValidPixels)
}

/// Percentile `q` (0..=100) with linear interpolation between closest ranks.
///
/// Matches numpy's default `percentile` method. NaN values are ignored.
/// Returns None when no finite values remain.
pub fn percentile(values: &[f32], q: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values
        .iter()
        .filter(|v| !v.is_nan())
        .map(|&v| v as f64)
        .collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));
    Some(percentile_sorted(&sorted, q))
}

/// Percentile of already sorted, NaN-free values.
pub fn percentile_sorted(sorted: &[f64], q: f64) -> f64 {
    let q = q.clamp(0.0, 100.0);
    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}
