//! Test data generators for synthetic satellite bands and NDVI series.
//!
//! These generators create predictable, verifiable patterns that can be
//! used across the test suite.

use chrono::{Duration, NaiveDate};

/// Creates a test grid with predictable values.
///
/// Each cell value is calculated as: `col * 1000 + row`
///
/// # Example
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(10, 5);
/// assert_eq!(grid.len(), 50);
/// assert_eq!(grid[1], 1000.0); // col=1, row=0
/// assert_eq!(grid[10], 1.0);   // col=0, row=1
/// ```
pub fn create_test_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push((col * 1000 + row) as f32);
        }
    }
    data
}

/// Creates a red/near-infrared band pair in Sentinel-2 L2A digital numbers.
///
/// Vegetation increases from left to right: the leftmost column looks like
/// bare soil (NDVI ≈ 0.1), the rightmost like dense canopy (NDVI ≈ 0.8).
///
/// Returns `(red, nir)` in row-major order.
pub fn create_band_pair(width: usize, height: usize) -> (Vec<f32>, Vec<f32>) {
    let mut red = Vec::with_capacity(width * height);
    let mut nir = Vec::with_capacity(width * height);
    for _row in 0..height {
        for col in 0..width {
            let t = if width > 1 {
                col as f32 / (width - 1) as f32
            } else {
                0.0
            };
            let ndvi = 0.1 + 0.7 * t;
            let r = 1200.0 - 800.0 * t;
            // Solve (n - r) / (n + r) = ndvi for n.
            let n = r * (1.0 + ndvi) / (1.0 - ndvi);
            red.push(r);
            nir.push(n);
        }
    }
    (red, nir)
}

/// Expected NDVI for `create_band_pair` at a column.
pub fn band_pair_ndvi(col: usize, width: usize) -> f32 {
    let t = if width > 1 {
        col as f32 / (width - 1) as f32
    } else {
        0.0
    };
    0.1 + 0.7 * t
}

/// Creates an NDVI grid ranging linearly from -1 (top-left) to 1 (bottom-right).
pub fn create_ndvi_ramp(width: usize, height: usize) -> Vec<f32> {
    let span = (width + height).saturating_sub(2).max(1) as f32;
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push(-1.0 + 2.0 * (col + row) as f32 / span);
        }
    }
    data
}

/// Creates a grid filled with a constant value.
pub fn create_constant_grid(width: usize, height: usize, value: f32) -> Vec<f32> {
    vec![value; width * height]
}

/// Creates a grid with NaN values at specific positions.
///
/// `nan_positions` holds `(col, row)` pairs.
pub fn create_grid_with_nans(
    width: usize,
    height: usize,
    base_value: f32,
    nan_positions: &[(usize, usize)],
) -> Vec<f32> {
    let mut data = vec![base_value; width * height];
    for &(col, row) in nan_positions {
        if col < width && row < height {
            data[row * width + col] = f32::NAN;
        }
    }
    data
}

/// Creates an interleaved RGB test image with a horizontal red ramp and a
/// vertical green ramp.
pub fn create_test_rgb_pixels(width: usize, height: usize) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(width * height * 3);
    for row in 0..height {
        for col in 0..width {
            pixels.push((col * 255 / width.max(1)) as u8);
            pixels.push((row * 255 / height.max(1)) as u8);
            pixels.push(128);
        }
    }
    pixels
}

/// Dates spaced `step_days` apart, starting at `start`.
pub fn create_dates(start: NaiveDate, count: usize, step_days: i64) -> Vec<NaiveDate> {
    (0..count)
        .map(|i| start + Duration::days(step_days * i as i64))
        .collect()
}

/// A sugarcane-like NDVI cycle: slow growth to a peak, then an abrupt cut.
///
/// `cycles` full cycles of `cycle_len` samples each. Values range from
/// `low` right after harvest to `high` just before it.
pub fn create_crop_cycle_series(cycles: usize, cycle_len: usize, low: f64, high: f64) -> Vec<f64> {
    let mut values = Vec::with_capacity(cycles * cycle_len);
    for _ in 0..cycles {
        for i in 0..cycle_len {
            let t = i as f64 / (cycle_len.max(2) - 1) as f64;
            values.push(low + (high - low) * t);
        }
    }
    values
}

/// Smooth sinusoidal NDVI series with the given period in samples.
pub fn create_seasonal_series(len: usize, period: f64, mean: f64, amplitude: f64) -> Vec<f64> {
    (0..len)
        .map(|i| mean + amplitude * (2.0 * std::f64::consts::PI * i as f64 / period).sin())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_pair_matches_expected_ndvi() {
        let (red, nir) = create_band_pair(8, 2);
        for col in 0..8 {
            let idx = 8 + col;
            let ndvi = (nir[idx] - red[idx]) / (nir[idx] + red[idx]);
            assert!((ndvi - band_pair_ndvi(col, 8)).abs() < 1e-5);
        }
    }

    #[test]
    fn test_ndvi_ramp_limits() {
        let ramp = create_ndvi_ramp(5, 4);
        assert_eq!(ramp[0], -1.0);
        assert_eq!(*ramp.last().unwrap(), 1.0);
    }

    #[test]
    fn test_grid_with_nans() {
        let grid = create_grid_with_nans(3, 3, 0.5, &[(1, 1), (5, 5)]);
        assert!(grid[4].is_nan());
        assert_eq!(grid.iter().filter(|v| v.is_nan()).count(), 1);
    }

    #[test]
    fn test_crop_cycle_series() {
        let series = create_crop_cycle_series(2, 5, 0.2, 0.8);
        assert_eq!(series.len(), 10);
        assert_eq!(series[0], 0.2);
        assert_eq!(series[4], 0.8);
        assert_eq!(series[5], 0.2);
    }

    #[test]
    fn test_dates() {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let dates = create_dates(start, 3, 5);
        assert_eq!(dates[2], NaiveDate::from_ymd_opt(2023, 1, 11).unwrap());
    }
}
