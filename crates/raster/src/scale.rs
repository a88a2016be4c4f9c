//! Value scaling for display.

use tracing::debug;

use crate::band::{MultiBand, Raster};
use crate::error::{RasterError, Result};
use crate::stats::{percentile_sorted, stats};

/// Sentinel-2 L2A reflectances are stored as integers scaled by this factor.
pub const REFLECTANCE_SCALE: f32 = 10_000.0;

/// Clip `x` to `[in_min, in_max]` and map it linearly onto `[out_min, out_max]`.
///
/// A degenerate input range maps everything to `out_min`.
pub fn linear_scale_range(x: f64, in_min: f64, in_max: f64, out_min: f64, out_max: f64) -> f64 {
    if in_max <= in_min {
        return out_min;
    }
    let clipped = x.clamp(in_min, in_max);
    (clipped - in_min) / (in_max - in_min) * (out_max - out_min) + out_min
}

/// Percentile stretch of three bands to interleaved 8-bit RGB.
///
/// Both percentiles are computed over the samples of all bands together,
/// then every sample is scaled to 0..255 and truncated. NaN samples become 0.
pub fn stretch_to_u8(image: &MultiBand, low_pct: f64, high_pct: f64) -> Result<Vec<u8>> {
    if image.band_count() < 3 {
        return Err(RasterError::BandOutOfRange {
            index: 3,
            count: image.band_count(),
        });
    }
    let bands = &image.bands[..3];

    let mut sorted: Vec<f64> = bands
        .iter()
        .flat_map(|b| b.iter())
        .filter(|v| !v.is_nan())
        .map(|&v| v as f64)
        .collect();
    if sorted.is_empty() {
        return Err(RasterError::NoValidPixels);
    }
    sorted.sort_by(|a, b| a.total_cmp(b));
    let lo = percentile_sorted(&sorted, low_pct);
    let hi = percentile_sorted(&sorted, high_pct);
    debug!(low = lo, high = hi, "Percentile stretch limits");

    let pixels = image.width * image.height;
    let mut out = Vec::with_capacity(pixels * 3);
    for i in 0..pixels {
        for band in bands {
            let v = band[i];
            let scaled = if v.is_nan() {
                0.0
            } else {
                linear_scale_range(v as f64, lo, hi, 0.0, 255.0)
            };
            out.push(scaled as u8);
        }
    }
    Ok(out)
}

/// Divide by the L2A scale factor when the band holds integer reflectances
/// (any valid value above 1).
pub fn normalize_reflectance(raster: &Raster) -> Result<Raster> {
    let needs_scaling = stats(raster).map(|s| s.max > 1.0).unwrap_or(false);
    if !needs_scaling {
        return Ok(raster.clone());
    }
    let data = raster
        .data
        .iter()
        .map(|&v| {
            if raster.is_valid(v) {
                v / REFLECTANCE_SCALE
            } else {
                v
            }
        })
        .collect();
    raster.with_data(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::assert_approx_eq;

    #[test]
    fn test_linear_scale_range() {
        assert_eq!(linear_scale_range(5.0, 0.0, 10.0, 0.0, 255.0), 127.5);
        assert_eq!(linear_scale_range(-3.0, 0.0, 10.0, 0.0, 255.0), 0.0);
        assert_eq!(linear_scale_range(30.0, 0.0, 10.0, 0.0, 255.0), 255.0);
        assert_eq!(linear_scale_range(0.0, -1.0, 1.0, 0.0, 1.0), 0.5);
    }

    #[test]
    fn test_linear_scale_degenerate_range() {
        assert_eq!(linear_scale_range(4.0, 2.0, 2.0, 0.0, 255.0), 0.0);
    }

    #[test]
    fn test_stretch_uses_joint_percentiles() {
        // 99 samples spread over three bands: 0..=98 across all of them.
        let values: Vec<f32> = (0..99).map(|v| v as f32).collect();
        let r: Vec<f32> = values[0..33].to_vec();
        let g: Vec<f32> = values[33..66].to_vec();
        let b: Vec<f32> = values[66..99].to_vec();
        let image = MultiBand::new(33, 1, vec![r, g, b]).unwrap();

        let rgb = stretch_to_u8(&image, 2.0, 98.0).unwrap();
        assert_eq!(rgb.len(), 99);
        // Lowest red sample is below the 2nd percentile, highest blue above the 98th.
        assert_eq!(rgb[0], 0);
        assert_eq!(rgb[rgb.len() - 1], 255);
        // Middle sample (49) maps to the middle of the range.
        let mid = rgb[16 * 3 + 1];
        assert!((120..=135).contains(&mid), "mid = {}", mid);
    }

    #[test]
    fn test_stretch_needs_three_bands() {
        let image = MultiBand::new(1, 1, vec![vec![1.0], vec![2.0]]).unwrap();
        assert!(stretch_to_u8(&image, 2.0, 98.0).is_err());
    }

    #[test]
    fn test_normalize_reflectance() {
        let dn = Raster::new(3, 1, vec![4200.0, f32::NAN, 800.0]).unwrap();
        let out = normalize_reflectance(&dn).unwrap();
        assert_approx_eq!(out.data[0], 0.42, 1e-6);
        assert!(out.data[1].is_nan());
        assert_approx_eq!(out.data[2], 0.08, 1e-6);

        let already = Raster::new(2, 1, vec![0.4, 0.9]).unwrap();
        assert_eq!(normalize_reflectance(&already).unwrap().data, vec![0.4, 0.9]);
    }
}
