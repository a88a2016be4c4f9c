//! Interpolation methods for band resampling.

use crate::band::Raster;
use crate::error::{RasterError, Result};
use bioma_common::GeoTransform;

/// How a resampled pixel takes its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterpolationMethod {
    /// Value of the closest source pixel. Keeps masks crisp.
    #[default]
    Nearest,
    /// Weighted mean of the four surrounding pixels.
    Bilinear,
}

/// Nearest neighbor at fractional pixel-center coordinates.
pub fn nearest_interpolate(data: &[f32], width: usize, height: usize, x: f64, y: f64) -> f32 {
    if x < -0.5 || y < -0.5 {
        return f32::NAN;
    }
    let col = x.round().max(0.0) as usize;
    let row = y.round().max(0.0) as usize;

    if col >= width || row >= height {
        return f32::NAN;
    }

    data[row * width + col]
}

/// Bilinear interpolation at fractional pixel-center coordinates.
///
/// If any of the four neighbours is NaN the result is NaN.
pub fn bilinear_interpolate(data: &[f32], width: usize, height: usize, x: f64, y: f64) -> f32 {
    if width == 0 || height == 0 {
        return f32::NAN;
    }
    let x = x.clamp(0.0, (width - 1) as f64);
    let y = y.clamp(0.0, (height - 1) as f64);

    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);

    let xf = (x - x0 as f64) as f32;
    let yf = (y - y0 as f64) as f32;

    let v00 = data[y0 * width + x0];
    let v10 = data[y0 * width + x1];
    let v01 = data[y1 * width + x0];
    let v11 = data[y1 * width + x1];

    if v00.is_nan() || v10.is_nan() || v01.is_nan() || v11.is_nan() {
        return f32::NAN;
    }

    let top = v00 * (1.0 - xf) + v10 * xf;
    let bottom = v01 * (1.0 - xf) + v11 * xf;
    top * (1.0 - yf) + bottom * yf
}

/// Resample a band to a new size covering the same extent.
///
/// Pixel centers are aligned, so an integer upscale with `Nearest` repeats
/// every source pixel exactly `factor` times. Nodata samples are turned into
/// NaN before interpolating, and the geotransform is scaled to the new
/// pixel size.
pub fn resample(
    raster: &Raster,
    dst_width: usize,
    dst_height: usize,
    method: InterpolationMethod,
) -> Result<Raster> {
    if dst_width == 0 || dst_height == 0 {
        return Err(RasterError::InvalidArgument(format!(
            "target size {}x{}",
            dst_width, dst_height
        )));
    }
    if raster.is_empty() {
        return Err(RasterError::Empty);
    }

    let src: Vec<f32> = raster
        .data
        .iter()
        .map(|&v| if raster.is_valid(v) { v } else { f32::NAN })
        .collect();

    let scale_x = raster.width as f64 / dst_width as f64;
    let scale_y = raster.height as f64 / dst_height as f64;

    let mut output = Vec::with_capacity(dst_width * dst_height);
    for dy in 0..dst_height {
        for dx in 0..dst_width {
            let sx = (dx as f64 + 0.5) * scale_x - 0.5;
            let sy = (dy as f64 + 0.5) * scale_y - 0.5;

            let value = match method {
                InterpolationMethod::Nearest => {
                    nearest_interpolate(&src, raster.width, raster.height, sx, sy)
                }
                InterpolationMethod::Bilinear => {
                    bilinear_interpolate(&src, raster.width, raster.height, sx, sy)
                }
            };
            output.push(value);
        }
    }

    let t = raster.transform;
    let transform = GeoTransform {
        a: t.a * scale_x,
        b: t.b * scale_y,
        c: t.c,
        d: t.d * scale_x,
        e: t.e * scale_y,
        f: t.f,
    };

    let mut out = Raster::new(dst_width, dst_height, output)?.with_transform(transform);
    out.crs = raster.crs;
    out.timestamp = raster.timestamp;
    out.nodata = Some(f64::NAN);
    Ok(out)
}
