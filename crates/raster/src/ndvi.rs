//! Normalized Difference Vegetation Index.

use tracing::debug;

use crate::band::{is_valid_sample, MultiBand, Raster};
use crate::error::{RasterError, Result};

/// Per-pixel `(nir - red) / (nir + red)`.
///
/// The result is NaN where either input is NaN or nodata, or where
/// `nir + red == 0`. Georeferencing is taken from `nir`; the output nodata
/// value is NaN.
pub fn ndvi(nir: &Raster, red: &Raster) -> Result<Raster> {
    if nir.shape() != red.shape() {
        return Err(RasterError::shape_mismatch(nir.shape(), red.shape()));
    }

    let data = ndvi_values(&nir.data, nir.nodata, &red.data, red.nodata);
    let mut out = nir.with_data(data)?;
    out.nodata = Some(f64::NAN);

    debug!(
        width = out.width,
        height = out.height,
        "Computed NDVI"
    );
    Ok(out)
}

/// NDVI from two bands of one raster, by 1-based band index.
pub fn ndvi_from_multiband(bands: &MultiBand, nir_index: usize, red_index: usize) -> Result<Raster> {
    let nir = bands.band(nir_index)?;
    let red = bands.band(red_index)?;
    ndvi(&nir, &red)
}

fn ndvi_values(nir: &[f32], nir_nodata: Option<f64>, red: &[f32], red_nodata: Option<f64>) -> Vec<f32> {
    nir.iter()
        .zip(red)
        .map(|(&n, &r)| {
            if !is_valid_sample(n, nir_nodata) || !is_valid_sample(r, red_nodata) {
                return f32::NAN;
            }
            // Accumulate in f64 so large DN values do not lose precision.
            let (n, r) = (n as f64, r as f64);
            let sum = n + r;
            if sum == 0.0 {
                f32::NAN
            } else {
                ((n - r) / sum) as f32
            }
        })
        .collect()
}
