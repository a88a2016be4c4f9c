//! Local NDVI computation and colored maps.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, instrument, warn};

use super::{list_tiffs, png_path_for, sweep, SweepReport};
use crate::config::RenderConfig;

/// Where the near-infrared and red bands come from.
#[derive(Debug, Clone)]
pub enum BandSource {
    Separate {
        nir: PathBuf,
        red: PathBuf,
    },
    /// One file; band numbers are 1-based.
    Multiband {
        path: PathBuf,
        nir_band: usize,
        red_band: usize,
    },
}

/// Compute NDVI and write it as a Float32 GeoTIFF.
#[instrument(skip_all, fields(output = %output.display()))]
pub fn compute(source: &BandSource, output: &Path) -> Result<()> {
    let ndvi = match source {
        BandSource::Separate { nir, red } => {
            let nir_band = geotiff::read_band(nir, 1)
                .with_context(|| format!("Failed to read NIR band {}", nir.display()))?;
            let red_band = geotiff::read_band(red, 1)
                .with_context(|| format!("Failed to read red band {}", red.display()))?;
            raster::ndvi(&nir_band, &red_band)?
        }
        BandSource::Multiband {
            path,
            nir_band,
            red_band,
        } => {
            let bands = geotiff::read(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            raster::ndvi_from_multiband(&bands, *nir_band, *red_band)?
        }
    };

    match raster::stats(&ndvi) {
        Some(s) => info!(min = s.min, max = s.max, mean = s.mean, "NDVI computed"),
        None => warn!("NDVI has no valid pixels"),
    }
    geotiff::write_f32(output, &ndvi)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    info!(path = %output.display(), "Saved NDVI GeoTIFF");
    Ok(())
}

/// Colored NDVI PNG for every GeoTIFF in `input`, written to `output`.
///
/// A directory without GeoTIFFs only logs a warning.
pub fn render_dir(input: &Path, output: &Path, render: &RenderConfig) -> Result<SweepReport> {
    let tiffs = list_tiffs(input)?;
    if tiffs.is_empty() {
        warn!(dir = %input.display(), "No GeoTIFFs to render");
        return Ok(SweepReport::default());
    }
    std::fs::create_dir_all(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;

    let font = renderer::load_font(render.font.as_deref());
    let options = render.ndvi_options();
    Ok(sweep(&tiffs, "NDVI maps", |p| p.as_path(), |tif| {
        let png = png_path_for(tif, output);
        renderer::ndvi_map::convert_file(tif, &png, font.as_ref(), &options)?;
        Ok(())
    }))
}
