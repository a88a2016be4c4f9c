//! Composites, animations and the NDVI time series.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use renderer::compose;
use timeseries::AnalysisReport;
use tracing::info;

use super::{sweep, SweepReport};
use crate::config::{RenderConfig, TimeSeriesConfig};

/// Side-by-side composites for every RGB image with an NDVI partner.
pub fn combine(
    rgb_dir: &Path,
    ndvi_dir: &Path,
    output: &Path,
    title: &str,
    render: &RenderConfig,
) -> Result<SweepReport> {
    let pairs = compose::pair_images(rgb_dir, ndvi_dir)?;
    anyhow::ensure!(
        !pairs.is_empty(),
        "No RGB image in {} has an NDVI counterpart in {}",
        rgb_dir.display(),
        ndvi_dir.display()
    );
    std::fs::create_dir_all(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;

    let font = renderer::load_font(render.font.as_deref());
    let options = render.compose_options();
    Ok(sweep(
        &pairs,
        "Composites",
        |(rgb, _)| rgb.as_path(),
        |(rgb, ndvi)| {
            compose::combine_pair(rgb, ndvi, output, title, font.as_ref(), &options)?;
            Ok(())
        },
    ))
}

/// `biomass_analysis.gif` from the PNGs in `input`.
pub fn animate(
    input: &Path,
    output: &Path,
    title: &str,
    render: &RenderConfig,
) -> Result<(PathBuf, usize)> {
    let font = renderer::load_font(render.font.as_deref());
    let pb = crate::progress::spinner("Encoding animation");
    let result = renderer::animation::animate_directory(
        input,
        output,
        title,
        font.as_ref(),
        &render.animation_options(),
    );
    pb.finish_and_clear();
    let (path, frames) = result?;
    info!(path = %path.display(), frames, "Animation written");
    Ok((path, frames))
}

/// CSV tables and chart for the NDVI GeoTIFFs in `input`.
pub fn time_series(
    input: &Path,
    output: &Path,
    params: &TimeSeriesConfig,
    render: &RenderConfig,
) -> Result<AnalysisReport> {
    let font = renderer::load_font(render.font.as_deref());
    let report = timeseries::analyze(input, output, &params.analysis_params(), font.as_ref())?;
    info!(
        samples = report.samples,
        kept = report.kept,
        events = report.events.len(),
        chart = %report.chart.display(),
        "Time series written"
    );
    Ok(report)
}
