//! Shapefile bounds and reprojection, point transforms.

use std::path::Path;

use anyhow::{Context, Result};
use bioma_common::{BoundingBox, CrsCode};
use projection::Transformer;
use tracing::info;
use vector::Layer;

/// Total bounds of a shapefile (or the first one in a directory) in `crs`.
pub fn vector_bounds(path: &Path, crs: &str) -> Result<BoundingBox> {
    let crs = CrsCode::parse(crs)?;
    let shp = vector::resolve_shapefile(path)?;
    let layer = Layer::read(&shp).with_context(|| format!("Failed to read {}", shp.display()))?;
    layer
        .to_crs(crs)
        .total_bounds()
        .with_context(|| format!("{} has no vertices", shp.display()))
}

/// Write `input` reprojected to `to` at `output`. Returns the feature count.
pub fn vector_reproject(input: &Path, output: &Path, to: &str) -> Result<usize> {
    let crs = CrsCode::parse(to)?;
    let layer = Layer::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let layer = layer.to_crs(crs);
    let count = layer.features.len();
    layer
        .write(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    info!(output = %output.display(), crs = %crs, features = count, "Wrote reprojected shapefile");
    Ok(count)
}

/// Transform one coordinate, x/y in the axis order of each CRS
/// (longitude first for geographic systems).
pub fn reproject_point(from: &str, to: &str, x: f64, y: f64) -> Result<(f64, f64)> {
    let transformer = Transformer::from_crs_strings(from, to)?;
    let (tx, ty) = transformer.transform(x, y);
    anyhow::ensure!(
        tx.is_finite() && ty.is_finite(),
        "({}, {}) has no image in {}",
        x,
        y,
        to
    );
    Ok((tx, ty))
}
