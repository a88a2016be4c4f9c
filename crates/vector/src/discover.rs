//! Locating a shapefile and deriving the area of interest from it.

use std::path::{Path, PathBuf};

use bioma_common::{BoundingBox, CrsCode, SpatialExtent};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{Result, VectorError};
use crate::layer::Layer;

/// First `.shp` in `dir` (not recursive), in file-name order.
pub fn find_shapefile(dir: &Path) -> Result<PathBuf> {
    let mut found: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case("shp"))
                .unwrap_or(false)
        })
        .collect();
    found.sort();
    found
        .into_iter()
        .next()
        .ok_or_else(|| VectorError::NoShapefile(dir.to_path_buf()))
}

/// A `.shp` path as given, or the first one inside a directory.
pub fn resolve_shapefile(path: &Path) -> Result<PathBuf> {
    if path.is_dir() {
        find_shapefile(path)
    } else {
        Ok(path.to_path_buf())
    }
}

/// Lon/lat extent of the shapefile found at `path`, optionally clamped.
///
/// Each side is clamped independently: west = max(west, clamp.min_x),
/// east = min(east, clamp.max_x), and likewise for south and north.
pub fn area_of_interest(path: &Path, clamp: Option<&BoundingBox>) -> Result<SpatialExtent> {
    let shp = resolve_shapefile(path)?;
    let layer = Layer::read(&shp)?.to_crs(CrsCode::Epsg4326);
    let bounds = layer.total_bounds().ok_or(VectorError::Empty(shp))?;
    debug!(?bounds, "Shapefile bounds in EPSG:4326");

    let bounds = match clamp {
        Some(limits) => bounds.clamp_to(limits),
        None => bounds,
    };
    let extent = SpatialExtent::from(bounds);
    info!(
        west = extent.west,
        south = extent.south,
        east = extent.east,
        north = extent.north,
        "Area of interest"
    );
    Ok(extent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_shapefile_sorted_and_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.SHP", "c.shp", "notes.txt", "a.dbf"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        assert_eq!(find_shapefile(dir.path()).unwrap(), dir.path().join("b.SHP"));
    }

    #[test]
    fn test_find_shapefile_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            find_shapefile(dir.path()),
            Err(VectorError::NoShapefile(_))
        ));
    }

    #[test]
    fn test_nested_shapefiles_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/a.shp"), b"").unwrap();
        assert!(find_shapefile(dir.path()).is_err());
    }
}
