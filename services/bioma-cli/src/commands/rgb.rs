//! True colour PNGs and date-based file names.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use super::{list_tiffs, png_path_for, sweep, SweepReport};

/// `RGB_YYYY-MM-DD.tif` from the TIFF DateTime tag, if present.
pub fn dated_name(tif: &Path) -> Result<Option<String>> {
    let datetime = geotiff::read_datetime(tif)?;
    Ok(datetime.map(|dt| format!("RGB_{}.tif", dt.format("%Y-%m-%d"))))
}

/// Rename every GeoTIFF in `dir` after its acquisition date.
///
/// Files without a DateTime tag, whose dated name is already taken, or that
/// fail to rename keep their name. Returns the resulting paths, sorted.
pub fn rename_by_datetime(dir: &Path) -> Result<Vec<PathBuf>> {
    rename_each(dir, |from, to| std::fs::rename(from, to))
}

fn rename_each<F>(dir: &Path, rename: F) -> Result<Vec<PathBuf>>
where
    F: Fn(&Path, &Path) -> std::io::Result<()>,
{
    let mut result = Vec::new();
    for tif in list_tiffs(dir)? {
        let name = match dated_name(&tif) {
            Ok(Some(name)) => name,
            Ok(None) => {
                warn!(path = %tif.display(), "No DateTime tag, keeping name");
                result.push(tif);
                continue;
            }
            Err(e) => {
                warn!(path = %tif.display(), error = %e, "Could not read DateTime, keeping name");
                result.push(tif);
                continue;
            }
        };

        let target = dir.join(&name);
        if target == tif {
            result.push(tif);
            continue;
        }
        if target.exists() {
            warn!(path = %tif.display(), target = %target.display(), "Dated name already taken, keeping name");
            result.push(tif);
            continue;
        }
        if let Err(e) = rename(&tif, &target) {
            warn!(path = %tif.display(), target = %target.display(), error = %e, "Rename failed, keeping name");
            result.push(tif);
            continue;
        }
        info!(from = %tif.display(), to = %name, "Renamed by acquisition date");
        result.push(target);
    }
    result.sort();
    Ok(result)
}

/// PNG for every GeoTIFF in `input`, written to `output`.
pub fn render_dir(input: &Path, output: &Path) -> Result<SweepReport> {
    let tiffs = list_tiffs(input)?;
    anyhow::ensure!(
        !tiffs.is_empty(),
        "No GeoTIFF files in {} to render",
        input.display()
    );
    std::fs::create_dir_all(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;

    Ok(sweep(&tiffs, "RGB images", |p| p.as_path(), |tif| {
        renderer::rgb::convert_file(tif, &png_path_for(tif, output))?;
        Ok(())
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bioma_common::{CrsCode, GeoTransform};
    use chrono::NaiveDate;
    use raster::MultiBand;
    use std::io;

    fn write_dated(path: &Path, day: u32) {
        let mut image = MultiBand::new(2, 2, vec![vec![500.0; 4]; 3]).unwrap();
        image.transform = GeoTransform::from_origin(-47.70, -22.68, 0.0005, 0.0005);
        image.crs = Some(CrsCode::Epsg4326);
        image.timestamp = NaiveDate::from_ymd_opt(2023, 1, day).unwrap().and_hms_opt(13, 24, 0);
        geotiff::write_rgb_f32(path, &image).unwrap();
    }

    #[test]
    fn test_failed_rename_keeps_name_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        write_dated(&dir.path().join("a.tif"), 5);
        write_dated(&dir.path().join("b.tif"), 20);

        let files = rename_each(dir.path(), |from, to| {
            if from.ends_with("a.tif") {
                Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
            } else {
                std::fs::rename(from, to)
            }
        })
        .unwrap();

        assert_eq!(
            files,
            vec![dir.path().join("RGB_2023-01-20.tif"), dir.path().join("a.tif")]
        );
        assert!(dir.path().join("a.tif").is_file());
        assert!(!dir.path().join("b.tif").exists());
    }
}
