//! GeoKeyDirectory and model-space tags.

use bioma_common::{CrsCode, GeoTransform};
use tracing::warn;

use crate::error::{GeoTiffError, Result};

pub const GT_MODEL_TYPE: u16 = 1024;
pub const GT_RASTER_TYPE: u16 = 1025;
pub const GEOGRAPHIC_TYPE: u16 = 2048;
pub const PROJECTED_CS_TYPE: u16 = 3072;

pub const MODEL_TYPE_PROJECTED: u16 = 1;
pub const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
pub const RASTER_PIXEL_IS_AREA: u16 = 1;
pub const RASTER_PIXEL_IS_POINT: u16 = 2;

/// EPSG code for "user-defined" keys.
const USER_DEFINED: u16 = 32767;

/// Keys with inline SHORT values from a GeoKeyDirectory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoKeys {
    pub entries: Vec<(u16, u16)>,
}

impl GeoKeys {
    /// Parse the directory: a 4-short header followed by
    /// `(key, location, count, value)` entries.
    pub fn parse(dir: &[u16]) -> Result<Self> {
        if dir.len() < 4 {
            return Err(GeoTiffError::invalid_tag(
                "GeoKeyDirectory",
                format!("{} values, expected at least 4", dir.len()),
            ));
        }
        let count = dir[3] as usize;
        let entries = dir[4..]
            .chunks_exact(4)
            .take(count)
            // location 0 means the value is stored inline
            .filter(|e| e[1] == 0)
            .map(|e| (e[0], e[3]))
            .collect();
        Ok(Self { entries })
    }

    pub fn get(&self, key: u16) -> Option<u16> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
    }

    /// Projected CRS code, else geographic CRS code, when supported.
    pub fn crs(&self) -> Option<CrsCode> {
        let code = self
            .get(PROJECTED_CS_TYPE)
            .filter(|c| *c != USER_DEFINED)
            .or_else(|| self.get(GEOGRAPHIC_TYPE).filter(|c| *c != USER_DEFINED))?;
        match CrsCode::from_epsg(code as u32) {
            Ok(crs) => Some(crs),
            Err(e) => {
                warn!(code = code, error = %e, "Ignoring unsupported GeoTIFF CRS");
                None
            }
        }
    }

    pub fn pixel_is_point(&self) -> bool {
        self.get(GT_RASTER_TYPE) == Some(RASTER_PIXEL_IS_POINT)
    }

    /// Directory for a CRS, raster type PixelIsArea.
    pub fn for_crs(crs: Option<CrsCode>) -> Vec<u16> {
        let mut keys = vec![(GT_RASTER_TYPE, RASTER_PIXEL_IS_AREA)];
        if let Some(crs) = crs {
            // EPSG codes handled here all fit in a SHORT.
            let code = crs.epsg() as u16;
            if crs.is_geographic() {
                keys.push((GT_MODEL_TYPE, MODEL_TYPE_GEOGRAPHIC));
                keys.push((GEOGRAPHIC_TYPE, code));
            } else {
                keys.push((GT_MODEL_TYPE, MODEL_TYPE_PROJECTED));
                keys.push((PROJECTED_CS_TYPE, code));
            }
        }
        keys.sort_by_key(|(k, _)| *k);

        let mut dir = vec![1, 1, 0, keys.len() as u16];
        for (key, value) in keys {
            dir.extend_from_slice(&[key, 0, 1, value]);
        }
        dir
    }
}

/// Geotransform from ModelTransformation, or from ModelTiepoint + ModelPixelScale.
///
/// PixelIsPoint rasters are shifted by half a pixel so the transform always
/// refers to pixel corners.
pub fn transform_from_tags(
    transformation: Option<&[f64]>,
    tiepoint: Option<&[f64]>,
    scale: Option<&[f64]>,
    pixel_is_point: bool,
) -> Result<Option<GeoTransform>> {
    let mut gt = if let Some(m) = transformation {
        if m.len() < 16 {
            return Err(GeoTiffError::invalid_tag(
                "ModelTransformation",
                format!("{} values, expected 16", m.len()),
            ));
        }
        GeoTransform {
            a: m[0],
            b: m[1],
            c: m[3],
            d: m[4],
            e: m[5],
            f: m[7],
        }
    } else {
        match (tiepoint, scale) {
            (Some(tp), Some(sc)) => {
                if tp.len() < 6 || sc.len() < 2 {
                    return Err(GeoTiffError::invalid_tag(
                        "ModelTiepoint",
                        format!("{} tiepoint / {} scale values", tp.len(), sc.len()),
                    ));
                }
                let (i, j, x, y) = (tp[0], tp[1], tp[3], tp[4]);
                let (sx, sy) = (sc[0], sc[1]);
                GeoTransform {
                    a: sx,
                    b: 0.0,
                    c: x - i * sx,
                    d: 0.0,
                    e: -sy,
                    f: y + j * sy,
                }
            }
            _ => return Ok(None),
        }
    };

    if pixel_is_point {
        gt.c -= 0.5 * (gt.a + gt.b);
        gt.f -= 0.5 * (gt.d + gt.e);
    }
    Ok(Some(gt))
}
