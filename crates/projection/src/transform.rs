//! Point transformation between two projections.
//!
//! Coordinates are always passed in x/y order (easting/northing or
//! lon/lat), regardless of the axis order the CRS formally declares.

use bioma_common::{BoundingBox, CrsCode};

use crate::error::Result;
use crate::projection::Projection;

/// Samples per bounding box edge when densifying.
pub const DENSIFY_POINTS: usize = 21;

/// Transforms coordinates from a source projection into a destination one,
/// going through geographic lon/lat.
#[derive(Debug, Clone)]
pub struct Transformer {
    src: Projection,
    dst: Projection,
    identity: bool,
}

impl Transformer {
    pub fn new(src: Projection, dst: Projection) -> Self {
        let identity = src == dst;
        Self { src, dst, identity }
    }

    /// Transformer between two EPSG codes.
    pub fn from_crs(src: CrsCode, dst: CrsCode) -> Self {
        Self::new(Projection::from_crs(src), Projection::from_crs(dst))
    }

    /// Transformer between two EPSG code strings ("EPSG:32723").
    pub fn from_crs_strings(src: &str, dst: &str) -> Result<Self> {
        Ok(Self::from_crs(CrsCode::parse(src)?, CrsCode::parse(dst)?))
    }

    /// Transformer into lon/lat degrees.
    pub fn to_geographic(src: Projection) -> Self {
        Self::new(src, Projection::Geographic)
    }

    pub fn is_identity(&self) -> bool {
        self.identity
    }

    pub fn transform(&self, x: f64, y: f64) -> (f64, f64) {
        if self.identity {
            return (x, y);
        }
        let (lon, lat) = self.src.to_geographic(x, y);
        self.dst.from_geographic(lon, lat)
    }

    /// Transform a list of points.
    pub fn transform_many(&self, points: &[(f64, f64)]) -> Vec<(f64, f64)> {
        points.iter().map(|&(x, y)| self.transform(x, y)).collect()
    }

    /// Transform a bounding box, sampling each edge so curved edges are
    /// enclosed.
    pub fn transform_bounds(&self, bbox: &BoundingBox) -> BoundingBox {
        if self.identity {
            return *bbox;
        }

        let mut out = BoundingBox::empty();
        let steps = (DENSIFY_POINTS - 1) as f64;
        for i in 0..DENSIFY_POINTS {
            let t = i as f64 / steps;
            let x = bbox.min_x + t * bbox.width();
            let y = bbox.min_y + t * bbox.height();

            for (px, py) in [
                (x, bbox.min_y),
                (x, bbox.max_y),
                (bbox.min_x, y),
                (bbox.max_x, y),
            ] {
                let (tx, ty) = self.transform(px, py);
                out.expand_to_include(tx, ty);
            }
        }
        out
    }
}
