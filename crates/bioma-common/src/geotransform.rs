//! Affine transform between pixel and map coordinates.

use serde::{Deserialize, Serialize};

use crate::bbox::BoundingBox;
use crate::error::{BiomaError, BiomaResult};

/// Six-coefficient affine transform, rasterio/affine ordering:
///
/// ```text
/// x = c + col * a + row * b
/// y = f + col * d + row * e
/// ```
///
/// `(col, row) = (0, 0)` is the outer corner of the upper-left pixel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl GeoTransform {
    /// North-up transform from the upper-left corner and pixel sizes.
    pub fn from_origin(west: f64, north: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            a: pixel_width,
            b: 0.0,
            c: west,
            d: 0.0,
            e: -pixel_height,
            f: north,
        }
    }

    /// Build from GDAL order `[c, a, b, f, d, e]`.
    pub fn from_gdal(gt: [f64; 6]) -> Self {
        Self {
            c: gt[0],
            a: gt[1],
            b: gt[2],
            f: gt[3],
            d: gt[4],
            e: gt[5],
        }
    }

    pub fn to_gdal(&self) -> [f64; 6] {
        [self.c, self.a, self.b, self.f, self.d, self.e]
    }

    /// Map coordinates of a (fractional) pixel position.
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.c + col * self.a + row * self.b,
            self.f + col * self.d + row * self.e,
        )
    }

    /// Pixel position of a map coordinate.
    pub fn invert(&self, x: f64, y: f64) -> BiomaResult<(f64, f64)> {
        let det = self.a * self.e - self.b * self.d;
        if det.abs() < f64::EPSILON {
            return Err(BiomaError::DegenerateTransform(format!("{:?}", self)));
        }
        let dx = x - self.c;
        let dy = y - self.f;
        let col = (self.e * dx - self.b * dy) / det;
        let row = (-self.d * dx + self.a * dy) / det;
        Ok((col, row))
    }

    /// Absolute pixel size along x and y.
    pub fn pixel_size(&self) -> (f64, f64) {
        (
            (self.a * self.a + self.d * self.d).sqrt(),
            (self.b * self.b + self.e * self.e).sqrt(),
        )
    }

    /// True when the transform has no rotation terms.
    pub fn is_north_up(&self) -> bool {
        self.b == 0.0 && self.d == 0.0
    }

    /// Map extent covered by a `width` x `height` raster.
    pub fn bounds(&self, width: usize, height: usize) -> BoundingBox {
        let mut bbox = BoundingBox::empty();
        for (col, row) in [
            (0.0, 0.0),
            (width as f64, 0.0),
            (0.0, height as f64),
            (width as f64, height as f64),
        ] {
            let (x, y) = self.apply(col, row);
            bbox.expand_to_include(x, y);
        }
        bbox
    }
}

impl Default for GeoTransform {
    /// Identity: pixel coordinates with rows growing downwards.
    fn default() -> Self {
        Self::from_origin(0.0, 0.0, 1.0, -1.0)
    }
}
