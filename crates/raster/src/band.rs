//! Raster bands with georeferencing.

use bioma_common::{BoundingBox, CrsCode, GeoTransform};
use chrono::NaiveDateTime;

use crate::error::{RasterError, Result};

/// A single band of `f32` samples in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>,
    pub transform: GeoTransform,
    pub crs: Option<CrsCode>,
    /// Sample value that marks missing data, besides NaN.
    pub nodata: Option<f64>,
    /// Acquisition time, when the source carries one.
    pub timestamp: Option<NaiveDateTime>,
}

impl Raster {
    /// Create a band, checking that `data` holds `width * height` samples.
    pub fn new(width: usize, height: usize, data: Vec<f32>) -> Result<Self> {
        check_len(width, height, data.len())?;
        Ok(Self {
            width,
            height,
            data,
            transform: GeoTransform::default(),
            crs: None,
            nodata: None,
            timestamp: None,
        })
    }

    pub fn with_transform(mut self, transform: GeoTransform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_crs(mut self, crs: CrsCode) -> Self {
        self.crs = Some(crs);
        self
    }

    pub fn with_nodata(mut self, nodata: f64) -> Self {
        self.nodata = Some(nodata);
        self
    }

    pub fn with_timestamp(mut self, timestamp: NaiveDateTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Sample at (col, row), or None outside the raster.
    pub fn get(&self, col: usize, row: usize) -> Option<f32> {
        if col >= self.width || row >= self.height {
            return None;
        }
        Some(self.data[row * self.width + col])
    }

    /// True for samples that are neither NaN nor the nodata value.
    pub fn is_valid(&self, value: f32) -> bool {
        is_valid_sample(value, self.nodata)
    }

    /// Iterator over valid samples.
    pub fn valid_values(&self) -> impl Iterator<Item = f32> + '_ {
        let nodata = self.nodata;
        self.data
            .iter()
            .copied()
            .filter(move |v| is_valid_sample(*v, nodata))
    }

    /// Map extent of the raster.
    pub fn bounds(&self) -> BoundingBox {
        self.transform.bounds(self.width, self.height)
    }

    /// New raster with the same georeferencing and different samples.
    pub fn with_data(&self, data: Vec<f32>) -> Result<Self> {
        check_len(self.width, self.height, data.len())?;
        Ok(Self {
            data,
            ..self.clone_meta()
        })
    }

    fn clone_meta(&self) -> Self {
        Self {
            width: self.width,
            height: self.height,
            data: Vec::new(),
            transform: self.transform,
            crs: self.crs,
            nodata: self.nodata,
            timestamp: self.timestamp,
        }
    }
}

/// Several bands sharing one grid.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiBand {
    pub width: usize,
    pub height: usize,
    pub bands: Vec<Vec<f32>>,
    pub transform: GeoTransform,
    pub crs: Option<CrsCode>,
    pub nodata: Option<f64>,
    pub timestamp: Option<NaiveDateTime>,
}

impl MultiBand {
    pub fn new(width: usize, height: usize, bands: Vec<Vec<f32>>) -> Result<Self> {
        for band in &bands {
            check_len(width, height, band.len())?;
        }
        Ok(Self {
            width,
            height,
            bands,
            transform: GeoTransform::default(),
            crs: None,
            nodata: None,
            timestamp: None,
        })
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    /// Band by 1-based index, like rasterio's `read(1)`.
    pub fn band(&self, index: usize) -> Result<Raster> {
        if index == 0 || index > self.bands.len() {
            return Err(RasterError::BandOutOfRange {
                index,
                count: self.bands.len(),
            });
        }
        Ok(Raster {
            width: self.width,
            height: self.height,
            data: self.bands[index - 1].clone(),
            transform: self.transform,
            crs: self.crs,
            nodata: self.nodata,
            timestamp: self.timestamp,
        })
    }

    /// Consume into the first band.
    pub fn into_first_band(mut self) -> Result<Raster> {
        if self.bands.is_empty() {
            return Err(RasterError::BandOutOfRange { index: 1, count: 0 });
        }
        let data = self.bands.swap_remove(0);
        Ok(Raster {
            width: self.width,
            height: self.height,
            data,
            transform: self.transform,
            crs: self.crs,
            nodata: self.nodata,
            timestamp: self.timestamp,
        })
    }

    pub fn bounds(&self) -> BoundingBox {
        self.transform.bounds(self.width, self.height)
    }
}

impl From<Raster> for MultiBand {
    fn from(r: Raster) -> Self {
        Self {
            width: r.width,
            height: r.height,
            bands: vec![r.data],
            transform: r.transform,
            crs: r.crs,
            nodata: r.nodata,
            timestamp: r.timestamp,
        }
    }
}

pub(crate) fn is_valid_sample(value: f32, nodata: Option<f64>) -> bool {
    if value.is_nan() {
        return false;
    }
    match nodata {
        Some(nd) if !nd.is_nan() => value as f64 != nd && value != nd as f32,
        _ => true,
    }
}

fn check_len(width: usize, height: usize, actual: usize) -> Result<()> {
    let expected = width * height;
    if actual != expected {
        return Err(RasterError::SizeMismatch {
            expected,
            actual,
            width,
            height,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_checks_length() {
        assert!(Raster::new(3, 2, vec![0.0; 6]).is_ok());
        assert!(matches!(
            Raster::new(3, 2, vec![0.0; 5]),
            Err(RasterError::SizeMismatch { expected: 6, actual: 5, .. })
        ));
    }

    #[test]
    fn test_valid_values_skip_nan_and_nodata() {
        let r = Raster::new(2, 2, vec![1.0, f32::NAN, -9999.0, 4.0])
            .unwrap()
            .with_nodata(-9999.0);
        let valid: Vec<f32> = r.valid_values().collect();
        assert_eq!(valid, vec![1.0, 4.0]);
    }

    #[test]
    fn test_nan_nodata_only_masks_nan() {
        let r = Raster::new(1, 2, vec![0.0, f32::NAN]).unwrap().with_nodata(f64::NAN);
        assert_eq!(r.valid_values().count(), 1);
    }

    #[test]
    fn test_get() {
        let r = Raster::new(2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(r.get(1, 1), Some(4.0));
        assert_eq!(r.get(2, 0), None);
    }

    #[test]
    fn test_multiband_one_based() {
        let mb = MultiBand::new(1, 1, vec![vec![1.0], vec![2.0], vec![3.0]]).unwrap();
        assert_eq!(mb.band(1).unwrap().data, vec![1.0]);
        assert_eq!(mb.band(3).unwrap().data, vec![3.0]);
        assert!(mb.band(0).is_err());
        assert!(mb.band(4).is_err());
    }

    #[test]
    fn test_with_data_keeps_georeferencing() {
        let gt = GeoTransform::from_origin(-48.0, -22.0, 0.01, 0.01);
        let r = Raster::new(2, 1, vec![1.0, 2.0])
            .unwrap()
            .with_transform(gt)
            .with_crs(CrsCode::Epsg4326);
        let r2 = r.with_data(vec![5.0, 6.0]).unwrap();
        assert_eq!(r2.transform, gt);
        assert_eq!(r2.crs, Some(CrsCode::Epsg4326));
        assert!(r.with_data(vec![1.0]).is_err());
    }
}
