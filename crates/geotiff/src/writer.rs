//! GeoTIFF encoding.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use bioma_common::time::format_tiff_datetime;
use bioma_common::{CrsCode, GeoTransform};
use chrono::NaiveDateTime;
use raster::{MultiBand, Raster};
use tiff::encoder::{colortype, ImageEncoder, TiffEncoder, TiffKind};
use tiff::tags::Tag;
use tracing::{debug, instrument};

use crate::error::{GeoTiffError, Result};
use crate::geokeys::GeoKeys;
use crate::tags;

/// Georeferencing written next to the pixels.
struct GeoTags {
    transform: GeoTransform,
    crs: Option<CrsCode>,
    nodata: Option<f64>,
    timestamp: Option<NaiveDateTime>,
}

impl GeoTags {
    fn write<W, C, K>(&self, image: &mut ImageEncoder<'_, W, C, K>) -> Result<()>
    where
        W: std::io::Write + std::io::Seek,
        C: colortype::ColorType,
        K: TiffKind,
    {
        let gt = self.transform;
        let enc = image.encoder();
        if gt.is_north_up() {
            let scale = [gt.a, -gt.e, 0.0];
            let tiepoint = [0.0, 0.0, 0.0, gt.c, gt.f, 0.0];
            enc.write_tag(Tag::from_u16_exhaustive(tags::MODEL_PIXEL_SCALE), &scale[..])?;
            enc.write_tag(Tag::from_u16_exhaustive(tags::MODEL_TIEPOINT), &tiepoint[..])?;
        } else {
            let matrix = [
                gt.a, gt.b, 0.0, gt.c, //
                gt.d, gt.e, 0.0, gt.f, //
                0.0, 0.0, 0.0, 0.0, //
                0.0, 0.0, 0.0, 1.0,
            ];
            enc.write_tag(Tag::from_u16_exhaustive(tags::MODEL_TRANSFORMATION), &matrix[..])?;
        }

        let geokeys = GeoKeys::for_crs(self.crs);
        enc.write_tag(Tag::from_u16_exhaustive(tags::GEO_KEY_DIRECTORY), &geokeys[..])?;

        if let Some(nodata) = self.nodata {
            enc.write_tag(
                Tag::from_u16_exhaustive(tags::GDAL_NODATA),
                format_nodata(nodata).as_str(),
            )?;
        }
        if let Some(ts) = &self.timestamp {
            enc.write_tag(
                Tag::from_u16_exhaustive(tags::DATE_TIME),
                format_tiff_datetime(ts).as_str(),
            )?;
        }
        Ok(())
    }
}

/// GDAL writes NaN nodata as "nan".
fn format_nodata(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else {
        value.to_string()
    }
}

fn create(path: &Path) -> Result<TiffEncoder<BufWriter<File>>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(TiffEncoder::new(BufWriter::new(File::create(path)?))?)
}

/// Write a single-band float32 GeoTIFF.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn write_f32(path: &Path, raster: &Raster) -> Result<()> {
    if raster.is_empty() {
        return Err(GeoTiffError::Empty(path.to_path_buf()));
    }
    let mut encoder = create(path)?;
    let mut image =
        encoder.new_image::<colortype::Gray32Float>(raster.width as u32, raster.height as u32)?;
    GeoTags {
        transform: raster.transform,
        crs: raster.crs,
        nodata: raster.nodata,
        timestamp: raster.timestamp,
    }
    .write(&mut image)?;
    image.write_data(&raster.data)?;

    debug!(width = raster.width, height = raster.height, "Wrote GeoTIFF");
    Ok(())
}

/// Write the first three bands as an interleaved RGB float32 GeoTIFF.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn write_rgb_f32(path: &Path, image: &MultiBand) -> Result<()> {
    if image.band_count() < 3 {
        return Err(GeoTiffError::Layout(format!(
            "RGB output needs 3 bands, got {}",
            image.band_count()
        )));
    }
    let pixels = image.width * image.height;
    if pixels == 0 {
        return Err(GeoTiffError::Empty(path.to_path_buf()));
    }

    let mut interleaved = Vec::with_capacity(pixels * 3);
    for i in 0..pixels {
        interleaved.push(image.bands[0][i]);
        interleaved.push(image.bands[1][i]);
        interleaved.push(image.bands[2][i]);
    }

    let mut encoder = create(path)?;
    let mut tiff =
        encoder.new_image::<colortype::RGB32Float>(image.width as u32, image.height as u32)?;
    GeoTags {
        transform: image.transform,
        crs: image.crs,
        nodata: image.nodata,
        timestamp: image.timestamp,
    }
    .write(&mut tiff)?;
    tiff.write_data(&interleaved)?;

    debug!(width = image.width, height = image.height, "Wrote RGB GeoTIFF");
    Ok(())
}
