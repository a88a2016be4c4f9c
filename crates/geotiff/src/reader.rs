//! GeoTIFF decoding.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use bioma_common::time::parse_tiff_datetime;
use chrono::NaiveDateTime;
use raster::{MultiBand, Raster};
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;
use tracing::{debug, instrument, warn};

use crate::error::{GeoTiffError, Result};
use crate::geokeys::{transform_from_tags, GeoKeys};
use crate::tags;

fn open(path: &Path) -> Result<Decoder<BufReader<File>>> {
    let file = File::open(path)?;
    let decoder = Decoder::new(BufReader::new(file))?.with_limits(Limits::unlimited());
    Ok(decoder)
}

fn find_f64_vec(decoder: &mut Decoder<BufReader<File>>, code: u16) -> Result<Option<Vec<f64>>> {
    match decoder.find_tag(Tag::from_u16_exhaustive(code))? {
        Some(value) => Ok(Some(value.into_f64_vec()?)),
        None => Ok(None),
    }
}

fn find_string(decoder: &mut Decoder<BufReader<File>>, code: u16) -> Result<Option<String>> {
    match decoder.find_tag(Tag::from_u16_exhaustive(code))? {
        Some(value) => Ok(Some(value.into_string()?)),
        None => Ok(None),
    }
}

/// Read every band of the first image, with its georeferencing.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn read(path: &Path) -> Result<MultiBand> {
    let mut decoder = open(path)?;
    let (width, height) = decoder.dimensions()?;
    let (width, height) = (width as usize, height as usize);
    if width == 0 || height == 0 {
        return Err(GeoTiffError::Empty(path.to_path_buf()));
    }

    let geokeys = match decoder
        .find_tag_unsigned_vec::<u16>(Tag::from_u16_exhaustive(tags::GEO_KEY_DIRECTORY))?
    {
        Some(dir) => GeoKeys::parse(&dir)?,
        None => GeoKeys::default(),
    };
    let transformation = find_f64_vec(&mut decoder, tags::MODEL_TRANSFORMATION)?;
    let tiepoint = find_f64_vec(&mut decoder, tags::MODEL_TIEPOINT)?;
    let scale = find_f64_vec(&mut decoder, tags::MODEL_PIXEL_SCALE)?;
    let transform = transform_from_tags(
        transformation.as_deref(),
        tiepoint.as_deref(),
        scale.as_deref(),
        geokeys.pixel_is_point(),
    )?;

    let nodata = match find_string(&mut decoder, tags::GDAL_NODATA)? {
        Some(s) => match s.trim_end_matches('\0').trim().parse::<f64>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(value = %s, "Ignoring unparsable GDAL_NODATA tag");
                None
            }
        },
        None => None,
    };

    let timestamp = match datetime_from(&mut decoder) {
        Ok(ts) => ts,
        Err(GeoTiffError::InvalidTag { message, .. }) => {
            warn!(error = %message, "Ignoring unparsable DateTime tag");
            None
        }
        Err(e) => return Err(e),
    };

    let samples = decode_samples(decoder.read_image()?)?;
    let pixels = width * height;
    if samples.len() % pixels != 0 {
        return Err(GeoTiffError::Layout(format!(
            "{} samples for {}x{} pixels",
            samples.len(),
            width,
            height
        )));
    }
    let band_count = samples.len() / pixels;
    let bands = deinterleave(&samples, band_count);

    debug!(
        width = width,
        height = height,
        bands = band_count,
        crs = ?geokeys.crs(),
        "Read GeoTIFF"
    );

    let mut image = MultiBand::new(width, height, bands)?;
    if let Some(gt) = transform {
        image.transform = gt;
    } else {
        warn!("GeoTIFF has no georeferencing tags; using pixel coordinates");
    }
    image.crs = geokeys.crs();
    image.nodata = nodata;
    image.timestamp = timestamp;
    Ok(image)
}

/// Read a single band by 1-based index.
pub fn read_band(path: &Path, index: usize) -> Result<Raster> {
    Ok(read(path)?.band(index)?)
}

/// Only the TIFF DateTime tag, without decoding pixels.
pub fn read_datetime(path: &Path) -> Result<Option<NaiveDateTime>> {
    let mut decoder = open(path)?;
    datetime_from(&mut decoder)
}

fn datetime_from(decoder: &mut Decoder<BufReader<File>>) -> Result<Option<NaiveDateTime>> {
    let Some(text) = find_string(decoder, tags::DATE_TIME)? else {
        return Ok(None);
    };
    match parse_tiff_datetime(&text) {
        Ok(dt) => Ok(Some(dt)),
        Err(e) => Err(GeoTiffError::invalid_tag("DateTime", e.to_string())),
    }
}

fn decode_samples(result: DecodingResult) -> Result<Vec<f32>> {
    let samples = match result {
        DecodingResult::U8(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::U16(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::U32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I8(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I16(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::F32(v) => v,
        DecodingResult::F64(v) => v.into_iter().map(|x| x as f32).collect(),
        #[allow(unreachable_patterns)]
        _ => {
            return Err(GeoTiffError::Layout(
                "unsupported sample format".to_string(),
            ))
        }
    };
    Ok(samples)
}

/// Split chunky (pixel-interleaved) samples into one Vec per band.
fn deinterleave(samples: &[f32], band_count: usize) -> Vec<Vec<f32>> {
    if band_count == 1 {
        return vec![samples.to_vec()];
    }
    let pixels = samples.len() / band_count;
    let mut bands = vec![Vec::with_capacity(pixels); band_count];
    for pixel in samples.chunks_exact(band_count) {
        for (band, &v) in bands.iter_mut().zip(pixel) {
            band.push(v);
        }
    }
    bands
}
