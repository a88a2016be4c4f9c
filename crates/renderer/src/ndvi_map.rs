//! NDVI map figure: colored raster, lon/lat ticks and a colorbar.

use std::path::Path;

use bioma_common::CrsCode;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use projection::Transformer;
use raster::{resample, stats, BandStats, InterpolationMethod, Raster};
use rusttype::Font;
use tracing::{info, instrument, warn};

use crate::colormap::Colormap;
use crate::error::{RenderError, Result};
use crate::png;
use crate::text;

/// NDVI domain mapped onto the colormap.
pub const NDVI_RANGE: (f64, f64) = (-1.0, 1.0);

/// Ticks per axis, evenly spaced from the first to the last pixel edge.
pub const TICK_COUNT: usize = 5;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

#[derive(Debug, Clone)]
pub struct NdviMapOptions {
    /// The longest side of the map area is enlarged to at least this many
    /// pixels, by an integer factor.
    pub min_size: u32,
    pub font_size: f32,
    pub colormap: Colormap,
    pub colorbar_label: String,
}

impl Default for NdviMapOptions {
    fn default() -> Self {
        Self {
            min_size: 800,
            font_size: 16.0,
            colormap: Colormap::rd_yl_gn(),
            colorbar_label: "NDVI".to_string(),
        }
    }
}

/// Integer nearest-neighbour enlargement so the longest side reaches `min_size`.
pub fn upscale_factor(width: usize, height: usize, min_size: u32) -> u32 {
    let longest = width.max(height).max(1) as u32;
    min_size.div_ceil(longest).max(1)
}

/// Evenly spaced tick positions from 0 to `extent`, inclusive.
pub fn tick_positions(extent: usize) -> Vec<f64> {
    let step = extent as f64 / (TICK_COUNT - 1) as f64;
    (0..TICK_COUNT).map(|i| i as f64 * step).collect()
}

/// Lon/lat tick labels.
///
/// Tick `i` on the x axis is the pixel column `x_i` on row 0, tick `i` on
/// the y axis the pixel row `y_i` on column 0; the two map coordinates are
/// transformed to lon/lat together.
pub fn tick_labels(raster: &Raster, transformer: &Transformer) -> (Vec<String>, Vec<String>) {
    let xs = tick_positions(raster.width);
    let ys = tick_positions(raster.height);
    xs.iter()
        .zip(&ys)
        .map(|(&col, &row)| {
            let (mx, _) = raster.transform.apply(col, 0.0);
            let (_, my) = raster.transform.apply(0.0, row);
            let (lon, lat) = transformer.transform(mx, my);
            (format!("{:.4}", lon), format!("{:.4}", lat))
        })
        .unzip()
}

/// Color for one NDVI sample, or None when it is masked.
fn ndvi_color(raster: &Raster, value: f32, colormap: &Colormap) -> Option<Rgb<u8>> {
    let (lo, hi) = NDVI_RANGE;
    let v = value as f64;
    if !raster.is_valid(value) || v < lo || v > hi {
        return None;
    }
    Some(colormap.sample((v - lo) / (hi - lo)))
}

/// Render the NDVI figure.
///
/// Samples outside [-1, 1], NaN and nodata are left white.
pub fn render(
    raster: &Raster,
    transformer: &Transformer,
    font: Option<&Font>,
    options: &NdviMapOptions,
) -> Result<RgbImage> {
    if raster.is_empty() {
        return Err(RenderError::invalid_input("empty raster"));
    }

    let factor = upscale_factor(raster.width, raster.height, options.min_size);
    let map_w = raster.width as u32 * factor;
    let map_h = raster.height as u32 * factor;
    let fs = options.font_size;

    let (x_labels, y_labels) = tick_labels(raster, transformer);
    let y_label_w = y_labels
        .iter()
        .map(|l| text::measure(font, fs, l).0)
        .max()
        .unwrap_or(0);
    let (_, line_h) = text::measure(font, fs, "0");

    let tick_len = 6;
    let pad = 12;
    let left = pad + line_h + pad + y_label_w + tick_len + 4;
    let top = pad + line_h / 2;
    let bottom = tick_len + 4 + line_h + pad + line_h + pad;
    let bar_gap = 30;
    let bar_w = (map_w / 20).clamp(12, 40);
    let bar_label_w = text::measure(font, fs, "-0.5").0;
    let right = bar_gap + bar_w + tick_len + 4 + bar_label_w + pad + line_h + pad;

    let width = left + map_w + right;
    let height = top + map_h + bottom;
    let mut img = RgbImage::from_pixel(width, height, WHITE);

    // Map area
    let enlarged = resample(
        raster,
        map_w as usize,
        map_h as usize,
        InterpolationMethod::Nearest,
    )?;
    for (i, &value) in enlarged.data.iter().enumerate() {
        let Some(color) = ndvi_color(&enlarged, value, &options.colormap) else {
            continue;
        };
        let col = (i % enlarged.width) as u32;
        let row = (i / enlarged.width) as u32;
        img.put_pixel(left + col, top + row, color);
    }
    draw_hollow_rect_mut(
        &mut img,
        Rect::at(left as i32 - 1, top as i32 - 1).of_size(map_w + 2, map_h + 2),
        BLACK,
    );

    // X ticks and labels
    let axis_y = (top + map_h) as f32;
    for (pos, label) in tick_positions(raster.width).iter().zip(&x_labels) {
        let x = left as f32 + (*pos as f32 * factor as f32).min(map_w as f32 - 1.0);
        draw_line_segment_mut(&mut img, (x, axis_y), (x, axis_y + tick_len as f32), BLACK);
        text::draw_centered(
            &mut img,
            font,
            fs,
            BLACK,
            x as i32,
            (top + map_h + tick_len + 4) as i32,
            line_h,
            label,
        );
    }
    text::draw_centered(
        &mut img,
        font,
        fs,
        BLACK,
        (left + map_w / 2) as i32,
        (top + map_h + tick_len + 4 + line_h + pad) as i32,
        line_h,
        "Longitude (degrees)",
    );

    // Y ticks and labels
    let axis_x = left as f32 - 1.0;
    for (pos, label) in tick_positions(raster.height).iter().zip(&y_labels) {
        let y = top as f32 + (*pos as f32 * factor as f32).min(map_h as f32 - 1.0);
        draw_line_segment_mut(&mut img, (axis_x - tick_len as f32, y), (axis_x, y), BLACK);
        let (w, h) = text::measure(font, fs, label);
        text::draw(
            &mut img,
            font,
            fs,
            BLACK,
            (left - tick_len - 4 - w) as i32,
            y as i32 - h as i32 / 2,
            label,
        );
    }
    if let Some(label) = text::rotated_label(font, fs, BLACK, WHITE, "Latitude (degrees)") {
        let y = (top + map_h / 2).saturating_sub(label.height() / 2);
        image::imageops::replace(&mut img, &label, pad as i64, y as i64);
    }

    // Colorbar: top is NDVI 1, bottom is NDVI -1.
    let bar_x = left + map_w + bar_gap;
    for dy in 0..map_h {
        let t = 1.0 - dy as f64 / (map_h.max(2) - 1) as f64;
        let rect = Rect::at(bar_x as i32, (top + dy) as i32).of_size(bar_w, 1);
        draw_filled_rect_mut(&mut img, rect, options.colormap.sample(t));
    }
    draw_hollow_rect_mut(
        &mut img,
        Rect::at(bar_x as i32, top as i32).of_size(bar_w, map_h),
        BLACK,
    );
    let (lo, hi) = NDVI_RANGE;
    for i in 0..TICK_COUNT {
        let frac = i as f64 / (TICK_COUNT - 1) as f64;
        let value = hi - frac * (hi - lo);
        let y = top as f32 + (frac as f32 * map_h as f32).min(map_h as f32 - 1.0);
        let x0 = (bar_x + bar_w) as f32;
        draw_line_segment_mut(&mut img, (x0, y), (x0 + tick_len as f32, y), BLACK);
        let label = format!("{:.1}", value);
        let (_, h) = text::measure(font, fs, &label);
        text::draw(
            &mut img,
            font,
            fs,
            BLACK,
            (bar_x + bar_w + tick_len + 4) as i32,
            y as i32 - h as i32 / 2,
            &label,
        );
    }
    if let Some(label) =
        text::rotated_label(font, fs, BLACK, WHITE, &options.colorbar_label)
    {
        let x = bar_x + bar_w + tick_len + 4 + bar_label_w + pad;
        let y = (top + map_h / 2).saturating_sub(label.height() / 2);
        image::imageops::replace(&mut img, &label, x as i64, y as i64);
    }

    Ok(img)
}

/// Render an NDVI GeoTIFF (band 1) to a PNG, replacing any existing output.
///
/// Fails on an empty raster or one without valid samples; a constant
/// raster only logs a warning. Returns the band statistics.
#[instrument(skip_all, fields(path = %tif.display()))]
pub fn convert_file(
    tif: &Path,
    png_path: &Path,
    font: Option<&Font>,
    options: &NdviMapOptions,
) -> Result<BandStats> {
    let raster = geotiff::read_band(tif, 1)?;
    if raster.is_empty() {
        return Err(RenderError::invalid_input(format!(
            "{} is empty",
            tif.display()
        )));
    }
    let Some(band_stats) = stats(&raster) else {
        return Err(RenderError::invalid_input(format!(
            "{} has no valid NDVI values",
            tif.display()
        )));
    };
    info!(min = band_stats.min, max = band_stats.max, "NDVI range");
    if band_stats.is_constant() {
        warn!(value = band_stats.min, "NDVI is constant, the image will have no contrast");
    }

    let src_crs = raster.crs.unwrap_or_else(|| {
        warn!("GeoTIFF has no CRS, assuming EPSG:4326 for tick labels");
        CrsCode::Epsg4326
    });
    let transformer = Transformer::from_crs(src_crs, CrsCode::Epsg4326);
    let img = render(&raster, &transformer, font, options)?;

    if png_path.exists() {
        std::fs::remove_file(png_path)?;
        info!(path = %png_path.display(), "Removed existing file");
    }
    let source = tif
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    png::save_rgb(png_path, &img, &[("Source", &source)])?;
    info!(output = %png_path.display(), "Saved NDVI map");
    Ok(band_stats)
}
