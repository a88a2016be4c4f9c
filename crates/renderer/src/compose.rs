//! Side-by-side RGB/NDVI composites with header and footer text.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use bioma_common::names::{date_from_segment, parse_iso_date};
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use rusttype::Font;
use tracing::{debug, info, instrument, warn};

use crate::error::{RenderError, Result};
use crate::png;
use crate::text;

/// Footer text when a file name carries no date.
pub const UNKNOWN_DATE: &str = "Unknown date";

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

#[derive(Debug, Clone)]
pub struct ComposeOptions {
    /// Both inputs are enlarged by this factor before joining.
    pub factor: u32,
    pub header_ratio: f64,
    pub footer_ratio: f64,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            factor: 2,
            header_ratio: 0.1,
            footer_ratio: 0.1,
        }
    }
}

/// Enlarge by an integer factor with Lanczos3 resampling.
pub fn upscale(img: &RgbImage, factor: u32) -> RgbImage {
    if factor <= 1 {
        return img.clone();
    }
    imageops::resize(
        img,
        img.width() * factor,
        img.height() * factor,
        FilterType::Lanczos3,
    )
}

/// Resize to `height`, keeping the aspect ratio (width truncated).
fn to_height(img: &RgbImage, height: u32) -> RgbImage {
    if img.height() == height {
        return img.clone();
    }
    let scale = height as f64 / img.height() as f64;
    let width = ((img.width() as f64 * scale) as u32).max(1);
    imageops::resize(img, width, height, FilterType::Lanczos3)
}

/// Place `left` and `right` next to each other, the shorter one resized to
/// the taller height.
pub fn side_by_side(left: &RgbImage, right: &RgbImage) -> RgbImage {
    let height = left.height().max(right.height());
    let left = to_height(left, height);
    let right = to_height(right, height);

    let mut out = RgbImage::new(left.width() + right.width(), height);
    imageops::replace(&mut out, &left, 0, 0);
    imageops::replace(&mut out, &right, left.width() as i64, 0);
    out
}

/// Add white header and footer bands with centred black text.
///
/// Band heights are the given fractions of the image height; the font size
/// is half the header height.
pub fn with_header_footer(
    img: &RgbImage,
    font: Option<&Font>,
    header: &str,
    footer: &str,
    options: &ComposeOptions,
) -> RgbImage {
    let header_h = (img.height() as f64 * options.header_ratio) as u32;
    let footer_h = (img.height() as f64 * options.footer_ratio) as u32;
    let size = (header_h as f32 * 0.5).max(1.0);

    let mut out = RgbImage::from_pixel(img.width(), header_h + img.height() + footer_h, WHITE);
    imageops::replace(&mut out, img, 0, header_h as i64);

    let center = img.width() as i32 / 2;
    text::draw_centered(&mut out, font, size, BLACK, center, 0, header_h, header);
    text::draw_centered(
        &mut out,
        font,
        size,
        BLACK,
        center,
        (header_h + img.height()) as i32,
        footer_h,
        footer,
    );
    out
}

/// Footer text for a product file name.
pub fn footer_date(file_name: &str) -> String {
    date_from_segment(file_name).unwrap_or_else(|| UNKNOWN_DATE.to_string())
}

/// Output name of the composite for an NDVI PNG.
pub fn combined_name(ndvi_file_name: &str) -> String {
    format!("combined_{}", ndvi_file_name)
}

/// `.png` files in `dir`, sorted by name.
pub fn list_pngs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("png"))
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Match RGB and NDVI PNGs.
///
/// A file with the same name in both directories is a pair. Otherwise the
/// first ISO date in each name is used, so `RGB_2023-05-01.png` pairs with
/// `openEO_2023-05-01Z.png`. Unmatched RGB files are logged and skipped.
pub fn pair_images(rgb_dir: &Path, ndvi_dir: &Path) -> Result<Vec<(PathBuf, PathBuf)>> {
    let ndvi = list_pngs(ndvi_dir)?;
    let by_name: HashMap<_, _> = ndvi
        .iter()
        .filter_map(|p| p.file_name().map(|n| (n.to_os_string(), p.clone())))
        .collect();
    let mut by_date = HashMap::new();
    for path in &ndvi {
        let date = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(parse_iso_date);
        if let Some(date) = date {
            by_date.entry(date).or_insert_with(|| path.clone());
        }
    }

    let mut pairs = Vec::new();
    for rgb in list_pngs(rgb_dir)? {
        let Some(name) = rgb.file_name() else {
            continue;
        };
        let matched = by_name.get(name).cloned().or_else(|| {
            name.to_str()
                .and_then(parse_iso_date)
                .and_then(|d| by_date.get(&d).cloned())
        });
        match matched {
            Some(ndvi) => pairs.push((rgb, ndvi)),
            None => warn!(path = %rgb.display(), "No matching NDVI image"),
        }
    }
    debug!(pairs = pairs.len(), "Paired RGB and NDVI images");
    Ok(pairs)
}

/// Build one composite: both images upscaled, joined, then framed with
/// `title` above and the NDVI file's date below.
#[instrument(skip_all, fields(rgb = %rgb.display(), ndvi = %ndvi.display()))]
pub fn combine_pair(
    rgb: &Path,
    ndvi: &Path,
    out_dir: &Path,
    title: &str,
    font: Option<&Font>,
    options: &ComposeOptions,
) -> Result<PathBuf> {
    let ndvi_name = ndvi
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| RenderError::invalid_input(format!("bad file name {}", ndvi.display())))?;

    let left = upscale(&image::open(rgb)?.to_rgb8(), options.factor);
    let right = upscale(&image::open(ndvi)?.to_rgb8(), options.factor);
    let joined = side_by_side(&left, &right);
    let framed = with_header_footer(&joined, font, title, &footer_date(ndvi_name), options);

    let out = out_dir.join(combined_name(ndvi_name));
    png::save_rgb(&out, &framed, &[("Title", title)])?;
    info!(output = %out.display(), "Saved composite");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upscale() {
        let img = RgbImage::from_pixel(3, 2, Rgb([10, 20, 30]));
        let up = upscale(&img, 2);
        assert_eq!(up.dimensions(), (6, 4));
        assert_eq!(upscale(&img, 1).dimensions(), (3, 2));
    }

    #[test]
    fn test_side_by_side_matches_heights() {
        let a = RgbImage::from_pixel(10, 20, Rgb([255, 0, 0]));
        let b = RgbImage::from_pixel(30, 10, Rgb([0, 0, 255]));
        let out = side_by_side(&a, &b);
        // b is scaled by 2 to 60x20.
        assert_eq!(out.dimensions(), (70, 20));
        assert_eq!(*out.get_pixel(0, 0), Rgb([255, 0, 0]));
        let right = out.get_pixel(69, 19);
        assert!(right[0] < 5 && right[2] > 250);
    }

    #[test]
    fn test_header_footer_bands() {
        let img = RgbImage::from_pixel(40, 100, Rgb([0, 128, 0]));
        let out = with_header_footer(&img, None, "Title", "2023-05-01", &ComposeOptions::default());
        assert_eq!(out.dimensions(), (40, 120));
        assert_eq!(*out.get_pixel(0, 0), WHITE);
        assert_eq!(*out.get_pixel(0, 10), Rgb([0, 128, 0]));
        assert_eq!(*out.get_pixel(0, 119), WHITE);
    }

    #[test]
    fn test_footer_date() {
        assert_eq!(footer_date("openEO_2023-05-01Z.png"), "2023-05-01");
        assert_eq!(footer_date("scene.png"), UNKNOWN_DATE);
        assert_eq!(combined_name("openEO_2023-05-01Z.png"), "combined_openEO_2023-05-01Z.png");
    }
}
