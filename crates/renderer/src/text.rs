//! TrueType text drawing.

use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};
use rusttype::{Font, Scale};
use tracing::{debug, warn};

/// Fonts tried when none is configured.
const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Load the configured font, else the first system font found.
///
/// Returns None (with a warning) when nothing loads; callers then skip text.
pub fn load_font(configured: Option<&Path>) -> Option<Font<'static>> {
    let candidates: Vec<PathBuf> = configured
        .map(Path::to_path_buf)
        .into_iter()
        .chain(SYSTEM_FONTS.iter().map(PathBuf::from))
        .collect();

    for path in &candidates {
        let Ok(bytes) = std::fs::read(path) else {
            continue;
        };
        match Font::try_from_vec(bytes) {
            Some(font) => {
                debug!(path = %path.display(), "Loaded font");
                return Some(font);
            }
            None => warn!(path = %path.display(), "Not a usable TrueType font"),
        }
    }
    warn!("No TrueType font found, text will not be drawn");
    None
}

/// Width and height of `text` in pixels, (0, 0) without a font.
pub fn measure(font: Option<&Font>, size: f32, text: &str) -> (u32, u32) {
    match font {
        Some(font) => {
            let (w, h) = text_size(Scale::uniform(size), font, text);
            (w.max(0) as u32, h.max(0) as u32)
        }
        None => (0, 0),
    }
}

/// Draw `text` with its top-left corner at (x, y).
pub fn draw(img: &mut RgbImage, font: Option<&Font>, size: f32, color: Rgb<u8>, x: i32, y: i32, text: &str) {
    if let Some(font) = font {
        draw_text_mut(img, color, x, y, Scale::uniform(size), font, text);
    }
}

/// Draw `text` centred horizontally on `center_x` and vertically in
/// the band `[top, top + band_height)`.
#[allow(clippy::too_many_arguments)]
pub fn draw_centered(
    img: &mut RgbImage,
    font: Option<&Font>,
    size: f32,
    color: Rgb<u8>,
    center_x: i32,
    top: i32,
    band_height: u32,
    text: &str,
) {
    let (w, h) = measure(font, size, text);
    let x = center_x - w as i32 / 2;
    let y = top + (band_height as i32 - h as i32) / 2;
    draw(img, font, size, color, x, y, text);
}

/// Text rotated 90 degrees counter-clockwise on a `background` tile, for
/// vertical axis titles.
pub fn rotated_label(font: Option<&Font>, size: f32, color: Rgb<u8>, background: Rgb<u8>, text: &str) -> Option<RgbImage> {
    let (w, h) = measure(font, size, text);
    if w == 0 || h == 0 {
        return None;
    }
    let mut tile = RgbImage::from_pixel(w + 2, h + 2, background);
    draw(&mut tile, font, size, color, 1, 1, text);
    Some(image::imageops::rotate270(&tile))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_configured_font_falls_back_or_none() {
        // Either a system font loads or None is returned; neither panics.
        let _ = load_font(Some(Path::new("/nonexistent/font.ttf")));
    }

    #[test]
    fn test_no_font_draws_nothing() {
        let mut img = RgbImage::from_pixel(10, 10, Rgb([255, 255, 255]));
        draw_centered(&mut img, None, 12.0, Rgb([0, 0, 0]), 5, 0, 10, "NDVI");
        assert!(img.pixels().all(|p| *p == Rgb([255, 255, 255])));
        assert_eq!(measure(None, 12.0, "NDVI"), (0, 0));
        assert!(rotated_label(None, 12.0, Rgb([0, 0, 0]), Rgb([255, 255, 255]), "x").is_none());
    }
}
