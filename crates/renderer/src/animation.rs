//! Animated GIF of composites with fade transitions.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use bioma_common::find_iso_date;
use image::codecs::gif::{GifEncoder, Repeat};
use image::imageops::{self, FilterType};
use image::{Delay, DynamicImage, Frame, Rgb, RgbImage, RgbaImage};
use rusttype::Font;
use tracing::{debug, info, instrument};

use crate::compose::{list_pngs, UNKNOWN_DATE};
use crate::error::{RenderError, Result};
use crate::text;

/// Name of the animation written into the output directory.
pub const GIF_NAME: &str = "biomass_analysis.gif";

/// Prefix stripped from composite names before looking for a date.
const COMPOSITE_PREFIX: &str = "combined_openEO_";

/// NeuQuant sampling factor (1 best, 30 fastest).
const QUANTIZE_SPEED: i32 = 10;

const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

#[derive(Debug, Clone)]
pub struct AnimationOptions {
    pub max_width: u32,
    pub max_height: u32,
    pub header_height: u32,
    pub footer_height: u32,
    pub title_size: f32,
    pub date_size: f32,
    /// Blends between consecutive images; `steps + 1` frames are emitted.
    pub fade_steps: u32,
    pub frame_delay_ms: u32,
    pub fade_delay_ms: u32,
}

impl Default for AnimationOptions {
    fn default() -> Self {
        Self {
            max_width: 800,
            max_height: 800,
            header_height: 50,
            footer_height: 50,
            title_size: 24.0,
            date_size: 20.0,
            fade_steps: 20,
            frame_delay_ms: 2000,
            fade_delay_ms: 100,
        }
    }
}

/// One GIF frame and how long it stays on screen.
#[derive(Debug, Clone)]
pub struct GifFrame {
    pub image: RgbaImage,
    pub delay_ms: u32,
}

/// Shrink to fit in `max_width` x `max_height`, keeping the aspect ratio.
/// Smaller images are returned unchanged.
pub fn fit_within(img: &RgbImage, max_width: u32, max_height: u32) -> RgbImage {
    let (w, h) = img.dimensions();
    if w <= max_width && h <= max_height {
        return img.clone();
    }
    let scale = (max_width as f64 / w as f64).min(max_height as f64 / h as f64);
    let new_w = ((w as f64 * scale).round() as u32).clamp(1, max_width);
    let new_h = ((h as f64 * scale).round() as u32).clamp(1, max_height);
    imageops::resize(img, new_w, new_h, FilterType::Lanczos3)
}

/// Date shown under a composite, from its file name.
pub fn date_label(file_name: &str) -> String {
    find_iso_date(&file_name.replace(COMPOSITE_PREFIX, ""))
        .unwrap_or_else(|| UNKNOWN_DATE.to_string())
}

/// Put `img` between black header and footer bands with white text.
pub fn frame_with_banner(
    img: &RgbImage,
    font: Option<&Font>,
    title: &str,
    date: &str,
    options: &AnimationOptions,
) -> RgbImage {
    let (header, footer) = (options.header_height, options.footer_height);
    let mut out = RgbImage::from_pixel(img.width(), img.height() + header + footer, BLACK);
    imageops::replace(&mut out, img, 0, header as i64);

    let center = img.width() as i32 / 2;
    text::draw_centered(&mut out, font, options.title_size, WHITE, center, 0, header, title);
    text::draw_centered(
        &mut out,
        font,
        options.date_size,
        WHITE,
        center,
        (header + img.height()) as i32,
        footer,
        date,
    );
    out
}

/// `steps + 1` blends from `from` to `to` with alpha `i / steps`.
///
/// `to` is resized to the size of `from` when they differ.
pub fn fade(from: &RgbImage, to: &RgbImage, steps: u32) -> Vec<RgbImage> {
    let resized;
    let to = if to.dimensions() == from.dimensions() {
        to
    } else {
        resized = imageops::resize(to, from.width(), from.height(), FilterType::Lanczos3);
        &resized
    };
    let steps = steps.max(1);

    (0..=steps)
        .map(|i| {
            let alpha = i as f32 / steps as f32;
            let mut out = from.clone();
            for (dst, src) in out.pixels_mut().zip(to.pixels()) {
                for c in 0..3 {
                    let a = dst[c] as f32;
                    let b = src[c] as f32;
                    dst[c] = (a * (1.0 - alpha) + b * alpha).round() as u8;
                }
            }
            out
        })
        .collect()
}

/// Streams frames into a looping GIF file.
pub struct GifWriter {
    encoder: GifEncoder<BufWriter<File>>,
    frames: usize,
}

impl GifWriter {
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = BufWriter::new(File::create(path)?);
        let mut encoder = GifEncoder::new_with_speed(file, QUANTIZE_SPEED);
        encoder.set_repeat(Repeat::Infinite)?;
        Ok(Self { encoder, frames: 0 })
    }

    pub fn push(&mut self, image: RgbaImage, delay_ms: u32) -> Result<()> {
        let delay = Delay::from_numer_denom_ms(delay_ms, 1);
        self.encoder.encode_frame(Frame::from_parts(image, 0, 0, delay))?;
        self.frames += 1;
        Ok(())
    }

    pub fn frame_count(&self) -> usize {
        self.frames
    }
}

/// Write prepared frames to a looping GIF.
pub fn write_gif(frames: Vec<GifFrame>, path: &Path) -> Result<()> {
    let mut writer = GifWriter::create(path)?;
    for frame in frames {
        writer.push(frame.image, frame.delay_ms)?;
    }
    Ok(())
}

fn to_rgba(img: RgbImage) -> RgbaImage {
    DynamicImage::ImageRgb8(img).to_rgba8()
}

/// Animate every PNG in `input_dir` (sorted by name) into
/// `output_dir/biomass_analysis.gif`.
///
/// Each image is fitted, framed with `title` and its date, and preceded by
/// a fade from the previous one. Frames take the size of the first one.
/// Returns the path and the number of frames written.
#[instrument(skip_all, fields(input = %input_dir.display()))]
pub fn animate_directory(
    input_dir: &Path,
    output_dir: &Path,
    title: &str,
    font: Option<&Font>,
    options: &AnimationOptions,
) -> Result<(PathBuf, usize)> {
    let images = list_pngs(input_dir)?;
    if images.is_empty() {
        return Err(RenderError::invalid_input(format!(
            "no PNG images in {}",
            input_dir.display()
        )));
    }

    let out = output_dir.join(GIF_NAME);
    let mut writer = GifWriter::create(&out)?;
    let mut previous: Option<RgbImage> = None;

    for path in &images {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let fitted = fit_within(&image::open(path)?.to_rgb8(), options.max_width, options.max_height);
        let mut frame = frame_with_banner(&fitted, font, title, &date_label(&name), options);
        if let Some(prev) = &previous {
            if frame.dimensions() != prev.dimensions() {
                frame = imageops::resize(&frame, prev.width(), prev.height(), FilterType::Lanczos3);
            }
            for blend in fade(prev, &frame, options.fade_steps) {
                writer.push(to_rgba(blend), options.fade_delay_ms)?;
            }
        }
        writer.push(to_rgba(frame.clone()), options.frame_delay_ms)?;
        debug!(path = %path.display(), "Added frame");
        previous = Some(frame);
    }

    let frames = writer.frame_count();
    drop(writer);
    info!(output = %out.display(), images = images.len(), frames, "Saved animation");
    Ok((out, frames))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_within_shrinks_only() {
        let big = RgbImage::new(1600, 800);
        assert_eq!(fit_within(&big, 800, 800).dimensions(), (800, 400));
        let small = RgbImage::new(300, 200);
        assert_eq!(fit_within(&small, 800, 800).dimensions(), (300, 200));
    }

    #[test]
    fn test_fade_endpoints() {
        let a = RgbImage::from_pixel(2, 2, Rgb([0, 0, 0]));
        let b = RgbImage::from_pixel(2, 2, Rgb([200, 100, 50]));
        let frames = fade(&a, &b, 20);
        assert_eq!(frames.len(), 21);
        assert_eq!(*frames[0].get_pixel(0, 0), Rgb([0, 0, 0]));
        assert_eq!(*frames[10].get_pixel(1, 1), Rgb([100, 50, 25]));
        assert_eq!(*frames[20].get_pixel(0, 1), Rgb([200, 100, 50]));
    }

    #[test]
    fn test_banner_layout() {
        let img = RgbImage::from_pixel(100, 60, Rgb([0, 200, 0]));
        let out = frame_with_banner(&img, None, "Biomass", "2023-05-01", &AnimationOptions::default());
        assert_eq!(out.dimensions(), (100, 160));
        assert_eq!(*out.get_pixel(0, 0), BLACK);
        assert_eq!(*out.get_pixel(0, 50), Rgb([0, 200, 0]));
        assert_eq!(*out.get_pixel(99, 159), BLACK);
    }

    #[test]
    fn test_date_label() {
        assert_eq!(date_label("combined_openEO_2023-05-01Z.png"), "2023-05-01");
        assert_eq!(date_label("combined_RGB_2024-01-31.png"), "2024-01-31");
        assert_eq!(date_label("frame.png"), UNKNOWN_DATE);
    }
}
