//! Time-series line chart.

use chrono::{Datelike, NaiveDate};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use rusttype::Font;

use crate::error::{RenderError, Result};
use crate::text;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const GRID: Rgb<u8> = Rgb([200, 200, 200]);
/// Sky blue at half opacity over white.
const RAW: Rgb<u8> = Rgb([195, 231, 245]);
const SMOOTHED: Rgb<u8> = Rgb([255, 165, 0]);
const PEAK: Rgb<u8> = Rgb([255, 0, 0]);
const GROWTH_OR_CUT: Rgb<u8> = Rgb([128, 0, 128]);

const SOLID: &[f32] = &[];
const DASHED: &[f32] = &[8.0, 5.0];
const DASH_DOT: &[f32] = &[8.0, 4.0, 2.0, 4.0];
const GRID_DASH: &[f32] = &[4.0, 4.0];

const X_TICKS: usize = 6;
const Y_TICKS: usize = 6;

/// One sample of the plotted series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub raw: f64,
    pub smoothed: Option<f64>,
}

/// A vertical event marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Peak(NaiveDate),
    GrowthOrCut(NaiveDate),
}

impl Marker {
    pub fn date(&self) -> NaiveDate {
        match self {
            Marker::Peak(d) | Marker::GrowthOrCut(d) => *d,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChartOptions {
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub font_size: f32,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            width: 1400,
            height: 700,
            title: "Biomass Time Series".to_string(),
            x_label: "Date".to_string(),
            y_label: "Biomass".to_string(),
            font_size: 16.0,
        }
    }
}

/// Plot area in pixels and the data ranges it maps.
struct Frame {
    left: f32,
    top: f32,
    width: f32,
    height: f32,
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
}

impl Frame {
    fn x(&self, date: NaiveDate) -> f32 {
        let days = date.num_days_from_ce() as f64;
        self.left + ((days - self.x_min) / (self.x_max - self.x_min)) as f32 * self.width
    }

    fn y(&self, value: f64) -> f32 {
        self.top + self.height - ((value - self.y_min) / (self.y_max - self.y_min)) as f32 * self.height
    }

    fn bottom(&self) -> f32 {
        self.top + self.height
    }

    fn right(&self) -> f32 {
        self.left + self.width
    }
}

/// Draw a line with an on/off dash pattern (in pixels).
pub fn draw_patterned_line(
    img: &mut RgbImage,
    start: (f32, f32),
    end: (f32, f32),
    color: Rgb<u8>,
    pattern: &[f32],
) {
    let (dx, dy) = (end.0 - start.0, end.1 - start.1);
    let length = (dx * dx + dy * dy).sqrt();
    if length == 0.0 || pattern.is_empty() {
        draw_line_segment_mut(img, start, end, color);
        return;
    }
    let (ux, uy) = (dx / length, dy / length);
    let mut pos = 0.0;
    let mut i = 0;
    while pos < length {
        let seg = pattern[i % pattern.len()].max(1.0);
        let stop = (pos + seg).min(length);
        if i % 2 == 0 {
            draw_line_segment_mut(
                img,
                (start.0 + ux * pos, start.1 + uy * pos),
                (start.0 + ux * stop, start.1 + uy * stop),
                color,
            );
        }
        pos = stop;
        i += 1;
    }
}

/// Polyline, optionally two pixels wide.
fn draw_polyline(img: &mut RgbImage, points: &[(f32, f32)], color: Rgb<u8>, thick: bool) {
    for pair in points.windows(2) {
        draw_line_segment_mut(img, pair[0], pair[1], color);
        if thick {
            draw_line_segment_mut(img, (pair[0].0, pair[0].1 + 1.0), (pair[1].0, pair[1].1 + 1.0), color);
        }
    }
}

fn value_range(points: &[SeriesPoint]) -> (f64, f64) {
    let values = points
        .iter()
        .flat_map(|p| std::iter::once(p.raw).chain(p.smoothed))
        .filter(|v| v.is_finite());
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !lo.is_finite() {
        return (0.0, 1.0);
    }
    let pad = if hi > lo { (hi - lo) * 0.05 } else { 0.05 };
    (lo - pad, hi + pad)
}

/// Render the raw and smoothed series with event markers.
pub fn render_time_series(
    points: &[SeriesPoint],
    markers: &[Marker],
    font: Option<&Font>,
    options: &ChartOptions,
) -> Result<RgbImage> {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return Err(RenderError::invalid_input("no samples to plot"));
    };

    let fs = options.font_size;
    let (_, line_h) = text::measure(font, fs, "0");
    let (left, right, top, bottom) = (90u32, 30u32, 30 + line_h * 2, 40 + line_h * 3);
    if options.width <= left + right + 10 || options.height <= top + bottom + 10 {
        return Err(RenderError::invalid_input("chart size too small"));
    }

    let mut x_min = first.date.num_days_from_ce() as f64;
    let mut x_max = last.date.num_days_from_ce() as f64;
    if x_max <= x_min {
        x_min -= 1.0;
        x_max += 1.0;
    }
    let (y_min, y_max) = value_range(points);
    let frame = Frame {
        left: left as f32,
        top: top as f32,
        width: (options.width - left - right) as f32,
        height: (options.height - top - bottom) as f32,
        x_min,
        x_max,
        y_min,
        y_max,
    };

    let mut img = RgbImage::from_pixel(options.width, options.height, WHITE);

    // Grid and tick labels
    for i in 0..X_TICKS {
        let days = x_min + (x_max - x_min) * i as f64 / (X_TICKS - 1) as f64;
        let x = frame.left + frame.width * i as f32 / (X_TICKS - 1) as f32;
        draw_patterned_line(&mut img, (x, frame.top), (x, frame.bottom()), GRID, GRID_DASH);
        if let Some(date) = NaiveDate::from_num_days_from_ce_opt(days.round() as i32) {
            text::draw_centered(
                &mut img,
                font,
                fs,
                BLACK,
                x as i32,
                frame.bottom() as i32 + 6,
                line_h,
                &date.format("%Y-%m-%d").to_string(),
            );
        }
    }
    for i in 0..Y_TICKS {
        let value = y_min + (y_max - y_min) * i as f64 / (Y_TICKS - 1) as f64;
        let y = frame.y(value);
        draw_patterned_line(&mut img, (frame.left, y), (frame.right(), y), GRID, GRID_DASH);
        let label = format!("{:.2}", value);
        let (w, h) = text::measure(font, fs, &label);
        text::draw(&mut img, font, fs, BLACK, left as i32 - 8 - w as i32, y as i32 - h as i32 / 2, &label);
    }

    // Series
    let raw: Vec<(f32, f32)> = points
        .iter()
        .filter(|p| p.raw.is_finite())
        .map(|p| (frame.x(p.date), frame.y(p.raw)))
        .collect();
    draw_polyline(&mut img, &raw, RAW, false);
    // Smoothed runs are broken where the window is incomplete.
    let mut run = Vec::new();
    for p in points {
        match p.smoothed.filter(|v| v.is_finite()) {
            Some(v) => run.push((frame.x(p.date), frame.y(v))),
            None => {
                draw_polyline(&mut img, &run, SMOOTHED, true);
                run.clear();
            }
        }
    }
    draw_polyline(&mut img, &run, SMOOTHED, true);

    for marker in markers {
        let x = frame.x(marker.date());
        let (color, pattern) = match marker {
            Marker::Peak(_) => (PEAK, DASH_DOT),
            Marker::GrowthOrCut(_) => (GROWTH_OR_CUT, DASHED),
        };
        draw_patterned_line(&mut img, (x, frame.top), (x, frame.bottom()), color, pattern);
    }

    draw_hollow_rect_mut(
        &mut img,
        Rect::at(left as i32, top as i32).of_size(frame.width as u32 + 1, frame.height as u32 + 1),
        BLACK,
    );

    // Titles
    let center = (frame.left + frame.width / 2.0) as i32;
    text::draw_centered(&mut img, font, fs * 1.25, BLACK, center, 10, line_h * 2, &options.title);
    text::draw_centered(
        &mut img,
        font,
        fs,
        BLACK,
        center,
        frame.bottom() as i32 + 12 + line_h as i32,
        line_h * 2,
        &options.x_label,
    );
    if let Some(label) = text::rotated_label(font, fs, BLACK, WHITE, &options.y_label) {
        let y = (frame.top + frame.height / 2.0) as i64 - label.height() as i64 / 2;
        image::imageops::replace(&mut img, &label, 8, y.max(0));
    }

    draw_legend(&mut img, &frame, markers, font, fs);
    Ok(img)
}

/// Legend box in the lower-left corner of the plot area.
fn draw_legend(img: &mut RgbImage, frame: &Frame, markers: &[Marker], font: Option<&Font>, fs: f32) {
    let mut entries: Vec<(&str, Rgb<u8>, &[f32])> = vec![
        ("Original biomass", RAW, SOLID),
        ("Smoothed biomass", SMOOTHED, SOLID),
    ];
    if markers.iter().any(|m| matches!(m, Marker::GrowthOrCut(_))) {
        entries.push(("Growth or cut", GROWTH_OR_CUT, DASHED));
    }
    if markers.iter().any(|m| matches!(m, Marker::Peak(_))) {
        entries.push(("Peak", PEAK, DASH_DOT));
    }

    let (_, line_h) = text::measure(font, fs, "Ag");
    let row_h = line_h.max(10) + 6;
    let text_w = entries
        .iter()
        .map(|(label, _, _)| text::measure(font, fs, label).0)
        .max()
        .unwrap_or(0);
    let swatch = 30;
    let box_w = 10 + swatch + 8 + text_w + 10;
    let box_h = row_h * entries.len() as u32 + 10;
    let x0 = frame.left as i32 + 10;
    let y0 = frame.bottom() as i32 - 10 - box_h as i32;

    draw_filled_rect_mut(img, Rect::at(x0, y0).of_size(box_w, box_h), WHITE);
    draw_hollow_rect_mut(img, Rect::at(x0, y0).of_size(box_w, box_h), GRID);
    for (i, (label, color, pattern)) in entries.iter().enumerate() {
        let y = y0 + 5 + (i as u32 * row_h) as i32;
        let mid = (y + row_h as i32 / 2) as f32;
        let sx = (x0 + 10) as f32;
        draw_patterned_line(img, (sx, mid), (sx + swatch as f32, mid), *color, pattern);
        text::draw(img, font, fs, BLACK, x0 + 10 + swatch as i32 + 8, y + 3, label);
    }
}
