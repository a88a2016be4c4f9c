//! Integration tests: NDVI maps, RGB images, composites and animations
//! written to disk and read back.

use std::path::Path;

use bioma_common::{CrsCode, GeoTransform};
use image::{Rgb, RgbImage};
use raster::{MultiBand, Raster};
use renderer::animation::{self, AnimationOptions, GIF_NAME};
use renderer::compose::{self, ComposeOptions};
use renderer::ndvi_map::{self, NdviMapOptions};
use renderer::{rgb, RenderError};
use test_utils::{create_ndvi_ramp, create_test_grid, names};

// ============================================================================
// Helpers
// ============================================================================

fn write_ndvi_tif(dir: &Path, name: &str, data: Vec<f32>, width: usize, height: usize) -> std::path::PathBuf {
    let raster = Raster::new(width, height, data)
        .unwrap()
        .with_transform(GeoTransform::from_origin(-47.70, -22.68, 0.0005, 0.0005))
        .with_crs(CrsCode::Epsg4326);
    let path = dir.join(name);
    geotiff::write_f32(&path, &raster).unwrap();
    path
}

fn write_png(dir: &Path, name: &str, width: u32, height: u32, color: [u8; 3]) {
    let img = RgbImage::from_pixel(width, height, Rgb(color));
    renderer::png::save_rgb(&dir.join(name), &img, &[]).unwrap();
}

fn small_map() -> NdviMapOptions {
    NdviMapOptions {
        min_size: 100,
        ..Default::default()
    }
}

// ============================================================================
// NDVI maps
// ============================================================================

#[test]
fn test_ndvi_png_written_and_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let tif = write_ndvi_tif(dir.path(), names::NDVI_TIFFS[0], create_ndvi_ramp(20, 10), 20, 10);
    let png = dir.path().join("openEO_2023-01-05Z.png");
    std::fs::write(&png, b"stale").unwrap();

    let stats = ndvi_map::convert_file(&tif, &png, None, &small_map()).unwrap();
    assert_eq!(stats.min, -1.0);
    assert_eq!(stats.max, 1.0);

    let img = image::open(&png).unwrap().to_rgb8();
    // 20 px wide map enlarged 5x, plus axes and colorbar.
    assert!(img.width() > 100);
    assert!(img.height() > 50);
}

#[test]
fn test_ndvi_all_nan_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let tif = write_ndvi_tif(dir.path(), "openEO_2023-01-20Z.tif", vec![f32::NAN; 16], 4, 4);
    let png = dir.path().join("out.png");

    let err = ndvi_map::convert_file(&tif, &png, None, &small_map()).unwrap_err();
    assert!(matches!(err, RenderError::InvalidInput(_)));
    assert!(!png.exists());
}

#[test]
fn test_ndvi_constant_raster_still_renders() {
    let dir = tempfile::tempdir().unwrap();
    let tif = write_ndvi_tif(dir.path(), "openEO_2023-02-04Z.tif", vec![0.3; 16], 4, 4);
    let png = dir.path().join("out.png");

    let stats = ndvi_map::convert_file(&tif, &png, None, &small_map()).unwrap();
    assert!(stats.is_constant());
    assert!(png.is_file());
}

// ============================================================================
// RGB images
// ============================================================================

#[test]
fn test_rgb_png_from_three_band_tif() {
    let dir = tempfile::tempdir().unwrap();
    let (w, h) = (12, 8);
    let band = create_test_grid(w, h).iter().map(|v| v * 3000.0).collect::<Vec<_>>();
    let mut image = MultiBand::new(w, h, vec![band.clone(), band.clone(), band]).unwrap();
    image.crs = Some(CrsCode::Epsg4326);
    let tif = dir.path().join(names::RGB_RENAMED);
    geotiff::write_rgb_f32(&tif, &image).unwrap();

    let png = dir.path().join("RGB_2023-01-05.png");
    rgb::convert_file(&tif, &png).unwrap();
    let img = image::open(&png).unwrap().to_rgb8();
    assert_eq!(img.dimensions(), (12, 8));
}

#[test]
fn test_rgb_single_band_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let tif = write_ndvi_tif(dir.path(), "single.tif", vec![0.5; 4], 2, 2);
    assert!(rgb::convert_file(&tif, &dir.path().join("single.png")).is_err());
}

// ============================================================================
// Composites
// ============================================================================

#[test]
fn test_pairing_by_date() {
    let dir = tempfile::tempdir().unwrap();
    let rgb_dir = dir.path().join("rgb");
    let ndvi_dir = dir.path().join("ndvi");
    write_png(&rgb_dir, "RGB_2023-01-05.png", 10, 10, [255, 0, 0]);
    write_png(&rgb_dir, "RGB_2023-01-20.png", 10, 10, [255, 0, 0]);
    write_png(&rgb_dir, "RGB_2023-03-01.png", 10, 10, [255, 0, 0]);
    write_png(&ndvi_dir, "openEO_2023-01-05Z.png", 20, 10, [0, 255, 0]);
    write_png(&ndvi_dir, "openEO_2023-01-20Z.png", 20, 10, [0, 255, 0]);

    let pairs = compose::pair_images(&rgb_dir, &ndvi_dir).unwrap();
    assert_eq!(pairs.len(), 2);
    assert!(pairs[0].1.ends_with("openEO_2023-01-05Z.png"));
    assert!(pairs[1].0.ends_with("RGB_2023-01-20.png"));
}

#[test]
fn test_combine_pair_layout() {
    let dir = tempfile::tempdir().unwrap();
    write_png(dir.path(), "RGB_2023-01-05.png", 10, 20, [255, 0, 0]);
    write_png(dir.path(), "openEO_2023-01-05Z.png", 30, 20, [0, 255, 0]);
    let out_dir = dir.path().join("combined");

    let out = compose::combine_pair(
        &dir.path().join("RGB_2023-01-05.png"),
        &dir.path().join("openEO_2023-01-05Z.png"),
        &out_dir,
        "Farm A",
        None,
        &ComposeOptions::default(),
    )
    .unwrap();

    assert!(out.ends_with(names::COMBINED_PNG));
    let img = image::open(&out).unwrap().to_rgb8();
    // (10 + 30) * 2 wide, 40 tall plus two 4 px bands.
    assert_eq!(img.dimensions(), (80, 48));
    assert_eq!(*img.get_pixel(0, 0), Rgb([255, 255, 255]));
}

// ============================================================================
// Animation
// ============================================================================

#[test]
fn test_animation_frame_count() {
    let dir = tempfile::tempdir().unwrap();
    write_png(dir.path(), "combined_openEO_2023-01-05Z.png", 40, 30, [0, 100, 0]);
    write_png(dir.path(), "combined_openEO_2023-01-20Z.png", 40, 30, [0, 200, 0]);
    write_png(dir.path(), "combined_openEO_2023-02-04Z.png", 40, 30, [0, 250, 0]);

    let options = AnimationOptions {
        fade_steps: 4,
        ..Default::default()
    };
    let (path, frames) =
        animation::animate_directory(dir.path(), dir.path(), "Biomass Analysis", None, &options)
            .unwrap();

    assert!(path.ends_with(GIF_NAME));
    // Three images plus two fades of five blends each.
    assert_eq!(frames, 3 + 2 * 5);
    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[..6], b"GIF89a");
}

#[test]
fn test_animation_without_images_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    assert!(animation::animate_directory(
        dir.path(),
        out.path(),
        "Biomass Analysis",
        None,
        &AnimationOptions::default()
    )
    .is_err());
    assert!(!out.path().join(GIF_NAME).exists());
}
