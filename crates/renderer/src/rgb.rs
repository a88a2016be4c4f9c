//! True colour images from three-band reflectance rasters.

use std::path::Path;

use image::RgbImage;
use raster::{stretch_to_u8, MultiBand};
use tracing::{info, instrument};

use crate::error::{RenderError, Result};
use crate::png;

/// Lower and upper percentiles of the contrast stretch.
pub const STRETCH_PERCENTILES: (f64, f64) = (2.0, 98.0);

/// Stretch bands 1-3 (red, green, blue) to an 8-bit image.
pub fn render(image: &MultiBand) -> Result<RgbImage> {
    let (low, high) = STRETCH_PERCENTILES;
    let pixels = stretch_to_u8(image, low, high)?;
    RgbImage::from_raw(image.width as u32, image.height as u32, pixels)
        .ok_or_else(|| RenderError::invalid_input("pixel buffer does not match raster size"))
}

/// Render an RGB GeoTIFF to a PNG next to or instead of it.
#[instrument(skip_all, fields(path = %tif.display()))]
pub fn convert_file(tif: &Path, png_path: &Path) -> Result<()> {
    let image = geotiff::read(tif)?;
    if image.width == 0 || image.height == 0 {
        return Err(RenderError::invalid_input(format!("{} is empty", tif.display())));
    }
    let img = render(&image)?;
    let source = tif
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    png::save_rgb(png_path, &img, &[("Source", &source)])?;
    info!(output = %png_path.display(), "Saved RGB image");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_stretches_jointly() {
        // 2x1 image, red bright, blue dark.
        let image = MultiBand::new(
            2,
            1,
            vec![vec![1000.0, 3000.0], vec![500.0, 500.0], vec![0.0, 100.0]],
        )
        .unwrap();
        let img = render(&image).unwrap();
        assert_eq!(img.dimensions(), (2, 1));
        let bright = img.get_pixel(1, 0);
        assert_eq!(bright[0], 255);
        assert_eq!(img.get_pixel(0, 0)[2], 0);
    }

    #[test]
    fn test_render_needs_three_bands() {
        let image = MultiBand::new(1, 1, vec![vec![1.0], vec![2.0]]).unwrap();
        assert!(matches!(render(&image), Err(RenderError::Raster(_))));
    }
}
