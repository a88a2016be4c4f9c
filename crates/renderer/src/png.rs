//! PNG encoding for RGB and RGBA images.
//!
//! Every product is written as 8-bit truecolor (color type 2) or
//! truecolor with alpha (color type 6), with optional `tEXt` chunks for
//! provenance (source file, acquisition date).

use std::io::Write;
use std::path::Path;

use image::{RgbImage, RgbaImage};
use tracing::debug;

use crate::error::{RenderError, Result};

const SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// PNG color types supported by the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorType {
    Rgb,
    Rgba,
}

impl ColorType {
    fn code(self) -> u8 {
        match self {
            ColorType::Rgb => 2,
            ColorType::Rgba => 6,
        }
    }

    fn bytes_per_pixel(self) -> usize {
        match self {
            ColorType::Rgb => 3,
            ColorType::Rgba => 4,
        }
    }
}

/// Encode raw interleaved pixels.
///
/// `text` entries become `tEXt` chunks; keywords must be 1-79 Latin-1
/// characters without NUL.
pub fn create_png(
    pixels: &[u8],
    width: usize,
    height: usize,
    color: ColorType,
    text: &[(&str, &str)],
) -> Result<Vec<u8>> {
    let expected = width * height * color.bytes_per_pixel();
    if pixels.len() != expected {
        return Err(RenderError::Png(format!(
            "{} bytes for {}x{} {:?}, expected {}",
            pixels.len(),
            width,
            height,
            color,
            expected
        )));
    }
    if width == 0 || height == 0 {
        return Err(RenderError::Png("empty image".to_string()));
    }

    let mut png = Vec::new();
    png.extend_from_slice(&SIGNATURE);

    // IHDR chunk
    let mut ihdr_data = Vec::with_capacity(13);
    ihdr_data.extend_from_slice(&(width as u32).to_be_bytes());
    ihdr_data.extend_from_slice(&(height as u32).to_be_bytes());
    ihdr_data.push(8); // bit depth
    ihdr_data.push(color.code());
    ihdr_data.push(0); // compression method
    ihdr_data.push(0); // filter method
    ihdr_data.push(0); // interlace method
    write_chunk(&mut png, b"IHDR", &ihdr_data);

    for (keyword, value) in text {
        if keyword.is_empty() || keyword.len() > 79 || keyword.contains('\0') {
            return Err(RenderError::Png(format!("invalid tEXt keyword '{}'", keyword)));
        }
        let mut data = Vec::with_capacity(keyword.len() + 1 + value.len());
        data.extend_from_slice(keyword.as_bytes());
        data.push(0);
        data.extend_from_slice(value.as_bytes());
        write_chunk(&mut png, b"tEXt", &data);
    }

    let idat_data = deflate_idat(pixels, width * color.bytes_per_pixel(), height)
        .map_err(|e| RenderError::Png(format!("IDAT compression failed: {}", e)))?;
    write_chunk(&mut png, b"IDAT", &idat_data);

    write_chunk(&mut png, b"IEND", &[]);

    Ok(png)
}

pub fn encode_rgb(img: &RgbImage, text: &[(&str, &str)]) -> Result<Vec<u8>> {
    create_png(
        img.as_raw(),
        img.width() as usize,
        img.height() as usize,
        ColorType::Rgb,
        text,
    )
}

pub fn encode_rgba(img: &RgbaImage, text: &[(&str, &str)]) -> Result<Vec<u8>> {
    create_png(
        img.as_raw(),
        img.width() as usize,
        img.height() as usize,
        ColorType::Rgba,
        text,
    )
}

/// Encode and write an RGB image, creating the parent directory.
pub fn save_rgb(path: &Path, img: &RgbImage, text: &[(&str, &str)]) -> Result<()> {
    let bytes = encode_rgb(img, text)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, &bytes)?;
    debug!(path = %path.display(), bytes = bytes.len(), "Wrote PNG");
    Ok(())
}

/// Write a PNG chunk
fn write_chunk(png: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    png.extend_from_slice(&(data.len() as u32).to_be_bytes());
    png.extend_from_slice(chunk_type);
    png.extend_from_slice(data);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(chunk_type);
    hasher.update(data);
    png.extend_from_slice(&hasher.finalize().to_be_bytes());
}

/// Prefix each scanline with filter type 0 and deflate.
fn deflate_idat(pixels: &[u8], row_bytes: usize, height: usize) -> std::io::Result<Vec<u8>> {
    let mut uncompressed = Vec::with_capacity(height * (1 + row_bytes));
    for row in pixels.chunks_exact(row_bytes) {
        uncompressed.push(0);
        uncompressed.extend_from_slice(row);
    }

    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(&uncompressed)?;
    encoder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_and_ihdr() {
        let png = create_png(&[255, 0, 0, 0, 255, 0], 2, 1, ColorType::Rgb, &[]).unwrap();
        assert_eq!(&png[..8], &SIGNATURE);
        assert_eq!(&png[12..16], b"IHDR");
        assert_eq!(u32::from_be_bytes([png[16], png[17], png[18], png[19]]), 2);
        assert_eq!(u32::from_be_bytes([png[20], png[21], png[22], png[23]]), 1);
        assert_eq!(png[25], 2);
        assert_eq!(&png[png.len() - 8..png.len() - 4], b"IEND");
    }

    #[test]
    fn test_chunk_crc() {
        let mut buf = Vec::new();
        write_chunk(&mut buf, b"IEND", &[]);
        // Well-known CRC of an empty IEND chunk.
        assert_eq!(&buf[8..], &[0xAE, 0x42, 0x60, 0x82]);
    }

    #[test]
    fn test_text_chunk() {
        let png = create_png(&[0; 4], 1, 1, ColorType::Rgba, &[("Source", "a.tif")]).unwrap();
        let pos = png.windows(4).position(|w| w == b"tEXt").unwrap();
        assert_eq!(&png[pos + 4..pos + 16], b"Source\0a.tif");
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(create_png(&[0; 5], 1, 2, ColorType::Rgb, &[]).is_err());
        assert!(create_png(&[], 0, 0, ColorType::Rgb, &[]).is_err());
        assert!(create_png(&[0; 3], 1, 1, ColorType::Rgb, &[("", "x")]).is_err());
    }
}
