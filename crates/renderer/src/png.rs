//! PNG encoding for 8-bit truecolour rasters.
//!
//! Two layouts are written:
//! - **RGB (color type 2)**: the plain wind raster, 3 bytes per pixel.
//! - **RGBA (color type 6)**: the raster plus the validity mask as alpha.
//!
//! Scanlines use filter type 0 so every channel byte is stored verbatim;
//! decoders recover the exact quantised values.

use std::io::Write;

const SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// PNG colour types used here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorType {
    Rgb = 2,
    Rgba = 6,
}

impl ColorType {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            ColorType::Rgb => 3,
            ColorType::Rgba => 4,
        }
    }
}

/// Create an RGBA PNG (4 bytes per pixel).
pub fn create_png(pixels: &[u8], width: usize, height: usize) -> Result<Vec<u8>, String> {
    encode_png(pixels, width, height, ColorType::Rgba)
}

/// Create an RGB PNG (3 bytes per pixel).
pub fn create_png_rgb(pixels: &[u8], width: usize, height: usize) -> Result<Vec<u8>, String> {
    encode_png(pixels, width, height, ColorType::Rgb)
}

/// Create a PNG with an explicit colour type.
pub fn encode_png(
    pixels: &[u8],
    width: usize,
    height: usize,
    color: ColorType,
) -> Result<Vec<u8>, String> {
    let expected = width * height * color.bytes_per_pixel();
    if width == 0 || height == 0 {
        return Err(format!("invalid image size {}x{}", width, height));
    }
    if pixels.len() != expected {
        return Err(format!(
            "pixel buffer has {} bytes, expected {} for {}x{} {:?}",
            pixels.len(),
            expected,
            width,
            height,
            color
        ));
    }

    let mut png = Vec::with_capacity(expected / 2 + 64);
    png.extend_from_slice(&SIGNATURE);

    // IHDR chunk
    let mut ihdr_data = Vec::with_capacity(13);
    ihdr_data.extend_from_slice(&(width as u32).to_be_bytes());
    ihdr_data.extend_from_slice(&(height as u32).to_be_bytes());
    ihdr_data.push(8); // bit depth
    ihdr_data.push(color as u8);
    ihdr_data.push(0); // compression method
    ihdr_data.push(0); // filter method
    ihdr_data.push(0); // interlace method
    write_chunk(&mut png, b"IHDR", &ihdr_data);

    let idat_data = deflate_scanlines(pixels, width * color.bytes_per_pixel(), height)
        .map_err(|e| format!("IDAT compression failed: {}", e))?;
    write_chunk(&mut png, b"IDAT", &idat_data);

    write_chunk(&mut png, b"IEND", &[]);

    Ok(png)
}

fn write_chunk(png: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    png.extend_from_slice(&(data.len() as u32).to_be_bytes());
    png.extend_from_slice(chunk_type);
    png.extend_from_slice(data);

    // CRC covers type and data
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(chunk_type);
    hasher.update(data);
    png.extend_from_slice(&hasher.finalize().to_be_bytes());
}

fn deflate_scanlines(pixels: &[u8], stride: usize, height: usize) -> std::io::Result<Vec<u8>> {
    let mut uncompressed = Vec::with_capacity(height * (1 + stride));
    for row in pixels.chunks_exact(stride).take(height) {
        uncompressed.push(0); // filter type: none
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
    fn test_signature_and_header() {
        let png = create_png_rgb(&[10, 20, 30, 40, 50, 60], 2, 1).unwrap();
        assert_eq!(&png[0..8], &SIGNATURE);
        assert_eq!(&png[12..16], b"IHDR");
        assert_eq!(u32::from_be_bytes([png[16], png[17], png[18], png[19]]), 2);
        assert_eq!(u32::from_be_bytes([png[20], png[21], png[22], png[23]]), 1);
        assert_eq!(png[24], 8);
        assert_eq!(png[25], 2);
    }

    #[test]
    fn test_rgba_color_type() {
        let png = create_png(&[0, 0, 0, 255], 1, 1).unwrap();
        assert_eq!(png[25], 6);
        assert_eq!(&png[png.len() - 8..png.len() - 4], b"IEND");
    }

    #[test]
    fn test_rejects_wrong_buffer_size() {
        assert!(create_png_rgb(&[0; 5], 2, 1).is_err());
        assert!(create_png(&[0; 12], 2, 2).is_err());
        assert!(create_png_rgb(&[], 0, 0).is_err());
    }

    #[test]
    fn test_ihdr_crc() {
        let png = create_png_rgb(&[1, 2, 3], 1, 1).unwrap();
        let crc = u32::from_be_bytes([png[29], png[30], png[31], png[32]]);
        assert_eq!(crc, crc32fast::hash(&png[12..29]));
    }
}
