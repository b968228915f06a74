//! PNG output decoded back to raw bytes.

use std::io::Read;

use flate2::read::ZlibDecoder;
use renderer::png::{create_png, create_png_rgb};
use renderer::{encode, EncodingParams};
use wind_common::ResampledField;

/// Walk the chunk list, returning (type, data) pairs.
fn chunks(png: &[u8]) -> Vec<([u8; 4], Vec<u8>)> {
    let mut out = Vec::new();
    let mut pos = 8;
    while pos + 8 <= png.len() {
        let len = u32::from_be_bytes([png[pos], png[pos + 1], png[pos + 2], png[pos + 3]]) as usize;
        let mut kind = [0u8; 4];
        kind.copy_from_slice(&png[pos + 4..pos + 8]);
        out.push((kind, png[pos + 8..pos + 8 + len].to_vec()));
        pos += 12 + len;
    }
    out
}

/// Inflate the IDAT stream and strip the per-row filter byte.
fn decode_pixels(png: &[u8], stride: usize) -> Vec<u8> {
    let idat: Vec<u8> = chunks(png)
        .into_iter()
        .filter(|(kind, _)| kind == b"IDAT")
        .flat_map(|(_, data)| data)
        .collect();
    let mut raw = Vec::new();
    ZlibDecoder::new(&idat[..]).read_to_end(&mut raw).unwrap();

    let mut pixels = Vec::new();
    for row in raw.chunks_exact(stride + 1) {
        assert_eq!(row[0], 0, "unexpected filter type");
        pixels.extend_from_slice(&row[1..]);
    }
    pixels
}

#[test]
fn test_chunk_order() {
    let png = create_png(&[1, 2, 3, 4, 5, 6, 7, 8], 2, 1).unwrap();
    let kinds: Vec<[u8; 4]> = chunks(&png).into_iter().map(|(k, _)| k).collect();
    assert_eq!(kinds, vec![*b"IHDR", *b"IDAT", *b"IEND"]);
}

#[test]
fn test_rgb_bytes_survive() {
    let pixels: Vec<u8> = (0..=255u8).cycle().take(7 * 5 * 3).collect();
    let png = create_png_rgb(&pixels, 7, 5).unwrap();
    assert_eq!(decode_pixels(&png, 7 * 3), pixels);
}

#[test]
fn test_encoded_tile_png_roundtrip() {
    let field = ResampledField {
        width: 3,
        height: 2,
        u: vec![0.0, 10.0, -10.0, 49.0, -49.0, 0.0],
        v: vec![0.0, -5.0, 5.0, 1.0, -1.0, 0.0],
        mask: vec![true, true, true, true, true, false],
    };
    let (tile, _) = encode(&field, &EncodingParams::default()).unwrap();

    let rgb = tile.to_png(false).unwrap();
    assert_eq!(rgb[25], 2);
    assert_eq!(decode_pixels(&rgb, 9), tile.data);

    let rgba = tile.to_png(true).unwrap();
    assert_eq!(rgba[25], 6);
    let pixels = decode_pixels(&rgba, 12);
    assert_eq!(pixels, tile.rgba());
    assert_eq!(&pixels[20..24], &[128, 128, 0, 0]);
}
