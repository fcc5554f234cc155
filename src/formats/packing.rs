//! Nibble packing for 16-colour image data.
//!
//! The EGA stream and the BMP container both store two 4-bit palette indices
//! per byte, left pixel in the most significant nibble. The rest of the tool
//! works on one byte per pixel, so these transforms sit at the boundary of
//! every pipeline.

use super::CodecError;

/// Packed bytes per scanline for a given pixel width.
pub fn packed_line_len(width: u16) -> usize {
    (width as usize + 1) / 2
}

/// Pack a row-major one-byte-per-pixel raster into 2-pixels-per-byte lines.
///
/// Each scanline packs independently to [`packed_line_len`] bytes; for odd
/// widths the last byte of a line carries the final pixel in its high nibble
/// and a zero pad nibble. Pixel values are masked to 4 bits.
pub fn pack(pixels: &[u8], width: u16) -> Result<Vec<u8>, CodecError> {
    if width == 0 {
        return Err(CodecError::InvalidDimensions(
            "width must be at least 1".to_string(),
        ));
    }

    let width = width as usize;
    if pixels.len() % width != 0 {
        let lines = pixels.len() / width + 1;
        return Err(CodecError::BufferTooSmall {
            expected: lines * width,
            actual: pixels.len(),
        });
    }

    let line_len = (width + 1) / 2;
    let mut packed = Vec::with_capacity(pixels.len() / width * line_len);
    for line in pixels.chunks_exact(width) {
        for pair in line.chunks(2) {
            let high = (pair[0] & 0x0F) << 4;
            // Odd width leaves the pad nibble zeroed
            let low = if pair.len() == 2 { pair[1] & 0x0F } else { 0 };
            packed.push(high | low);
        }
    }

    Ok(packed)
}

/// Expand packed lines back to one byte per pixel.
///
/// For odd widths the pad nibble at the end of each line is dropped, so the
/// output holds exactly `width` pixels per line.
pub fn unpack(packed: &[u8], width: u16) -> Result<Vec<u8>, CodecError> {
    if width == 0 {
        return Err(CodecError::InvalidDimensions(
            "width must be at least 1".to_string(),
        ));
    }

    let line_len = packed_line_len(width);
    if packed.len() % line_len != 0 {
        let lines = packed.len() / line_len + 1;
        return Err(CodecError::BufferTooSmall {
            expected: lines * line_len,
            actual: packed.len(),
        });
    }

    let width = width as usize;
    let mut pixels = Vec::with_capacity(packed.len() / line_len * width);
    for line in packed.chunks_exact(line_len) {
        for (x, &byte) in line.iter().enumerate() {
            pixels.push((byte >> 4) & 0x0F);
            if x * 2 + 1 < width {
                pixels.push(byte & 0x0F);
            }
        }
    }

    Ok(pixels)
}
