//! 16-colour Windows bitmap container.
//!
//! Only the format the legacy engine tooling exchanged is supported: 4 bits
//! per pixel, one plane, uncompressed, 16 palette entries. The reader skips
//! the palette table entirely (the engine assumes the standard EGA colours);
//! the writer takes an explicit 16-entry palette.

use std::io::Cursor;

use crate::binary_utils::{read_bytes, read_i32_le, read_u16_le, read_u32_le, seek_to};

use super::packing::{pack, packed_line_len};
use super::CodecError;

const BMP_SIGNATURE: &[u8; 2] = b"BM";
const BMP_FILE_HEADER_SIZE: usize = 14;
const BMI_HEADER_SIZE: usize = 40;
const BMP_PALETTE_ENTRIES: usize = 16;
/// Signature + headers + palette table; pixel rows start here.
const BMP_PIXEL_DATA_OFFSET: usize =
    BMP_FILE_HEADER_SIZE + BMI_HEADER_SIZE + BMP_PALETTE_ENTRIES * 4;
/// 96 DPI in pixels per metre, the resolution the legacy tools stamped.
const BMP_96_DPI: i32 = 3780;

/// A bitmap decoded to one palette index per byte, top row first.
#[derive(Debug, Clone)]
pub struct BmpImage {
    pub pixels: Vec<u8>,
    pub width: u16,
    pub height: u16,
}

/// Bytes per stored row: the packed line rounded up to a 4-byte boundary.
pub fn row_stride(width: u16) -> usize {
    (packed_line_len(width) + 3) & !3
}

/// Parse a 16-colour BMP into a top-down one-byte-per-pixel raster.
///
/// Rows are stored bottom-up unless the header declares a negative height,
/// which marks a top-down bitmap; either way the returned raster is
/// top-down.
pub fn read_bmp(data: &[u8]) -> Result<BmpImage, CodecError> {
    if data.len() < BMP_FILE_HEADER_SIZE + BMI_HEADER_SIZE {
        return Err(CodecError::BufferTooSmall {
            expected: BMP_FILE_HEADER_SIZE + BMI_HEADER_SIZE,
            actual: data.len(),
        });
    }

    let mut cursor = Cursor::new(data);

    let signature = read_bytes(&mut cursor, 2)?;
    if signature.as_slice() != BMP_SIGNATURE.as_slice() {
        return Err(CodecError::UnsupportedFormat(
            "missing BM signature".to_string(),
        ));
    }
    let _file_size = read_u32_le(&mut cursor)?;
    let reserved = read_u32_le(&mut cursor)?;
    if reserved != 0 {
        return Err(CodecError::UnsupportedFormat(
            "reserved header field is not zero".to_string(),
        ));
    }
    let image_offset = read_u32_le(&mut cursor)?;

    let header_size = read_u32_le(&mut cursor)?;
    if header_size != BMI_HEADER_SIZE as u32 {
        return Err(CodecError::UnsupportedFormat(format!(
            "unexpected DIB header size {}",
            header_size
        )));
    }
    let width_raw = read_i32_le(&mut cursor)?;
    let height_raw = read_i32_le(&mut cursor)?;
    let num_planes = read_u16_le(&mut cursor)?;
    let bits_per_pixel = read_u16_le(&mut cursor)?;
    let compression = read_u32_le(&mut cursor)?;

    if num_planes != 1 || bits_per_pixel != 4 || compression != 0 {
        return Err(CodecError::UnsupportedFormat(format!(
            "expected an uncompressed 4-bit single-plane bitmap (planes {}, {} bpp, compression {})",
            num_planes, bits_per_pixel, compression
        )));
    }

    let _bitmap_size = read_u32_le(&mut cursor)?;
    let _horiz_res = read_i32_le(&mut cursor)?;
    let _vert_res = read_i32_le(&mut cursor)?;
    let num_colors = read_u32_le(&mut cursor)?;
    if num_colors != BMP_PALETTE_ENTRIES as u32 {
        return Err(CodecError::UnsupportedFormat(format!(
            "expected a 16-colour palette, found {} entries",
            num_colors
        )));
    }

    // Negative height flips the row order to top-down
    let top_down = height_raw < 0;
    let height_abs = height_raw.unsigned_abs();

    if width_raw < 1
        || width_raw > u16::MAX as i32
        || height_abs < 1
        || height_abs > u16::MAX as u32
    {
        return Err(CodecError::InvalidDimensions(format!(
            "{} x {}",
            width_raw, height_raw
        )));
    }
    let width = width_raw as u16;
    let height = height_abs as u16;

    // Palette contents are ignored; jump straight to the pixel rows
    seek_to(&mut cursor, image_offset as u64)
        .map_err(|_| CodecError::TruncatedStream { offset: data.len() })?;

    let w = width as usize;
    let stride = row_stride(width);
    let mut pixels = vec![0u8; w * height as usize];

    for y in 0..height as usize {
        let line = read_bytes(&mut cursor, stride).map_err(|_| CodecError::TruncatedStream {
            offset: cursor.position() as usize,
        })?;
        let row = if top_down { y } else { height as usize - 1 - y };
        let base = row * w;
        for x in 0..(w + 1) / 2 {
            let byte = line[x];
            pixels[base + x * 2] = (byte >> 4) & 0x0F;
            if x * 2 + 1 < w {
                pixels[base + x * 2 + 1] = byte & 0x0F;
            }
        }
    }

    Ok(BmpImage {
        pixels,
        width,
        height,
    })
}

/// Serialise a one-byte-per-pixel raster as a 16-colour BMP.
///
/// Rows are written bottom-up with each packed line padded to a 4-byte
/// stride. `palette` entries are RGB triples, stored in the file's
/// blue-green-red order.
pub fn write_bmp(
    pixels: &[u8],
    width: u16,
    height: u16,
    palette: &[[u8; 3]; BMP_PALETTE_ENTRIES],
) -> Result<Vec<u8>, CodecError> {
    if width == 0 || height == 0 {
        return Err(CodecError::InvalidDimensions(format!(
            "{} x {} (both sides must be at least 1)",
            width, height
        )));
    }
    let w = width as usize;
    let expected = w * height as usize;
    if pixels.len() != expected {
        return Err(CodecError::BufferTooSmall {
            expected,
            actual: pixels.len(),
        });
    }

    let stride = row_stride(width);
    let image_size = stride * height as usize;
    let file_size = BMP_PIXEL_DATA_OFFSET + image_size;

    let mut out = Vec::with_capacity(file_size);

    // File header
    out.extend_from_slice(BMP_SIGNATURE);
    out.extend_from_slice(&(file_size as u32).to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&(BMP_PIXEL_DATA_OFFSET as u32).to_le_bytes());

    // BMI header
    out.extend_from_slice(&(BMI_HEADER_SIZE as u32).to_le_bytes());
    out.extend_from_slice(&(width as i32).to_le_bytes());
    out.extend_from_slice(&(height as i32).to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // planes
    out.extend_from_slice(&4u16.to_le_bytes()); // bits per pixel
    out.extend_from_slice(&0u32.to_le_bytes()); // uncompressed
    out.extend_from_slice(&(image_size as u32).to_le_bytes());
    out.extend_from_slice(&BMP_96_DPI.to_le_bytes());
    out.extend_from_slice(&BMP_96_DPI.to_le_bytes());
    out.extend_from_slice(&(BMP_PALETTE_ENTRIES as u32).to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes()); // all colours important

    for [r, g, b] in palette {
        out.extend_from_slice(&[*b, *g, *r, 0]);
    }

    for row in (0..height as usize).rev() {
        let line = pack(&pixels[row * w..(row + 1) * w], width)?;
        out.extend_from_slice(&line);
        out.resize(out.len() + stride - line.len(), 0);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::palette::EGA_PALETTE;

    fn test_raster(width: u16, height: u16) -> Vec<u8> {
        let w = width as usize;
        (0..w * height as usize)
            .map(|i| ((i * 5 + i / w) % 16) as u8)
            .collect()
    }

    #[test]
    fn write_then_read_round_trip() {
        for (width, height) in [(1u16, 1u16), (2, 2), (5, 3), (8, 8), (41, 17)] {
            let raster = test_raster(width, height);
            let data = write_bmp(&raster, width, height, &EGA_PALETTE).unwrap();
            let image = read_bmp(&data).unwrap();
            assert_eq!((image.width, image.height), (width, height));
            assert_eq!(image.pixels, raster, "geometry {}x{}", width, height);
        }
    }

    #[test]
    fn rows_are_padded_to_four_bytes() {
        let data = write_bmp(&test_raster(2, 3), 2, 3, &EGA_PALETTE).unwrap();
        assert_eq!(row_stride(2), 4);
        assert_eq!(data.len(), BMP_PIXEL_DATA_OFFSET + 4 * 3);
    }

    #[test]
    fn reader_handles_top_down_bitmaps() {
        let raster = test_raster(2, 2);
        let mut data = write_bmp(&raster, 2, 2, &EGA_PALETTE).unwrap();
        // Flip the height sign and swap the two stored rows
        data[22..26].copy_from_slice(&(-2i32).to_le_bytes());
        let stride = row_stride(2);
        let start = BMP_PIXEL_DATA_OFFSET;
        let (top, bottom) = data[start..].split_at_mut(stride);
        top.swap_with_slice(bottom);
        let image = read_bmp(&data).unwrap();
        assert_eq!(image.pixels, raster);
    }

    #[test]
    fn rejects_wrong_signature() {
        let mut data = write_bmp(&test_raster(4, 4), 4, 4, &EGA_PALETTE).unwrap();
        data[0] = b'X';
        assert!(matches!(
            read_bmp(&data).unwrap_err(),
            CodecError::UnsupportedFormat(_)
        ));
    }

    #[test]
    fn rejects_unsupported_bit_depth() {
        let mut data = write_bmp(&test_raster(4, 4), 4, 4, &EGA_PALETTE).unwrap();
        data[28..30].copy_from_slice(&8u16.to_le_bytes());
        assert!(matches!(
            read_bmp(&data).unwrap_err(),
            CodecError::UnsupportedFormat(_)
        ));
    }

    #[test]
    fn rejects_truncated_pixel_data() {
        let data = write_bmp(&test_raster(8, 8), 8, 8, &EGA_PALETTE).unwrap();
        assert!(matches!(
            read_bmp(&data[..data.len() - 1]).unwrap_err(),
            CodecError::TruncatedStream { .. }
        ));
    }

    #[test]
    fn palette_entries_are_stored_bgr() {
        let data = write_bmp(&[0], 1, 1, &EGA_PALETTE).unwrap();
        let palette_start = BMP_FILE_HEADER_SIZE + BMI_HEADER_SIZE;
        // Entry 1 is EGA blue
        assert_eq!(
            &data[palette_start + 4..palette_start + 8],
            &[0xAA, 0x00, 0x00, 0x00]
        );
    }
}
