//! EA EGA image stream.
//!
//! On-disk layout: `width - 1` and `height - 1` as little-endian 16-bit
//! values, followed by the run-length records for every scanline from the
//! bottom of the image to the top. This layout is shared with the original
//! engine and has to stay byte-exact.

use std::io::Cursor;

use serde::Serialize;

use crate::binary_utils::read_u16_le;

use super::packing::{pack, packed_line_len, unpack};
use super::rle::{decode_lines, encode_line, MIN_RUN};
use super::CodecError;

/// Size prefix: two 16-bit dimension fields.
pub const EGA_HEADER_SIZE: usize = 4;

/// Largest width or height the 16-bit prefix can declare here.
pub const EGA_MAX_DIMENSION: u32 = u16::MAX as u32;

/// A decoded EGA image, one palette index per byte, top row first.
#[derive(Debug, Clone)]
pub struct EgaImage {
    pub pixels: Vec<u8>,
    pub width: u16,
    pub height: u16,
}

/// Record statistics gathered by [`inspect`] without expanding pixel data.
#[derive(Debug, Serialize)]
pub struct EgaInfo {
    pub width: u16,
    pub height: u16,
    pub encoded_size: usize,
    pub decoded_size: usize,
    pub literal_records: usize,
    pub literal_bytes: usize,
    pub repeat_records: usize,
    pub repeat_bytes: usize,
}

/// Encode a one-byte-per-pixel raster into the EGA stream format.
///
/// `raster` must hold exactly `width * height` bytes in top-down row-major
/// order; pixel values are masked to 4 bits. Scanlines are packed to two
/// pixels per byte and run-length encoded from the bottom row up.
pub fn encode(raster: &[u8], width: u16, height: u16) -> Result<Vec<u8>, CodecError> {
    if width == 0 || height == 0 {
        return Err(CodecError::InvalidDimensions(format!(
            "{} x {} (both sides must be at least 1)",
            width, height
        )));
    }

    let expected = width as usize * height as usize;
    if raster.len() != expected {
        return Err(CodecError::BufferTooSmall {
            expected,
            actual: raster.len(),
        });
    }

    let packed = pack(raster, width)?;
    let line_len = packed_line_len(width);

    let mut out = Vec::with_capacity(EGA_HEADER_SIZE + packed.len());
    out.extend_from_slice(&(width - 1).to_le_bytes());
    out.extend_from_slice(&(height - 1).to_le_bytes());

    for row in (0..height as usize).rev() {
        encode_line(&packed[row * line_len..(row + 1) * line_len], &mut out);
    }

    // No record expands to more than twice its input bytes, so this bound
    // holds for every valid encode.
    let limit = EGA_HEADER_SIZE + 2 * packed.len();
    if out.len() > limit {
        return Err(CodecError::BufferOverflow {
            limit,
            actual: out.len(),
        });
    }

    Ok(out)
}

/// Decode an EGA stream back into a one-byte-per-pixel raster.
///
/// The stream must be consumed exactly; see [`decode_lines`] for the
/// failure modes of the record walk.
pub fn decode(stream: &[u8]) -> Result<EgaImage, CodecError> {
    let (width, height) = read_dimensions(stream)?;
    let line_len = packed_line_len(width);

    let packed = decode_lines(&stream[EGA_HEADER_SIZE..], line_len, height as usize)?;
    let pixels = unpack(&packed, width)?;

    Ok(EgaImage {
        pixels,
        width,
        height,
    })
}

/// Walk the record stream and report dimensions and record statistics
/// without reconstructing pixel data.
pub fn inspect(stream: &[u8]) -> Result<EgaInfo, CodecError> {
    let (width, height) = read_dimensions(stream)?;
    let line_len = packed_line_len(width);
    let records = &stream[EGA_HEADER_SIZE..];

    let mut info = EgaInfo {
        width,
        height,
        encoded_size: stream.len(),
        decoded_size: width as usize * height as usize,
        literal_records: 0,
        literal_bytes: 0,
        repeat_records: 0,
        repeat_bytes: 0,
    };

    let mut pos = 0;
    let mut row = height as usize - 1;
    let mut x = 0;
    let mut done = false;

    while pos < records.len() {
        if done {
            return Err(CodecError::TrailingData {
                remaining: records.len() - pos,
            });
        }

        let control = records[pos];
        pos += 1;

        let len = if control & 0x80 != 0 {
            let len = (control & 0x7F) as usize + MIN_RUN;
            if pos >= records.len() {
                return Err(CodecError::TruncatedStream {
                    offset: EGA_HEADER_SIZE + pos,
                });
            }
            pos += 1;
            info.repeat_records += 1;
            info.repeat_bytes += len;
            len
        } else {
            let len = control as usize + 1;
            if pos + len > records.len() {
                return Err(CodecError::TruncatedStream {
                    offset: EGA_HEADER_SIZE + pos,
                });
            }
            pos += len;
            info.literal_records += 1;
            info.literal_bytes += len;
            len
        };

        if x + len > line_len {
            return Err(CodecError::RecordSpansScanline {
                offset: EGA_HEADER_SIZE + pos - 1,
            });
        }
        x += len;

        if x == line_len {
            x = 0;
            if row == 0 {
                done = true;
            } else {
                row -= 1;
            }
        }
    }

    if !done {
        return Err(CodecError::TruncatedStream {
            offset: EGA_HEADER_SIZE + pos,
        });
    }

    Ok(info)
}

fn read_dimensions(stream: &[u8]) -> Result<(u16, u16), CodecError> {
    if stream.len() < EGA_HEADER_SIZE {
        return Err(CodecError::TruncatedStream {
            offset: stream.len(),
        });
    }

    let mut cursor = Cursor::new(stream);
    let width = read_u16_le(&mut cursor)? as u32 + 1;
    let height = read_u16_le(&mut cursor)? as u32 + 1;

    // The prefix can declare 65536, which no u16 geometry here can carry
    if width > EGA_MAX_DIMENSION || height > EGA_MAX_DIMENSION {
        return Err(CodecError::InvalidDimensions(format!(
            "{} x {} exceeds the supported maximum of {}",
            width, height, EGA_MAX_DIMENSION
        )));
    }

    Ok((width as u16, height as u16))
}
