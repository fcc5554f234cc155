//! File formats for the EA EGA image toolset
//!
//! `ega` is the run-length-encoded image stream used by the legacy engine,
//! `bmp` the 16-colour Windows bitmap container it converts to and from.
//! `packing` and `rle` hold the buffer transforms shared by both directions.

pub mod bmp;
pub mod ega;
pub mod packing;
pub mod rle;

use std::{fmt, io};

/// Errors raised by the codec and the surrounding containers.
#[derive(Debug)]
pub enum CodecError {
    /// Width or height outside the encodable range
    InvalidDimensions(String),
    /// Input buffer shorter than the declared geometry requires
    BufferTooSmall { expected: usize, actual: usize },
    /// Encoder produced more bytes than the algorithm allows
    BufferOverflow { limit: usize, actual: usize },
    /// Encoded stream ended in the middle of a record or scanline
    TruncatedStream { offset: usize },
    /// Bytes left over after the final scanline was reconstructed
    TrailingData { remaining: usize },
    /// A record would cross a scanline boundary
    RecordSpansScanline { offset: usize },
    /// Container-level format mismatch
    UnsupportedFormat(String),
    /// I/O error
    Io(io::Error),
}

impl From<io::Error> for CodecError {
    fn from(err: io::Error) -> Self {
        CodecError::Io(err)
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::InvalidDimensions(msg) => write!(f, "Invalid dimensions: {}", msg),
            CodecError::BufferTooSmall { expected, actual } => {
                write!(f, "Buffer too small: expected {} bytes, got {}", expected, actual)
            }
            CodecError::BufferOverflow { limit, actual } => {
                write!(f, "Encoded output of {} bytes exceeds the {} byte limit", actual, limit)
            }
            CodecError::TruncatedStream { offset } => {
                write!(f, "Encoded stream truncated at byte {}", offset)
            }
            CodecError::TrailingData { remaining } => {
                write!(f, "{} trailing bytes after the final scanline", remaining)
            }
            CodecError::RecordSpansScanline { offset } => {
                write!(f, "Record at byte {} crosses a scanline boundary", offset)
            }
            CodecError::UnsupportedFormat(msg) => write!(f, "Unsupported format: {}", msg),
            CodecError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for CodecError {}
