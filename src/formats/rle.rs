//! Line-based run-length coder for the EA EGA image stream.
//!
//! Every scanline of packed bytes is encoded on its own as a sequence of
//! records. A control byte below 0x80 copies `c + 1` literal bytes that
//! follow; a control byte of 0x80 or above replicates the single following
//! byte `(c & 0x7F) + 3` times. Records never cross a scanline boundary, and
//! scanlines are stored bottom to top to match the BMP row order the engine
//! was fed from.

use super::CodecError;

/// Shortest repeat worth a record; anything below is literal data.
pub const MIN_RUN: usize = 3;
/// Longest literal record, control byte encodes `len - 1`.
pub const MAX_LITERAL: usize = 128;
/// Longest repeat record, control byte encodes `len - 3`.
pub const MAX_RUN: usize = 130;

const RUN_FLAG: u8 = 0x80;

/// Find the next run of at least [`MIN_RUN`] identical bytes in `line` at or
/// after `start`, never looking past the end of the line.
///
/// Returns the length of the literal span preceding the run and the length
/// of the run itself. A run length of zero means the rest of the line is
/// literal data, including any trailing repeat shorter than [`MIN_RUN`].
/// The leftmost qualifying run always wins; no attempt is made to find a
/// longer run further ahead.
pub fn find_run(line: &[u8], start: usize) -> (usize, usize) {
    let rest = &line[start..];
    if rest.is_empty() {
        return (0, 0);
    }

    let mut last = rest[0]; // byte the current repeat is compared against
    let mut run_start = 0;
    let mut count = 1;
    for (pos, &cur) in rest.iter().enumerate().skip(1) {
        if cur == last {
            count += 1;
        } else {
            if count >= MIN_RUN {
                return (run_start, count);
            }
            // Repeat was too short, restart from the current byte
            run_start = pos;
            count = 1;
            last = cur;
        }
    }

    if count >= MIN_RUN {
        (run_start, count)
    } else {
        (rest.len(), 0)
    }
}

/// Encode one packed scanline, appending its records to `out`.
pub fn encode_line(line: &[u8], out: &mut Vec<u8>) {
    let mut x = 0;
    while x < line.len() {
        let (literal, run) = find_run(line, x);
        if literal > 0 {
            emit_literal(&line[x..x + literal], out);
            x += literal;
        }
        if run > 0 {
            emit_run(line[x], run, out);
            x += run;
        }
    }
}

fn emit_literal(bytes: &[u8], out: &mut Vec<u8>) {
    for chunk in bytes.chunks(MAX_LITERAL) {
        out.push((chunk.len() - 1) as u8);
        out.extend_from_slice(chunk);
    }
}

fn emit_run(value: u8, len: usize, out: &mut Vec<u8>) {
    let mut remaining = len;
    while remaining >= MIN_RUN {
        let chunk = remaining.min(MAX_RUN);
        out.push(RUN_FLAG | (chunk - MIN_RUN) as u8);
        out.push(value);
        remaining -= chunk;
    }
    // A tail of one or two bytes cannot be expressed as a repeat record,
    // so it goes out as a literal instead.
    if remaining > 0 {
        let tail = [value; 2];
        emit_literal(&tail[..remaining], out);
    }
}

/// Decode the record stream into `height` packed scanlines of `line_len`
/// bytes, filling rows from the bottom up.
///
/// The stream must be consumed exactly: running out of bytes mid-record or
/// mid-image fails with `TruncatedStream`, records left over after the top
/// scanline fail with `TrailingData`, and a record that would continue past
/// the end of the current scanline fails with `RecordSpansScanline`.
pub fn decode_lines(stream: &[u8], line_len: usize, height: usize) -> Result<Vec<u8>, CodecError> {
    if line_len == 0 || height == 0 {
        return Err(CodecError::InvalidDimensions(format!(
            "{} bytes x {} scanlines",
            line_len, height
        )));
    }

    let mut packed = vec![0u8; line_len * height];
    let mut pos = 0;
    let mut row = height - 1;
    let mut x = 0;
    let mut done = false;

    while pos < stream.len() {
        if done {
            return Err(CodecError::TrailingData {
                remaining: stream.len() - pos,
            });
        }

        let control = stream[pos];
        pos += 1;
        let base = row * line_len;

        if control & RUN_FLAG != 0 {
            let len = (control & 0x7F) as usize + MIN_RUN;
            if x + len > line_len {
                return Err(CodecError::RecordSpansScanline { offset: pos - 1 });
            }
            let value = *stream
                .get(pos)
                .ok_or(CodecError::TruncatedStream { offset: pos })?;
            pos += 1;
            packed[base + x..base + x + len].fill(value);
            x += len;
        } else {
            let len = control as usize + 1;
            if x + len > line_len {
                return Err(CodecError::RecordSpansScanline { offset: pos - 1 });
            }
            let bytes = stream
                .get(pos..pos + len)
                .ok_or(CodecError::TruncatedStream { offset: pos })?;
            packed[base + x..base + x + len].copy_from_slice(bytes);
            pos += len;
            x += len;
        }

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
        return Err(CodecError::TruncatedStream { offset: pos });
    }

    Ok(packed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_one(line: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        encode_line(line, &mut out);
        out
    }

    #[test]
    fn find_run_reports_leading_run() {
        assert_eq!(find_run(&[5, 5, 5, 5, 1, 2], 0), (0, 4));
    }

    #[test]
    fn find_run_reports_literal_span_before_run() {
        assert_eq!(find_run(&[1, 2, 3, 7, 7, 7], 0), (3, 3));
    }

    #[test]
    fn find_run_picks_leftmost_not_longest() {
        // A longer run of 9s follows, but the run of 7s comes first
        let line = [1, 7, 7, 7, 9, 9, 9, 9, 9];
        assert_eq!(find_run(&line, 0), (1, 3));
    }

    #[test]
    fn find_run_without_any_run() {
        assert_eq!(find_run(&[1, 2, 2, 3, 4], 0), (5, 0));
    }

    #[test]
    fn find_run_trailing_short_repeat_is_literal() {
        assert_eq!(find_run(&[1, 2, 3, 4, 4], 0), (5, 0));
    }

    #[test]
    fn find_run_honours_start_offset() {
        let line = [9, 9, 9, 1, 2, 6, 6, 6, 6];
        assert_eq!(find_run(&line, 3), (2, 4));
    }

    #[test]
    fn three_identical_bytes_make_one_repeat_record() {
        assert_eq!(encode_one(&[0xAB, 0xAB, 0xAB]), vec![0x80, 0xAB]);
    }

    #[test]
    fn two_identical_bytes_stay_literal() {
        assert_eq!(encode_one(&[0xAB, 0xAB]), vec![0x01, 0xAB, 0xAB]);
    }

    #[test]
    fn literal_span_of_129_splits_128_then_1() {
        // 129 distinct bytes, so no repeat record can form
        let line: Vec<u8> = (0..129u32).map(|i| i as u8).collect();
        let out = encode_one(&line);
        assert_eq!(out.len(), 1 + 128 + 1 + 1);
        assert_eq!(out[0], 127);
        assert_eq!(&out[1..129], &line[..128]);
        assert_eq!(out[129], 0);
        assert_eq!(out[130], line[128]);
    }

    #[test]
    fn run_of_133_splits_130_then_3() {
        let out = encode_one(&vec![0x44; 133]);
        assert_eq!(out, vec![0x80 | 127, 0x44, 0x80, 0x44]);
    }

    #[test]
    fn run_of_131_splits_130_then_literal_tail() {
        let out = encode_one(&vec![0x44; 131]);
        assert_eq!(out, vec![0x80 | 127, 0x44, 0x00, 0x44]);
    }

    #[test]
    fn run_of_132_splits_130_then_literal_pair() {
        let out = encode_one(&vec![0x44; 132]);
        assert_eq!(out, vec![0x80 | 127, 0x44, 0x01, 0x44, 0x44]);
    }

    #[test]
    fn decode_fills_rows_bottom_to_top() {
        // Two scanlines of 2 bytes each, bottom line encoded first
        let stream = [0x01, 0xBB, 0xBB, 0x01, 0xAA, 0xAA];
        let packed = decode_lines(&stream, 2, 2).unwrap();
        assert_eq!(packed, vec![0xAA, 0xAA, 0xBB, 0xBB]);
    }

    #[test]
    fn decode_rejects_record_crossing_scanline() {
        // Repeat of 4 into a 3-byte scanline
        let stream = [0x80 | 1, 0x55];
        assert!(matches!(
            decode_lines(&stream, 3, 1).unwrap_err(),
            CodecError::RecordSpansScanline { offset: 0 }
        ));
    }

    #[test]
    fn decode_rejects_truncated_literal() {
        let stream = [0x03, 0x11, 0x22];
        assert!(matches!(
            decode_lines(&stream, 4, 1).unwrap_err(),
            CodecError::TruncatedStream { .. }
        ));
    }

    #[test]
    fn decode_rejects_missing_scanlines() {
        let stream = [0x80, 0x55];
        assert!(matches!(
            decode_lines(&stream, 3, 2).unwrap_err(),
            CodecError::TruncatedStream { .. }
        ));
    }

    #[test]
    fn decode_rejects_trailing_records() {
        let stream = [0x80, 0x55, 0x80, 0x55];
        assert!(matches!(
            decode_lines(&stream, 3, 1).unwrap_err(),
            CodecError::TrailingData { remaining: 2 }
        ));
    }

    #[test]
    fn line_round_trip() {
        let line = [1, 1, 1, 1, 2, 3, 4, 4, 4, 4, 4, 9];
        let encoded = encode_one(&line);
        let decoded = decode_lines(&encoded, line.len(), 1).unwrap();
        assert_eq!(decoded, line);
    }
}
