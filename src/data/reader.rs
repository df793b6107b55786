//! Random-access byte-range reader with EnSight's line primitives.
//!
//! EnSight Gold geometry and variable files are "binary line" oriented: the
//! header is a run of fixed 80-byte records, and the case file is ordinary
//! text. [`ByteReader`] gives both a cursor-based view over an immutable
//! byte slice, decoding fixed-width binary fields with `winnow`.

use winnow::Parser;
use winnow::binary::{le_f32, le_i32};
use winnow::combinator::repeat;
use winnow::token::take;

use crate::error::{EResult, EncasError};

/// Binary description records are always exactly this many bytes.
pub const BINARY_LINE_LEN: usize = 80;

/// Cursor over an immutable byte range.
///
/// The reader never owns the bytes: callers hand it a slice backed by a
/// memory map or a heap buffer (see [`crate::data::source`]) and the reader
/// is scoped to that borrow.
pub struct ByteReader<'a> {
    data: &'a [u8],
    remaining: &'a [u8],
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            remaining: data,
        }
    }

    pub fn position(&self) -> usize {
        self.data.len() - self.remaining.len()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_eof(&self) -> bool {
        self.remaining.is_empty()
    }

    fn bounds_error(&self, what: &'static str, extra: usize) -> rootcause::Report<EncasError> {
        rootcause::Report::new(EncasError::Bounds {
            what,
            index: (self.position() + extra) as i64,
            len: self.data.len(),
        })
    }

    /// Advance the cursor by `n` bytes, bounds-checked.
    pub fn advance(&mut self, n: usize) -> EResult<()> {
        self.take(n).map(|_| ())
    }

    fn take(&mut self, n: usize) -> EResult<&'a [u8]> {
        take(n)
            .parse_next(&mut self.remaining)
            .map_err(|_| self.bounds_error("byte reader take", n))
    }

    /// Read one textual line. The terminator (`\r`, `\n`, or `\r\n`) is
    /// consumed but not included; a `#` truncates the returned content to
    /// whatever precedes it on the line.
    pub fn read_line(&mut self) -> &'a [u8] {
        let data = self.remaining;
        let mut end = 0;
        while end < data.len() && data[end] != b'\n' && data[end] != b'\r' {
            end += 1;
        }
        let mut content_end = end;
        if let Some(hash) = data[..end].iter().position(|&b| b == b'#') {
            content_end = hash;
        }

        let mut next = end;
        if next < data.len() && data[next] == b'\r' {
            next += 1;
        }
        if next < data.len() && data[next] == b'\n' {
            next += 1;
        }
        self.remaining = &data[next..];

        &data[..content_end]
    }

    /// Read a fixed 80-byte binary description record. Not trimmed of
    /// trailing NUL padding; use [`crate::data::strutil::starts_with`] to
    /// compare against expected tokens.
    pub fn read_binary_line(&mut self) -> EResult<&'a [u8]> {
        self.take(BINARY_LINE_LEN)
    }

    /// Read a little-endian 32-bit signed integer.
    pub fn read_i32(&mut self) -> EResult<i32> {
        le_i32
            .parse_next(&mut self.remaining)
            .map_err(|_| self.bounds_error("byte reader i32", 4))
    }

    /// Read a little-endian 32-bit float.
    pub fn read_f32(&mut self) -> EResult<f32> {
        le_f32
            .parse_next(&mut self.remaining)
            .map_err(|_| self.bounds_error("byte reader f32", 4))
    }

    pub fn read_i32_array(&mut self, count: usize) -> EResult<Vec<i32>> {
        repeat(count, le_i32)
            .parse_next(&mut self.remaining)
            .map_err(|_| self.bounds_error("byte reader i32 array", count * 4))
    }

    pub fn read_f32_array(&mut self, count: usize) -> EResult<Vec<f32>> {
        repeat(count, le_f32)
            .parse_next(&mut self.remaining)
            .map_err(|_| self.bounds_error("byte reader f32 array", count * 4))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_line_strips_comment_and_terminator() {
        let mut r = ByteReader::new(b"hello # a comment\nworld\r\nlast");
        assert_eq!(r.read_line(), b"hello ");
        assert_eq!(r.read_line(), b"world");
        assert_eq!(r.read_line(), b"last");
        assert!(r.is_eof());
    }

    #[test]
    fn binary_line_is_exactly_80_bytes() {
        let mut data = b"C Binary".to_vec();
        data.resize(80, 0);
        data.extend_from_slice(&1i32.to_le_bytes());
        let mut r = ByteReader::new(&data);
        let line = r.read_binary_line().unwrap();
        assert_eq!(line.len(), BINARY_LINE_LEN);
        assert_eq!(r.read_i32().unwrap(), 1);
    }

    #[test]
    fn advance_out_of_bounds_errors() {
        let mut r = ByteReader::new(b"abc");
        assert!(r.advance(10).is_err());
    }

    #[test]
    fn le_integer_and_float_decode() {
        let mut data = Vec::new();
        data.extend_from_slice(&(-5i32).to_le_bytes());
        data.extend_from_slice(&1.5f32.to_le_bytes());
        let mut r = ByteReader::new(&data);
        assert_eq!(r.read_i32().unwrap(), -5);
        assert_eq!(r.read_f32().unwrap(), 1.5);
    }

    #[test]
    fn position_tracks_consumed_bytes() {
        let mut r = ByteReader::new(b"abcdefgh");
        r.advance(3).unwrap();
        assert_eq!(r.position(), 3);
        r.read_i32().unwrap();
        assert_eq!(r.position(), 7);
    }
}
