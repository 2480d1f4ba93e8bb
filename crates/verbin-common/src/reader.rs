//! Offset-tracking reader.
//!
//! This module provides [`OffsetReader`], a forward-only cursor over any
//! [`Read`] source that knows how many bytes it has consumed. Nested parsers
//! use the offset to bound themselves against a declared length.

use std::io::{self, Read};

use crate::{Endian, Error, Result};

/// A reader that tracks the number of bytes consumed from its source.
///
/// No seeking is supported; the offset only ever moves forward, by exactly the
/// number of bytes each read consumed.
///
/// # Example
///
/// ```
/// use verbin_common::{Endian, OffsetReader};
///
/// let data = [0x01, 0x02, 0x03, 0x04];
/// let mut reader = OffsetReader::new(&data[..]);
///
/// assert_eq!(reader.read_u16(Endian::Little).unwrap(), 0x0201);
/// assert_eq!(reader.offset(), 2);
/// ```
#[derive(Debug)]
pub struct OffsetReader<R> {
    inner: R,
    offset: u64,
}

impl<R: Read> OffsetReader<R> {
    /// Wrap a source whose first byte is at offset 0.
    #[inline]
    pub fn new(inner: R) -> Self {
        Self { inner, offset: 0 }
    }

    /// Wrap a source whose next byte sits at absolute offset `offset`.
    ///
    /// Use this when the source was already positioned inside a larger file,
    /// so alignment is judged against the file and not the slice.
    #[inline]
    pub fn with_offset(inner: R, offset: u64) -> Self {
        Self { inner, offset }
    }

    /// Number of bytes consumed so far (plus the starting offset).
    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Get a reference to the underlying source.
    #[inline]
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Unwrap the underlying source.
    #[inline]
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Fill `buf` completely or fail with [`Error::Truncated`].
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> Result<()> {
        let start = self.offset;
        let mut filled = 0;

        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.offset += filled as u64;
                    return Err(e.into());
                }
            }
        }

        self.offset += filled as u64;

        if filled < buf.len() {
            return Err(Error::Truncated {
                offset: start,
                needed: buf.len(),
                available: filled,
            });
        }
        Ok(())
    }

    /// Read an unsigned integer of `width` bytes (1 to 8).
    #[inline]
    pub fn read_uint(&mut self, width: usize, endian: Endian) -> Result<u64> {
        debug_assert!((1..=8).contains(&width));
        let mut buf = [0u8; 8];
        self.read_bytes(&mut buf[..width])?;
        Ok(endian.read_uint(&buf[..width]))
    }

    /// Read a u16.
    #[inline]
    pub fn read_u16(&mut self, endian: Endian) -> Result<u16> {
        self.read_uint(2, endian).map(|v| v as u16)
    }

    /// Consume and discard `count` bytes.
    pub fn skip(&mut self, count: u64) -> Result<()> {
        let mut scratch = [0u8; 64];
        let mut left = count;
        while left > 0 {
            let chunk = left.min(scratch.len() as u64) as usize;
            self.read_bytes(&mut scratch[..chunk])?;
            left -= chunk as u64;
        }
        Ok(())
    }
}

impl<R: Read> Read for OffsetReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.offset += n as u64;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_advances_by_consumed() {
        let data = [0x01u8, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07];
        let mut reader = OffsetReader::new(&data[..]);

        assert_eq!(reader.offset(), 0);
        assert_eq!(reader.read_uint(1, Endian::Little).unwrap(), 0x01);
        assert_eq!(reader.offset(), 1);
        assert_eq!(reader.read_uint(4, Endian::Big).unwrap(), 0x02030405);
        assert_eq!(reader.offset(), 5);
        reader.skip(2).unwrap();
        assert_eq!(reader.offset(), 7);
    }

    #[test]
    fn test_truncated_u16() {
        let data = [0xAA];
        let mut reader = OffsetReader::new(&data[..]);

        let err = reader.read_u16(Endian::Little).unwrap_err();
        assert!(err.is_truncated());
        match err {
            Error::Truncated {
                offset,
                needed,
                available,
            } => {
                assert_eq!(offset, 0);
                assert_eq!(needed, 2);
                assert_eq!(available, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_with_offset() {
        let data = [0x00, 0x00];
        let mut reader = OffsetReader::with_offset(&data[..], 40);
        reader.read_u16(Endian::Little).unwrap();
        assert_eq!(reader.offset(), 42);
    }

    #[test]
    fn test_skip_past_end() {
        let data = [0u8; 100];
        let mut reader = OffsetReader::new(&data[..]);
        assert!(reader.skip(101).unwrap_err().is_truncated());
        assert_eq!(reader.offset(), 100);
    }

    #[test]
    fn test_read_trait_counts() {
        let data = b"abcdef";
        let mut reader = OffsetReader::new(&data[..]);
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).unwrap();
        assert_eq!(reader.offset(), 6);
    }
}
