//! Sinks and the offset-tracking writer.
//!
//! A [`Sink`] is any [`Write`] that may be able to report its absolute
//! position. Writers that can (files, cursors, vectors) let serializers verify
//! alignment and declared lengths against real stream positions; writers that
//! cannot still serialize, the checks are simply skipped.

use std::fs::File;
use std::io::{self, BufWriter, Cursor, Seek, Write};

use crate::{Endian, Result};

/// A byte sink that may support position queries.
pub trait Sink: Write {
    /// Absolute position of the next byte to be written, if known.
    fn position(&mut self) -> Option<u64>;
}

impl Sink for Vec<u8> {
    #[inline]
    fn position(&mut self) -> Option<u64> {
        Some(self.len() as u64)
    }
}

impl<T> Sink for Cursor<T>
where
    Cursor<T>: Write,
{
    #[inline]
    fn position(&mut self) -> Option<u64> {
        Some(Cursor::position(self))
    }
}

impl Sink for File {
    fn position(&mut self) -> Option<u64> {
        self.stream_position().ok()
    }
}

impl<W: Write + Seek> Sink for BufWriter<W> {
    fn position(&mut self) -> Option<u64> {
        self.stream_position().ok()
    }
}

impl<S: Sink + ?Sized> Sink for &mut S {
    #[inline]
    fn position(&mut self) -> Option<u64> {
        (**self).position()
    }
}

/// Adapter that hides the position of any writer.
///
/// Useful for pipes and sockets, and for exercising the unpositioned write
/// path in tests.
#[derive(Debug)]
pub struct Unpositioned<W>(pub W);

impl<W> Unpositioned<W> {
    /// Unwrap the inner writer.
    pub fn into_inner(self) -> W {
        self.0
    }
}

impl<W: Write> Write for Unpositioned<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl<W: Write> Sink for Unpositioned<W> {
    #[inline]
    fn position(&mut self) -> Option<u64> {
        None
    }
}

/// A writer that tracks how many bytes have been emitted.
///
/// When built from a positioned [`Sink`] the offset is absolute; otherwise it
/// counts from zero at the point the writer was created.
#[derive(Debug)]
pub struct OffsetWriter<W> {
    inner: W,
    offset: u64,
    positioned: bool,
}

impl<W: Write> OffsetWriter<W> {
    /// Wrap a writer, counting from offset 0 with no absolute position.
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            offset: 0,
            positioned: false,
        }
    }

    /// Wrap a sink, taking its current position as the base if it has one.
    pub fn from_sink(mut inner: W) -> Self
    where
        W: Sink,
    {
        let base = inner.position();
        Self {
            inner,
            offset: base.unwrap_or(0),
            positioned: base.is_some(),
        }
    }

    /// Current offset.
    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Whether [`offset`](Self::offset) is an absolute stream position.
    #[inline]
    pub fn is_positioned(&self) -> bool {
        self.positioned
    }

    /// The absolute position, when known.
    #[inline]
    pub fn position(&self) -> Option<u64> {
        self.positioned.then_some(self.offset)
    }

    /// Write all of `data`.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.inner.write_all(data)?;
        self.offset += data.len() as u64;
        Ok(())
    }

    /// Write `value` as an unsigned integer of exactly `width` bytes.
    ///
    /// The caller must ensure `value` fits.
    pub fn write_uint(&mut self, value: u64, width: usize, endian: Endian) -> Result<()> {
        endian.write_uint(&mut self.inner, value, width)?;
        self.offset += width as u64;
        Ok(())
    }

    /// Write `count` zero bytes.
    pub fn write_zeros(&mut self, count: u64) -> Result<()> {
        const ZEROS: [u8; 64] = [0u8; 64];
        let mut left = count;
        while left > 0 {
            let chunk = left.min(ZEROS.len() as u64) as usize;
            self.write_bytes(&ZEROS[..chunk])?;
            left -= chunk as u64;
        }
        Ok(())
    }

    /// Unwrap the inner writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for OffsetWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.offset += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_and_cursor_positions() {
        let mut vec = vec![1u8, 2, 3];
        assert_eq!(Sink::position(&mut vec), Some(3));

        let mut cursor = Cursor::new(Vec::new());
        cursor.write_all(&[0; 5]).unwrap();
        assert_eq!(Sink::position(&mut cursor), Some(5));
    }

    #[test]
    fn test_unpositioned_hides_position() {
        let mut sink = Unpositioned(Vec::new());
        sink.write_all(b"abc").unwrap();
        assert_eq!(sink.position(), None);
        assert_eq!(sink.into_inner(), b"abc");
    }

    #[test]
    fn test_offset_writer_from_positioned_sink() {
        let mut out = vec![0u8; 8];
        let mut writer = OffsetWriter::from_sink(&mut out);
        assert!(writer.is_positioned());
        assert_eq!(writer.offset(), 8);

        writer.write_uint(0x1234, 2, Endian::Little).unwrap();
        writer.write_zeros(2).unwrap();
        assert_eq!(writer.position(), Some(12));
        assert_eq!(&out[8..], &[0x34, 0x12, 0, 0]);
    }

    #[test]
    fn test_offset_writer_from_unpositioned_sink() {
        let mut sink = Unpositioned(Vec::new());
        let mut writer = OffsetWriter::from_sink(&mut sink);
        assert!(!writer.is_positioned());
        writer.write_bytes(b"xyz").unwrap();
        assert_eq!(writer.offset(), 3);
        assert_eq!(writer.position(), None);
    }

    #[test]
    fn test_file_sink_position() {
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(&[0u8; 12]).unwrap();
        assert_eq!(Sink::position(&mut file), Some(12));

        let mut buffered = BufWriter::new(file);
        buffered.write_all(&[0u8; 4]).unwrap();
        assert_eq!(Sink::position(&mut buffered), Some(16));
    }
}
