//! Byte order selection for fixed-width integers.

use std::io::{self, Write};

use byteorder::{BigEndian, ByteOrder, LittleEndian, WriteBytesExt};

/// Byte order of an encoded integer.
///
/// Resource records are always little-endian; big-endian is available for
/// structures embedded in other formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Endian {
    #[default]
    Little,
    Big,
}

impl Endian {
    /// Decode an unsigned integer occupying all of `buf` (1 to 8 bytes).
    #[inline]
    pub fn read_uint(self, buf: &[u8]) -> u64 {
        match self {
            Endian::Little => LittleEndian::read_uint(buf, buf.len()),
            Endian::Big => BigEndian::read_uint(buf, buf.len()),
        }
    }

    /// Encode `value` into exactly `width` bytes.
    ///
    /// The caller must ensure `value` fits in `width` bytes.
    #[inline]
    pub fn write_uint<W: Write + ?Sized>(self, out: &mut W, value: u64, width: usize) -> io::Result<()> {
        match self {
            Endian::Little => out.write_uint::<LittleEndian>(value, width),
            Endian::Big => out.write_uint::<BigEndian>(value, width),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_uint_orders() {
        let data = [0x01, 0x02];
        assert_eq!(Endian::Little.read_uint(&data), 0x0201);
        assert_eq!(Endian::Big.read_uint(&data), 0x0102);
    }

    #[test]
    fn test_write_uint_width() {
        let mut out = Vec::new();
        Endian::Little.write_uint(&mut out, 0x0304, 4).unwrap();
        Endian::Big.write_uint(&mut out, 0x0304, 2).unwrap();
        assert_eq!(out, [0x04, 0x03, 0x00, 0x00, 0x03, 0x04]);
    }
}
