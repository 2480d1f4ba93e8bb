//! Binary field primitives.
//!
//! Fields are the leaves of a [`Structure`](crate::Structure): fixed-width
//! integers, zero-terminated UTF-16 strings and padding. Each one knows how to
//! read itself from an [`OffsetReader`], write itself to an [`OffsetWriter`]
//! and report its byte width at a given offset.

use std::io::{Read, Write};

use verbin_common::{Endian, OffsetReader, OffsetWriter};

use crate::{Error, Result};

/// Width of a fixed-width integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Width {
    U8,
    U16,
    U32,
    U64,
}

impl Width {
    /// Number of bytes on the wire.
    #[inline]
    pub const fn bytes(self) -> usize {
        match self {
            Width::U8 => 1,
            Width::U16 => 2,
            Width::U32 => 4,
            Width::U64 => 8,
        }
    }

    /// Largest value representable in this width.
    #[inline]
    pub const fn max_value(self) -> u64 {
        match self {
            Width::U8 => u8::MAX as u64,
            Width::U16 => u16::MAX as u64,
            Width::U32 => u32::MAX as u64,
            Width::U64 => u64::MAX,
        }
    }
}

/// An unsigned integer of fixed width and byte order.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Integer {
    width: Width,
    endian: Endian,
    value: u64,
}

impl Integer {
    /// Create a zero-valued integer.
    pub const fn new(width: Width, endian: Endian) -> Self {
        Self {
            width,
            endian,
            value: 0,
        }
    }

    /// A little-endian 16-bit word.
    pub const fn word() -> Self {
        Self::new(Width::U16, Endian::Little)
    }

    /// A little-endian 32-bit double word.
    pub const fn dword() -> Self {
        Self::new(Width::U32, Endian::Little)
    }

    /// Builder-style initial value.
    pub fn with_value(mut self, value: u64) -> Result<Self> {
        self.set_value(value)?;
        Ok(self)
    }

    pub fn width(&self) -> Width {
        self.width
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    /// Set the value, failing if it does not fit the width.
    pub fn set_value(&mut self, value: u64) -> Result<()> {
        if value > self.width.max_value() {
            return Err(Error::ValueOverflow {
                value,
                width: self.width.bytes(),
            });
        }
        self.value = value;
        Ok(())
    }

    #[inline]
    pub fn size_in_bytes(&self) -> u64 {
        self.width.bytes() as u64
    }

    pub fn read<R: Read>(&mut self, reader: &mut OffsetReader<R>) -> Result<()> {
        self.value = reader.read_uint(self.width.bytes(), self.endian)?;
        Ok(())
    }

    pub fn write<W: Write>(&self, out: &mut OffsetWriter<W>) -> Result<()> {
        out.write_uint(self.value, self.width.bytes(), self.endian)?;
        Ok(())
    }
}

/// A zero-terminated string of little-endian UTF-16 code units.
///
/// Raw code units are kept so that unpaired surrogates survive a round trip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct WideString {
    #[cfg_attr(feature = "serde", serde(rename = "value", serialize_with = "serialize_units"))]
    units: Vec<u16>,
}

impl WideString {
    /// Create an empty string.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from raw code units, which must not contain a zero unit.
    pub fn from_units(units: Vec<u16>) -> Result<Self> {
        if units.contains(&0) {
            return Err(Error::EmbeddedNul);
        }
        Ok(Self { units })
    }

    /// Code units, without the terminator.
    pub fn units(&self) -> &[u16] {
        &self.units
    }

    /// Decoded value; unpaired surrogates become U+FFFD.
    pub fn value(&self) -> String {
        String::from_utf16_lossy(&self.units)
    }

    pub fn set_value(&mut self, value: &str) -> Result<()> {
        if value.contains('\0') {
            return Err(Error::EmbeddedNul);
        }
        self.units = value.encode_utf16().collect();
        Ok(())
    }

    /// Whether the string equals `other` unit for unit.
    pub fn matches(&self, other: &str) -> bool {
        self.units.iter().copied().eq(other.encode_utf16())
    }

    /// `2 * (units + terminator)`.
    #[inline]
    pub fn size_in_bytes(&self) -> u64 {
        2 * (self.units.len() as u64 + 1)
    }

    pub fn read<R: Read>(&mut self, reader: &mut OffsetReader<R>) -> Result<()> {
        self.units.clear();
        loop {
            let unit = reader.read_u16(Endian::Little)?;
            if unit == 0 {
                break;
            }
            self.units.push(unit);
        }
        Ok(())
    }

    pub fn write<W: Write>(&self, out: &mut OffsetWriter<W>) -> Result<()> {
        for &unit in &self.units {
            out.write_uint(unit as u64, 2, Endian::Little)?;
        }
        out.write_uint(0, 2, Endian::Little)?;
        Ok(())
    }
}

impl TryFrom<&str> for WideString {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        let mut s = Self::new();
        s.set_value(value)?;
        Ok(s)
    }
}

#[cfg(feature = "serde")]
#[allow(clippy::ptr_arg)]
fn serialize_units<S: serde::Serializer>(units: &Vec<u16>, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&String::from_utf16_lossy(units))
}

/// How many filler bytes a [`Padding`] occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum PaddingRule {
    /// Always exactly this many bytes.
    Fixed(u64),
    /// As many bytes as needed to reach the next multiple of this boundary.
    Align(u64),
}

/// Filler bytes: ignored on read, zero on write.
///
/// Two paddings compare equal when their rules match, whatever width they last
/// resolved to.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Padding {
    rule: PaddingRule,
    /// Width consumed by the last read.
    resolved: u64,
}

impl Padding {
    pub const fn fixed(bytes: u64) -> Self {
        Self {
            rule: PaddingRule::Fixed(bytes),
            resolved: bytes,
        }
    }

    pub const fn align(boundary: u64) -> Self {
        Self {
            rule: PaddingRule::Align(boundary),
            resolved: 0,
        }
    }

    pub fn rule(&self) -> PaddingRule {
        self.rule
    }

    /// Width consumed by the most recent read.
    pub fn resolved_width(&self) -> u64 {
        self.resolved
    }

    /// Width when laid out starting at `offset`.
    pub fn width_at(&self, offset: u64) -> u64 {
        match self.rule {
            PaddingRule::Fixed(n) => n,
            PaddingRule::Align(boundary) if boundary > 1 => (boundary - offset % boundary) % boundary,
            PaddingRule::Align(_) => 0,
        }
    }

    pub fn read<R: Read>(&mut self, reader: &mut OffsetReader<R>) -> Result<()> {
        let width = self.width_at(reader.offset());
        reader.skip(width)?;
        self.resolved = width;
        Ok(())
    }

    pub fn write<W: Write>(&self, out: &mut OffsetWriter<W>) -> Result<()> {
        out.write_zeros(self.width_at(out.offset()))?;
        Ok(())
    }
}

impl PartialEq for Padding {
    fn eq(&self, other: &Self) -> bool {
        self.rule == other.rule
    }
}

impl Eq for Padding {}

/// Any primitive field.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "snake_case"))]
pub enum Field {
    Integer(Integer),
    WideString(WideString),
    Padding(Padding),
}

impl Field {
    /// Short description used in type mismatch errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Field::Integer(_) => "an integer",
            Field::WideString(_) => "a wide string",
            Field::Padding(_) => "padding",
        }
    }

    /// Width when laid out starting at `offset`.
    pub fn size_at(&self, offset: u64) -> u64 {
        match self {
            Field::Integer(i) => i.size_in_bytes(),
            Field::WideString(s) => s.size_in_bytes(),
            Field::Padding(p) => p.width_at(offset),
        }
    }

    pub fn read<R: Read>(&mut self, reader: &mut OffsetReader<R>) -> Result<()> {
        match self {
            Field::Integer(i) => i.read(reader),
            Field::WideString(s) => s.read(reader),
            Field::Padding(p) => p.read(reader),
        }
    }

    pub fn write<W: Write>(&self, out: &mut OffsetWriter<W>) -> Result<()> {
        match self {
            Field::Integer(i) => i.write(out),
            Field::WideString(s) => s.write(out),
            Field::Padding(p) => p.write(out),
        }
    }

    pub fn as_integer(&self) -> Option<&Integer> {
        match self {
            Field::Integer(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_integer_mut(&mut self) -> Option<&mut Integer> {
        match self {
            Field::Integer(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_wide_string(&self) -> Option<&WideString> {
        match self {
            Field::WideString(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_wide_string_mut(&mut self) -> Option<&mut WideString> {
        match self {
            Field::WideString(s) => Some(s),
            _ => None,
        }
    }
}

impl From<Integer> for Field {
    fn from(value: Integer) -> Self {
        Field::Integer(value)
    }
}

impl From<WideString> for Field {
    fn from(value: WideString) -> Self {
        Field::WideString(value)
    }
}

impl From<Padding> for Field {
    fn from(value: Padding) -> Self {
        Field::Padding(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(data: &[u8]) -> OffsetReader<&[u8]> {
        OffsetReader::new(data)
    }

    #[test]
    fn test_integer_read_orders() {
        let data = [0x34, 0x12, 0x00, 0x00, 0x00, 0x01];
        let mut r = reader(&data);

        let mut word = Integer::word();
        word.read(&mut r).unwrap();
        assert_eq!(word.value(), 0x1234);

        let mut big = Integer::new(Width::U32, Endian::Big);
        big.read(&mut r).unwrap();
        assert_eq!(big.value(), 1);
        assert_eq!(r.offset(), 6);
    }

    #[test]
    fn test_integer_truncated() {
        let data = [0x01];
        let mut word = Integer::word();
        let err = word.read(&mut reader(&data)).unwrap_err();
        assert!(err.is_truncated());
    }

    #[test]
    fn test_integer_overflow() {
        let mut byte = Integer::new(Width::U8, Endian::Little);
        assert!(byte.set_value(255).is_ok());
        assert!(matches!(
            byte.set_value(256),
            Err(Error::ValueOverflow { value: 256, width: 1 })
        ));
        assert_eq!(byte.value(), 255);
    }

    #[test]
    fn test_integer_write() {
        let mut out = OffsetWriter::new(Vec::new());
        Integer::dword().with_value(0xAABBCCDD).unwrap().write(&mut out).unwrap();
        assert_eq!(out.offset(), 4);
        assert_eq!(out.into_inner(), [0xDD, 0xCC, 0xBB, 0xAA]);
    }

    #[test]
    fn test_wide_string_read() {
        // "Hi" + terminator, then trailing data that must not be consumed
        let data = [b'H', 0, b'i', 0, 0, 0, 0xFF, 0xFF];
        let mut r = reader(&data);
        let mut s = WideString::new();
        s.read(&mut r).unwrap();

        assert_eq!(s.value(), "Hi");
        assert_eq!(s.size_in_bytes(), 6);
        assert_eq!(r.offset(), 6);
    }

    #[test]
    fn test_wide_string_missing_terminator() {
        let data = [b'H', 0, b'i', 0];
        let mut s = WideString::new();
        assert!(s.read(&mut reader(&data)).unwrap_err().is_truncated());
    }

    #[test]
    fn test_wide_string_write_and_match() {
        let s = WideString::try_from("Ab").unwrap();
        assert!(s.matches("Ab"));
        assert!(!s.matches("A"));

        let mut out = OffsetWriter::new(Vec::new());
        s.write(&mut out).unwrap();
        assert_eq!(out.into_inner(), [b'A', 0, b'b', 0, 0, 0]);
    }

    #[test]
    fn test_wide_string_rejects_nul() {
        assert!(matches!(WideString::try_from("a\0b"), Err(Error::EmbeddedNul)));
        assert!(matches!(WideString::from_units(vec![0x41, 0]), Err(Error::EmbeddedNul)));
    }

    #[test]
    fn test_wide_string_keeps_lone_surrogate() {
        let s = WideString::from_units(vec![0xD800, 0x41]).unwrap();
        let mut out = OffsetWriter::new(Vec::new());
        s.write(&mut out).unwrap();

        let bytes = out.into_inner();
        let mut back = WideString::new();
        back.read(&mut reader(&bytes)).unwrap();
        assert_eq!(back.units(), &[0xD800, 0x41]);
    }

    #[test]
    fn test_padding_widths() {
        let align = Padding::align(4);
        assert_eq!(align.width_at(0), 0);
        assert_eq!(align.width_at(10), 2);
        assert_eq!(align.width_at(11), 1);
        assert_eq!(Padding::fixed(3).width_at(10), 3);
    }

    #[test]
    fn test_padding_read_uses_offset() {
        let data = [0u8; 8];
        let mut r = OffsetReader::with_offset(&data[..], 6);
        let mut pad = Padding::align(4);
        pad.read(&mut r).unwrap();
        assert_eq!(pad.resolved_width(), 2);
        assert_eq!(r.offset(), 8);
    }

    #[test]
    fn test_padding_truncated() {
        let data = [0u8; 1];
        let mut pad = Padding::fixed(2);
        assert!(pad.read(&mut reader(&data)).unwrap_err().is_truncated());
    }

    #[test]
    fn test_padding_writes_zeros() {
        let mut out = OffsetWriter::new(Vec::new());
        out.write_bytes(&[0xFF; 5]).unwrap();
        Padding::align(4).write(&mut out).unwrap();
        assert_eq!(out.offset(), 8);
        assert_eq!(&out.into_inner()[5..], &[0, 0, 0]);
    }
}
