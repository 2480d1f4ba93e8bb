//! Version records.
//!
//! A version record is a self-sized header followed by nested records of the
//! same shape:
//!
//! ```text
//! [wLength:u16][wValueLength:u16][wType:u16][szKey:UTF-16LE + NUL][pad to 4][members...][children...]
//! ```
//!
//! `wLength` covers the whole record including its children. Every record
//! starts on a 4-byte boundary.

use std::fmt;
use std::io::{Read, Write};
use std::sync::Arc;

use verbin_bin::{Integer, Node, Padding, Structure, WideString};
use verbin_common::{OffsetReader, OffsetWriter, Sink};

use crate::{ChildFactory, Error, Result};

/// Name of the total length member (the size holder).
pub const W_LENGTH: &str = "wLength";
/// Name of the value length member.
pub const W_VALUE_LENGTH: &str = "wValueLength";
/// Name of the type tag member.
pub const W_TYPE: &str = "wType";
/// Name of the signature key member.
pub const SZ_KEY: &str = "szKey";
/// Name of the alignment padding after the key.
pub const PADDING: &str = "Padding";

/// Every record starts on a multiple of this.
pub const RECORD_ALIGNMENT: u64 = 4;

/// Progress of a single read pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReadState {
    #[default]
    Unread,
    HeaderValidated,
    ChildrenParsed,
    Complete,
}

/// A version-information record.
///
/// `K` is a caller-chosen discriminator for the concrete record kind, set by
/// whoever constructs the record (usually a [`ChildFactory`]).
///
/// # Example
///
/// ```
/// use verbin_common::OffsetReader;
/// use verbin_vi::VersionRecord;
///
/// let mut root = VersionRecord::<()>::new("VS_VERSION_INFO").with_key("AB")?;
/// root.fix_lengths()?;
/// assert_eq!(root.total_length(), 12);
///
/// let bytes = root.to_bytes()?;
///
/// let mut parsed = VersionRecord::<()>::new("VS_VERSION_INFO").expect_signature("AB");
/// parsed.read(&mut OffsetReader::new(&bytes[..]))?;
/// assert_eq!(parsed, root);
/// # Ok::<(), verbin_vi::Error>(())
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct VersionRecord<K = ()> {
    header: Structure,
    kind: K,
    #[cfg_attr(feature = "serde", serde(skip))]
    expected_signature: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip))]
    factory: Option<Arc<dyn ChildFactory<K>>>,
    #[cfg_attr(feature = "serde", serde(skip))]
    opaque_body: bool,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Vec::is_empty"))]
    body: Vec<u8>,
    children: Vec<VersionRecord<K>>,
    #[cfg_attr(feature = "serde", serde(skip))]
    state: ReadState,
    #[cfg_attr(feature = "serde", serde(skip))]
    start_offset: Option<u64>,
}

impl<K: Default> VersionRecord<K> {
    /// Create an empty leaf record of the default kind.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_kind(name, K::default())
    }
}

impl<K> VersionRecord<K> {
    /// Create an empty leaf record of the given kind.
    pub fn with_kind(name: impl Into<String>, kind: K) -> Self {
        let header = Structure::new(name)
            .with_size_holder(W_LENGTH, Integer::word())
            .with_member(W_VALUE_LENGTH, Integer::word())
            .with_member(W_TYPE, Integer::word())
            .with_member(SZ_KEY, WideString::new())
            .with_member(PADDING, Padding::align(RECORD_ALIGNMENT));

        Self {
            header,
            kind,
            expected_signature: None,
            factory: None,
            opaque_body: false,
            body: Vec::new(),
            children: Vec::new(),
            state: ReadState::Unread,
            start_offset: None,
        }
    }

    /// Require the decoded key to equal `signature` when reading.
    pub fn expect_signature(mut self, signature: impl Into<String>) -> Self {
        self.expected_signature = Some(signature.into());
        self
    }

    /// Parse children with `factory` when reading.
    pub fn with_factory(mut self, factory: impl ChildFactory<K> + 'static) -> Self {
        self.factory = Some(Arc::new(factory));
        self
    }

    /// Share one factory between several records.
    pub fn with_shared_factory(mut self, factory: Arc<dyn ChildFactory<K>>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Keep everything after the header as raw bytes when reading without a
    /// factory, instead of requiring the header to fill `wLength`.
    pub fn with_opaque_body(mut self) -> Self {
        self.opaque_body = true;
        self
    }

    /// Builder-style key.
    pub fn with_key(mut self, key: &str) -> Result<Self> {
        self.set_key(key)?;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        self.header.name()
    }

    pub fn kind(&self) -> &K {
        &self.kind
    }

    pub fn set_kind(&mut self, kind: K) {
        self.kind = kind;
    }

    pub fn expected_signature(&self) -> Option<&str> {
        self.expected_signature.as_deref()
    }

    pub fn has_factory(&self) -> bool {
        self.factory.is_some()
    }

    /// Raw bytes between the header and the children.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn set_body(&mut self, body: Vec<u8>) {
        self.body = body;
    }

    pub fn state(&self) -> ReadState {
        self.state
    }

    /// Absolute offset the last read started at.
    pub fn start_offset(&self) -> Option<u64> {
        self.start_offset
    }

    /// The header structure, including any kind-specific members.
    pub fn header(&self) -> &Structure {
        &self.header
    }

    pub fn header_mut(&mut self) -> &mut Structure {
        &mut self.header
    }

    /// Append a kind-specific member after the fixed header.
    pub fn add_member(&mut self, name: impl Into<String>, node: impl Into<Node>) -> Result<()> {
        self.header.add_member(name, node)?;
        Ok(())
    }

    /// Decoded value of an integer member.
    pub fn value(&self, name: &str) -> Result<u64> {
        Ok(self.header.value(name)?)
    }

    pub fn set_value(&mut self, name: &str, value: u64) -> Result<()> {
        Ok(self.header.set_value(name, value)?)
    }

    pub fn total_length(&self) -> u16 {
        self.word(W_LENGTH)
    }

    pub fn set_total_length(&mut self, value: u16) -> Result<()> {
        self.set_value(W_LENGTH, value as u64)
    }

    pub fn value_length(&self) -> u16 {
        self.word(W_VALUE_LENGTH)
    }

    pub fn set_value_length(&mut self, value: u16) -> Result<()> {
        self.set_value(W_VALUE_LENGTH, value as u64)
    }

    pub fn type_tag(&self) -> u16 {
        self.word(W_TYPE)
    }

    pub fn set_type_tag(&mut self, value: u16) -> Result<()> {
        self.set_value(W_TYPE, value as u64)
    }

    /// Decoded signature key.
    pub fn key(&self) -> String {
        // szKey is part of the fixed header and only ever holds a wide string
        self.header.string(SZ_KEY).unwrap_or_default()
    }

    pub fn set_key(&mut self, key: &str) -> Result<()> {
        Ok(self.header.set_string(SZ_KEY, key)?)
    }

    pub fn children(&self) -> &[VersionRecord<K>] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut [VersionRecord<K>] {
        &mut self.children
    }

    pub fn child(&self, index: usize) -> Option<&VersionRecord<K>> {
        self.children.get(index)
    }

    /// First direct child whose key equals `key`.
    pub fn find_child(&self, key: &str) -> Option<&VersionRecord<K>> {
        self.children.iter().find(|c| c.key_matches(key))
    }

    pub fn add_child(&mut self, child: VersionRecord<K>) {
        self.children.push(child);
    }

    /// Replace the whole child list.
    pub fn set_children(&mut self, children: Vec<VersionRecord<K>>) {
        self.children = children;
    }

    /// Number of records in this tree, including self.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(|c| c.count()).sum::<usize>()
    }

    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(|c| c.depth()).max().unwrap_or(0)
    }

    /// Pre-order traversal of this tree.
    pub fn iter(&self) -> RecordIter<'_, K> {
        RecordIter { stack: vec![self] }
    }

    /// Serialized width, laid out from an aligned start.
    pub fn size_in_bytes(&self) -> u64 {
        self.size_at(0)
    }

    /// Serialized width when laid out starting at `offset`.
    pub fn size_at(&self, offset: u64) -> u64 {
        let header_end = offset + self.body_end(offset);
        self.children
            .iter()
            .fold(header_end, |at, child| at + child.size_at(at))
            - offset
    }

    /// Verify every `wLength` in this tree against the computed widths.
    pub fn check_lengths(&self) -> Result<()> {
        self.check_lengths_at(0)
    }

    pub fn check_lengths_at(&self, offset: u64) -> Result<()> {
        self.header.check_member_lengths_at(offset)?;

        let mut at = offset + self.body_end(offset);
        for child in &self.children {
            child.check_lengths_at(at)?;
            at += child.size_at(at);
        }

        let expected = self.total_length() as u64;
        let actual = at - offset;
        if actual != expected {
            return Err(Error::LengthMismatch {
                name: self.name().to_string(),
                expected,
                actual,
            });
        }
        Ok(())
    }

    /// Set every `wLength` in this tree to its computed width.
    ///
    /// Writing never does this implicitly.
    pub fn fix_lengths(&mut self) -> Result<()> {
        self.fix_lengths_at(0)
    }

    pub fn fix_lengths_at(&mut self, offset: u64) -> Result<()> {
        self.header.fix_member_lengths_at(offset)?;

        let mut at = offset + self.body_end(offset);
        for child in &mut self.children {
            child.fix_lengths_at(at)?;
            at += child.size_at(at);
        }

        self.set_value(W_LENGTH, at - offset)
    }

    /// Read this record and, if it has a factory, its children.
    ///
    /// Without a factory the header must span exactly `wLength`, unless the
    /// record keeps an opaque body. A record is read at most once; construct
    /// a fresh one per pass.
    pub fn read<R: Read>(&mut self, reader: &mut OffsetReader<R>) -> Result<()> {
        if self.state != ReadState::Unread {
            return Err(Error::AlreadyRead {
                name: self.name().to_string(),
            });
        }

        let start = reader.offset();
        if start % RECORD_ALIGNMENT != 0 {
            return Err(Error::AlignmentViolation {
                name: self.name().to_string(),
                offset: start,
            });
        }
        self.start_offset = Some(start);
        self.body.clear();
        self.children.clear();

        self.header.read_members(reader)?;
        self.validate_signature()?;
        self.state = ReadState::HeaderValidated;

        let length = self.total_length() as u64;
        tracing::debug!(
            record = %self.name(),
            key = %self.key(),
            offset = start,
            length,
            "record header validated"
        );

        let end = start + length;
        self.check_bound(reader.offset(), start, end)?;

        if let Some(factory) = self.factory.clone() {
            let mut index = 0;
            while reader.offset() < end {
                let mut child = factory.create_child(index);
                tracing::trace!(parent = %self.name(), index, offset = reader.offset(), "reading child");
                child.read(reader)?;
                self.check_bound(reader.offset(), start, end)?;
                self.children.push(child);
                index += 1;
            }
        } else if self.opaque_body {
            let mut body = vec![0u8; (end - reader.offset()) as usize];
            reader.read_bytes(&mut body)?;
            self.body = body;
        } else if reader.offset() != end {
            return Err(Error::LengthMismatch {
                name: self.name().to_string(),
                expected: length,
                actual: reader.offset() - start,
            });
        }
        self.state = ReadState::ChildrenParsed;

        tracing::debug!(
            record = %self.name(),
            children = self.children.len(),
            "record read"
        );
        self.state = ReadState::Complete;
        Ok(())
    }

    /// Serialize this tree into `sink`.
    ///
    /// If the sink reports its position, the record start must be aligned and
    /// the written span must equal `wLength`.
    pub fn write<S: Sink>(&self, sink: &mut S) -> Result<()> {
        let mut out = OffsetWriter::from_sink(sink);
        self.write_to(&mut out)
    }

    /// Serialize through an existing offset writer.
    pub fn write_to<W: Write>(&self, out: &mut OffsetWriter<W>) -> Result<()> {
        let start = out.position();
        if let Some(start) = start {
            if start % RECORD_ALIGNMENT != 0 {
                return Err(Error::AlignmentViolation {
                    name: self.name().to_string(),
                    offset: start,
                });
            }
        }

        self.header.write_members(out)?;
        out.write_bytes(&self.body)?;
        for child in &self.children {
            child.write_to(out)?;
        }

        if let Some(start) = start {
            let expected = self.total_length() as u64;
            let actual = out.offset() - start;
            if actual != expected {
                return Err(Error::LengthMismatch {
                    name: self.name().to_string(),
                    expected,
                    actual,
                });
            }
        }

        tracing::debug!(
            record = %self.name(),
            offset = ?start,
            length = self.total_length(),
            children = self.children.len(),
            "record written"
        );
        Ok(())
    }

    /// Serialize into a new buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(self.size_in_bytes() as usize);
        self.write(&mut bytes)?;
        Ok(bytes)
    }

    // The fixed header words always exist and are 16 bits wide.
    fn word(&self, name: &str) -> u16 {
        self.header.value(name).map(|v| v as u16).unwrap_or(0)
    }

    fn body_end(&self, offset: u64) -> u64 {
        self.header.size_at(offset) + self.body.len() as u64
    }

    fn key_matches(&self, key: &str) -> bool {
        self.header
            .wide_string(SZ_KEY)
            .is_ok_and(|s| s.matches(key))
    }

    fn validate_signature(&self) -> Result<()> {
        let Some(expected) = &self.expected_signature else {
            return Ok(());
        };
        let key = self.header.wide_string(SZ_KEY)?;
        if !key.matches(expected) {
            return Err(Error::SignatureMismatch {
                expected: expected.clone(),
                actual: key.value(),
            });
        }
        Ok(())
    }

    fn check_bound(&self, offset: u64, start: u64, end: u64) -> Result<()> {
        if offset > end {
            return Err(Error::LengthMismatch {
                name: self.name().to_string(),
                expected: end - start,
                actual: offset - start,
            });
        }
        Ok(())
    }
}

impl<K: Clone> Clone for VersionRecord<K> {
    fn clone(&self) -> Self {
        Self {
            header: self.header.clone(),
            kind: self.kind.clone(),
            expected_signature: self.expected_signature.clone(),
            factory: self.factory.clone(),
            opaque_body: self.opaque_body,
            body: self.body.clone(),
            children: self.children.clone(),
            state: self.state,
            start_offset: self.start_offset,
        }
    }
}

/// Records are equal when their fields, kinds, bodies and children are; read
/// state and factories are not compared.
impl<K: PartialEq> PartialEq for VersionRecord<K> {
    fn eq(&self, other: &Self) -> bool {
        self.header == other.header
            && self.kind == other.kind
            && self.body == other.body
            && self.children == other.children
    }
}

impl<K: fmt::Debug> fmt::Debug for VersionRecord<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionRecord")
            .field("header", &self.header)
            .field("kind", &self.kind)
            .field("expected_signature", &self.expected_signature)
            .field("has_factory", &self.factory.is_some())
            .field("body_len", &self.body.len())
            .field("children", &self.children)
            .field("state", &self.state)
            .field("start_offset", &self.start_offset)
            .finish()
    }
}

/// Pre-order iterator over a record tree.
pub struct RecordIter<'a, K> {
    stack: Vec<&'a VersionRecord<K>>,
}

impl<'a, K> Iterator for RecordIter<'a, K> {
    type Item = &'a VersionRecord<K>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.stack.pop()?;
        // Reverse so children come out left-to-right
        self.stack.extend(record.children.iter().rev());
        Some(record)
    }
}
