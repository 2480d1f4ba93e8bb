//! Ordered structures of named members.
//!
//! A [`Structure`] lays its members out back to back in declaration order.
//! One integer member may be designated the *size holder*: its value must
//! equal the structure's total serialized width, which is validated after
//! reading and after writing to a positioned sink.

use std::io::{Read, Write};

use rustc_hash::FxHashMap;
use verbin_common::{OffsetReader, OffsetWriter, Sink};

use crate::{Error, Field, Integer, Padding, Result, WideString};

/// A structure member: either a primitive field or a nested structure.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Node {
    Field(Field),
    Structure(Structure),
}

impl Node {
    /// Short description used in type mismatch errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Field(f) => f.kind_name(),
            Node::Structure(_) => "a structure",
        }
    }

    /// Width when laid out starting at `offset`.
    pub fn size_at(&self, offset: u64) -> u64 {
        match self {
            Node::Field(f) => f.size_at(offset),
            Node::Structure(s) => s.size_at(offset),
        }
    }

    pub fn read<R: Read>(&mut self, reader: &mut OffsetReader<R>) -> Result<()> {
        match self {
            Node::Field(f) => f.read(reader),
            Node::Structure(s) => s.read(reader),
        }
    }

    pub fn write_to<W: Write>(&self, out: &mut OffsetWriter<W>) -> Result<()> {
        match self {
            Node::Field(f) => f.write(out),
            Node::Structure(s) => s.write_to(out),
        }
    }

    pub fn as_field(&self) -> Option<&Field> {
        match self {
            Node::Field(f) => Some(f),
            Node::Structure(_) => None,
        }
    }

    pub fn as_structure(&self) -> Option<&Structure> {
        match self {
            Node::Structure(s) => Some(s),
            Node::Field(_) => None,
        }
    }

    pub fn as_structure_mut(&mut self) -> Option<&mut Structure> {
        match self {
            Node::Structure(s) => Some(s),
            Node::Field(_) => None,
        }
    }
}

impl From<Field> for Node {
    fn from(value: Field) -> Self {
        Node::Field(value)
    }
}

impl From<Integer> for Node {
    fn from(value: Integer) -> Self {
        Node::Field(value.into())
    }
}

impl From<WideString> for Node {
    fn from(value: WideString) -> Self {
        Node::Field(value.into())
    }
}

impl From<Padding> for Node {
    fn from(value: Padding) -> Self {
        Node::Field(value.into())
    }
}

impl From<Structure> for Node {
    fn from(value: Structure) -> Self {
        Node::Structure(value)
    }
}

/// A named member of a [`Structure`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Member {
    name: String,
    node: Node,
}

impl Member {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn node_mut(&mut self) -> &mut Node {
        &mut self.node
    }
}

/// An ordered, named collection of fields and nested structures.
///
/// # Example
///
/// ```
/// use verbin_bin::{Integer, Padding, Structure, WideString};
///
/// let mut header = Structure::new("header");
/// header.add_member("length", Integer::word())?;
/// header.add_member("key", WideString::try_from("ABC")?)?;
/// header.add_member("padding", Padding::align(4))?;
/// header.set_size_holder("length")?;
///
/// header.fix_lengths()?;
/// assert_eq!(header.value("length")?, 12);
///
/// let mut out = Vec::new();
/// header.write(&mut out)?;
/// assert_eq!(out.len(), 12);
/// # Ok::<(), verbin_bin::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Structure {
    name: String,
    members: Vec<Member>,
    #[cfg_attr(feature = "serde", serde(skip))]
    index: FxHashMap<String, usize>,
    #[cfg_attr(feature = "serde", serde(skip))]
    size_holder: Option<usize>,
}

impl Structure {
    /// Create an empty structure.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
            index: FxHashMap::default(),
            size_holder: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Members in layout order.
    pub fn members(&self) -> impl Iterator<Item = &Member> {
        self.members.iter()
    }

    /// Append a member; its position in the layout is its insertion order.
    pub fn add_member(&mut self, name: impl Into<String>, node: impl Into<Node>) -> Result<()> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(Error::DuplicateName {
                structure: self.name.clone(),
                name,
            });
        }
        self.index.insert(name.clone(), self.members.len());
        self.members.push(Member {
            name,
            node: node.into(),
        });
        Ok(())
    }

    /// Builder-style member insertion.
    ///
    /// A member with the same name is replaced in place, keeping its layout
    /// position.
    pub fn with_member(mut self, name: impl Into<String>, node: impl Into<Node>) -> Self {
        let node = node.into();
        let is_integer = matches!(node, Node::Field(Field::Integer(_)));
        let idx = self.upsert(name.into(), node);
        if self.size_holder == Some(idx) && !is_integer {
            self.size_holder = None;
        }
        self
    }

    /// Builder-style size holder: inserts `holder` as with
    /// [`with_member`](Self::with_member) and designates it.
    pub fn with_size_holder(mut self, name: impl Into<String>, holder: Integer) -> Self {
        let idx = self.upsert(name.into(), holder.into());
        self.size_holder = Some(idx);
        self
    }

    /// Designate an integer member as the size holder.
    ///
    /// A structure has at most one; designating another replaces it.
    pub fn set_size_holder(&mut self, name: &str) -> Result<()> {
        let idx = self.position(name)?;
        let node = &self.members[idx].node;
        if !matches!(node, Node::Field(Field::Integer(_))) {
            return Err(Error::TypeMismatch {
                name: name.to_string(),
                expected: "an integer",
                actual: node.kind_name(),
            });
        }
        self.size_holder = Some(idx);
        Ok(())
    }

    /// Name of the size holder, if one is designated.
    pub fn size_holder(&self) -> Option<&str> {
        self.size_holder.map(|idx| self.members[idx].name.as_str())
    }

    /// Value of the size holder, if one is designated.
    pub fn declared_size(&self) -> Option<u64> {
        self.size_holder
            .and_then(|idx| self.members[idx].node.as_field())
            .and_then(Field::as_integer)
            .map(Integer::value)
    }

    pub fn member(&self, name: &str) -> Result<&Node> {
        let idx = self.position(name)?;
        Ok(&self.members[idx].node)
    }

    pub fn member_mut(&mut self, name: &str) -> Result<&mut Node> {
        let idx = self.position(name)?;
        Ok(&mut self.members[idx].node)
    }

    /// Decoded value of an integer member.
    pub fn value(&self, name: &str) -> Result<u64> {
        match self.member(name)? {
            Node::Field(Field::Integer(i)) => Ok(i.value()),
            other => Err(Error::TypeMismatch {
                name: name.to_string(),
                expected: "an integer",
                actual: other.kind_name(),
            }),
        }
    }

    pub fn set_value(&mut self, name: &str, value: u64) -> Result<()> {
        match self.member_mut(name)? {
            Node::Field(Field::Integer(i)) => i.set_value(value),
            other => Err(Error::TypeMismatch {
                name: name.to_string(),
                expected: "an integer",
                actual: other.kind_name(),
            }),
        }
    }

    /// Decoded value of a wide string member.
    pub fn string(&self, name: &str) -> Result<String> {
        self.wide_string(name).map(WideString::value)
    }

    pub fn wide_string(&self, name: &str) -> Result<&WideString> {
        match self.member(name)? {
            Node::Field(Field::WideString(s)) => Ok(s),
            other => Err(Error::TypeMismatch {
                name: name.to_string(),
                expected: "a wide string",
                actual: other.kind_name(),
            }),
        }
    }

    pub fn set_string(&mut self, name: &str, value: &str) -> Result<()> {
        match self.member_mut(name)? {
            Node::Field(Field::WideString(s)) => s.set_value(value),
            other => Err(Error::TypeMismatch {
                name: name.to_string(),
                expected: "a wide string",
                actual: other.kind_name(),
            }),
        }
    }

    /// Total width of all members, laid out from an aligned start.
    pub fn size_in_bytes(&self) -> u64 {
        self.size_at(0)
    }

    /// Total width when laid out starting at `offset`.
    pub fn size_at(&self, offset: u64) -> u64 {
        self.members
            .iter()
            .fold(offset, |at, m| at + m.node.size_at(at))
            - offset
    }

    /// Read all members and verify the size holder against the bytes consumed.
    pub fn read<R: Read>(&mut self, reader: &mut OffsetReader<R>) -> Result<()> {
        let start = reader.offset();
        self.read_members(reader)?;

        if let Some(declared) = self.declared_size() {
            let actual = reader.offset() - start;
            if actual != declared {
                return Err(Error::LengthMismatch {
                    name: self.name.clone(),
                    expected: declared,
                    actual,
                });
            }
        }
        Ok(())
    }

    /// Read all members in declaration order, without the size check.
    pub fn read_members<R: Read>(&mut self, reader: &mut OffsetReader<R>) -> Result<()> {
        tracing::trace!(structure = %self.name, offset = reader.offset(), "reading members");
        for member in &mut self.members {
            member.node.read(reader)?;
        }
        Ok(())
    }

    /// Write all members to `sink`.
    ///
    /// If the sink reports its position, the written span is checked against
    /// the size holder.
    pub fn write<S: Sink>(&self, sink: &mut S) -> Result<()> {
        let mut out = OffsetWriter::from_sink(sink);
        self.write_to(&mut out)
    }

    /// Write all members through an existing offset writer.
    pub fn write_to<W: Write>(&self, out: &mut OffsetWriter<W>) -> Result<()> {
        let start = out.position();
        self.write_members(out)?;

        if let (Some(start), Some(declared)) = (start, self.declared_size()) {
            let actual = out.offset() - start;
            if actual != declared {
                return Err(Error::LengthMismatch {
                    name: self.name.clone(),
                    expected: declared,
                    actual,
                });
            }
        }
        Ok(())
    }

    /// Write all members in declaration order, without the size check.
    pub fn write_members<W: Write>(&self, out: &mut OffsetWriter<W>) -> Result<()> {
        for member in &self.members {
            member.node.write_to(out)?;
        }
        Ok(())
    }

    /// Verify every size holder in this tree without serializing it.
    pub fn check_lengths(&self) -> Result<()> {
        self.check_lengths_at(0)
    }

    pub fn check_lengths_at(&self, offset: u64) -> Result<()> {
        self.check_member_lengths_at(offset)?;
        if let Some(declared) = self.declared_size() {
            let actual = self.size_at(offset);
            if actual != declared {
                return Err(Error::LengthMismatch {
                    name: self.name.clone(),
                    expected: declared,
                    actual,
                });
            }
        }
        Ok(())
    }

    /// Verify the size holders of nested structures only.
    pub fn check_member_lengths_at(&self, offset: u64) -> Result<()> {
        let mut at = offset;
        for member in &self.members {
            if let Node::Structure(s) = &member.node {
                s.check_lengths_at(at)?;
            }
            at += member.node.size_at(at);
        }
        Ok(())
    }

    /// Set every size holder in this tree to its computed width.
    pub fn fix_lengths(&mut self) -> Result<()> {
        self.fix_lengths_at(0)
    }

    pub fn fix_lengths_at(&mut self, offset: u64) -> Result<()> {
        self.fix_member_lengths_at(offset)?;
        if let Some(idx) = self.size_holder {
            let size = self.size_at(offset);
            if let Node::Field(Field::Integer(i)) = &mut self.members[idx].node {
                i.set_value(size)?;
            }
        }
        Ok(())
    }

    /// Fix the size holders of nested structures only.
    pub fn fix_member_lengths_at(&mut self, offset: u64) -> Result<()> {
        let mut at = offset;
        for member in &mut self.members {
            if let Node::Structure(s) = &mut member.node {
                s.fix_lengths_at(at)?;
            }
            at += member.node.size_at(at);
        }
        Ok(())
    }

    fn upsert(&mut self, name: String, node: Node) -> usize {
        if let Some(&idx) = self.index.get(&name) {
            self.members[idx].node = node;
            return idx;
        }
        let idx = self.members.len();
        self.index.insert(name.clone(), idx);
        self.members.push(Member { name, node });
        idx
    }

    fn position(&self, name: &str) -> Result<usize> {
        self.index.get(name).copied().ok_or_else(|| Error::NotFound {
            structure: self.name.clone(),
            name: name.to_string(),
        })
    }
}
