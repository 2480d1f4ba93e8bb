//! Ordered binary structures for verbin.
//!
//! This crate describes binary layouts as trees of named members and reads or
//! writes them against the offset-tracking streams from `verbin-common`.
//!
//! # Building blocks
//!
//! - [`Integer`] - fixed-width unsigned integer, little- or big-endian
//! - [`WideString`] - zero-terminated UTF-16LE string
//! - [`Padding`] - fixed filler, or filler up to an alignment boundary
//! - [`Structure`] - ordered named members, with an optional size holder
//!
//! # Size holders
//!
//! A structure may designate one integer member whose value must equal the
//! structure's serialized width. The value is never patched during a write;
//! call [`Structure::fix_lengths`] after editing a tree, and
//! [`Structure::check_lengths`] to verify one without serializing it.

mod error;
mod field;
mod structure;

pub use error::{Error, Result};
pub use field::{Field, Integer, Padding, PaddingRule, WideString, Width};
pub use structure::{Member, Node, Structure};

pub use verbin_common::{Endian, OffsetReader, OffsetWriter, Sink, Unpositioned};
