//! Common utilities for verbin.
//!
//! This crate provides the stream plumbing shared by every verbin crate:
//!
//! - [`OffsetReader`] - Forward-only reader that counts consumed bytes
//! - [`OffsetWriter`] - Writer that counts emitted bytes from a base offset
//! - [`Sink`] - A writer that may be able to report its absolute position
//! - [`Endian`] - Byte order selector for fixed-width integers

mod endian;
mod error;
mod reader;
mod writer;

pub use endian::Endian;
pub use error::{Error, Result};
pub use reader::OffsetReader;
pub use writer::{OffsetWriter, Sink, Unpositioned};
