//! Version-information record trees.
//!
//! Version resources are trees of records that share one header shape and
//! size themselves through their first field:
//!
//! - 2 bytes: `wLength`, the whole record including children
//! - 2 bytes: `wValueLength`
//! - 2 bytes: `wType`
//! - N bytes: `szKey`, zero-terminated UTF-16LE
//! - 0-3 bytes: padding up to the next 4-byte boundary
//! - kind-specific members
//! - child records, each starting on a 4-byte boundary
//!
//! A parent does not know what its children are. While reading, it asks its
//! [`ChildFactory`] for a fresh record per child position and keeps going
//! until it has consumed exactly `wLength` bytes.
//!
//! # Example
//!
//! ```
//! use verbin_common::OffsetReader;
//! use verbin_vi::VersionRecord;
//!
//! let mut root = VersionRecord::<()>::new("root").with_key("VS_VERSION_INFO")?;
//! root.add_child(VersionRecord::new("child").with_key("StringFileInfo")?);
//! root.fix_lengths()?;
//! let bytes = root.to_bytes()?;
//!
//! let mut parsed = VersionRecord::new("root")
//!     .expect_signature("VS_VERSION_INFO")
//!     .with_factory(|_: usize| VersionRecord::<()>::new("child"));
//! parsed.read(&mut OffsetReader::new(&bytes[..]))?;
//!
//! assert_eq!(parsed.children()[0].key(), "StringFileInfo");
//! # Ok::<(), verbin_vi::Error>(())
//! ```

mod error;
mod factory;
mod record;

pub use error::{Error, Result};
pub use factory::ChildFactory;
pub use record::{
    ReadState, RecordIter, VersionRecord, PADDING, RECORD_ALIGNMENT, SZ_KEY, W_LENGTH, W_TYPE,
    W_VALUE_LENGTH,
};
