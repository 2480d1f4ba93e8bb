//! Verbin - self-describing nested binary records.
//!
//! This crate provides a unified interface to the verbin library ecosystem.
//!
//! # Crates
//!
//! - [`verbin_common`] - Offset-tracking readers and writers, byte order
//! - [`verbin_bin`] - Field primitives and ordered structures
//! - [`verbin_vi`] - Version-information record trees
//!
//! # Example
//!
//! ```no_run
//! use verbin::prelude::*;
//!
//! let data = std::fs::read("version.bin")?;
//!
//! let mut root = VersionRecord::new("VS_VERSION_INFO")
//!     .expect_signature("VS_VERSION_INFO")
//!     .with_factory(|index: usize| VersionRecord::<()>::new(format!("child{index}")));
//! root.read(&mut OffsetReader::new(&data[..]))?;
//!
//! for record in root.iter() {
//!     println!("{} ({} bytes)", record.key(), record.total_length());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub use verbin_bin as bin;
pub use verbin_common as common;
pub use verbin_vi as vi;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use verbin_bin::{Field, Integer, Node, Padding, Structure, WideString, Width};
    pub use verbin_common::{Endian, OffsetReader, OffsetWriter, Sink, Unpositioned};
    pub use verbin_vi::{ChildFactory, ReadState, VersionRecord};
}

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
