//! Error types for version records.

use thiserror::Error;

/// Errors that can occur when reading or writing version records.
#[derive(Debug, Error)]
pub enum Error {
    /// Structure-level error (truncation, lookup, value range).
    #[error("{0}")]
    Bin(#[from] verbin_bin::Error),

    /// A record does not start on a 4-byte boundary.
    #[error("record '{name}' starts at offset {offset}, which is not 4-byte aligned")]
    AlignmentViolation { name: String, offset: u64 },

    /// The decoded key differs from the expected signature.
    #[error("expected signature '{expected}', found '{actual}'")]
    SignatureMismatch { expected: String, actual: String },

    /// The serialized span differs from the declared `wLength`.
    #[error("actual length does not match declared length for '{name}': expected {expected}, actual {actual}")]
    LengthMismatch {
        name: String,
        expected: u64,
        actual: u64,
    },

    /// Records are read once; build a fresh one for each pass.
    #[error("record '{name}' has already been read")]
    AlreadyRead { name: String },
}

impl Error {
    /// Whether this error means the input ended early.
    pub fn is_truncated(&self) -> bool {
        matches!(self, Error::Bin(e) if e.is_truncated())
    }
}

impl From<verbin_common::Error> for Error {
    fn from(err: verbin_common::Error) -> Self {
        Error::Bin(err.into())
    }
}

/// Result type for version record operations.
pub type Result<T> = std::result::Result<T, Error>;
