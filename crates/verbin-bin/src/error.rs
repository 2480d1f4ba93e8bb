//! Error types for binary structures.

use thiserror::Error;

/// Errors that can occur when building, reading or writing structures.
#[derive(Debug, Error)]
pub enum Error {
    /// Stream-level error (truncation, I/O).
    #[error("{0}")]
    Common(#[from] verbin_common::Error),

    /// A member with this name already exists.
    #[error("structure '{structure}' already has a member named '{name}'")]
    DuplicateName { structure: String, name: String },

    /// No member with this name exists.
    #[error("structure '{structure}' has no member named '{name}'")]
    NotFound { structure: String, name: String },

    /// The member exists but is not of the requested kind.
    #[error("member '{name}' is {actual}, expected {expected}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// Serialized span differs from the size holder's value.
    #[error("length mismatch for '{name}': declared {expected}, actual {actual}")]
    LengthMismatch {
        name: String,
        expected: u64,
        actual: u64,
    },

    /// Value does not fit the integer's width.
    #[error("value {value} does not fit in {width} bytes")]
    ValueOverflow { value: u64, width: usize },

    /// Wide strings are zero-terminated and cannot contain a zero unit.
    #[error("wide string contains an embedded NUL")]
    EmbeddedNul,
}

impl Error {
    /// Whether this error means the input ended early.
    pub fn is_truncated(&self) -> bool {
        matches!(self, Error::Common(e) if e.is_truncated())
    }
}

/// Result type for structure operations.
pub type Result<T> = std::result::Result<T, Error>;
