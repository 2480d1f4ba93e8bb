//! Error types for verbin-common.

use thiserror::Error;

/// Common error type for stream-level operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The source ended before a read could be satisfied.
    #[error("truncated input at offset {offset}: needed {needed} bytes but only {available} available")]
    Truncated {
        offset: u64,
        needed: usize,
        available: usize,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error means the input ended early.
    pub fn is_truncated(&self) -> bool {
        matches!(self, Error::Truncated { .. })
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
