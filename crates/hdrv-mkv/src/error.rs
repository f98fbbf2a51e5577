//! Container error types.

use thiserror::Error;

/// Result type for container operations.
pub type MkvResult<T> = Result<T, MkvError>;

/// Errors raised while writing or reading a Matroska stream.
#[derive(Debug, Error)]
pub enum MkvError {
    /// The stream does not start with a usable EBML header.
    #[error("invalid EBML header: {0}")]
    InvalidEbmlHeader(String),

    /// Variable-length integer with no length marker, or longer than 8 bytes.
    #[error("invalid variable-length integer (first byte 0x{first_byte:02X})")]
    InvalidVint {
        /// Leading byte that failed to decode.
        first_byte: u8,
    },

    /// Element ID longer than 4 bytes.
    #[error("invalid element ID (first byte 0x{first_byte:02X})")]
    InvalidElementId {
        /// Leading byte that failed to decode.
        first_byte: u8,
    },

    /// Value does not fit the requested vint width.
    #[error("value {value} does not fit in a {length}-byte vint")]
    VintOverflow {
        /// Value to encode.
        value: u64,
        /// Requested width in bytes.
        length: usize,
    },

    /// A different element was found where a specific one is required.
    #[error("expected element 0x{expected:X}, found 0x{found:X}")]
    UnexpectedElement {
        /// Element ID the caller needed.
        expected: u32,
        /// Element ID actually present.
        found: u32,
    },

    /// Element with unknown size where only sized elements are allowed.
    #[error("element 0x{id:X} has unknown size")]
    UnknownSize {
        /// Element ID.
        id: u32,
    },

    /// A required element is absent.
    #[error("missing required element: {0}")]
    MissingElement(String),

    /// Element payload that cannot be decoded as its type.
    #[error("invalid element value: {0}")]
    InvalidValue(String),

    /// Malformed Block or SimpleBlock payload.
    #[error("invalid block: {0}")]
    InvalidBlock(String),

    /// Operation not allowed in the current writer or reader state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Underlying stream failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MkvError {
    /// Creates an [`MkvError::InvalidState`].
    pub fn invalid_state(reason: impl Into<String>) -> Self {
        Self::InvalidState(reason.into())
    }

    /// Creates an [`MkvError::InvalidValue`].
    pub fn invalid_value(reason: impl Into<String>) -> Self {
        Self::InvalidValue(reason.into())
    }

    /// Creates an [`MkvError::InvalidBlock`].
    pub fn invalid_block(reason: impl Into<String>) -> Self {
        Self::InvalidBlock(reason.into())
    }

    /// Returns `true` for malformed or unexpected container structure.
    pub fn is_format(&self) -> bool {
        !matches!(self, Self::Io(_) | Self::InvalidState(_))
    }

    /// Returns `true` when the stream ended in the middle of a read.
    pub fn is_eof(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == std::io::ErrorKind::UnexpectedEof)
    }
}
