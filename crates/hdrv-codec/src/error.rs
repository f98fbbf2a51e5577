//! Error types for encode and decode sessions.
//!
//! Configuration problems (bad parameters, missing or malformed stream
//! metadata) are reported before any frame is processed. Container and
//! codec failures surface from the operation that hit them.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors from quantization, packing and encode/decode sessions.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Frame or table configuration error.
    #[error(transparent)]
    Core(#[from] hdrv_core::Error),

    /// Color transform error.
    #[error(transparent)]
    Color(#[from] hdrv_color::ColorError),

    /// Container error.
    #[error("container error: {0}")]
    Container(#[from] hdrv_mkv::MkvError),

    /// Encoder parameters failed validation.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    /// A required metadata attachment is absent from the stream.
    #[error("missing attachment {id} ({name})")]
    MissingAttachment {
        /// Attachment ID.
        id: u64,
        /// What the attachment holds.
        name: &'static str,
    },

    /// A metadata attachment could not be decoded.
    #[error("invalid attachment {id}: {reason}")]
    InvalidAttachment {
        /// Attachment ID.
        id: u64,
        /// What is wrong with it.
        reason: String,
    },

    /// Planar image does not match the packer geometry.
    #[error("image layout mismatch: {0}")]
    Layout(String),

    /// The bitstream codec failed.
    #[error("codec failure: {0}")]
    Adapter(String),

    /// Parameter file not found.
    #[error("parameter file not found: {path}")]
    ParamsNotFound {
        /// Path that was given.
        path: PathBuf,
    },

    /// YAML error in a parameter file.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CodecError {
    /// Creates a [`CodecError::InvalidParams`].
    pub fn invalid_params(reason: impl Into<String>) -> Self {
        Self::InvalidParams(reason.into())
    }

    /// Creates a [`CodecError::InvalidAttachment`].
    pub fn invalid_attachment(id: u64, reason: impl Into<String>) -> Self {
        Self::InvalidAttachment {
            id,
            reason: reason.into(),
        }
    }

    /// Creates a [`CodecError::Adapter`].
    pub fn adapter(reason: impl Into<String>) -> Self {
        Self::Adapter(reason.into())
    }

    /// Returns `true` for configuration errors, which abort session setup.
    pub fn is_config(&self) -> bool {
        match self {
            Self::InvalidParams(_)
            | Self::MissingAttachment { .. }
            | Self::InvalidAttachment { .. }
            | Self::ParamsNotFound { .. }
            | Self::Yaml(_) => true,
            Self::Core(e) => e.is_config(),
            Self::Color(hdrv_color::ColorError::Core(e)) => e.is_config(),
            _ => false,
        }
    }

    /// Returns `true` for malformed container structure.
    pub fn is_format(&self) -> bool {
        matches!(self, Self::Container(e) if e.is_format())
    }
}
