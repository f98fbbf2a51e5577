//! Error types for hdrv-core operations.
//!
//! Covers the failure modes shared by every stage of the HDR video pipeline:
//! invalid session configuration, frame geometry problems and unknown
//! enumeration codes read back from a stream.
//!
//! # Usage
//!
//! ```rust
//! use hdrv_core::{Error, Result};
//!
//! fn check_even(width: usize, height: usize) -> Result<()> {
//!     if width % 2 != 0 || height % 2 != 0 {
//!         return Err(Error::invalid_dimensions(width, height, "must be even"));
//!     }
//!     Ok(())
//! }
//!
//! assert!(check_even(3, 2).is_err());
//! ```
//!
//! # Dependencies
//!
//! - [`thiserror`] - For derive macro error implementation
//!
//! # Used By
//!
//! - [`crate::frame::Frame`] - Buffer construction
//! - `hdrv-transfer` - Table construction
//! - `hdrv-color` - Color space dispatch
//! - `hdrv-codec` - Session setup

use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the core pipeline types.
///
/// # Categories
///
/// - **Configuration errors**: [`Config`](Error::Config),
///   [`UnknownPtf`](Error::UnknownPtf), [`UnknownColorSpace`](Error::UnknownColorSpace)
/// - **Geometry errors**: [`InvalidDimensions`](Error::InvalidDimensions),
///   [`ChannelMismatch`](Error::ChannelMismatch), [`BufferSize`](Error::BufferSize)
/// - **I/O errors**: [`Io`](Error::Io)
#[derive(Debug, Error)]
pub enum Error {
    /// Session configuration is invalid.
    ///
    /// Fatal at session start; no frame is processed with a bad configuration.
    #[error("configuration error: {reason}")]
    Config {
        /// What is wrong with the configuration
        reason: String,
    },

    /// Numeric transfer function code is not one of the known kinds.
    #[error("unknown transfer function code {code}")]
    UnknownPtf {
        /// Code read from the stream or given by the caller
        code: u32,
    },

    /// Numeric color space code is not one of the known kinds.
    #[error("unknown color space code {code}")]
    UnknownColorSpace {
        /// Code read from the stream or given by the caller
        code: u32,
    },

    /// Frame dimensions are unusable.
    ///
    /// Zero-sized frames, and odd sizes where chroma subsampling needs
    /// 2x2 quads, end up here.
    #[error("invalid dimensions: {width}x{height} ({reason})")]
    InvalidDimensions {
        /// Requested width
        width: usize,
        /// Requested height
        height: usize,
        /// Reason why dimensions are invalid
        reason: String,
    },

    /// Channel count differs from what the operation needs.
    #[error("channel mismatch: expected {expected}, got {got}")]
    ChannelMismatch {
        /// Expected channel count
        expected: usize,
        /// Actual channel count
        got: usize,
    },

    /// Sample buffer length does not match `channels * height * width`.
    #[error("buffer size mismatch: expected {expected} samples, got {got}")]
    BufferSize {
        /// Expected number of samples
        expected: usize,
        /// Actual number of samples
        got: usize,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Creates an [`Error::Config`] error.
    #[inline]
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Creates an [`Error::InvalidDimensions`] error.
    #[inline]
    pub fn invalid_dimensions(width: usize, height: usize, reason: impl Into<String>) -> Self {
        Self::InvalidDimensions {
            width,
            height,
            reason: reason.into(),
        }
    }

    /// Creates an [`Error::ChannelMismatch`] error.
    #[inline]
    pub fn channel_mismatch(expected: usize, got: usize) -> Self {
        Self::ChannelMismatch { expected, got }
    }

    /// Returns `true` if this error means the session configuration is unusable.
    #[inline]
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::Config { .. }
                | Self::UnknownPtf { .. }
                | Self::UnknownColorSpace { .. }
                | Self::InvalidDimensions { .. }
        )
    }

    /// Returns `true` if this is an I/O error.
    #[inline]
    pub fn is_io_error(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_dimensions() {
        let err = Error::invalid_dimensions(641, 480, "width must be even");
        let msg = err.to_string();
        assert!(msg.contains("641x480"));
        assert!(msg.contains("even"));
        assert!(err.is_config());
    }

    #[test]
    fn test_unknown_codes_are_config() {
        assert!(Error::UnknownPtf { code: 9 }.is_config());
        assert!(Error::UnknownColorSpace { code: 7 }.is_config());
        assert!(!Error::channel_mismatch(3, 1).is_config());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.is_io_error());
    }
}
