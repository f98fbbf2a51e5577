//! Error types for color transforms.

use thiserror::Error;

/// Color transform error.
#[derive(Debug, Error)]
pub enum ColorError {
    /// Frame or configuration problem reported by the core types.
    #[error(transparent)]
    Core(#[from] hdrv_core::Error),

    /// Pre-scaling factor is zero, negative or not finite.
    #[error("invalid pre-scaling factor {0}")]
    InvalidScale(f32),
}

/// Result type for color operations.
pub type ColorResult<T> = Result<T, ColorError>;
