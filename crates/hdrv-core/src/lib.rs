//! # hdrv-core
//!
//! Core types for packaging HDR video through an integer-sample bitstream codec.
//!
//! This crate provides the foundational types used throughout hdrv-rs:
//!
//! - [`Frame`] - Planar floating-point frame buffer
//! - [`PtfKind`] - Perceptual transfer function selector
//! - [`ColorSpaceKind`] - Encoding color space selector
//! - [`Error`] - Shared configuration and geometry errors
//! - [`search::nearest_index`] - Nearest-entry lookup shared by quantization and seeking
//!
//! ## Crate Structure
//!
//! ```text
//! hdrv-core (this crate)
//!    ^
//!    |
//!    +-- hdrv-transfer (PTF mapping tables)
//!    +-- hdrv-color (color space transforms)
//!    +-- hdrv-mkv (Matroska container)
//!    +-- hdrv-codec (quantizer, packer, sessions)
//! ```
//!
//! Both kinds carry fixed numeric codes because they are persisted in the
//! container. See [`PtfKind::code`] and [`ColorSpaceKind::code`].

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod colorspace;
pub mod error;
pub mod frame;
pub mod ptf;
pub mod search;

pub use colorspace::ColorSpaceKind;
pub use error::{Error, Result};
pub use frame::Frame;
pub use ptf::PtfKind;

/// Prelude module for convenient imports.
///
/// ```
/// use hdrv_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::colorspace::ColorSpaceKind;
    pub use crate::error::{Error, Result};
    pub use crate::frame::Frame;
    pub use crate::ptf::PtfKind;
}
