//! # hdrv-color
//!
//! Color space transforms applied to whole frames before quantization and
//! after dequantization.
//!
//! Every encoding space keeps luminance (or a luminance-like value) in
//! channel 0 so the luminance PTF table can be used for it. Chroma channels
//! land in `[0, 1]` for Lu'v' and YCbCr.
//!
//! | Space | ch0 | ch1, ch2 |
//! |-------|-----|----------|
//! | Lu'v' | Y | u', v' scaled by 410/255 |
//! | YCbCr | PQ luma as luminance | Cb, Cr |
//! | XYZ | X | Y, Z |
//! | RGB | R | G, B |
//!
//! # Usage
//!
//! ```rust
//! use hdrv_color::ColorTransformer;
//! use hdrv_core::{ColorSpaceKind, Frame};
//!
//! let mut frame = Frame::test_pattern(4, 4).unwrap();
//! let t = ColorTransformer::new(ColorSpaceKind::Luv, 10000.0);
//! t.to_encoding(&mut frame, 1.0).unwrap();
//! t.to_rgb(&mut frame, 1.0).unwrap();
//! ```
//!
//! # Dependencies
//!
//! - [`hdrv-core`] - Frame, ColorSpaceKind
//! - [`hdrv-transfer`] - PQ curve
//! - [`glam`] - 3x3 matrices
//!
//! # Used By
//!
//! - `hdrv-codec` - Encoder and decoder sessions

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod transform;

pub use error::{ColorError, ColorResult};
pub use transform::{ColorTransformer, Direction, RGB_TO_XYZ, XYZ_TO_RGB};
