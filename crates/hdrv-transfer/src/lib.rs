//! # hdrv-transfer
//!
//! Perceptual transfer functions (PTFs) and the codeword mapping tables
//! built from them.
//!
//! A PTF decides how integer codewords are distributed over physical
//! luminance. The quantizer works entirely from the discretized table, so
//! this crate's main product is [`TransferFunctionTable`].
//!
//! # Supported Transfer Functions
//!
//! | Function | Kind | Range |
//! |----------|------|-------|
//! | [`pq`] | SMPTE ST 2084 | [0, Lmax] cd/m2 |
//! | [`log`] | log10 spacing | [Lmin, Lmax] cd/m2 |
//! | linear | `Lmax * i / max` | [0, Lmax] cd/m2 |
//! | [`jnd`] Ferwerda | threshold-versus-intensity | fixed |
//! | [`jnd`] HDR-VDP | contrast sensitivity | fixed |
//!
//! # Usage
//!
//! ```rust
//! use hdrv_core::PtfKind;
//! use hdrv_transfer::TransferFunctionTable;
//!
//! let table = TransferFunctionTable::new(PtfKind::Log, 10, 0.005, 10000.0).unwrap();
//! let code = table.nearest_code(100.0);
//! assert!((table.lookup(code) - 100.0).abs() <= table.step_at(code));
//! ```
//!
//! # Dependencies
//!
//! - [`hdrv-core`] - PtfKind, errors, nearest-entry search
//!
//! # Used By
//!
//! - `hdrv-color` - PQ curve for the YCbCr path
//! - `hdrv-codec` - Quantizer

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod jnd;
pub mod log;
pub mod pq;
pub mod table;

pub use pq::{eotf as pq_eotf, oetf as pq_oetf};
pub use table::{MAX_BIT_DEPTH, TransferFunctionTable};
