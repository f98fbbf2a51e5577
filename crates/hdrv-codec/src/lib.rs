//! # hdrv-codec
//!
//! Encode and decode sessions for HDR video in Matroska.
//!
//! Encoding converts linear RGB frames to the encoding color space,
//! quantizes every channel to integer codewords, packs them into the byte
//! planes a video codec expects and stores the codec's packets together with
//! the quantizer settings. Decoding runs the same chain backwards.
//!
//! # Modules
//!
//! - [`quantizer`] - value to codeword mapping
//! - [`packer`] - codeword planes to codec byte planes
//! - [`adapter`] - [`CodecAdapter`] interface and [`RawCodec`]
//! - [`metadata`] - quantizer settings as attachments 430 to 436
//! - [`params`] - [`EncoderParams`] with YAML load/save
//! - [`encoder`], [`decoder`] - sessions
//!
//! # Usage
//!
//! ```rust
//! use std::io::Cursor;
//! use hdrv_codec::{Decoder, Encoder, EncoderParams, RawCodec};
//! use hdrv_core::Frame;
//!
//! let params = EncoderParams { keyframe_interval: 10, ..Default::default() };
//! let mut enc = Encoder::create(Cursor::new(Vec::new()), 16, 8, params, RawCodec::new()).unwrap();
//! enc.encode_frame(&mut Frame::test_pattern(16, 8).unwrap()).unwrap();
//! let bytes = enc.finish().unwrap().into_inner();
//!
//! let mut dec = Decoder::open(Cursor::new(bytes), RawCodec::new()).unwrap();
//! let frame = dec.decode_frame().unwrap().unwrap();
//! assert_eq!(frame.width(), 16);
//! ```
//!
//! # Dependencies
//!
//! - [`hdrv-core`] - Frame, PtfKind, ColorSpaceKind
//! - [`hdrv-transfer`] - PTF tables
//! - [`hdrv-color`] - color transforms
//! - [`hdrv-mkv`] - container I/O
//! - [`serde`], [`serde_yaml`] - parameter files
//!
//! # Used By
//!
//! - `hdrv-cli` - `hdrv` command line tool

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod adapter;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod metadata;
pub mod packer;
pub mod params;
pub mod quantizer;

pub use adapter::{CodecAdapter, Packet, PlanarImage, PlaneBuffer, RawCodec, StreamSettings};
pub use decoder::Decoder;
pub use encoder::Encoder;
pub use error::{CodecError, CodecResult};
pub use metadata::ContainerMetadata;
pub use packer::{ByteOrder, ChannelPacker, profile_layout};
pub use params::EncoderParams;
pub use quantizer::{Codeword, Quantizer, QuantizerConfig};
