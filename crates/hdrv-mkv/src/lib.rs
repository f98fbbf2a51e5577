//! # hdrv-mkv
//!
//! Matroska container support for HDR video streams: one video track,
//! clusters started at keyframes, BlockGroups chained by ReferenceBlock,
//! a Cues index for seeking and file attachments for stream metadata.
//!
//! # Modules
//!
//! - [`ebml`] - VINTs, element headers, typed payloads
//! - [`elements`] - element IDs
//! - [`writer`] - [`ContainerWriter`]
//! - [`reader`] - [`ContainerReader`]
//!
//! # Usage
//!
//! ```rust
//! use std::io::Cursor;
//! use hdrv_mkv::{ContainerReader, ContainerWriter, WriterConfig};
//!
//! let cfg = WriterConfig::new("V_VP9", 64, 32, 25.0);
//! let mut writer = ContainerWriter::open(Cursor::new(Vec::new()), cfg).unwrap();
//! writer.write_attachments(&[]).unwrap();
//! writer.add_frame(b"key", true).unwrap();
//! writer.add_frame(b"delta", false).unwrap();
//! let bytes = writer.finish().unwrap().into_inner();
//!
//! let mut reader = ContainerReader::open(Cursor::new(bytes)).unwrap();
//! let first = reader.read_frame().unwrap().unwrap();
//! assert!(first.is_keyframe);
//! ```
//!
//! # Dependencies
//!
//! - [`hdrv-core`] - nearest-entry search for cue lookup
//! - [`byteorder`] - big-endian integers and floats
//!
//! # Used By
//!
//! - `hdrv-codec` - Encoder and decoder sessions

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod ebml;
pub mod elements;
pub mod error;
pub mod reader;
pub mod writer;

pub use error::{MkvError, MkvResult};
pub use reader::{BlockFrame, ContainerReader, ReaderState, SegmentInfo, TrackInfo};
pub use writer::{AttachedFile, ContainerWriter, CuePoint, WriterConfig};
