//! Bitstream codec interface.
//!
//! The sessions never talk to a concrete video codec. They hand packed
//! [`PlanarImage`]s to a [`CodecAdapter`] and store whatever [`Packet`]s come
//! back; on decode they feed packets in and get images out.
//!
//! [`RawCodec`] is the built-in adapter: it stores planes verbatim.

use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use tracing::debug;

use crate::error::{CodecError, CodecResult};

/// One byte plane of a planar image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaneBuffer {
    /// Samples per row.
    pub width: usize,
    /// Rows.
    pub height: usize,
    /// Bytes between the starts of consecutive rows.
    pub stride: usize,
    /// Plane bytes, at least `stride * (height - 1) + width * sample size`.
    pub data: Vec<u8>,
}

/// Three-plane image as exchanged with the codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanarImage {
    /// Luma width.
    pub width: usize,
    /// Luma height.
    pub height: usize,
    /// Samples take two bytes.
    pub high_bit_depth: bool,
    /// Planes in channel order.
    pub planes: [PlaneBuffer; 3],
}

/// Encoded output of the codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Encoded bytes.
    pub data: Vec<u8>,
    /// Decodable without other packets.
    pub is_keyframe: bool,
}

/// Encoder settings passed to the codec once per session.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamSettings {
    /// Luma width.
    pub width: usize,
    /// Luma height.
    pub height: usize,
    /// Codec profile after bit depth adjustment.
    pub profile: u32,
    /// Codec sample bit depth (8, 10 or 12).
    pub bit_depth: u32,
    /// Frames per second.
    pub fps: f32,
    /// Target bitrate in kbit/s.
    pub bitrate: u32,
    /// Quantizer scale, 0 is best.
    pub quantizer_scale: u32,
    /// Request lossless coding.
    pub lossless: bool,
}

/// A video bitstream codec.
pub trait CodecAdapter {
    /// Matroska CodecID for the produced bitstream.
    fn codec_id(&self) -> &str;

    /// Prepares the encoder. Called once before the first [`encode`](Self::encode).
    fn configure(&mut self, settings: &StreamSettings) -> CodecResult<()>;

    /// Encodes one image. May return no packets while the codec buffers.
    fn encode(&mut self, image: &PlanarImage, force_keyframe: bool) -> CodecResult<Vec<Packet>>;

    /// Drains buffered packets at end of stream.
    fn flush(&mut self) -> CodecResult<Vec<Packet>>;

    /// Decodes one packet. `None` when the packet produced no image yet.
    fn decode(&mut self, packet: &[u8]) -> CodecResult<Option<PlanarImage>>;
}

const RAW_MAGIC: &[u8; 4] = b"HDRW";

/// Lossless pass-through codec.
///
/// Packet layout (little-endian):
///
/// ```text
/// "HDRW" | flags u8 (bit 0: two-byte samples) | width u32 | height u32
/// 3 x (width u32 | height u32 | stride u32) | plane bytes in order
/// ```
#[derive(Debug, Clone, Default)]
pub struct RawCodec {
    settings: Option<StreamSettings>,
    frames: u64,
}

impl RawCodec {
    /// Matroska CodecID for uncompressed video.
    pub const CODEC_ID: &'static str = "V_UNCOMPRESSED";

    /// Creates the codec.
    pub fn new() -> Self {
        Self::default()
    }

    /// Settings given to [`CodecAdapter::configure`].
    pub fn settings(&self) -> Option<&StreamSettings> {
        self.settings.as_ref()
    }
}

impl CodecAdapter for RawCodec {
    fn codec_id(&self) -> &str {
        Self::CODEC_ID
    }

    fn configure(&mut self, settings: &StreamSettings) -> CodecResult<()> {
        debug!(
            "Raw codec: {}x{}, profile {}, {}-bit",
            settings.width, settings.height, settings.profile, settings.bit_depth
        );
        self.settings = Some(settings.clone());
        Ok(())
    }

    fn encode(&mut self, image: &PlanarImage, force_keyframe: bool) -> CodecResult<Vec<Packet>> {
        if let Some(s) = &self.settings {
            if (s.width, s.height) != (image.width, image.height) {
                return Err(CodecError::adapter(format!(
                    "image is {}x{}, codec configured for {}x{}",
                    image.width, image.height, s.width, s.height
                )));
            }
        }

        let payload: usize = image.planes.iter().map(|p| p.data.len()).sum();
        let mut data = Vec::with_capacity(RAW_MAGIC.len() + 45 + payload);
        data.extend_from_slice(RAW_MAGIC);
        data.write_u8(u8::from(image.high_bit_depth))?;
        data.write_u32::<LittleEndian>(dim(image.width)?)?;
        data.write_u32::<LittleEndian>(dim(image.height)?)?;
        for plane in &image.planes {
            data.write_u32::<LittleEndian>(dim(plane.width)?)?;
            data.write_u32::<LittleEndian>(dim(plane.height)?)?;
            data.write_u32::<LittleEndian>(dim(plane.stride)?)?;
        }
        for plane in &image.planes {
            data.extend_from_slice(&plane.data);
        }

        self.frames += 1;
        Ok(vec![Packet {
            data,
            is_keyframe: force_keyframe,
        }])
    }

    fn flush(&mut self) -> CodecResult<Vec<Packet>> {
        debug!("Raw codec flushed after {} frames", self.frames);
        Ok(Vec::new())
    }

    fn decode(&mut self, packet: &[u8]) -> CodecResult<Option<PlanarImage>> {
        let mut cur = Cursor::new(packet);
        let mut magic = [0u8; 4];
        cur.read_exact(&mut magic).map_err(truncated)?;
        if &magic != RAW_MAGIC {
            return Err(CodecError::adapter("not a raw codec packet"));
        }

        let high_bit_depth = cur.read_u8().map_err(truncated)? & 1 != 0;
        let width = cur.read_u32::<LittleEndian>().map_err(truncated)? as usize;
        let height = cur.read_u32::<LittleEndian>().map_err(truncated)? as usize;

        let mut geometry = [(0usize, 0usize, 0usize); 3];
        for g in &mut geometry {
            let w = cur.read_u32::<LittleEndian>().map_err(truncated)? as usize;
            let h = cur.read_u32::<LittleEndian>().map_err(truncated)? as usize;
            let s = cur.read_u32::<LittleEndian>().map_err(truncated)? as usize;
            *g = (w, h, s);
        }

        let mut planes = Vec::with_capacity(3);
        for (w, h, stride) in geometry {
            let len = stride
                .checked_mul(h)
                .filter(|&n| stride >= w && n <= packet.len() - cur.position() as usize)
                .ok_or_else(|| {
                    CodecError::adapter(format!(
                        "plane {w}x{h} (stride {stride}) does not fit the packet"
                    ))
                })?;
            let mut data = vec![0u8; len];
            cur.read_exact(&mut data).map_err(truncated)?;
            planes.push(PlaneBuffer {
                width: w,
                height: h,
                stride,
                data,
            });
        }

        let planes: [PlaneBuffer; 3] = planes
            .try_into()
            .map_err(|_| CodecError::adapter("plane count"))?;
        self.frames += 1;
        Ok(Some(PlanarImage {
            width,
            height,
            high_bit_depth,
            planes,
        }))
    }
}

fn dim(v: usize) -> CodecResult<u32> {
    u32::try_from(v).map_err(|_| CodecError::adapter(format!("dimension {v} exceeds 32 bits")))
}

fn truncated(e: std::io::Error) -> CodecError {
    CodecError::adapter(format!("truncated raw packet: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> PlanarImage {
        let plane = |w: usize, h: usize, seed: u8| PlaneBuffer {
            width: w,
            height: h,
            stride: w * 2,
            data: (0..w * h * 2).map(|i| seed.wrapping_add(i as u8)).collect(),
        };
        PlanarImage {
            width: 4,
            height: 2,
            high_bit_depth: true,
            planes: [plane(4, 2, 0), plane(2, 1, 50), plane(2, 1, 100)],
        }
    }

    #[test]
    fn test_raw_roundtrip() {
        let mut codec = RawCodec::new();
        let img = image();
        let packets = codec.encode(&img, true).unwrap();
        assert_eq!(packets.len(), 1);
        assert!(packets[0].is_keyframe);

        let decoded = codec.decode(&packets[0].data).unwrap().unwrap();
        assert_eq!(decoded, img);
        assert!(codec.flush().unwrap().is_empty());
    }

    #[test]
    fn test_keyframe_flag_follows_request() {
        let mut codec = RawCodec::new();
        assert!(!codec.encode(&image(), false).unwrap()[0].is_keyframe);
    }

    #[test]
    fn test_configure_checks_size() {
        let mut codec = RawCodec::new();
        codec
            .configure(&StreamSettings {
                width: 8,
                height: 8,
                profile: 2,
                bit_depth: 12,
                fps: 25.0,
                bitrate: 10000,
                quantizer_scale: 2,
                lossless: false,
            })
            .unwrap();
        assert_eq!(codec.settings().unwrap().bit_depth, 12);
        assert!(matches!(codec.encode(&image(), true), Err(CodecError::Adapter(_))));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let mut codec = RawCodec::new();
        assert!(codec.decode(b"nope").is_err());

        let mut packet = codec.encode(&image(), true).unwrap().remove(0).data;
        packet.truncate(packet.len() - 1);
        assert!(matches!(codec.decode(&packet), Err(CodecError::Adapter(_))));
    }

    #[test]
    fn test_decode_rejects_oversized_plane() {
        let mut codec = RawCodec::new();
        let mut packet = codec.encode(&image(), true).unwrap().remove(0).data;
        // First plane's stride
        packet[21..25].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(codec.decode(&packet), Err(CodecError::Adapter(_))));

        let mut packet = codec.encode(&image(), true).unwrap().remove(0).data;
        // Stride narrower than the plane width
        packet[21..25].copy_from_slice(&1u32.to_le_bytes());
        assert!(matches!(codec.decode(&packet), Err(CodecError::Adapter(_))));
    }
}
