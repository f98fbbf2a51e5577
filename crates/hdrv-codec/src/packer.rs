//! Codeword planes to codec byte planes and back.
//!
//! The codec works on three byte planes. Depending on the profile:
//!
//! | Profile | Chroma | Bytes per sample |
//! |---------|--------|------------------|
//! | 0 | 4:2:0 | 1 |
//! | 1 | 4:4:4 | 1 |
//! | 2 | 4:2:0 | 2 |
//! | 3 | 4:4:4 | 2 |
//!
//! Subsampled chroma is the rounded mean of each 2x2 quad of codewords on
//! the way in, and is replicated over the quad on the way out. Two-byte
//! samples follow the packer's [`ByteOrder`]; one-byte samples clamp to 255.

use byteorder::{BigEndian, ByteOrder as _, LittleEndian};
use serde::{Deserialize, Serialize};

use crate::adapter::{PlanarImage, PlaneBuffer};
use crate::error::{CodecError, CodecResult};
use crate::quantizer::Codeword;

/// Byte order of two-byte samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    /// Low byte first.
    #[default]
    Little,
    /// High byte first.
    Big,
}

/// Chroma subsampling and sample width for a codec profile.
pub fn profile_layout(profile: u32) -> CodecResult<(bool, usize)> {
    match profile {
        0 => Ok((true, 1)),
        1 => Ok((false, 1)),
        2 => Ok((true, 2)),
        3 => Ok((false, 2)),
        p => Err(CodecError::invalid_params(format!("profile {p} outside 0..=3"))),
    }
}

/// Packs quantized planes into the codec's byte layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelPacker {
    width: usize,
    height: usize,
    subsampled: bool,
    bytes_per_sample: usize,
    byte_order: ByteOrder,
}

impl ChannelPacker {
    /// Creates a packer.
    ///
    /// # Errors
    ///
    /// Zero or odd dimensions, or a sample width other than 1 or 2.
    pub fn new(
        width: usize,
        height: usize,
        subsampled: bool,
        bytes_per_sample: usize,
        byte_order: ByteOrder,
    ) -> CodecResult<Self> {
        if width == 0 || height == 0 || width % 2 != 0 || height % 2 != 0 {
            return Err(hdrv_core::Error::invalid_dimensions(
                width,
                height,
                "width and height must be positive and even",
            )
            .into());
        }
        if !matches!(bytes_per_sample, 1 | 2) {
            return Err(CodecError::invalid_params(format!(
                "{bytes_per_sample} bytes per sample"
            )));
        }
        Ok(Self {
            width,
            height,
            subsampled,
            bytes_per_sample,
            byte_order,
        })
    }

    /// Creates the packer for a codec profile.
    pub fn for_profile(
        width: usize,
        height: usize,
        profile: u32,
        byte_order: ByteOrder,
    ) -> CodecResult<Self> {
        let (subsampled, bytes) = profile_layout(profile)?;
        Self::new(width, height, subsampled, bytes, byte_order)
    }

    /// Chroma planes are stored at half resolution.
    #[inline]
    pub fn is_subsampled(&self) -> bool {
        self.subsampled
    }

    /// Bytes per stored sample.
    #[inline]
    pub fn bytes_per_sample(&self) -> usize {
        self.bytes_per_sample
    }

    /// Byte order of two-byte samples.
    #[inline]
    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// Stored size of a plane.
    pub fn plane_size(&self, plane: usize) -> (usize, usize) {
        if plane > 0 && self.subsampled {
            (self.width / 2, self.height / 2)
        } else {
            (self.width, self.height)
        }
    }

    fn write_sample(&self, out: &mut [u8], code: Codeword) {
        match (self.bytes_per_sample, self.byte_order) {
            (1, _) => out[0] = code.min(u8::MAX as Codeword) as u8,
            (_, ByteOrder::Little) => LittleEndian::write_u16(out, code),
            (_, ByteOrder::Big) => BigEndian::write_u16(out, code),
        }
    }

    fn read_sample(&self, data: &[u8]) -> Codeword {
        match (self.bytes_per_sample, self.byte_order) {
            (1, _) => Codeword::from(data[0]),
            (_, ByteOrder::Little) => LittleEndian::read_u16(data),
            (_, ByteOrder::Big) => BigEndian::read_u16(data),
        }
    }

    /// Full-resolution codeword planes to codec byte planes.
    pub fn pack(&self, codes: &[Vec<Codeword>; 3]) -> CodecResult<PlanarImage> {
        let n = self.width * self.height;
        if let Some(bad) = codes.iter().find(|p| p.len() != n) {
            return Err(CodecError::Layout(format!(
                "codeword plane has {} samples, expected {n}",
                bad.len()
            )));
        }

        let bps = self.bytes_per_sample;
        let planes = std::array::from_fn(|p| {
            let (w, h) = self.plane_size(p);
            let stride = w * bps;
            let mut data = vec![0u8; stride * h];
            let src = &codes[p];

            for y in 0..h {
                for x in 0..w {
                    let code = if w < self.width {
                        let i1 = 2 * x + 2 * y * self.width;
                        let i2 = i1 + self.width;
                        let sum = u32::from(src[i1])
                            + u32::from(src[i1 + 1])
                            + u32::from(src[i2])
                            + u32::from(src[i2 + 1]);
                        ((sum + 2) / 4) as Codeword
                    } else {
                        src[x + y * w]
                    };
                    let off = y * stride + x * bps;
                    self.write_sample(&mut data[off..off + bps], code);
                }
            }

            PlaneBuffer {
                width: w,
                height: h,
                stride,
                data,
            }
        });

        Ok(PlanarImage {
            width: self.width,
            height: self.height,
            high_bit_depth: bps == 2,
            planes,
        })
    }

    /// Codec byte planes back to full-resolution codeword planes.
    ///
    /// Strides wider than the plane are honored.
    pub fn unpack(&self, image: &PlanarImage) -> CodecResult<[Vec<Codeword>; 3]> {
        if image.width != self.width || image.height != self.height {
            return Err(CodecError::Layout(format!(
                "image is {}x{}, expected {}x{}",
                image.width, image.height, self.width, self.height
            )));
        }

        let bps = self.bytes_per_sample;
        for (p, plane) in image.planes.iter().enumerate() {
            let (w, h) = self.plane_size(p);
            let needed = plane.stride * (h - 1) + w * bps;
            if plane.width != w || plane.height != h || plane.stride < w * bps || plane.data.len() < needed
            {
                return Err(CodecError::Layout(format!(
                    "plane {p} is {}x{} (stride {}, {} bytes), expected {w}x{h} with {bps} bytes per sample",
                    plane.width,
                    plane.height,
                    plane.stride,
                    plane.data.len()
                )));
            }
        }

        let n = self.width * self.height;
        Ok(std::array::from_fn(|p| {
            let plane = &image.planes[p];
            let (w, h) = self.plane_size(p);
            let mut dest = vec![0 as Codeword; n];

            for y in 0..h {
                for x in 0..w {
                    let off = y * plane.stride + x * bps;
                    let code = self.read_sample(&plane.data[off..off + bps]);
                    if w < self.width {
                        let i1 = 2 * x + 2 * y * self.width;
                        let i2 = i1 + self.width;
                        dest[i1] = code;
                        dest[i1 + 1] = code;
                        dest[i2] = code;
                        dest[i2 + 1] = code;
                    } else {
                        dest[x + y * w] = code;
                    }
                }
            }
            dest
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize, scale: u16) -> Vec<Codeword> {
        (0..n).map(|i| i as u16 * scale).collect()
    }

    #[test]
    fn test_rejects_odd_dimensions() {
        for profile in 0..4 {
            let err = ChannelPacker::for_profile(5, 4, profile, ByteOrder::Little).unwrap_err();
            assert!(err.is_config());
        }
        assert!(ChannelPacker::for_profile(4, 4, 4, ByteOrder::Little).is_err());
    }

    #[test]
    fn test_444_two_byte_roundtrip() {
        for order in [ByteOrder::Little, ByteOrder::Big] {
            let p = ChannelPacker::for_profile(4, 2, 3, order).unwrap();
            let codes = [ramp(8, 500), ramp(8, 3), ramp(8, 7)];
            let image = p.pack(&codes).unwrap();
            assert!(image.high_bit_depth);
            assert_eq!(image.planes[0].stride, 8);
            assert_eq!(p.unpack(&image).unwrap(), codes);
        }
    }

    #[test]
    fn test_byte_order_layout() {
        let codes = [vec![0x0102; 4], vec![0; 4], vec![0; 4]];

        let little = ChannelPacker::for_profile(2, 2, 3, ByteOrder::Little).unwrap();
        assert_eq!(&little.pack(&codes).unwrap().planes[0].data[..2], &[0x02, 0x01]);

        let big = ChannelPacker::for_profile(2, 2, 3, ByteOrder::Big).unwrap();
        assert_eq!(&big.pack(&codes).unwrap().planes[0].data[..2], &[0x01, 0x02]);
    }

    #[test]
    fn test_420_average_and_replicate() {
        let p = ChannelPacker::for_profile(4, 2, 2, ByteOrder::Little).unwrap();
        let luma = ramp(8, 1);
        let chroma = vec![10, 20, 100, 100, 30, 41, 100, 101];
        let codes = [luma.clone(), chroma.clone(), chroma];

        let image = p.pack(&codes).unwrap();
        assert_eq!((image.planes[1].width, image.planes[1].height), (2, 1));
        // (10 + 20 + 30 + 41 + 2) / 4 = 25, (100 + 100 + 100 + 101 + 2) / 4 = 100
        assert_eq!(image.planes[1].data, [25, 0, 100, 0]);

        let back = p.unpack(&image).unwrap();
        assert_eq!(back[0], luma);
        assert_eq!(back[1], [25, 25, 100, 100, 25, 25, 100, 100]);
    }

    #[test]
    fn test_8bit_clamps() {
        let p = ChannelPacker::for_profile(2, 2, 1, ByteOrder::Little).unwrap();
        let codes = [vec![0, 255, 256, 2047], vec![1; 4], vec![2; 4]];
        let image = p.pack(&codes).unwrap();
        assert!(!image.high_bit_depth);
        assert_eq!(image.planes[0].data, [0, 255, 255, 255]);
    }

    #[test]
    fn test_unpack_honors_stride() {
        let p = ChannelPacker::for_profile(2, 2, 1, ByteOrder::Little).unwrap();
        let padded = |v: u8| PlaneBuffer {
            width: 2,
            height: 2,
            stride: 4,
            data: vec![v, v + 1, 0xEE, 0xEE, v + 2, v + 3],
        };
        let image = PlanarImage {
            width: 2,
            height: 2,
            high_bit_depth: false,
            planes: [padded(0), padded(10), padded(20)],
        };
        let codes = p.unpack(&image).unwrap();
        assert_eq!(codes[0], [0, 1, 2, 3]);
        assert_eq!(codes[2], [20, 21, 22, 23]);
    }

    #[test]
    fn test_unpack_rejects_wrong_geometry() {
        let p444 = ChannelPacker::for_profile(4, 2, 1, ByteOrder::Little).unwrap();
        let p420 = ChannelPacker::for_profile(4, 2, 0, ByteOrder::Little).unwrap();
        let image = p420.pack(&[vec![0; 8], vec![0; 8], vec![0; 8]]).unwrap();
        assert!(matches!(p444.unpack(&image), Err(CodecError::Layout(_))));
    }
}
