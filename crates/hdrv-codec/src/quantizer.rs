//! Conversion between physical channel values and integer codewords.
//!
//! Luminance-like channels (channel 0, or every channel in RGB and XYZ)
//! go through the PTF table: quantization picks the nearest table entry,
//! dequantization looks the entry up. Chroma channels of Lu'v' and YCbCr
//! already live in `[0, 1]` and are scaled linearly by the color bit depth.

use hdrv_core::{ColorSpaceKind, Frame, PtfKind};
use hdrv_transfer::TransferFunctionTable;

use crate::error::{CodecError, CodecResult};

/// An integer sample in the codec's range.
pub type Codeword = u16;

/// Floor for dequantized chroma; zero breaks the chromaticity inverse.
pub const CHROMA_EPSILON: f32 = 1e-10;

/// Everything needed to quantize or dequantize a stream.
///
/// Created once per session and not modified afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantizerConfig {
    /// Encoding color space.
    pub color_space: ColorSpaceKind,
    /// Bit depth of chroma codewords.
    pub color_bit_depth: u32,
    /// Luminance table; carries PTF kind, luma bit depth and range.
    pub table: TransferFunctionTable,
}

impl QuantizerConfig {
    /// Builds the PTF table and wraps it.
    pub fn new(
        ptf: PtfKind,
        ptf_bit_depth: u32,
        color_bit_depth: u32,
        color_space: ColorSpaceKind,
        min_lum: f32,
        max_lum: f32,
    ) -> CodecResult<Self> {
        let table = TransferFunctionTable::new(ptf, ptf_bit_depth, min_lum, max_lum)?;
        Self::from_table(table, color_bit_depth, color_space)
    }

    /// Wraps an existing table, e.g. one read from stream metadata.
    pub fn from_table(
        table: TransferFunctionTable,
        color_bit_depth: u32,
        color_space: ColorSpaceKind,
    ) -> CodecResult<Self> {
        if !(1..=16).contains(&color_bit_depth) {
            return Err(CodecError::invalid_params(format!(
                "color bit depth {color_bit_depth} outside 1..=16"
            )));
        }
        Ok(Self {
            color_space,
            color_bit_depth,
            table,
        })
    }

    /// PTF kind.
    #[inline]
    pub fn ptf(&self) -> PtfKind {
        self.table.kind()
    }

    /// Luma codeword bit depth.
    #[inline]
    pub fn ptf_bit_depth(&self) -> u32 {
        self.table.bit_depth()
    }

    /// Lower luminance bound.
    #[inline]
    pub fn min_lum(&self) -> f32 {
        self.table.l_min()
    }

    /// Upper luminance bound.
    #[inline]
    pub fn max_lum(&self) -> f32 {
        self.table.l_max()
    }
}

/// Maps channel values to codewords and back.
#[derive(Debug, Clone)]
pub struct Quantizer {
    config: QuantizerConfig,
    max_chroma: f32,
}

impl Quantizer {
    /// Creates a quantizer for a session.
    pub fn new(config: QuantizerConfig) -> Self {
        let max_chroma = ((1u32 << config.color_bit_depth) - 1) as f32;
        Self { config, max_chroma }
    }

    /// Session configuration.
    pub fn config(&self) -> &QuantizerConfig {
        &self.config
    }

    /// Whether `channel` goes through the PTF table.
    #[inline]
    pub fn uses_table(&self, channel: usize) -> bool {
        channel == 0 || self.config.color_space.all_channels_luminance()
    }

    /// Largest codeword `channel` can produce.
    pub fn max_code(&self, channel: usize) -> Codeword {
        if self.uses_table(channel) {
            self.config.table.max_code() as Codeword
        } else {
            self.max_chroma as Codeword
        }
    }

    /// Value to codeword. Out-of-range values clamp to the ends.
    #[inline]
    pub fn quantize(&self, value: f32, channel: usize) -> Codeword {
        if self.uses_table(channel) {
            self.config.table.nearest_code(value) as Codeword
        } else {
            (self.max_chroma * value).round().clamp(0.0, self.max_chroma) as Codeword
        }
    }

    /// Codeword to value.
    #[inline]
    pub fn dequantize(&self, code: Codeword, channel: usize) -> f32 {
        if self.uses_table(channel) {
            self.config.table.lookup(u32::from(code))
        } else {
            (f32::from(code) / self.max_chroma).max(CHROMA_EPSILON)
        }
    }

    /// Quantizes the first three planes of a frame.
    pub fn quantize_frame(&self, frame: &Frame) -> CodecResult<[Vec<Codeword>; 3]> {
        if frame.channels() < 3 {
            return Err(hdrv_core::Error::channel_mismatch(3, frame.channels()).into());
        }
        Ok(std::array::from_fn(|c| {
            frame
                .plane(c)
                .iter()
                .map(|&v| self.quantize(v, c))
                .collect()
        }))
    }

    /// Dequantizes full-resolution codeword planes into a frame.
    pub fn dequantize_frame(&self, codes: &[Vec<Codeword>; 3], frame: &mut Frame) -> CodecResult<()> {
        let n = frame.pixel_count();
        if let Some(bad) = codes.iter().find(|p| p.len() != n) {
            return Err(hdrv_core::Error::BufferSize {
                expected: n,
                got: bad.len(),
            }
            .into());
        }

        let planes = frame.planes3_mut()?;
        for (c, (plane, src)) in planes.into_iter().zip(codes).enumerate() {
            for (dst, &code) in plane.iter_mut().zip(src) {
                *dst = self.dequantize(code, c);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn pq_luv() -> Quantizer {
        Quantizer::new(
            QuantizerConfig::new(PtfKind::Pq, 11, 8, ColorSpaceKind::Luv, 0.005, 10000.0).unwrap(),
        )
    }

    #[test]
    fn test_pq_5000_roundtrip() {
        let q = pq_luv();
        let code = q.quantize(5000.0, 0);
        assert!(code <= 2047);
        let back = q.dequantize(code, 0);
        assert!((back - 5000.0).abs() <= q.config().table.step_at(u32::from(code)));
    }

    #[test]
    fn test_luminance_roundtrip_within_step() {
        let q = pq_luv();
        let mut l = 0.005f32;
        while l <= 10000.0 {
            let code = q.quantize(l, 0);
            let back = q.dequantize(code, 0);
            let step = q.config().table.step_at(u32::from(code));
            assert!((back - l).abs() <= step, "{l} -> {code} -> {back}");
            l *= 1.37;
        }
    }

    #[test]
    fn test_chroma_linear() {
        let q = pq_luv();
        assert_eq!(q.quantize(0.0, 1), 0);
        assert_eq!(q.quantize(1.0, 1), 255);
        assert_eq!(q.quantize(0.5, 2), 128);
        assert_eq!(q.quantize(-3.0, 1), 0);
        assert_eq!(q.quantize(7.0, 2), 255);

        assert_eq!(q.dequantize(0, 1), CHROMA_EPSILON);
        assert_relative_eq!(q.dequantize(255, 1), 1.0);
        assert_relative_eq!(q.dequantize(51, 2), 0.2);
    }

    #[test]
    fn test_rgb_uses_table_everywhere() {
        let q = Quantizer::new(
            QuantizerConfig::new(PtfKind::Log, 10, 8, ColorSpaceKind::Rgb, 0.005, 10000.0).unwrap(),
        );
        assert!(q.uses_table(2));
        assert_eq!(q.max_code(2), 1023);
        assert_eq!(q.quantize(10000.0, 2), 1023);
        assert_eq!(q.quantize(1e9, 1), 1023);
        assert_eq!(q.quantize(0.0, 1), 0);
    }

    #[test]
    fn test_frame_roundtrip() {
        let q = pq_luv();
        let mut frame = Frame::from_data(2, 1, 3, vec![100.0, 1000.0, 0.25, 0.5, 0.75, 1.0]).unwrap();
        let codes = q.quantize_frame(&frame).unwrap();
        assert_eq!(codes[1], [64, 128]);

        q.dequantize_frame(&codes, &mut frame).unwrap();
        assert_relative_eq!(frame.plane(0)[0], 100.0, max_relative = 0.01);
        assert_relative_eq!(frame.plane(2)[1], 1.0);
    }

    #[test]
    fn test_rejects_color_depth() {
        let table = TransferFunctionTable::new(PtfKind::Pq, 10, 0.005, 10000.0).unwrap();
        assert!(QuantizerConfig::from_table(table, 0, ColorSpaceKind::Luv).is_err());
    }
}
