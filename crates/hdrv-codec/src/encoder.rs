//! Encode session: RGB frames in, Matroska stream out.
//!
//! ```text
//! Frame -> ColorTransformer -> Quantizer -> ChannelPacker -> CodecAdapter -> ContainerWriter
//! ```

use std::io::{Seek, Write};

use hdrv_color::ColorTransformer;
use hdrv_core::Frame;
use hdrv_mkv::{ContainerWriter, WriterConfig};
use tracing::{debug, info, warn};

use crate::adapter::{CodecAdapter, Packet, StreamSettings};
use crate::error::{CodecError, CodecResult};
use crate::metadata::ContainerMetadata;
use crate::packer::ChannelPacker;
use crate::params::EncoderParams;
use crate::quantizer::Quantizer;

/// Mean luminance at or below this suggests input that is not in cd/m².
const MIN_MEAN_LUMINANCE: f32 = 1.0;

/// An open encode session.
pub struct Encoder<W: Write + Seek, C: CodecAdapter> {
    writer: ContainerWriter<W>,
    codec: C,
    params: EncoderParams,
    profile: u32,
    transformer: ColorTransformer,
    quantizer: Quantizer,
    packer: ChannelPacker,
    width: usize,
    height: usize,
    frames_in: u64,
    packets_out: u64,
}

impl<W: Write + Seek, C: CodecAdapter> Encoder<W, C> {
    /// Validates the parameters, configures the codec and writes the
    /// stream headers and metadata attachments.
    ///
    /// # Errors
    ///
    /// Invalid parameters, zero or odd dimensions, codec setup failures and
    /// I/O errors.
    pub fn create(
        writer: W,
        width: usize,
        height: usize,
        params: EncoderParams,
        mut codec: C,
    ) -> CodecResult<Self> {
        params.validate()?;

        let profile = params.adjusted_profile();
        if profile != params.profile {
            info!(
                "Profile {} adjusted to {} for {}-bit encoding",
                params.profile, profile, params.encoding_bit_depth
            );
        }
        let packer = ChannelPacker::for_profile(width, height, profile, params.byte_order)?;

        for (what, bits) in [
            ("PTF", params.ptf_bit_depth),
            ("color", params.color_bit_depth),
        ] {
            if bits > params.encoding_bit_depth {
                warn!(
                    "{} bit depth {} exceeds the {}-bit encoding, codewords will be clipped",
                    what, bits, params.encoding_bit_depth
                );
            }
        }

        let config = params.quantizer_config()?;
        let transformer = ColorTransformer::new(params.color_space, params.max_luminance);

        codec.configure(&StreamSettings {
            width,
            height,
            profile,
            bit_depth: params.encoding_bit_depth,
            fps: params.fps,
            bitrate: params.bitrate,
            quantizer_scale: params.quantizer_scale,
            lossless: params.lossless,
        })?;

        let track = WriterConfig::new(
            codec.codec_id(),
            dimension(width, height, width)?,
            dimension(width, height, height)?,
            f64::from(params.fps),
        );
        let mut writer = ContainerWriter::open(writer, track)?;

        let metadata = ContainerMetadata::new(config.clone(), params.pre_scaling);
        writer.write_attachments(&metadata.to_attachments())?;

        info!(
            "Encoding {}x{} @ {} fps: {} {}-bit, {} {}-bit, profile {}, codec {}",
            width,
            height,
            params.fps,
            params.ptf.name(),
            params.ptf_bit_depth,
            params.color_space.name(),
            params.color_bit_depth,
            profile,
            codec.codec_id()
        );

        Ok(Self {
            writer,
            codec,
            profile,
            transformer,
            quantizer: Quantizer::new(config),
            packer,
            width,
            height,
            params,
            frames_in: 0,
            packets_out: 0,
        })
    }

    /// Encodes one linear RGB frame.
    ///
    /// The frame is converted to the encoding color space in place and is
    /// not usable as RGB afterwards.
    pub fn encode_frame(&mut self, frame: &mut Frame) -> CodecResult<()> {
        if frame.width() != self.width || frame.height() != self.height {
            return Err(hdrv_core::Error::invalid_dimensions(
                frame.width(),
                frame.height(),
                format!("session is {}x{}", self.width, self.height),
            )
            .into());
        }
        if frame.channels() < 3 {
            return Err(hdrv_core::Error::channel_mismatch(3, frame.channels()).into());
        }

        self.transformer.to_encoding(frame, self.params.pre_scaling)?;
        if is_uncalibrated(frame) {
            warn!(
                "Frame {}: mean luminance {:.4} cd/m², input may not be calibrated",
                self.frames_in,
                frame.mean(0)
            );
        }
        let codes = self.quantizer.quantize_frame(frame)?;
        let image = self.packer.pack(&codes)?;

        let force = self.params.wants_keyframe(self.frames_in) || self.writer.needs_keyframe();
        let packets = self.codec.encode(&image, force)?;
        debug!(
            "Frame {}: {} packet(s){}",
            self.frames_in,
            packets.len(),
            if force { ", keyframe requested" } else { "" }
        );
        self.frames_in += 1;

        for packet in packets {
            self.write_packet(&packet)?;
        }
        Ok(())
    }

    fn write_packet(&mut self, packet: &Packet) -> CodecResult<()> {
        self.writer.add_frame(&packet.data, packet.is_keyframe)?;
        self.packets_out += 1;
        Ok(())
    }

    /// Drains the codec and closes the container.
    pub fn finish(mut self) -> CodecResult<W> {
        for packet in self.codec.flush()? {
            self.write_packet(&packet)?;
        }
        let cues = self.writer.cues().len();
        let inner = self.writer.finish()?;
        info!(
            "Encoded {} frames into {} packets",
            self.frames_in, self.packets_out
        );
        debug!("{} cue points before close", cues);
        Ok(inner)
    }

    /// Frames passed to [`encode_frame`](Self::encode_frame).
    pub fn frames_encoded(&self) -> u64 {
        self.frames_in
    }

    /// Packets stored in the container.
    pub fn packets_written(&self) -> u64 {
        self.packets_out
    }

    /// Codec profile in use after bit depth adjustment.
    pub fn profile(&self) -> u32 {
        self.profile
    }

    /// Session parameters.
    pub fn params(&self) -> &EncoderParams {
        &self.params
    }

    /// Quantizer built for the session.
    pub fn quantizer(&self) -> &Quantizer {
        &self.quantizer
    }

    /// The codec.
    pub fn codec(&self) -> &C {
        &self.codec
    }
}

fn dimension(width: usize, height: usize, v: usize) -> CodecResult<u32> {
    u32::try_from(v).map_err(|_| {
        CodecError::from(hdrv_core::Error::invalid_dimensions(
            width,
            height,
            "dimension exceeds 32 bits",
        ))
    })
}

/// Checks the luminance-like plane of a frame already in its encoding
/// space. Plane 0 is in cd/m² for every color space.
fn is_uncalibrated(frame: &Frame) -> bool {
    frame.mean(0) <= MIN_MEAN_LUMINANCE
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use hdrv_core::ColorSpaceKind;
    use hdrv_mkv::ContainerReader;

    use super::*;
    use crate::adapter::RawCodec;

    fn encode(params: EncoderParams, frames: usize) -> Vec<u8> {
        let mut enc =
            Encoder::create(Cursor::new(Vec::new()), 8, 4, params, RawCodec::new()).unwrap();
        for _ in 0..frames {
            let mut frame = Frame::test_pattern(8, 4).unwrap();
            enc.encode_frame(&mut frame).unwrap();
        }
        assert_eq!(enc.frames_encoded(), frames as u64);
        enc.finish().unwrap().into_inner()
    }

    #[test]
    fn test_calibration_check_uses_encoded_plane() {
        let uniform = |r: f32, g: f32, b: f32| {
            let mut data = vec![r; 4];
            data.extend([g; 4]);
            data.extend([b; 4]);
            Frame::from_data(2, 2, 3, data).unwrap()
        };

        // RGB space: plane 0 is red times the pre-scaling
        let rgb = ColorTransformer::new(ColorSpaceKind::Rgb, 10000.0);
        let mut frame = uniform(0.6, 0.6, 0.6);
        rgb.to_encoding(&mut frame, 1.0).unwrap();
        assert!(is_uncalibrated(&frame));
        let mut frame = uniform(0.6, 0.6, 0.6);
        rgb.to_encoding(&mut frame, 2.0).unwrap();
        assert!(!is_uncalibrated(&frame));

        // Bright green does not hide a dark red plane
        let mut frame = uniform(0.5, 100.0, 100.0);
        rgb.to_encoding(&mut frame, 1.0).unwrap();
        assert!(is_uncalibrated(&frame));

        for space in [ColorSpaceKind::Luv, ColorSpaceKind::Xyz, ColorSpaceKind::YCbCr] {
            let t = ColorTransformer::new(space, 10000.0);
            let mut bright = uniform(100.0, 100.0, 100.0);
            t.to_encoding(&mut bright, 1.0).unwrap();
            assert!(!is_uncalibrated(&bright), "{space}");

            let mut dark = uniform(0.1, 0.1, 0.1);
            t.to_encoding(&mut dark, 1.0).unwrap();
            assert!(is_uncalibrated(&dark), "{space}");
        }
    }

    #[test]
    fn test_rejects_odd_size() {
        let err = Encoder::create(
            Cursor::new(Vec::new()),
            7,
            4,
            EncoderParams::default(),
            RawCodec::new(),
        )
        .err()
        .unwrap();
        assert!(err.is_config());
    }

    #[test]
    fn test_rejects_invalid_params() {
        let params = EncoderParams {
            fps: -1.0,
            ..Default::default()
        };
        let err = Encoder::create(Cursor::new(Vec::new()), 8, 4, params, RawCodec::new())
            .err()
            .unwrap();
        assert!(matches!(err, CodecError::InvalidParams(_)));
    }

    #[test]
    fn test_configures_codec() {
        let params = EncoderParams {
            encoding_bit_depth: 8,
            ..Default::default()
        };
        let enc =
            Encoder::create(Cursor::new(Vec::new()), 8, 4, params, RawCodec::new()).unwrap();
        assert_eq!(enc.profile(), 0);
        let settings = enc.codec().settings().unwrap();
        assert_eq!((settings.width, settings.height, settings.bit_depth), (8, 4, 8));
    }

    #[test]
    fn test_wrong_frame_size() {
        let mut enc = Encoder::create(
            Cursor::new(Vec::new()),
            8,
            4,
            EncoderParams::default(),
            RawCodec::new(),
        )
        .unwrap();
        let mut frame = Frame::new(4, 4, 3).unwrap();
        assert!(enc.encode_frame(&mut frame).is_err());
        assert_eq!(enc.frames_encoded(), 0);
    }

    #[test]
    fn test_keyframe_interval_clusters() {
        let params = EncoderParams {
            keyframe_interval: 2,
            ..Default::default()
        };
        let bytes = encode(params, 5);

        let mut reader = ContainerReader::open(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.track().unwrap().codec_id, RawCodec::CODEC_ID);
        assert_eq!(reader.attachments().len(), 7);

        let mut keys = Vec::new();
        while let Some(block) = reader.read_frame().unwrap() {
            keys.push(block.is_keyframe);
        }
        assert_eq!(keys, [true, false, true, false, true]);

        reader.load_cues().unwrap();
        assert_eq!(reader.cues().len(), 3);
    }
}
