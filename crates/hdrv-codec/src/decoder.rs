//! Decode session: Matroska stream in, RGB frames out.

use std::io::{Read, Seek};

use hdrv_color::ColorTransformer;
use hdrv_core::Frame;
use hdrv_mkv::{ContainerReader, MkvError, TrackInfo};
use tracing::{debug, info};

use crate::adapter::{CodecAdapter, PlanarImage};
use crate::error::{CodecError, CodecResult};
use crate::metadata::ContainerMetadata;
use crate::packer::{ByteOrder, ChannelPacker};
use crate::quantizer::Quantizer;

/// An open decode session.
pub struct Decoder<R: Read + Seek, C: CodecAdapter> {
    reader: ContainerReader<R>,
    codec: C,
    track: TrackInfo,
    metadata: ContainerMetadata,
    quantizer: Quantizer,
    transformer: ColorTransformer,
    byte_order: ByteOrder,
    frames_out: u64,
    last_timecode: Option<u64>,
}

impl<R: Read + Seek, C: CodecAdapter> Decoder<R, C> {
    /// Opens a stream and rebuilds the quantizer from its attachments.
    ///
    /// # Errors
    ///
    /// Malformed container headers, a stream without a video track, and
    /// missing or invalid metadata attachments.
    pub fn open(reader: R, codec: C) -> CodecResult<Self> {
        let reader = ContainerReader::open(reader)?;
        let track = reader
            .track()
            .cloned()
            .ok_or_else(|| MkvError::MissingElement("TrackEntry".to_string()))?;
        if track.width == 0 || track.height == 0 {
            return Err(hdrv_core::Error::invalid_dimensions(
                track.width as usize,
                track.height as usize,
                "track has no pixel size",
            )
            .into());
        }

        let metadata = ContainerMetadata::from_attachments(reader.attachments())?;
        let config = &metadata.config;
        let transformer = ColorTransformer::new(config.color_space, config.max_lum());

        info!(
            "Decoding {}x{} {}: {} {}-bit, {} {}-bit, {:.0} ms",
            track.width,
            track.height,
            track.codec_id,
            config.ptf().name(),
            config.ptf_bit_depth(),
            config.color_space.name(),
            config.color_bit_depth,
            reader.duration_ms()
        );
        if track.codec_id != codec.codec_id() {
            debug!(
                "Track codec {} differs from decoder codec {}",
                track.codec_id,
                codec.codec_id()
            );
        }

        Ok(Self {
            reader,
            codec,
            track,
            quantizer: Quantizer::new(metadata.config.clone()),
            transformer,
            metadata,
            byte_order: ByteOrder::default(),
            frames_out: 0,
            last_timecode: None,
        })
    }

    /// Sets the byte order of two-byte samples. Must match the encoder.
    pub fn with_byte_order(mut self, order: ByteOrder) -> Self {
        self.byte_order = order;
        self
    }

    /// Changes the byte order of two-byte samples.
    pub fn set_byte_order(&mut self, order: ByteOrder) {
        self.byte_order = order;
    }

    /// Decodes the next frame, or `None` at end of stream.
    pub fn decode_frame(&mut self) -> CodecResult<Option<Frame>> {
        let image = loop {
            let Some(block) = self.reader.read_frame()? else {
                return Ok(None);
            };
            if block.track != self.track.number {
                debug!("Skipping block for track {}", block.track);
                continue;
            }
            self.last_timecode = Some(block.timecode);
            if let Some(image) = self.codec.decode(&block.data)? {
                break image;
            }
        };

        let frame = self.reconstruct(&image)?;
        self.frames_out += 1;
        Ok(Some(frame))
    }

    fn reconstruct(&self, image: &PlanarImage) -> CodecResult<Frame> {
        let width = self.track.width as usize;
        let height = self.track.height as usize;
        let subsampled = image.planes[1].width < image.width;
        let bytes = if image.high_bit_depth { 2 } else { 1 };

        let packer = ChannelPacker::new(width, height, subsampled, bytes, self.byte_order)?;
        let codes = packer.unpack(image)?;

        let mut frame = Frame::new(width, height, 3)?;
        self.quantizer.dequantize_frame(&codes, &mut frame)?;
        self.transformer.to_rgb(&mut frame, self.metadata.pre_scaling)?;
        Ok(frame)
    }

    /// Repositions at the cue nearest `t`.
    ///
    /// `t` is a fraction of the duration unless `absolute`, in which case it
    /// is milliseconds.
    pub fn seek_to_time(&mut self, t: f64, absolute: bool) -> CodecResult<()> {
        if !absolute && !(0.0..=1.0).contains(&t) {
            return Err(CodecError::invalid_params(format!(
                "relative seek position {t} outside [0, 1]"
            )));
        }
        self.reader.seek_to_time(t, absolute)?;
        self.last_timecode = None;
        Ok(())
    }

    /// Metadata read from the stream.
    pub fn metadata(&self) -> &ContainerMetadata {
        &self.metadata
    }

    /// Video track description.
    pub fn track(&self) -> &TrackInfo {
        &self.track
    }

    /// Frame width.
    pub fn width(&self) -> usize {
        self.track.width as usize
    }

    /// Frame height.
    pub fn height(&self) -> usize {
        self.track.height as usize
    }

    /// Byte order assumed for two-byte samples.
    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// Frames returned so far.
    pub fn frames_decoded(&self) -> u64 {
        self.frames_out
    }

    /// Timecode of the last block read, in track ticks.
    pub fn last_timecode(&self) -> Option<u64> {
        self.last_timecode
    }

    /// The underlying container reader.
    pub fn container(&self) -> &ContainerReader<R> {
        &self.reader
    }

    /// Mutable access to the container reader, e.g. to load cues.
    pub fn container_mut(&mut self) -> &mut ContainerReader<R> {
        &mut self.reader
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::io::Cursor;

    use approx::assert_relative_eq;
    use hdrv_core::ColorSpaceKind;
    use hdrv_mkv::{ContainerWriter, WriterConfig};

    use super::*;
    use crate::adapter::RawCodec;
    use crate::encoder::Encoder;
    use crate::params::EncoderParams;

    fn flat_frame(r: f32, g: f32, b: f32) -> Frame {
        let n = 16;
        let mut data = vec![r; n];
        data.extend(vec![g; n]);
        data.extend(vec![b; n]);
        Frame::from_data(4, 4, 3, data).unwrap()
    }

    fn encode(params: EncoderParams, frames: &[Frame]) -> Vec<u8> {
        let mut enc =
            Encoder::create(Cursor::new(Vec::new()), 4, 4, params, RawCodec::new()).unwrap();
        for f in frames {
            enc.encode_frame(&mut f.clone()).unwrap();
        }
        enc.finish().unwrap().into_inner()
    }

    #[test]
    fn test_roundtrip_luv() {
        let input = flat_frame(120.0, 80.0, 40.0);
        let bytes = encode(EncoderParams::default(), &[input.clone(), input.clone()]);

        let mut dec = Decoder::open(Cursor::new(bytes), RawCodec::new()).unwrap();
        assert_eq!((dec.width(), dec.height()), (4, 4));
        assert_eq!(dec.metadata().config.color_space, ColorSpaceKind::Luv);

        let mut count = 0;
        while let Some(frame) = dec.decode_frame().unwrap() {
            for c in 0..3 {
                assert_relative_eq!(frame.plane(c)[5], input.plane(c)[5], max_relative = 0.05);
            }
            count += 1;
        }
        assert_eq!(count, 2);
        assert_eq!(dec.frames_decoded(), 2);
        assert!(dec.decode_frame().unwrap().is_none());
    }

    #[test]
    fn test_roundtrip_rgb_big_endian() {
        let params = EncoderParams {
            color_space: ColorSpaceKind::Rgb,
            profile: 3,
            ptf_bit_depth: 12,
            byte_order: ByteOrder::Big,
            ..Default::default()
        };
        let input = flat_frame(1000.0, 10.0, 0.5);
        let bytes = encode(params, &[input.clone()]);

        let mut dec = Decoder::open(Cursor::new(bytes), RawCodec::new())
            .unwrap()
            .with_byte_order(ByteOrder::Big);
        let frame = dec.decode_frame().unwrap().unwrap();
        for c in 0..3 {
            assert_relative_eq!(frame.plane(c)[0], input.plane(c)[0], max_relative = 0.01);
        }
    }

    #[test]
    fn test_missing_metadata() {
        let mut writer = ContainerWriter::open(
            Cursor::new(Vec::new()),
            WriterConfig::new(RawCodec::CODEC_ID, 4, 4, 25.0),
        )
        .unwrap();
        writer.add_frame(b"frame", true).unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let err = Decoder::open(Cursor::new(bytes), RawCodec::new()).err().unwrap();
        assert!(matches!(err, CodecError::MissingAttachment { id: 430, .. }));
        assert!(err.is_config());
        assert!(ContainerMetadata::from_attachments(&BTreeMap::new()).is_err());
    }

    #[test]
    fn test_seek() {
        let params = EncoderParams {
            fps: 10.0,
            keyframe_interval: 3,
            ..Default::default()
        };
        let frames: Vec<Frame> = (0..9)
            .map(|i| flat_frame(10.0 * (i + 1) as f32, 50.0, 50.0))
            .collect();
        let bytes = encode(params, &frames);

        let mut dec = Decoder::open(Cursor::new(bytes), RawCodec::new()).unwrap();
        dec.seek_to_time(300.0, true).unwrap();
        dec.decode_frame().unwrap().unwrap();
        assert_eq!(dec.last_timecode(), Some(300));

        dec.seek_to_time(0.0, false).unwrap();
        dec.decode_frame().unwrap().unwrap();
        assert_eq!(dec.last_timecode(), Some(0));

        assert!(dec.seek_to_time(1.5, false).unwrap_err().is_config());
    }
}
