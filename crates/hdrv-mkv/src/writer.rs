//! Matroska writer for a single video track.
//!
//! Layout produced by [`ContainerWriter`]:
//!
//! ```text
//! EBML header
//! Segment (size patched on finish)
//! ├── SeekHead        written on finish into reserved Void space
//! ├── Void            remainder of the reservation
//! ├── Info            Duration patched on finish
//! ├── Tracks          one video track
//! ├── Attachments     optional, before the first cluster
//! ├── Cluster*        one per keyframe
//! │   ├── Timestamp
//! │   └── BlockGroup*  Block, ReferenceBlock (not on the first), BlockDuration
//! └── Cues            one CuePoint per cluster
//! ```
//!
//! Frames are buffered in the open cluster and rendered when the next
//! keyframe arrives or on [`ContainerWriter::finish`]. Cluster sizes are
//! therefore always known; only the Segment carries an unknown size while
//! the stream is being written.

use std::io::{Seek, SeekFrom, Write};

use byteorder::{BigEndian, WriteBytesExt};
use tracing::{debug, info};

use crate::ebml::{self, EbmlHeader};
use crate::elements::*;
use crate::error::{MkvError, MkvResult};

/// Nanoseconds per timecode tick; one tick is one millisecond.
pub const DEFAULT_TIMECODE_SCALE: u64 = 1_000_000;

/// Bytes reserved after the segment header for the SeekHead.
pub const SEEK_HEAD_RESERVATION: u64 = 4096;

/// Track number used for the single video track.
pub const VIDEO_TRACK_NUMBER: u64 = 1;

const VIDEO_TRACK_UID: u64 = 13;
const SEGMENT_SIZE_LENGTH: usize = 8;

/// Settings for a new stream.
#[derive(Debug, Clone, PartialEq)]
pub struct WriterConfig {
    /// Codec identifier, e.g. `V_VP9`.
    pub codec_id: String,
    /// Coded frame width.
    pub width: u32,
    /// Coded frame height.
    pub height: u32,
    /// Frames per second.
    pub fps: f64,
    /// Stored in Info as SegmentFilename.
    pub segment_filename: String,
    /// Stored in Info as MuxingApp.
    pub muxing_app: String,
    /// Stored in Info as WritingApp.
    pub writing_app: String,
}

impl WriterConfig {
    /// Config for a video track with default application strings.
    pub fn new(codec_id: impl Into<String>, width: u32, height: u32, fps: f64) -> Self {
        Self {
            codec_id: codec_id.into(),
            width,
            height,
            fps,
            segment_filename: "HDR video".to_string(),
            muxing_app: concat!("hdrv-mkv ", env!("CARGO_PKG_VERSION")).to_string(),
            writing_app: concat!("hdrv ", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    /// Frame duration in ticks, rounded to whole milliseconds.
    ///
    /// Only BlockDuration and DefaultDuration use it; timecodes come from
    /// [`timecode_at`](Self::timecode_at).
    pub fn frame_duration(&self) -> u64 {
        ((1000.0 / self.fps).round() as u64).max(1)
    }

    /// Timecode of frame `index` in ticks, computed from the exact frame rate.
    pub fn timecode_at(&self, index: u64) -> u64 {
        (index as f64 * 1000.0 / self.fps).round() as u64
    }
}

/// A file attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedFile {
    /// FileUID; the metadata layer uses it as a numeric key.
    pub uid: u64,
    /// FileName.
    pub name: String,
    /// FileMimeType.
    pub mime_type: String,
    /// FileDescription.
    pub description: String,
    /// FileData.
    pub data: Vec<u8>,
}

/// Index entry pointing at a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CuePoint {
    /// Cluster timecode in ticks.
    pub time: u64,
    /// Track the cue refers to.
    pub track: u64,
    /// Cluster offset from the start of the segment payload.
    pub cluster_position: u64,
}

#[derive(Debug)]
struct PendingBlock {
    timecode: u64,
    data: Vec<u8>,
}

#[derive(Debug)]
struct OpenCluster {
    timecode: u64,
    blocks: Vec<PendingBlock>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Header,
    Frames,
    Finished,
}

/// Streaming Matroska writer.
#[derive(Debug)]
pub struct ContainerWriter<W: Write + Seek> {
    writer: W,
    config: WriterConfig,
    state: WriterState,
    frame_duration: u64,
    frame_count: u64,
    segment_size_pos: u64,
    segment_data_start: u64,
    seek_head_pos: u64,
    duration_pos: u64,
    // (element id, offset from segment data start)
    seek_entries: Vec<(u32, u64)>,
    cluster: Option<OpenCluster>,
    cues: Vec<CuePoint>,
}

impl<W: Write + Seek> ContainerWriter<W> {
    /// Starts a stream: writes the EBML header, the segment header, the
    /// SeekHead reservation, Info and Tracks.
    pub fn open(mut writer: W, config: WriterConfig) -> MkvResult<Self> {
        if !(config.fps > 0.0 && config.fps.is_finite()) {
            return Err(MkvError::invalid_state(format!(
                "frame rate must be positive, got {}",
                config.fps
            )));
        }

        EbmlHeader::default().write(&mut writer)?;

        ebml::write_element_id(&mut writer, SEGMENT)?;
        let segment_size_pos = writer.stream_position()?;
        ebml::write_unknown_size(&mut writer, SEGMENT_SIZE_LENGTH)?;
        let segment_data_start = writer.stream_position()?;

        let seek_head_pos = segment_data_start;
        ebml::write_void(&mut writer, SEEK_HEAD_RESERVATION)?;

        let mut out = Self {
            writer,
            frame_duration: config.frame_duration(),
            config,
            state: WriterState::Header,
            frame_count: 0,
            segment_size_pos,
            segment_data_start,
            seek_head_pos,
            duration_pos: 0,
            seek_entries: Vec::new(),
            cluster: None,
            cues: Vec::new(),
        };
        out.write_info()?;
        out.write_tracks()?;

        info!(
            "Opened Matroska stream {}x{} @ {} fps, codec {}",
            out.config.width, out.config.height, out.config.fps, out.config.codec_id
        );
        Ok(out)
    }

    fn position(&mut self) -> MkvResult<u64> {
        Ok(self.writer.stream_position()?)
    }

    fn mark_top_level(&mut self, id: u32) -> MkvResult<()> {
        let pos = self.position()? - self.segment_data_start;
        self.seek_entries.push((id, pos));
        Ok(())
    }

    fn write_info(&mut self) -> MkvResult<()> {
        self.mark_top_level(INFO)?;

        let mut body = Vec::new();
        ebml::write_uint_element(&mut body, TIMECODE_SCALE, DEFAULT_TIMECODE_SCALE)?;
        let duration_offset = body.len() as u64;
        ebml::write_float_element(&mut body, DURATION, 0.0)?;
        ebml::write_string_element(&mut body, SEGMENT_FILENAME, &self.config.segment_filename)?;
        ebml::write_string_element(&mut body, MUXING_APP, &self.config.muxing_app)?;
        ebml::write_string_element(&mut body, WRITING_APP, &self.config.writing_app)?;

        ebml::write_element_id(&mut self.writer, INFO)?;
        ebml::write_vint(&mut self.writer, body.len() as u64)?;
        // Duration payload follows its 2-byte ID and 1-byte size
        self.duration_pos = self.position()? + duration_offset + 3;
        self.writer.write_all(&body)?;
        Ok(())
    }

    fn write_tracks(&mut self) -> MkvResult<()> {
        self.mark_top_level(TRACKS)?;

        let mut video = Vec::new();
        ebml::write_uint_element(&mut video, PIXEL_WIDTH, u64::from(self.config.width))?;
        ebml::write_uint_element(&mut video, PIXEL_HEIGHT, u64::from(self.config.height))?;
        ebml::write_uint_element(&mut video, DISPLAY_WIDTH, u64::from(self.config.width))?;
        ebml::write_uint_element(&mut video, DISPLAY_HEIGHT, u64::from(self.config.height))?;

        let mut entry = Vec::new();
        ebml::write_uint_element(&mut entry, TRACK_NUMBER, VIDEO_TRACK_NUMBER)?;
        ebml::write_uint_element(&mut entry, TRACK_UID, VIDEO_TRACK_UID)?;
        ebml::write_uint_element(&mut entry, TRACK_TYPE, TRACK_TYPE_VIDEO)?;
        ebml::write_uint_element(&mut entry, FLAG_LACING, 0)?;
        ebml::write_uint_element(&mut entry, MIN_CACHE, 1)?;
        ebml::write_uint_element(
            &mut entry,
            DEFAULT_DURATION,
            self.frame_duration * DEFAULT_TIMECODE_SCALE,
        )?;
        ebml::write_string_element(&mut entry, CODEC_ID, &self.config.codec_id)?;
        ebml::write_master_element(&mut entry, VIDEO, &video)?;

        let mut tracks = Vec::new();
        ebml::write_master_element(&mut tracks, TRACK_ENTRY, &entry)?;
        ebml::write_master_element(&mut self.writer, TRACKS, &tracks)
    }

    /// Writes the Attachments element.
    ///
    /// Must be called at most once and before the first frame.
    pub fn write_attachments(&mut self, files: &[AttachedFile]) -> MkvResult<()> {
        if self.state != WriterState::Header {
            return Err(MkvError::invalid_state(
                "attachments must be written once, before the first frame",
            ));
        }
        self.state = WriterState::Frames;
        if files.is_empty() {
            return Ok(());
        }

        self.mark_top_level(ATTACHMENTS)?;

        let mut body = Vec::new();
        for file in files {
            let mut entry = Vec::new();
            ebml::write_string_element(&mut entry, FILE_DESCRIPTION, &file.description)?;
            ebml::write_string_element(&mut entry, FILE_NAME, &file.name)?;
            ebml::write_string_element(&mut entry, FILE_MIME_TYPE, &file.mime_type)?;
            ebml::write_binary_element(&mut entry, FILE_DATA, &file.data)?;
            ebml::write_uint_element(&mut entry, FILE_UID, file.uid)?;
            ebml::write_master_element(&mut body, ATTACHED_FILE, &entry)?;
        }
        ebml::write_master_element(&mut self.writer, ATTACHMENTS, &body)?;

        debug!("Wrote {} attachments", files.len());
        Ok(())
    }

    /// Timecode the next frame will get, in ticks.
    #[inline]
    pub fn next_timecode(&self) -> u64 {
        self.config.timecode_at(self.frame_count)
    }

    /// Frames added so far.
    #[inline]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Frame duration in ticks.
    #[inline]
    pub fn frame_duration(&self) -> u64 {
        self.frame_duration
    }

    /// Cue points for the clusters rendered so far.
    pub fn cues(&self) -> &[CuePoint] {
        &self.cues
    }

    /// `true` when the next frame can only be stored in a new cluster,
    /// because its offset from the open cluster would overflow a Block's
    /// 16-bit relative timecode.
    pub fn needs_keyframe(&self) -> bool {
        match &self.cluster {
            Some(cluster) => self.next_timecode() - cluster.timecode > i16::MAX as u64,
            None => true,
        }
    }

    /// Adds one encoded frame.
    ///
    /// A keyframe closes the open cluster and starts a new one at the
    /// current timecode. The bytes are copied immediately.
    pub fn add_frame(&mut self, data: &[u8], is_keyframe: bool) -> MkvResult<()> {
        match self.state {
            WriterState::Finished => {
                return Err(MkvError::invalid_state("stream already finished"));
            }
            WriterState::Header => self.state = WriterState::Frames,
            WriterState::Frames => {}
        }

        let timecode = self.next_timecode();

        if is_keyframe {
            self.flush_cluster()?;
            debug!("Starting cluster at {} ms", timecode);
            self.cluster = Some(OpenCluster {
                timecode,
                blocks: Vec::new(),
            });
        } else if self.needs_keyframe() {
            return Err(MkvError::invalid_state(format!(
                "frame {} is not a keyframe and cannot start a cluster",
                self.frame_count
            )));
        }

        if let Some(cluster) = self.cluster.as_mut() {
            cluster.blocks.push(PendingBlock {
                timecode,
                data: data.to_vec(),
            });
        }
        self.frame_count += 1;
        Ok(())
    }

    fn flush_cluster(&mut self) -> MkvResult<()> {
        let Some(cluster) = self.cluster.take() else {
            return Ok(());
        };

        let mut body = Vec::new();
        ebml::write_uint_element(&mut body, TIMESTAMP, cluster.timecode)?;

        let mut prev: Option<u64> = None;
        for block in &cluster.blocks {
            let mut group = Vec::new();
            write_block(&mut group, block.timecode - cluster.timecode, &block.data)?;
            if let Some(prev_tc) = prev {
                ebml::write_int_element(
                    &mut group,
                    REFERENCE_BLOCK,
                    prev_tc as i64 - block.timecode as i64,
                )?;
            }
            ebml::write_uint_element(&mut group, BLOCK_DURATION, self.frame_duration)?;
            ebml::write_master_element(&mut body, BLOCK_GROUP, &group)?;
            prev = Some(block.timecode);
        }

        let cluster_position = self.position()? - self.segment_data_start;
        ebml::write_master_element(&mut self.writer, CLUSTER, &body)?;

        self.cues.push(CuePoint {
            time: cluster.timecode,
            track: VIDEO_TRACK_NUMBER,
            cluster_position,
        });

        debug!(
            "Flushed cluster at {} ms: {} block groups, {} bytes",
            cluster.timecode,
            cluster.blocks.len(),
            body.len()
        );
        Ok(())
    }

    fn write_cues(&mut self) -> MkvResult<()> {
        if self.cues.is_empty() {
            return Ok(());
        }
        self.mark_top_level(CUES)?;

        let mut body = Vec::new();
        for cue in &self.cues {
            let mut positions = Vec::new();
            ebml::write_uint_element(&mut positions, CUE_TRACK, cue.track)?;
            ebml::write_uint_element(&mut positions, CUE_CLUSTER_POSITION, cue.cluster_position)?;

            let mut point = Vec::new();
            ebml::write_uint_element(&mut point, CUE_TIME, cue.time)?;
            ebml::write_master_element(&mut point, CUE_TRACK_POSITIONS, &positions)?;
            ebml::write_master_element(&mut body, CUE_POINT, &point)?;
        }
        ebml::write_master_element(&mut self.writer, CUES, &body)
    }

    fn write_seek_head(&mut self) -> MkvResult<()> {
        let mut body = Vec::new();
        for &(id, pos) in &self.seek_entries {
            let mut seek = Vec::new();
            let id_bytes = id.to_be_bytes();
            let start = id_bytes.iter().position(|&b| b != 0).unwrap_or(3);
            ebml::write_binary_element(&mut seek, SEEK_ID, &id_bytes[start..])?;
            ebml::write_uint_element(&mut seek, SEEK_POSITION, pos)?;
            ebml::write_master_element(&mut body, SEEK, &seek)?;
        }

        let mut size_len = ebml::vint_length(body.len() as u64);
        let mut total = 4 + size_len as u64 + body.len() as u64;
        if total > SEEK_HEAD_RESERVATION {
            return Err(MkvError::invalid_state(format!(
                "SeekHead needs {total} bytes, only {SEEK_HEAD_RESERVATION} reserved"
            )));
        }
        // A 1-byte gap cannot hold a Void; widen the size field instead
        if SEEK_HEAD_RESERVATION - total == 1 {
            size_len += 1;
            total += 1;
        }

        self.writer.seek(SeekFrom::Start(self.seek_head_pos))?;
        ebml::write_element_id(&mut self.writer, SEEK_HEAD)?;
        ebml::write_vint_sized(&mut self.writer, body.len() as u64, size_len)?;
        self.writer.write_all(&body)?;

        let remaining = SEEK_HEAD_RESERVATION - total;
        if remaining > 0 {
            ebml::write_void(&mut self.writer, remaining)?;
        }
        Ok(())
    }

    /// Flushes the open cluster, writes Cues, patches Duration, SeekHead and
    /// the segment size, and returns the underlying writer.
    pub fn finish(mut self) -> MkvResult<W> {
        if self.state == WriterState::Finished {
            return Err(MkvError::invalid_state("stream already finished"));
        }

        self.flush_cluster()?;
        self.write_cues()?;

        let end = self.position()?;
        let duration = self.next_timecode() as f64;

        self.writer.seek(SeekFrom::Start(self.duration_pos))?;
        self.writer.write_f64::<BigEndian>(duration)?;

        self.write_seek_head()?;

        self.writer.seek(SeekFrom::Start(self.segment_size_pos))?;
        ebml::write_vint_sized(
            &mut self.writer,
            end - self.segment_data_start,
            SEGMENT_SIZE_LENGTH,
        )?;

        self.writer.seek(SeekFrom::Start(end))?;
        self.writer.flush()?;
        self.state = WriterState::Finished;

        info!(
            "Finished Matroska stream: {} frames, {} clusters, {} ms",
            self.frame_count,
            self.cues.len(),
            duration
        );
        Ok(self.writer)
    }
}

/// Block payload: track number, 16-bit relative timecode, flags, data.
fn write_block<W: Write>(writer: &mut W, relative: u64, data: &[u8]) -> MkvResult<()> {
    let relative = i16::try_from(relative).map_err(|_| {
        MkvError::invalid_block(format!("relative timecode {relative} exceeds 16 bits"))
    })?;

    let mut block = Vec::with_capacity(data.len() + 4);
    ebml::write_vint(&mut block, VIDEO_TRACK_NUMBER)?;
    block.write_i16::<BigEndian>(relative)?;
    block.write_u8(0)?;
    block.extend_from_slice(data);
    ebml::write_binary_element(writer, BLOCK, &block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn open() -> ContainerWriter<Cursor<Vec<u8>>> {
        ContainerWriter::open(Cursor::new(Vec::new()), WriterConfig::new("V_VP9", 16, 8, 25.0))
            .unwrap()
    }

    #[test]
    fn test_frame_duration() {
        assert_eq!(WriterConfig::new("V_VP9", 2, 2, 25.0).frame_duration(), 40);
        assert_eq!(WriterConfig::new("V_VP9", 2, 2, 30.0).frame_duration(), 33);
        assert_eq!(WriterConfig::new("V_VP9", 2, 2, 1.0).frame_duration(), 1000);
    }

    #[test]
    fn test_timecodes_do_not_drift() {
        let cfg = WriterConfig::new("V_VP9", 2, 2, 30.0);
        assert_eq!(cfg.timecode_at(1), 33);
        assert_eq!(cfg.timecode_at(2), 67);
        assert_eq!(cfg.timecode_at(300), 10000);

        let cfg = WriterConfig::new("V_VP9", 2, 2, 60.0);
        assert_eq!(cfg.timecode_at(600), 10000);
    }

    #[test]
    fn test_rejects_bad_fps() {
        let cfg = WriterConfig::new("V_VP9", 2, 2, 0.0);
        assert!(ContainerWriter::open(Cursor::new(Vec::new()), cfg).is_err());
    }

    #[test]
    fn test_header_layout() {
        let out = open().finish().unwrap().into_inner();
        assert_eq!(&out[..4], &[0x1A, 0x45, 0xDF, 0xA3]);
        // Segment size is patched to an 8-byte known size
        let seg = out.windows(4).position(|w| w == [0x18, 0x53, 0x80, 0x67]).unwrap();
        assert_eq!(out[seg + 4], 0x01);
        assert_ne!(&out[seg + 5..seg + 12], &[0xFF; 7]);
    }

    #[test]
    fn test_attachments_order() {
        let mut w = open();
        w.add_frame(b"key", true).unwrap();
        assert!(w.write_attachments(&[]).is_err());

        let mut w = open();
        w.write_attachments(&[]).unwrap();
        assert!(w.write_attachments(&[]).is_err());
    }

    #[test]
    fn test_first_frame_must_be_key() {
        let mut w = open();
        assert!(matches!(
            w.add_frame(b"delta", false),
            Err(MkvError::InvalidState(_))
        ));
    }

    #[test]
    fn test_cues_per_cluster() {
        let mut w = open();
        for i in 0..5 {
            w.add_frame(&[i as u8; 10], i % 2 == 0).unwrap();
        }
        assert_eq!(w.cues().len(), 2);
        assert_eq!(w.next_timecode(), 200);
        let out = w.finish().unwrap().into_inner();
        assert!(out.len() > SEEK_HEAD_RESERVATION as usize);
    }

    #[test]
    fn test_needs_keyframe_on_overflow() {
        let cfg = WriterConfig::new("V_VP9", 2, 2, 1.0);
        let mut w = ContainerWriter::open(Cursor::new(Vec::new()), cfg).unwrap();
        assert!(w.needs_keyframe());
        w.add_frame(b"k", true).unwrap();
        for _ in 0..32 {
            assert!(!w.needs_keyframe());
            w.add_frame(b"d", false).unwrap();
        }
        // 33 s after the cluster start
        assert!(w.needs_keyframe());
        assert!(w.add_frame(b"d", false).is_err());
    }
}
