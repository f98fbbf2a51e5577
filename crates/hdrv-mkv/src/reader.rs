//! Matroska reader with cue-based seeking.
//!
//! [`ContainerReader::open`] parses the EBML header and the segment's side
//! tables (SeekHead, Info, Tracks, Attachments, and Cues when they precede
//! the clusters), then stops at the first Cluster. Frames are pulled one at
//! a time with [`ContainerReader::read_frame`], which walks a small state
//! machine:
//!
//! ```text
//! NeedCluster --cluster found--> InCluster --cluster exhausted--> NeedCluster
//!      |
//!      +--no more clusters--> Eof
//! ```
//!
//! Each nested parse keeps its own end offset as a local; no cursor state is
//! shared between nesting levels.

use std::collections::{BTreeMap, HashMap};
use std::io::{Read, Seek, SeekFrom};

use hdrv_core::search::nearest_index;
use tracing::{debug, warn};

use crate::ebml::{self, EbmlHeader, ElementHeader};
use crate::elements::*;
use crate::error::{MkvError, MkvResult};
use crate::writer::{AttachedFile, CuePoint, DEFAULT_TIMECODE_SCALE};

/// Traversal state of a [`ContainerReader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    /// Scanning top-level elements for the next cluster.
    NeedCluster,
    /// Yielding blocks from the current cluster.
    InCluster,
    /// No further clusters.
    Eof,
}

/// Segment Info values.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentInfo {
    /// Nanoseconds per tick.
    pub timecode_scale: u64,
    /// Duration in ticks.
    pub duration: f64,
    /// SegmentFilename.
    pub segment_filename: String,
    /// MuxingApp.
    pub muxing_app: String,
    /// WritingApp.
    pub writing_app: String,
}

impl Default for SegmentInfo {
    fn default() -> Self {
        Self {
            timecode_scale: DEFAULT_TIMECODE_SCALE,
            duration: 0.0,
            segment_filename: String::new(),
            muxing_app: String::new(),
            writing_app: String::new(),
        }
    }
}

/// The video track entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackInfo {
    /// Number referenced by blocks.
    pub number: u64,
    /// TrackUID.
    pub uid: u64,
    /// CodecID.
    pub codec_id: String,
    /// PixelWidth.
    pub width: u32,
    /// PixelHeight.
    pub height: u32,
    /// Nanoseconds per frame, when stored.
    pub default_duration: Option<u64>,
}

/// One frame read from a Block or SimpleBlock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockFrame {
    /// Track number from the block header.
    pub track: u64,
    /// Absolute timecode in ticks.
    pub timecode: u64,
    /// BlockDuration, if present.
    pub duration: Option<u64>,
    /// Relative offsets of referenced blocks; empty for keyframes.
    pub references: Vec<i64>,
    /// `true` when the block depends on no other block.
    pub is_keyframe: bool,
    /// Frame payload.
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy)]
struct ClusterCursor {
    timecode: u64,
    end: u64,
}

/// Pull-based Matroska reader.
#[derive(Debug)]
pub struct ContainerReader<R: Read + Seek> {
    reader: R,
    state: ReaderState,
    ebml_header: EbmlHeader,
    segment_data_start: u64,
    segment_end: u64,
    info: SegmentInfo,
    track: Option<TrackInfo>,
    attachments: BTreeMap<u64, AttachedFile>,
    seek_positions: HashMap<u32, u64>,
    cues: Vec<CuePoint>,
    cues_loaded: bool,
    first_cluster: Option<u64>,
    cluster: Option<ClusterCursor>,
}

impl<R: Read + Seek> ContainerReader<R> {
    /// Parses the stream headers up to the first cluster.
    pub fn open(mut reader: R) -> MkvResult<Self> {
        let header = ElementHeader::read(&mut reader)?;
        if header.id != EBML {
            return Err(MkvError::InvalidEbmlHeader(format!(
                "stream starts with element 0x{:X}",
                header.id
            )));
        }
        let ebml_header = EbmlHeader::read_body(&mut reader, header.known_size()?)?;

        let segment = ElementHeader::read(&mut reader)?;
        if segment.id != SEGMENT {
            return Err(MkvError::UnexpectedElement {
                expected: SEGMENT,
                found: segment.id,
            });
        }
        let segment_data_start = reader.stream_position()?;
        let segment_end = segment
            .size
            .map_or(u64::MAX, |s| segment_data_start + s);

        let mut this = Self {
            reader,
            state: ReaderState::NeedCluster,
            ebml_header,
            segment_data_start,
            segment_end,
            info: SegmentInfo::default(),
            track: None,
            attachments: BTreeMap::new(),
            seek_positions: HashMap::new(),
            cues: Vec::new(),
            cues_loaded: false,
            first_cluster: None,
            cluster: None,
        };
        this.read_side_tables()?;

        debug!(
            "Opened Matroska stream: duration {} ticks, {} attachments, first cluster {:?}",
            this.info.duration,
            this.attachments.len(),
            this.first_cluster
        );
        Ok(this)
    }

    fn position(&mut self) -> MkvResult<u64> {
        Ok(self.reader.stream_position()?)
    }

    fn read_side_tables(&mut self) -> MkvResult<()> {
        while self.position()? < self.segment_end {
            let start = self.position()?;
            let header = match ElementHeader::read(&mut self.reader) {
                Ok(h) => h,
                Err(e) if e.is_eof() => break,
                Err(e) => return Err(e),
            };

            if header.id == CLUSTER {
                self.first_cluster = Some(start - self.segment_data_start);
                self.reader.seek(SeekFrom::Start(start))?;
                return Ok(());
            }
            self.consume_top_level(header)?;
        }

        self.state = ReaderState::Eof;
        Ok(())
    }

    /// Handles one non-cluster top-level element.
    fn consume_top_level(&mut self, header: ElementHeader) -> MkvResult<()> {
        let size = header.known_size()?;
        match header.id {
            SEEK_HEAD => self.parse_seek_head(size),
            INFO => self.parse_info(size),
            TRACKS => self.parse_tracks(size),
            ATTACHMENTS => self.parse_attachments(size),
            CUES => {
                self.cues = self.parse_cues(size)?;
                self.cues_loaded = true;
                Ok(())
            }
            _ => ebml::skip_element(&mut self.reader, size),
        }
    }

    /// Calls `f` for each child of a master element with `size` payload bytes.
    fn for_each_child(
        &mut self,
        size: u64,
        mut f: impl FnMut(&mut Self, ElementHeader) -> MkvResult<()>,
    ) -> MkvResult<()> {
        let end = self.position()?.saturating_add(size);
        while self.position()? < end {
            let child = ElementHeader::read(&mut self.reader)?;
            if let Some(child_size) = child.size {
                let left = end.saturating_sub(self.position()?);
                if child_size > left {
                    return Err(MkvError::invalid_value(format!(
                        "element 0x{:X} of {} bytes overruns its parent ({} bytes left)",
                        child.id, child_size, left
                    )));
                }
            }
            f(&mut *self, child)?;
        }
        Ok(())
    }

    fn read_child(&mut self, header: ElementHeader) -> MkvResult<Vec<u8>> {
        ebml::read_payload(&mut self.reader, header.known_size()?)
    }

    fn skip_child(&mut self, header: ElementHeader) -> MkvResult<()> {
        ebml::skip_element(&mut self.reader, header.known_size()?)
    }

    fn parse_seek_head(&mut self, size: u64) -> MkvResult<()> {
        self.for_each_child(size, |this, seek| {
            if seek.id != SEEK {
                return this.skip_child(seek);
            }
            let mut id = None;
            let mut pos = None;
            this.for_each_child(seek.known_size()?, |this, child| {
                match child.id {
                    SEEK_ID => {
                        id = Some(ebml::read_unsigned_int(&this.read_child(child)?)? as u32)
                    }
                    SEEK_POSITION => pos = Some(ebml::read_unsigned_int(&this.read_child(child)?)?),
                    _ => this.skip_child(child)?,
                }
                Ok(())
            })?;
            if let (Some(id), Some(pos)) = (id, pos) {
                this.seek_positions.insert(id, pos);
            }
            Ok(())
        })
    }

    fn parse_info(&mut self, size: u64) -> MkvResult<()> {
        self.for_each_child(size, |this, child| {
            match child.id {
                TIMECODE_SCALE => {
                    this.info.timecode_scale = ebml::read_unsigned_int(&this.read_child(child)?)?
                }
                DURATION => this.info.duration = ebml::read_float(&this.read_child(child)?)?,
                SEGMENT_FILENAME => {
                    this.info.segment_filename = ebml::read_string(&this.read_child(child)?)?
                }
                MUXING_APP => this.info.muxing_app = ebml::read_string(&this.read_child(child)?)?,
                WRITING_APP => {
                    this.info.writing_app = ebml::read_string(&this.read_child(child)?)?
                }
                _ => this.skip_child(child)?,
            }
            Ok(())
        })
    }

    fn parse_tracks(&mut self, size: u64) -> MkvResult<()> {
        self.for_each_child(size, |this, entry| {
            if entry.id != TRACK_ENTRY {
                return this.skip_child(entry);
            }
            let mut track = TrackInfo::default();
            let mut track_type = 0;
            this.for_each_child(entry.known_size()?, |this, child| {
                match child.id {
                    TRACK_NUMBER => track.number = ebml::read_unsigned_int(&this.read_child(child)?)?,
                    TRACK_UID => track.uid = ebml::read_unsigned_int(&this.read_child(child)?)?,
                    TRACK_TYPE => track_type = ebml::read_unsigned_int(&this.read_child(child)?)?,
                    CODEC_ID => track.codec_id = ebml::read_string(&this.read_child(child)?)?,
                    DEFAULT_DURATION => {
                        track.default_duration =
                            Some(ebml::read_unsigned_int(&this.read_child(child)?)?)
                    }
                    VIDEO => this.for_each_child(child.known_size()?, |this, v| {
                        match v.id {
                            PIXEL_WIDTH => {
                                track.width = ebml::read_unsigned_int(&this.read_child(v)?)? as u32
                            }
                            PIXEL_HEIGHT => {
                                track.height = ebml::read_unsigned_int(&this.read_child(v)?)? as u32
                            }
                            _ => this.skip_child(v)?,
                        }
                        Ok(())
                    })?,
                    _ => this.skip_child(child)?,
                }
                Ok(())
            })?;

            if track_type == TRACK_TYPE_VIDEO && this.track.is_none() {
                this.track = Some(track);
            }
            Ok(())
        })
    }

    fn parse_attachments(&mut self, size: u64) -> MkvResult<()> {
        self.for_each_child(size, |this, file| {
            if file.id != ATTACHED_FILE {
                return this.skip_child(file);
            }
            let mut attached = AttachedFile {
                uid: 0,
                name: String::new(),
                mime_type: String::new(),
                description: String::new(),
                data: Vec::new(),
            };
            this.for_each_child(file.known_size()?, |this, child| {
                match child.id {
                    FILE_UID => attached.uid = ebml::read_unsigned_int(&this.read_child(child)?)?,
                    FILE_NAME => attached.name = ebml::read_string(&this.read_child(child)?)?,
                    FILE_MIME_TYPE => {
                        attached.mime_type = ebml::read_string(&this.read_child(child)?)?
                    }
                    FILE_DESCRIPTION => {
                        attached.description = ebml::read_string(&this.read_child(child)?)?
                    }
                    FILE_DATA => attached.data = this.read_child(child)?,
                    _ => this.skip_child(child)?,
                }
                Ok(())
            })?;
            this.attachments.insert(attached.uid, attached);
            Ok(())
        })
    }

    fn parse_cues(&mut self, size: u64) -> MkvResult<Vec<CuePoint>> {
        let mut cues = Vec::new();
        self.for_each_child(size, |this, point| {
            if point.id != CUE_POINT {
                return this.skip_child(point);
            }
            let mut cue = CuePoint {
                time: 0,
                track: 0,
                cluster_position: 0,
            };
            this.for_each_child(point.known_size()?, |this, child| {
                match child.id {
                    CUE_TIME => cue.time = ebml::read_unsigned_int(&this.read_child(child)?)?,
                    CUE_TRACK_POSITIONS => this.for_each_child(child.known_size()?, |this, p| {
                        match p.id {
                            CUE_TRACK => cue.track = ebml::read_unsigned_int(&this.read_child(p)?)?,
                            CUE_CLUSTER_POSITION => {
                                cue.cluster_position =
                                    ebml::read_unsigned_int(&this.read_child(p)?)?
                            }
                            _ => this.skip_child(p)?,
                        }
                        Ok(())
                    })?,
                    _ => this.skip_child(child)?,
                }
                Ok(())
            })?;
            cues.push(cue);
            Ok(())
        })?;

        cues.sort_by_key(|c| c.time);
        cues.dedup_by_key(|c| c.time);
        debug!("Loaded {} cue points", cues.len());
        Ok(cues)
    }

    /// Loads the cue index if it has not been read yet.
    ///
    /// Uses the SeekHead entry when present, otherwise scans top-level
    /// elements after the first cluster. The read position is restored.
    pub fn load_cues(&mut self) -> MkvResult<()> {
        if self.cues_loaded {
            return Ok(());
        }
        let saved = self.position()?;
        let found = match self.seek_positions.get(&CUES).copied() {
            Some(rel) => self.read_cues_at(rel).map(Some),
            None => self.scan_for_cues(),
        };
        self.reader.seek(SeekFrom::Start(saved))?;

        self.cues = found?.unwrap_or_default();
        self.cues_loaded = true;
        Ok(())
    }

    fn read_cues_at(&mut self, rel: u64) -> MkvResult<Vec<CuePoint>> {
        self.reader
            .seek(SeekFrom::Start(self.segment_data_start + rel))?;
        let header = ElementHeader::read(&mut self.reader)?;
        if header.id != CUES {
            return Err(MkvError::UnexpectedElement {
                expected: CUES,
                found: header.id,
            });
        }
        self.parse_cues(header.known_size()?)
    }

    fn scan_for_cues(&mut self) -> MkvResult<Option<Vec<CuePoint>>> {
        let Some(first) = self.first_cluster else {
            return Ok(None);
        };
        self.reader
            .seek(SeekFrom::Start(self.segment_data_start + first))?;

        while self.position()? < self.segment_end {
            let header = match ElementHeader::read(&mut self.reader) {
                Ok(h) => h,
                Err(e) if e.is_eof() => break,
                Err(e) => return Err(e),
            };
            if header.id == CUES {
                return Ok(Some(self.parse_cues(header.known_size()?)?));
            }
            ebml::skip_element(&mut self.reader, header.known_size()?)?;
        }
        Ok(None)
    }

    /// Reads the next frame. `Ok(None)` signals the end of the stream.
    pub fn read_frame(&mut self) -> MkvResult<Option<BlockFrame>> {
        loop {
            match self.state {
                ReaderState::Eof => return Ok(None),
                ReaderState::NeedCluster => match self.find_next_cluster() {
                    Ok(true) => self.state = ReaderState::InCluster,
                    Ok(false) => self.state = ReaderState::Eof,
                    Err(MkvError::Io(e)) if e.kind() != std::io::ErrorKind::UnexpectedEof => {
                        return Err(MkvError::Io(e));
                    }
                    Err(e) => {
                        warn!("Stopping at malformed data while looking for a cluster: {}", e);
                        self.state = ReaderState::Eof;
                    }
                },
                ReaderState::InCluster => match self.next_block()? {
                    Some(frame) => return Ok(Some(frame)),
                    None => {
                        self.cluster = None;
                        self.state = ReaderState::NeedCluster;
                    }
                },
            }
        }
    }

    fn find_next_cluster(&mut self) -> MkvResult<bool> {
        while self.position()? < self.segment_end {
            let header = match ElementHeader::read(&mut self.reader) {
                Ok(h) => h,
                Err(e) if e.is_eof() => return Ok(false),
                Err(e) => return Err(e),
            };

            if header.id == CLUSTER {
                let data_start = self.position()?;
                let end = header
                    .size
                    .map_or(self.segment_end, |s| data_start + s);
                self.cluster = Some(ClusterCursor { timecode: 0, end });
                return Ok(true);
            }
            self.consume_top_level(header)?;
        }
        Ok(false)
    }

    fn next_block(&mut self) -> MkvResult<Option<BlockFrame>> {
        let Some(mut cursor) = self.cluster else {
            return Ok(None);
        };

        while self.position()? < cursor.end {
            let start = self.position()?;
            let header = match ElementHeader::read(&mut self.reader) {
                Ok(h) => h,
                Err(e) if e.is_eof() => return Ok(None),
                Err(e) => return Err(e),
            };

            match header.id {
                TIMESTAMP => {
                    cursor.timecode = ebml::read_unsigned_int(&self.read_child(header)?)?;
                    self.cluster = Some(cursor);
                }
                BLOCK_GROUP => {
                    if let Some(frame) = self.parse_block_group(header.known_size()?, cursor)? {
                        return Ok(Some(frame));
                    }
                }
                SIMPLE_BLOCK => {
                    let data = self.read_child(header)?;
                    let (mut frame, flags) = parse_block(&data, cursor.timecode)?;
                    frame.is_keyframe = flags & 0x80 != 0;
                    return Ok(Some(frame));
                }
                // Next cluster inside an unknown-size cluster
                CLUSTER => {
                    self.reader.seek(SeekFrom::Start(start))?;
                    return Ok(None);
                }
                _ => self.skip_child(header)?,
            }
        }
        Ok(None)
    }

    fn parse_block_group(
        &mut self,
        size: u64,
        cursor: ClusterCursor,
    ) -> MkvResult<Option<BlockFrame>> {
        let mut block = None;
        let mut duration = None;
        let mut references = Vec::new();

        self.for_each_child(size, |this, child| {
            match child.id {
                BLOCK => block = Some(this.read_child(child)?),
                BLOCK_DURATION => {
                    duration = Some(ebml::read_unsigned_int(&this.read_child(child)?)?)
                }
                REFERENCE_BLOCK => {
                    references.push(ebml::read_signed_int(&this.read_child(child)?)?)
                }
                _ => this.skip_child(child)?,
            }
            Ok(())
        })?;

        let Some(data) = block else {
            warn!("BlockGroup without a Block in cluster at {}", cursor.timecode);
            return Ok(None);
        };

        let (mut frame, _) = parse_block(&data, cursor.timecode)?;
        frame.is_keyframe = references.is_empty();
        frame.duration = duration;
        frame.references = references;
        Ok(Some(frame))
    }

    /// Seeks to the cluster whose cue is nearest to `t`.
    ///
    /// With `absolute == false`, `t` is a fraction of the duration in
    /// `[0, 1]`; otherwise it is a time in milliseconds. Exact ties between
    /// two cues resolve to the later one. Traversal restarts at
    /// [`ReaderState::NeedCluster`].
    pub fn seek_to_time(&mut self, t: f64, absolute: bool) -> MkvResult<()> {
        self.load_cues()?;
        if self.cues.is_empty() {
            return Err(MkvError::MissingElement("Cues".to_string()));
        }

        let ms_per_tick = self.info.timecode_scale as f64 / 1e6;
        let target = if absolute {
            t / ms_per_tick
        } else {
            t * self.info.duration
        };

        let cues = &self.cues;
        let idx = nearest_index(cues.len(), target, |i| cues[i].time as f64).unwrap_or(0);
        let cue = cues[idx];

        debug!(
            "Seeking to cue {} at {} ticks (target {:.1})",
            idx, cue.time, target
        );
        self.reader
            .seek(SeekFrom::Start(self.segment_data_start + cue.cluster_position))?;
        self.cluster = None;
        self.state = ReaderState::NeedCluster;
        Ok(())
    }

    /// Current traversal state.
    #[inline]
    pub fn state(&self) -> ReaderState {
        self.state
    }

    /// EBML header values.
    pub fn ebml_header(&self) -> &EbmlHeader {
        &self.ebml_header
    }

    /// Segment Info values.
    pub fn info(&self) -> &SegmentInfo {
        &self.info
    }

    /// Duration in milliseconds.
    pub fn duration_ms(&self) -> f64 {
        self.info.duration * self.info.timecode_scale as f64 / 1e6
    }

    /// The video track, if the stream has one.
    pub fn track(&self) -> Option<&TrackInfo> {
        self.track.as_ref()
    }

    /// Attachments keyed by FileUID.
    pub fn attachments(&self) -> &BTreeMap<u64, AttachedFile> {
        &self.attachments
    }

    /// Attachment payload by FileUID.
    pub fn attachment(&self, uid: u64) -> Option<&[u8]> {
        self.attachments.get(&uid).map(|a| a.data.as_slice())
    }

    /// Loaded cue points, ascending by time.
    pub fn cues(&self) -> &[CuePoint] {
        &self.cues
    }

    /// Base timecode of the cluster being read.
    pub fn cluster_timecode(&self) -> Option<u64> {
        self.cluster.map(|c| c.timecode)
    }

    /// Consumes the reader and returns the underlying stream.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

/// Splits a Block payload into header fields and frame data. Returns the
/// frame (keyframe flag unset) and the flags byte.
fn parse_block(data: &[u8], cluster_timecode: u64) -> MkvResult<(BlockFrame, u8)> {
    let mut cur = std::io::Cursor::new(data);
    let (track, len) = ebml::read_vint(&mut cur)?;

    let Some(header) = data.get(len..len + 3) else {
        return Err(MkvError::invalid_block(format!(
            "{} bytes is too short for a block header",
            data.len()
        )));
    };
    let relative = i16::from_be_bytes([header[0], header[1]]);
    let flags = header[2];
    if (flags >> 1) & 0x03 != 0 {
        return Err(MkvError::invalid_block("laced blocks are not supported"));
    }

    let timecode = cluster_timecode
        .checked_add_signed(i64::from(relative))
        .ok_or_else(|| MkvError::invalid_block("negative block timecode"))?;

    Ok((
        BlockFrame {
            track,
            timecode,
            duration: None,
            references: Vec::new(),
            is_keyframe: false,
            data: data[len + 3..].to_vec(),
        },
        flags,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::{ContainerWriter, WriterConfig};
    use std::io::Cursor;

    fn write_stream(frames: usize, fps: f64, keys: &[usize]) -> Vec<u8> {
        let cfg = WriterConfig::new("V_VP9", 4, 2, fps);
        let mut w = ContainerWriter::open(Cursor::new(Vec::new()), cfg).unwrap();
        w.write_attachments(&[AttachedFile {
            uid: 430,
            name: "meta".into(),
            mime_type: String::new(),
            description: "PTF bit depth".into(),
            data: 11u32.to_le_bytes().to_vec(),
        }])
        .unwrap();
        for i in 0..frames {
            w.add_frame(&[i as u8; 3], keys.contains(&i)).unwrap();
        }
        w.finish().unwrap().into_inner()
    }

    #[test]
    fn test_open_reads_side_tables() {
        let data = write_stream(3, 25.0, &[0]);
        let r = ContainerReader::open(Cursor::new(data)).unwrap();

        assert_eq!(r.ebml_header().doc_type, "matroska");
        assert_eq!(r.info().timecode_scale, 1_000_000);
        assert_eq!(r.info().duration, 120.0);
        assert_eq!(r.duration_ms(), 120.0);

        let track = r.track().unwrap();
        assert_eq!(track.number, 1);
        assert_eq!(track.uid, 13);
        assert_eq!(track.codec_id, "V_VP9");
        assert_eq!((track.width, track.height), (4, 2));
        assert_eq!(track.default_duration, Some(40_000_000));

        assert_eq!(r.attachment(430), Some(&11u32.to_le_bytes()[..]));
        assert_eq!(r.attachments()[&430].description, "PTF bit depth");
    }

    #[test]
    fn test_duration_at_fractional_frame_rate() {
        let data = write_stream(300, 30.0, &[0, 150]);
        let mut r = ContainerReader::open(Cursor::new(data)).unwrap();
        assert_eq!(r.duration_ms(), 10000.0);

        r.load_cues().unwrap();
        let times: Vec<u64> = r.cues().iter().map(|c| c.time).collect();
        assert_eq!(times, [0, 5000]);

        let mut last = None;
        while let Some(block) = r.read_frame().unwrap() {
            last = Some(block.timecode);
        }
        assert_eq!(last, Some(9967));
    }

    #[test]
    fn test_read_frames_and_references() {
        let data = write_stream(5, 25.0, &[0, 3]);
        let mut r = ContainerReader::open(Cursor::new(data)).unwrap();

        let mut frames = Vec::new();
        while let Some(f) = r.read_frame().unwrap() {
            frames.push(f);
        }
        assert_eq!(r.state(), ReaderState::Eof);
        assert!(r.read_frame().unwrap().is_none());

        assert_eq!(frames.len(), 5);
        let timecodes: Vec<u64> = frames.iter().map(|f| f.timecode).collect();
        assert_eq!(timecodes, [0, 40, 80, 120, 160]);

        let keys: Vec<bool> = frames.iter().map(|f| f.is_keyframe).collect();
        assert_eq!(keys, [true, false, false, true, false]);
        assert_eq!(frames[1].references, [-40]);
        assert_eq!(frames[2].references, [-40]);
        assert!(frames[3].references.is_empty());
        assert_eq!(frames[4].data, [4, 4, 4]);
        assert_eq!(frames[4].duration, Some(40));
    }

    #[test]
    fn test_cues_loaded_lazily() {
        let data = write_stream(4, 25.0, &[0, 2]);
        let mut r = ContainerReader::open(Cursor::new(data)).unwrap();
        assert!(r.cues().is_empty());
        r.load_cues().unwrap();
        let times: Vec<u64> = r.cues().iter().map(|c| c.time).collect();
        assert_eq!(times, [0, 80]);

        // Position is restored
        assert_eq!(r.read_frame().unwrap().unwrap().timecode, 0);
    }

    #[test]
    fn test_seek_relative_and_absolute() {
        let data = write_stream(10, 1.0, &[0, 5, 9]);
        let mut r = ContainerReader::open(Cursor::new(data)).unwrap();

        r.seek_to_time(0.5, false).unwrap();
        let f = r.read_frame().unwrap().unwrap();
        assert_eq!(f.timecode, 5000);
        assert_eq!(r.cluster_timecode(), Some(5000));

        r.seek_to_time(8600.0, true).unwrap();
        assert_eq!(r.read_frame().unwrap().unwrap().timecode, 9000);

        r.seek_to_time(0.0, false).unwrap();
        assert_eq!(r.read_frame().unwrap().unwrap().timecode, 0);
    }

    #[test]
    fn test_rejects_non_ebml() {
        let err = ContainerReader::open(Cursor::new(vec![0xEC, 0x80])).unwrap_err();
        assert!(matches!(err, MkvError::InvalidEbmlHeader(_)));
    }

    #[test]
    fn test_truncated_stream_is_soft_eof() {
        let data = write_stream(4, 25.0, &[0, 2]);
        let mut r = ContainerReader::open(Cursor::new(data.clone())).unwrap();
        r.load_cues().unwrap();
        let second = (r.segment_data_start + r.cues()[1].cluster_position) as usize;

        // Cut inside the second cluster's ID
        let mut r = ContainerReader::open(Cursor::new(data[..second + 2].to_vec())).unwrap();
        assert_eq!(r.read_frame().unwrap().unwrap().timecode, 0);
        assert_eq!(r.read_frame().unwrap().unwrap().timecode, 40);
        assert!(r.read_frame().unwrap().is_none());
        assert_eq!(r.state(), ReaderState::Eof);

        // Garbage where the second cluster should start
        let mut corrupt = data;
        corrupt[second] = 0x00;
        let mut r = ContainerReader::open(Cursor::new(corrupt)).unwrap();
        let mut n = 0;
        while r.read_frame().unwrap().is_some() {
            n += 1;
        }
        assert_eq!(n, 2);
    }

    /// EBML header and an unknown-size Segment holding `body`.
    fn segment_with(body: &[u8]) -> Vec<u8> {
        let mut data = Vec::new();
        EbmlHeader::default().write(&mut data).unwrap();
        data.extend_from_slice(&[0x18, 0x53, 0x80, 0x67]);
        data.extend_from_slice(&[0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
        data.extend_from_slice(body);
        data
    }

    #[test]
    fn test_oversized_payload_is_rejected() {
        // Attachments > AttachedFile > FileData, each claiming ~2^56 bytes
        let data = segment_with(&[
            0x19, 0x41, 0xA4, 0x69, 0x01, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
            0x61, 0xA7, 0x01, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xF0,
            0x46, 0x5C, 0x01, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00,
            0xDE, 0xAD,
        ]);
        let err = ContainerReader::open(Cursor::new(data)).unwrap_err();
        assert!(matches!(err, MkvError::InvalidValue(_)));
        assert!(err.is_format());
    }

    #[test]
    fn test_child_overrunning_parent_is_rejected() {
        // AttachedFile of 4 bytes holding a FileData that claims 16
        let data = segment_with(&[
            0x19, 0x41, 0xA4, 0x69, 0x87,
            0x61, 0xA7, 0x84,
            0x46, 0x5C, 0x90, 0x00,
        ]);
        let err = ContainerReader::open(Cursor::new(data)).unwrap_err();
        assert!(matches!(err, MkvError::InvalidValue(_)));
    }

    #[test]
    fn test_failed_cue_load_keeps_position() {
        let data = write_stream(4, 25.0, &[0, 2]);
        let r = ContainerReader::open(Cursor::new(data.clone())).unwrap();
        let cues_at = (r.segment_data_start + r.seek_positions[&CUES]) as usize;
        assert_eq!(&data[cues_at..cues_at + 4], &[0x1C, 0x53, 0xBB, 0x6B]);

        let mut corrupt = data;
        corrupt[cues_at] = 0x1F;
        let mut r = ContainerReader::open(Cursor::new(corrupt)).unwrap();
        assert_eq!(r.read_frame().unwrap().unwrap().timecode, 0);
        assert!(matches!(
            r.load_cues(),
            Err(MkvError::UnexpectedElement { expected: CUES, .. })
        ));
        assert_eq!(r.read_frame().unwrap().unwrap().timecode, 40);
        assert_eq!(r.read_frame().unwrap().unwrap().timecode, 80);
    }

    #[test]
    fn test_parse_block() {
        let (frame, flags) = parse_block(&[0x81, 0x00, 0x28, 0x80, 7, 8], 1000).unwrap();
        assert_eq!(frame.track, 1);
        assert_eq!(frame.timecode, 1040);
        assert_eq!(flags, 0x80);
        assert_eq!(frame.data, [7, 8]);

        assert!(parse_block(&[0x81, 0x00], 0).is_err());
        assert!(parse_block(&[0x81, 0x00, 0x00, 0x02], 0).is_err());
    }
}
