//! Matroska element IDs used by the writer and reader.
//!
//! IDs keep their VINT marker bits, so a 4-byte ID such as [`SEGMENT`] is
//! written exactly as its hex value reads.

// EBML header
/// EBML header master element.
pub const EBML: u32 = 0x1A45DFA3;
/// EBML version.
pub const EBML_VERSION: u32 = 0x4286;
/// Minimum EBML version needed to read the stream.
pub const EBML_READ_VERSION: u32 = 0x42F7;
/// Longest element ID in the stream, in bytes.
pub const EBML_MAX_ID_LENGTH: u32 = 0x42F2;
/// Longest size field in the stream, in bytes.
pub const EBML_MAX_SIZE_LENGTH: u32 = 0x42F3;
/// Document type string.
pub const DOC_TYPE: u32 = 0x4282;
/// Document type version.
pub const DOC_TYPE_VERSION: u32 = 0x4287;
/// Minimum document type version needed to read the stream.
pub const DOC_TYPE_READ_VERSION: u32 = 0x4285;

// Global
/// Padding.
pub const VOID: u32 = 0xEC;
/// Checksum of the parent element.
pub const CRC32: u32 = 0xBF;

/// Segment, the root of all media data.
pub const SEGMENT: u32 = 0x18538067;

// Seek index
/// SeekHead master.
pub const SEEK_HEAD: u32 = 0x114D9B74;
/// One index entry.
pub const SEEK: u32 = 0x4DBB;
/// Indexed element ID (binary).
pub const SEEK_ID: u32 = 0x53AB;
/// Indexed element position relative to the segment data.
pub const SEEK_POSITION: u32 = 0x53AC;

// Segment info
/// Info master.
pub const INFO: u32 = 0x1549A966;
/// Nanoseconds per timecode tick.
pub const TIMECODE_SCALE: u32 = 0x2AD7B1;
/// Segment duration in ticks (float).
pub const DURATION: u32 = 0x4489;
/// Original file name.
pub const SEGMENT_FILENAME: u32 = 0x7384;
/// Muxing library.
pub const MUXING_APP: u32 = 0x4D80;
/// Writing application.
pub const WRITING_APP: u32 = 0x5741;

// Clusters
/// Cluster master.
pub const CLUSTER: u32 = 0x1F43B675;
/// Cluster base timecode.
pub const TIMESTAMP: u32 = 0xE7;
/// BlockGroup master.
pub const BLOCK_GROUP: u32 = 0xA0;
/// Block payload.
pub const BLOCK: u32 = 0xA1;
/// Block duration in ticks.
pub const BLOCK_DURATION: u32 = 0x9B;
/// Signed offset to a referenced block.
pub const REFERENCE_BLOCK: u32 = 0xFB;
/// Block with inline keyframe flag.
pub const SIMPLE_BLOCK: u32 = 0xA3;

// Tracks
/// Tracks master.
pub const TRACKS: u32 = 0x1654AE6B;
/// One track.
pub const TRACK_ENTRY: u32 = 0xAE;
/// Track number used by blocks.
pub const TRACK_NUMBER: u32 = 0xD7;
/// Track UID.
pub const TRACK_UID: u32 = 0x73C5;
/// Track type.
pub const TRACK_TYPE: u32 = 0x83;
/// Lacing allowed flag.
pub const FLAG_LACING: u32 = 0x9C;
/// Minimum number of frames a player should cache.
pub const MIN_CACHE: u32 = 0x6DE7;
/// Nanoseconds per frame.
pub const DEFAULT_DURATION: u32 = 0x23E383;
/// Codec identifier string.
pub const CODEC_ID: u32 = 0x86;
/// Video settings master.
pub const VIDEO: u32 = 0xE0;
/// Coded width.
pub const PIXEL_WIDTH: u32 = 0xB0;
/// Coded height.
pub const PIXEL_HEIGHT: u32 = 0xBA;
/// Display width.
pub const DISPLAY_WIDTH: u32 = 0x54B0;
/// Display height.
pub const DISPLAY_HEIGHT: u32 = 0x54BA;

/// TrackType value for video.
pub const TRACK_TYPE_VIDEO: u64 = 1;

// Attachments
/// Attachments master.
pub const ATTACHMENTS: u32 = 0x1941A469;
/// One attached file.
pub const ATTACHED_FILE: u32 = 0x61A7;
/// Human-readable description.
pub const FILE_DESCRIPTION: u32 = 0x467E;
/// File name.
pub const FILE_NAME: u32 = 0x466E;
/// MIME type.
pub const FILE_MIME_TYPE: u32 = 0x4660;
/// File contents.
pub const FILE_DATA: u32 = 0x465C;
/// File UID.
pub const FILE_UID: u32 = 0x46AE;

// Cues
/// Cues master.
pub const CUES: u32 = 0x1C53BB6B;
/// One cue point.
pub const CUE_POINT: u32 = 0xBB;
/// Cue timecode in ticks.
pub const CUE_TIME: u32 = 0xB3;
/// Per-track position master.
pub const CUE_TRACK_POSITIONS: u32 = 0xB7;
/// Track of the cue.
pub const CUE_TRACK: u32 = 0xF7;
/// Cluster position relative to the segment data.
pub const CUE_CLUSTER_POSITION: u32 = 0xF1;

/// Human-readable name for diagnostics.
pub fn element_name(id: u32) -> &'static str {
    match id {
        EBML => "EBML",
        SEGMENT => "Segment",
        SEEK_HEAD => "SeekHead",
        INFO => "Info",
        TRACKS => "Tracks",
        ATTACHMENTS => "Attachments",
        CLUSTER => "Cluster",
        CUES => "Cues",
        BLOCK_GROUP => "BlockGroup",
        BLOCK => "Block",
        SIMPLE_BLOCK => "SimpleBlock",
        VOID => "Void",
        CRC32 => "CRC-32",
        _ => "Unknown",
    }
}
