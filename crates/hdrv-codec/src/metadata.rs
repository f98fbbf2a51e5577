//! Quantizer configuration stored as container attachments.
//!
//! Each setting is one attachment keyed by a fixed FileUID:
//!
//! | ID | Content | Encoding |
//! |----|---------|----------|
//! | 430 | PTF bit depth | `u32` |
//! | 431 | Color bit depth | `u32` |
//! | 432 | PTF kind | `u32` code |
//! | 433 | Color space | `u32` code |
//! | 434 | Mapping table | `2^bits` x `f32` |
//! | 435 | Pre-scaling | `f32` |
//! | 436 | Luminance range | `[max, min]` x `f32` |
//!
//! Values are little-endian. 430 to 434 are required; 435 and 436 fall back
//! to defaults when absent.

use std::collections::BTreeMap;

use byteorder::{LittleEndian, ReadBytesExt};
use hdrv_core::{ColorSpaceKind, PtfKind};
use hdrv_mkv::AttachedFile;
use hdrv_transfer::TransferFunctionTable;
use tracing::{debug, warn};

use crate::error::{CodecError, CodecResult};
use crate::quantizer::QuantizerConfig;

/// PTF bit depth.
pub const ATTACHMENT_PTF_BIT_DEPTH: u64 = 430;
/// Color bit depth.
pub const ATTACHMENT_COLOR_BIT_DEPTH: u64 = 431;
/// PTF kind code.
pub const ATTACHMENT_PTF_KIND: u64 = 432;
/// Color space code.
pub const ATTACHMENT_COLOR_SPACE: u64 = 433;
/// PTF mapping table.
pub const ATTACHMENT_PTF_TABLE: u64 = 434;
/// Pre-scaling factor.
pub const ATTACHMENT_PRE_SCALING: u64 = 435;
/// Maximum and minimum luminance.
pub const ATTACHMENT_LUMINANCE_RANGE: u64 = 436;

/// FileName given to every metadata attachment.
pub const ATTACHMENT_FILE_NAME: &str = "HDRV meta data";

/// Pre-scaling assumed when 435 is missing.
pub const DEFAULT_PRE_SCALING: f32 = 1.0;
/// Luminance range assumed when 436 is missing, as `[max, min]`.
pub const DEFAULT_LUMINANCE_RANGE: [f32; 2] = [10000.0, 0.005];

/// Session settings persisted in the container.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerMetadata {
    /// Quantizer configuration including the mapping table.
    pub config: QuantizerConfig,
    /// Factor applied before the forward color transform.
    pub pre_scaling: f32,
}

impl ContainerMetadata {
    /// Wraps a configuration.
    pub fn new(config: QuantizerConfig, pre_scaling: f32) -> Self {
        Self {
            config,
            pre_scaling,
        }
    }

    /// Serializes into attachments 430 to 436.
    pub fn to_attachments(&self) -> Vec<AttachedFile> {
        let c = &self.config;
        let table = c.table.mapping();

        let mut blob = Vec::with_capacity(table.len() * 4);
        for &v in table {
            push_f32(&mut blob, v);
        }

        let mut range = Vec::with_capacity(8);
        push_f32(&mut range, c.max_lum());
        push_f32(&mut range, c.min_lum());

        let mut scaling = Vec::with_capacity(4);
        push_f32(&mut scaling, self.pre_scaling);

        vec![
            attachment(ATTACHMENT_PTF_BIT_DEPTH, "PTF bit depth", u32_blob(c.ptf_bit_depth())),
            attachment(ATTACHMENT_COLOR_BIT_DEPTH, "Color bit depth", u32_blob(c.color_bit_depth)),
            attachment(ATTACHMENT_PTF_KIND, "PTF description", u32_blob(c.ptf().code())),
            attachment(ATTACHMENT_COLOR_SPACE, "Color space", u32_blob(c.color_space.code())),
            attachment(ATTACHMENT_PTF_TABLE, "PTF", blob),
            attachment(ATTACHMENT_PRE_SCALING, "Scaling", scaling),
            attachment(ATTACHMENT_LUMINANCE_RANGE, "Luminance range", range),
        ]
    }

    /// Rebuilds the configuration from a stream's attachments.
    ///
    /// # Errors
    ///
    /// [`CodecError::MissingAttachment`] when 430 to 434 is absent,
    /// [`CodecError::InvalidAttachment`] for short or inconsistent blobs, and
    /// unknown PTF or color space codes.
    pub fn from_attachments(files: &BTreeMap<u64, AttachedFile>) -> CodecResult<Self> {
        let ptf_bits = read_u32(
            required(files, ATTACHMENT_PTF_BIT_DEPTH, "PTF bit depth")?,
            ATTACHMENT_PTF_BIT_DEPTH,
        )?;
        let color_bits = read_u32(
            required(files, ATTACHMENT_COLOR_BIT_DEPTH, "color bit depth")?,
            ATTACHMENT_COLOR_BIT_DEPTH,
        )?;
        let ptf = PtfKind::from_code(read_u32(
            required(files, ATTACHMENT_PTF_KIND, "PTF kind")?,
            ATTACHMENT_PTF_KIND,
        )?)?;
        let space = ColorSpaceKind::from_code(read_u32(
            required(files, ATTACHMENT_COLOR_SPACE, "color space")?,
            ATTACHMENT_COLOR_SPACE,
        )?)?;

        if !(1..=16).contains(&ptf_bits) {
            return Err(CodecError::invalid_attachment(
                ATTACHMENT_PTF_BIT_DEPTH,
                format!("bit depth {ptf_bits} outside 1..=16"),
            ));
        }
        let mapping = read_table(required(files, ATTACHMENT_PTF_TABLE, "PTF table")?, ptf_bits)?;

        let pre_scaling = match files.get(&ATTACHMENT_PRE_SCALING) {
            Some(f) => read_f32s(&f.data, 1, ATTACHMENT_PRE_SCALING)?[0],
            None => {
                debug!("No pre-scaling attachment, using {DEFAULT_PRE_SCALING}");
                DEFAULT_PRE_SCALING
            }
        };
        let [max_lum, min_lum] = match files.get(&ATTACHMENT_LUMINANCE_RANGE) {
            Some(f) => {
                let v = read_f32s(&f.data, 2, ATTACHMENT_LUMINANCE_RANGE)?;
                [v[0], v[1]]
            }
            None => {
                debug!("No luminance range attachment, using defaults");
                DEFAULT_LUMINANCE_RANGE
            }
        };

        let table = TransferFunctionTable::from_mapping(ptf, ptf_bits, min_lum, max_lum, mapping)?;
        let config = QuantizerConfig::from_table(table, color_bits, space)?;
        Ok(Self {
            config,
            pre_scaling,
        })
    }
}

fn attachment(uid: u64, description: &str, data: Vec<u8>) -> AttachedFile {
    AttachedFile {
        uid,
        name: ATTACHMENT_FILE_NAME.to_string(),
        mime_type: String::new(),
        description: description.to_string(),
        data,
    }
}

fn u32_blob(v: u32) -> Vec<u8> {
    v.to_le_bytes().to_vec()
}

fn push_f32(out: &mut Vec<u8>, v: f32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn required<'a>(
    files: &'a BTreeMap<u64, AttachedFile>,
    id: u64,
    name: &'static str,
) -> CodecResult<&'a [u8]> {
    files
        .get(&id)
        .map(|f| f.data.as_slice())
        .ok_or(CodecError::MissingAttachment { id, name })
}

fn read_u32(data: &[u8], id: u64) -> CodecResult<u32> {
    let len = data.len();
    let mut cur = data;
    cur.read_u32::<LittleEndian>()
        .map_err(|_| CodecError::invalid_attachment(id, format!("{len} bytes, expected 4")))
}

fn read_f32s(data: &[u8], count: usize, id: u64) -> CodecResult<Vec<f32>> {
    if data.len() < count * 4 {
        return Err(CodecError::invalid_attachment(
            id,
            format!("{} bytes, expected {}", data.len(), count * 4),
        ));
    }
    let mut cur = &data[..count * 4];
    let mut out = vec![0f32; count];
    cur.read_f32_into::<LittleEndian>(&mut out)
        .map_err(|e| CodecError::invalid_attachment(id, e.to_string()))?;
    Ok(out)
}

fn read_table(data: &[u8], bits: u32) -> CodecResult<Vec<f32>> {
    let size = 1usize << bits;
    if data.len() % 4 != 0 {
        return Err(CodecError::invalid_attachment(
            ATTACHMENT_PTF_TABLE,
            format!("{} bytes is not a whole number of floats", data.len()),
        ));
    }

    let count = data.len() / 4;
    if count != size && count + 1 != size {
        return Err(CodecError::invalid_attachment(
            ATTACHMENT_PTF_TABLE,
            format!("{count} entries, expected {size} for {bits}-bit codewords"),
        ));
    }

    let mut table = read_f32s(data, count, ATTACHMENT_PTF_TABLE)?;
    if count + 1 == size {
        warn!("PTF table has {count} entries, repeating the last one");
        let last = table.last().copied().unwrap_or(0.0);
        table.push(last);
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> ContainerMetadata {
        let config =
            QuantizerConfig::new(PtfKind::Log, 10, 9, ColorSpaceKind::YCbCr, 0.01, 4000.0).unwrap();
        ContainerMetadata::new(config, 2.5)
    }

    fn by_id(files: Vec<AttachedFile>) -> BTreeMap<u64, AttachedFile> {
        files.into_iter().map(|f| (f.uid, f)).collect()
    }

    #[test]
    fn test_attachment_layout() {
        let files = metadata().to_attachments();
        let ids: Vec<u64> = files.iter().map(|f| f.uid).collect();
        assert_eq!(ids, [430, 431, 432, 433, 434, 435, 436]);
        assert!(files.iter().all(|f| f.name == ATTACHMENT_FILE_NAME && f.mime_type.is_empty()));

        let files = by_id(files);
        assert_eq!(files[&430].data, 10u32.to_le_bytes());
        assert_eq!(files[&431].data, 9u32.to_le_bytes());
        assert_eq!(files[&432].data, 2u32.to_le_bytes());
        assert_eq!(files[&433].data, 2u32.to_le_bytes());
        assert_eq!(files[&434].data.len(), 1024 * 4);
        assert_eq!(files[&435].data, 2.5f32.to_le_bytes());
        assert_eq!(&files[&436].data[..4], 4000f32.to_le_bytes());
        assert_eq!(files[&434].description, "PTF");
    }

    #[test]
    fn test_roundtrip() {
        let meta = metadata();
        let back = ContainerMetadata::from_attachments(&by_id(meta.to_attachments())).unwrap();
        assert_eq!(back, meta);
    }

    #[test]
    fn test_missing_required() {
        for id in 430..=434 {
            let mut files = by_id(metadata().to_attachments());
            files.remove(&id);
            let err = ContainerMetadata::from_attachments(&files).unwrap_err();
            assert!(matches!(err, CodecError::MissingAttachment { id: got, .. } if got == id));
            assert!(err.is_config());
        }
    }

    #[test]
    fn test_optional_defaults() {
        let config =
            QuantizerConfig::new(PtfKind::Pq, 8, 8, ColorSpaceKind::Luv, 0.005, 10000.0).unwrap();
        let mut files = by_id(ContainerMetadata::new(config, 3.0).to_attachments());
        files.remove(&435);
        files.remove(&436);

        let back = ContainerMetadata::from_attachments(&files).unwrap();
        assert_eq!(back.pre_scaling, DEFAULT_PRE_SCALING);
        assert_eq!(back.config.max_lum(), 10000.0);
        assert_eq!(back.config.min_lum(), 0.005);
    }

    #[test]
    fn test_short_table_is_padded() {
        let mut files = by_id(metadata().to_attachments());
        let table = files.get_mut(&434).unwrap();
        let n = table.data.len();
        let repeated = table.data[n - 8..n - 4].to_vec();
        table.data.truncate(n - 4);

        let back = ContainerMetadata::from_attachments(&files).unwrap();
        assert_eq!(back.config.table.len(), 1024);
        assert_eq!(back.config.table.lookup(1023).to_le_bytes().to_vec(), repeated);
    }

    #[test]
    fn test_bad_blobs() {
        let mut files = by_id(metadata().to_attachments());
        files.get_mut(&434).unwrap().data.truncate(100 * 4);
        assert!(matches!(
            ContainerMetadata::from_attachments(&files),
            Err(CodecError::InvalidAttachment { id: 434, .. })
        ));

        let mut files = by_id(metadata().to_attachments());
        files.get_mut(&430).unwrap().data = vec![1, 2];
        assert!(matches!(
            ContainerMetadata::from_attachments(&files),
            Err(CodecError::InvalidAttachment { id: 430, .. })
        ));

        let mut files = by_id(metadata().to_attachments());
        files.get_mut(&432).unwrap().data = 17u32.to_le_bytes().to_vec();
        assert!(ContainerMetadata::from_attachments(&files).unwrap_err().is_config());
    }
}
