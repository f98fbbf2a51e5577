//! CLI command implementations

pub mod decode;
pub mod encode;
pub mod info;

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use hdrv_codec::ByteOrder;
use hdrv_core::Frame;

/// Opens a file for buffered reading.
pub fn open_input(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).with_context(|| format!("Failed to open: {}", path.display()))?;
    Ok(BufReader::new(file))
}

/// Creates a file for buffered writing.
pub fn create_output(path: &Path) -> Result<BufWriter<File>> {
    let file =
        File::create(path).with_context(|| format!("Failed to create: {}", path.display()))?;
    Ok(BufWriter::new(file))
}

/// Reads one planar f32 frame, `None` at a clean end of file.
pub fn read_raw_frame<R: BufRead>(
    reader: &mut R,
    width: usize,
    height: usize,
) -> Result<Option<Frame>> {
    if reader.fill_buf()?.is_empty() {
        return Ok(None);
    }
    let mut data = vec![0f32; width * height * 3];
    reader
        .read_f32_into::<LittleEndian>(&mut data)
        .context("Raw input ends inside a frame")?;
    Ok(Some(Frame::from_data(width, height, 3, data)?))
}

/// Writes a frame as planar f32.
pub fn write_raw_frame<W: Write>(writer: &mut W, frame: &Frame) -> Result<()> {
    for &v in frame.data() {
        writer.write_f32::<LittleEndian>(v)?;
    }
    Ok(())
}

/// Parses a byte order name.
pub fn parse_byte_order(s: &str) -> Result<ByteOrder> {
    match s.to_ascii_lowercase().as_str() {
        "little" | "le" => Ok(ByteOrder::Little),
        "big" | "be" => Ok(ByteOrder::Big),
        _ => bail!("unknown byte order '{}', expected little or big", s),
    }
}

/// Format file size for display
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn test_raw_frame_roundtrip() {
        let frame = Frame::test_pattern(4, 2).unwrap();
        let mut bytes = Vec::new();
        write_raw_frame(&mut bytes, &frame).unwrap();
        write_raw_frame(&mut bytes, &frame).unwrap();
        assert_eq!(bytes.len(), 2 * 4 * 2 * 3 * 4);

        let mut reader = Cursor::new(bytes);
        assert_eq!(read_raw_frame(&mut reader, 4, 2).unwrap().unwrap(), frame);
        assert!(read_raw_frame(&mut reader, 4, 2).unwrap().is_some());
        assert!(read_raw_frame(&mut reader, 4, 2).unwrap().is_none());
    }

    #[test]
    fn test_raw_frame_truncated() {
        let mut reader = Cursor::new(vec![0u8; 10]);
        assert!(read_raw_frame(&mut reader, 4, 2).is_err());
    }

    #[test]
    fn test_byte_order_names() {
        assert_eq!(parse_byte_order("BIG").unwrap(), ByteOrder::Big);
        assert_eq!(parse_byte_order("le").unwrap(), ByteOrder::Little);
        assert!(parse_byte_order("middle").is_err());
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(10), "10 bytes");
        assert_eq!(format_size(2048), "2.00 KB");
    }
}
