//! EBML primitives: variable-length integers, element headers and typed
//! element payloads.
//!
//! EBML is the binary format underneath Matroska. Every element is an ID
//! (1-4 bytes, marker bits kept), a size (1-8 byte VINT, marker bits
//! stripped) and a payload. A size whose data bits are all ones means
//! "unknown", used for elements that are still being written.

use std::io::{Read, Seek, SeekFrom, Write};

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};

use crate::elements;
use crate::error::{MkvError, MkvResult};

/// Longest VINT, in bytes.
pub const MAX_VINT_LENGTH: usize = 8;

/// Longest element ID, in bytes.
pub const MAX_ID_LENGTH: usize = 4;

/// Smallest possible Void element (ID plus a 1-byte zero size).
pub const MIN_VOID_SIZE: u64 = 2;

/// Reads a VINT, returning the value with its marker removed and the byte count.
pub fn read_vint<R: Read>(reader: &mut R) -> MkvResult<(u64, usize)> {
    let mut first = [0u8; 1];
    reader.read_exact(&mut first)?;
    let first = first[0];

    if first == 0 {
        return Err(MkvError::InvalidVint { first_byte: first });
    }

    let length = first.leading_zeros() as usize + 1;
    let mut value = u64::from(first) & (0xFF >> length);

    if length > 1 {
        let mut rest = [0u8; MAX_VINT_LENGTH - 1];
        reader.read_exact(&mut rest[..length - 1])?;
        for &b in &rest[..length - 1] {
            value = (value << 8) | u64::from(b);
        }
    }

    Ok((value, length))
}

/// Reads an element ID; the marker bits stay part of the ID.
pub fn read_element_id<R: Read>(reader: &mut R) -> MkvResult<(u32, usize)> {
    let mut first = [0u8; 1];
    reader.read_exact(&mut first)?;
    let first = first[0];

    let length = first.leading_zeros() as usize + 1;
    if first == 0 || length > MAX_ID_LENGTH {
        return Err(MkvError::InvalidElementId { first_byte: first });
    }

    let mut id = u32::from(first);
    if length > 1 {
        let mut rest = [0u8; MAX_ID_LENGTH - 1];
        reader.read_exact(&mut rest[..length - 1])?;
        for &b in &rest[..length - 1] {
            id = (id << 8) | u32::from(b);
        }
    }

    Ok((id, length))
}

/// Reads an element size. `None` means unknown size.
pub fn read_element_size<R: Read>(reader: &mut R) -> MkvResult<(Option<u64>, usize)> {
    let (value, length) = read_vint(reader)?;
    if value == unknown_marker(length) {
        Ok((None, length))
    } else {
        Ok((Some(value), length))
    }
}

/// All data bits set for a VINT of `length` bytes.
#[inline]
fn unknown_marker(length: usize) -> u64 {
    (1u64 << (7 * length)) - 1
}

/// Minimal VINT width for `value`. The all-ones pattern is reserved, so
/// e.g. 127 needs two bytes.
pub fn vint_length(value: u64) -> usize {
    (1..MAX_VINT_LENGTH)
        .find(|&len| value < unknown_marker(len))
        .unwrap_or(MAX_VINT_LENGTH)
}

/// Writes `value` as a minimal VINT.
pub fn write_vint<W: Write>(writer: &mut W, value: u64) -> MkvResult<usize> {
    write_vint_sized(writer, value, vint_length(value))
}

/// Writes `value` as a VINT of exactly `length` bytes.
///
/// Wider-than-needed sizes are valid EBML and let a field be patched later.
pub fn write_vint_sized<W: Write>(writer: &mut W, value: u64, length: usize) -> MkvResult<usize> {
    if !(1..=MAX_VINT_LENGTH).contains(&length) || value >= unknown_marker(length) {
        return Err(MkvError::VintOverflow { value, length });
    }

    let mut bytes = [0u8; MAX_VINT_LENGTH];
    BigEndian::write_u64(&mut bytes, value);
    let out = &mut bytes[MAX_VINT_LENGTH - length..];
    out[0] |= 0x80 >> (length - 1);
    writer.write_all(out)?;
    Ok(length)
}

/// Writes the unknown-size marker with the given width.
pub fn write_unknown_size<W: Write>(writer: &mut W, length: usize) -> MkvResult<usize> {
    if !(1..=MAX_VINT_LENGTH).contains(&length) {
        return Err(MkvError::VintOverflow {
            value: u64::MAX,
            length,
        });
    }
    let mut bytes = [0xFFu8; MAX_VINT_LENGTH];
    bytes[0] = 0xFF >> (length - 1);
    writer.write_all(&bytes[..length])?;
    Ok(length)
}

/// Writes an element ID without leading zero bytes.
pub fn write_element_id<W: Write>(writer: &mut W, id: u32) -> MkvResult<usize> {
    let bytes = id.to_be_bytes();
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(3);
    writer.write_all(&bytes[start..])?;
    Ok(4 - start)
}

/// Element ID, size and header length as read from a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementHeader {
    /// Element ID.
    pub id: u32,
    /// Payload size, `None` when unknown.
    pub size: Option<u64>,
    /// Bytes taken by the ID and size fields.
    pub header_size: usize,
}

impl ElementHeader {
    /// Reads an element header.
    pub fn read<R: Read>(reader: &mut R) -> MkvResult<Self> {
        let (id, id_len) = read_element_id(reader)?;
        let (size, size_len) = read_element_size(reader)?;
        Ok(Self {
            id,
            size,
            header_size: id_len + size_len,
        })
    }

    /// Payload size, failing for unknown-size elements.
    pub fn known_size(&self) -> MkvResult<u64> {
        self.size.ok_or(MkvError::UnknownSize { id: self.id })
    }

    /// Header plus payload size.
    pub fn total_size(&self) -> Option<u64> {
        self.size.map(|s| s + self.header_size as u64)
    }
}

/// Contents of the EBML header element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EbmlHeader {
    /// EBML version.
    pub version: u64,
    /// EBML read version.
    pub read_version: u64,
    /// Longest ID length.
    pub max_id_length: u64,
    /// Longest size length.
    pub max_size_length: u64,
    /// Document type, `matroska` or `webm`.
    pub doc_type: String,
    /// Document type version.
    pub doc_type_version: u64,
    /// Document type read version.
    pub doc_type_read_version: u64,
}

impl Default for EbmlHeader {
    fn default() -> Self {
        Self {
            version: 1,
            read_version: 1,
            max_id_length: 4,
            max_size_length: 8,
            doc_type: "matroska".to_string(),
            doc_type_version: 4,
            doc_type_read_version: 2,
        }
    }
}

impl EbmlHeader {
    /// Writes the complete header element.
    pub fn write<W: Write>(&self, writer: &mut W) -> MkvResult<()> {
        let mut body = Vec::new();
        write_uint_element(&mut body, elements::EBML_VERSION, self.version)?;
        write_uint_element(&mut body, elements::EBML_READ_VERSION, self.read_version)?;
        write_uint_element(&mut body, elements::EBML_MAX_ID_LENGTH, self.max_id_length)?;
        write_uint_element(&mut body, elements::EBML_MAX_SIZE_LENGTH, self.max_size_length)?;
        write_string_element(&mut body, elements::DOC_TYPE, &self.doc_type)?;
        write_uint_element(&mut body, elements::DOC_TYPE_VERSION, self.doc_type_version)?;
        write_uint_element(
            &mut body,
            elements::DOC_TYPE_READ_VERSION,
            self.doc_type_read_version,
        )?;
        write_master_element(writer, elements::EBML, &body)
    }

    /// Reads the payload of an EBML header element.
    pub fn read_body<R: Read + Seek>(reader: &mut R, size: u64) -> MkvResult<Self> {
        let mut header = Self::default();
        let end = reader.stream_position()? + size;

        while reader.stream_position()? < end {
            let child = ElementHeader::read(reader)?;
            let data = read_payload(reader, child.known_size()?)?;
            match child.id {
                elements::EBML_VERSION => header.version = read_unsigned_int(&data)?,
                elements::EBML_READ_VERSION => header.read_version = read_unsigned_int(&data)?,
                elements::EBML_MAX_ID_LENGTH => header.max_id_length = read_unsigned_int(&data)?,
                elements::EBML_MAX_SIZE_LENGTH => {
                    header.max_size_length = read_unsigned_int(&data)?
                }
                elements::DOC_TYPE => header.doc_type = read_string(&data)?,
                elements::DOC_TYPE_VERSION => header.doc_type_version = read_unsigned_int(&data)?,
                elements::DOC_TYPE_READ_VERSION => {
                    header.doc_type_read_version = read_unsigned_int(&data)?
                }
                _ => {}
            }
        }

        if header.doc_type != "matroska" && header.doc_type != "webm" {
            return Err(MkvError::InvalidEbmlHeader(format!(
                "unsupported doc type '{}'",
                header.doc_type
            )));
        }
        Ok(header)
    }
}

/// Reads a payload of `size` bytes.
///
/// Fails with [`MkvError::InvalidValue`] when `size` is larger than what is
/// left in the stream.
pub fn read_payload<R: Read + Seek>(reader: &mut R, size: u64) -> MkvResult<Vec<u8>> {
    let available = remaining(reader)?;
    if size > available {
        return Err(MkvError::invalid_value(format!(
            "payload of {size} bytes with {available} bytes left in the stream"
        )));
    }
    let mut data = vec![0u8; size as usize];
    reader.read_exact(&mut data)?;
    Ok(data)
}

/// Bytes between the current position and the end of the stream.
pub fn remaining<R: Seek>(reader: &mut R) -> MkvResult<u64> {
    let pos = reader.stream_position()?;
    let end = reader.seek(SeekFrom::End(0))?;
    reader.seek(SeekFrom::Start(pos))?;
    Ok(end.saturating_sub(pos))
}

/// Skips `size` payload bytes.
pub fn skip_element<R: Seek>(reader: &mut R, size: u64) -> MkvResult<()> {
    reader.seek(SeekFrom::Current(size as i64))?;
    Ok(())
}

/// Decodes a big-endian unsigned integer of 0-8 bytes.
pub fn read_unsigned_int(data: &[u8]) -> MkvResult<u64> {
    match data.len() {
        0 => Ok(0),
        n @ 1..=8 => Ok(BigEndian::read_uint(data, n)),
        n => Err(MkvError::invalid_value(format!("integer of {n} bytes"))),
    }
}

/// Decodes a big-endian two's-complement integer of 0-8 bytes.
pub fn read_signed_int(data: &[u8]) -> MkvResult<i64> {
    match data.len() {
        0 => Ok(0),
        n @ 1..=8 => Ok(BigEndian::read_int(data, n)),
        n => Err(MkvError::invalid_value(format!("integer of {n} bytes"))),
    }
}

/// Decodes a 0, 4 or 8 byte float.
pub fn read_float(data: &[u8]) -> MkvResult<f64> {
    match data.len() {
        0 => Ok(0.0),
        4 => Ok(f64::from(BigEndian::read_f32(data))),
        8 => Ok(BigEndian::read_f64(data)),
        n => Err(MkvError::invalid_value(format!("float of {n} bytes"))),
    }
}

/// Decodes a UTF-8 string, stopping at the first NUL.
pub fn read_string(data: &[u8]) -> MkvResult<String> {
    let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    String::from_utf8(data[..end].to_vec())
        .map_err(|e| MkvError::invalid_value(format!("string is not UTF-8: {e}")))
}

fn unsigned_len(value: u64) -> usize {
    (8 - value.leading_zeros() as usize / 8).max(1)
}

fn signed_len(value: i64) -> usize {
    (1..8)
        .find(|&n| {
            let bound = 1i64 << (8 * n - 1);
            (-bound..bound).contains(&value)
        })
        .unwrap_or(8)
}

/// Writes an element with a raw payload.
pub fn write_binary_element<W: Write>(writer: &mut W, id: u32, data: &[u8]) -> MkvResult<()> {
    write_element_id(writer, id)?;
    write_vint(writer, data.len() as u64)?;
    writer.write_all(data)?;
    Ok(())
}

/// Writes a master element whose children are already serialized.
pub fn write_master_element<W: Write>(writer: &mut W, id: u32, children: &[u8]) -> MkvResult<()> {
    write_binary_element(writer, id, children)
}

/// Writes an unsigned integer element in the fewest bytes.
pub fn write_uint_element<W: Write>(writer: &mut W, id: u32, value: u64) -> MkvResult<()> {
    let len = unsigned_len(value);
    write_element_id(writer, id)?;
    write_vint(writer, len as u64)?;
    writer.write_uint::<BigEndian>(value, len)?;
    Ok(())
}

/// Writes a signed integer element in the fewest bytes.
pub fn write_int_element<W: Write>(writer: &mut W, id: u32, value: i64) -> MkvResult<()> {
    let len = signed_len(value);
    write_element_id(writer, id)?;
    write_vint(writer, len as u64)?;
    writer.write_int::<BigEndian>(value, len)?;
    Ok(())
}

/// Writes an 8-byte float element.
pub fn write_float_element<W: Write>(writer: &mut W, id: u32, value: f64) -> MkvResult<()> {
    write_element_id(writer, id)?;
    write_vint(writer, 8)?;
    writer.write_f64::<BigEndian>(value)?;
    Ok(())
}

/// Writes a UTF-8 string element.
pub fn write_string_element<W: Write>(writer: &mut W, id: u32, value: &str) -> MkvResult<()> {
    write_binary_element(writer, id, value.as_bytes())
}

/// Writes a Void element occupying exactly `total` bytes.
pub fn write_void<W: Write>(writer: &mut W, total: u64) -> MkvResult<()> {
    if total < MIN_VOID_SIZE {
        return Err(MkvError::VintOverflow {
            value: total,
            length: 0,
        });
    }

    for size_len in 1..=MAX_VINT_LENGTH {
        let Some(payload) = total.checked_sub(1 + size_len as u64) else {
            break;
        };
        if payload < unknown_marker(size_len) {
            write_element_id(writer, elements::VOID)?;
            write_vint_sized(writer, payload, size_len)?;
            std::io::copy(&mut std::io::repeat(0).take(payload), writer)?;
            return Ok(());
        }
    }

    Err(MkvError::VintOverflow {
        value: total,
        length: MAX_VINT_LENGTH,
    })
}
