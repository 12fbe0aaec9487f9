//! Oracle Binary JSON (OSON) codec.
//!
//! OSON is the format the server uses to carry JSON column values inline.
//! A document opens with a 4-byte header (magic, version, flags). The flags
//! byte picks the width of every variable-width field that follows, so the
//! same decoder handles small and large documents without guessing:
//!
//! - bit 0: the document is a bare scalar (no dictionary, no container).
//! - bit 1: the tree segment's byte length is a `u32` (otherwise `u16`).
//! - bit 2: the field-name count is a `u32` (otherwise `u16`).
//! - bit 3: the field-name segment's byte length is a `u32` (otherwise `u16`).
//! - bit 4: per-field hash IDs (and in-tree field-id references) are `u16`
//!   (otherwise `u8`).
//! - bit 5: container child offsets are relative to the start of the tree
//!   segment (otherwise they are absolute document offsets).
//!
//! A non-scalar document carries, in order: the field-name count, an array
//! of per-field hash IDs, an array of field-name offsets, the length of the
//! field-name segment, the field-name segment itself (each name is length-
//! prefixed: one byte for names up to 255 bytes, or a `0xFF` marker followed
//! by a big-endian `u16` for longer names), and finally the tree segment
//! (its length, then the root node).
//!
//! Every node starts with a one-byte tag. If bit 7 is set the node is a
//! container: bit 6 picks array vs. object, bits 5-4 pick the width of the
//! child count (`00`=u8, `01`=u16, `10`=u32, `11`=shared field-id array
//! borrowed from a previously decoded object at a stored back-reference
//! offset), and bits 3-2 pick the width of the per-child offset table.
//! Otherwise the low 7 bits select one of the fixed or length-prefixed
//! scalar encodings.

use crate::error::{Error, Result};
use crate::protocol::decode::{
    decode_oracle_date, decode_oracle_number, decode_timestamp, encode_oracle_date,
    encode_oracle_number, encode_timestamp,
};
use chrono::NaiveDateTime;
use std::collections::{BTreeSet, HashMap};

const MAGIC: [u8; 3] = [0xFF, 0x4A, 0x5A];
const VERSION: u8 = 1;

const FLAG_IS_SCALAR: u8 = 0x01;
const FLAG_TREE_SEG_UINT32: u8 = 0x02;
const FLAG_NUM_FNAMES_UINT32: u8 = 0x04;
const FLAG_FNAMES_SEG_UINT32: u8 = 0x08;
const FLAG_FIELD_ID_UINT16: u8 = 0x10;
const FLAG_RELATIVE_OFFSETS: u8 = 0x20;

const NAME_LEN_EXTENDED_MARKER: u8 = 0xFF;

const NODE_CONTAINER_BIT: u8 = 0x80;
const NODE_ARRAY_BIT: u8 = 0x40;
const NODE_COUNT_WIDTH_MASK: u8 = 0x30;
const NODE_COUNT_WIDTH_SHARED: u8 = 0x30;
const NODE_OFFSET_WIDTH_MASK: u8 = 0x0C;

const TAG_NULL: u8 = 0x00;
const TAG_TRUE: u8 = 0x01;
const TAG_FALSE: u8 = 0x02;
const TAG_STRING_SHORT: u8 = 0x03;
const TAG_STRING_LONG: u8 = 0x04;
const TAG_NUMBER: u8 = 0x05;
const TAG_DOUBLE: u8 = 0x06;
const TAG_DATE: u8 = 0x07;
const TAG_TIMESTAMP: u8 = 0x08;
const TAG_BINARY: u8 = 0x09;

/// A decoded/encodable OSON value.
#[derive(Debug, Clone, PartialEq)]
pub enum OsonValue {
    Null,
    Bool(bool),
    String(String),
    /// Decimal number, preserving precision (see `decode_oracle_number`).
    Number(String),
    Double(f64),
    Date(NaiveDateTime),
    Timestamp(NaiveDateTime),
    Binary(Vec<u8>),
    /// Object fields in insertion order (field names are deduplicated
    /// against the document-wide dictionary, not against each other).
    Object(Vec<(String, OsonValue)>),
    Array(Vec<OsonValue>),
}

impl OsonValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            OsonValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&[(String, OsonValue)]> {
        match self {
            OsonValue::Object(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[OsonValue]> {
        match self {
            OsonValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&OsonValue> {
        match self {
            OsonValue::Object(fields) => fields.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    fn is_scalar(&self) -> bool {
        !matches!(self, OsonValue::Object(_) | OsonValue::Array(_))
    }
}

// ============================================================================
// Reader
// ============================================================================

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn at(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    fn pos(&self) -> usize {
        self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.pos + n > self.data.len() {
            return Err(Error::Oson {
                message: format!(
                    "unexpected end of document: need {} bytes at offset {}",
                    n, self.pos
                ),
            });
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read a width-selected unsigned integer: 0 => u8, 1 => u16, 2/3 => u32.
    fn width(&mut self, width_code: u8) -> Result<u32> {
        match width_code {
            0 => Ok(self.u8()? as u32),
            1 => Ok(self.u16()? as u32),
            _ => self.u32(),
        }
    }
}

/// Decode an OSON document (the raw bytes of a JSON column value) into an `OsonValue`.
pub fn decode(bytes: &[u8]) -> Result<OsonValue> {
    let mut r = Reader::new(bytes);
    let magic = r.take(3)?;
    if magic != MAGIC {
        return Err(Error::Oson {
            message: "not an OSON document: bad magic bytes".to_string(),
        });
    }
    let version = r.u8()?;
    if version != VERSION {
        return Err(Error::Oson {
            message: format!("unsupported OSON version: {}", version),
        });
    }
    let flags = r.u8()?;
    let is_scalar = flags & FLAG_IS_SCALAR != 0;
    let tree_seg_width = if flags & FLAG_TREE_SEG_UINT32 != 0 { 2 } else { 1 };
    let field_id_width = if flags & FLAG_FIELD_ID_UINT16 != 0 { 1 } else { 0 };
    let relative = flags & FLAG_RELATIVE_OFFSETS != 0;

    let names = if is_scalar {
        Vec::new()
    } else {
        let num_fnames_width = if flags & FLAG_NUM_FNAMES_UINT32 != 0 { 2 } else { 1 };
        let num_fields = r.width(num_fnames_width)? as usize;

        let hash_id_width = field_id_width;
        let mut _hash_ids = Vec::with_capacity(num_fields);
        for _ in 0..num_fields {
            _hash_ids.push(r.width(hash_id_width)?);
        }

        let fnames_seg_width = if flags & FLAG_FNAMES_SEG_UINT32 != 0 { 2 } else { 1 };
        let mut name_offsets = Vec::with_capacity(num_fields);
        for _ in 0..num_fields {
            name_offsets.push(r.width(fnames_seg_width)? as usize);
        }

        let fnames_seg_len = r.width(fnames_seg_width)? as usize;
        let fnames_seg_start = r.pos();
        let fnames_seg = r.take(fnames_seg_len)?;

        let mut names = Vec::with_capacity(num_fields);
        for &off in &name_offsets {
            if off >= fnames_seg.len() {
                return Err(Error::Oson {
                    message: format!("field name offset {} out of range", off),
                });
            }
            let mut nr = Reader::new(&fnames_seg[off..]);
            let first = nr.u8()?;
            let len = if first == NAME_LEN_EXTENDED_MARKER {
                nr.u16()? as usize
            } else {
                first as usize
            };
            let name_bytes = nr.take(len)?;
            names.push(String::from_utf8(name_bytes.to_vec()).map_err(|e| Error::Oson {
                message: format!("invalid UTF-8 field name: {}", e),
            })?);
        }
        let _ = fnames_seg_start;
        names
    };

    let _tree_seg_len = r.width(tree_seg_width)?;
    let tree_start = r.pos();

    let ctx = DecodeCtx {
        names,
        field_id_width,
        relative,
        tree_start,
    };
    let mut shared = HashMap::new();
    decode_node(&mut r, &ctx, &mut shared)
}

struct DecodeCtx {
    names: Vec<String>,
    field_id_width: u8,
    relative: bool,
    tree_start: usize,
}

impl DecodeCtx {
    fn resolve(&self, offset: u32) -> usize {
        if self.relative {
            self.tree_start + offset as usize
        } else {
            offset as usize
        }
    }
}

fn decode_node(
    r: &mut Reader<'_>,
    ctx: &DecodeCtx,
    shared: &mut HashMap<usize, Vec<u32>>,
) -> Result<OsonValue> {
    let node_offset = r.pos();
    let tag = r.u8()?;

    if tag & NODE_CONTAINER_BIT == 0 {
        return decode_scalar(r, tag);
    }

    let is_array = tag & NODE_ARRAY_BIT != 0;
    let count_width_bits = tag & NODE_COUNT_WIDTH_MASK;
    let offset_width = (tag & NODE_OFFSET_WIDTH_MASK) >> 2;

    if count_width_bits == NODE_COUNT_WIDTH_SHARED {
        if is_array {
            return Err(Error::Oson {
                message: "array node cannot use the shared field-id encoding".to_string(),
            });
        }
        let count = r.u32()? as usize;
        let back_ref = r.width(offset_width)?;
        let ref_offset = ctx.resolve(back_ref);
        let field_ids = shared
            .get(&ref_offset)
            .cloned()
            .ok_or_else(|| Error::Oson {
                message: format!("shared field-id back-reference to offset {} not found", ref_offset),
            })?;
        if field_ids.len() != count {
            return Err(Error::Oson {
                message: "shared field-id array length mismatch".to_string(),
            });
        }
        let mut child_offsets = Vec::with_capacity(count);
        for _ in 0..count {
            child_offsets.push(r.width(offset_width)?);
        }
        let mut fields = Vec::with_capacity(count);
        for (id, off) in field_ids.iter().zip(child_offsets.iter()) {
            let name = ctx
                .names
                .get(*id as usize)
                .ok_or_else(|| Error::Oson {
                    message: format!("field id {} out of range", id),
                })?
                .clone();
            let mut cr = Reader::at(r.data, ctx.resolve(*off));
            let value = decode_node(&mut cr, ctx, shared)?;
            fields.push((name, value));
        }
        return Ok(OsonValue::Object(fields));
    }

    let count_width = count_width_bits >> 4;
    let count = r.width(count_width)? as usize;

    if is_array {
        let mut child_offsets = Vec::with_capacity(count);
        for _ in 0..count {
            child_offsets.push(r.width(offset_width)?);
        }
        let mut items = Vec::with_capacity(count);
        for off in child_offsets {
            let mut cr = Reader::at(r.data, ctx.resolve(off));
            items.push(decode_node(&mut cr, ctx, shared)?);
        }
        Ok(OsonValue::Array(items))
    } else {
        let mut field_ids = Vec::with_capacity(count);
        for _ in 0..count {
            field_ids.push(r.width(ctx.field_id_width)?);
        }
        shared.insert(node_offset, field_ids.clone());

        let mut child_offsets = Vec::with_capacity(count);
        for _ in 0..count {
            child_offsets.push(r.width(offset_width)?);
        }
        let mut fields = Vec::with_capacity(count);
        for (id, off) in field_ids.iter().zip(child_offsets.iter()) {
            let name = ctx
                .names
                .get(*id as usize)
                .ok_or_else(|| Error::Oson {
                    message: format!("field id {} out of range", id),
                })?
                .clone();
            let mut cr = Reader::at(r.data, ctx.resolve(*off));
            let value = decode_node(&mut cr, ctx, shared)?;
            fields.push((name, value));
        }
        Ok(OsonValue::Object(fields))
    }
}

fn decode_scalar(r: &mut Reader<'_>, tag: u8) -> Result<OsonValue> {
    match tag {
        TAG_NULL => Ok(OsonValue::Null),
        TAG_TRUE => Ok(OsonValue::Bool(true)),
        TAG_FALSE => Ok(OsonValue::Bool(false)),
        TAG_STRING_SHORT => {
            let len = r.u8()? as usize;
            let bytes = r.take(len)?;
            Ok(OsonValue::String(
                String::from_utf8(bytes.to_vec()).map_err(|e| Error::Oson { message: e.to_string() })?,
            ))
        }
        TAG_STRING_LONG => {
            let len = r.u32()? as usize;
            let bytes = r.take(len)?;
            Ok(OsonValue::String(
                String::from_utf8(bytes.to_vec()).map_err(|e| Error::Oson { message: e.to_string() })?,
            ))
        }
        TAG_NUMBER => {
            let len = r.u8()? as usize;
            let bytes = r.take(len)?;
            Ok(OsonValue::Number(decode_oracle_number(bytes)?))
        }
        TAG_DOUBLE => {
            let bytes = r.take(8)?;
            let mut arr = [0u8; 8];
            arr.copy_from_slice(bytes);
            Ok(OsonValue::Double(f64::from_be_bytes(arr)))
        }
        TAG_DATE => {
            let bytes = r.take(7)?;
            Ok(OsonValue::Date(decode_oracle_date(bytes)?))
        }
        TAG_TIMESTAMP => {
            let bytes = r.take(11)?;
            Ok(OsonValue::Timestamp(decode_timestamp(bytes)?))
        }
        TAG_BINARY => {
            let len = r.u32()? as usize;
            Ok(OsonValue::Binary(r.take(len)?.to_vec()))
        }
        other => Err(Error::Oson {
            message: format!("unknown OSON node tag: {:#04x}", other),
        }),
    }
}

// ============================================================================
// Writer
// ============================================================================

fn collect_field_names(value: &OsonValue, names: &mut BTreeSet<String>) {
    match value {
        OsonValue::Object(fields) => {
            for (k, v) in fields {
                names.insert(k.clone());
                collect_field_names(v, names);
            }
        }
        OsonValue::Array(items) => {
            for item in items {
                collect_field_names(item, names);
            }
        }
        _ => {}
    }
}

/// FNV-1a, used only to pick a deterministic dictionary order; any stable
/// hash would do since nothing outside this module interprets the value.
fn name_hash(name: &str) -> u32 {
    let mut hash: u32 = 0x811c9dc5;
    for b in name.as_bytes() {
        hash ^= *b as u32;
        hash = hash.wrapping_mul(0x01000193);
    }
    hash
}

/// Encode an `OsonValue` into an OSON document.
pub fn encode(value: &OsonValue) -> Result<Vec<u8>> {
    let mut name_set = BTreeSet::new();
    collect_field_names(value, &mut name_set);
    let mut names: Vec<String> = name_set.into_iter().collect();
    names.sort_by(|a, b| {
        let ha = (name_hash(a) & 0xFF, a.len(), a.as_str());
        let hb = (name_hash(b) & 0xFF, b.len(), b.as_str());
        ha.cmp(&hb)
    });

    let name_index: HashMap<&str, u32> =
        names.iter().enumerate().map(|(i, n)| (n.as_str(), i as u32)).collect();

    let is_scalar = value.is_scalar();
    let field_id_u16 = names.len() > 255;

    let mut out = Vec::new();
    out.extend_from_slice(&MAGIC);
    out.push(VERSION);

    let mut fnames_seg = Vec::new();
    let mut name_offsets = Vec::with_capacity(names.len());
    for name in &names {
        name_offsets.push(fnames_seg.len() as u32);
        let bytes = name.as_bytes();
        if bytes.len() <= 254 {
            fnames_seg.push(bytes.len() as u8);
        } else if bytes.len() <= 65535 {
            fnames_seg.push(NAME_LEN_EXTENDED_MARKER);
            fnames_seg.extend_from_slice(&(bytes.len() as u16).to_be_bytes());
        } else {
            return Err(Error::Encoding {
                message: format!("field name '{}' exceeds 65535 bytes", name),
            });
        }
        fnames_seg.extend_from_slice(bytes);
    }

    let fnames_seg_u32 = fnames_seg.len() > 65535 || name_offsets.iter().any(|&o| o > 65535);

    let mut tree = Vec::new();
    encode_node(value, &name_index, field_id_u16, &mut tree)?;
    let tree_seg_u32 = tree.len() > 65535;

    let mut flags = 0u8;
    if is_scalar {
        flags |= FLAG_IS_SCALAR;
    }
    if tree_seg_u32 {
        flags |= FLAG_TREE_SEG_UINT32;
    }
    if field_id_u16 {
        flags |= FLAG_FIELD_ID_UINT16;
    }
    flags |= FLAG_RELATIVE_OFFSETS;
    if !is_scalar {
        if names.len() > 65535 {
            flags |= FLAG_NUM_FNAMES_UINT32;
        }
        if fnames_seg_u32 {
            flags |= FLAG_FNAMES_SEG_UINT32;
        }
    }
    out.push(flags);

    if !is_scalar {
        write_width(&mut out, names.len() as u32, flags & FLAG_NUM_FNAMES_UINT32 != 0);
        for name in &names {
            write_width(&mut out, name_hash(name) & 0xFF, field_id_u16);
        }
        for &off in &name_offsets {
            write_width(&mut out, off, fnames_seg_u32);
        }
        write_width(&mut out, fnames_seg.len() as u32, fnames_seg_u32);
        out.extend_from_slice(&fnames_seg);
    }

    write_width(&mut out, tree.len() as u32, tree_seg_u32);
    out.extend_from_slice(&tree);

    Ok(out)
}

fn write_width(out: &mut Vec<u8>, value: u32, wide: bool) {
    if wide {
        out.extend_from_slice(&value.to_be_bytes());
    } else {
        out.extend_from_slice(&(value as u16).to_be_bytes());
    }
}

/// Writer always emits `u32`-wide container offsets (relative to the start
/// of the tree segment); the narrowest-offset-width optimization the real
/// format allows is left to the server, which a pure client never has to
/// produce. The decoder above still accepts any width a server sends.
const WRITER_OFFSET_WIDTH: u8 = 2;

fn encode_node(
    value: &OsonValue,
    name_index: &HashMap<&str, u32>,
    field_id_u16: bool,
    out: &mut Vec<u8>,
) -> Result<()> {
    match value {
        OsonValue::Null => out.push(TAG_NULL),
        OsonValue::Bool(true) => out.push(TAG_TRUE),
        OsonValue::Bool(false) => out.push(TAG_FALSE),
        OsonValue::String(s) => {
            if s.len() <= 255 {
                out.push(TAG_STRING_SHORT);
                out.push(s.len() as u8);
            } else {
                out.push(TAG_STRING_LONG);
                out.extend_from_slice(&(s.len() as u32).to_be_bytes());
            }
            out.extend_from_slice(s.as_bytes());
        }
        OsonValue::Number(n) => {
            let encoded = encode_oracle_number(n)?;
            if encoded.len() > 255 {
                return Err(Error::Encoding {
                    message: "NUMBER encoding exceeds 255 bytes".to_string(),
                });
            }
            out.push(TAG_NUMBER);
            out.push(encoded.len() as u8);
            out.extend_from_slice(&encoded);
        }
        OsonValue::Double(d) => {
            out.push(TAG_DOUBLE);
            out.extend_from_slice(&d.to_be_bytes());
        }
        OsonValue::Date(dt) => {
            out.push(TAG_DATE);
            out.extend_from_slice(&encode_oracle_date(dt)?);
        }
        OsonValue::Timestamp(dt) => {
            out.push(TAG_TIMESTAMP);
            out.extend_from_slice(&encode_timestamp(dt)?);
        }
        OsonValue::Binary(bytes) => {
            out.push(TAG_BINARY);
            out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
            out.extend_from_slice(bytes);
        }
        OsonValue::Array(items) => {
            let count_width_bits = node_count_width(items.len());
            out.push(NODE_CONTAINER_BIT | NODE_ARRAY_BIT | count_width_bits | (WRITER_OFFSET_WIDTH << 2));
            write_node_count(out, items.len() as u32, count_width_bits);
            let offsets_pos = out.len();
            out.extend(std::iter::repeat_n(0u8, items.len() * 4));
            for (i, item) in items.iter().enumerate() {
                let child_offset = out.len() as u32;
                out[offsets_pos + i * 4..offsets_pos + i * 4 + 4]
                    .copy_from_slice(&child_offset.to_be_bytes());
                encode_node(item, name_index, field_id_u16, out)?;
            }
        }
        OsonValue::Object(fields) => {
            let count_width_bits = node_count_width(fields.len());
            out.push(NODE_CONTAINER_BIT | count_width_bits | (WRITER_OFFSET_WIDTH << 2));
            write_node_count(out, fields.len() as u32, count_width_bits);
            for (key, _) in fields {
                let id = *name_index.get(key.as_str()).ok_or_else(|| Error::UnknownFieldName {
                    name: key.clone(),
                })?;
                write_width(out, id, field_id_u16);
            }
            let offsets_pos = out.len();
            out.extend(std::iter::repeat_n(0u8, fields.len() * 4));
            for (i, (_, val)) in fields.iter().enumerate() {
                let child_offset = out.len() as u32;
                out[offsets_pos + i * 4..offsets_pos + i * 4 + 4]
                    .copy_from_slice(&child_offset.to_be_bytes());
                encode_node(val, name_index, field_id_u16, out)?;
            }
        }
    }
    Ok(())
}

fn node_count_width(count: usize) -> u8 {
    if count <= u8::MAX as usize {
        0x00
    } else if count <= u16::MAX as usize {
        0x10
    } else {
        0x20
    }
}

fn write_node_count(out: &mut Vec<u8>, count: u32, width_bits: u8) {
    match width_bits {
        0x00 => out.push(count as u8),
        0x10 => out.extend_from_slice(&(count as u16).to_be_bytes()),
        _ => out.extend_from_slice(&count.to_be_bytes()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_scalar() {
        for value in [
            OsonValue::Null,
            OsonValue::Bool(true),
            OsonValue::Bool(false),
            OsonValue::String("hello".to_string()),
            OsonValue::Number("123.45".to_string()),
            OsonValue::Double(3.14),
        ] {
            let encoded = encode(&value).unwrap();
            assert_eq!(encoded[3] & FLAG_IS_SCALAR, FLAG_IS_SCALAR);
            let decoded = decode(&encoded).unwrap();
            assert_eq!(decoded, value);
        }
    }

    #[test]
    fn test_round_trip_object_and_array() {
        let value = OsonValue::Object(vec![
            ("name".to_string(), OsonValue::String("Ada".to_string())),
            (
                "tags".to_string(),
                OsonValue::Array(vec![OsonValue::String("a".to_string()), OsonValue::Number("1".to_string())]),
            ),
            ("active".to_string(), OsonValue::Bool(true)),
        ]);
        let encoded = encode(&value).unwrap();
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded.get("name").unwrap().as_str(), Some("Ada"));
        assert_eq!(decoded.as_object().unwrap().len(), 3);
    }

    #[test]
    fn test_rejects_bad_magic() {
        assert!(decode(&[0, 0, 0, 1]).is_err());
    }

    #[test]
    fn test_field_name_count_boundary_256() {
        // 256 distinct field names forces the u16 field-id width.
        let fields: Vec<(String, OsonValue)> = (0..256)
            .map(|i| (format!("f{:04}", i), OsonValue::Number(i.to_string())))
            .collect();
        let value = OsonValue::Object(fields);
        let encoded = encode(&value).unwrap();
        assert_ne!(encoded[3] & 0x10, 0);
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded.as_object().unwrap().len(), 256);
    }

    #[test]
    fn test_field_name_count_boundary_255_stays_narrow() {
        let fields: Vec<(String, OsonValue)> = (0..255)
            .map(|i| (format!("f{:04}", i), OsonValue::Null))
            .collect();
        let value = OsonValue::Object(fields);
        let encoded = encode(&value).unwrap();
        assert_eq!(encoded[3] & 0x10, 0);
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded.as_object().unwrap().len(), 255);
    }

    #[test]
    fn test_long_field_name_round_trips() {
        let long_name = "x".repeat(300);
        let value = OsonValue::Object(vec![(long_name.clone(), OsonValue::Bool(true))]);
        let encoded = encode(&value).unwrap();
        let decoded = decode(&encoded).unwrap();
        assert!(decoded.get(&long_name).is_some());
    }

    #[test]
    fn test_nested_structure_round_trip() {
        let value = OsonValue::Array(vec![
            OsonValue::Object(vec![("a".to_string(), OsonValue::Null)]),
            OsonValue::Array(vec![OsonValue::Bool(false), OsonValue::Binary(vec![1, 2, 3])]),
        ]);
        let encoded = encode(&value).unwrap();
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_key_ordering_is_deterministic() {
        let a = OsonValue::Object(vec![
            ("b".to_string(), OsonValue::Number("2".to_string())),
            ("a".to_string(), OsonValue::Number("1".to_string())),
        ]);
        let b = OsonValue::Object(vec![
            ("a".to_string(), OsonValue::Number("1".to_string())),
            ("b".to_string(), OsonValue::Number("2".to_string())),
        ]);
        assert_eq!(encode(&a).unwrap(), encode(&b).unwrap());
    }

    #[test]
    fn test_unknown_field_name_rejected() {
        // Build a document by hand-crafting a name_index that omits a key
        // used by the value, exercising the writer's defensive check.
        let value = OsonValue::Object(vec![("present".to_string(), OsonValue::Null)]);
        let mut name_index = HashMap::new();
        name_index.insert("other", 0u32);
        let mut out = Vec::new();
        let err = encode_node(&value, &name_index, false, &mut out).unwrap_err();
        assert!(matches!(err, Error::UnknownFieldName { .. }));
    }
}
