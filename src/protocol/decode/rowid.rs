//! Oracle extended ROWID encoding.
//!
//! An extended ROWID is an 18-character string built from four fields,
//! each packed into a run of base-64 characters (6 bits/char) drawn from
//! the alphabet `A-Za-z0-9+/`:
//!
//! | field               | bits | chars |
//! |---------------------|------|-------|
//! | data object number  | 32   | 6     |
//! | relative file number| 18   | 3     |
//! | block number        | 32   | 6     |
//! | row number           | 18   | 3     |

use crate::error::{Error, Result};

const ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

fn encode_chunk(value: u64, num_chars: usize, out: &mut String) {
    for i in (0..num_chars).rev() {
        let shift = i * 6;
        let idx = ((value >> shift) & 0x3F) as usize;
        out.push(ALPHABET[idx] as char);
    }
}

fn char_value(c: u8) -> Result<u64> {
    ALPHABET
        .iter()
        .position(|&a| a == c)
        .map(|p| p as u64)
        .ok_or_else(|| Error::protocol(format!("Invalid ROWID character: {}", c as char)))
}

fn decode_chunk(chars: &[u8]) -> Result<u64> {
    let mut value = 0u64;
    for &c in chars {
        value = (value << 6) | char_value(c)?;
    }
    Ok(value)
}

/// Encode the four ROWID components into an 18-character extended ROWID string.
pub fn encode_rowid(obj_id: u32, file_no: u16, block_no: u32, row_no: u16) -> String {
    let mut out = String::with_capacity(18);
    encode_chunk(obj_id as u64, 6, &mut out);
    encode_chunk(file_no as u64, 3, &mut out);
    encode_chunk(block_no as u64, 6, &mut out);
    encode_chunk(row_no as u64, 3, &mut out);
    out
}

/// Decode an 18-character extended ROWID string into its four components.
pub fn decode_rowid(rowid: &str) -> Result<(u32, u16, u32, u16)> {
    let bytes = rowid.as_bytes();
    if bytes.len() != 18 {
        return Err(Error::protocol(format!(
            "ROWID string must be exactly 18 characters, got {}",
            bytes.len()
        )));
    }

    let obj_id = decode_chunk(&bytes[0..6])? as u32;
    let file_no = decode_chunk(&bytes[6..9])? as u16;
    let block_no = decode_chunk(&bytes[9..15])? as u32;
    let row_no = decode_chunk(&bytes[15..18])? as u16;

    Ok((obj_id, file_no, block_no, row_no))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rowid_round_trip() {
        let rowid = encode_rowid(0x1234_5678, 0x3FF, 0xABCDEF01, 0x3FFF);
        assert_eq!(rowid.len(), 18);
        let (obj_id, file_no, block_no, row_no) = decode_rowid(&rowid).unwrap();
        assert_eq!(obj_id, 0x1234_5678);
        assert_eq!(file_no, 0x3FF);
        assert_eq!(block_no, 0xABCDEF01);
        assert_eq!(row_no, 0x3FFF);
    }

    #[test]
    fn test_rowid_zero() {
        let rowid = encode_rowid(0, 0, 0, 0);
        assert_eq!(rowid, "AAAAAAAAAAAAAAAAAA");
        assert_eq!(decode_rowid(&rowid).unwrap(), (0, 0, 0, 0));
    }

    #[test]
    fn test_rowid_wrong_length() {
        assert!(decode_rowid("AAAA").is_err());
    }

    #[test]
    fn test_rowid_invalid_char() {
        let mut s = "A".repeat(18);
        s.replace_range(0..1, "!");
        assert!(decode_rowid(&s).is_err());
    }
}
