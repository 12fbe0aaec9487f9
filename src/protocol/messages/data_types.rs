//! DataTypes message (TNS_MSG_TYPE_DATA_TYPES).
//!
//! Advertises the set of Oracle type codes this driver understands and the
//! wire representation it wants for each. Sent standalone during the normal
//! handshake (`exchange_data_types`) and re-sent embedded inside
//! `FastAuthMessage` for the 23ai fast-auth path, which is why the array
//! itself is exposed as free functions `data_types_array_wire_size` /
//! `write_data_types_array` rather than being private to this struct.

use crate::error::Result;
use crate::protocol::constants::*;
use crate::protocol::message::{bytes_with_length_wire_size, DataMessage, Message, WriteExt};

/// Representation byte for "send/receive in native client format".
const REP_NATIVE: u8 = 0;

/// `(type_num, representation)` for every Oracle type code this driver decodes or encodes.
const SUPPORTED_TYPES: &[(u16, u8)] = &[
    (ORA_TYPE_NUM_VARCHAR, REP_NATIVE),
    (ORA_TYPE_NUM_NUMBER, REP_NATIVE),
    (ORA_TYPE_NUM_BINARY_INTEGER, REP_NATIVE),
    (ORA_TYPE_NUM_LONG, REP_NATIVE),
    (ORA_TYPE_NUM_DATE, REP_NATIVE),
    (ORA_TYPE_NUM_RAW, REP_NATIVE),
    (ORA_TYPE_NUM_LONG_RAW, REP_NATIVE),
    (ORA_TYPE_NUM_ROWID, REP_NATIVE),
    (ORA_TYPE_NUM_CHAR, REP_NATIVE),
    (ORA_TYPE_NUM_BINARY_FLOAT, REP_NATIVE),
    (ORA_TYPE_NUM_BINARY_DOUBLE, REP_NATIVE),
    (ORA_TYPE_NUM_CURSOR, REP_NATIVE),
    (ORA_TYPE_NUM_OBJECT, REP_NATIVE),
    (ORA_TYPE_NUM_CLOB, REP_NATIVE),
    (ORA_TYPE_NUM_BLOB, REP_NATIVE),
    (ORA_TYPE_NUM_BFILE, REP_NATIVE),
    (ORA_TYPE_NUM_TIMESTAMP, REP_NATIVE),
    (ORA_TYPE_NUM_TIMESTAMP_TZ, REP_NATIVE),
    (ORA_TYPE_NUM_INTERVAL_YM, REP_NATIVE),
    (ORA_TYPE_NUM_INTERVAL_DS, REP_NATIVE),
    (ORA_TYPE_NUM_TIMESTAMP_LTZ, REP_NATIVE),
    (ORA_TYPE_NUM_UROWID, REP_NATIVE),
    (ORA_TYPE_NUM_BOOLEAN, REP_NATIVE),
    (ORA_TYPE_NUM_JSON, REP_NATIVE),
    (ORA_TYPE_NUM_VECTOR, REP_NATIVE),
];

/// Wire size of the type-code array alone (count byte + 4 bytes/entry).
pub fn data_types_array_wire_size() -> usize {
    1 + SUPPORTED_TYPES.len() * 4
}

/// Write the type-code array alone (no message header).
pub fn write_data_types_array(buf: &mut Vec<u8>) {
    buf.write_u8(SUPPORTED_TYPES.len() as u8);
    for &(type_num, representation) in SUPPORTED_TYPES {
        buf.write_u16_be(type_num);
        buf.write_u8(representation);
        buf.write_u8(0); // reserved
    }
}

/// Standalone DataTypes message.
pub struct DataTypesMessage<'a> {
    /// Compile-time capability bytes (echoed from the negotiated `Capabilities`).
    pub compile_caps: &'a [u8],
    /// Runtime capability bytes.
    pub runtime_caps: &'a [u8],
}

impl Message for DataTypesMessage<'_> {
    fn wire_size(&self) -> usize {
        let mut size = 0;
        size += 1; // message type
        size += 2; // charset
        size += 2; // ncharset
        size += 1; // encoding flags
        size += bytes_with_length_wire_size(self.compile_caps.len());
        size += bytes_with_length_wire_size(self.runtime_caps.len());
        size += data_types_array_wire_size();
        size
    }

    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.write_u8(TNS_MSG_TYPE_DATA_TYPES);
        buf.write_u16_le(TNS_CHARSET_UTF8);
        buf.write_u16_le(TNS_CHARSET_UTF8);
        buf.write_u8(TNS_ENCODING_MULTI_BYTE | TNS_ENCODING_CONV_LENGTH);
        buf.write_bytes_with_length(self.compile_caps);
        buf.write_bytes_with_length(self.runtime_caps);
        write_data_types_array(buf);
        Ok(())
    }
}

impl DataMessage for DataTypesMessage<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_types_message_wire_size() {
        let msg = DataTypesMessage {
            compile_caps: &[1, 2, 3],
            runtime_caps: &[4, 5],
        };
        let mut buf = Vec::with_capacity(msg.wire_size());
        msg.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), msg.wire_size());
    }

    #[test]
    fn test_data_types_array_contains_json_and_vector() {
        let mut buf = Vec::new();
        write_data_types_array(&mut buf);
        assert_eq!(buf.len(), data_types_array_wire_size());
        assert!(SUPPORTED_TYPES.iter().any(|&(t, _)| t == ORA_TYPE_NUM_JSON));
        assert!(SUPPORTED_TYPES.iter().any(|&(t, _)| t == ORA_TYPE_NUM_VECTOR));
    }
}
