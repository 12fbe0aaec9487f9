//! Response parsing for query execution.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::protocol::buffer::ReadBuffer;
use crate::protocol::constants::*;
use crate::protocol::decode::{
    decode_binary_double, decode_binary_float, decode_interval_ds, decode_oracle_date,
    decode_oracle_number, decode_timestamp, decode_timestamp_tz, encode_rowid,
};
use crate::protocol::types::{ColumnInfo, ColumnMetadata, OracleValue, Row};

/// Information extracted from error/end-of-call response.
#[derive(Debug, Default)]
pub struct ErrorInfo {
    /// Error number (0 = success).
    pub error_num: u32,
    /// Cursor ID assigned by server.
    pub cursor_id: u16,
    /// Row count for queries/DML.
    pub row_count: u64,
    /// Error message (if any).
    pub message: Option<String>,
    /// Byte offset into the SQL text the error is attributed to, if any.
    pub offset: Option<u32>,
    /// 1-based bind/define position the error is attributed to, if any.
    pub position: Option<u16>,
    /// ROWID of the offending row, if the server returned one.
    pub row_id: Option<String>,
    /// Per-row error codes from a batched DML execute.
    pub batch_errors: Vec<(u32, String)>,
}

/// Result from parsing an execute response.
#[derive(Debug)]
pub struct ExecuteResponse {
    /// Column metadata (for queries).
    pub columns: Vec<ColumnMetadata>,
    /// Prefetched rows.
    pub rows: Vec<Row>,
    /// Error/status information.
    pub error_info: ErrorInfo,
    /// Whether there are more rows to fetch.
    pub more_rows: bool,
}

impl ErrorInfo {
    /// Convert a non-zero error into the crate's `Error::Oracle`, carrying
    /// along whatever extended diagnostics the server attached.
    pub fn into_error(self) -> Error {
        Error::Oracle {
            code: self.error_num,
            message: self.message.unwrap_or_default(),
            offset: self.offset,
            position: self.position,
            row_id: self.row_id,
            batch_errors: self.batch_errors,
        }
    }
}

impl ExecuteResponse {
    /// Create a new empty execute response.
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            error_info: ErrorInfo::default(),
            more_rows: false,
        }
    }
}

impl Default for ExecuteResponse {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse the response from an execute message.
///
/// Reads from the buffer after the data flags (2 bytes already consumed).
///
/// # Arguments
/// * `buf` - The read buffer
/// * `ttc_field_version` - Field version for column metadata parsing (what we requested)
/// * `server_ttc_field_version` - Server's actual field version (determines error info format)
pub fn parse_execute_response(
    buf: &mut ReadBuffer,
    ttc_field_version: u8,
    server_ttc_field_version: u8,
) -> Result<ExecuteResponse> {
    let mut response = ExecuteResponse::new();
    let mut end_of_response = false;
    let mut num_columns: usize = 0;
    let mut column_info: Option<Arc<ColumnInfo>> = None;
    let mut pending_bit_vector: Option<Vec<bool>> = None;

    while buf.remaining() > 0 && !end_of_response {
        let msg_type = buf.read_u8()?;
        tracing::trace!(msg_type, remaining = buf.remaining(), "execute response message");

        match msg_type {
            TNS_MSG_TYPE_DESCRIBE_INFO => {
                // Skip raw bytes before describe info (server sends additional data)
                buf.skip_raw_bytes_chunked()?;
                parse_describe_info(buf, &mut response, ttc_field_version)?;
                num_columns = response.columns.len();
                // Create shared column info for all rows
                column_info = Some(Arc::new(ColumnInfo::from_metadata(&response.columns)?));
            }
            TNS_MSG_TYPE_ROW_HEADER => {
                parse_row_header(buf)?;
            }
            TNS_MSG_TYPE_ROW_DATA => {
                // column_info should be set after DESCRIBE_INFO
                let info = column_info
                    .clone()
                    .ok_or_else(|| Error::protocol("Row data received before column metadata"))?;
                let bit_vector = pending_bit_vector.take();
                parse_row_data(
                    buf,
                    &response.columns,
                    info,
                    bit_vector.as_deref(),
                    server_ttc_field_version,
                    &mut response.rows,
                )?;
            }
            TNS_MSG_TYPE_ERROR => {
                // Use server's field version to determine error info format
                parse_error_info(buf, &mut response.error_info, server_ttc_field_version)?;
                tracing::debug!(
                    error_num = response.error_info.error_num,
                    cursor_id = response.error_info.cursor_id,
                    row_count = response.error_info.row_count,
                    "execute response error info"
                );
            }
            TNS_MSG_TYPE_END_OF_RESPONSE => {
                end_of_response = true;
            }
            TNS_MSG_TYPE_PARAMETER => {
                // Process return parameters (from Python's _process_return_parameters)
                parse_return_parameters(buf)?;
            }
            TNS_MSG_TYPE_BIT_VECTOR => {
                // Marks which columns of the next ROW_DATA message repeat the
                // previous row's value rather than being sent again.
                pending_bit_vector = Some(parse_bit_vector(buf, num_columns)?);
            }
            TNS_MSG_TYPE_STATUS => {
                // Simple status message (alternative to ERROR in some flows)
                parse_status_info(buf)?;
            }
            TNS_MSG_TYPE_SERVER_SIDE_PIGGYBACK => {
                // Server-sent state updates (session changes, transaction IDs, etc.)
                parse_server_side_piggyback(buf)?;
            }
            _ => {
                return Err(Error::protocol(format!(
                    "Unexpected message type in execute response: {}",
                    msg_type
                )));
            }
        }
    }

    // Determine if there are more rows based on error info
    // Error 1403 (ORA-01403: no data found) means no more rows
    if response.error_info.error_num == 0 || response.error_info.error_num == 1403 {
        response.more_rows = response.error_info.error_num == 0;
    }

    Ok(response)
}

/// Result from parsing a fetch response.
#[derive(Debug)]
pub struct FetchResponse {
    /// Fetched rows.
    pub rows: Vec<Row>,
    /// Error/status information.
    pub error_info: ErrorInfo,
    /// Whether there are more rows to fetch.
    pub more_rows: bool,
}

impl FetchResponse {
    /// Create a new empty fetch response.
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            error_info: ErrorInfo::default(),
            more_rows: false,
        }
    }
}

impl Default for FetchResponse {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse the response from a fetch message.
///
/// Unlike execute response, fetch response doesn't include DESCRIBE_INFO
/// since column metadata was already received in the execute response.
pub fn parse_fetch_response(
    buf: &mut ReadBuffer,
    columns: &[ColumnMetadata],
    server_ttc_field_version: u8,
) -> Result<FetchResponse> {
    let mut response = FetchResponse::new();
    let mut end_of_response = false;
    let num_columns = columns.len();
    // Create shared column info for all rows
    let column_info = Arc::new(ColumnInfo::from_metadata(columns)?);
    let mut pending_bit_vector: Option<Vec<bool>> = None;

    while buf.remaining() > 0 && !end_of_response {
        let msg_type = buf.read_u8()?;

        match msg_type {
            TNS_MSG_TYPE_ROW_HEADER => {
                parse_row_header(buf)?;
            }
            TNS_MSG_TYPE_ROW_DATA => {
                let bit_vector = pending_bit_vector.take();
                parse_row_data(
                    buf,
                    columns,
                    column_info.clone(),
                    bit_vector.as_deref(),
                    server_ttc_field_version,
                    &mut response.rows,
                )?;
            }
            TNS_MSG_TYPE_ERROR => {
                parse_error_info(buf, &mut response.error_info, server_ttc_field_version)?;
            }
            TNS_MSG_TYPE_END_OF_RESPONSE => {
                end_of_response = true;
            }
            TNS_MSG_TYPE_PARAMETER => {
                parse_return_parameters(buf)?;
            }
            TNS_MSG_TYPE_BIT_VECTOR => {
                pending_bit_vector = Some(parse_bit_vector(buf, num_columns)?);
            }
            TNS_MSG_TYPE_STATUS => {
                parse_status_info(buf)?;
            }
            TNS_MSG_TYPE_SERVER_SIDE_PIGGYBACK => {
                parse_server_side_piggyback(buf)?;
            }
            _ => {
                return Err(Error::protocol(format!(
                    "Unexpected message type in fetch response: {}",
                    msg_type
                )));
            }
        }
    }

    // Determine if there are more rows based on error info
    // Error 1403 means no more rows
    if response.error_info.error_num == 0 || response.error_info.error_num == 1403 {
        response.more_rows = response.error_info.error_num == 0;
    }

    Ok(response)
}

/// Parse describe info (column metadata).
fn parse_describe_info(
    buf: &mut ReadBuffer,
    response: &mut ExecuteResponse,
    ttc_field_version: u8,
) -> Result<()> {
    let _max_row_size = buf.read_ub4()?;
    let num_columns = buf.read_ub4()?;

    if num_columns > 0 {
        let _ = buf.read_u8()?; // skip flags byte
    }

    for _ in 0..num_columns {
        let metadata = parse_column_metadata(buf, ttc_field_version)?;
        response.columns.push(metadata);
    }

    // Skip remaining describe info fields
    let num_bytes = buf.read_ub4()?;
    if num_bytes > 0 {
        buf.skip_raw_bytes_chunked()?;
    }
    let _ = buf.read_ub4()?; // dcbflag
    let _ = buf.read_ub4()?; // dcbmdbz
    let _ = buf.read_ub4()?; // dcbmnpr
    let _ = buf.read_ub4()?; // dcbmxpr
    let num_bytes2 = buf.read_ub4()?;
    if num_bytes2 > 0 {
        buf.skip_raw_bytes_chunked()?;
    }

    Ok(())
}

/// Parse single column metadata.
fn parse_column_metadata(buf: &mut ReadBuffer, ttc_field_version: u8) -> Result<ColumnMetadata> {
    let oracle_type = buf.read_u8()?;
    let _ = buf.read_u8()?; // flags

    let precision = buf.read_u8()? as i8;
    let scale = buf.read_u8()? as i8;
    let buffer_size = buf.read_ub4()?;
    let _ = buf.read_ub4()?; // max array elements
    let _ = buf.read_ub8()?; // cont flags

    // OID
    let _ = buf.read_bytes_with_length()?;

    let _ = buf.read_ub2()?; // version
    let _ = buf.read_ub2()?; // charset id
    let _ = buf.read_u8()?; // charset form
    let max_size = buf.read_ub4()?;

    if ttc_field_version >= TNS_CCAP_FIELD_VERSION_12_2 {
        let _oaccolid = buf.read_ub4()?; // oaccolid
    }

    let nullable = buf.read_u8()? != 0;
    let _v7_len = buf.read_u8()?; // v7 length

    // Python's read_str_with_length reads: UB4 (indicator) + UB1 (length) + data
    // Our read_str_with_length only reads: UB1 (length) + data
    // So we need to read the UB4 indicator first
    let name = read_column_string(buf)?;
    let _schema = read_column_string(buf)?; // schema
    let _type_name = read_column_string(buf)?; // type name
    let _col_pos = buf.read_ub2()?; // column position
    let _uds_flags = buf.read_ub4()?; // uds flags

    // 23.1+ fields - domain schema/name
    // Note: Python's read_str_with_length has ub4 prefix, so use read_column_string here too
    if ttc_field_version >= TNS_CCAP_FIELD_VERSION_23_1 {
        let _domain_schema = read_column_string(buf)?;
        let _domain_name = read_column_string(buf)?;
    }

    // 23.1 EXT3 fields - annotations
    if ttc_field_version >= TNS_CCAP_FIELD_VERSION_23_1_EXT_3 {
        let num_annotations = buf.read_ub4()?;
        if num_annotations > 0 {
            let _ = buf.read_u8()?;
            let actual_count = buf.read_ub4()?;
            let _ = buf.read_u8()?;
            for _ in 0..actual_count {
                let _ = read_column_string(buf)?; // key
                let _ = read_column_string(buf)?; // value
                let _ = buf.read_ub4()?; // flags
            }
            let _ = buf.read_ub4()?; // flags
        }
    }

    // 23.4 fields - vector
    if ttc_field_version >= TNS_CCAP_FIELD_VERSION_23_4 {
        let _ = buf.read_ub4()?; // vector dimensions
        let _ = buf.read_u8()?; // vector format
        let _ = buf.read_u8()?; // vector flags
    }

    Ok(ColumnMetadata {
        name,
        oracle_type,
        precision,
        scale,
        max_size,
        buffer_size,
        nullable,
    })
}

/// Parse row header (bit vector for duplicate detection).
fn parse_row_header(buf: &mut ReadBuffer) -> Result<()> {
    let _ = buf.read_u8()?; // flags
    let _ = buf.read_ub2()?; // num requests
    let _ = buf.read_ub4()?; // iteration number
    let _ = buf.read_ub4()?; // num iters
    let _ = buf.read_ub2()?; // buffer length

    // bit vector
    let num_bytes = buf.read_ub4()?;
    if num_bytes > 0 {
        let _ = buf.read_u8()?; // skip repeated length
        buf.skip((num_bytes - 1) as usize)?;
    }

    // rxhrid
    let num_bytes = buf.read_ub4()?;
    if num_bytes > 0 {
        buf.skip_raw_bytes_chunked()?;
    }

    Ok(())
}

/// Parse row data.
///
/// `bit_vector`, when present, marks columns the server omitted from the
/// wire because they repeat the previous row's decoded value (§8's
/// duplicate-column optimization): `bit_vector[i] == true` means column `i`
/// is not on the wire at all and must be copied from `rows.last()` instead.
fn parse_row_data(
    buf: &mut ReadBuffer,
    columns: &[ColumnMetadata],
    column_info: Arc<ColumnInfo>,
    bit_vector: Option<&[bool]>,
    server_ttc_field_version: u8,
    rows: &mut Vec<Row>,
) -> Result<()> {
    let mut values = Vec::with_capacity(columns.len());

    for (idx, col) in columns.iter().enumerate() {
        let duplicate = bit_vector.and_then(|bv| bv.get(idx)).copied().unwrap_or(false);
        if duplicate {
            let previous = rows.last().ok_or_else(|| {
                Error::protocol("bit vector marked a duplicate column but no previous row exists")
            })?;
            values.push(previous.get(idx).cloned().ok_or_else(|| {
                Error::protocol("bit vector column index out of range in previous row")
            })?);
        } else {
            values.push(parse_column_value(buf, col, server_ttc_field_version)?);
        }
    }

    rows.push(Row::new(values, column_info));
    Ok(())
}

/// Parse a single column value.
fn parse_column_value(
    buf: &mut ReadBuffer,
    col: &ColumnMetadata,
    server_ttc_field_version: u8,
) -> Result<OracleValue> {
    match col.oracle_type as u16 {
        // LOBs use their own framed wire format (size/chunk/locator/prefetch),
        // not a simple length-prefixed blob.
        ORA_TYPE_NUM_CLOB => {
            return match buf.read_lob_with_length(false, true, true)? {
                None => Ok(OracleValue::Null),
                Some(lob) => Ok(OracleValue::Lob(lob)),
            };
        }
        ORA_TYPE_NUM_BLOB => {
            return match buf.read_lob_with_length(false, true, false)? {
                None => Ok(OracleValue::Null),
                Some(lob) => Ok(OracleValue::Lob(lob)),
            };
        }
        ORA_TYPE_NUM_BFILE => {
            return match buf.read_lob_with_length(true, false, false)? {
                None => Ok(OracleValue::Null),
                Some(lob) => Ok(OracleValue::Lob(lob)),
            };
        }
        // A REF CURSOR column carries its cursor id as a plain UB2, never
        // a length-prefixed blob.
        ORA_TYPE_NUM_CURSOR => {
            let cursor_id = buf.read_ub2()?;
            return if cursor_id == 0 {
                Ok(OracleValue::Null)
            } else {
                Ok(OracleValue::RefCursor(cursor_id))
            };
        }
        _ => {}
    }

    // Read length-prefixed data
    let data = buf.read_bytes_with_length()?;

    match data {
        None => Ok(OracleValue::Null),
        Some(bytes) => {
            match col.oracle_type as u16 {
                // VARCHAR2, CHAR, LONG
                ORA_TYPE_NUM_VARCHAR | ORA_TYPE_NUM_CHAR | ORA_TYPE_NUM_LONG => {
                    let s = String::from_utf8_lossy(&bytes).to_string();
                    Ok(OracleValue::String(s))
                }
                // NUMBER, BINARY_INTEGER
                ORA_TYPE_NUM_NUMBER | ORA_TYPE_NUM_BINARY_INTEGER => {
                    let num_str = decode_oracle_number(&bytes)?;
                    Ok(OracleValue::Number(num_str))
                }
                // DATE
                ORA_TYPE_NUM_DATE => {
                    let dt = decode_oracle_date(&bytes)?;
                    Ok(OracleValue::Date(dt))
                }
                // TIMESTAMP, TIMESTAMP WITH LOCAL TIME ZONE (no tz bytes on the wire)
                ORA_TYPE_NUM_TIMESTAMP | ORA_TYPE_NUM_TIMESTAMP_LTZ => {
                    let dt = decode_timestamp(&bytes)?;
                    if col.oracle_type as u16 == ORA_TYPE_NUM_TIMESTAMP_LTZ {
                        Ok(OracleValue::TimestampLtz(dt))
                    } else {
                        Ok(OracleValue::Timestamp(dt))
                    }
                }
                // TIMESTAMP WITH TIME ZONE
                ORA_TYPE_NUM_TIMESTAMP_TZ => {
                    let ts = decode_timestamp_tz(&bytes)?;
                    Ok(OracleValue::TimestampTz(ts))
                }
                // INTERVAL DAY TO SECOND
                ORA_TYPE_NUM_INTERVAL_DS => {
                    let iv = decode_interval_ds(&bytes)?;
                    Ok(OracleValue::IntervalDs(iv))
                }
                // RAW, LONG RAW
                ORA_TYPE_NUM_RAW | ORA_TYPE_NUM_LONG_RAW => Ok(OracleValue::Raw(bytes.to_vec())),
                // ROWID, UROWID: the server sends the packed binary fields, which
                // we re-encode as the standard 18-character extended ROWID string.
                ORA_TYPE_NUM_ROWID | ORA_TYPE_NUM_UROWID => {
                    let rowid = decode_packed_rowid(&bytes)?;
                    Ok(OracleValue::Rowid(rowid))
                }
                // BINARY_FLOAT / BINARY_DOUBLE
                ORA_TYPE_NUM_BINARY_FLOAT => {
                    let f = decode_binary_float(&bytes)?;
                    Ok(OracleValue::BinaryFloat(f))
                }
                ORA_TYPE_NUM_BINARY_DOUBLE => {
                    let d = decode_binary_double(&bytes)?;
                    Ok(OracleValue::BinaryDouble(d))
                }
                // BOOLEAN (PL/SQL only): a single byte, non-zero is true
                ORA_TYPE_NUM_BOOLEAN => Ok(OracleValue::Boolean(bytes.first() == Some(&1))),
                // JSON (OSON-encoded)
                ORA_TYPE_NUM_JSON => {
                    let value = crate::protocol::oson::decode(&bytes)?;
                    Ok(OracleValue::Json(value))
                }
                // VECTOR (23ai embedding type)
                ORA_TYPE_NUM_VECTOR => {
                    let vector = decode_vector(&bytes, server_ttc_field_version)?;
                    Ok(OracleValue::Vector(vector))
                }
                // For other types, return as string for now
                _ => {
                    let s = String::from_utf8_lossy(&bytes).to_string();
                    Ok(OracleValue::String(s))
                }
            }
        }
    }
}

/// Decode the packed ROWID fields the server sends inline for ROWID/UROWID
/// columns into the standard 18-character extended ROWID string.
fn decode_packed_rowid(bytes: &[u8]) -> Result<String> {
    if bytes.len() < 10 {
        return Err(Error::protocol(format!(
            "ROWID column value must be at least 10 bytes, got {}",
            bytes.len()
        )));
    }
    let obj_id = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let file_no = u16::from_be_bytes([bytes[4], bytes[5]]);
    let block_no = u32::from_be_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]);
    let row_no = if bytes.len() >= 12 {
        u16::from_be_bytes([bytes[10], bytes[11]])
    } else {
        0
    };
    Ok(encode_rowid(obj_id, file_no, block_no, row_no))
}

/// Decode a VECTOR column's inline payload: magic byte, version, flags,
/// element format, element count, then the packed elements themselves.
/// The `binary` element format is only ever sent by 23ai+ servers; reject it
/// on anything older rather than guess at a packing we can't confirm.
fn decode_vector(bytes: &[u8], server_ttc_field_version: u8) -> Result<crate::protocol::types::VectorValue> {
    use crate::protocol::types::VectorValue;

    let mut r = ReadBuffer::new(bytes::Bytes::copy_from_slice(bytes));
    let magic = r.read_u8()?;
    if magic != TNS_VECTOR_MAGIC_BYTE {
        return Err(Error::protocol(format!(
            "VECTOR column value has bad magic byte: {:#04x}",
            magic
        )));
    }
    let _version = r.read_u8()?;
    let _flags = r.read_u16_be()?;
    let format = r.read_u8()?;
    let count = r.read_u32_be()? as usize;

    match format {
        TNS_VECTOR_FORMAT_INT8 => {
            let mut values = Vec::with_capacity(count);
            for _ in 0..count {
                values.push(r.read_u8()? as i8);
            }
            Ok(VectorValue::Int8(values))
        }
        TNS_VECTOR_FORMAT_FLOAT32 => {
            let mut values = Vec::with_capacity(count);
            for _ in 0..count {
                values.push(f32::from_bits(r.read_u32_be()?));
            }
            Ok(VectorValue::Float32(values))
        }
        TNS_VECTOR_FORMAT_FLOAT64 => {
            let mut values = Vec::with_capacity(count);
            for _ in 0..count {
                values.push(f64::from_bits(r.read_u64_be()?));
            }
            Ok(VectorValue::Float64(values))
        }
        TNS_VECTOR_FORMAT_BINARY => {
            if server_ttc_field_version < TNS_CCAP_FIELD_VERSION_23_4 {
                return Err(Error::UnsupportedType {
                    type_num: ORA_TYPE_NUM_VECTOR as u8,
                });
            }
            let num_bytes = count.div_ceil(8);
            let packed = r.read_bytes(num_bytes)?;
            let mut values = Vec::with_capacity(count);
            for bit in 0..count {
                let byte = packed[bit / 8];
                let on = (byte >> (7 - bit % 8)) & 1 != 0;
                values.push(if on { 1i8 } else { 0i8 });
            }
            Ok(VectorValue::Int8(values))
        }
        other => Err(Error::protocol(format!("unknown VECTOR element format: {}", other))),
    }
}

/// Parse error info from response.
fn parse_error_info(
    buf: &mut ReadBuffer,
    info: &mut ErrorInfo,
    ttc_field_version: u8,
) -> Result<()> {
    let _call_status = buf.read_ub4()?; // end of call status
    let _ = buf.read_ub2()?; // end to end seq#
    let _ = buf.read_ub4()?; // current row number
    let _error_num_hint = buf.read_ub2()?; // error number hint (not the real error!)
    let _ = buf.read_ub2()?; // array elem error
    let _ = buf.read_ub2()?; // array elem error
    info.cursor_id = buf.read_ub2()?;
    let position = buf.read_ub2()?; // error position (sb2, but read as ub2)
    info.position = if position != 0 { Some(position) } else { None };
    let _ = buf.read_u8()?; // sql type
    let _ = buf.read_u8()?; // fatal?
    let _ = buf.read_u8()?; // flags
    let _ = buf.read_u8()?; // user cursor options
    let _ = buf.read_u8()?; // UPI parameter
    let _ = buf.read_u8()?; // warning flags

    // rowid (18 bytes typically)
    info.row_id = parse_rowid(buf)?;

    let _ = buf.read_ub4()?; // OS error
    let _ = buf.read_u8()?; // statement number
    let _ = buf.read_u8()?; // call number
    let _ = buf.read_ub2()?; // padding
    let _ = buf.read_ub4()?; // success iters

    // oerrdd (logical rowid)
    let num_bytes = buf.read_ub4()?;
    if num_bytes > 0 {
        buf.skip_raw_bytes_chunked()?;
    }

    // batch error codes (one ORA code per row of a batched DML execute)
    let mut batch_codes = Vec::new();
    let num_errors = buf.read_ub2()?;
    if num_errors > 0 {
        let first_byte = buf.read_u8()?;
        for _ in 0..num_errors {
            if first_byte == TNS_LONG_LENGTH_INDICATOR {
                let _ = buf.read_ub4()?;
            }
            batch_codes.push(buf.read_ub2()? as u32);
        }
        if first_byte == TNS_LONG_LENGTH_INDICATOR {
            buf.skip(1)?;
        }
    }

    // batch error offsets (row index each code applies to; not currently surfaced)
    let num_offsets = buf.read_ub4()?;
    if num_offsets > 0 {
        let first_byte = buf.read_u8()?;
        for _ in 0..num_offsets {
            if first_byte == TNS_LONG_LENGTH_INDICATOR {
                let _ = buf.read_ub4()?;
            }
            let _ = buf.read_ub4()?;
        }
        if first_byte == TNS_LONG_LENGTH_INDICATOR {
            buf.skip(1)?;
        }
    }

    // batch error messages
    let temp = buf.read_ub2()?;
    if temp > 0 {
        buf.skip(1)?; // packed size
        for i in 0..temp {
            let _ = buf.read_ub2()?; // chunk length
            let message = buf.read_str_with_length()?.unwrap_or_default();
            buf.skip(2)?; // end marker
            let code = batch_codes.get(i as usize).copied().unwrap_or(0);
            info.batch_errors.push((code, message));
        }
    }

    // Extended error info
    info.error_num = buf.read_ub4()?;
    info.row_count = buf.read_ub8()?;

    // 20c+ fields - only present if server's field version is 20.1+
    // The ttc_field_version parameter here should be server_ttc_field_version
    if ttc_field_version >= TNS_CCAP_FIELD_VERSION_20_1 {
        let _sql_type = buf.read_ub4()?;
        let _server_checksum = buf.read_ub4()?;
    }

    // Error message (if error)
    // Note: Even for ORA-01403 "no data found", the server still sends the message
    if info.error_num != 0 {
        info.message = buf.read_str_with_length()?;
    }

    Ok(())
}

/// Parse return parameters (TNS_MSG_TYPE_PARAMETER).
/// Based on Python's _process_return_parameters in MessageWithData.
fn parse_return_parameters(buf: &mut ReadBuffer) -> Result<()> {
    // al8o4l - read num params and skip their ub4 values
    let num_params = buf.read_ub2()?;
    for _ in 0..num_params {
        let _ = buf.read_ub4()?;
    }

    // al8txl - skip bytes if present
    let num_bytes = buf.read_ub2()?;
    if num_bytes > 0 {
        buf.skip(num_bytes as usize)?;
    }

    // num key/value pairs
    let num_pairs = buf.read_ub2()?;
    for _ in 0..num_pairs {
        // text value
        let text_len = buf.read_ub2()?;
        if text_len > 0 {
            buf.skip(text_len as usize)?;
        }
        // binary value
        let bin_len = buf.read_ub2()?;
        if bin_len > 0 {
            buf.skip(bin_len as usize)?;
        }
        // keyword num
        let _ = buf.read_ub2()?;
    }

    // registration
    let num_bytes = buf.read_ub2()?;
    if num_bytes > 0 {
        buf.skip(num_bytes as usize)?;
    }

    Ok(())
}

/// Parse bit vector (TNS_MSG_TYPE_BIT_VECTOR).
///
/// Indicates which columns of the row data that follows repeat the previous
/// row's value and were therefore omitted from the wire. Returns one bool
/// per column, `true` meaning "not sent, copy from the previous row".
fn parse_bit_vector(buf: &mut ReadBuffer, num_columns: usize) -> Result<Vec<bool>> {
    // num_columns_sent - how many columns are actually sent in this batch
    let _num_columns_sent = buf.read_ub2()?;

    let num_bytes = num_columns.div_ceil(8);
    let mut bits = vec![false; num_columns];
    if num_bytes > 0 {
        let packed = buf.read_bytes(num_bytes)?;
        for (col, bit) in bits.iter_mut().enumerate() {
            let byte = packed[col / 8];
            *bit = (byte >> (col % 8)) & 1 != 0;
        }
    }

    Ok(bits)
}

/// Parse a ROWID value from an error-info payload (object id, relative file
/// number, block number, row/slot number).
fn parse_rowid(buf: &mut ReadBuffer) -> Result<Option<String>> {
    let rba = buf.read_ub4()?;
    let partition_id = buf.read_ub2()?;
    let _ = buf.read_u8()?;
    let block_num = buf.read_ub4()?;
    let slot_num = buf.read_ub2()?;

    if rba == 0 && partition_id == 0 && block_num == 0 && slot_num == 0 {
        Ok(None)
    } else {
        Ok(Some(encode_rowid(rba, partition_id, block_num, slot_num)))
    }
}

/// Read a column string (matches Python's read_str_with_length behavior).
/// Reads: UB4 indicator + UB1 length + bytes
fn read_column_string(buf: &mut ReadBuffer) -> Result<String> {
    let indicator = buf.read_ub4()?;
    if indicator == 0 {
        return Ok(String::new());
    }
    // Read the actual string data (UB1 length + bytes)
    match buf.read_str_with_length()? {
        Some(s) => Ok(s),
        None => Ok(String::new()),
    }
}

/// Parse status info (TNS_MSG_TYPE_STATUS).
///
/// This is a simple status message that can be sent instead of the full
/// ERROR structure in some flows. Based on Python's _process_status_info.
fn parse_status_info(buf: &mut ReadBuffer) -> Result<()> {
    let _call_status = buf.read_ub4()?;
    let _end_to_end_seq = buf.read_ub2()?;
    Ok(())
}

/// Parse server-side piggyback (TNS_MSG_TYPE_SERVER_SIDE_PIGGYBACK).
///
/// The server can send additional state updates (session changes, transaction IDs, etc.)
/// embedded in the response. For now we just skip the content.
/// Based on Python's _process_server_side_piggyback.
fn parse_server_side_piggyback(buf: &mut ReadBuffer) -> Result<()> {
    let opcode = buf.read_u8()?;

    // Different opcodes have different payloads
    // Python handles: LTXID (7), SESS_RET (4), AC_REPLAY_CONTEXT (8), EXT_SYNC (9), SESS_SIGNATURE (10)
    match opcode {
        4 => {
            // TNS_SERVER_PIGGYBACK_SESS_RET - DRCP session return
            let _sess_state = buf.read_ub4()?;
            let _sess_state_serial = buf.read_ub2()?;
        }
        7 => {
            // TNS_SERVER_PIGGYBACK_LTXID - Logical transaction ID
            let num_bytes = buf.read_ub4()?;
            if num_bytes > 0 {
                buf.skip_raw_bytes_chunked()?;
            }
        }
        8 => {
            // TNS_SERVER_PIGGYBACK_AC_REPLAY_CONTEXT
            let _flags = buf.read_ub4()?;
            let _error_code = buf.read_ub4()?;
            let num_bytes = buf.read_ub4()?;
            if num_bytes > 0 {
                buf.skip_raw_bytes_chunked()?;
            }
        }
        9 => {
            // TNS_SERVER_PIGGYBACK_EXT_SYNC - Extended sync (keyword/value pairs)
            let num_pairs = buf.read_ub2()?;
            for _ in 0..num_pairs {
                let key_len = buf.read_ub2()?;
                if key_len > 0 {
                    buf.skip(key_len as usize)?;
                }
                let value_len = buf.read_ub4()?;
                if value_len > 0 {
                    buf.skip_raw_bytes_chunked()?;
                }
            }
        }
        10 => {
            // TNS_SERVER_PIGGYBACK_SESS_SIGNATURE
            let num_bytes = buf.read_ub4()?;
            if num_bytes > 0 {
                buf.skip_raw_bytes_chunked()?;
            }
        }
        _ => {
            // Unknown opcode - log but don't fail
            tracing::warn!(opcode, "unknown server piggyback opcode");
        }
    }

    Ok(())
}
