//! Oracle value types for query results.

use crate::protocol::decode::{IntervalDs, Timestamp};
use crate::protocol::oson::OsonValue;
use crate::protocol::types::LobValue;
use chrono::NaiveDateTime;
use std::fmt;

/// Decoded VECTOR column payload, tagged by the wire format it came in as.
#[derive(Debug, Clone, PartialEq)]
pub enum VectorValue {
    Int8(Vec<i8>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
}

impl VectorValue {
    pub fn len(&self) -> usize {
        match self {
            VectorValue::Int8(v) => v.len(),
            VectorValue::Float32(v) => v.len(),
            VectorValue::Float64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Oracle value enum representing a single column value.
#[derive(Debug, Clone, PartialEq)]
pub enum OracleValue {
    /// NULL value.
    Null,
    /// String value (VARCHAR2, CHAR, CLOB, etc.).
    String(String),
    /// Number value as string (preserves precision).
    /// Can be converted to i64/f64 as needed.
    Number(String),
    /// Date/time value (DATE type).
    Date(NaiveDateTime),
    /// TIMESTAMP value (no time zone).
    Timestamp(NaiveDateTime),
    /// TIMESTAMP WITH LOCAL TIME ZONE value, normalized to the session zone.
    TimestampLtz(NaiveDateTime),
    /// TIMESTAMP WITH TIME ZONE value.
    TimestampTz(Timestamp),
    /// INTERVAL DAY TO SECOND value.
    IntervalDs(IntervalDs),
    /// Raw binary value (RAW, LONG RAW).
    Raw(Vec<u8>),
    /// Extended ROWID string (ROWID, UROWID).
    Rowid(String),
    /// Cursor id of a REF CURSOR column.
    RefCursor(u16),
    /// LOB value (CLOB, BLOB, BFILE), prefetched or locator-only.
    Lob(LobValue),
    /// JSON value (OSON-encoded on the wire).
    Json(OsonValue),
    /// BINARY_FLOAT value.
    BinaryFloat(f32),
    /// BINARY_DOUBLE value.
    BinaryDouble(f64),
    /// PL/SQL BOOLEAN value.
    Boolean(bool),
    /// VECTOR value (23ai embedding type).
    Vector(VectorValue),
}

impl OracleValue {
    /// Check if the value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, OracleValue::Null)
    }

    /// Try to get the value as a string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            OracleValue::String(s) => Some(s),
            OracleValue::Number(s) => Some(s),
            _ => None,
        }
    }

    /// Try to convert to i64.
    pub fn to_i64(&self) -> Option<i64> {
        match self {
            OracleValue::Number(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Try to convert to f64.
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            OracleValue::Number(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Try to get the value as a NaiveDateTime.
    pub fn as_date(&self) -> Option<NaiveDateTime> {
        match self {
            OracleValue::Date(dt) | OracleValue::Timestamp(dt) | OracleValue::TimestampLtz(dt) => {
                Some(*dt)
            }
            OracleValue::TimestampTz(ts) => Some(ts.naive),
            _ => None,
        }
    }

    /// Try to get the value as a raw byte slice (RAW, LONG RAW).
    pub fn as_raw(&self) -> Option<&[u8]> {
        match self {
            OracleValue::Raw(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Try to get the value as a bool (PL/SQL BOOLEAN).
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OracleValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get the value as a VECTOR payload.
    pub fn as_vector(&self) -> Option<&VectorValue> {
        match self {
            OracleValue::Vector(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for OracleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OracleValue::Null => write!(f, "NULL"),
            OracleValue::String(s) => write!(f, "{}", s),
            OracleValue::Number(n) => write!(f, "{}", n),
            OracleValue::Date(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            OracleValue::Timestamp(dt) | OracleValue::TimestampLtz(dt) => {
                write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S%.9f"))
            }
            OracleValue::TimestampTz(ts) => match ts.offset {
                Some(off) => write!(f, "{} {}", ts.naive.format("%Y-%m-%d %H:%M:%S%.9f"), off),
                None => write!(f, "{}", ts.naive.format("%Y-%m-%d %H:%M:%S%.9f")),
            },
            OracleValue::IntervalDs(iv) => write!(
                f,
                "{}{} {:02}:{:02}:{:02}.{:09}",
                if iv.days < 0 { "-" } else { "+" },
                iv.days.abs(),
                iv.hours.abs(),
                iv.minutes.abs(),
                iv.seconds.abs(),
                iv.nanoseconds.unsigned_abs()
            ),
            OracleValue::Raw(bytes) => {
                for b in bytes {
                    write!(f, "{:02X}", b)?;
                }
                Ok(())
            }
            OracleValue::Rowid(r) => write!(f, "{}", r),
            OracleValue::RefCursor(id) => write!(f, "<cursor {}>", id),
            OracleValue::Lob(lob) => write!(f, "<LOB {} bytes>", lob.size()),
            OracleValue::Json(_) => write!(f, "<JSON>"),
            OracleValue::BinaryFloat(v) => write!(f, "{}", v),
            OracleValue::BinaryDouble(v) => write!(f, "{}", v),
            OracleValue::Boolean(v) => write!(f, "{}", v),
            OracleValue::Vector(v) => write!(f, "<VECTOR[{}]>", v.len()),
        }
    }
}
