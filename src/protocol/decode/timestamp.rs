//! Oracle TIMESTAMP / TIMESTAMP WITH (LOCAL) TIME ZONE decoders.
//!
//! Wire layout (big-endian), building on the 7-byte DATE layout:
//! - bytes[0..7]: same as DATE (century+100, year+100, month, day, hour+1, minute+1, second+1)
//! - bytes[7..11]: nanoseconds (u32), present when the column carries fractional seconds
//! - bytes[11..13]: timezone offset, present for TIMESTAMP WITH TIME ZONE only
//!   - byte[11]: hour offset + 20
//!   - byte[12]: minute offset + 60
//!
//! TIMESTAMP WITH LOCAL TIME ZONE values are normalized to the session time
//! zone by the server and carry no tz bytes on the wire; they decode with
//! the same 7/11-byte layout as plain TIMESTAMP.

use crate::error::{Error, Result};
use chrono::{Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

/// A TIMESTAMP WITH TIME ZONE value: a naive wall-clock reading plus the
/// UTC offset it was recorded at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp {
    pub naive: NaiveDateTime,
    pub offset: Option<FixedOffset>,
}

fn decode_date_part(data: &[u8]) -> Result<(i32, u32, u32, u32, u32, u32)> {
    if data.len() < 7 {
        return Err(Error::protocol(format!(
            "TIMESTAMP value must be at least 7 bytes, got {}",
            data.len()
        )));
    }
    let century = (data[0] as i32) - 100;
    let year_in_century = (data[1] as i32) - 100;
    let year = century * 100 + year_in_century;
    let month = data[2] as u32;
    let day = data[3] as u32;
    let hour = data[4] as u32 - 1;
    let minute = data[5] as u32 - 1;
    let second = data[6] as u32 - 1;
    Ok((year, month, day, hour, minute, second))
}

/// Decode a TIMESTAMP (or TIMESTAMP WITH LOCAL TIME ZONE) value.
///
/// Accepts either the 7-byte (no fractional seconds) or 11-byte (with
/// nanoseconds) wire layout.
pub fn decode_timestamp(data: &[u8]) -> Result<NaiveDateTime> {
    let (year, month, day, hour, minute, second) = decode_date_part(data)?;

    let nanos = if data.len() >= 11 {
        u32::from_be_bytes([data[7], data[8], data[9], data[10]])
    } else {
        0
    };

    let date = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| Error::protocol(format!("Invalid TIMESTAMP date: {}-{}-{}", year, month, day)))?;
    let time = NaiveTime::from_hms_nano_opt(hour, minute, second, nanos)
        .ok_or_else(|| Error::protocol(format!("Invalid TIMESTAMP time: {}:{}:{}.{}", hour, minute, second, nanos)))?;
    Ok(NaiveDateTime::new(date, time))
}

/// Decode a TIMESTAMP WITH TIME ZONE value (11 bytes without fractional
/// seconds + 2 tz bytes, or 13 bytes with nanoseconds + 2 tz bytes).
pub fn decode_timestamp_tz(data: &[u8]) -> Result<Timestamp> {
    if data.len() != 11 && data.len() != 13 {
        return Err(Error::protocol(format!(
            "TIMESTAMP WITH TIME ZONE value must be 11 or 13 bytes, got {}",
            data.len()
        )));
    }

    let (year, month, day, hour, minute, second) = decode_date_part(data)?;
    let (nanos, tz_bytes) = if data.len() == 13 {
        (u32::from_be_bytes([data[7], data[8], data[9], data[10]]), &data[11..13])
    } else {
        (0u32, &data[7..9])
    };

    let hour_offset = tz_bytes[0] as i32 - 20;
    let minute_offset = tz_bytes[1] as i32 - 60;
    let offset_seconds = hour_offset * 3600 + minute_offset * 60;
    let offset = FixedOffset::east_opt(offset_seconds)
        .ok_or_else(|| Error::protocol(format!("Invalid TIMESTAMP TZ offset: {}:{}", hour_offset, minute_offset)))?;

    let date = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| Error::protocol(format!("Invalid TIMESTAMP date: {}-{}-{}", year, month, day)))?;
    let time = NaiveTime::from_hms_nano_opt(hour, minute, second, nanos)
        .ok_or_else(|| Error::protocol(format!("Invalid TIMESTAMP time: {}:{}:{}.{}", hour, minute, second, nanos)))?;

    Ok(Timestamp {
        naive: NaiveDateTime::new(date, time),
        offset: Some(offset),
    })
}

/// Encode a `NaiveDateTime` into the 11-byte TIMESTAMP wire format.
pub fn encode_timestamp(dt: &NaiveDateTime) -> Result<[u8; 11]> {
    let year = dt.year();
    let century = year / 100;
    let year_in_century = year - century * 100;
    if !(-99..=99).contains(&century) || !(0..=99).contains(&year_in_century) {
        return Err(Error::protocol(format!("TIMESTAMP year out of range: {}", year)));
    }

    let nanos = dt.nanosecond().to_be_bytes();
    Ok([
        (century + 100) as u8,
        (year_in_century + 100) as u8,
        dt.month() as u8,
        dt.day() as u8,
        dt.hour() as u8 + 1,
        dt.minute() as u8 + 1,
        dt.second() as u8 + 1,
        nanos[0],
        nanos[1],
        nanos[2],
        nanos[3],
    ])
}

/// Encode a `Timestamp` into the 13-byte TIMESTAMP WITH TIME ZONE wire format.
pub fn encode_timestamp_tz(ts: &Timestamp) -> Result<[u8; 13]> {
    let base = encode_timestamp(&ts.naive)?;
    let offset = ts
        .offset
        .ok_or_else(|| Error::protocol("TIMESTAMP WITH TIME ZONE requires an offset".to_string()))?;
    let total_minutes = offset.local_minus_utc() / 60;
    let hour_offset = total_minutes / 60;
    let minute_offset = total_minutes % 60;

    if !(-12..=14).contains(&hour_offset) {
        return Err(Error::protocol(format!("TIMESTAMP TZ hour offset out of range: {}", hour_offset)));
    }

    let mut out = [0u8; 13];
    out[..11].copy_from_slice(&base);
    out[11] = (hour_offset + 20) as u8;
    out[12] = (minute_offset + 60) as u8;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_timestamp_no_fraction() {
        let data = [0x78, 0x7C, 0x0A, 0x15, 0x0D, 0x25, 0x06];
        let ts = decode_timestamp(&data).unwrap();
        assert_eq!(ts.year(), 2024);
        assert_eq!(ts.nanosecond(), 0);
    }

    #[test]
    fn test_timestamp_round_trip_with_nanos() {
        let date = NaiveDate::from_ymd_opt(2023, 5, 17).unwrap();
        let time = NaiveTime::from_hms_nano_opt(8, 9, 10, 123_456_789).unwrap();
        let dt = NaiveDateTime::new(date, time);
        let encoded = encode_timestamp(&dt).unwrap();
        let decoded = decode_timestamp(&encoded).unwrap();
        assert_eq!(decoded, dt);
    }

    #[test]
    fn test_timestamp_tz_round_trip() {
        let date = NaiveDate::from_ymd_opt(2023, 5, 17).unwrap();
        let time = NaiveTime::from_hms_nano_opt(8, 9, 10, 500_000_000).unwrap();
        let naive = NaiveDateTime::new(date, time);
        let offset = FixedOffset::east_opt(-5 * 3600).unwrap();
        let ts = Timestamp { naive, offset: Some(offset) };
        let encoded = encode_timestamp_tz(&ts).unwrap();
        let decoded = decode_timestamp_tz(&encoded).unwrap();
        assert_eq!(decoded.naive, naive);
        assert_eq!(decoded.offset.unwrap().local_minus_utc(), -5 * 3600);
    }

    #[test]
    fn test_timestamp_tz_positive_offset() {
        let date = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let time = NaiveTime::from_hms_opt(0, 0, 0).unwrap();
        let naive = NaiveDateTime::new(date, time);
        let offset = FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap();
        let ts = Timestamp { naive, offset: Some(offset) };
        let encoded = encode_timestamp_tz(&ts).unwrap();
        let decoded = decode_timestamp_tz(&encoded).unwrap();
        assert_eq!(decoded.offset.unwrap().local_minus_utc(), 5 * 3600 + 30 * 60);
    }
}
