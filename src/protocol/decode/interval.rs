//! Oracle INTERVAL DAY TO SECOND decoder/encoder.
//!
//! Wire layout (11 bytes, big-endian):
//! - bytes[0..4]: days, biased by 2^31
//! - byte[4]: hours, biased by 60
//! - byte[5]: minutes, biased by 60
//! - byte[6]: seconds, biased by 60
//! - bytes[7..11]: nanoseconds, biased by 2^31

use crate::error::{Error, Result};

const DAY_BIAS: i64 = 0x8000_0000;
const FIELD_BIAS: i32 = 60;

/// A parsed INTERVAL DAY TO SECOND value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalDs {
    pub days: i32,
    pub hours: i32,
    pub minutes: i32,
    pub seconds: i32,
    pub nanoseconds: i32,
}

impl IntervalDs {
    /// Total duration expressed in nanoseconds, ignoring sign on the
    /// individual fields (Oracle always signs every field the same way).
    pub fn total_nanos(&self) -> i64 {
        let secs = self.days as i64 * 86_400
            + self.hours as i64 * 3_600
            + self.minutes as i64 * 60
            + self.seconds as i64;
        secs * 1_000_000_000 + self.nanoseconds as i64
    }
}

pub fn decode_interval_ds(data: &[u8]) -> Result<IntervalDs> {
    if data.len() != 11 {
        return Err(Error::protocol(format!(
            "INTERVAL DAY TO SECOND value must be exactly 11 bytes, got {}",
            data.len()
        )));
    }

    let days_biased = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as i64;
    let days = (days_biased - DAY_BIAS) as i32;
    let hours = data[4] as i32 - FIELD_BIAS;
    let minutes = data[5] as i32 - FIELD_BIAS;
    let seconds = data[6] as i32 - FIELD_BIAS;
    let nanos_biased = u32::from_be_bytes([data[7], data[8], data[9], data[10]]) as i64;
    let nanoseconds = (nanos_biased - DAY_BIAS) as i32;

    Ok(IntervalDs {
        days,
        hours,
        minutes,
        seconds,
        nanoseconds,
    })
}

pub fn encode_interval_ds(iv: &IntervalDs) -> Result<[u8; 11]> {
    let days_biased = (iv.days as i64 + DAY_BIAS) as u32;
    let nanos_biased = (iv.nanoseconds as i64 + DAY_BIAS) as u32;

    let mut out = [0u8; 11];
    out[..4].copy_from_slice(&days_biased.to_be_bytes());
    out[4] = (iv.hours + FIELD_BIAS) as u8;
    out[5] = (iv.minutes + FIELD_BIAS) as u8;
    out[6] = (iv.seconds + FIELD_BIAS) as u8;
    out[7..11].copy_from_slice(&nanos_biased.to_be_bytes());
    Ok(out)
}
