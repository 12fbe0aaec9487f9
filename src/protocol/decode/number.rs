//! Oracle NUMBER type decoder.
//!
//! Oracle NUMBER is a variable-length format where:
//! - First byte is exponent (with sign info in high bit)
//! - Remaining bytes are base-100 digits of mantissa

use crate::error::{Error, Result};

/// Encode a decimal string into Oracle NUMBER wire format.
///
/// Accepts an optional leading `-`, a run of digits, and an optional `.`
/// followed by more digits (i.e. what `decode_oracle_number` produces).
/// This is the arithmetic inverse of `decode_oracle_number`: encoding then
/// decoding a value round-trips to the same string modulo trailing zeros.
pub fn encode_oracle_number(s: &str) -> Result<Vec<u8>> {
    let s = s.trim();
    if s.is_empty() {
        return Err(Error::type_conversion("cannot encode empty string as NUMBER"));
    }

    let (is_negative, rest) = match s.strip_prefix('-') {
        Some(r) => (true, r),
        None => (false, s),
    };

    let (int_part, frac_part) = match rest.split_once('.') {
        Some((i, f)) => (i, f),
        None => (rest, ""),
    };

    if int_part.is_empty() && frac_part.is_empty() {
        return Err(Error::type_conversion(format!("invalid NUMBER literal: {}", s)));
    }
    if !int_part.chars().all(|c| c.is_ascii_digit()) || !frac_part.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::type_conversion(format!("invalid NUMBER literal: {}", s)));
    }

    // Combine all digits, tracking where the decimal point falls (in digit
    // positions from the left), then strip leading/trailing zero digits.
    let mut digits: Vec<u8> = int_part
        .bytes()
        .chain(frac_part.bytes())
        .map(|b| b - b'0')
        .collect();
    let mut point = int_part.len() as i32;

    // Strip leading zero digits, adjusting point.
    while digits.first() == Some(&0) && digits.len() > 1 {
        digits.remove(0);
        point -= 1;
    }
    // Strip trailing zero digits (they carry no precision).
    while digits.last() == Some(&0) && digits.len() > 1 {
        digits.pop();
    }

    if digits == [0] {
        return Ok(vec![0x80]);
    }

    // Pad to an even digit count so we can group into base-100 pairs aligned
    // on the decimal point. Oracle's exponent covers pairs starting at
    // `point`, so if `point` is odd we need a leading pad digit.
    if point.rem_euclid(2) != 0 {
        digits.insert(0, 0);
        point += 1;
    }
    if digits.len() % 2 != 0 {
        digits.push(0);
    }

    let exponent = (point / 2) - 1;
    let mut mantissa: Vec<u8> = digits
        .chunks(2)
        .map(|pair| pair[0] * 10 + pair[1])
        .collect();

    // Trim trailing zero mantissa digits (each is worth 2 decimal digits).
    while mantissa.len() > 1 && *mantissa.last().unwrap() == 0 {
        mantissa.pop();
    }

    let mut out = Vec::with_capacity(mantissa.len() + 2);
    if is_negative {
        out.push(!((exponent + 193) as u8));
        for d in &mantissa {
            out.push(101 - d);
        }
        out.push(102);
    } else {
        out.push((exponent + 193) as u8);
        for d in &mantissa {
            out.push(d + 1);
        }
    }

    Ok(out)
}

/// Decode Oracle NUMBER format to string.
///
/// Preserves full precision by returning the number as a string.
/// Use `.parse::<i64>()` or `.parse::<f64>()` to convert.
pub fn decode_oracle_number(bytes: &[u8]) -> Result<String> {
    if bytes.is_empty() {
        return Ok("0".to_string());
    }

    let exp_byte = bytes[0];
    let is_positive = (exp_byte & 0x80) != 0;

    // Calculate exponent
    let exponent: i16 = if is_positive {
        exp_byte as i16 - 193
    } else {
        // Invert bits for negative numbers
        (!exp_byte) as i16 - 193
    };

    // decimal_point_index indicates where the decimal point goes
    let mut decimal_point_index: i16 = exponent * 2 + 2;

    // Handle zero and special cases
    if bytes.len() == 1 {
        if is_positive {
            return Ok("0".to_string());
        } else {
            // -1e126 (max negative value) - rare, return special
            return Ok("-1e126".to_string());
        }
    }

    // Check for trailing 102 byte for negative numbers
    let mantissa_end = if !is_positive && bytes[bytes.len() - 1] == 102 {
        bytes.len() - 1
    } else {
        bytes.len()
    };

    // Process mantissa bytes to extract base-100 digits
    let mut digits: Vec<u8> = Vec::with_capacity((mantissa_end - 1) * 2);

    for (i, &byte) in bytes.iter().enumerate().take(mantissa_end).skip(1) {
        let digit_pair = if is_positive {
            byte.wrapping_sub(1)
        } else {
            101u8.wrapping_sub(byte)
        };

        // First digit of the pair
        let d1 = digit_pair / 10;
        // Second digit of the pair
        let d2 = digit_pair % 10;

        // Handle leading zeros - they reduce decimal point index
        if digits.is_empty() && d1 == 0 {
            decimal_point_index -= 1;
            if d2 != 0 || i < mantissa_end - 1 {
                digits.push(d2);
            } else if d2 == 0 {
                decimal_point_index -= 1;
            }
        } else if d1 == 10 {
            // Overflow case (99+1=100) - rare
            digits.push(1);
            digits.push(0);
            decimal_point_index += 1;
        } else {
            digits.push(d1);
            // Only add trailing zero if not last byte
            if d2 != 0 || i < mantissa_end - 1 {
                digits.push(d2);
            }
        }
    }

    // Remove trailing zeros from digits
    while !digits.is_empty() && digits[digits.len() - 1] == 0 {
        digits.pop();
    }

    // If all digits were zeros
    if digits.is_empty() {
        return Ok("0".to_string());
    }

    // Build the string
    let mut result = String::new();

    if !is_positive {
        result.push('-');
    }

    let num_digits = digits.len() as i16;

    if decimal_point_index <= 0 {
        // Number is less than 1: 0.00...digits
        result.push('0');
        result.push('.');
        for _ in decimal_point_index..0 {
            result.push('0');
        }
        for d in &digits {
            result.push((b'0' + d) as char);
        }
    } else if decimal_point_index >= num_digits {
        // Number is an integer: digits + trailing zeros
        for d in &digits {
            result.push((b'0' + d) as char);
        }
        for _ in num_digits..decimal_point_index {
            result.push('0');
        }
    } else {
        // Number has decimal point in the middle
        for (i, d) in digits.iter().enumerate() {
            if i as i16 == decimal_point_index {
                result.push('.');
            }
            result.push((b'0' + d) as char);
        }
    }

    Ok(result)
}
