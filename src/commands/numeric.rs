//! Number parsing and formatting shared by the numeric commands.
//!
//! Numbers are stored as their canonical decimal text. They are parsed on
//! demand inside the commands that need numeric semantics and written back as
//! text, so repeated increments never drift through a binary round trip.

use crate::commands::CommandError;
use std::time::{Duration, Instant};

/// Parses an integer from raw bytes.
pub fn parse_i64(raw: &[u8]) -> Option<i64> {
    std::str::from_utf8(raw).ok()?.parse().ok()
}

/// Parses a finite integer-or-float literal from raw bytes.
///
/// Rejects `inf`, `nan` and anything with surrounding whitespace.
pub fn parse_number(raw: &[u8]) -> Option<f64> {
    let text = std::str::from_utf8(raw).ok()?;
    if text.is_empty() || text.trim() != text {
        return None;
    }
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parses a request argument as a float.
pub fn parse_float_arg(raw: &[u8]) -> Result<f64, CommandError> {
    parse_number(raw).ok_or(CommandError::InvalidFloat)
}

/// Parses a request argument as an integer.
pub fn parse_int_arg(raw: &[u8]) -> Result<i64, CommandError> {
    parse_i64(raw).ok_or(CommandError::InvalidInteger)
}

/// Parses a relative expire time given in units of `unit_ms` milliseconds.
///
/// Returns `Ok(None)` for zero or negative amounts, which callers treat as
/// "already expired". Amounts too large to schedule are rejected.
pub fn parse_expire_time(
    raw: &[u8],
    unit_ms: i64,
    command: &str,
) -> Result<Option<Duration>, CommandError> {
    let invalid = || CommandError::InvalidExpireTime(command.to_ascii_lowercase());

    let millis = parse_int_arg(raw)?
        .checked_mul(unit_ms)
        .ok_or_else(invalid)?;
    if millis <= 0 {
        return Ok(None);
    }

    let ttl = Duration::from_millis(millis as u64);
    Instant::now().checked_add(ttl).ok_or_else(invalid)?;
    Ok(Some(ttl))
}

/// Magnitudes in `[PLAIN_MIN, PLAIN_MAX)` are written as plain decimals.
const PLAIN_MIN: f64 = 1e-5;
const PLAIN_MAX: f64 = 1e17;

/// Formats a float as the shortest decimal that round-trips to the same value.
///
/// Drops a trailing `.0` and renders negative zero as `0`. Magnitudes outside
/// `1e-5..1e17` switch to exponent notation so a tiny or huge value never
/// expands into hundreds of digits.
///
/// ```
/// use tallykv::commands::format_float;
///
/// assert_eq!(format_float(10.1 + 10.5), "20.6");
/// assert_eq!(format_float(10.0), "10");
/// assert_eq!(format_float(-0.0), "0");
/// assert_eq!(format_float(1e21), "1e21");
/// ```
pub fn format_float(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    let magnitude = value.abs();
    if (PLAIN_MIN..PLAIN_MAX).contains(&magnitude) {
        value.to_string()
    } else {
        format!("{:e}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(b"10"), Some(10.0));
        assert_eq!(parse_number(b"-3.5"), Some(-3.5));
        assert_eq!(parse_number(b"1e3"), Some(1000.0));
        assert_eq!(parse_number(b".5"), Some(0.5));

        assert_eq!(parse_number(b"value"), None);
        assert_eq!(parse_number(b""), None);
        assert_eq!(parse_number(b" 1"), None);
        assert_eq!(parse_number(b"inf"), None);
        assert_eq!(parse_number(b"NaN"), None);
        assert_eq!(parse_number(&[0xff, 0xfe]), None);
    }

    #[test]
    fn test_parse_args() {
        assert_eq!(parse_float_arg(b"10.5"), Ok(10.5));
        assert_eq!(parse_float_arg(b"abc"), Err(CommandError::InvalidFloat));
        assert_eq!(parse_int_arg(b"-42"), Ok(-42));
        assert_eq!(parse_int_arg(b"4.2"), Err(CommandError::InvalidInteger));
        assert_eq!(
            parse_int_arg(b"99999999999999999999"),
            Err(CommandError::InvalidInteger)
        );
    }

    #[test]
    fn test_parse_expire_time() {
        assert_eq!(
            parse_expire_time(b"10", 1000, "expire"),
            Ok(Some(Duration::from_secs(10)))
        );
        assert_eq!(parse_expire_time(b"0", 1, "pexpire"), Ok(None));
        assert_eq!(parse_expire_time(b"-5", 1000, "expire"), Ok(None));
        assert_eq!(
            parse_expire_time(b"x", 1000, "expire"),
            Err(CommandError::InvalidInteger)
        );
        assert_eq!(
            parse_expire_time(i64::MAX.to_string().as_bytes(), 1000, "expire"),
            Err(CommandError::InvalidExpireTime("expire".into()))
        );
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(10.1), "10.1");
        assert_eq!(format_float(10.1 + 10.5), "20.6");
        assert_eq!(format_float(3.0), "3");
        assert_eq!(format_float(-2.5), "-2.5");
        assert_eq!(format_float(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_float(-0.0), "0");
    }

    #[test]
    fn test_format_float_extreme_magnitudes() {
        assert_eq!(format_float(1e-5), "0.00001");
        assert_eq!(format_float(12345678901234567.0), "12345678901234568");
        assert_eq!(format_float(1e17), "1e17");
        assert_eq!(format_float(1e21), "1e21");
        assert_eq!(format_float(-2.5e-7), "-2.5e-7");
        assert_eq!(format_float(1e-320), "1e-320");
        assert_eq!(format_float(f64::MAX), "1.7976931348623157e308");

        // The exponent form parses back to the same value
        for value in [1e-320, 6.02214076e23, -f64::MAX] {
            assert_eq!(parse_number(format_float(value).as_bytes()), Some(value));
        }
    }
}
