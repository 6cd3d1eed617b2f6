//! Duration parsing for rule options.
//!
//! Rate-limit windows and intervals accept either a plain number of seconds
//! or a human-readable string such as `"1h30m"`. Parsing is additive over
//! `<number><unit>` segments, case-insensitive, and tolerant of whitespace
//! between segments. The result is always whole seconds; `ms` segments are
//! rounded to the nearest second, half up.

use crate::error::{ReqShieldError, Result};

/// Largest representable duration in seconds (2^31 - 1).
pub const MAX_SECONDS: u64 = i32::MAX as u64;

/// A duration as supplied in rule options: either a number of seconds or a
/// human-readable string. Deserializes untagged, so `60` and `"1m"` are both
/// accepted in serialized rule configurations.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(untagged)]
pub enum DurationValue {
    /// A number of seconds. Negative values are rejected at parse time.
    Seconds(i64),
    /// A segmented string such as `"90s"`, `"1h 30m"` or `"500ms"`.
    Text(String),
}

impl Default for DurationValue {
    fn default() -> Self {
        DurationValue::Seconds(0)
    }
}

impl From<i64> for DurationValue {
    fn from(secs: i64) -> Self {
        DurationValue::Seconds(secs)
    }
}

impl From<&str> for DurationValue {
    fn from(text: &str) -> Self {
        DurationValue::Text(text.to_string())
    }
}

impl From<String> for DurationValue {
    fn from(text: String) -> Self {
        DurationValue::Text(text)
    }
}

/// Resolve a [`DurationValue`] to whole seconds.
pub fn parse(value: &DurationValue) -> Result<u32> {
    match value {
        DurationValue::Seconds(secs) => {
            if *secs < 0 {
                return Err(ReqShieldError::InvalidDuration(format!(
                    "negative value `{secs}`"
                )));
            }
            let secs = *secs as u64;
            if secs > MAX_SECONDS {
                return Err(ReqShieldError::InvalidDuration(format!(
                    "`{secs}` exceeds the maximum of {MAX_SECONDS} seconds"
                )));
            }
            Ok(secs as u32)
        }
        DurationValue::Text(text) => parse_text(text),
    }
}

/// Milliseconds per unit, keyed by the lowercased unit spelling.
fn unit_millis(unit: &str) -> Option<u64> {
    match unit {
        "ms" => Some(1),
        "s" | "sec" => Some(1_000),
        "m" | "min" => Some(60_000),
        "h" | "hour" => Some(3_600_000),
        "d" | "day" => Some(86_400_000),
        _ => None,
    }
}

fn parse_text(text: &str) -> Result<u32> {
    let mut chars = text.chars().peekable();
    let mut total_ms: u64 = 0;
    let mut segments = 0usize;

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        let Some(&first) = chars.peek() else { break };

        if first == '-' {
            return Err(ReqShieldError::InvalidDuration(format!(
                "negative value in `{text}`"
            )));
        }
        if !first.is_ascii_digit() {
            return Err(ReqShieldError::InvalidDuration(format!(
                "expected a number at `{first}` in `{text}`"
            )));
        }

        let mut number: u64 = 0;
        while let Some(&c) = chars.peek() {
            let Some(digit) = c.to_digit(10) else { break };
            number = number
                .checked_mul(10)
                .and_then(|n| n.checked_add(u64::from(digit)))
                .ok_or_else(|| {
                    ReqShieldError::InvalidDuration(format!("overflow in `{text}`"))
                })?;
            chars.next();
        }

        let mut unit = String::new();
        while let Some(&c) = chars.peek() {
            if !c.is_ascii_alphabetic() {
                break;
            }
            unit.push(c.to_ascii_lowercase());
            chars.next();
        }
        if unit.is_empty() {
            return Err(ReqShieldError::InvalidDuration(format!(
                "missing unit after `{number}` in `{text}`"
            )));
        }
        let millis = unit_millis(&unit).ok_or_else(|| {
            ReqShieldError::InvalidDuration(format!("unknown unit `{unit}` in `{text}`"))
        })?;

        total_ms = number
            .checked_mul(millis)
            .and_then(|ms| total_ms.checked_add(ms))
            .ok_or_else(|| ReqShieldError::InvalidDuration(format!("overflow in `{text}`")))?;
        segments += 1;
    }

    if segments == 0 {
        return Err(ReqShieldError::InvalidDuration("empty duration".to_string()));
    }

    // Round sub-second remainders half up.
    let secs = total_ms.saturating_add(500) / 1_000;
    if secs > MAX_SECONDS {
        return Err(ReqShieldError::InvalidDuration(format!(
            "`{text}` exceeds the maximum of {MAX_SECONDS} seconds"
        )));
    }
    Ok(secs as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_str(s: &str) -> Result<u32> {
        parse(&DurationValue::from(s))
    }

    #[test]
    fn integer_seconds_pass_through() {
        assert_eq!(parse(&DurationValue::Seconds(0)).unwrap(), 0);
        assert_eq!(parse(&DurationValue::Seconds(3600)).unwrap(), 3600);
    }

    #[test]
    fn negative_integer_rejected() {
        assert!(parse(&DurationValue::Seconds(-1)).is_err());
    }

    #[test]
    fn integer_overflow_rejected() {
        assert!(parse(&DurationValue::Seconds(i64::MAX)).is_err());
        assert_eq!(
            parse(&DurationValue::Seconds(i64::from(i32::MAX))).unwrap(),
            i32::MAX as u32
        );
    }

    #[test]
    fn simple_units() {
        assert_eq!(parse_str("90s").unwrap(), 90);
        assert_eq!(parse_str("2m").unwrap(), 120);
        assert_eq!(parse_str("1h").unwrap(), 3600);
        assert_eq!(parse_str("1d").unwrap(), 86400);
    }

    #[test]
    fn unit_aliases() {
        assert_eq!(parse_str("30sec").unwrap(), 30);
        assert_eq!(parse_str("5min").unwrap(), 300);
        assert_eq!(parse_str("2hour").unwrap(), 7200);
        assert_eq!(parse_str("1day").unwrap(), 86400);
    }

    #[test]
    fn case_insensitive() {
        assert_eq!(parse_str("1H30M").unwrap(), 5400);
        assert_eq!(parse_str("10S").unwrap(), 10);
    }

    #[test]
    fn segments_are_additive_in_any_order() {
        assert_eq!(parse_str("1h30m").unwrap(), 5400);
        assert_eq!(parse_str("30m1h").unwrap(), 5400);
        assert_eq!(parse_str("1h 30m").unwrap(), 5400);
    }

    #[test]
    fn millis_round_half_up() {
        assert_eq!(parse_str("499ms").unwrap(), 0);
        assert_eq!(parse_str("500ms").unwrap(), 1);
        assert_eq!(parse_str("1499ms").unwrap(), 1);
        assert_eq!(parse_str("1s500ms").unwrap(), 2);
    }

    #[test]
    fn empty_input_rejected() {
        assert!(parse_str("").is_err());
        assert!(parse_str("   ").is_err());
    }

    #[test]
    fn unknown_unit_rejected() {
        assert!(parse_str("1w").is_err());
        assert!(parse_str("10fortnights").is_err());
    }

    #[test]
    fn missing_unit_rejected() {
        assert!(parse_str("90").is_err());
        assert!(parse_str("1h30").is_err());
    }

    #[test]
    fn negative_string_rejected() {
        assert!(parse_str("-10s").is_err());
    }

    #[test]
    fn string_overflow_rejected() {
        assert!(parse_str("99999999999d").is_err());
    }

    #[test]
    fn seconds_round_trip_through_format() {
        for n in [0u32, 1, 60, 86400] {
            assert_eq!(parse_str(&format!("{n}s")).unwrap(), n);
        }
    }
}
