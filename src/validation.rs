//! Input validation and normalization for binding fields.
//!
//! Every parser takes the attribute key so the resulting
//! [`ValidationError`] names the offending field.

use std::ops::RangeInclusive;

use crate::error::ValidationError;

/// Legal clock generator frequencies, in Hz.
pub const CLOCK_FREQUENCY_RANGE: RangeInclusive<u32> = 15_000..=270_000_000;

/// Validates a clock frequency entered as text.
///
/// # Arguments
///
/// * `key` - Attribute key reported on failure.
/// * `text` - The operator's input, surrounding whitespace ignored.
///
/// # Returns
///
/// * `Ok(hz)` if the text is an integer within [`CLOCK_FREQUENCY_RANGE`].
/// * `Err(ValidationError)` naming the legal range otherwise.
pub fn parse_clock_frequency(key: &str, text: &str) -> Result<u32, ValidationError> {
    let invalid = || ValidationError::new(key, text, clock_frequency_expectation());
    let hz = text.trim().parse::<i64>().map_err(|_| invalid())?;
    let hz = u32::try_from(hz).map_err(|_| invalid())?;
    is_in_range(hz, CLOCK_FREQUENCY_RANGE).map_err(|_| invalid())?;
    Ok(hz)
}

/// Human-readable form of the clock frequency range.
pub fn clock_frequency_expectation() -> String {
    format!(
        "an integer between {} and {} Hz",
        group_thousands(u64::from(*CLOCK_FREQUENCY_RANGE.start())),
        group_thousands(u64::from(*CLOCK_FREQUENCY_RANGE.end()))
    )
}

/// Validates a non-negative byte count entered as text.
pub fn parse_byte_count(key: &str, text: &str) -> Result<u64, ValidationError> {
    text.trim()
        .parse::<i64>()
        .ok()
        .and_then(|n| u64::try_from(n).ok())
        .ok_or_else(|| ValidationError::new(key, text, "a non-negative number of bytes"))
}

/// Validates register edit text: hexadecimal, optional `0x` prefix, 32 bits.
pub fn parse_register_text(key: &str, text: &str) -> Result<u32, ValidationError> {
    let trimmed = text.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if digits.is_empty() {
        return Err(register_error(key, text));
    }
    u32::from_str_radix(digits, 16).map_err(|_| register_error(key, text))
}

fn register_error(key: &str, text: &str) -> ValidationError {
    ValidationError::new(key, text, "a 32-bit hexadecimal value (00000000 to ffffffff)")
}

/// Register display form: eight lowercase hex digits.
pub fn format_register(value: u32) -> String {
    format!("{value:08x}")
}

/// Parses an integer literal with an optional base prefix.
///
/// Accepts `0x`/`0X` (hex), `0o`/`0O` (octal), `0b`/`0B` (binary) or plain
/// decimal, with an optional leading sign and `_` digit separators. Used for
/// register values in settings documents.
pub fn parse_int_literal(text: &str) -> Option<i64> {
    let text = text.trim();
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };

    let lower = body.to_ascii_lowercase();
    let (radix, digits) = if let Some(d) = lower.strip_prefix("0x") {
        (16, d)
    } else if let Some(d) = lower.strip_prefix("0o") {
        (8, d)
    } else if let Some(d) = lower.strip_prefix("0b") {
        (2, d)
    } else {
        (10, lower.as_str())
    };

    let digits: String = digits.chars().filter(|c| *c != '_').collect();
    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return None;
    }
    let magnitude = i64::from_str_radix(&digits, radix).ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

/// Validates if a given value is within a specified numeric range.
///
/// # Returns
///
/// * `Ok(())` if the value is within the range.
/// * `Err(&'static str)` if the value is outside the range.
pub fn is_in_range<T: PartialOrd>(value: T, range: RangeInclusive<T>) -> Result<(), &'static str> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err("Value is outside the specified range")
    }
}

/// Formats an integer with `,` thousands separators.
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
