use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;

use crate::error::LedgerError;

/// Storage format for timestamps. Fixed width, so text order equals time order.
pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Display format for timestamps in listings.
pub(crate) const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const INPUT_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

/// Parse a user-supplied timestamp: `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DD HH:MM`
/// or a bare `YYYY-MM-DD` (midnight).
pub(crate) fn parse_timestamp(s: &str) -> Result<NaiveDateTime, LedgerError> {
    let s = s.trim();
    for fmt in INPUT_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(ts);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map(|d| d.and_time(NaiveTime::MIN))
        .map_err(|_| LedgerError::InvalidTimestamp(s.to_string()))
}

/// Amounts must stay below this magnitude.
const AMOUNT_LIMIT: i64 = 1_000_000_000_000;

/// Accept an amount with at most 2 decimal places and a magnitude below
/// [`AMOUNT_LIMIT`]. Trailing zeros do not count as places.
pub(crate) fn check_amount(amount: Decimal) -> Result<Decimal, LedgerError> {
    let normalized = amount.normalize();
    if normalized.scale() > 2 || normalized.abs() >= Decimal::new(AMOUNT_LIMIT, 0) {
        return Err(LedgerError::InvalidAmount(amount.to_string()));
    }
    Ok(amount)
}

pub(crate) fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Format a decimal amount with thousand separators and 2 decimal places.
/// e.g. `-1234567.891` → `"-1,234,567.89"`
pub(crate) fn format_amount(val: Decimal) -> String {
    let abs = val.abs();
    let formatted = format!("{:.2}", abs.round_dp(2));
    let mut parts = formatted.split('.');
    let int_part = parts.next().unwrap_or("0");
    let dec_part = parts.next().unwrap_or("00");

    let with_commas: String = int_part
        .as_bytes()
        .rchunks(3)
        .rev()
        .map(|chunk| std::str::from_utf8(chunk).unwrap_or(""))
        .collect::<Vec<_>>()
        .join(",");

    if val < Decimal::ZERO {
        format!("-{with_commas}.{dec_part}")
    } else {
        format!("{with_commas}.{dec_part}")
    }
}

/// Truncate a string to `max` visible characters, appending "…" if truncated.
/// Safe for multi-byte UTF-8 characters.
pub(crate) fn truncate(s: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    let char_count = s.chars().count();
    if char_count <= max {
        return s.to_string();
    }
    let truncated: String = s.chars().take(max.saturating_sub(1)).collect();
    format!("{truncated}…")
}

/// Split a comma-separated list, trimming entries and dropping empty ones.
pub(crate) fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
#[path = "util_tests.rs"]
mod util_tests;
