#![allow(clippy::unwrap_used)]

use chrono::NaiveDate;
use rust_decimal_macros::dec;

use super::*;

// ── parse_timestamp ───────────────────────────────────────────

#[test]
fn test_parse_timestamp_full() {
    let ts = parse_timestamp("2023-12-01 10:00:00").unwrap();
    assert_eq!(
        ts,
        NaiveDate::from_ymd_opt(2023, 12, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    );
}

#[test]
fn test_parse_timestamp_minutes() {
    let ts = parse_timestamp("2023-12-01 08:30").unwrap();
    assert_eq!(ts.format(DISPLAY_FORMAT).to_string(), "2023-12-01 08:30:00");
}

#[test]
fn test_parse_timestamp_date_only_is_midnight() {
    let ts = parse_timestamp(" 2023-12-01 ").unwrap();
    assert_eq!(ts.format(DISPLAY_FORMAT).to_string(), "2023-12-01 00:00:00");
}

#[test]
fn test_parse_timestamp_rejects_garbage() {
    for bad in ["2023/12/01", "yesterday", "", "2023-13-01"] {
        let err = parse_timestamp(bad).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidTimestamp(_)), "{bad}");
    }
}

#[test]
fn test_format_timestamp_is_fixed_width() {
    let a = format_timestamp(&parse_timestamp("2023-12-01 09:00:00").unwrap());
    let b = format_timestamp(&parse_timestamp("2023-12-01 10:00:00").unwrap());
    assert_eq!(a, "2023-12-01 09:00:00.000000");
    assert_eq!(a.len(), b.len());
    assert!(a < b);
}

// ── check_amount ──────────────────────────────────────────────

#[test]
fn test_check_amount_accepts_cents() {
    assert_eq!(check_amount(dec!(-35.5)).unwrap(), dec!(-35.5));
    assert_eq!(check_amount(dec!(0)).unwrap(), dec!(0));
    assert_eq!(check_amount(dec!(12.300)).unwrap(), dec!(12.300));
    assert!(check_amount(dec!(999999999999.99)).is_ok());
}

#[test]
fn test_check_amount_rejects_fractions_and_huge_values() {
    for bad in [dec!(0.001), dec!(-1.999), dec!(1000000000000), dec!(-1000000000000)] {
        assert!(
            matches!(check_amount(bad), Err(LedgerError::InvalidAmount(_))),
            "{bad}"
        );
    }
}

// ── format_amount ─────────────────────────────────────────────

#[test]
fn test_format_amount_basic() {
    assert_eq!(format_amount(dec!(0)), "0.00");
    assert_eq!(format_amount(dec!(5.5)), "5.50");
    assert_eq!(format_amount(dec!(999.99)), "999.99");
}

#[test]
fn test_format_amount_thousands() {
    assert_eq!(format_amount(dec!(1000)), "1,000.00");
    assert_eq!(format_amount(dec!(1234567.891)), "1,234,567.89");
}

#[test]
fn test_format_amount_negative() {
    assert_eq!(format_amount(dec!(-2000)), "-2,000.00");
    assert_eq!(format_amount(dec!(-0.5)), "-0.50");
}

// ── truncate ──────────────────────────────────────────────────

#[test]
fn test_truncate_short_string() {
    assert_eq!(truncate("hello", 10), "hello");
}

#[test]
fn test_truncate_long_string() {
    assert_eq!(truncate("hello world", 5), "hell…");
}

#[test]
fn test_truncate_zero_max() {
    assert_eq!(truncate("hello", 0), "");
}

#[test]
fn test_truncate_cjk() {
    assert_eq!(truncate("每月固定房租支出", 4), "每月固…");
}

// ── split_list ────────────────────────────────────────────────

#[test]
fn test_split_list_trims_and_drops_empty() {
    assert_eq!(split_list(" 餐饮, 交通 ,,"), vec!["餐饮", "交通"]);
    assert!(split_list(" , ").is_empty());
}
