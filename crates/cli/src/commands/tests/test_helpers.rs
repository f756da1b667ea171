use crate::commands::helpers::{cell, expiry_hint, human_bytes};
use chrono::{Duration, TimeZone, Utc};
use serde_json::json;

#[test]
fn test_human_bytes_scales_units() {
    assert_eq!(human_bytes(0), "0 B");
    assert_eq!(human_bytes(1023), "1023 B");
    assert_eq!(human_bytes(4096), "4.0 KiB");
    assert_eq!(human_bytes(3 * 1024 * 1024 * 1024 / 2), "1.5 GiB");
    assert_eq!(human_bytes(u64::MAX), "16777216.0 TiB");
}

#[test]
fn test_expiry_hint_future_and_past() {
    let now = Utc.with_ymd_and_hms(2025, 2, 1, 10, 0, 0).unwrap();
    assert_eq!(expiry_hint(now + Duration::minutes(90), now), "in 1.5h");
    assert_eq!(expiry_hint(now - Duration::hours(2), now), "expired 2.0h ago");
}

#[test]
fn test_cell_rendering() {
    assert_eq!(cell(None), "NULL");
    assert_eq!(cell(Some(&json!(null))), "NULL");
    assert_eq!(cell(Some(&json!("UKR"))), "UKR");
    assert_eq!(cell(Some(&json!(190))), "190");
    assert_eq!(cell(Some(&json!(true))), "true");
}
