//! Shared formatting helpers for human output.

use chrono::{DateTime, Utc};
use owo_colors::OwoColorize;
use quarry_common::models::CostTier;
use quarry_common::SubsetStatus;
use serde_json::Value;

const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

pub fn human_bytes(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// Status padded to `width` before colouring so columns stay aligned.
pub fn paint_status(status: SubsetStatus, width: usize) -> String {
    let padded = format!("{:<width$}", status.as_str(), width = width);
    match status {
        SubsetStatus::Ready => padded.green().to_string(),
        SubsetStatus::Pending => padded.yellow().to_string(),
        SubsetStatus::Error => padded.red().to_string(),
        SubsetStatus::Expired | SubsetStatus::Deleted => padded.dimmed().to_string(),
    }
}

pub fn paint_tier(tier: CostTier) -> String {
    let label = tier.to_string();
    match tier {
        CostTier::Low => label.green().to_string(),
        CostTier::Moderate => label.yellow().to_string(),
        CostTier::High => label.red().bold().to_string(),
    }
}

/// "in 47.5h", "expired 2.0h ago"
pub fn expiry_hint(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let hours = (expires_at - now).num_minutes() as f64 / 60.0;
    if hours >= 0.0 {
        format!("in {:.1}h", hours)
    } else {
        format!("expired {:.1}h ago", -hours)
    }
}

pub fn format_ts(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M UTC").to_string()
}

/// Renders a result cell; strings unquoted, nulls as `NULL`.
pub fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "NULL".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
