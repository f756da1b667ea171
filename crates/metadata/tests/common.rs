use chrono::{DateTime, TimeZone, Utc};
use quarry_common::{SourceTable, SubsetDescriptor};

pub fn created() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 2, 1, 9, 30, 0).unwrap()
}

pub fn descriptor(name: &str) -> SubsetDescriptor {
    SubsetDescriptor::pending(
        name,
        SourceTable::Events,
        "SQLDATE >= 20250101 AND SQLDATE < 20250201 AND Actor1CountryCode = 'UKR'",
        vec!["SQLDATE".to_string(), "EventCode".to_string()],
        "Ukraine, January",
        48,
        created(),
    )
}
