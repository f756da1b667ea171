use chrono::{DateTime, SecondsFormat, Utc};
use quarry_common::{SourceTable, SubsetDescriptor, SubsetStatus};

/// A stored row that cannot be turned back into a descriptor.
#[derive(Debug, thiserror::Error)]
#[error("corrupt registry record {owner}/{name}: {reason}")]
pub struct CorruptRecord {
    pub owner: String,
    pub name: String,
    pub reason: String,
}

/// Column values as both backends store the textual parts of a record.
pub(crate) struct StoredText {
    pub source_table: String,
    pub select_fields: serde_json::Value,
    pub status: String,
}

impl StoredText {
    pub fn from_descriptor(descriptor: &SubsetDescriptor) -> Self {
        Self {
            source_table: descriptor.source_table.as_str().to_string(),
            select_fields: serde_json::Value::from(descriptor.select_fields.clone()),
            status: descriptor.status.as_str().to_string(),
        }
    }

    pub fn decode(
        self,
        owner: &str,
        name: &str,
    ) -> Result<(SourceTable, Vec<String>, SubsetStatus), CorruptRecord> {
        let corrupt = |reason: String| CorruptRecord {
            owner: owner.to_string(),
            name: name.to_string(),
            reason,
        };
        let source_table = self
            .source_table
            .parse::<SourceTable>()
            .map_err(|e| corrupt(e.message))?;
        let select_fields: Vec<String> = serde_json::from_value(self.select_fields)
            .map_err(|e| corrupt(format!("select_fields: {}", e)))?;
        let status = self.status.parse::<SubsetStatus>().map_err(corrupt)?;
        Ok((source_table, select_fields, status))
    }
}

pub(crate) fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn parse_ts(
    owner: &str,
    name: &str,
    column: &str,
    value: &str,
) -> Result<DateTime<Utc>, CorruptRecord> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CorruptRecord {
            owner: owner.to_string(),
            name: name.to_string(),
            reason: format!("{} '{}': {}", column, value, e),
        })
}

/// Engine statistics fit in i64 columns; anything negative is treated as unknown.
pub(crate) fn to_i64(v: Option<u64>) -> Option<i64> {
    v.and_then(|n| i64::try_from(n).ok())
}

pub(crate) fn to_u64(v: Option<i64>) -> Option<u64> {
    v.and_then(|n| u64::try_from(n).ok())
}
