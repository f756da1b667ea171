//! Shared domain types: source tables, subset descriptors, cost estimates and
//! the typed results returned by every lifecycle operation.

use chrono::{DateTime, Duration, Utc};
use quarry_error::{closest_match, ErrorCode, ErrorContext, QuarryError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::warnings::StaleStateWarning;

/// The fixed set of remote tables subsets can be derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceTable {
    Events,
    EventMentions,
    Gkg,
    CloudVision,
}

impl SourceTable {
    pub const ALL: [SourceTable; 4] = [
        SourceTable::Events,
        SourceTable::EventMentions,
        SourceTable::Gkg,
        SourceTable::CloudVision,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTable::Events => "events",
            SourceTable::EventMentions => "eventmentions",
            SourceTable::Gkg => "gkg",
            SourceTable::CloudVision => "cloudvision",
        }
    }

    /// Fully qualified `project.dataset.table` of the partitioned source.
    pub fn qualified_name(&self) -> &'static str {
        match self {
            SourceTable::Events => "gdelt-bq.gdeltv2.events_partitioned",
            SourceTable::EventMentions => "gdelt-bq.gdeltv2.eventmentions_partitioned",
            SourceTable::Gkg => "gdelt-bq.gdeltv2.gkg_partitioned",
            SourceTable::CloudVision => "gdelt-bq.gdeltv2.cloudvision_partitioned",
        }
    }

    /// Columns whose bounds qualify as a date predicate.
    pub fn temporal_columns(&self) -> &'static [&'static str] {
        match self {
            SourceTable::Events => &["SQLDATE"],
            SourceTable::EventMentions => &["EventTimeDate", "MentionTimeDate"],
            SourceTable::Gkg => &["DATE"],
            SourceTable::CloudVision => &["timestamp"],
        }
    }

    /// Example bound shown in hints.
    pub fn example_bound(&self) -> &'static str {
        match self {
            SourceTable::Events => "SQLDATE >= 20250101",
            SourceTable::EventMentions => "MentionTimeDate >= 20250101000000",
            SourceTable::Gkg => "DATE >= 20250101000000",
            SourceTable::CloudVision => "timestamp >= 20250101000000",
        }
    }
}

impl fmt::Display for SourceTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceTable {
    type Err = QuarryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        if let Some(table) = Self::ALL.iter().find(|t| t.as_str() == needle) {
            return Ok(*table);
        }

        let names: Vec<&str> = Self::ALL.iter().map(|t| t.as_str()).collect();
        let mut err = QuarryError::new(
            ErrorCode::UnknownSourceTable,
            format!("Unknown source table '{}'", s),
        )
        .with_context(ErrorContext::InvalidInput {
            field: "source_table".to_string(),
            value: s.to_string(),
            allowed: names.iter().map(|n| n.to_string()).collect(),
        });
        if let Some(closest) = closest_match(&needle, &names) {
            err = err.with_hint(format!("Did you mean '{}'?", closest));
        }
        Err(err)
    }
}

/// A physical table in the engine, `project.dataset.table`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    pub project: String,
    pub dataset: String,
    pub table: String,
}

impl TableRef {
    pub fn new(
        project: impl Into<String>,
        dataset: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            dataset: dataset.into(),
            table: table.into(),
        }
    }

    /// Backtick-quoted form for use in SQL text.
    pub fn quoted(&self) -> String {
        format!("`{}`", self)
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.project, self.dataset, self.table)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubsetStatus {
    Pending,
    Ready,
    Expired,
    Deleted,
    Error,
}

impl SubsetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubsetStatus::Pending => "PENDING",
            SubsetStatus::Ready => "READY",
            SubsetStatus::Expired => "EXPIRED",
            SubsetStatus::Deleted => "DELETED",
            SubsetStatus::Error => "ERROR",
        }
    }

    /// Monotonic transitions. Any status may be tombstoned as DELETED; nothing
    /// leaves EXPIRED, DELETED or ERROR except by deletion.
    pub fn can_transition_to(&self, next: SubsetStatus) -> bool {
        use SubsetStatus::*;
        matches!(
            (self, next),
            (Pending, Pending)
                | (Pending, Ready)
                | (Pending, Error)
                | (Ready, Ready)
                | (Ready, Expired)
                | (_, Deleted)
        ) && *self != Deleted
    }
}

impl fmt::Display for SubsetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubsetStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(SubsetStatus::Pending),
            "READY" => Ok(SubsetStatus::Ready),
            "EXPIRED" => Ok(SubsetStatus::Expired),
            "DELETED" => Ok(SubsetStatus::Deleted),
            "ERROR" => Ok(SubsetStatus::Error),
            other => Err(format!("Unknown subset status: {}", other)),
        }
    }
}

/// Registry record for one subset, keyed by `(owner, name)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubsetDescriptor {
    pub name: String,
    pub source_table: SourceTable,
    pub where_clause: String,
    /// Ordered projection; `["*"]` selects every column.
    pub select_fields: Vec<String>,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub ttl_hours: u32,
    pub size_bytes: Option<u64>,
    pub row_count: Option<u64>,
    pub status: SubsetStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl SubsetDescriptor {
    /// A fresh PENDING record. `created_at` must already be truncated to the
    /// precision the engine stores expirations with.
    pub fn pending(
        name: impl Into<String>,
        source_table: SourceTable,
        where_clause: impl Into<String>,
        select_fields: Vec<String>,
        description: impl Into<String>,
        ttl_hours: u32,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            source_table,
            where_clause: where_clause.into(),
            select_fields,
            description: description.into(),
            created_at,
            expires_at: created_at + Duration::hours(i64::from(ttl_hours)),
            ttl_hours,
            size_bytes: None,
            row_count: None,
            status: SubsetStatus::Pending,
            error_message: None,
            updated_at: created_at,
        }
    }

    pub fn is_past_expiry(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Whether this record still claims its name.
    pub fn is_live(&self, now: DateTime<Utc>, pending_timeout: Duration) -> bool {
        match self.status {
            SubsetStatus::Ready => !self.is_past_expiry(now),
            SubsetStatus::Pending => now - self.created_at < pending_timeout,
            _ => false,
        }
    }

    pub fn hours_remaining(&self, now: DateTime<Utc>) -> f64 {
        let secs = (self.expires_at - now).num_seconds().max(0);
        (secs as f64 / 3600.0 * 10.0).round() / 10.0
    }

    pub fn provenance(&self, owner: &str) -> Provenance {
        Provenance {
            schema_version: PROVENANCE_VERSION,
            owner: owner.to_string(),
            name: self.name.clone(),
            source_table: self.source_table,
            where_clause: self.where_clause.clone(),
            select_fields: self.select_fields.clone(),
            description: self.description.clone(),
            created_at: self.created_at,
            ttl_hours: self.ttl_hours,
        }
    }
}

pub const PROVENANCE_VERSION: u32 = 1;

/// Creation metadata embedded in the physical table's description so a table
/// orphaned by a crash can be adopted with full fidelity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub schema_version: u32,
    pub owner: String,
    pub name: String,
    pub source_table: SourceTable,
    pub where_clause: String,
    pub select_fields: Vec<String>,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub ttl_hours: u32,
}

impl Provenance {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn parse(text: &str) -> Option<Self> {
        serde_json::from_str::<Provenance>(text)
            .ok()
            .filter(|p| p.schema_version == PROVENANCE_VERSION)
    }

    /// Rebuild a READY descriptor from an adopted table.
    pub fn into_descriptor(
        self,
        expires_at: DateTime<Utc>,
        size_bytes: Option<u64>,
        row_count: Option<u64>,
        now: DateTime<Utc>,
    ) -> SubsetDescriptor {
        SubsetDescriptor {
            name: self.name,
            source_table: self.source_table,
            where_clause: self.where_clause,
            select_fields: self.select_fields,
            description: self.description,
            created_at: self.created_at,
            expires_at,
            ttl_hours: self.ttl_hours,
            size_bytes,
            row_count,
            status: SubsetStatus::Ready,
            error_message: None,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostTier {
    Low,
    Moderate,
    High,
}

impl CostTier {
    pub fn advisory(&self) -> &'static str {
        match self {
            CostTier::High => "High cost query. Consider narrowing the date range or creating a subset.",
            CostTier::Moderate => "Moderate cost. Proceed with care.",
            CostTier::Low => "Low cost query.",
        }
    }
}

impl fmt::Display for CostTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CostTier::Low => "low",
            CostTier::Moderate => "moderate",
            CostTier::High => "high",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostEstimate {
    pub bytes_scanned: u64,
    pub gb_processed: f64,
    pub estimated_cost_usd: f64,
    pub over_threshold: bool,
    pub tier: CostTier,
    pub advisory: String,
}

// --- Operation requests ---

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateSubsetRequest {
    pub name: String,
    pub source_table: String,
    pub where_clause: String,
    #[serde(default)]
    pub select_fields: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub ttl_hours: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuerySubsetRequest {
    pub name: String,
    #[serde(default)]
    pub where_clause: Option<String>,
    #[serde(default)]
    pub select_fields: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EstimateRequest {
    pub source_table: String,
    #[serde(default)]
    pub where_clause: Option<String>,
    #[serde(default)]
    pub select_fields: Option<String>,
}

// --- Operation results ---

/// A descriptor together with the physical table backing it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubsetView {
    #[serde(flatten)]
    pub descriptor: SubsetDescriptor,
    pub table: String,
    /// Rounded to a tenth; zero once expired.
    pub expires_in_hours: f64,
    pub is_expired: bool,
}

impl SubsetView {
    pub fn new(descriptor: SubsetDescriptor, table: String, now: DateTime<Utc>) -> Self {
        Self {
            expires_in_hours: descriptor.hours_remaining(now),
            is_expired: descriptor.is_past_expiry(now),
            descriptor,
            table,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSubsetResult {
    pub subset: SubsetView,
    pub estimate: CostEstimate,
}

/// A table in the subset dataset that no registry row accounts for and that
/// could not be adopted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnmanagedTable {
    pub table: String,
    pub created_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListSubsetsResult {
    pub owner: String,
    pub subsets: Vec<SubsetView>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<StaleStateWarning>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unmanaged: Vec<UnmanagedTable>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuerySubsetResult {
    pub name: String,
    pub table: String,
    pub expires_in_hours: f64,
    pub sql: String,
    pub limit: u32,
    pub columns: Vec<String>,
    pub rows: Vec<serde_json::Map<String, serde_json::Value>>,
    pub row_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimate: Option<CostEstimate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtendSubsetResult {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub previous_expires_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub ttl_hours: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeleteOutcome {
    Dropped,
    AlreadyAbsent,
    /// The drop failed; a tombstone keeps the name until a later `list` clears it.
    Deferred { reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteSubsetResult {
    pub name: String,
    pub table: String,
    #[serde(flatten)]
    pub outcome: DeleteOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimateResult {
    pub source_table: SourceTable,
    pub sql: String,
    #[serde(flatten)]
    pub estimate: CostEstimate,
}
