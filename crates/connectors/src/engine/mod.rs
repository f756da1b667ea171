//! Engine abstraction used by the lifecycle manager.
//!
//! Every method performs one logical remote operation and surfaces failures
//! immediately; nothing here retries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quarry_common::TableRef;
use serde::{Deserialize, Serialize};

pub mod error;

use error::EngineError;

/// Rows returned by `execute_and_fetch`, already decoded to JSON values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchedRows {
    pub columns: Vec<String>,
    pub rows: Vec<serde_json::Map<String, serde_json::Value>>,
    pub total_rows: Option<u64>,
}

/// A replace-in-place table creation. `sql` is the complete DDL statement and
/// carries the engine-native expiration.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterializeRequest {
    pub table: TableRef,
    pub sql: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterializedTable {
    pub size_bytes: u64,
    pub row_count: u64,
}

/// Engine-side view of a table. Listing fills only identity and timestamps;
/// `describe_table` fills everything the engine reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteTable {
    pub table: TableRef,
    pub created_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub size_bytes: Option<u64>,
    pub row_count: Option<u64>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropOutcome {
    Dropped,
    AlreadyAbsent,
}

#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Table reference for `table_id` inside the subset dataset.
    fn subset_table(&self, table_id: &str) -> TableRef;

    /// Bytes the statement would scan, without executing or billing it.
    async fn dry_run(&self, sql: &str) -> Result<u64, EngineError>;

    /// Executes a SELECT and returns at most `limit` rows.
    async fn execute_and_fetch(&self, sql: &str, limit: u32) -> Result<FetchedRows, EngineError>;

    /// Runs a materializing statement and reports the resulting table's size.
    async fn materialize(
        &self,
        request: &MaterializeRequest,
    ) -> Result<MaterializedTable, EngineError>;

    /// `None` when the table does not exist.
    async fn describe_table(&self, table: &TableRef) -> Result<Option<RemoteTable>, EngineError>;

    async fn exists(&self, table: &TableRef) -> Result<bool, EngineError> {
        Ok(self.describe_table(table).await?.is_some())
    }

    /// Rewrites the engine-native expiration. Fails with `EngineError::NotFound`
    /// when the table has already been reclaimed.
    async fn set_expiration(
        &self,
        table: &TableRef,
        expires_at: DateTime<Utc>,
    ) -> Result<(), EngineError>;

    /// Drops a table; an absent table is reported, not raised.
    async fn drop_table(&self, table: &TableRef) -> Result<DropOutcome, EngineError>;

    /// Tables currently present in the subset dataset.
    async fn list_tables(&self) -> Result<Vec<RemoteTable>, EngineError>;

    /// Creates the subset dataset if it does not exist yet.
    async fn ensure_dataset(&self) -> Result<(), EngineError>;
}
