#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use quarry_common::config::AppConfig;
use quarry_common::TableRef;
use quarry_connectors::{
    DropOutcome, EngineError, FetchedRows, MaterializeRequest, MaterializedTable, QueryEngine,
    RemoteTable,
};
use quarry_metadata::sqlite::SqliteRegistry;
use quarry_metadata::SubsetRegistry;
use quarry_runtime::{Clock, SubsetManager};
use serde_json::{json, Map, Value};

pub const PROJECT: &str = "test-proj";
pub const DATASET: &str = "quarry_subsets";

/// What the fake engine holds and how it should misbehave.
#[derive(Default)]
pub struct FakeState {
    pub tables: BTreeMap<String, RemoteTable>,
    pub calls: Vec<&'static str>,
    pub statements: Vec<String>,
    pub dry_run_bytes: u64,
    pub rows_available: usize,
    pub fail_materialize: Option<String>,
    pub fail_drop: bool,
}

/// In-memory engine recording every call.
#[derive(Default)]
pub struct FakeEngine {
    pub state: Mutex<FakeState>,
}

impl FakeEngine {
    pub fn calls(&self) -> Vec<&'static str> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn statements(&self) -> Vec<String> {
        self.state.lock().unwrap().statements.clone()
    }

    pub fn has_table(&self, table_id: &str) -> bool {
        self.state.lock().unwrap().tables.contains_key(table_id)
    }

    pub fn table(&self, table_id: &str) -> Option<RemoteTable> {
        self.state.lock().unwrap().tables.get(table_id).cloned()
    }

    pub fn remove_table(&self, table_id: &str) {
        self.state.lock().unwrap().tables.remove(table_id);
    }

    pub fn insert_table(&self, table: RemoteTable) {
        self.state
            .lock()
            .unwrap()
            .tables
            .insert(table.table.table.clone(), table);
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    fn record(&self, call: &'static str, sql: Option<&str>) {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        if let Some(sql) = sql {
            state.statements.push(sql.to_string());
        }
    }
}

pub fn remote_table(table_id: &str) -> RemoteTable {
    RemoteTable {
        table: TableRef::new(PROJECT, DATASET, table_id),
        created_at: None,
        expires_at: None,
        size_bytes: None,
        row_count: None,
        description: None,
    }
}

#[async_trait]
impl QueryEngine for FakeEngine {
    fn subset_table(&self, table_id: &str) -> TableRef {
        TableRef::new(PROJECT, DATASET, table_id)
    }

    async fn dry_run(&self, sql: &str) -> Result<u64, EngineError> {
        self.record("dry_run", Some(sql));
        Ok(self.state.lock().unwrap().dry_run_bytes)
    }

    async fn execute_and_fetch(&self, sql: &str, limit: u32) -> Result<FetchedRows, EngineError> {
        self.record("execute_and_fetch", Some(sql));
        let state = self.state.lock().unwrap();
        let dataset_prefix = format!("`{}.{}.", PROJECT, DATASET);
        let references_known = state
            .tables
            .values()
            .any(|t| sql.contains(&t.table.quoted()));
        if sql.contains(&dataset_prefix) && !references_known {
            return Err(EngineError::Rejected {
                operation: "execute_and_fetch",
                status: 404,
                message: "Not found: Table".to_string(),
            });
        }
        let rows: Vec<Map<String, Value>> = (0..state.rows_available.min(limit as usize))
            .map(|i| {
                let mut row = Map::new();
                row.insert("n".to_string(), json!(i));
                row
            })
            .collect();
        Ok(FetchedRows {
            columns: vec!["n".to_string()],
            total_rows: Some(rows.len() as u64),
            rows,
        })
    }

    async fn materialize(
        &self,
        request: &MaterializeRequest,
    ) -> Result<MaterializedTable, EngineError> {
        self.record("materialize", Some(&request.sql));
        let mut state = self.state.lock().unwrap();
        if let Some(message) = state.fail_materialize.clone() {
            return Err(EngineError::Rejected {
                operation: "materialize",
                status: 400,
                message,
            });
        }
        state.tables.insert(
            request.table.table.clone(),
            RemoteTable {
                table: request.table.clone(),
                created_at: Some(Utc::now()),
                expires_at: Some(request.expires_at),
                size_bytes: Some(4096),
                row_count: Some(120),
                description: None,
            },
        );
        Ok(MaterializedTable {
            size_bytes: 4096,
            row_count: 120,
        })
    }

    async fn describe_table(&self, table: &TableRef) -> Result<Option<RemoteTable>, EngineError> {
        self.record("describe_table", None);
        Ok(self.state.lock().unwrap().tables.get(&table.table).cloned())
    }

    async fn set_expiration(
        &self,
        table: &TableRef,
        expires_at: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        self.record("set_expiration", None);
        let mut state = self.state.lock().unwrap();
        match state.tables.get_mut(&table.table) {
            Some(t) => {
                t.expires_at = Some(expires_at);
                Ok(())
            }
            None => Err(EngineError::NotFound {
                operation: "set_expiration",
                table: table.to_string(),
            }),
        }
    }

    async fn drop_table(&self, table: &TableRef) -> Result<DropOutcome, EngineError> {
        self.record("drop_table", None);
        let mut state = self.state.lock().unwrap();
        if state.fail_drop {
            return Err(EngineError::Unavailable {
                operation: "drop",
                message: "HTTP 503: backend error".to_string(),
            });
        }
        Ok(match state.tables.remove(&table.table) {
            Some(_) => DropOutcome::Dropped,
            None => DropOutcome::AlreadyAbsent,
        })
    }

    async fn list_tables(&self) -> Result<Vec<RemoteTable>, EngineError> {
        self.record("list_tables", None);
        let state = self.state.lock().unwrap();
        Ok(state
            .tables
            .values()
            .map(|t| RemoteTable {
                description: None,
                size_bytes: None,
                row_count: None,
                ..t.clone()
            })
            .collect())
    }

    async fn ensure_dataset(&self) -> Result<(), EngineError> {
        self.record("ensure_dataset", None);
        Ok(())
    }
}

/// Manually advanced clock.
pub struct FixedClock(Mutex<DateTime<Utc>>);

impl FixedClock {
    pub fn advance(&self, by: Duration) {
        let mut now = self.0.lock().unwrap();
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

/// 2025-02-01 10:00:00.250 UTC; the sub-second part checks truncation.
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 2, 1, 10, 0, 0).unwrap() + Duration::milliseconds(250)
}

pub struct Harness {
    pub engine: Arc<FakeEngine>,
    pub registry: Arc<SqliteRegistry>,
    pub clock: Arc<FixedClock>,
    pub manager: SubsetManager,
}

pub async fn harness() -> Harness {
    harness_with(AppConfig::default()).await
}

pub async fn harness_with(config: AppConfig) -> Harness {
    let engine = Arc::new(FakeEngine::default());
    let registry = Arc::new(SqliteRegistry::in_memory().unwrap());
    registry.init().await.unwrap();
    let clock = Arc::new(FixedClock(Mutex::new(start_time())));

    let manager = SubsetManager::new(
        engine.clone() as Arc<dyn QueryEngine>,
        registry.clone() as Arc<dyn SubsetRegistry>,
        &config,
    )
    .with_clock(clock.clone() as Arc<dyn Clock>);

    Harness {
        engine,
        registry,
        clock,
        manager,
    }
}
