use super::record::{format_ts, parse_ts, to_i64, to_u64, CorruptRecord, StoredText};
use super::SubsetRegistry;
use anyhow::{Context, Result};
use futures::future::BoxFuture;
use quarry_common::SubsetDescriptor;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};

pub struct SqliteRegistry {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRegistry {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).context("Failed to create registry directory")?;
            }
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open SQLite registry at {}", path.display()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Registry that lives only as long as this value. Used by tests.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory SQLite")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

const SELECT_COLUMNS: &str = "name, source_table, where_clause, select_fields, description, \
     created_at, expires_at, ttl_hours, size_bytes, row_count, status, error_message, updated_at";

/// Raw row, read inside rusqlite's closure and decoded afterwards.
struct SqliteRow {
    name: String,
    source_table: String,
    where_clause: String,
    select_fields: String,
    description: String,
    created_at: String,
    expires_at: String,
    ttl_hours: u32,
    size_bytes: Option<i64>,
    row_count: Option<i64>,
    status: String,
    error_message: Option<String>,
    updated_at: String,
}

impl SqliteRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            name: row.get("name")?,
            source_table: row.get("source_table")?,
            where_clause: row.get("where_clause")?,
            select_fields: row.get("select_fields")?,
            description: row.get("description")?,
            created_at: row.get("created_at")?,
            expires_at: row.get("expires_at")?,
            ttl_hours: row.get("ttl_hours")?,
            size_bytes: row.get("size_bytes")?,
            row_count: row.get("row_count")?,
            status: row.get("status")?,
            error_message: row.get("error_message")?,
            updated_at: row.get("updated_at")?,
        })
    }

    fn into_descriptor(self, owner: &str) -> Result<SubsetDescriptor, CorruptRecord> {
        let name = self.name;
        let select_fields =
            serde_json::from_str(&self.select_fields).map_err(|e| CorruptRecord {
                owner: owner.to_string(),
                name: name.clone(),
                reason: format!("select_fields: {}", e),
            })?;
        let (source_table, select_fields, status) = StoredText {
            source_table: self.source_table,
            select_fields,
            status: self.status,
        }
        .decode(owner, &name)?;

        Ok(SubsetDescriptor {
            source_table,
            where_clause: self.where_clause,
            select_fields,
            description: self.description,
            created_at: parse_ts(owner, &name, "created_at", &self.created_at)?,
            expires_at: parse_ts(owner, &name, "expires_at", &self.expires_at)?,
            ttl_hours: self.ttl_hours,
            size_bytes: to_u64(self.size_bytes),
            row_count: to_u64(self.row_count),
            status,
            error_message: self.error_message,
            updated_at: parse_ts(owner, &name, "updated_at", &self.updated_at)?,
            name,
        })
    }
}

impl SubsetRegistry for SqliteRegistry {
    fn init(&self) -> BoxFuture<'_, Result<()>> {
        let conn = self.conn.clone();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || {
                let conn = conn.lock().expect("SQLite connection lock poisoned");
                let schema_v1 = include_str!("../migrations/sqlite/001_subsets.sql");
                conn.execute_batch(schema_v1)
                    .context("Failed to execute registry schema")?;
                Ok(())
            })
            .await?
        })
    }

    fn put<'a>(
        &'a self,
        owner: &'a str,
        name: &'a str,
        descriptor: &'a SubsetDescriptor,
    ) -> BoxFuture<'a, Result<()>> {
        let conn = self.conn.clone();
        let owner = owner.to_string();
        let name = name.to_string();
        let d = descriptor.clone();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || {
                let conn = conn.lock().expect("SQLite connection lock poisoned");
                let text = StoredText::from_descriptor(&d);
                conn.execute(
                    "INSERT INTO subsets (owner, name, source_table, where_clause, select_fields, description,
                                          created_at, expires_at, ttl_hours, size_bytes, row_count, status,
                                          error_message, updated_at)
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                     ON CONFLICT (owner, name) DO UPDATE SET
                        source_table=excluded.source_table, where_clause=excluded.where_clause,
                        select_fields=excluded.select_fields, description=excluded.description,
                        created_at=excluded.created_at, expires_at=excluded.expires_at,
                        ttl_hours=excluded.ttl_hours, size_bytes=excluded.size_bytes,
                        row_count=excluded.row_count, status=excluded.status,
                        error_message=excluded.error_message, updated_at=excluded.updated_at",
                    params![
                        owner,
                        name,
                        text.source_table,
                        d.where_clause,
                        text.select_fields.to_string(),
                        d.description,
                        format_ts(&d.created_at),
                        format_ts(&d.expires_at),
                        d.ttl_hours,
                        to_i64(d.size_bytes),
                        to_i64(d.row_count),
                        text.status,
                        d.error_message,
                        format_ts(&d.updated_at),
                    ],
                )
                .with_context(|| format!("Failed to write subset {}/{}", owner, name))?;
                Ok(())
            })
            .await?
        })
    }

    fn get<'a>(
        &'a self,
        owner: &'a str,
        name: &'a str,
    ) -> BoxFuture<'a, Result<Option<SubsetDescriptor>>> {
        let conn = self.conn.clone();
        let owner = owner.to_string();
        let name = name.to_string();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || {
                let conn = conn.lock().expect("SQLite connection lock poisoned");
                let sql = format!(
                    "SELECT {} FROM subsets WHERE owner = ? AND name = ?",
                    SELECT_COLUMNS
                );
                let row = conn
                    .query_row(&sql, params![owner, name], SqliteRow::read)
                    .optional()
                    .with_context(|| format!("Failed to read subset {}/{}", owner, name))?;
                match row {
                    Some(row) => Ok(Some(row.into_descriptor(&owner)?)),
                    None => Ok(None),
                }
            })
            .await?
        })
    }

    fn list<'a>(&'a self, owner: &'a str) -> BoxFuture<'a, Result<Vec<SubsetDescriptor>>> {
        let conn = self.conn.clone();
        let owner = owner.to_string();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || {
                let conn = conn.lock().expect("SQLite connection lock poisoned");
                let sql = format!(
                    "SELECT {} FROM subsets WHERE owner = ? ORDER BY created_at, name",
                    SELECT_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params![owner], SqliteRow::read)?;

                let mut descriptors = Vec::new();
                for row in rows {
                    descriptors.push(row?.into_descriptor(&owner)?);
                }
                Ok(descriptors)
            })
            .await?
        })
    }

    fn delete<'a>(&'a self, owner: &'a str, name: &'a str) -> BoxFuture<'a, Result<bool>> {
        let conn = self.conn.clone();
        let owner = owner.to_string();
        let name = name.to_string();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || {
                let conn = conn.lock().expect("SQLite connection lock poisoned");
                let removed = conn
                    .execute(
                        "DELETE FROM subsets WHERE owner = ? AND name = ?",
                        params![owner, name],
                    )
                    .with_context(|| format!("Failed to delete subset {}/{}", owner, name))?;
                Ok(removed > 0)
            })
            .await?
        })
    }
}
