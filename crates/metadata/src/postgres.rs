use super::record::{to_i64, to_u64, CorruptRecord, StoredText};
use super::SubsetRegistry;
use anyhow::{Context, Result};
use futures::future::BoxFuture;
use quarry_common::SubsetDescriptor;
use tokio_postgres::{Client, NoTls, Row};

pub struct PostgresRegistry {
    client: Client,
}

impl PostgresRegistry {
    pub async fn new(db_url: &str) -> Result<Self> {
        let (client, connection) = tokio_postgres::connect(db_url, NoTls)
            .await
            .context("Failed to connect to registry database")?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(error = %e, "registry connection error");
            }
        });

        Ok(Self { client })
    }
}

const SELECT_COLUMNS: &str = "name, source_table, where_clause, select_fields, description, \
     created_at, expires_at, ttl_hours, size_bytes, row_count, status, error_message, updated_at";

fn descriptor_from_row(owner: &str, row: &Row) -> Result<SubsetDescriptor, CorruptRecord> {
    let name: String = row.get("name");
    let (source_table, select_fields, status) = StoredText {
        source_table: row.get("source_table"),
        select_fields: row.get("select_fields"),
        status: row.get("status"),
    }
    .decode(owner, &name)?;

    let ttl_hours: i32 = row.get("ttl_hours");
    let ttl_hours = u32::try_from(ttl_hours).map_err(|_| CorruptRecord {
        owner: owner.to_string(),
        name: name.clone(),
        reason: format!("ttl_hours {}", ttl_hours),
    })?;

    Ok(SubsetDescriptor {
        source_table,
        where_clause: row.get("where_clause"),
        select_fields,
        description: row.get("description"),
        created_at: row.get("created_at"),
        expires_at: row.get("expires_at"),
        ttl_hours,
        size_bytes: to_u64(row.get("size_bytes")),
        row_count: to_u64(row.get("row_count")),
        status,
        error_message: row.get("error_message"),
        updated_at: row.get("updated_at"),
        name,
    })
}

impl SubsetRegistry for PostgresRegistry {
    fn init(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let schema_v1 = include_str!("../migrations/postgres/001_subsets.sql");
            self.client
                .batch_execute(schema_v1)
                .await
                .context("Failed to execute registry schema")?;
            Ok(())
        })
    }

    fn put<'a>(
        &'a self,
        owner: &'a str,
        name: &'a str,
        descriptor: &'a SubsetDescriptor,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let d = descriptor;
            let text = StoredText::from_descriptor(d);
            let ttl_hours = i32::try_from(d.ttl_hours).context("ttl_hours out of range")?;
            self.client
                .execute(
                    "INSERT INTO subsets (owner, name, source_table, where_clause, select_fields, description,
                                          created_at, expires_at, ttl_hours, size_bytes, row_count, status,
                                          error_message, updated_at)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
                     ON CONFLICT (owner, name) DO UPDATE SET
                        source_table = EXCLUDED.source_table, where_clause = EXCLUDED.where_clause,
                        select_fields = EXCLUDED.select_fields, description = EXCLUDED.description,
                        created_at = EXCLUDED.created_at, expires_at = EXCLUDED.expires_at,
                        ttl_hours = EXCLUDED.ttl_hours, size_bytes = EXCLUDED.size_bytes,
                        row_count = EXCLUDED.row_count, status = EXCLUDED.status,
                        error_message = EXCLUDED.error_message, updated_at = EXCLUDED.updated_at",
                    &[
                        &owner,
                        &name,
                        &text.source_table,
                        &d.where_clause,
                        &text.select_fields,
                        &d.description,
                        &d.created_at,
                        &d.expires_at,
                        &ttl_hours,
                        &to_i64(d.size_bytes),
                        &to_i64(d.row_count),
                        &text.status,
                        &d.error_message,
                        &d.updated_at,
                    ],
                )
                .await
                .with_context(|| format!("Failed to write subset {}/{}", owner, name))?;
            Ok(())
        })
    }

    fn get<'a>(
        &'a self,
        owner: &'a str,
        name: &'a str,
    ) -> BoxFuture<'a, Result<Option<SubsetDescriptor>>> {
        Box::pin(async move {
            let sql = format!(
                "SELECT {} FROM subsets WHERE owner = $1 AND name = $2",
                SELECT_COLUMNS
            );
            let row = self
                .client
                .query_opt(&sql, &[&owner, &name])
                .await
                .with_context(|| format!("Failed to read subset {}/{}", owner, name))?;
            match row {
                Some(row) => Ok(Some(descriptor_from_row(owner, &row)?)),
                None => Ok(None),
            }
        })
    }

    fn list<'a>(&'a self, owner: &'a str) -> BoxFuture<'a, Result<Vec<SubsetDescriptor>>> {
        Box::pin(async move {
            let sql = format!(
                "SELECT {} FROM subsets WHERE owner = $1 ORDER BY created_at, name",
                SELECT_COLUMNS
            );
            let rows = self
                .client
                .query(&sql, &[&owner])
                .await
                .context("Failed to list subsets")?;

            let mut descriptors = Vec::with_capacity(rows.len());
            for row in &rows {
                descriptors.push(descriptor_from_row(owner, row)?);
            }
            Ok(descriptors)
        })
    }

    fn delete<'a>(&'a self, owner: &'a str, name: &'a str) -> BoxFuture<'a, Result<bool>> {
        Box::pin(async move {
            let removed = self
                .client
                .execute(
                    "DELETE FROM subsets WHERE owner = $1 AND name = $2",
                    &[&owner, &name],
                )
                .await
                .with_context(|| format!("Failed to delete subset {}/{}", owner, name))?;
            Ok(removed > 0)
        })
    }
}
