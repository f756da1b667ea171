//! SQL text synthesis for the three statement shapes Quarry issues:
//! a direct SELECT against a source table (estimates), the materializing
//! `CREATE OR REPLACE TABLE ... AS SELECT` for subset creation, and the
//! bounded SELECT against a subset table.
//!
//! Inputs are validated here; nothing is executed.

use chrono::{DateTime, Utc};
use quarry_common::{SourceTable, TableRef};

use crate::predicate::validate_predicate;
use crate::sql_generator::{escape_string_literal, render_field_list, SqlGenError};
use crate::temporal::{partition_filter, require_date_bound};

pub const DEFAULT_LIMIT: u32 = 100;
pub const MAX_LIMIT: u32 = 10_000;

/// Clamps a requested row limit into `[1, MAX_LIMIT]`. Absent means
/// `DEFAULT_LIMIT`; zero and negative values become 1.
pub fn clamp_limit(requested: Option<i64>) -> u32 {
    match requested {
        None => DEFAULT_LIMIT,
        Some(n) if n < 1 => 1,
        Some(n) => n.min(i64::from(MAX_LIMIT)) as u32,
    }
}

/// Builds the WHERE body for a source-table read, prepending a partition
/// pruning conjunct when a lower bound can be derived.
fn source_where(source_table: SourceTable, where_clause: &str) -> String {
    match partition_filter(source_table, where_clause) {
        Some(pf) => format!("{} AND ({})", pf, where_clause),
        None => format!("({})", where_clause),
    }
}

/// SELECT against a source table, used for cost estimates. The filter is optional.
pub fn source_select(
    source_table: SourceTable,
    fields: &[String],
    where_clause: Option<&str>,
) -> Result<String, SqlGenError> {
    let mut sql = format!(
        "SELECT {} FROM `{}`",
        render_field_list(fields),
        source_table.qualified_name()
    );
    if let Some(w) = where_clause.filter(|w| !w.trim().is_empty()) {
        validate_predicate(w)?;
        sql.push_str(" WHERE ");
        sql.push_str(&source_where(source_table, w));
    }
    Ok(sql)
}

/// The SELECT a subset is materialized from. Requires a date-bounded filter.
pub fn materialize_select(
    source_table: SourceTable,
    fields: &[String],
    where_clause: &str,
) -> Result<String, SqlGenError> {
    require_date_bound(source_table, where_clause)?;
    validate_predicate(where_clause)?;
    Ok(format!(
        "SELECT {} FROM `{}` WHERE {}",
        render_field_list(fields),
        source_table.qualified_name(),
        source_where(source_table, where_clause)
    ))
}

/// Wraps a SELECT into a replace-in-place table creation whose engine-side
/// expiration is the absolute `expires_at`.
pub fn create_table_as(
    target: &TableRef,
    expires_at: DateTime<Utc>,
    description: &str,
    select_sql: &str,
) -> String {
    format!(
        "CREATE OR REPLACE TABLE {}\nOPTIONS(\n  expiration_timestamp = TIMESTAMP '{}',\n  description = {}\n)\nAS {}",
        target.quoted(),
        expires_at.format("%Y-%m-%d %H:%M:%S+00"),
        escape_string_literal(description),
        select_sql
    )
}

/// SELECT against a subset table, layering the caller's filter and limit on top.
pub fn subset_select(
    target: &TableRef,
    fields: &[String],
    where_clause: Option<&str>,
    limit: u32,
) -> Result<String, SqlGenError> {
    let mut sql = format!("SELECT {} FROM {}", render_field_list(fields), target.quoted());
    if let Some(w) = where_clause.filter(|w| !w.trim().is_empty()) {
        validate_predicate(w)?;
        sql.push_str(&format!(" WHERE ({})", w));
    }
    sql.push_str(&format!(" LIMIT {}", limit));
    Ok(sql)
}
