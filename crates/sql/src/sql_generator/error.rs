use quarry_common::SourceTable;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqlGenError {
    #[error("Invalid {field}: '{value}' ({reason})")]
    InvalidIdentifier {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Invalid field list '{value}': {reason}")]
    InvalidFieldList { value: String, reason: String },

    #[error("A WHERE clause is required to materialize a subset of {source_table}")]
    MissingFilter { source_table: SourceTable },

    #[error("WHERE clause has no date bound on {columns} for {source_table}", columns = .source_table.temporal_columns().join(" / "))]
    NoDateBound {
        source_table: SourceTable,
        where_clause: String,
    },

    #[error("Malformed predicate '{predicate}': {reason}")]
    MalformedPredicate { predicate: String, reason: String },
}

impl SqlGenError {
    pub fn to_quarry_error(self) -> quarry_error::QuarryError {
        use quarry_error::{ErrorCode, ErrorContext, QuarryError};

        let message = self.to_string();
        match self {
            SqlGenError::InvalidIdentifier {
                field,
                value,
                reason: _,
            } => QuarryError::new(ErrorCode::InvalidIdentifier, message)
                .with_context(ErrorContext::InvalidInput {
                    field: field.to_string(),
                    value,
                    allowed: vec![],
                })
                .with_hint(
                    "Use letters, digits and underscores, starting with a letter (max 64 chars)",
                ),
            SqlGenError::InvalidFieldList { value, reason: _ } => {
                QuarryError::new(ErrorCode::InvalidFieldList, message)
                    .with_context(ErrorContext::InvalidInput {
                        field: "select_fields".to_string(),
                        value,
                        allowed: vec![],
                    })
                    .with_hint("List plain column names separated by commas, or use *")
            }
            SqlGenError::MissingFilter { source_table } => {
                QuarryError::new(ErrorCode::InvalidFilter, message)
                    .with_context(ErrorContext::Filter {
                        source_table: source_table.to_string(),
                        temporal_columns: columns(source_table),
                        where_clause: String::new(),
                    })
                    .with_hint(format!(
                        "Provide a filter such as {}",
                        source_table.example_bound()
                    ))
            }
            SqlGenError::NoDateBound {
                source_table,
                where_clause,
            } => QuarryError::new(ErrorCode::InvalidFilter, message)
                .with_context(ErrorContext::Filter {
                    source_table: source_table.to_string(),
                    temporal_columns: columns(source_table),
                    where_clause,
                })
                .with_hint(format!(
                    "Add a lower date bound, e.g. {}, so the scan is partition-pruned",
                    source_table.example_bound()
                )),
            SqlGenError::MalformedPredicate { predicate, reason } => {
                let mut data = std::collections::HashMap::new();
                data.insert(
                    "predicate".to_string(),
                    serde_json::Value::String(predicate),
                );
                data.insert("reason".to_string(), serde_json::Value::String(reason));

                QuarryError::new(ErrorCode::MalformedPredicate, message)
                    .with_context(ErrorContext::Generic { data })
                    .with_hint("Pass a single boolean expression without the WHERE keyword")
            }
        }
    }
}

fn columns(source_table: SourceTable) -> Vec<String> {
    source_table
        .temporal_columns()
        .iter()
        .map(|c| c.to_string())
        .collect()
}

impl From<SqlGenError> for quarry_error::QuarryError {
    fn from(err: SqlGenError) -> Self {
        err.to_quarry_error()
    }
}
