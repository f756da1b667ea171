//! # Error Contexts
//!
//! Structured metadata attached to errors so callers can react without parsing messages.

use serde::{Deserialize, Serialize};

/// Structured context for machine-readable errors.
///
/// Each variant provides specific fields relevant to that error type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ErrorContext {
    /// Context for QUARRY-1001/1002/1005/1006 (bad caller input)
    InvalidInput {
        field: String,
        value: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        allowed: Vec<String>,
    },

    /// Context for QUARRY-1003/1004 (filter policy)
    Filter {
        source_table: String,
        temporal_columns: Vec<String>,
        where_clause: String,
    },

    /// Context for QUARRY-3001/3002/3003 (subset lifecycle)
    Subset {
        owner: String,
        name: String,
        status: Option<String>,
    },

    /// Context for engine failures (QUARRY-2001/2002/2003/2005)
    EngineCall {
        operation: String,
        table: Option<String>,
        http_status: Option<u16>,
    },

    /// Context for QUARRY-2004 (BudgetExceeded)
    BudgetExceeded {
        bytes_scanned: u64,
        limit_bytes: u64,
        suggestion: String,
    },

    /// Context for QUARRY-5001/5002 (config errors)
    Config {
        file_path: Option<String>,
        field: Option<String>,
    },

    /// Generic key-value context for extensibility
    Generic {
        #[serde(flatten)]
        data: std::collections::HashMap<String, serde_json::Value>,
    },
}
