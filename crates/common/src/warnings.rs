//! # Stale State Warnings
//!
//! Non-fatal findings produced while `list` reconciles registry rows against
//! the engine. They are returned alongside the listing, never raised.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// READY row whose table is gone or whose expiry has passed.
    MarkedExpired,
    /// PENDING row whose table exists; the creating call never finished.
    PromotedReady,
    /// PENDING row past the pending timeout with no table.
    MarkedError,
    /// Table carrying our provenance with no registry row.
    Adopted,
    /// ERROR row whose table turned up anyway; rewritten from provenance.
    Recovered,
    /// ERROR row whose table exists but carries no usable provenance.
    ErrorTablePresent,
    /// Tombstone whose table the engine now reports absent.
    TombstoneCleared,
    /// Tombstone whose drop failed again.
    DropRetryFailed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaleStateWarning {
    pub subset: String,
    pub kind: WarningKind,
    pub message: String,
}

impl StaleStateWarning {
    pub fn new(subset: impl Into<String>, kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            subset: subset.into(),
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for StaleStateWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.subset, self.message)
    }
}
