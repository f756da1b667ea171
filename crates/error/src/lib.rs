//! # quarry-error
//!
//! Unified error types for the Quarry subset lifecycle manager.
//!
//! Every failure that crosses the lifecycle boundary is a [`QuarryError`] with:
//! - A numeric error code (QUARRY-XXXX)
//! - The stage that failed (validation / engine / lifecycle / registry / config)
//! - Structured JSON context and an optional hint for self-correction

mod code;
mod context;
mod convert;

pub use code::{ErrorCode, ErrorStage};
pub use context::ErrorContext;
pub use convert::closest_match;

use serde::{Deserialize, Serialize};
use std::fmt;

/// The unified error type for all Quarry operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuarryError {
    /// Numeric error code (e.g., "QUARRY-1003")
    pub code: ErrorCode,

    /// Stage that produced the failure, derived from the code range
    pub stage: ErrorStage,

    /// Human-readable error message
    pub message: String,

    /// Structured context for programmatic handling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ErrorContext>,

    /// Actionable suggestion for the caller
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,

    /// Correlation ID for distributed tracing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

impl QuarryError {
    /// Create a new error with code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            stage: code.stage(),
            message: message.into(),
            context: None,
            hint: None,
            trace_id: None,
        }
    }

    /// Add structured context
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Add a hint
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Add trace ID for correlation
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    pub fn is_validation(&self) -> bool {
        self.stage == ErrorStage::Validation
    }

    pub fn is_not_found(&self) -> bool {
        self.code == ErrorCode::SubsetNotFound
    }

    /// Serialize to JSON for machine consumers
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            tracing::warn!("Failed to serialize QuarryError: {}", e);
            format!(
                r#"{{"code":"{}","stage":"{}","message":"Serialization failed"}}"#,
                self.code, self.stage
            )
        })
    }

    /// Serialize to pretty JSON for logging
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| self.to_json())
    }
}

impl fmt::Display for QuarryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(hint) = &self.hint {
            write!(f, " (Hint: {})", hint)?;
        }
        Ok(())
    }
}

impl std::error::Error for QuarryError {}

/// Result type alias for Quarry operations
pub type Result<T> = std::result::Result<T, QuarryError>;
