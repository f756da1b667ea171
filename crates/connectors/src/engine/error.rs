use quarry_error::{ErrorCode, ErrorContext, QuarryError};
use thiserror::Error;

/// Structured errors for engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{operation}: engine unavailable: {message}")]
    Unavailable {
        operation: &'static str,
        message: String,
    },

    #[error("{operation}: rejected by engine (HTTP {status}): {message}")]
    Rejected {
        operation: &'static str,
        status: u16,
        message: String,
    },

    #[error("{operation}: table {table} not found")]
    NotFound {
        operation: &'static str,
        table: String,
    },

    #[error("{operation}: could not decode engine response: {message}")]
    Decode {
        operation: &'static str,
        message: String,
    },

    #[error("Invalid engine configuration: {0}")]
    Config(String),
}

impl EngineError {
    pub fn operation(&self) -> &'static str {
        match self {
            EngineError::Unavailable { operation, .. }
            | EngineError::Rejected { operation, .. }
            | EngineError::NotFound { operation, .. }
            | EngineError::Decode { operation, .. } => operation,
            EngineError::Config(_) => "configure",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::NotFound { .. })
    }

    /// A query against a table the engine no longer has comes back as a 404
    /// rejection rather than `NotFound`.
    pub fn is_missing_table(&self) -> bool {
        matches!(
            self,
            EngineError::NotFound { .. } | EngineError::Rejected { status: 404, .. }
        )
    }

    fn http_status(&self) -> Option<u16> {
        match self {
            EngineError::Rejected { status, .. } => Some(*status),
            EngineError::NotFound { .. } => Some(404),
            _ => None,
        }
    }

    fn context(&self, table: Option<String>) -> ErrorContext {
        ErrorContext::EngineCall {
            operation: self.operation().to_string(),
            table,
            http_status: self.http_status(),
        }
    }

    pub fn to_quarry_error(self, table: Option<String>) -> QuarryError {
        let context = self.context(table);
        let message = self.to_string();
        match self {
            EngineError::Unavailable { .. } => {
                QuarryError::new(ErrorCode::EngineUnavailable, message)
                    .with_context(context)
                    .with_hint("The engine call did not complete; retry when the engine is reachable")
            }
            EngineError::Rejected { .. } | EngineError::NotFound { .. } => {
                QuarryError::new(ErrorCode::EngineRejected, message).with_context(context)
            }
            EngineError::Decode { .. } => {
                QuarryError::new(ErrorCode::EngineResponseInvalid, message).with_context(context)
            }
            EngineError::Config(_) => QuarryError::new(ErrorCode::InvalidConfig, message)
                .with_hint("Check the `engine` section of the Quarry configuration"),
        }
    }

    /// Drop failures get their own code so callers can tell cleanup apart
    /// from query failures.
    pub fn into_drop_failure(self, table: &str) -> QuarryError {
        let context = self.context(Some(table.to_string()));
        QuarryError::new(ErrorCode::DropFailed, self.to_string()).with_context(context)
    }
}
