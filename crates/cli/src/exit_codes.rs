//! Structured exit codes for machine-readable error handling.
//!
//! Each failing stage gets its own code so scripts can tell a bad filter
//! from an unreachable engine without parsing messages.

use quarry_error::{ErrorCode, ErrorStage, QuarryError};

/// Success (standard convention)
#[allow(dead_code)]
pub const SUCCESS: i32 = 0;

/// General error (fallback for unknown errors)
pub const GENERAL_ERROR: i32 = 1;

/// CLI usage error (invalid arguments, missing flags). Emitted by clap.
#[allow(dead_code)]
pub const USAGE_ERROR: i32 = 2;

/// Configuration error (YAML parse failure, missing project id)
pub const CONFIG_ERROR: i32 = 3;

/// Engine error (unreachable, rejected statement, budget exceeded)
pub const ENGINE_ERROR: i32 = 4;

/// Validation error (bad identifier, missing date bound, malformed predicate)
pub const VALIDATION_ERROR: i32 = 5;

/// Conflict error (live name collision, extend on a reclaimed subset)
pub const CONFLICT_ERROR: i32 = 6;

/// Subset not found, expired or not ready
pub const NOT_FOUND: i32 = 7;

/// Registry store unreachable or corrupt
pub const REGISTRY_ERROR: i32 = 8;

pub fn for_error(err: &QuarryError) -> i32 {
    match err.stage {
        ErrorStage::Validation => VALIDATION_ERROR,
        ErrorStage::Engine => ENGINE_ERROR,
        ErrorStage::Lifecycle => match err.code {
            ErrorCode::SubsetNotFound => NOT_FOUND,
            _ => CONFLICT_ERROR,
        },
        ErrorStage::Registry => REGISTRY_ERROR,
        ErrorStage::Config => CONFIG_ERROR,
        _ => GENERAL_ERROR,
    }
}

/// Downcasts to [`QuarryError`] when possible; anything else is a general error.
pub fn for_anyhow(e: &anyhow::Error) -> i32 {
    e.downcast_ref::<QuarryError>()
        .map(for_error)
        .unwrap_or(GENERAL_ERROR)
}
