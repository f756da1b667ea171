use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric error codes following QUARRY-XXXX format.
///
/// ## Code Ranges
/// - **1000-1999**: Validation errors (resolved locally, never reach the engine)
/// - **2000-2999**: Engine errors
/// - **3000-3999**: Subset lifecycle errors
/// - **4000-4999**: Registry errors
/// - **5000-5999**: Configuration errors
/// - **9000-9999**: Internal errors
///
/// Codes are stable across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
#[non_exhaustive]
pub enum ErrorCode {
    // === Validation Errors (1000-1999) ===
    /// QUARRY-1001: Subset name or owner is not a valid identifier
    InvalidIdentifier = 1001,
    /// QUARRY-1002: Field list contains disallowed characters or empty items
    InvalidFieldList = 1002,
    /// QUARRY-1003: Filter missing or lacks a qualifying date bound
    InvalidFilter = 1003,
    /// QUARRY-1004: Predicate is not a single SQL expression
    MalformedPredicate = 1004,
    /// QUARRY-1005: Source table is not one of the known tables
    UnknownSourceTable = 1005,
    /// QUARRY-1006: TTL or extension outside the allowed bounds
    InvalidTtl = 1006,

    // === Engine Errors (2000-2999) ===
    /// QUARRY-2001: Engine could not be reached or timed out
    EngineUnavailable = 2001,
    /// QUARRY-2002: Engine rejected the statement
    EngineRejected = 2002,
    /// QUARRY-2003: Drop request failed
    DropFailed = 2003,
    /// QUARRY-2004: Dry-run estimate exceeds the materialization budget
    BudgetExceeded = 2004,
    /// QUARRY-2005: Engine returned a response that could not be decoded
    EngineResponseInvalid = 2005,

    // === Lifecycle Errors (3000-3999) ===
    /// QUARRY-3001: Subset unknown, expired, deleted or not ready
    SubsetNotFound = 3001,
    /// QUARRY-3002: Name collides with a live subset
    SubsetConflict = 3002,
    /// QUARRY-3003: Extend attempted on a reclaimed subset
    SubsetAlreadyExpired = 3003,

    // === Registry Errors (4000-4999) ===
    /// QUARRY-4001: Registry store unreachable or write failed
    RegistryUnavailable = 4001,
    /// QUARRY-4002: Registry row could not be decoded
    RegistryCorrupt = 4002,

    // === Configuration Errors (5000-5999) ===
    /// QUARRY-5001: Configuration failed to load or validate
    InvalidConfig = 5001,
    /// QUARRY-5002: Required configuration value missing
    MissingRequiredField = 5002,

    // === Internal Errors (9000-9999) ===
    /// QUARRY-9001: Serialization/deserialization failed
    SerializationFailed = 9001,
    /// QUARRY-9002: Unexpected internal state
    InternalPanic = 9002,
    /// QUARRY-9999: Unknown/unclassified error
    Unknown = 9999,
}

impl ErrorCode {
    /// Get the numeric code value
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// Get the formatted code string (e.g., "QUARRY-1003")
    pub fn as_str(&self) -> String {
        format!("QUARRY-{:04}", self.as_u16())
    }

    /// Get the stage that produces this code
    pub fn stage(&self) -> ErrorStage {
        match self.as_u16() {
            1000..=1999 => ErrorStage::Validation,
            2000..=2999 => ErrorStage::Engine,
            3000..=3999 => ErrorStage::Lifecycle,
            4000..=4999 => ErrorStage::Registry,
            5000..=5999 => ErrorStage::Config,
            _ => ErrorStage::Internal,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<ErrorCode> for String {
    fn from(code: ErrorCode) -> String {
        code.as_str()
    }
}

impl TryFrom<String> for ErrorCode {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        let num: u16 = s
            .strip_prefix("QUARRY-")
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| "Invalid format".to_string())?;
        Self::try_from(num).map_err(|_| "Unknown code".to_string())
    }
}

impl TryFrom<u16> for ErrorCode {
    type Error = String;

    fn try_from(n: u16) -> std::result::Result<Self, Self::Error> {
        match n {
            1001 => Ok(Self::InvalidIdentifier),
            1002 => Ok(Self::InvalidFieldList),
            1003 => Ok(Self::InvalidFilter),
            1004 => Ok(Self::MalformedPredicate),
            1005 => Ok(Self::UnknownSourceTable),
            1006 => Ok(Self::InvalidTtl),
            2001 => Ok(Self::EngineUnavailable),
            2002 => Ok(Self::EngineRejected),
            2003 => Ok(Self::DropFailed),
            2004 => Ok(Self::BudgetExceeded),
            2005 => Ok(Self::EngineResponseInvalid),
            3001 => Ok(Self::SubsetNotFound),
            3002 => Ok(Self::SubsetConflict),
            3003 => Ok(Self::SubsetAlreadyExpired),
            4001 => Ok(Self::RegistryUnavailable),
            4002 => Ok(Self::RegistryCorrupt),
            5001 => Ok(Self::InvalidConfig),
            5002 => Ok(Self::MissingRequiredField),
            9001 => Ok(Self::SerializationFailed),
            9002 => Ok(Self::InternalPanic),
            9999 => Ok(Self::Unknown),
            _ => Err(format!("Unknown error code: {}", n)),
        }
    }
}

/// Stage of the lifecycle pipeline that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ErrorStage {
    Validation,
    Engine,
    Lifecycle,
    Registry,
    Config,
    Internal,
}

impl fmt::Display for ErrorStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorStage::Validation => "validation",
            ErrorStage::Engine => "engine",
            ErrorStage::Lifecycle => "lifecycle",
            ErrorStage::Registry => "registry",
            ErrorStage::Config => "config",
            ErrorStage::Internal => "internal",
        };
        f.write_str(s)
    }
}
