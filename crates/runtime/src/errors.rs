//! Lifecycle and registry failures as [`QuarryError`]s.

use quarry_common::config::{MAX_TTL_HOURS, MIN_TTL_HOURS};
use quarry_common::SubsetStatus;
use quarry_error::{ErrorCode, ErrorContext, QuarryError};
use quarry_metadata::CorruptRecord;

fn subset_context(owner: &str, name: &str, status: Option<SubsetStatus>) -> ErrorContext {
    ErrorContext::Subset {
        owner: owner.to_string(),
        name: name.to_string(),
        status: status.map(|s| s.to_string()),
    }
}

pub(crate) fn not_found(owner: &str, name: &str, status: Option<SubsetStatus>) -> QuarryError {
    let message = match status {
        None => format!("Subset '{}' not found", name),
        Some(s) => format!("Subset '{}' is {} and cannot be used", name, s),
    };
    QuarryError::new(ErrorCode::SubsetNotFound, message)
        .with_context(subset_context(owner, name, status))
        .with_hint("Run `quarry subset list` to see available subsets")
}

pub(crate) fn conflict(owner: &str, name: &str, status: SubsetStatus) -> QuarryError {
    QuarryError::new(
        ErrorCode::SubsetConflict,
        format!("Subset '{}' already exists ({})", name, status),
    )
    .with_context(subset_context(owner, name, Some(status)))
    .with_hint("Pick another name, or delete the existing subset first")
}

pub(crate) fn already_expired(owner: &str, name: &str) -> QuarryError {
    QuarryError::new(
        ErrorCode::SubsetAlreadyExpired,
        format!("Subset '{}' has already expired", name),
    )
    .with_context(subset_context(owner, name, Some(SubsetStatus::Expired)))
    .with_hint("Recreate the subset with `quarry subset create`")
}

pub(crate) fn invalid_ttl(field: &str, value: i64) -> QuarryError {
    QuarryError::new(
        ErrorCode::InvalidTtl,
        format!(
            "{} must be between {} and {} hours, got {}",
            field, MIN_TTL_HOURS, MAX_TTL_HOURS, value
        ),
    )
    .with_context(ErrorContext::InvalidInput {
        field: field.to_string(),
        value: value.to_string(),
        allowed: vec![format!("{}..={}", MIN_TTL_HOURS, MAX_TTL_HOURS)],
    })
}

/// Registry backends report through `anyhow`; a [`CorruptRecord`] anywhere in
/// the chain means the data is bad rather than the store unreachable.
pub(crate) fn registry(err: anyhow::Error) -> QuarryError {
    if let Some(corrupt) = err.downcast_ref::<CorruptRecord>() {
        return QuarryError::new(ErrorCode::RegistryCorrupt, corrupt.to_string())
            .with_context(ErrorContext::Subset {
                owner: corrupt.owner.clone(),
                name: corrupt.name.clone(),
                status: None,
            })
            .with_hint("Delete the subset to clear the broken record");
    }
    QuarryError::new(ErrorCode::RegistryUnavailable, format!("{:#}", err))
        .with_hint("Check the `metadata` section of the Quarry configuration")
}
