//! Common utilities, types, and configurations shared across Quarry crates.
//!
//! This crate contains the base building blocks for the subset lifecycle manager, including:
//! - **Configuration**: Strongly typed application configuration (`config`).
//! - **Models**: Source tables, subset descriptors and operation results (`models`).
//! - **Telemetry**: Observability setup (`telemetry`).
//! - **Warnings**: Non-fatal reconciliation warnings (`warnings`).
//! - **Scrubbing**: Credential redaction for engine messages (`scrubber`).
pub mod config;
pub mod models;
pub mod scrubber;
pub mod telemetry;
pub mod warnings;

pub use crate::config::AppConfig;
pub use crate::models::{SourceTable, SubsetDescriptor, SubsetStatus, TableRef};
pub use crate::warnings::StaleStateWarning;
