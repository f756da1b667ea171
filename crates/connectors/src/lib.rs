//! Query engine boundary for Quarry.
//!
//! The lifecycle manager talks to the remote engine only through the
//! [`QueryEngine`] trait; [`BigQueryEngine`] implements it over the BigQuery
//! REST v2 API.
//!
//! | Operation | REST call |
//! |-----------|-----------|
//! | `dry_run` | `POST projects/{p}/queries` with `dryRun: true` |
//! | `execute_and_fetch` | `POST projects/{p}/queries`, then `GET projects/{p}/queries/{job}` pages |
//! | `materialize` | DDL through `POST projects/{p}/queries`, then `GET .../tables/{t}` for stats |
//! | `describe_table` / `exists` | `GET projects/{p}/datasets/{d}/tables/{t}` |
//! | `set_expiration` | `PATCH projects/{p}/datasets/{d}/tables/{t}` |
//! | `drop_table` | `DELETE projects/{p}/datasets/{d}/tables/{t}` |
//! | `list_tables` | `GET projects/{p}/datasets/{d}/tables` (paged) |
//! | `ensure_dataset` | `POST projects/{p}/datasets` (409 tolerated) |
pub mod bigquery;
pub mod engine;

pub use bigquery::{BigQueryConfig, BigQueryEngine};
pub use engine::error::EngineError;
pub use engine::{
    DropOutcome, FetchedRows, MaterializeRequest, MaterializedTable, QueryEngine, RemoteTable,
};
