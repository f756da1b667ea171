//! Durable registry of subset descriptors, keyed by `(owner, name)`.
//!
//! The registry is the only place lifecycle state lives outside the engine.
//! Every write is a single-row upsert, so concurrent writers resolve as
//! last-writer-wins.

use anyhow::Result;
use futures::future::BoxFuture;
use quarry_common::config::MetadataBackend;
use quarry_common::SubsetDescriptor;

pub mod postgres;
mod record;
pub mod sqlite;

pub use record::CorruptRecord;

pub trait SubsetRegistry: Send + Sync {
    /// Create the backing schema if it does not exist yet.
    fn init(&self) -> BoxFuture<'_, Result<()>>;

    /// Insert or fully replace the record for `(owner, name)`.
    fn put<'a>(
        &'a self,
        owner: &'a str,
        name: &'a str,
        descriptor: &'a SubsetDescriptor,
    ) -> BoxFuture<'a, Result<()>>;

    fn get<'a>(&'a self, owner: &'a str, name: &'a str)
        -> BoxFuture<'a, Result<Option<SubsetDescriptor>>>;

    /// All records for `owner`, oldest first.
    fn list<'a>(&'a self, owner: &'a str) -> BoxFuture<'a, Result<Vec<SubsetDescriptor>>>;

    /// Remove the record. Returns whether a row existed.
    fn delete<'a>(&'a self, owner: &'a str, name: &'a str) -> BoxFuture<'a, Result<bool>>;
}

/// Open the configured backend and run its migrations.
pub async fn init_registry(backend: &MetadataBackend) -> Result<Box<dyn SubsetRegistry>> {
    let registry: Box<dyn SubsetRegistry> = match backend {
        MetadataBackend::Sqlite { path } => Box::new(sqlite::SqliteRegistry::new(path)?),
        MetadataBackend::Postgres { url } => Box::new(postgres::PostgresRegistry::new(url).await?),
    };
    registry.init().await?;
    Ok(registry)
}
