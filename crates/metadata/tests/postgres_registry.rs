//! Runs against a live Postgres. Set `QUARRY_TEST_POSTGRES_URL` and run with
//! `--ignored`.

use anyhow::Result;
use quarry_common::SubsetStatus;
use quarry_metadata::postgres::PostgresRegistry;
use quarry_metadata::SubsetRegistry;

mod common;
use common::descriptor;

async fn registry() -> Result<PostgresRegistry> {
    let url = std::env::var("QUARRY_TEST_POSTGRES_URL")?;
    let registry = PostgresRegistry::new(&url).await?;
    registry.init().await?;
    Ok(registry)
}

#[tokio::test]
#[ignore]
async fn test_postgres_upsert_get_delete() -> Result<()> {
    let registry = registry().await?;
    let owner = format!("pg_test_{}", std::process::id());

    let mut d = descriptor("ukr_jan");
    registry.put(&owner, "ukr_jan", &d).await?;
    d.status = SubsetStatus::Ready;
    d.row_count = Some(10);
    registry.put(&owner, "ukr_jan", &d).await?;

    let loaded = registry.get(&owner, "ukr_jan").await?.expect("row exists");
    assert_eq!(loaded.status, SubsetStatus::Ready);
    assert_eq!(loaded.select_fields, d.select_fields);
    assert_eq!(registry.list(&owner).await?.len(), 1);

    assert!(registry.delete(&owner, "ukr_jan").await?);
    assert!(!registry.delete(&owner, "ukr_jan").await?);
    Ok(())
}
