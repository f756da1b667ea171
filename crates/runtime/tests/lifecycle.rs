use anyhow::Result;
use chrono::{Duration, TimeZone, Utc};
use quarry_common::models::{
    CreateSubsetRequest, DeleteOutcome, EstimateRequest, QuerySubsetRequest,
};
use quarry_common::warnings::WarningKind;
use quarry_common::{SourceTable, SubsetDescriptor, SubsetStatus};
use quarry_error::{ErrorCode, ErrorStage};
use quarry_metadata::SubsetRegistry;

mod common;
use common::{harness, remote_table, start_time, Harness};

const UKR_JAN: &str = "quarry__alice__ukr_jan";

fn ukr_jan() -> CreateSubsetRequest {
    CreateSubsetRequest {
        name: "ukr_jan".to_string(),
        source_table: "events".to_string(),
        where_clause: "SQLDATE >= 20250101 AND SQLDATE <= 20250131 AND Actor1CountryCode = 'UKR'"
            .to_string(),
        select_fields: Some("SQLDATE, EventCode, Actor1CountryCode, AvgTone".to_string()),
        description: Some("Ukraine events, January 2025".to_string()),
        ttl_hours: None,
    }
}

async fn created(h: &Harness) -> Result<()> {
    h.manager.create_subset("alice", ukr_jan()).await?;
    Ok(())
}

fn query(name: &str, where_clause: Option<&str>, limit: Option<i64>) -> QuerySubsetRequest {
    QuerySubsetRequest {
        name: name.to_string(),
        where_clause: where_clause.map(str::to_string),
        select_fields: None,
        limit,
    }
}

// ============================================================================
// create
// ============================================================================

#[tokio::test]
async fn test_create_reaches_ready_with_default_ttl() -> Result<()> {
    let h = harness().await;
    let result = h.manager.create_subset("alice", ukr_jan()).await?;
    let d = &result.subset.descriptor;

    assert_eq!(d.status, SubsetStatus::Ready);
    assert_eq!(d.created_at, Utc.with_ymd_and_hms(2025, 2, 1, 10, 0, 0).unwrap());
    assert_eq!(d.expires_at - d.created_at, Duration::hours(48));
    assert_eq!(d.ttl_hours, 48);
    assert_eq!(d.size_bytes, Some(4096));
    assert_eq!(d.row_count, Some(120));
    assert_eq!(result.subset.table, format!("test-proj.quarry_subsets.{}", UKR_JAN));
    assert_eq!(h.engine.calls(), vec!["dry_run", "materialize"]);

    let stored = h.registry.get("alice", "ukr_jan").await?.expect("row");
    assert_eq!(stored.status, SubsetStatus::Ready);
    Ok(())
}

#[tokio::test]
async fn test_materialization_expiration_matches_registry() -> Result<()> {
    let h = harness().await;
    let result = h.manager.create_subset("alice", ukr_jan()).await?;

    let ddl = h.engine.statements().pop().expect("ddl");
    assert!(ddl.starts_with(&format!("CREATE OR REPLACE TABLE `test-proj.quarry_subsets.{}`", UKR_JAN)));
    assert!(ddl.contains("expiration_timestamp = TIMESTAMP '2025-02-03 10:00:00+00'"));
    assert!(ddl.contains("_PARTITIONTIME >= TIMESTAMP('2025-01-01')"));
    assert_eq!(
        h.engine.table(UKR_JAN).and_then(|t| t.expires_at),
        Some(result.subset.descriptor.expires_at)
    );
    Ok(())
}

#[tokio::test]
async fn test_create_without_date_bound_is_rejected_before_engine() {
    let h = harness().await;
    let mut request = ukr_jan();
    request.name = "x".to_string();
    request.where_clause = "Actor1CountryCode = 'UKR'".to_string();

    let err = h.manager.create_subset("alice", request).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidFilter);
    assert_eq!(err.stage, ErrorStage::Validation);
    assert!(h.engine.calls().is_empty());
    assert!(h.registry.get("alice", "x").await.unwrap().is_none());
}

#[tokio::test]
async fn test_invalid_inputs_fail_fast() {
    let h = harness().await;

    let mut bad_name = ukr_jan();
    bad_name.name = "ukr-jan; drop".to_string();
    let mut bad_ttl = ukr_jan();
    bad_ttl.ttl_hours = Some(500);
    let mut zero_ttl = ukr_jan();
    zero_ttl.ttl_hours = Some(0);
    let mut bad_source = ukr_jan();
    bad_source.source_table = "evnets".to_string();
    let mut bad_fields = ukr_jan();
    bad_fields.select_fields = Some("SQLDATE,,EventCode".to_string());
    let mut injected = ukr_jan();
    injected.where_clause = "SQLDATE >= 20250101; DROP TABLE x".to_string();

    let cases = [
        (bad_name, ErrorCode::InvalidIdentifier),
        (bad_ttl, ErrorCode::InvalidTtl),
        (zero_ttl, ErrorCode::InvalidTtl),
        (bad_source, ErrorCode::UnknownSourceTable),
        (bad_fields, ErrorCode::InvalidFieldList),
        (injected, ErrorCode::MalformedPredicate),
    ];
    for (request, code) in cases {
        let err = h.manager.create_subset("alice", request).await.unwrap_err();
        assert_eq!(err.code, code, "{}", err);
        assert!(err.is_validation());
    }

    let err = h
        .manager
        .create_subset("bad__owner", ukr_jan())
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidIdentifier);
    assert!(h.engine.calls().is_empty());
}

#[tokio::test]
async fn test_live_name_conflicts() -> Result<()> {
    let h = harness().await;
    created(&h).await?;

    let err = h.manager.create_subset("alice", ukr_jan()).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::SubsetConflict);

    // Other owners have their own namespace.
    h.manager.create_subset("bob", ukr_jan()).await?;
    Ok(())
}

#[tokio::test]
async fn test_expired_name_can_be_reused() -> Result<()> {
    let h = harness().await;
    created(&h).await?;
    h.clock.advance(Duration::hours(49));

    let result = h.manager.create_subset("alice", ukr_jan()).await?;
    assert_eq!(result.subset.descriptor.status, SubsetStatus::Ready);
    Ok(())
}

#[tokio::test]
async fn test_budget_gate_blocks_materialization() {
    let h = harness().await;
    h.engine.with(|s| s.dry_run_bytes = 200 << 30);

    let err = h.manager.create_subset("alice", ukr_jan()).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::BudgetExceeded);
    assert_eq!(h.engine.calls(), vec!["dry_run"]);
    assert!(h.registry.get("alice", "ukr_jan").await.unwrap().is_none());
}

#[tokio::test]
async fn test_engine_failure_records_error_row() -> Result<()> {
    let h = harness().await;
    h.engine
        .with(|s| s.fail_materialize = Some("Unrecognized name: AvgTone".to_string()));

    let err = h.manager.create_subset("alice", ukr_jan()).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::EngineRejected);
    assert_eq!(err.stage, ErrorStage::Engine);

    let stored = h.registry.get("alice", "ukr_jan").await?.expect("row");
    assert_eq!(stored.status, SubsetStatus::Error);
    assert!(stored
        .error_message
        .as_deref()
        .unwrap_or_default()
        .contains("Unrecognized name"));

    // ERROR does not hold the name.
    h.engine.with(|s| s.fail_materialize = None);
    h.manager.create_subset("alice", ukr_jan()).await?;
    Ok(())
}

#[tokio::test]
async fn test_registry_row_round_trips_every_field() -> Result<()> {
    let h = harness().await;
    let mut d = SubsetDescriptor::pending(
        "ukr_jan",
        SourceTable::Events,
        "SQLDATE >= 20250101 AND Actor1CountryCode = 'UKR'",
        vec!["SQLDATE".to_string(), "AvgTone".to_string()],
        "Ukraine events",
        48,
        Utc.with_ymd_and_hms(2025, 2, 1, 10, 0, 0).unwrap(),
    );
    h.registry.put("alice", "ukr_jan", &d).await?;
    assert_eq!(h.registry.get("alice", "ukr_jan").await?, Some(d.clone()));

    d.status = SubsetStatus::Ready;
    d.size_bytes = Some(4096);
    d.row_count = Some(120);
    h.registry.put("alice", "ukr_jan", &d).await?;
    let stored = h.registry.get("alice", "ukr_jan").await?.expect("row");
    assert_eq!(stored.where_clause, "SQLDATE >= 20250101 AND Actor1CountryCode = 'UKR'");
    assert_eq!(stored, d);
    Ok(())
}

// ============================================================================
// query
// ============================================================================

#[tokio::test]
async fn test_query_reads_only_the_subset_table() -> Result<()> {
    let h = harness().await;
    created(&h).await?;
    h.engine.with(|s| s.rows_available = 50);

    let result = h
        .manager
        .query_subset("alice", query("ukr_jan", Some("EventCode LIKE '19%'"), Some(1000)))
        .await?;

    assert_eq!(result.limit, 1000);
    assert_eq!(result.row_count, 50);
    assert_eq!(
        result.sql,
        format!(
            "SELECT * FROM `test-proj.quarry_subsets.{}` WHERE (EventCode LIKE '19%') LIMIT 1000",
            UKR_JAN
        )
    );
    assert!(!result.sql.contains("gdelt-bq"));
    assert!(result.estimate.is_none());
    Ok(())
}

#[tokio::test]
async fn test_query_limit_is_capped() -> Result<()> {
    let h = harness().await;
    created(&h).await?;
    h.engine.with(|s| s.rows_available = 12_000);

    let result = h
        .manager
        .query_subset("alice", query("ukr_jan", None, Some(999_999)))
        .await?;
    assert_eq!(result.limit, 10_000);
    assert_eq!(result.rows.len(), 10_000);

    let floor = h
        .manager
        .query_subset("alice", query("ukr_jan", None, Some(0)))
        .await?;
    assert_eq!(floor.limit, 1);
    Ok(())
}

#[tokio::test]
async fn test_query_unknown_subset_is_not_found() {
    let h = harness().await;
    let err = h
        .manager
        .query_subset("alice", query("nope", None, None))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::SubsetNotFound);
    assert!(h.engine.calls().is_empty());
}

#[tokio::test]
async fn test_query_past_expiry_marks_expired() -> Result<()> {
    let h = harness().await;
    created(&h).await?;
    h.clock.advance(Duration::hours(48));

    let err = h
        .manager
        .query_subset("alice", query("ukr_jan", None, None))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    let stored = h.registry.get("alice", "ukr_jan").await?.expect("row");
    assert_eq!(stored.status, SubsetStatus::Expired);
    Ok(())
}

#[tokio::test]
async fn test_query_reclaimed_table_marks_expired() -> Result<()> {
    let h = harness().await;
    created(&h).await?;
    h.engine.remove_table(UKR_JAN);

    let err = h
        .manager
        .query_subset("alice", query("ukr_jan", None, None))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    let stored = h.registry.get("alice", "ukr_jan").await?.expect("row");
    assert_eq!(stored.status, SubsetStatus::Expired);
    Ok(())
}

#[tokio::test]
async fn test_query_rejects_stacked_statements() -> Result<()> {
    let h = harness().await;
    created(&h).await?;
    let before = h.engine.calls().len();

    let err = h
        .manager
        .query_subset("alice", query("ukr_jan", Some("1=1; DROP TABLE t"), None))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::MalformedPredicate);
    assert_eq!(h.engine.calls().len(), before);
    Ok(())
}

// ============================================================================
// extend
// ============================================================================

#[tokio::test]
async fn test_extend_moves_expiry_only() -> Result<()> {
    let h = harness().await;
    let original = h.manager.create_subset("alice", ukr_jan()).await?.subset.descriptor;
    h.clock.advance(Duration::hours(10));

    let result = h.manager.extend_subset("alice", "ukr_jan", 24).await?;
    assert_eq!(result.created_at, original.created_at);
    assert_eq!(result.previous_expires_at, original.expires_at);
    assert_eq!(result.expires_at - original.expires_at, Duration::hours(24));
    assert_eq!(result.ttl_hours, 72);

    let stored = h.registry.get("alice", "ukr_jan").await?.expect("row");
    assert_eq!(stored.expires_at, result.expires_at);
    assert_eq!(stored.created_at, original.created_at);
    assert_eq!(
        h.engine.table(UKR_JAN).and_then(|t| t.expires_at),
        Some(result.expires_at)
    );
    Ok(())
}

#[tokio::test]
async fn test_extend_bounds() -> Result<()> {
    let h = harness().await;
    created(&h).await?;
    for hours in [0, -3, 169] {
        let err = h
            .manager
            .extend_subset("alice", "ukr_jan", hours)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidTtl);
    }
    Ok(())
}

#[tokio::test]
async fn test_extend_after_expiry_fails() -> Result<()> {
    let h = harness().await;
    created(&h).await?;
    h.clock.advance(Duration::hours(49));

    let err = h
        .manager
        .extend_subset("alice", "ukr_jan", 24)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::SubsetAlreadyExpired);
    let stored = h.registry.get("alice", "ukr_jan").await?.expect("row");
    assert_eq!(stored.status, SubsetStatus::Expired);
    Ok(())
}

#[tokio::test]
async fn test_extend_reclaimed_table_fails() -> Result<()> {
    let h = harness().await;
    created(&h).await?;
    h.engine.remove_table(UKR_JAN);

    let err = h
        .manager
        .extend_subset("alice", "ukr_jan", 24)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::SubsetAlreadyExpired);
    Ok(())
}

#[tokio::test]
async fn test_extend_unknown_subset_is_not_found() {
    let h = harness().await;
    let err = h
        .manager
        .extend_subset("alice", "ghost", 24)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::SubsetNotFound);
}

// ============================================================================
// delete
// ============================================================================

#[tokio::test]
async fn test_delete_is_idempotent() -> Result<()> {
    let h = harness().await;
    created(&h).await?;

    let first = h.manager.delete_subset("alice", "ukr_jan").await?;
    assert_eq!(first.outcome, DeleteOutcome::Dropped);
    let second = h.manager.delete_subset("alice", "ukr_jan").await?;
    assert_eq!(second.outcome, DeleteOutcome::AlreadyAbsent);

    assert!(!h.engine.has_table(UKR_JAN));
    let err = h
        .manager
        .query_subset("alice", query("ukr_jan", None, None))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    Ok(())
}

#[tokio::test]
async fn test_failed_drop_leaves_tombstone_until_list() -> Result<()> {
    let h = harness().await;
    created(&h).await?;
    h.engine.with(|s| s.fail_drop = true);

    let result = h.manager.delete_subset("alice", "ukr_jan").await?;
    assert!(matches!(result.outcome, DeleteOutcome::Deferred { .. }));
    let stored = h.registry.get("alice", "ukr_jan").await?.expect("tombstone");
    assert_eq!(stored.status, SubsetStatus::Deleted);

    let err = h
        .manager
        .query_subset("alice", query("ukr_jan", None, None))
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    // Still failing: the tombstone stays and is reported.
    let listed = h.manager.list_subsets("alice").await?;
    assert_eq!(listed.subsets[0].descriptor.status, SubsetStatus::Deleted);
    assert_eq!(listed.warnings[0].kind, WarningKind::DropRetryFailed);

    h.engine.with(|s| s.fail_drop = false);
    let listed = h.manager.list_subsets("alice").await?;
    assert!(listed.subsets.is_empty());
    assert_eq!(listed.warnings[0].kind, WarningKind::TombstoneCleared);
    assert!(h.registry.get("alice", "ukr_jan").await?.is_none());
    assert!(!h.engine.has_table(UKR_JAN));
    Ok(())
}

// ============================================================================
// list
// ============================================================================

#[tokio::test]
async fn test_list_marks_denied_tables_expired() -> Result<()> {
    let h = harness().await;
    created(&h).await?;
    h.engine.remove_table(UKR_JAN);

    let listed = h.manager.list_subsets("alice").await?;
    assert_eq!(listed.subsets.len(), 1);
    assert_eq!(listed.subsets[0].descriptor.status, SubsetStatus::Expired);
    assert_eq!(listed.warnings.len(), 1);
    assert_eq!(listed.warnings[0].kind, WarningKind::MarkedExpired);

    // Reconciled state is persisted; a second list is quiet.
    let again = h.manager.list_subsets("alice").await?;
    assert_eq!(again.subsets[0].descriptor.status, SubsetStatus::Expired);
    assert!(again.warnings.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_list_promotes_and_abandons_pending_rows() -> Result<()> {
    let h = harness().await;
    let now = start_time();

    let promoted = SubsetDescriptor::pending(
        "crashed",
        SourceTable::Events,
        "SQLDATE >= 20250101",
        vec!["*".to_string()],
        "",
        48,
        now,
    );
    h.registry.put("alice", "crashed", &promoted).await?;
    let mut table = remote_table("quarry__alice__crashed");
    table.row_count = Some(77);
    h.engine.insert_table(table);

    let abandoned = SubsetDescriptor::pending(
        "stuck",
        SourceTable::Gkg,
        "DATE >= 20250101000000",
        vec!["*".to_string()],
        "",
        48,
        now - Duration::hours(2),
    );
    h.registry.put("alice", "stuck", &abandoned).await?;

    let listed = h.manager.list_subsets("alice").await?;
    let status_of = |name: &str| {
        listed
            .subsets
            .iter()
            .find(|s| s.descriptor.name == name)
            .map(|s| s.descriptor.status)
    };
    assert_eq!(status_of("crashed"), Some(SubsetStatus::Ready));
    assert_eq!(status_of("stuck"), Some(SubsetStatus::Error));

    let crashed = h.registry.get("alice", "crashed").await?.expect("row");
    assert_eq!(crashed.row_count, Some(77));
    let kinds: Vec<_> = listed.warnings.iter().map(|w| w.kind).collect();
    assert!(kinds.contains(&WarningKind::PromotedReady));
    assert!(kinds.contains(&WarningKind::MarkedError));
    Ok(())
}

#[tokio::test]
async fn test_list_adopts_orphans_and_surfaces_unmanaged() -> Result<()> {
    let h = harness().await;

    let orphan = SubsetDescriptor::pending(
        "orphan",
        SourceTable::EventMentions,
        "MentionTimeDate >= 20250101000000",
        vec!["GLOBALEVENTID".to_string()],
        "lost in a crash",
        24,
        start_time() - Duration::hours(1),
    );
    let mut table = remote_table("quarry__alice__orphan");
    table.expires_at = Some(orphan.expires_at);
    table.description = Some(orphan.provenance("alice").to_json());
    table.row_count = Some(9);
    h.engine.insert_table(table);

    h.engine.insert_table(remote_table("quarry__alice__no_provenance"));
    h.engine.insert_table(remote_table("hand_made_scratch"));
    h.engine.insert_table(remote_table("quarry__bob__theirs"));

    let listed = h.manager.list_subsets("alice").await?;

    assert_eq!(listed.subsets.len(), 1);
    let adopted = &listed.subsets[0].descriptor;
    assert_eq!(adopted.name, "orphan");
    assert_eq!(adopted.status, SubsetStatus::Ready);
    assert_eq!(adopted.ttl_hours, 24);
    assert_eq!(adopted.select_fields, vec!["GLOBALEVENTID"]);
    assert_eq!(adopted.row_count, Some(9));
    assert!(h.registry.get("alice", "orphan").await?.is_some());
    assert_eq!(listed.warnings[0].kind, WarningKind::Adopted);

    let mut unmanaged: Vec<_> = listed.unmanaged.iter().map(|u| u.table.as_str()).collect();
    unmanaged.sort();
    assert_eq!(
        unmanaged,
        vec![
            "test-proj.quarry_subsets.hand_made_scratch",
            "test-proj.quarry_subsets.quarry__alice__no_provenance",
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_list_recovers_error_row_whose_table_exists() -> Result<()> {
    let h = harness().await;
    h.engine
        .with(|s| s.fail_materialize = Some("job exceeded client deadline".to_string()));
    assert!(h.manager.create_subset("alice", ukr_jan()).await.is_err());
    let failed = h.registry.get("alice", "ukr_jan").await?.expect("row");
    assert_eq!(failed.status, SubsetStatus::Error);

    // The job finished server-side after the client gave up.
    let mut table = remote_table(UKR_JAN);
    table.expires_at = Some(failed.expires_at);
    table.description = Some(failed.provenance("alice").to_json());
    table.row_count = Some(120);
    h.engine.insert_table(table);

    let listed = h.manager.list_subsets("alice").await?;
    assert_eq!(listed.subsets.len(), 1);
    let view = &listed.subsets[0];
    assert_eq!(view.descriptor.status, SubsetStatus::Ready);
    assert_eq!(view.descriptor.error_message, None);
    assert_eq!(view.descriptor.row_count, Some(120));
    assert_eq!(view.expires_in_hours, 48.0);
    assert!(!view.is_expired);
    assert!(listed.unmanaged.is_empty());
    assert_eq!(listed.warnings.len(), 1);
    assert_eq!(listed.warnings[0].kind, WarningKind::Recovered);

    let stored = h.registry.get("alice", "ukr_jan").await?.expect("row");
    assert_eq!(stored.status, SubsetStatus::Ready);
    h.manager.query_subset("alice", query("ukr_jan", None, None)).await?;
    Ok(())
}

#[tokio::test]
async fn test_list_surfaces_error_row_table_without_provenance() -> Result<()> {
    let h = harness().await;
    h.engine
        .with(|s| s.fail_materialize = Some("job exceeded client deadline".to_string()));
    assert!(h.manager.create_subset("alice", ukr_jan()).await.is_err());
    h.engine.insert_table(remote_table(UKR_JAN));

    let listed = h.manager.list_subsets("alice").await?;
    assert_eq!(listed.subsets[0].descriptor.status, SubsetStatus::Error);
    assert_eq!(listed.unmanaged.len(), 1);
    assert_eq!(
        listed.unmanaged[0].table,
        format!("test-proj.quarry_subsets.{}", UKR_JAN)
    );
    assert_eq!(listed.warnings[0].kind, WarningKind::ErrorTablePresent);
    Ok(())
}

#[tokio::test]
async fn test_adopted_ttl_follows_engine_expiry() -> Result<()> {
    let h = harness().await;
    let orphan = SubsetDescriptor::pending(
        "extended",
        SourceTable::Events,
        "SQLDATE >= 20250101",
        vec!["*".to_string()],
        "",
        24,
        start_time() - Duration::hours(2),
    );
    // Extended by 48h before the registry lost track of it.
    let mut table = remote_table("quarry__alice__extended");
    table.expires_at = Some(orphan.expires_at + Duration::hours(48));
    table.description = Some(orphan.provenance("alice").to_json());
    h.engine.insert_table(table);

    let listed = h.manager.list_subsets("alice").await?;
    let adopted = &listed.subsets[0].descriptor;
    assert_eq!(adopted.ttl_hours, 72);
    assert_eq!(adopted.expires_at - adopted.created_at, Duration::hours(72));
    assert_eq!(listed.subsets[0].expires_in_hours, 70.0);
    Ok(())
}

#[tokio::test]
async fn test_list_is_scoped_to_owner() -> Result<()> {
    let h = harness().await;
    created(&h).await?;
    h.manager.create_subset("bob", ukr_jan()).await?;

    let listed = h.manager.list_subsets("alice").await?;
    assert_eq!(listed.owner, "alice");
    assert_eq!(listed.subsets.len(), 1);
    assert!(listed.unmanaged.is_empty());
    assert!(listed.warnings.is_empty());
    Ok(())
}

// ============================================================================
// estimate / init
// ============================================================================

#[tokio::test]
async fn test_estimate_cost_is_advisory() -> Result<()> {
    let h = harness().await;
    h.engine.with(|s| s.dry_run_bytes = 3 << 30);

    let result = h
        .manager
        .estimate_cost(EstimateRequest {
            source_table: "gkg".to_string(),
            where_clause: Some("DATE >= 20250101000000".to_string()),
            select_fields: Some("DocumentIdentifier, V2Themes".to_string()),
        })
        .await?;

    assert!(result.estimate.over_threshold);
    assert_eq!(result.estimate.gb_processed, 3.0);
    assert_eq!(
        result.sql,
        "SELECT DocumentIdentifier, V2Themes FROM `gdelt-bq.gdeltv2.gkg_partitioned` \
         WHERE _PARTITIONTIME >= TIMESTAMP('2025-01-01') AND (DATE >= 20250101000000)"
    );
    assert_eq!(h.engine.calls(), vec!["dry_run"]);
    Ok(())
}

#[tokio::test]
async fn test_init_provisions_dataset() -> Result<()> {
    let h = harness().await;
    h.manager.init().await?;
    assert_eq!(h.engine.calls(), vec!["ensure_dataset"]);
    Ok(())
}
