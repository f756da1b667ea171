//! Subset lifecycle: create, list, query, extend, delete.
//!
//! ```text
//!            materialize ok
//! PENDING ───────────────────► READY ───(expiry / engine reclaimed)──► EXPIRED
//!    │                           │
//!    │ engine failure            │ delete
//!    ▼                           ▼
//!  ERROR                      (row removed, or DELETED tombstone if the drop failed)
//! ```
//!
//! Every operation is a stateless call against the registry and the engine.
//! Expiry is detected lazily: `list`, `query` and `extend` rewrite stale rows
//! when they see them, and the engine's own table expiration is the backstop.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use quarry_common::config::{AppConfig, SubsetSettings, MAX_TTL_HOURS, MIN_TTL_HOURS};
use quarry_common::models::{
    CreateSubsetRequest, CreateSubsetResult, DeleteOutcome, DeleteSubsetResult, EstimateRequest,
    EstimateResult, ExtendSubsetResult, ListSubsetsResult, Provenance, QuerySubsetRequest,
    QuerySubsetResult, SubsetView, UnmanagedTable,
};
use quarry_common::warnings::WarningKind;
use quarry_common::{SourceTable, StaleStateWarning, SubsetDescriptor, SubsetStatus, TableRef};
use quarry_connectors::{
    BigQueryConfig, BigQueryEngine, DropOutcome, MaterializeRequest, QueryEngine, RemoteTable,
};
use quarry_error::{ErrorCode, QuarryError, Result};
use quarry_metadata::SubsetRegistry;
use quarry_sql::sql_generator::{parse_field_list, validate_identifier, validate_owner};
use quarry_sql::{create_table_as, materialize_select, source_select, subset_select};
use tracing::{info, warn};

use crate::clock::{Clock, SystemClock};
use crate::cost::CostEstimator;
use crate::errors;
use crate::naming::SubsetNaming;

pub struct SubsetManager {
    engine: Arc<dyn QueryEngine>,
    registry: Arc<dyn SubsetRegistry>,
    naming: SubsetNaming,
    estimator: CostEstimator,
    settings: SubsetSettings,
    clock: Arc<dyn Clock>,
}

impl SubsetManager {
    pub fn new(
        engine: Arc<dyn QueryEngine>,
        registry: Arc<dyn SubsetRegistry>,
        config: &AppConfig,
    ) -> Self {
        Self {
            engine,
            registry,
            naming: SubsetNaming::new(config.engine.table_prefix.clone()),
            estimator: CostEstimator::new(&config.cost),
            settings: config.subsets.clone(),
            clock: Arc::new(SystemClock),
        }
    }

    /// BigQuery engine plus the configured registry backend.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let engine_config =
            BigQueryConfig::from_settings(&config.engine).map_err(|e| e.to_quarry_error(None))?;
        let engine = BigQueryEngine::new(engine_config).map_err(|e| {
            QuarryError::new(ErrorCode::InvalidConfig, format!("{:#}", e))
                .with_hint("Check the `engine` section of the Quarry configuration")
        })?;
        let registry = quarry_metadata::init_registry(&config.metadata)
            .await
            .map_err(errors::registry)?;
        Ok(Self::new(Arc::new(engine), Arc::from(registry), config))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn default_owner(&self) -> &str {
        &self.settings.default_owner
    }

    fn pending_timeout(&self) -> Duration {
        Duration::minutes(i64::from(self.settings.pending_timeout_minutes))
    }

    fn table_for(&self, owner: &str, name: &str) -> TableRef {
        self.engine
            .subset_table(&self.naming.table_id(owner, name))
    }

    fn view(&self, owner: &str, descriptor: SubsetDescriptor, now: DateTime<Utc>) -> SubsetView {
        let table = self.table_for(owner, &descriptor.name).to_string();
        SubsetView::new(descriptor, table, now)
    }

    async fn put(&self, owner: &str, descriptor: &SubsetDescriptor) -> Result<()> {
        self.registry
            .put(owner, &descriptor.name, descriptor)
            .await
            .map_err(errors::registry)
    }

    async fn get(&self, owner: &str, name: &str) -> Result<Option<SubsetDescriptor>> {
        self.registry
            .get(owner, name)
            .await
            .map_err(errors::registry)
    }

    /// Moves `descriptor` to `next`. Disallowed transitions are logged and skipped.
    fn transition(&self, descriptor: &mut SubsetDescriptor, next: SubsetStatus) -> bool {
        if !descriptor.status.can_transition_to(next) {
            warn!(
                subset = %descriptor.name,
                from = %descriptor.status,
                to = %next,
                "ignoring invalid status transition"
            );
            return false;
        }
        descriptor.status = next;
        descriptor.updated_at = self.clock.now();
        true
    }

    async fn mark_expired(&self, owner: &str, descriptor: &mut SubsetDescriptor) -> Result<()> {
        if self.transition(descriptor, SubsetStatus::Expired) {
            self.put(owner, descriptor).await?;
            info!(target: "subsets", owner = %owner, subset = %descriptor.name, "subset expired");
        }
        Ok(())
    }

    /// Prepares the registry schema and the engine-side subset dataset.
    pub async fn init(&self) -> Result<()> {
        self.registry.init().await.map_err(errors::registry)?;
        self.engine
            .ensure_dataset()
            .await
            .map_err(|e| e.to_quarry_error(None))
    }

    pub async fn create_subset(
        &self,
        owner: &str,
        request: CreateSubsetRequest,
    ) -> Result<CreateSubsetResult> {
        validate_owner(owner)?;
        validate_identifier("name", &request.name)?;
        let source_table: SourceTable = request.source_table.parse()?;
        let fields = parse_field_list(request.select_fields.as_deref())?;
        let ttl_hours = match request.ttl_hours {
            None => self.settings.default_ttl_hours,
            Some(h) if (i64::from(MIN_TTL_HOURS)..=i64::from(MAX_TTL_HOURS)).contains(&h) => {
                h as u32
            }
            Some(h) => return Err(errors::invalid_ttl("ttl_hours", h)),
        };
        let where_clause = request.where_clause.trim().to_string();
        let select_sql = materialize_select(source_table, &fields, &where_clause)?;
        let name = request.name;

        let now = self.clock.now();
        if let Some(existing) = self.get(owner, &name).await? {
            if existing.is_live(now, self.pending_timeout()) {
                return Err(errors::conflict(owner, &name, existing.status));
            }
        }

        let estimate = self
            .estimator
            .estimate(self.engine.as_ref(), &select_sql)
            .await?;
        self.estimator.ensure_within_budget(&estimate)?;

        // The engine stores expirations at second precision.
        let created_at = now.trunc_subsecs(0);
        let mut descriptor = SubsetDescriptor::pending(
            name.clone(),
            source_table,
            where_clause,
            fields,
            request.description.unwrap_or_default(),
            ttl_hours,
            created_at,
        );
        self.put(owner, &descriptor).await?;

        let table = self.table_for(owner, &name);
        let ddl = create_table_as(
            &table,
            descriptor.expires_at,
            &descriptor.provenance(owner).to_json(),
            &select_sql,
        );
        tracing::debug!(target: "subsets", sql = %ddl, "materializing subset");

        let start = Instant::now();
        let request = MaterializeRequest {
            table: table.clone(),
            sql: ddl,
            expires_at: descriptor.expires_at,
        };
        match self.engine.materialize(&request).await {
            Ok(stats) => {
                descriptor.size_bytes = Some(stats.size_bytes);
                descriptor.row_count = Some(stats.row_count);
                self.transition(&mut descriptor, SubsetStatus::Ready);
                self.put(owner, &descriptor).await?;
                info!(
                    target: "subsets",
                    owner = %owner,
                    subset = %name,
                    table = %table,
                    bytes_scanned = estimate.bytes_scanned,
                    size_bytes = stats.size_bytes,
                    row_count = stats.row_count,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "subset ready"
                );
                Ok(CreateSubsetResult {
                    subset: self.view(owner, descriptor, now),
                    estimate,
                })
            }
            Err(engine_err) => {
                descriptor.error_message = Some(engine_err.to_string());
                self.transition(&mut descriptor, SubsetStatus::Error);
                if let Err(e) = self.put(owner, &descriptor).await {
                    warn!(owner = %owner, subset = %name, error = %e, "could not record failed subset");
                }
                warn!(
                    target: "subsets",
                    owner = %owner,
                    subset = %name,
                    table = %table,
                    error = %engine_err,
                    "materialization failed"
                );
                Err(engine_err.to_quarry_error(Some(table.to_string())))
            }
        }
    }

    /// Registry rows for `owner`, reconciled against the tables the engine
    /// actually holds.
    pub async fn list_subsets(&self, owner: &str) -> Result<ListSubsetsResult> {
        validate_owner(owner)?;
        let rows = self
            .registry
            .list(owner)
            .await
            .map_err(errors::registry)?;
        let remote = self
            .engine
            .list_tables()
            .await
            .map_err(|e| e.to_quarry_error(None))?;

        let now = self.clock.now();
        let remote_by_id: HashMap<&str, &RemoteTable> = remote
            .iter()
            .map(|t| (t.table.table.as_str(), t))
            .collect();
        let known: HashSet<String> = rows.iter().map(|d| d.name.clone()).collect();

        let mut subsets = Vec::with_capacity(rows.len());
        let mut warnings = Vec::new();
        let mut unmanaged = Vec::new();

        for mut descriptor in rows {
            let table_id = self.naming.table_id(owner, &descriptor.name);
            let present = remote_by_id.contains_key(table_id.as_str());

            match descriptor.status {
                SubsetStatus::Ready if !present || descriptor.is_past_expiry(now) => {
                    let reason = if present {
                        "expiry time has passed"
                    } else {
                        "table no longer exists in the engine"
                    };
                    self.mark_expired(owner, &mut descriptor).await?;
                    warnings.push(StaleStateWarning::new(
                        &descriptor.name,
                        WarningKind::MarkedExpired,
                        format!("marked EXPIRED: {}", reason),
                    ));
                }
                SubsetStatus::Pending if present => {
                    let table = self.table_for(owner, &descriptor.name);
                    let stats = self
                        .engine
                        .describe_table(&table)
                        .await
                        .map_err(|e| e.to_quarry_error(Some(table.to_string())))?;
                    if let Some(stats) = stats {
                        descriptor.size_bytes = stats.size_bytes;
                        descriptor.row_count = stats.row_count;
                    }
                    self.transition(&mut descriptor, SubsetStatus::Ready);
                    self.put(owner, &descriptor).await?;
                    warnings.push(StaleStateWarning::new(
                        &descriptor.name,
                        WarningKind::PromotedReady,
                        "promoted to READY: table exists but creation was never recorded",
                    ));
                }
                SubsetStatus::Pending if now - descriptor.created_at >= self.pending_timeout() => {
                    let message = format!(
                        "abandoned: no table after {} minutes",
                        self.settings.pending_timeout_minutes
                    );
                    descriptor.error_message = Some(message.clone());
                    self.transition(&mut descriptor, SubsetStatus::Error);
                    self.put(owner, &descriptor).await?;
                    warnings.push(StaleStateWarning::new(
                        &descriptor.name,
                        WarningKind::MarkedError,
                        message,
                    ));
                }
                SubsetStatus::Deleted => {
                    let table = self.table_for(owner, &descriptor.name);
                    match self.engine.drop_table(&table).await {
                        Ok(_) => {
                            self.registry
                                .delete(owner, &descriptor.name)
                                .await
                                .map_err(errors::registry)?;
                            info!(target: "subsets", owner = %owner, subset = %descriptor.name, "tombstone cleared");
                            warnings.push(StaleStateWarning::new(
                                &descriptor.name,
                                WarningKind::TombstoneCleared,
                                "deferred drop completed; record removed",
                            ));
                            continue;
                        }
                        Err(e) => {
                            warn!(owner = %owner, subset = %descriptor.name, error = %e, "tombstone drop retry failed");
                            warnings.push(StaleStateWarning::new(
                                &descriptor.name,
                                WarningKind::DropRetryFailed,
                                format!("drop still failing: {}", e),
                            ));
                        }
                    }
                }
                SubsetStatus::Error if present => {
                    let listed = remote_by_id[table_id.as_str()];
                    match self.adopt(owner, &descriptor.name, listed, now).await? {
                        Some(recovered) => {
                            warnings.push(StaleStateWarning::new(
                                &recovered.name,
                                WarningKind::Recovered,
                                format!(
                                    "recovered as {}: table exists despite the recorded failure",
                                    recovered.status
                                ),
                            ));
                            descriptor = recovered;
                        }
                        None => {
                            unmanaged.push(unmanaged_table(
                                listed,
                                "registry row is ERROR and the table has no readable provenance",
                            ));
                            warnings.push(StaleStateWarning::new(
                                &descriptor.name,
                                WarningKind::ErrorTablePresent,
                                format!("table {} exists but could not be recovered", listed.table),
                            ));
                        }
                    }
                }
                _ => {}
            }
            subsets.push(self.view(owner, descriptor, now));
        }

        for remote_table in &remote {
            let table_id = remote_table.table.table.as_str();
            match self.naming.parse(table_id) {
                Some((table_owner, _)) if table_owner != owner => {}
                Some((_, name)) if known.contains(name) => {}
                Some((_, name)) => match self.adopt(owner, name, remote_table, now).await? {
                    Some(descriptor) => {
                        warnings.push(StaleStateWarning::new(
                            &descriptor.name,
                            WarningKind::Adopted,
                            format!("adopted orphaned table {}", remote_table.table),
                        ));
                        subsets.push(self.view(owner, descriptor, now));
                    }
                    None => unmanaged.push(unmanaged_table(
                        remote_table,
                        "table has no readable provenance",
                    )),
                },
                None => unmanaged.push(unmanaged_table(
                    remote_table,
                    "table name does not follow the subset naming convention",
                )),
            }
        }

        for w in &warnings {
            warn!(target: "subsets", owner = %owner, subset = %w.subset, kind = ?w.kind, "{}", w.message);
        }
        subsets.sort_by(|a, b| {
            a.descriptor
                .created_at
                .cmp(&b.descriptor.created_at)
                .then_with(|| a.descriptor.name.cmp(&b.descriptor.name))
        });

        Ok(ListSubsetsResult {
            owner: owner.to_string(),
            subsets,
            warnings,
            unmanaged,
        })
    }

    /// Rebuilds a registry row for a table left behind by a crash between
    /// materialization and the registry write, or by a materialization the
    /// client gave up on. Overwrites whatever row exists for the name.
    async fn adopt(
        &self,
        owner: &str,
        name: &str,
        listed: &RemoteTable,
        now: DateTime<Utc>,
    ) -> Result<Option<SubsetDescriptor>> {
        let remote = match self
            .engine
            .describe_table(&listed.table)
            .await
            .map_err(|e| e.to_quarry_error(Some(listed.table.to_string())))?
        {
            Some(remote) => remote,
            None => return Ok(None),
        };

        let provenance = match remote.description.as_deref().and_then(Provenance::parse) {
            Some(p) if p.owner == owner && p.name == name => p,
            _ => return Ok(None),
        };

        let expires_at = remote
            .expires_at
            .unwrap_or_else(|| provenance.created_at + Duration::hours(i64::from(provenance.ttl_hours)));
        let mut descriptor =
            provenance.into_descriptor(expires_at, remote.size_bytes, remote.row_count, now);
        // The table may have been extended since the provenance was written.
        descriptor.ttl_hours = ttl_between(descriptor.created_at, expires_at);
        if descriptor.is_past_expiry(now) {
            self.transition(&mut descriptor, SubsetStatus::Expired);
        }
        self.put(owner, &descriptor).await?;
        info!(target: "subsets", owner = %owner, subset = %name, table = %listed.table, "adopted orphaned table");
        Ok(Some(descriptor))
    }

    /// Reads from a READY subset's table. Never touches the source table.
    pub async fn query_subset(
        &self,
        owner: &str,
        request: QuerySubsetRequest,
    ) -> Result<QuerySubsetResult> {
        validate_owner(owner)?;
        validate_identifier("name", &request.name)?;
        let fields = parse_field_list(request.select_fields.as_deref())?;
        let limit = quarry_sql::clamp_limit(request.limit);
        let table = self.table_for(owner, &request.name);
        let sql = subset_select(&table, &fields, request.where_clause.as_deref(), limit)?;
        let name = request.name;

        let mut descriptor = match self.get(owner, &name).await? {
            Some(d) => d,
            None => return Err(errors::not_found(owner, &name, None)),
        };
        if descriptor.status != SubsetStatus::Ready {
            return Err(errors::not_found(owner, &name, Some(descriptor.status)));
        }
        let now = self.clock.now();
        if descriptor.is_past_expiry(now) {
            self.mark_expired(owner, &mut descriptor).await?;
            return Err(errors::not_found(owner, &name, Some(SubsetStatus::Expired)));
        }

        let estimate = if self.settings.estimate_queries {
            Some(self.estimator.estimate(self.engine.as_ref(), &sql).await?)
        } else {
            None
        };

        tracing::debug!(target: "subsets", sql = %sql, "querying subset");
        let start = Instant::now();
        let fetched = match self.engine.execute_and_fetch(&sql, limit).await {
            Ok(fetched) => fetched,
            Err(e) if e.is_missing_table() => {
                self.mark_expired(owner, &mut descriptor).await?;
                return Err(errors::not_found(owner, &name, Some(SubsetStatus::Expired)));
            }
            Err(e) => return Err(e.to_quarry_error(Some(table.to_string()))),
        };

        let mut rows = fetched.rows;
        rows.truncate(limit as usize);
        info!(
            target: "subsets",
            owner = %owner,
            subset = %name,
            table = %table,
            rows_returned = rows.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "subset queried"
        );

        Ok(QuerySubsetResult {
            expires_in_hours: descriptor.hours_remaining(now),
            name,
            table: table.to_string(),
            sql,
            limit,
            columns: fetched.columns,
            row_count: rows.len(),
            rows,
            estimate,
        })
    }

    /// Pushes expiration out by `additional_hours`, on both the engine table
    /// and the registry row. `created_at` never moves.
    pub async fn extend_subset(
        &self,
        owner: &str,
        name: &str,
        additional_hours: i64,
    ) -> Result<ExtendSubsetResult> {
        validate_owner(owner)?;
        validate_identifier("name", name)?;
        if !(i64::from(MIN_TTL_HOURS)..=i64::from(MAX_TTL_HOURS)).contains(&additional_hours) {
            return Err(errors::invalid_ttl("additional_hours", additional_hours));
        }

        let mut descriptor = match self.get(owner, name).await? {
            Some(d) => d,
            None => return Err(errors::not_found(owner, name, None)),
        };
        match descriptor.status {
            SubsetStatus::Ready => {}
            SubsetStatus::Expired => return Err(errors::already_expired(owner, name)),
            other => return Err(errors::not_found(owner, name, Some(other))),
        }
        let now = self.clock.now();
        if descriptor.is_past_expiry(now) {
            self.mark_expired(owner, &mut descriptor).await?;
            return Err(errors::already_expired(owner, name));
        }

        let table = self.table_for(owner, name);
        let previous_expires_at = descriptor.expires_at;
        let expires_at = previous_expires_at + Duration::hours(additional_hours);
        if let Err(e) = self.engine.set_expiration(&table, expires_at).await {
            if e.is_not_found() {
                self.mark_expired(owner, &mut descriptor).await?;
                return Err(errors::already_expired(owner, name));
            }
            return Err(e.to_quarry_error(Some(table.to_string())));
        }

        descriptor.expires_at = expires_at;
        descriptor.ttl_hours += additional_hours as u32;
        descriptor.updated_at = now;
        self.put(owner, &descriptor).await?;
        info!(
            target: "subsets",
            owner = %owner,
            subset = %name,
            table = %table,
            expires_at = %expires_at,
            "subset extended"
        );

        Ok(ExtendSubsetResult {
            name: name.to_string(),
            created_at: descriptor.created_at,
            previous_expires_at,
            expires_at,
            ttl_hours: descriptor.ttl_hours,
        })
    }

    /// Drops the subset's table and forgets it. Deleting something already
    /// gone succeeds; a failed drop leaves a DELETED tombstone for `list` to
    /// retry and still reports success.
    pub async fn delete_subset(&self, owner: &str, name: &str) -> Result<DeleteSubsetResult> {
        validate_owner(owner)?;
        validate_identifier("name", name)?;
        let table = self.table_for(owner, name);
        let existing = self.get(owner, name).await?;

        let outcome = match self.engine.drop_table(&table).await {
            Ok(dropped) => {
                self.registry
                    .delete(owner, name)
                    .await
                    .map_err(errors::registry)?;
                match dropped {
                    DropOutcome::Dropped => DeleteOutcome::Dropped,
                    DropOutcome::AlreadyAbsent => DeleteOutcome::AlreadyAbsent,
                }
            }
            Err(e) => {
                let failure = e.into_drop_failure(&table.to_string());
                let tombstone = existing.filter(|d| d.status != SubsetStatus::Deleted);
                if let Some(mut descriptor) = tombstone {
                    if self.transition(&mut descriptor, SubsetStatus::Deleted) {
                        descriptor.error_message = Some(failure.message.clone());
                        self.put(owner, &descriptor).await?;
                    }
                }
                warn!(
                    target: "subsets",
                    owner = %owner,
                    subset = %name,
                    table = %table,
                    error = %failure,
                    "drop failed; deferring cleanup"
                );
                DeleteOutcome::Deferred {
                    reason: failure.message,
                }
            }
        };

        info!(target: "subsets", owner = %owner, subset = %name, outcome = ?outcome, "subset deleted");
        Ok(DeleteSubsetResult {
            name: name.to_string(),
            table: table.to_string(),
            outcome,
        })
    }

    /// Advisory dry-run estimate of a direct read from a source table.
    pub async fn estimate_cost(&self, request: EstimateRequest) -> Result<EstimateResult> {
        let source_table: SourceTable = request.source_table.parse()?;
        let fields = parse_field_list(request.select_fields.as_deref())?;
        let sql = source_select(source_table, &fields, request.where_clause.as_deref())?;

        let estimate = self.estimator.estimate(self.engine.as_ref(), &sql).await?;
        if estimate.over_threshold {
            warn!(
                target: "subsets",
                source_table = %source_table,
                bytes_scanned = estimate.bytes_scanned,
                "estimate above warn threshold"
            );
        }
        Ok(EstimateResult {
            source_table,
            sql,
            estimate,
        })
    }
}

fn unmanaged_table(remote: &RemoteTable, reason: &str) -> UnmanagedTable {
    UnmanagedTable {
        table: remote.table.to_string(),
        created_at: remote.created_at,
        expires_at: remote.expires_at,
        reason: reason.to_string(),
    }
}

/// Whole hours from creation to expiry, rounded up, at least one.
fn ttl_between(created_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> u32 {
    let secs = (expires_at - created_at).num_seconds().max(0);
    let hours = (secs + 3599) / 3600;
    u32::try_from(hours.max(1)).unwrap_or(u32::MAX)
}
