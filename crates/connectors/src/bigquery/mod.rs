//! BigQuery REST v2 implementation of [`QueryEngine`].
//!
//! Authenticates with a ready-made bearer token from configuration. Every
//! request shares the client's timeout; a query job that has not finished
//! when `POST queries` returns is awaited through `getQueryResults` until the
//! same deadline.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quarry_common::config::EngineSettings;
use quarry_common::scrubber::scrub;
use quarry_common::TableRef;
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use url::Url;

use crate::engine::error::EngineError;
use crate::engine::{
    DropOutcome, FetchedRows, MaterializeRequest, MaterializedTable, QueryEngine, RemoteTable,
};

pub mod api;
mod rows;

use api::{ErrorBody, JobReference, QueryRequest, QueryResponse, Table, TableList};

/// Server-side wait per `getQueryResults` poll.
const POLL_TIMEOUT_MS: u64 = 10_000;
const LIST_PAGE_SIZE: u32 = 1000;

#[derive(Debug, Clone)]
pub struct BigQueryConfig {
    pub base_url: String,
    pub project_id: String,
    pub dataset: String,
    pub location: Option<String>,
    pub token: Option<SecretString>,
    pub request_timeout: Duration,
}

impl BigQueryConfig {
    pub fn from_settings(settings: &EngineSettings) -> Result<Self, EngineError> {
        if settings.project_id.trim().is_empty() {
            return Err(EngineError::Config(
                "engine.project_id is required (set QUARRY_ENGINE__PROJECT_ID)".to_string(),
            ));
        }
        Ok(Self {
            base_url: settings.base_url.clone(),
            project_id: settings.project_id.clone(),
            dataset: settings.dataset.clone(),
            location: settings.location.clone(),
            token: settings.token.clone(),
            request_timeout: Duration::from_secs(settings.request_timeout_secs),
        })
    }
}

pub struct BigQueryEngine {
    client: reqwest::Client,
    config: BigQueryConfig,
    base: Url,
}

impl BigQueryEngine {
    pub fn new(config: BigQueryConfig) -> Result<Self> {
        let base = Url::parse(&config.base_url)
            .with_context(|| format!("Invalid engine base_url '{}'", config.base_url))?;

        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(token) = &config.token {
            let mut value = reqwest::header::HeaderValue::from_str(&format!(
                "Bearer {}",
                token.expose_secret()
            ))
            .context("Engine token is not a valid header value")?;
            value.set_sensitive(true);
            headers.insert(reqwest::header::AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            config,
            base,
        })
    }

    pub fn config(&self) -> &BigQueryConfig {
        &self.config
    }

    fn url(&self, segments: &[&str]) -> Result<Url, EngineError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| EngineError::Config(format!("base_url '{}' cannot be a base", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn table_url(&self, table: &TableRef) -> Result<Url, EngineError> {
        self.url(&[
            "projects",
            &table.project,
            "datasets",
            &table.dataset,
            "tables",
            &table.table,
        ])
    }

    async fn send(
        &self,
        operation: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, EngineError> {
        request.send().await.map_err(|e| EngineError::Unavailable {
            operation,
            message: scrub(&e.to_string()),
        })
    }

    /// Turns a non-success response into the matching error. 404 is left to
    /// callers, which treat absence differently per operation.
    async fn classify(operation: &'static str, response: reqwest::Response) -> EngineError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.error.message)
            .unwrap_or(body);
        let message = scrub(&message);

        if status == StatusCode::REQUEST_TIMEOUT
            || status == StatusCode::TOO_MANY_REQUESTS
            || status.is_server_error()
        {
            EngineError::Unavailable {
                operation,
                message: format!("HTTP {}: {}", status.as_u16(), message),
            }
        } else {
            EngineError::Rejected {
                operation,
                status: status.as_u16(),
                message,
            }
        }
    }

    async fn decode<T: DeserializeOwned>(
        operation: &'static str,
        response: reqwest::Response,
    ) -> Result<T, EngineError> {
        response.json::<T>().await.map_err(|e| EngineError::Decode {
            operation,
            message: e.to_string(),
        })
    }

    async fn post_query(
        &self,
        operation: &'static str,
        body: &QueryRequest,
    ) -> Result<QueryResponse, EngineError> {
        let url = self.url(&["projects", &self.config.project_id, "queries"])?;
        let response = self
            .send(operation, self.client.post(url).json(body))
            .await?;
        if !response.status().is_success() {
            return Err(Self::classify(operation, response).await);
        }
        Self::decode(operation, response).await
    }

    async fn query_results(
        &self,
        operation: &'static str,
        job: &JobReference,
        page_token: Option<&str>,
        max_results: Option<u32>,
    ) -> Result<QueryResponse, EngineError> {
        let url = self.url(&["projects", &job.project_id, "queries", &job.job_id])?;
        let mut query: Vec<(&str, String)> = vec![("timeoutMs", POLL_TIMEOUT_MS.to_string())];
        if let Some(location) = job.location.as_ref().or(self.config.location.as_ref()) {
            query.push(("location", location.clone()));
        }
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }
        if let Some(max) = max_results {
            query.push(("maxResults", max.to_string()));
        }

        let response = self
            .send(operation, self.client.get(url).query(&query))
            .await?;
        if !response.status().is_success() {
            return Err(Self::classify(operation, response).await);
        }
        Self::decode(operation, response).await
    }

    /// Submits a statement and waits for the job to complete.
    async fn run_query(
        &self,
        operation: &'static str,
        sql: &str,
        max_results: Option<u32>,
    ) -> Result<QueryResponse, EngineError> {
        let deadline = Instant::now() + self.config.request_timeout;
        let body = QueryRequest {
            query: sql.to_string(),
            use_legacy_sql: false,
            use_query_cache: Some(true),
            max_results,
            timeout_ms: Some(self.config.request_timeout.as_millis() as u64),
            location: self.config.location.clone(),
            ..Default::default()
        };

        let mut response = self.post_query(operation, &body).await?;
        while !response.is_complete() {
            if Instant::now() >= deadline {
                return Err(EngineError::Unavailable {
                    operation,
                    message: format!(
                        "job did not complete within {}s",
                        self.config.request_timeout.as_secs()
                    ),
                });
            }
            let job = response.job_reference.clone().ok_or(EngineError::Decode {
                operation,
                message: "incomplete job without jobReference".to_string(),
            })?;
            tracing::debug!(job_id = %job.job_id, "waiting for query job");
            response = self
                .query_results(operation, &job, None, max_results)
                .await?;
            if response.job_reference.is_none() {
                response.job_reference = Some(job);
            }
        }
        Ok(response)
    }

    fn remote_table(table: Table) -> RemoteTable {
        let r = table.table_reference;
        RemoteTable {
            table: TableRef::new(r.project_id, r.dataset_id, r.table_id),
            created_at: table.creation_time.as_deref().and_then(parse_millis),
            expires_at: table.expiration_time.as_deref().and_then(parse_millis),
            size_bytes: table.num_bytes.and_then(|n| n.parse().ok()),
            row_count: table.num_rows.and_then(|n| n.parse().ok()),
            description: table.description,
        }
    }
}

fn parse_millis(value: &str) -> Option<DateTime<Utc>> {
    value
        .parse::<i64>()
        .ok()
        .and_then(DateTime::from_timestamp_millis)
}

#[async_trait]
impl QueryEngine for BigQueryEngine {
    fn subset_table(&self, table_id: &str) -> TableRef {
        TableRef::new(&self.config.project_id, &self.config.dataset, table_id)
    }

    async fn dry_run(&self, sql: &str) -> Result<u64, EngineError> {
        let body = QueryRequest {
            query: sql.to_string(),
            use_legacy_sql: false,
            dry_run: Some(true),
            location: self.config.location.clone(),
            ..Default::default()
        };
        let response = self.post_query("dry_run", &body).await?;
        let bytes = response
            .total_bytes_processed
            .as_deref()
            .ok_or(EngineError::Decode {
                operation: "dry_run",
                message: "missing totalBytesProcessed".to_string(),
            })?;
        bytes.parse::<u64>().map_err(|e| EngineError::Decode {
            operation: "dry_run",
            message: format!("totalBytesProcessed '{}': {}", bytes, e),
        })
    }

    async fn execute_and_fetch(&self, sql: &str, limit: u32) -> Result<FetchedRows, EngineError> {
        let operation = "execute_and_fetch";
        let mut response = self.run_query(operation, sql, Some(limit)).await?;

        let fields = response.schema.take().unwrap_or_default().fields;
        let total_rows = response.total_rows.as_deref().and_then(|n| n.parse().ok());
        let mut raw_rows = std::mem::take(&mut response.rows);

        let limit = limit as usize;
        let mut page_token = response.page_token.take();
        while raw_rows.len() < limit {
            let (Some(token), Some(job)) = (page_token.as_deref(), response.job_reference.as_ref())
            else {
                break;
            };
            let remaining = (limit - raw_rows.len()) as u32;
            let mut page = self
                .query_results(operation, job, Some(token), Some(remaining))
                .await?;
            raw_rows.append(&mut page.rows);
            page_token = page.page_token.take();
        }
        raw_rows.truncate(limit);

        Ok(FetchedRows {
            columns: fields.iter().map(|f| f.name.clone()).collect(),
            rows: rows::decode_rows(&fields, &raw_rows),
            total_rows,
        })
    }

    async fn materialize(
        &self,
        request: &MaterializeRequest,
    ) -> Result<MaterializedTable, EngineError> {
        self.run_query("materialize", &request.sql, None).await?;

        let table = self
            .describe_table(&request.table)
            .await?
            .ok_or_else(|| EngineError::Decode {
                operation: "materialize",
                message: format!("table {} missing after creation", request.table),
            })?;

        Ok(MaterializedTable {
            size_bytes: table.size_bytes.unwrap_or(0),
            row_count: table.row_count.unwrap_or(0),
        })
    }

    async fn describe_table(&self, table: &TableRef) -> Result<Option<RemoteTable>, EngineError> {
        let operation = "describe_table";
        let url = self.table_url(table)?;
        let response = self.send(operation, self.client.get(url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::classify(operation, response).await);
        }
        let table: Table = Self::decode(operation, response).await?;
        Ok(Some(Self::remote_table(table)))
    }

    async fn set_expiration(
        &self,
        table: &TableRef,
        expires_at: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        let operation = "set_expiration";
        let url = self.table_url(table)?;
        let body = serde_json::json!({
            "expirationTime": expires_at.timestamp_millis().to_string(),
        });
        let response = self
            .send(operation, self.client.request(Method::PATCH, url).json(&body))
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(EngineError::NotFound {
                operation,
                table: table.to_string(),
            });
        }
        if !response.status().is_success() {
            return Err(Self::classify(operation, response).await);
        }
        Ok(())
    }

    async fn drop_table(&self, table: &TableRef) -> Result<DropOutcome, EngineError> {
        let operation = "drop";
        let url = self.table_url(table)?;
        let response = self.send(operation, self.client.delete(url)).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(DropOutcome::AlreadyAbsent),
            s if s.is_success() => Ok(DropOutcome::Dropped),
            _ => Err(Self::classify(operation, response).await),
        }
    }

    async fn list_tables(&self) -> Result<Vec<RemoteTable>, EngineError> {
        let operation = "list_tables";
        let url = self.url(&[
            "projects",
            &self.config.project_id,
            "datasets",
            &self.config.dataset,
            "tables",
        ])?;

        let mut tables = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut query = vec![("maxResults", LIST_PAGE_SIZE.to_string())];
            if let Some(token) = &page_token {
                query.push(("pageToken", token.clone()));
            }
            let response = self
                .send(operation, self.client.get(url.clone()).query(&query))
                .await?;
            // A dataset that was never created holds no subsets.
            if response.status() == StatusCode::NOT_FOUND {
                return Ok(tables);
            }
            if !response.status().is_success() {
                return Err(Self::classify(operation, response).await);
            }
            let page: TableList = Self::decode(operation, response).await?;
            tables.extend(page.tables.into_iter().map(Self::remote_table));
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
        Ok(tables)
    }

    async fn ensure_dataset(&self) -> Result<(), EngineError> {
        let operation = "ensure_dataset";
        let url = self.url(&["projects", &self.config.project_id, "datasets"])?;
        let mut body = serde_json::json!({
            "datasetReference": {
                "projectId": self.config.project_id,
                "datasetId": self.config.dataset,
            },
            "description": "Quarry subsets",
        });
        if let Some(location) = &self.config.location {
            body["location"] = serde_json::Value::String(location.clone());
        }

        let response = self
            .send(operation, self.client.post(url).json(&body))
            .await?;
        match response.status() {
            StatusCode::CONFLICT => Ok(()),
            s if s.is_success() => {
                tracing::info!(dataset = %self.config.dataset, "created subset dataset");
                Ok(())
            }
            _ => Err(Self::classify(operation, response).await),
        }
    }
}
