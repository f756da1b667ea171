use std::time::Duration;

use quarry_connectors::{BigQueryConfig, BigQueryEngine};
use secrecy::SecretString;
use wiremock::MockServer;

pub const PROJECT: &str = "test-proj";
pub const DATASET: &str = "quarry_subsets";
pub const TOKEN: &str = "ya29.test-token";

/// Engine pointed at a mock server, authenticated with [`TOKEN`].
pub fn engine_for(server: &MockServer) -> BigQueryEngine {
    engine_with_timeout(server, Duration::from_secs(5))
}

pub fn engine_with_timeout(server: &MockServer, timeout: Duration) -> BigQueryEngine {
    BigQueryEngine::new(BigQueryConfig {
        base_url: server.uri(),
        project_id: PROJECT.to_string(),
        dataset: DATASET.to_string(),
        location: Some("US".to_string()),
        token: Some(SecretString::from(TOKEN.to_string())),
        request_timeout: timeout,
    })
    .expect("engine builds")
}

pub fn tables_path() -> String {
    format!("/projects/{}/datasets/{}/tables", PROJECT, DATASET)
}

pub fn table_path(table: &str) -> String {
    format!("{}/{}", tables_path(), table)
}
