use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use validator::Validate;

// Default constants
pub const DEFAULT_ENGINE_BASE_URL: &str = "https://bigquery.googleapis.com/bigquery/v2";
pub const DEFAULT_SUBSET_DATASET: &str = "quarry_subsets";
pub const DEFAULT_TABLE_PREFIX: &str = "quarry";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

pub const DEFAULT_WARN_THRESHOLD_BYTES: u64 = 1 << 30;
pub const DEFAULT_MAX_MATERIALIZE_BYTES: u64 = 100 << 30;
pub const DEFAULT_PRICE_PER_TIB_USD: f64 = 5.0;

pub const DEFAULT_OWNER: &str = "default";
pub const DEFAULT_TTL_HOURS: u32 = 48;
pub const MIN_TTL_HOURS: u32 = 1;
pub const MAX_TTL_HOURS: u32 = 168;
pub const DEFAULT_PENDING_TIMEOUT_MINUTES: u32 = 60;

pub const DEFAULT_REGISTRY_PATH: &str = ".quarry/registry.db";

pub const DEFAULT_TELEMETRY_ENABLED: bool = false;
pub const DEFAULT_OTLP_ENDPOINT: &str = "http://localhost:4317";
pub const DEFAULT_SERVICE_NAME: &str = "quarry";

#[derive(Debug, Deserialize, Default, Clone, Validate)]
pub struct AppConfig {
    #[serde(default)]
    #[validate(nested)]
    pub engine: EngineSettings,
    #[serde(default)]
    #[validate(nested)]
    pub cost: CostSettings,
    #[serde(default)]
    #[validate(nested)]
    pub subsets: SubsetSettings,
    #[serde(default)]
    pub metadata: MetadataBackend,
    #[serde(default)]
    #[validate(nested)]
    pub telemetry: TelemetryConfig,
}

/// Remote engine connection settings.
///
/// The bearer token is consumed as-is; minting or refreshing it happens elsewhere.
#[derive(Debug, Deserialize, Clone, Validate)]
pub struct EngineSettings {
    #[serde(default = "default_engine_base_url")]
    #[validate(url)]
    pub base_url: String,

    /// Project that owns the subset dataset and is billed for queries.
    #[serde(default)]
    pub project_id: String,

    #[serde(default = "default_subset_dataset")]
    #[validate(custom(function = "validate_identifier_setting"))]
    pub dataset: String,

    #[serde(default)]
    pub location: Option<String>,

    #[serde(default, deserialize_with = "deserialize_secret")]
    pub token: Option<SecretString>,

    #[serde(default = "default_request_timeout_secs")]
    #[validate(range(min = 1))]
    pub request_timeout_secs: u64,

    #[serde(default = "default_table_prefix")]
    #[validate(custom(function = "validate_identifier_setting"))]
    pub table_prefix: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            base_url: default_engine_base_url(),
            project_id: String::new(),
            dataset: default_subset_dataset(),
            location: None,
            token: None,
            request_timeout_secs: default_request_timeout_secs(),
            table_prefix: default_table_prefix(),
        }
    }
}

fn default_engine_base_url() -> String {
    DEFAULT_ENGINE_BASE_URL.to_string()
}

fn default_subset_dataset() -> String {
    DEFAULT_SUBSET_DATASET.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_table_prefix() -> String {
    DEFAULT_TABLE_PREFIX.to_string()
}

#[derive(Debug, Deserialize, Clone, Validate)]
pub struct CostSettings {
    /// Scanned bytes above which an estimate is flagged.
    #[serde(default = "default_warn_threshold_bytes")]
    #[validate(range(min = 1))]
    pub warn_threshold_bytes: u64,

    /// Hard ceiling for the dry-run of a materializing SELECT.
    #[serde(default = "default_max_materialize_bytes")]
    #[validate(range(min = 1))]
    pub max_materialize_bytes: u64,

    #[serde(default = "default_price_per_tib_usd")]
    #[validate(range(min = 0.0))]
    pub price_per_tib_usd: f64,
}

impl Default for CostSettings {
    fn default() -> Self {
        Self {
            warn_threshold_bytes: default_warn_threshold_bytes(),
            max_materialize_bytes: default_max_materialize_bytes(),
            price_per_tib_usd: default_price_per_tib_usd(),
        }
    }
}

fn default_warn_threshold_bytes() -> u64 {
    DEFAULT_WARN_THRESHOLD_BYTES
}

fn default_max_materialize_bytes() -> u64 {
    DEFAULT_MAX_MATERIALIZE_BYTES
}

fn default_price_per_tib_usd() -> f64 {
    DEFAULT_PRICE_PER_TIB_USD
}

#[derive(Debug, Deserialize, Clone, Validate)]
pub struct SubsetSettings {
    #[serde(default = "default_owner")]
    #[validate(custom(function = "validate_identifier_setting"))]
    pub default_owner: String,

    #[serde(default = "default_ttl_hours")]
    #[validate(range(min = 1, max = 168))]
    pub default_ttl_hours: u32,

    /// How long a PENDING row blocks its name before it is treated as abandoned.
    #[serde(default = "default_pending_timeout_minutes")]
    #[validate(range(min = 1))]
    pub pending_timeout_minutes: u32,

    /// Dry-run subset queries and attach the estimate to the result.
    #[serde(default)]
    pub estimate_queries: bool,
}

impl Default for SubsetSettings {
    fn default() -> Self {
        Self {
            default_owner: default_owner(),
            default_ttl_hours: default_ttl_hours(),
            pending_timeout_minutes: default_pending_timeout_minutes(),
            estimate_queries: false,
        }
    }
}

fn default_owner() -> String {
    DEFAULT_OWNER.to_string()
}

fn default_ttl_hours() -> u32 {
    DEFAULT_TTL_HOURS
}

fn default_pending_timeout_minutes() -> u32 {
    DEFAULT_PENDING_TIMEOUT_MINUTES
}

/// Registry storage backend.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum MetadataBackend {
    Sqlite {
        #[serde(default = "default_registry_path")]
        path: String,
    },
    Postgres {
        url: String,
    },
}

impl Default for MetadataBackend {
    fn default() -> Self {
        MetadataBackend::Sqlite {
            path: default_registry_path(),
        }
    }
}

fn default_registry_path() -> String {
    DEFAULT_REGISTRY_PATH.to_string()
}

#[derive(Debug, Deserialize, Clone, Validate)]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_enabled")]
    pub enabled: bool,

    #[serde(default = "default_otlp_endpoint")]
    #[validate(url)]
    pub endpoint: String,

    #[serde(default = "default_service_name")]
    pub service_name: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: default_telemetry_enabled(),
            endpoint: default_otlp_endpoint(),
            service_name: default_service_name(),
        }
    }
}

fn default_telemetry_enabled() -> bool {
    DEFAULT_TELEMETRY_ENABLED
}

fn default_otlp_endpoint() -> String {
    DEFAULT_OTLP_ENDPOINT.to_string()
}

fn default_service_name() -> String {
    DEFAULT_SERVICE_NAME.to_string()
}

fn validate_identifier_setting(value: &str) -> Result<(), validator::ValidationError> {
    let mut chars = value.chars();
    let starts_ok = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    if starts_ok && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') && !value.contains("__")
    {
        Ok(())
    } else {
        Err(validator::ValidationError::new("invalid_identifier"))
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    Ok(s.filter(|s| !s.is_empty()).map(SecretString::from))
}

/// Redacted view of the configuration for `--output json` diagnostics.
#[derive(Debug, Serialize)]
pub struct EngineSettingsView<'a> {
    pub base_url: &'a str,
    pub project_id: &'a str,
    pub dataset: &'a str,
    pub table_prefix: &'a str,
    pub token: Option<&'static str>,
}

impl EngineSettings {
    pub fn view(&self) -> EngineSettingsView<'_> {
        EngineSettingsView {
            base_url: &self.base_url,
            project_id: &self.project_id,
            dataset: &self.dataset,
            table_prefix: &self.table_prefix,
            token: self.token.as_ref().map(|_| "[REDACTED]"),
        }
    }
}

// Config implementation
impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let builder = config::Config::builder();

        let builder = if std::path::Path::new(path).exists() {
            builder.add_source(config::File::with_name(path))
        } else {
            builder
        };

        // QUARRY_ENGINE__PROJECT_ID maps to engine.project_id, etc.
        let builder = builder.add_source(
            config::Environment::with_prefix("QUARRY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build().context("Failed to build configuration")?;

        let app_config: AppConfig = cfg
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        app_config
            .validate()
            .map_err(|e| anyhow::anyhow!("Configuration validation failed: {:?}", e))?;

        Ok(app_config)
    }
}
