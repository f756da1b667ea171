use quarry_common::AppConfig;
use quarry_error::{ErrorCode, ErrorContext, QuarryError};
use std::env;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "QUARRY_CONFIG";

/// Resolves the config file: `--config`, then `QUARRY_CONFIG`, then `~/.quarry/config.yaml`.
pub fn config_path(arg: Option<&Path>) -> PathBuf {
    if let Some(path) = arg {
        return path.to_path_buf();
    }
    if let Ok(path) = env::var(CONFIG_ENV) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    match dirs::home_dir() {
        Some(home) => home.join(".quarry").join("config.yaml"),
        None => PathBuf::from(".quarry/config.yaml"),
    }
}

/// Loads the file (if present) plus `QUARRY_*` overrides.
pub fn load(path: &Path) -> Result<AppConfig, QuarryError> {
    AppConfig::from_file(&path.to_string_lossy()).map_err(|e| {
        QuarryError::new(ErrorCode::InvalidConfig, format!("{:#}", e))
            .with_context(ErrorContext::Config {
                file_path: Some(path.display().to_string()),
                field: None,
            })
            .with_hint("Fix the configuration file or run `quarry init` to create one")
    })
}
