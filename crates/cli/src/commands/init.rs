//! Command to bootstrap a Quarry installation.
//!
//! # Overview
//! `init` writes a starter config (if none exists), then creates the registry
//! schema and the engine-side subset dataset. Re-running it is harmless: an
//! existing config is left untouched and an existing dataset is accepted.

use crate::output::{self, OutputFormat};
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use quarry_runtime::SubsetManager;
use serde::Serialize;
use std::fs;
use std::path::Path;

pub(crate) const CONFIG_TEMPLATE: &str = include_str!("../../templates/config.yaml");

#[derive(Debug, Serialize, Default)]
pub struct InitReport {
    pub config_path: String,
    pub config_created: bool,
    /// False when the project id is still unset.
    pub provisioned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset: Option<String>,
}

pub async fn init(config_path: &Path, format: OutputFormat) -> Result<()> {
    let report = run(config_path, format).await?;
    output::print_success(format, &report)
}

pub(crate) async fn run(config_path: &Path, format: OutputFormat) -> Result<InitReport> {
    let human = !format.is_machine_readable();
    let config_created = write_template(config_path)?;
    if human {
        if config_created {
            println!(
                "{} Created {}",
                "✔".green(),
                config_path.display().to_string().cyan()
            );
        } else {
            println!(
                "{} {} already exists, leaving it untouched.",
                "[Config]".dimmed(),
                config_path.display()
            );
        }
    }

    let mut report = InitReport {
        config_path: config_path.display().to_string(),
        config_created,
        ..Default::default()
    };

    let config = crate::config::load(config_path)?;
    if config.engine.project_id.is_empty() {
        if human {
            println!(
                "Set {} in {} (or QUARRY_ENGINE__PROJECT_ID) and rerun {}.",
                "engine.project_id".bold(),
                config_path.display(),
                "quarry init".bold()
            );
        }
        return Ok(report);
    }

    let manager = SubsetManager::from_config(&config).await?;
    manager.init().await?;
    report.provisioned = true;
    report.dataset = Some(format!(
        "{}.{}",
        config.engine.project_id, config.engine.dataset
    ));

    if human {
        println!("{} Registry schema ready", "✔".green());
        println!(
            "{} Subset dataset {} ready",
            "✔".green(),
            report.dataset.as_deref().unwrap_or_default().cyan()
        );
    }
    Ok(report)
}

/// Returns false when a config already exists.
pub(crate) fn write_template(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, CONFIG_TEMPLATE)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), "wrote starter config");
    Ok(true)
}
