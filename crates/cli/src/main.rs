//! Quarry CLI: materialize, query and reclaim cheap subsets of GDELT tables.
//!
//! Every command is a single stateless call into the subset lifecycle
//! manager. State lives in the registry and in the engine's dataset.
//!
//! # Commands
//!
//! - `init`: Write a starter config, create the registry schema and the subset dataset.
//! - `estimate`: Dry-run a filter against a source table and price it.
//! - `subset create|list|query|extend|delete`: Manage subsets.

use clap::{Parser, Subcommand};
use dotenv::dotenv;
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

mod commands;
mod config;
mod exit_codes;
mod output;

use output::OutputFormat;
use quarry_common::config::TelemetryConfig;
use quarry_common::models::{CreateSubsetRequest, EstimateRequest, QuerySubsetRequest};
use quarry_common::AppConfig;
use quarry_error::QuarryError;
use quarry_runtime::SubsetManager;

#[derive(Parser)]
#[command(name = "quarry", version)]
#[command(about = "Manage short-lived subsets of pay-per-scan GDELT tables", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (human, json, yaml)
    #[arg(long, global = true, value_enum, default_value = "human")]
    output: OutputFormat,

    /// Path to the config file (default: ~/.quarry/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Owner scope for subset names (default: subsets.default_owner)
    #[arg(long, global = true, env = "QUARRY_OWNER")]
    owner: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter config, then prepare the registry and the subset dataset
    Init,
    /// Estimate the scan cost of a filter against a source table
    Estimate {
        /// events, eventmentions, gkg or cloudvision
        source: String,
        /// SQL predicate (without WHERE)
        #[arg(long = "where")]
        where_clause: Option<String>,
        /// Comma-separated column list
        #[arg(long)]
        fields: Option<String>,
    },
    /// Create, inspect and reclaim subsets
    Subset {
        #[command(subcommand)]
        subcommand: SubsetCommands,
    },
}

#[derive(Subcommand)]
enum SubsetCommands {
    /// Materialize a filtered slice of a source table
    Create {
        name: String,
        /// events, eventmentions, gkg or cloudvision
        #[arg(long)]
        source: String,
        /// SQL predicate (without WHERE); must bound the table's date column
        #[arg(long = "where")]
        where_clause: String,
        /// Comma-separated column list
        #[arg(long)]
        fields: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Lifetime in hours (1-168)
        #[arg(long, allow_negative_numbers = true)]
        ttl_hours: Option<i64>,
    },
    /// List subsets, reconciling the registry against the engine
    List,
    /// Read rows from a READY subset
    Query {
        name: String,
        /// Additional SQL predicate (without WHERE)
        #[arg(long = "where")]
        where_clause: Option<String>,
        /// Comma-separated column list
        #[arg(long)]
        fields: Option<String>,
        /// Maximum rows to return (capped at 10000)
        #[arg(long, allow_negative_numbers = true)]
        limit: Option<i64>,
    },
    /// Push a subset's expiration further out
    Extend {
        name: String,
        /// Hours to add (1-168)
        #[arg(long, default_value_t = 24, allow_negative_numbers = true)]
        hours: i64,
    },
    /// Drop a subset's table and forget it
    Delete { name: String },
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    dotenv().ok();

    let cli = Cli::parse();
    let config_path = config::config_path(cli.config.as_deref());
    let loaded = config::load(&config_path);
    match &loaded {
        Ok(config) => init_tracing(&config.telemetry),
        Err(_) => init_tracing(&TelemetryConfig::default()),
    }

    let result = run_cli(&cli, &config_path, loaded).await;
    quarry_common::telemetry::shutdown_telemetry();

    if let Err(e) = result {
        let exit_code = exit_codes::for_anyhow(&e);
        if cli.output.is_machine_readable() {
            output::print_error(cli.output, &e, exit_code).ok();
        } else {
            eprintln!("{} {}", "Error:".red().bold(), e);
        }
        std::process::exit(exit_code);
    }

    Ok(())
}

/// Logs go to stderr so `--output json` stays parseable on stdout.
fn init_tracing(telemetry: &TelemetryConfig) {
    let otel_layer = match quarry_common::telemetry::init_telemetry(telemetry) {
        Ok(layer) => layer,
        Err(e) => {
            eprintln!("{} {:#}", "Telemetry disabled:".yellow(), e);
            Box::new(tracing_subscriber::layer::Identity::new())
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(otel_layer)
        .try_init()
        .ok();
}

async fn connect(config: Result<AppConfig, QuarryError>) -> Result<SubsetManager, anyhow::Error> {
    Ok(SubsetManager::from_config(&config?).await?)
}

async fn run_cli(
    cli: &Cli,
    config_path: &Path,
    config: Result<AppConfig, QuarryError>,
) -> Result<(), anyhow::Error> {
    match &cli.command {
        // Reloads the config itself once the starter file exists.
        Commands::Init => commands::init(config_path, cli.output).await,
        Commands::Estimate {
            source,
            where_clause,
            fields,
        } => {
            let manager = connect(config).await?;
            let request = EstimateRequest {
                source_table: source.clone(),
                where_clause: where_clause.clone(),
                select_fields: fields.clone(),
            };
            commands::estimate(&manager, request, cli.output).await
        }
        Commands::Subset { subcommand } => {
            let manager = connect(config).await?;
            let owner = cli
                .owner
                .clone()
                .unwrap_or_else(|| manager.default_owner().to_string());
            run_subset(&manager, &owner, subcommand, cli.output).await
        }
    }
}

async fn run_subset(
    manager: &SubsetManager,
    owner: &str,
    subcommand: &SubsetCommands,
    format: OutputFormat,
) -> Result<(), anyhow::Error> {
    match subcommand {
        SubsetCommands::Create {
            name,
            source,
            where_clause,
            fields,
            description,
            ttl_hours,
        } => {
            let request = CreateSubsetRequest {
                name: name.clone(),
                source_table: source.clone(),
                where_clause: where_clause.clone(),
                select_fields: fields.clone(),
                description: description.clone(),
                ttl_hours: *ttl_hours,
            };
            commands::create(manager, owner, request, format).await
        }
        SubsetCommands::List => commands::list(manager, owner, format).await,
        SubsetCommands::Query {
            name,
            where_clause,
            fields,
            limit,
        } => {
            let request = QuerySubsetRequest {
                name: name.clone(),
                where_clause: where_clause.clone(),
                select_fields: fields.clone(),
                limit: *limit,
            };
            commands::query(manager, owner, request, format).await
        }
        SubsetCommands::Extend { name, hours } => {
            commands::extend(manager, owner, name, *hours, format).await
        }
        SubsetCommands::Delete { name } => commands::delete(manager, owner, name, format).await,
    }
}
