//! `quarry subset` commands.
//!
//! Each command is a thin shell over one [`SubsetManager`] operation: machine
//! formats get the typed result verbatim, human output gets a short summary.

use super::helpers::{cell, expiry_hint, format_ts, human_bytes, paint_status, paint_tier};
use crate::output::{self, OutputFormat};
use anyhow::Result;
use chrono::Utc;
use owo_colors::OwoColorize;
use quarry_common::models::{
    CreateSubsetRequest, DeleteOutcome, ListSubsetsResult, QuerySubsetRequest,
};
use quarry_runtime::SubsetManager;

pub async fn create(
    manager: &SubsetManager,
    owner: &str,
    request: CreateSubsetRequest,
    format: OutputFormat,
) -> Result<()> {
    if !format.is_machine_readable() {
        println!(
            "{} '{}' from {}...",
            "Materializing subset".dimmed(),
            request.name.bold(),
            request.source_table.cyan()
        );
    }

    let result = manager.create_subset(owner, request).await?;
    if format.is_machine_readable() {
        return output::print_success(format, &result);
    }

    let d = &result.subset.descriptor;
    println!(
        "{} Subset '{}' is {}",
        "✔".green(),
        d.name.bold(),
        paint_status(d.status, 0)
    );
    println!("  table:    {}", result.subset.table.cyan());
    println!(
        "  rows:     {}   size: {}",
        d.row_count.map_or("-".to_string(), |r| r.to_string()),
        d.size_bytes.map_or("-".to_string(), human_bytes)
    );
    println!(
        "  scanned:  {} (${:.4}, {})",
        human_bytes(result.estimate.bytes_scanned),
        result.estimate.estimated_cost_usd,
        paint_tier(result.estimate.tier)
    );
    println!(
        "  expires:  {} ({}h TTL)",
        format_ts(d.expires_at),
        d.ttl_hours
    );
    Ok(())
}

pub async fn list(manager: &SubsetManager, owner: &str, format: OutputFormat) -> Result<()> {
    let result = manager.list_subsets(owner).await?;
    if format.is_machine_readable() {
        return output::print_success(format, &result);
    }
    print_listing(&result);
    Ok(())
}

fn print_listing(result: &ListSubsetsResult) {
    let now = Utc::now();

    if result.subsets.is_empty() {
        println!("No subsets for owner '{}'.", result.owner);
    } else {
        println!(
            "{}",
            format!(
                "{:<24} {:<8} {:<16} {:>10} {:>10}  {}",
                "NAME", "STATUS", "SOURCE", "ROWS", "SIZE", "EXPIRES"
            )
            .bold()
        );
        for view in &result.subsets {
            let d = &view.descriptor;
            println!(
                "{:<24} {} {:<16} {:>10} {:>10}  {}",
                d.name,
                paint_status(d.status, 8),
                d.source_table.as_str(),
                d.row_count.map_or("-".to_string(), |r| r.to_string()),
                d.size_bytes.map_or("-".to_string(), human_bytes),
                expiry_hint(d.expires_at, now).dimmed()
            );
        }
    }

    for warning in &result.warnings {
        println!("{} {}: {}", "⚠".yellow(), warning.subset.bold(), warning.message);
    }

    if !result.unmanaged.is_empty() {
        println!("\n{}", "Unmanaged tables in the subset dataset:".bold());
        for table in &result.unmanaged {
            println!("  {} ({})", table.table.cyan(), table.reason.dimmed());
        }
    }
}

pub async fn query(
    manager: &SubsetManager,
    owner: &str,
    request: QuerySubsetRequest,
    format: OutputFormat,
) -> Result<()> {
    let result = manager.query_subset(owner, request).await?;
    if format.is_machine_readable() {
        return output::print_success(format, &result);
    }

    println!("{}", result.sql.dimmed());
    println!("{}", result.columns.join("\t").bold());
    for row in &result.rows {
        let line: Vec<String> = result
            .columns
            .iter()
            .map(|column| cell(row.get(column)))
            .collect();
        println!("{}", line.join("\t"));
    }
    println!(
        "{}",
        format!("{} rows (limit {})", result.row_count, result.limit).dimmed()
    );
    if let Some(estimate) = &result.estimate {
        println!(
            "{}",
            format!(
                "scanned {} (${:.4})",
                human_bytes(estimate.bytes_scanned),
                estimate.estimated_cost_usd
            )
            .dimmed()
        );
    }
    Ok(())
}

pub async fn extend(
    manager: &SubsetManager,
    owner: &str,
    name: &str,
    hours: i64,
    format: OutputFormat,
) -> Result<()> {
    let result = manager.extend_subset(owner, name, hours).await?;
    if format.is_machine_readable() {
        return output::print_success(format, &result);
    }

    println!(
        "{} Extended '{}' by {}h: expires {} (was {}, TTL now {}h)",
        "✔".green(),
        result.name.bold(),
        hours,
        format_ts(result.expires_at).cyan(),
        format_ts(result.previous_expires_at),
        result.ttl_hours
    );
    Ok(())
}

pub async fn delete(
    manager: &SubsetManager,
    owner: &str,
    name: &str,
    format: OutputFormat,
) -> Result<()> {
    let result = manager.delete_subset(owner, name).await?;
    if format.is_machine_readable() {
        return output::print_success(format, &result);
    }

    match &result.outcome {
        DeleteOutcome::Dropped => {
            println!("{} Deleted subset '{}'", "✔".green(), result.name.bold());
        }
        DeleteOutcome::AlreadyAbsent => {
            println!(
                "{} Subset '{}' was already gone",
                "✔".green(),
                result.name.bold()
            );
        }
        DeleteOutcome::Deferred { reason } => {
            println!(
                "{} Could not drop {}: {}",
                "⚠".yellow(),
                result.table.cyan(),
                reason
            );
            println!(
                "  The name stays reserved until `quarry subset list` retries the drop."
            );
        }
    }
    Ok(())
}
