use super::helpers::{human_bytes, paint_tier};
use crate::output::{self, OutputFormat};
use anyhow::Result;
use owo_colors::OwoColorize;
use quarry_common::models::EstimateRequest;
use quarry_runtime::SubsetManager;

pub async fn estimate(
    manager: &SubsetManager,
    request: EstimateRequest,
    format: OutputFormat,
) -> Result<()> {
    let result = manager.estimate_cost(request).await?;
    if format.is_machine_readable() {
        return output::print_success(format, &result);
    }

    let estimate = &result.estimate;
    println!("{}", result.sql.dimmed());
    println!(
        "{} {} scanned ({:.2} GB), about ${:.4}",
        result.source_table.as_str().cyan(),
        human_bytes(estimate.bytes_scanned),
        estimate.gb_processed,
        estimate.estimated_cost_usd
    );
    println!("{}: {}", paint_tier(estimate.tier), estimate.advisory);
    Ok(())
}
