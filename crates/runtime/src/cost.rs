use quarry_common::config::CostSettings;
use quarry_common::models::{CostEstimate, CostTier};
use quarry_connectors::QueryEngine;
use quarry_error::{ErrorCode, ErrorContext, QuarryError, Result};

const BYTES_PER_GIB: f64 = (1u64 << 30) as f64;
const BYTES_PER_TIB: f64 = (1u64 << 40) as f64;

/// Turns dry-run byte counts into cost estimates and enforces the
/// materialization budget.
#[derive(Debug, Clone)]
pub struct CostEstimator {
    warn_threshold_bytes: u64,
    max_materialize_bytes: u64,
    price_per_tib_usd: f64,
}

impl CostEstimator {
    pub fn new(settings: &CostSettings) -> Self {
        Self {
            warn_threshold_bytes: settings.warn_threshold_bytes,
            max_materialize_bytes: settings.max_materialize_bytes,
            price_per_tib_usd: settings.price_per_tib_usd,
        }
    }

    pub fn assess(&self, bytes_scanned: u64) -> CostEstimate {
        let bytes = bytes_scanned as f64;
        let tier = if bytes_scanned > self.warn_threshold_bytes {
            CostTier::High
        } else if bytes_scanned > self.warn_threshold_bytes / 10 {
            CostTier::Moderate
        } else {
            CostTier::Low
        };

        CostEstimate {
            bytes_scanned,
            gb_processed: round_to(bytes / BYTES_PER_GIB, 2),
            estimated_cost_usd: round_to(bytes / BYTES_PER_TIB * self.price_per_tib_usd, 4),
            over_threshold: bytes_scanned > self.warn_threshold_bytes,
            tier,
            advisory: tier.advisory().to_string(),
        }
    }

    /// Dry-runs `sql` and assesses the result.
    pub async fn estimate(&self, engine: &dyn QueryEngine, sql: &str) -> Result<CostEstimate> {
        let bytes = engine
            .dry_run(sql)
            .await
            .map_err(|e| e.to_quarry_error(None))?;
        let estimate = self.assess(bytes);
        tracing::debug!(
            bytes_scanned = estimate.bytes_scanned,
            tier = %estimate.tier,
            "dry run complete"
        );
        Ok(estimate)
    }

    pub fn ensure_within_budget(&self, estimate: &CostEstimate) -> Result<()> {
        if estimate.bytes_scanned <= self.max_materialize_bytes {
            return Ok(());
        }
        Err(QuarryError::new(
            ErrorCode::BudgetExceeded,
            format!(
                "Materialization would scan {:.2} GB, above the {:.2} GB limit",
                estimate.gb_processed,
                self.max_materialize_bytes as f64 / BYTES_PER_GIB
            ),
        )
        .with_context(ErrorContext::BudgetExceeded {
            bytes_scanned: estimate.bytes_scanned,
            limit_bytes: self.max_materialize_bytes,
            suggestion: "Narrow the date range or select fewer columns".to_string(),
        })
        .with_hint("Raise cost.max_materialize_bytes only if the scan is intended"))
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimator() -> CostEstimator {
        CostEstimator::new(&CostSettings::default())
    }

    #[test]
    fn test_tiers_follow_warn_threshold() {
        let e = estimator();
        assert_eq!(e.assess(2 << 30).tier, CostTier::High);
        assert!(e.assess(2 << 30).over_threshold);
        assert_eq!(e.assess(200 << 20).tier, CostTier::Moderate);
        assert!(!e.assess(200 << 20).over_threshold);
        assert_eq!(e.assess(1 << 20).tier, CostTier::Low);
        assert_eq!(e.assess(1 << 30).tier, CostTier::Moderate);
    }

    #[test]
    fn test_cost_math() {
        let one_tib = e_assess(1u64 << 40);
        assert_eq!(one_tib.gb_processed, 1024.0);
        assert_eq!(one_tib.estimated_cost_usd, 5.0);

        let small = e_assess(1_500_000_000);
        assert_eq!(small.gb_processed, 1.4);
        assert_eq!(small.estimated_cost_usd, 0.0068);
    }

    fn e_assess(bytes: u64) -> CostEstimate {
        estimator().assess(bytes)
    }

    #[test]
    fn test_budget_gate() {
        let e = estimator();
        assert!(e.ensure_within_budget(&e.assess(100 << 30)).is_ok());

        let err = e.ensure_within_budget(&e.assess((100 << 30) + 1)).unwrap_err();
        assert_eq!(err.code, ErrorCode::BudgetExceeded);
        match err.context {
            Some(ErrorContext::BudgetExceeded { limit_bytes, .. }) => {
                assert_eq!(limit_bytes, 100 << 30)
            }
            other => panic!("unexpected context {:?}", other),
        }
    }
}
