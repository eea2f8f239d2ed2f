//! Recommendation pipeline — estimation, integrity merge, Kelly sizing,
//! and ranking.

pub mod estimator;
pub mod kelly;
pub mod rank;

use tracing::{debug, info, warn};

use crate::analysis::merge::MergeStatus;
use crate::analysis::AnalysisIndex;
use crate::config::{AppConfig, StalenessPolicy};
use crate::types::{EngineError, Market, Recommendation};
use estimator::Estimator;
use kelly::KellyEngine;
use rank::Ranker;

// ---------------------------------------------------------------------------
// Batch outcome
// ---------------------------------------------------------------------------

/// A per-market failure, reported alongside the successful
/// recommendations rather than aborting the batch.
#[derive(Debug)]
pub struct MarketFailure {
    pub market_id: String,
    pub error: EngineError,
}

/// Everything one pipeline pass produced.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Filtered and ordered recommendations.
    pub recommendations: Vec<Recommendation>,
    /// Markets that produced no recommendation at all.
    pub skipped: Vec<MarketFailure>,
    /// Overrides that failed validation; the heuristic estimate was kept
    /// and the market still has a recommendation.
    pub rejected_overrides: Vec<MarketFailure>,
    /// Market ids whose override was applied with a staleness warning.
    pub stale: Vec<String>,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Pipelines heuristic estimation → override merge → Kelly sizing →
/// ranking over a batch of market snapshots.
///
/// Instantiate once per configuration; `run` is stateless between calls,
/// so batches can run concurrently with different configurations.
pub struct Pipeline {
    estimator: Estimator,
    engine: KellyEngine,
    ranker: Ranker,
    staleness: StalenessPolicy,
}

impl Pipeline {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            estimator: Estimator::new(),
            engine: KellyEngine::new(config.sizing.clone()),
            ranker: Ranker::new(config.ranking.clone()),
            staleness: config.staleness.clone(),
        }
    }

    /// Run the full pipeline for a batch of markets and any pending
    /// external analysis records.
    ///
    /// Failures are isolated to the offending market: a bad price or a
    /// rejected override never aborts the rest of the batch.
    pub fn run(&self, markets: &[Market], analysis: &AnalysisIndex) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        let mut sized: Vec<Recommendation> = Vec::new();

        for market in markets {
            let merged = self.estimator.estimate_with_override(
                market,
                analysis.get(&market.id),
                &self.staleness,
            );

            match merged.status {
                MergeStatus::Clean => {}
                MergeStatus::Stale => {
                    warn!(market_id = %market.id, "Override applied from a stale snapshot");
                    outcome.stale.push(market.id.clone());
                }
                MergeStatus::Rejected(error) => {
                    warn!(market_id = %market.id, %error, "Override rejected; keeping heuristic");
                    outcome.rejected_overrides.push(MarketFailure {
                        market_id: market.id.clone(),
                        error,
                    });
                }
            }

            match self.engine.size(market, &merged.estimate) {
                Ok(rec) => {
                    debug!(market_id = %market.id, signal = ?rec.signal, "Recommendation built");
                    sized.push(rec);
                }
                Err(error) => {
                    warn!(market_id = %market.id, %error, "Market skipped");
                    outcome.skipped.push(MarketFailure {
                        market_id: market.id.clone(),
                        error,
                    });
                }
            }
        }

        outcome.recommendations = self.ranker.rank(sized);

        info!(
            markets_in = markets.len(),
            recommendations = outcome.recommendations.len(),
            skipped = outcome.skipped.len(),
            rejected_overrides = outcome.rejected_overrides.len(),
            stale = outcome.stale.len(),
            "Pipeline pass complete"
        );

        outcome
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
