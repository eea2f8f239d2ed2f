//! Fair-probability estimation.
//!
//! Produces a deterministic baseline `p0` from the market snapshot alone:
//! a registry of named pure rules, evaluated in order, first match wins.
//! No hidden state — the same market always yields the same estimate.
//! Externally supplied judgments replace the baseline through the
//! integrity merge; an override is all-or-nothing.

use tracing::debug;

use crate::analysis::merge::{merge, MergeResult};
use crate::analysis::AnalysisRecord;
use crate::config::StalenessPolicy;
use crate::types::{EstimateSource, FairEstimate, IntegrityStatus, Market};

// ---------------------------------------------------------------------------
// Rule registry
// ---------------------------------------------------------------------------

/// One named, independently testable heuristic rule.
pub struct HeuristicRule {
    pub name: &'static str,
    /// Whether the rule applies to this market.
    applies: fn(&Market) -> bool,
    /// Baseline probability. Only called when `applies` holds.
    estimate: fn(&Market) -> f64,
    /// Short rationale attached to the estimate.
    note: &'static str,
}

impl HeuristicRule {
    pub fn applies(&self, market: &Market) -> bool {
        (self.applies)(market)
    }

    pub fn estimate(&self, market: &Market) -> f64 {
        (self.estimate)(market)
    }

    pub fn note(&self) -> &'static str {
        self.note
    }
}

/// The default rule set, in evaluation order.
///
/// Longshots and crowded favorites are handled before any domain logic;
/// fundamentals-heavy domains stay close to the market; everything else
/// gets the narrative fade.
pub fn default_rules() -> &'static [HeuristicRule] {
    &DEFAULT_RULES
}

static DEFAULT_RULES: [HeuristicRule; 4] = [
    HeuristicRule {
        name: "longshot-fade",
        applies: |m| m.s <= 0.10,
        estimate: |_| 0.04,
        note: "Longshot fade baseline",
    },
    HeuristicRule {
        name: "favorite-trim",
        applies: |m| m.s >= 0.90,
        estimate: |_| 0.90,
        note: "Crowded favorite; trimmed p",
    },
    HeuristicRule {
        name: "fundamentals-shrink",
        applies: |m| m.domain.is_fundamentals(),
        estimate: |m| 0.5 + 0.5 * (m.s - 0.5),
        note: "Fundamentals-heavy; mild shrink toward even",
    },
    HeuristicRule {
        name: "narrative-fade",
        applies: |_| true,
        estimate: |m| {
            let p_raw = 0.5 + 0.3 * (m.s - 0.5);
            let p_adj = if m.s > 0.65 {
                p_raw - 0.10 // trim optimism
            } else if m.s < 0.35 {
                p_raw + 0.10 // trim pessimism
            } else {
                p_raw
            };
            p_adj.clamp(0.01, 0.99)
        },
        note: "Narrative domain; faded toward even",
    },
];

// ---------------------------------------------------------------------------
// Estimator
// ---------------------------------------------------------------------------

/// Composes the rule registry into a per-market estimate.
pub struct Estimator {
    rules: &'static [HeuristicRule],
}

impl Default for Estimator {
    fn default() -> Self {
        Self::new()
    }
}

impl Estimator {
    pub fn new() -> Self {
        Self {
            rules: default_rules(),
        }
    }

    /// Build an estimator over a custom rule set (tests, experiments).
    pub fn with_rules(rules: &'static [HeuristicRule]) -> Self {
        Self { rules }
    }

    /// Heuristic baseline for one market.
    ///
    /// Degrades gracefully: when no rule applies, the market price itself
    /// is returned — zero edge, never a failure.
    pub fn estimate(&self, market: &Market) -> FairEstimate {
        for rule in self.rules {
            if rule.applies(market) {
                let p0 = rule.estimate(market);
                debug!(
                    market_id = %market.id,
                    rule = rule.name,
                    p0 = format!("{:.3}", p0),
                    s = format!("{:.3}", market.s),
                    "Heuristic baseline"
                );
                return FairEstimate {
                    p0,
                    source: EstimateSource::Heuristic {
                        rule: rule.name.to_string(),
                    },
                    reason: rule.note().to_string(),
                    max_avg_price: None,
                    price_bought: None,
                    integrity: IntegrityStatus::Clean,
                };
            }
        }

        FairEstimate {
            p0: market.s,
            source: EstimateSource::Heuristic {
                rule: "market-price".to_string(),
            },
            reason: "No heuristic rule applies; holding the market price".to_string(),
            max_avg_price: None,
            price_bought: None,
            integrity: IntegrityStatus::Clean,
        }
    }

    /// Heuristic baseline, superseded by an external record when one is
    /// present and passes integrity validation. Rejected overrides fall
    /// back to the heuristic; the rejection is reported in the result.
    pub fn estimate_with_override(
        &self,
        market: &Market,
        record: Option<&AnalysisRecord>,
        policy: &StalenessPolicy,
    ) -> MergeResult {
        let baseline = self.estimate(market);
        match record {
            Some(record) => merge(&baseline, record, market, policy),
            None => MergeResult {
                estimate: baseline,
                status: crate::analysis::merge::MergeStatus::Clean,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
