//! Data-integrity merge.
//!
//! Reconciles a held fair-probability estimate with an externally pasted
//! analysis record. The record is untrusted: it may be malformed, aimed
//! at the wrong market, or produced against a snapshot that has since
//! drifted. Validation runs in a fixed order — structural, identity,
//! staleness — and the merge is a pure function of its inputs: applying
//! the same record twice yields the identical estimate.

use tracing::{debug, warn};

use crate::analysis::AnalysisRecord;
use crate::config::StalenessPolicy;
use crate::types::{EngineError, EstimateSource, FairEstimate, IntegrityStatus, Market};

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Outcome of a merge attempt.
#[derive(Debug)]
pub enum MergeStatus {
    /// Override applied; snapshot (if any) matched the live market.
    Clean,
    /// Override applied, but the analysis snapshot has drifted materially
    /// from the live market. Human-reviewed judgment is not discarded;
    /// the drift is surfaced as a warning.
    Stale,
    /// Override rejected; the prior estimate is returned unchanged.
    Rejected(EngineError),
}

impl MergeStatus {
    pub fn is_applied(&self) -> bool {
        matches!(self, MergeStatus::Clean | MergeStatus::Stale)
    }
}

/// The estimate after the merge attempt, together with what happened.
#[derive(Debug)]
pub struct MergeResult {
    pub estimate: FairEstimate,
    pub status: MergeStatus,
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

/// Reconcile `current` with an external `record` targeting `market`.
///
/// On rejection no partial field is applied: the override is
/// all-or-nothing at the estimate level.
pub fn merge(
    current: &FairEstimate,
    record: &AnalysisRecord,
    market: &Market,
    policy: &StalenessPolicy,
) -> MergeResult {
    // 1. Structural validation
    if let Err(e) = validate_structure(record) {
        warn!(market_id = %market.id, error = %e, "Override rejected");
        return MergeResult {
            estimate: current.clone(),
            status: MergeStatus::Rejected(e),
        };
    }

    // 2. Identity validation
    if record.market_id != market.id {
        let e = EngineError::MarketMismatch {
            expected: market.id.clone(),
            found: record.market_id.clone(),
        };
        warn!(market_id = %market.id, error = %e, "Override rejected");
        return MergeResult {
            estimate: current.clone(),
            status: MergeStatus::Rejected(e),
        };
    }

    // 3. Staleness check — a warning, never a rejection
    let integrity = match &record.as_of_snapshot {
        Some(snap) if is_stale(snap.s, snap.volume, market, policy) => IntegrityStatus::Stale,
        _ => IntegrityStatus::Clean,
    };

    if integrity == IntegrityStatus::Stale {
        debug!(
            market_id = %market.id,
            live_s = market.s,
            snapshot_s = record.as_of_snapshot.as_ref().map(|s| s.s),
            "Analysis snapshot drifted; applying with stale warning"
        );
    }

    let reason = if record.reason.trim().is_empty() {
        "No rationale provided.".to_string()
    } else {
        record.reason.clone()
    };

    let estimate = FairEstimate {
        p0: record.p0,
        source: EstimateSource::Override,
        reason,
        max_avg_price: record.max_avg_price,
        price_bought: record.price_bought,
        integrity,
    };

    let status = match integrity {
        IntegrityStatus::Clean => MergeStatus::Clean,
        IntegrityStatus::Stale => MergeStatus::Stale,
    };

    MergeResult { estimate, status }
}

/// The record must carry a numeric `p0` in [0, 1]; reported execution
/// prices, when present, must themselves be valid prices.
fn validate_structure(record: &AnalysisRecord) -> Result<(), EngineError> {
    if !record.p0.is_finite() || !(0.0..=1.0).contains(&record.p0) {
        return Err(EngineError::MalformedAnalysis(format!(
            "p0 out of range: {}",
            record.p0
        )));
    }
    for (name, value) in [
        ("max_avg_price", record.max_avg_price),
        ("price_bought", record.price_bought),
    ] {
        if let Some(v) = value {
            if !v.is_finite() || !(0.0..=1.0).contains(&v) {
                return Err(EngineError::MalformedAnalysis(format!(
                    "{name} out of range: {v}"
                )));
            }
        }
    }
    Ok(())
}

/// Material divergence between the analysis snapshot and the live market.
/// Volume drift is relative to the live volume, floored at 1 so tiny
/// markets do not flap.
fn is_stale(snap_s: f64, snap_volume: f64, market: &Market, policy: &StalenessPolicy) -> bool {
    if (snap_s - market.s).abs() > policy.max_price_drift {
        return true;
    }
    let drift = (snap_volume - market.volume).abs() / market.volume.max(1.0);
    drift > policy.max_volume_drift
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
