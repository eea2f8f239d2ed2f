//! Kelly criterion stake sizing.
//!
//! Turns a fair-probability estimate and a market price into a sized,
//! signed recommendation under the configured risk mode. Pure
//! computation: no side effects, failures isolated to the single market.

use tracing::debug;

use crate::config::SizingConfig;
use crate::types::{EngineError, FairEstimate, Market, Recommendation, Side, Signal};

// ---------------------------------------------------------------------------
// Raw fractions
// ---------------------------------------------------------------------------

/// Raw Kelly fractions `(yes, no)` for fair probability `p0` against
/// market price `s`.
///
/// Yes side: `f* = (p0 - s) / (1 - s)`; No side mirrors with the
/// complementary probabilities, which reduces to `(s - p0) / s`.
/// A side with no edge yields 0. Inputs are assumed validated; the
/// degenerate prices `s = 0` and `s = 1` yield 0 for the side that would
/// divide by zero.
pub fn kelly_fractions(p0: f64, s: f64) -> (f64, f64) {
    let yes = if p0 > s && s < 1.0 {
        (p0 - s) / (1.0 - s)
    } else {
        0.0
    };
    let no = if p0 < s && s > 0.0 {
        (s - p0) / s
    } else {
        0.0
    };
    (yes, no)
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Stake sizer. Construct once per configuration; `size` is pure.
pub struct KellyEngine {
    config: SizingConfig,
}

impl KellyEngine {
    pub fn new(config: SizingConfig) -> Self {
        Self { config }
    }

    /// Access the sizing configuration.
    pub fn config(&self) -> &SizingConfig {
        &self.config
    }

    /// Size a stake for one market against its fair estimate.
    ///
    /// Guarantees `0 <= stake_amount <= bankroll`. Fails with
    /// `InvalidProbability` when `p0` or `s` leaves [0, 1] (out-of-range
    /// values are rejected, never clamped — clamping would hide upstream
    /// data errors) and with `InvalidBankroll` when the bankroll is
    /// negative.
    pub fn size(
        &self,
        market: &Market,
        estimate: &FairEstimate,
    ) -> Result<Recommendation, EngineError> {
        let p0 = estimate.p0;
        let s = market.s;

        if !p0.is_finite() || !(0.0..=1.0).contains(&p0) {
            return Err(EngineError::InvalidProbability { field: "p0", value: p0 });
        }
        if !s.is_finite() || !(0.0..=1.0).contains(&s) {
            return Err(EngineError::InvalidProbability { field: "s", value: s });
        }
        let bankroll = self.config.bankroll;
        if !bankroll.is_finite() || bankroll < 0.0 {
            return Err(EngineError::InvalidBankroll(bankroll));
        }

        let edge = p0 - s;

        // Resolved / degenerate market — nothing left to bet on.
        if s == 0.0 || s == 1.0 {
            debug!(market_id = %market.id, s, "Degenerate price — skipping");
            return Ok(self.build(market, estimate, edge, pick_side(edge), 0.0, Signal::Skip));
        }

        let (f_yes, f_no) = kelly_fractions(p0, s);

        // No positive fraction on either side: no edge, keep the record
        // visible but unsized.
        if f_yes <= 0.0 && f_no <= 0.0 {
            return Ok(self.build(market, estimate, edge, pick_side(edge), 0.0, Signal::Skip));
        }

        let (side, fraction) = if f_yes >= f_no {
            (Side::Yes, f_yes)
        } else {
            (Side::No, f_no)
        };

        let signal = if edge.abs() < self.config.min_edge {
            Signal::InsufficientEdge
        } else {
            Signal::Bet
        };

        debug!(
            market_id = %market.id,
            side = %side,
            signal = ?signal,
            kelly = format!("{:.2}%", fraction * 100.0),
            edge = format!("{:+.2}%", edge * 100.0),
            "Stake sized"
        );

        Ok(self.build(market, estimate, edge, side, fraction, signal))
    }

    /// Assemble the recommendation, applying the risk scalar and clamps.
    /// The risk mode scales magnitude only; it never flips sign or side.
    fn build(
        &self,
        market: &Market,
        estimate: &FairEstimate,
        edge: f64,
        side: Side,
        kelly_fraction: f64,
        signal: Signal,
    ) -> Recommendation {
        // A fraction above 1 is a data anomaly, not an instruction to
        // leverage.
        let risk_adjusted = match signal {
            Signal::Bet => {
                (kelly_fraction * self.config.risk_mode.multiplier()).clamp(0.0, 1.0)
            }
            Signal::InsufficientEdge | Signal::Skip => 0.0,
        };

        Recommendation {
            market: market.clone(),
            estimate: estimate.clone(),
            s: market.s,
            p0: estimate.p0,
            edge,
            kelly_fraction,
            risk_adjusted_fraction: risk_adjusted,
            stake_amount: self.config.bankroll * risk_adjusted,
            side,
            signal,
        }
    }
}

/// Side preference for unsized records: positive edge reads Yes, negative
/// reads No, with Yes on the exact tie.
fn pick_side(edge: f64) -> Side {
    if edge >= 0.0 {
        Side::Yes
    } else {
        Side::No
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
