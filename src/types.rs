//! Shared types for the TIPSTER recommendation engine.
//!
//! These types form the data model used across all modules.
//! They are designed to be stable so that the estimator, analysis,
//! and strategy modules can depend on them without circular references.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Market
// ---------------------------------------------------------------------------

/// A snapshot of a binary prediction-market contract.
///
/// Fetched by an external collaborator; the engine treats it as an
/// immutable input and never mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    pub id: String,
    pub title: String,
    /// The binary outcome this price refers to (e.g. "Yes", "Below 3.5%").
    pub outcome: String,
    pub domain: MarketDomain,
    /// Market-implied probability for this outcome (0.0–1.0).
    pub s: f64,
    /// Traded volume in `currency` units.
    pub volume: f64,
    pub currency: String,
    pub created_at: Option<DateTime<Utc>>,
    pub closes_at: Option<DateTime<Utc>>,
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} — {} (s: {:.0}¢ | vol: {:.0} {})",
            self.domain,
            self.title,
            self.outcome,
            self.s * 100.0,
            self.volume,
            self.currency,
        )
    }
}

impl Market {
    /// Days until the market stops accepting bets. `None` when the close
    /// time is unknown.
    pub fn days_to_close(&self) -> Option<f64> {
        self.closes_at
            .map(|end| (end - Utc::now()).num_seconds() as f64 / 86_400.0)
    }

    /// Whether the market is still open for betting. Markets without a
    /// close time are assumed open.
    pub fn is_open(&self) -> bool {
        self.closes_at.map(|end| end > Utc::now()).unwrap_or(true)
    }

    /// Helper to build a test market with sensible defaults.
    #[cfg(test)]
    pub fn sample() -> Self {
        Market {
            id: "mkt-001".to_string(),
            title: "Will CPI come in below 3.5% for Q1?".to_string(),
            outcome: "Yes".to_string(),
            domain: MarketDomain::Finance,
            s: 0.42,
            volume: 12_500.0,
            currency: "USDC".to_string(),
            created_at: Some(Utc::now() - chrono::Duration::days(10)),
            closes_at: Some(Utc::now() + chrono::Duration::days(30)),
        }
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Bet direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Yes,
    No,
}

impl Side {
    /// The opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Side::Yes => Side::No,
            Side::No => Side::Yes,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Yes => write!(f, "YES"),
            Side::No => write!(f, "NO"),
        }
    }
}

/// Market domain, used to route the market to the right heuristic rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketDomain {
    Finance,
    Science,
    Sports,
    Politics,
    Entertainment,
    Other,
}

impl MarketDomain {
    /// All known domains (useful for iteration).
    pub const ALL: &'static [MarketDomain] = &[
        MarketDomain::Finance,
        MarketDomain::Science,
        MarketDomain::Sports,
        MarketDomain::Politics,
        MarketDomain::Entertainment,
        MarketDomain::Other,
    ];

    /// Fundamentals-heavy domains where the market price already embeds
    /// broad consensus (macro data, hard science).
    pub fn is_fundamentals(&self) -> bool {
        matches!(self, MarketDomain::Finance | MarketDomain::Science)
    }
}

impl fmt::Display for MarketDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketDomain::Finance => write!(f, "Finance"),
            MarketDomain::Science => write!(f, "Science"),
            MarketDomain::Sports => write!(f, "Sports"),
            MarketDomain::Politics => write!(f, "Politics"),
            MarketDomain::Entertainment => write!(f, "Entertainment"),
            MarketDomain::Other => write!(f, "Other"),
        }
    }
}

/// Attempt to parse a string into a MarketDomain (case-insensitive).
impl std::str::FromStr for MarketDomain {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "finance" | "economics" | "crypto" => Ok(MarketDomain::Finance),
            "science" | "tech" | "technology" => Ok(MarketDomain::Science),
            "sports" | "sport" => Ok(MarketDomain::Sports),
            "politics" | "political" | "election" => Ok(MarketDomain::Politics),
            "entertainment" | "culture" | "celebrity" => Ok(MarketDomain::Entertainment),
            "other" => Ok(MarketDomain::Other),
            _ => Err(anyhow::anyhow!("Unknown market domain: {s}")),
        }
    }
}

/// Qualitative verdict attached to a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    /// Positive Kelly fraction and edge above the configured threshold.
    Bet,
    /// Positive Kelly fraction but edge below the threshold — visible,
    /// not sized.
    InsufficientEdge,
    /// No positive Kelly fraction on either side, or a degenerate market.
    Skip,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Bet => write!(f, "BET"),
            Signal::InsufficientEdge => write!(f, "THIN"),
            Signal::Skip => write!(f, "SKIP"),
        }
    }
}

// ---------------------------------------------------------------------------
// Fair-probability estimate
// ---------------------------------------------------------------------------

/// Where a fair-probability estimate came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EstimateSource {
    /// Deterministic baseline produced by a named heuristic rule.
    Heuristic { rule: String },
    /// Externally supplied human/AI judgment that passed integrity
    /// validation.
    Override,
}

impl fmt::Display for EstimateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EstimateSource::Heuristic { rule } => write!(f, "heuristic({rule})"),
            EstimateSource::Override => write!(f, "override"),
        }
    }
}

/// Whether an estimate was verified against a fresh market snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityStatus {
    Clean,
    /// The analysis was produced against a snapshot that has since
    /// drifted materially. Applied anyway; surfaced as a warning.
    Stale,
}

impl fmt::Display for IntegrityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityStatus::Clean => write!(f, "clean"),
            IntegrityStatus::Stale => write!(f, "stale"),
        }
    }
}

/// Estimated true probability for a market, with provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FairEstimate {
    /// Estimated true probability of the outcome (0.0–1.0).
    pub p0: f64,
    pub source: EstimateSource,
    /// Free-text rationale.
    pub reason: String,
    /// Externally reported execution constraint: worst acceptable average
    /// fill price.
    pub max_avg_price: Option<f64>,
    /// Externally reported price already paid, if a position was opened.
    pub price_bought: Option<f64>,
    pub integrity: IntegrityStatus,
}

impl fmt::Display for FairEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "p0={:.1}% [{}] ({})",
            self.p0 * 100.0,
            self.source,
            self.integrity,
        )
    }
}

// ---------------------------------------------------------------------------
// Recommendation
// ---------------------------------------------------------------------------

/// A fully computed stake recommendation for one market.
///
/// `edge` and the Kelly fractions are always recomputed from `(p0, s)`;
/// they are never stored independently of their inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub market: Market,
    pub estimate: FairEstimate,
    /// Market-implied probability at computation time.
    pub s: f64,
    /// Fair probability used for sizing.
    pub p0: f64,
    /// Signed edge: `p0 - s`. Positive favors Yes, negative favors No.
    pub edge: f64,
    /// Raw Kelly fraction for the chosen side.
    pub kelly_fraction: f64,
    /// Kelly fraction after the risk-mode scalar, clamped to [0, 1].
    pub risk_adjusted_fraction: f64,
    /// `bankroll * risk_adjusted_fraction`, in bankroll currency.
    pub stake_amount: f64,
    pub side: Side,
    pub signal: Signal,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} | s={:.0}% p0={:.0}% edge={:+.1}% | kelly={:.1}% stake={:.2}",
            self.signal,
            self.side,
            self.market.title,
            self.s * 100.0,
            self.p0 * 100.0,
            self.edge * 100.0,
            self.risk_adjusted_fraction * 100.0,
            self.stake_amount,
        )
    }
}

impl Recommendation {
    /// Convenience accessor for the market id.
    pub fn market_id(&self) -> &str {
        &self.market.id
    }

    /// Edge magnitude regardless of side.
    pub fn abs_edge(&self) -> f64 {
        self.edge.abs()
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for TIPSTER.
///
/// Every variant is fatal to a single per-market computation, never to the
/// batch: the pipeline records the failure and moves on.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid probability for {field}: {value} (must be in [0, 1])")]
    InvalidProbability { field: &'static str, value: f64 },

    #[error("Invalid bankroll: {0} (must be >= 0)")]
    InvalidBankroll(f64),

    #[error("Malformed analysis record: {0}")]
    MalformedAnalysis(String),

    #[error("Analysis targets market {found}, expected {expected}")]
    MarketMismatch { expected: String, found: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- Side tests --

    #[test]
    fn test_side_display() {
        assert_eq!(format!("{}", Side::Yes), "YES");
        assert_eq!(format!("{}", Side::No), "NO");
    }

    #[test]
    fn test_side_opposite() {
        assert_eq!(Side::Yes.opposite(), Side::No);
        assert_eq!(Side::No.opposite(), Side::Yes);
    }

    #[test]
    fn test_side_serialization_roundtrip() {
        let yes_json = serde_json::to_string(&Side::Yes).unwrap();
        assert_eq!(yes_json, "\"Yes\"");
        let yes: Side = serde_json::from_str(&yes_json).unwrap();
        assert_eq!(yes, Side::Yes);
    }

    // -- MarketDomain tests --

    #[test]
    fn test_domain_display() {
        assert_eq!(format!("{}", MarketDomain::Finance), "Finance");
        assert_eq!(format!("{}", MarketDomain::Other), "Other");
    }

    #[test]
    fn test_domain_from_str() {
        assert_eq!("finance".parse::<MarketDomain>().unwrap(), MarketDomain::Finance);
        assert_eq!("SPORTS".parse::<MarketDomain>().unwrap(), MarketDomain::Sports);
        assert_eq!("election".parse::<MarketDomain>().unwrap(), MarketDomain::Politics);
        assert_eq!("culture".parse::<MarketDomain>().unwrap(), MarketDomain::Entertainment);
        assert!("nonsense".parse::<MarketDomain>().is_err());
    }

    #[test]
    fn test_domain_is_fundamentals() {
        assert!(MarketDomain::Finance.is_fundamentals());
        assert!(MarketDomain::Science.is_fundamentals());
        assert!(!MarketDomain::Politics.is_fundamentals());
        assert!(!MarketDomain::Other.is_fundamentals());
    }

    #[test]
    fn test_domain_serialization_roundtrip() {
        for domain in MarketDomain::ALL {
            let json = serde_json::to_string(domain).unwrap();
            let parsed: MarketDomain = serde_json::from_str(&json).unwrap();
            assert_eq!(*domain, parsed);
        }
    }

    // -- Signal tests --

    #[test]
    fn test_signal_display() {
        assert_eq!(format!("{}", Signal::Bet), "BET");
        assert_eq!(format!("{}", Signal::InsufficientEdge), "THIN");
        assert_eq!(format!("{}", Signal::Skip), "SKIP");
    }

    #[test]
    fn test_signal_serialization_roundtrip() {
        for signal in [Signal::Bet, Signal::InsufficientEdge, Signal::Skip] {
            let json = serde_json::to_string(&signal).unwrap();
            let parsed: Signal = serde_json::from_str(&json).unwrap();
            assert_eq!(signal, parsed);
        }
    }

    // -- Market tests --

    #[test]
    fn test_market_serialization_roundtrip() {
        let market = Market::sample();
        let json = serde_json::to_string(&market).unwrap();
        let parsed: Market = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, "mkt-001");
        assert_eq!(parsed.domain, MarketDomain::Finance);
        assert!((parsed.s - 0.42).abs() < 1e-10);
    }

    #[test]
    fn test_market_days_to_close() {
        let market = Market::sample(); // closes in 30 days
        let days = market.days_to_close().unwrap();
        assert!(days > 29.9 && days < 30.1);

        let mut no_close = Market::sample();
        no_close.closes_at = None;
        assert!(no_close.days_to_close().is_none());
    }

    #[test]
    fn test_market_is_open() {
        let market = Market::sample();
        assert!(market.is_open());

        let mut closed = Market::sample();
        closed.closes_at = Some(Utc::now() - chrono::Duration::days(1));
        assert!(!closed.is_open());

        let mut unknown = Market::sample();
        unknown.closes_at = None;
        assert!(unknown.is_open());
    }

    #[test]
    fn test_market_display() {
        let market = Market::sample();
        let display = format!("{market}");
        assert!(display.contains("Finance"));
        assert!(display.contains("CPI"));
    }

    // -- EstimateSource / IntegrityStatus tests --

    #[test]
    fn test_estimate_source_display() {
        let heuristic = EstimateSource::Heuristic {
            rule: "longshot-fade".to_string(),
        };
        assert_eq!(format!("{heuristic}"), "heuristic(longshot-fade)");
        assert_eq!(format!("{}", EstimateSource::Override), "override");
    }

    #[test]
    fn test_estimate_source_serialization_roundtrip() {
        let source = EstimateSource::Heuristic {
            rule: "favorite-trim".to_string(),
        };
        let json = serde_json::to_string(&source).unwrap();
        let parsed: EstimateSource = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, source);
    }

    #[test]
    fn test_integrity_status_display() {
        assert_eq!(format!("{}", IntegrityStatus::Clean), "clean");
        assert_eq!(format!("{}", IntegrityStatus::Stale), "stale");
    }

    // -- FairEstimate tests --

    #[test]
    fn test_fair_estimate_serialization_roundtrip() {
        let estimate = FairEstimate {
            p0: 0.62,
            source: EstimateSource::Override,
            reason: "Polling average moved".to_string(),
            max_avg_price: Some(0.58),
            price_bought: None,
            integrity: IntegrityStatus::Stale,
        };
        let json = serde_json::to_string(&estimate).unwrap();
        let parsed: FairEstimate = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, estimate);
    }

    #[test]
    fn test_fair_estimate_display() {
        let estimate = FairEstimate {
            p0: 0.73,
            source: EstimateSource::Heuristic {
                rule: "narrative-fade".to_string(),
            },
            reason: String::new(),
            max_avg_price: None,
            price_bought: None,
            integrity: IntegrityStatus::Clean,
        };
        let display = format!("{estimate}");
        assert!(display.contains("73.0%"));
        assert!(display.contains("narrative-fade"));
        assert!(display.contains("clean"));
    }

    // -- Recommendation tests --

    fn make_recommendation() -> Recommendation {
        Recommendation {
            market: Market::sample(),
            estimate: FairEstimate {
                p0: 0.55,
                source: EstimateSource::Heuristic {
                    rule: "narrative-fade".to_string(),
                },
                reason: String::new(),
                max_avg_price: None,
                price_bought: None,
                integrity: IntegrityStatus::Clean,
            },
            s: 0.42,
            p0: 0.55,
            edge: 0.13,
            kelly_fraction: 0.2241,
            risk_adjusted_fraction: 0.1121,
            stake_amount: 112.1,
            side: Side::Yes,
            signal: Signal::Bet,
        }
    }

    #[test]
    fn test_recommendation_accessors() {
        let rec = make_recommendation();
        assert_eq!(rec.market_id(), "mkt-001");
        assert!((rec.abs_edge() - 0.13).abs() < 1e-10);
    }

    #[test]
    fn test_recommendation_display() {
        let rec = make_recommendation();
        let display = format!("{rec}");
        assert!(display.contains("BET"));
        assert!(display.contains("YES"));
        assert!(display.contains("+13.0%"));
    }

    #[test]
    fn test_recommendation_serialization_roundtrip() {
        let rec = make_recommendation();
        let json = serde_json::to_string(&rec).unwrap();
        let parsed: Recommendation = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.market.id, "mkt-001");
        assert_eq!(parsed.side, Side::Yes);
        assert_eq!(parsed.signal, Signal::Bet);
        assert!((parsed.stake_amount - 112.1).abs() < 1e-10);
    }

    // -- EngineError tests --

    #[test]
    fn test_engine_error_display() {
        let e = EngineError::InvalidProbability {
            field: "p0",
            value: 1.5,
        };
        assert_eq!(format!("{e}"), "Invalid probability for p0: 1.5 (must be in [0, 1])");

        let e = EngineError::MarketMismatch {
            expected: "mkt-001".to_string(),
            found: "mkt-002".to_string(),
        };
        assert!(format!("{e}").contains("mkt-002"));
        assert!(format!("{e}").contains("mkt-001"));
    }
}
