//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Every field has a default so a missing file or a partial file still
//! yields a usable configuration; batches can run concurrently with
//! different configurations because nothing here is global.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;

use crate::types::EngineError;

// ---------------------------------------------------------------------------
// Risk mode
// ---------------------------------------------------------------------------

/// Kelly damping mode. The only risk lever: scales the Kelly fraction's
/// magnitude, never its sign or the side decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskMode {
    Half,
    Full,
}

impl RiskMode {
    /// Scalar applied to the raw Kelly fraction.
    pub fn multiplier(&self) -> f64 {
        match self {
            RiskMode::Half => 0.5,
            RiskMode::Full => 1.0,
        }
    }
}

impl Default for RiskMode {
    fn default() -> Self {
        RiskMode::Half
    }
}

impl fmt::Display for RiskMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskMode::Half => write!(f, "half"),
            RiskMode::Full => write!(f, "full"),
        }
    }
}

impl std::str::FromStr for RiskMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "half" => Ok(RiskMode::Half),
            "full" => Ok(RiskMode::Full),
            _ => Err(anyhow::anyhow!("Unknown risk mode: {s} (expected half|full)")),
        }
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Sizing parameters consumed by the Kelly engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SizingConfig {
    /// Bankroll in account currency. Must be >= 0.
    pub bankroll: f64,
    pub risk_mode: RiskMode,
    /// Minimum |edge| for a recommendation to be sized. Below this the
    /// market stays visible but unsized.
    pub min_edge: f64,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            bankroll: 1000.0,
            risk_mode: RiskMode::Half,
            min_edge: 0.02, // 2 percentage points
        }
    }
}

/// Tolerances for deciding when an external analysis snapshot has drifted
/// too far from the live market to be considered fresh. Divergence beyond
/// either bound marks the merge stale; the override is still applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StalenessPolicy {
    /// Absolute price drift, in probability points.
    pub max_price_drift: f64,
    /// Relative volume drift, as a fraction of the live volume.
    pub max_volume_drift: f64,
}

impl Default for StalenessPolicy {
    fn default() -> Self {
        Self {
            max_price_drift: 0.05,
            max_volume_drift: 0.5,
        }
    }
}

/// Primary ordering key for ranked output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Stake,
    Edge,
}

impl Default for SortKey {
    fn default() -> Self {
        SortKey::Stake
    }
}

/// Filtering and ordering parameters for the ranker. Every filter is
/// optional; `None` means the predicate passes everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    pub sort_by: SortKey,
    pub min_edge: Option<f64>,
    pub min_volume: Option<f64>,
    pub max_volume: Option<f64>,
    pub currency: Option<String>,
    /// Case-insensitive substring match over title and outcome.
    pub search: Option<String>,
    pub max_days_to_close: Option<f64>,
}

// ---------------------------------------------------------------------------
// Top-level configuration
// ---------------------------------------------------------------------------

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub sizing: SizingConfig,
    pub staleness: StalenessPolicy,
    pub ranking: RankingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the engine could not run with.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !self.sizing.bankroll.is_finite() || self.sizing.bankroll < 0.0 {
            return Err(EngineError::Config(format!(
                "bankroll must be a finite number >= 0, got {}",
                self.sizing.bankroll
            )));
        }
        if !self.sizing.min_edge.is_finite() || self.sizing.min_edge < 0.0 {
            return Err(EngineError::Config(format!(
                "min_edge must be a finite number >= 0, got {}",
                self.sizing.min_edge
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
