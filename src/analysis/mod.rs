//! Externally supplied analysis payloads.
//!
//! A human-in-the-loop workflow produces probability judgments outside
//! this process (research prompts pasted into an assistant, answers
//! pasted back). The payload arrives as a JSON mapping from market id to
//! a judgment record. Everything here is untrusted input: parsing is
//! lenient per record so one bad entry never discards the rest, and the
//! merge module validates each record before it may overwrite an
//! estimate.

pub mod merge;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use crate::types::EngineError;

// ---------------------------------------------------------------------------
// Payload model
// ---------------------------------------------------------------------------

/// Market state at the time the analysis was produced, for staleness
/// checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub s: f64,
    pub volume: f64,
}

/// One externally produced judgment for a single market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    /// Target market. Filled from the payload map key when omitted.
    #[serde(default)]
    pub market_id: String,
    /// Candidate fair probability.
    pub p0: f64,
    #[serde(default)]
    pub reason: String,
    pub max_avg_price: Option<f64>,
    pub price_bought: Option<f64>,
    pub as_of_snapshot: Option<Snapshot>,
}

/// Parsed payload, keyed by market id.
#[derive(Debug, Clone, Default)]
pub struct AnalysisIndex {
    records: BTreeMap<String, AnalysisRecord>,
}

impl AnalysisIndex {
    pub fn get(&self, market_id: &str) -> Option<&AnalysisRecord> {
        self.records.get(market_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AnalysisRecord)> {
        self.records.iter()
    }

    /// Insert a record directly (used by tests and callers that build
    /// records programmatically).
    pub fn insert(&mut self, record: AnalysisRecord) {
        self.records.insert(record.market_id.clone(), record);
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Result of parsing a payload: the usable records plus the entries that
/// failed structural deserialization, reported per market id.
#[derive(Debug, Default)]
pub struct ParsedPayload {
    pub records: AnalysisIndex,
    pub rejected: Vec<(String, EngineError)>,
}

/// Parse a pasted analysis payload.
///
/// The payload must be a JSON object mapping market id to a record.
/// Records that fail to deserialize are collected in `rejected` rather
/// than failing the whole import; a payload that is not a JSON object at
/// all fails with `MalformedAnalysis`.
pub fn parse_payload(json: &str) -> Result<ParsedPayload, EngineError> {
    let raw: BTreeMap<String, serde_json::Value> = serde_json::from_str(json)
        .map_err(|e| EngineError::MalformedAnalysis(format!("payload is not a JSON map: {e}")))?;

    let mut parsed = ParsedPayload::default();

    for (key, value) in raw {
        match serde_json::from_value::<AnalysisRecord>(value) {
            Ok(mut record) => {
                if record.market_id.is_empty() {
                    record.market_id = key.clone();
                }
                parsed.records.records.insert(key, record);
            }
            Err(e) => {
                warn!(market_id = %key, error = %e, "Rejected malformed analysis record");
                parsed
                    .rejected
                    .push((key, EngineError::MalformedAnalysis(e.to_string())));
            }
        }
    }

    Ok(parsed)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
