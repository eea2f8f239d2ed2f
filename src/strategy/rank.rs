//! Recommendation filtering and ordering.
//!
//! Every filter is an independent pure predicate; a recommendation that
//! fails any predicate is excluded, not sorted last. Ordering is total
//! (`f64::total_cmp` plus an id tie-break) so identical inputs always
//! produce identical output.

use std::cmp::Ordering;
use tracing::debug;

use crate::config::{RankingConfig, SortKey};
use crate::types::Recommendation;

pub struct Ranker {
    config: RankingConfig,
}

impl Ranker {
    pub fn new(config: RankingConfig) -> Self {
        Self { config }
    }

    /// Access the ranking configuration.
    pub fn config(&self) -> &RankingConfig {
        &self.config
    }

    /// Filter and order a batch of recommendations.
    pub fn rank(&self, recommendations: Vec<Recommendation>) -> Vec<Recommendation> {
        let before = recommendations.len();
        let mut kept: Vec<Recommendation> = recommendations
            .into_iter()
            .filter(|r| self.retain(r))
            .collect();

        debug!(before, after = kept.len(), "Recommendations filtered");

        kept.sort_by(|a, b| self.order(a, b));
        kept
    }

    /// All predicates must hold for a recommendation to survive.
    fn retain(&self, rec: &Recommendation) -> bool {
        min_edge_ok(rec, self.config.min_edge)
            && volume_ok(rec, self.config.min_volume, self.config.max_volume)
            && currency_ok(rec, self.config.currency.as_deref())
            && search_ok(rec, self.config.search.as_deref())
            && recency_ok(rec, self.config.max_days_to_close)
    }

    /// Primary key per configuration (descending), then volume
    /// descending, then market id ascending.
    fn order(&self, a: &Recommendation, b: &Recommendation) -> Ordering {
        let primary = match self.config.sort_by {
            SortKey::Stake => b.stake_amount.total_cmp(&a.stake_amount),
            SortKey::Edge => b.abs_edge().total_cmp(&a.abs_edge()),
        };
        primary
            .then_with(|| b.market.volume.total_cmp(&a.market.volume))
            .then_with(|| a.market.id.cmp(&b.market.id))
    }
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

fn min_edge_ok(rec: &Recommendation, min_edge: Option<f64>) -> bool {
    min_edge.map(|min| rec.abs_edge() >= min).unwrap_or(true)
}

fn volume_ok(rec: &Recommendation, min: Option<f64>, max: Option<f64>) -> bool {
    let v = rec.market.volume;
    min.map(|m| v >= m).unwrap_or(true) && max.map(|m| v <= m).unwrap_or(true)
}

fn currency_ok(rec: &Recommendation, currency: Option<&str>) -> bool {
    currency
        .map(|c| rec.market.currency.eq_ignore_ascii_case(c))
        .unwrap_or(true)
}

/// Case-insensitive substring match over title and outcome.
fn search_ok(rec: &Recommendation, query: Option<&str>) -> bool {
    match query {
        None => true,
        Some(q) => {
            let q = q.to_lowercase();
            rec.market.title.to_lowercase().contains(&q)
                || rec.market.outcome.to_lowercase().contains(&q)
        }
    }
}

/// Markets with an unknown close time pass the recency filter.
fn recency_ok(rec: &Recommendation, max_days: Option<f64>) -> bool {
    match (max_days, rec.market.days_to_close()) {
        (Some(max), Some(days)) => days <= max,
        _ => true,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        EstimateSource, FairEstimate, IntegrityStatus, Market, MarketDomain, Side, Signal,
    };
    use chrono::{Duration, Utc};

    fn make_rec(id: &str, edge: f64, stake: f64, volume: f64) -> Recommendation {
        let market = Market {
            id: id.to_string(),
            title: format!("Market {id}"),
            outcome: "Yes".to_string(),
            domain: MarketDomain::Other,
            s: 0.5,
            volume,
            currency: "USDC".to_string(),
            created_at: None,
            closes_at: Some(Utc::now() + Duration::days(10)),
        };
        Recommendation {
            estimate: FairEstimate {
                p0: 0.5 + edge,
                source: EstimateSource::Heuristic {
                    rule: "narrative-fade".to_string(),
                },
                reason: String::new(),
                max_avg_price: None,
                price_bought: None,
                integrity: IntegrityStatus::Clean,
            },
            s: market.s,
            p0: 0.5 + edge,
            edge,
            kelly_fraction: edge.abs() * 2.0,
            risk_adjusted_fraction: edge.abs(),
            stake_amount: stake,
            side: if edge >= 0.0 { Side::Yes } else { Side::No },
            signal: Signal::Bet,
            market,
        }
    }

    fn ranker(config: RankingConfig) -> Ranker {
        Ranker::new(config)
    }

    // -- Ordering --

    #[test]
    fn test_sort_by_stake_descending() {
        let recs = vec![
            make_rec("a", 0.05, 50.0, 100.0),
            make_rec("b", 0.10, 150.0, 100.0),
            make_rec("c", 0.08, 100.0, 100.0),
        ];
        let ranked = ranker(RankingConfig::default()).rank(recs);
        let ids: Vec<_> = ranked.iter().map(|r| r.market_id()).collect();
        assert_eq!(ids, ["b", "c", "a"]);
    }

    #[test]
    fn test_sort_by_edge_uses_magnitude() {
        let recs = vec![
            make_rec("yes-small", 0.05, 10.0, 100.0),
            make_rec("no-big", -0.20, 10.0, 100.0),
            make_rec("yes-mid", 0.10, 10.0, 100.0),
        ];
        let ranked = ranker(RankingConfig {
            sort_by: SortKey::Edge,
            ..Default::default()
        })
        .rank(recs);
        let ids: Vec<_> = ranked.iter().map(|r| r.market_id()).collect();
        assert_eq!(ids, ["no-big", "yes-mid", "yes-small"]);
    }

    #[test]
    fn test_volume_breaks_stake_ties() {
        let recs = vec![
            make_rec("thin", 0.05, 100.0, 50.0),
            make_rec("thick", 0.05, 100.0, 900.0),
        ];
        let ranked = ranker(RankingConfig::default()).rank(recs);
        assert_eq!(ranked[0].market_id(), "thick");
    }

    #[test]
    fn test_id_breaks_full_ties() {
        let recs = vec![
            make_rec("b", 0.05, 100.0, 100.0),
            make_rec("a", 0.05, 100.0, 100.0),
        ];
        let ranked = ranker(RankingConfig::default()).rank(recs);
        let ids: Vec<_> = ranked.iter().map(|r| r.market_id()).collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn test_order_independent_of_input_order() {
        let forward = vec![
            make_rec("a", 0.05, 50.0, 100.0),
            make_rec("b", 0.10, 150.0, 100.0),
            make_rec("c", 0.08, 100.0, 200.0),
            make_rec("d", 0.08, 100.0, 200.0),
        ];
        let mut reversed = forward.clone();
        reversed.reverse();

        let r = ranker(RankingConfig::default());
        let ids = |v: Vec<Recommendation>| -> Vec<String> {
            v.iter().map(|r| r.market.id.clone()).collect()
        };
        assert_eq!(ids(r.rank(forward)), ids(r.rank(reversed)));
    }

    // -- Filters --

    #[test]
    fn test_min_edge_excludes() {
        let recs = vec![
            make_rec("thin", 0.01, 10.0, 100.0),
            make_rec("fat", 0.10, 100.0, 100.0),
        ];
        let ranked = ranker(RankingConfig {
            min_edge: Some(0.05),
            ..Default::default()
        })
        .rank(recs);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].market_id(), "fat");
    }

    #[test]
    fn test_min_edge_matches_negative_edges_by_magnitude() {
        let recs = vec![make_rec("no-side", -0.10, 100.0, 100.0)];
        let ranked = ranker(RankingConfig {
            min_edge: Some(0.05),
            ..Default::default()
        })
        .rank(recs);
        assert_eq!(ranked.len(), 1);
    }

    #[test]
    fn test_volume_bounds() {
        let recs = vec![
            make_rec("tiny", 0.05, 10.0, 5.0),
            make_rec("mid", 0.05, 10.0, 500.0),
            make_rec("huge", 0.05, 10.0, 50_000.0),
        ];
        let ranked = ranker(RankingConfig {
            min_volume: Some(100.0),
            max_volume: Some(10_000.0),
            ..Default::default()
        })
        .rank(recs);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].market_id(), "mid");
    }

    #[test]
    fn test_currency_filter_case_insensitive() {
        let mut eur = make_rec("eur", 0.05, 10.0, 100.0);
        eur.market.currency = "EUR".to_string();
        let recs = vec![make_rec("usdc", 0.05, 10.0, 100.0), eur];
        let ranked = ranker(RankingConfig {
            currency: Some("usdc".to_string()),
            ..Default::default()
        })
        .rank(recs);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].market_id(), "usdc");
    }

    #[test]
    fn test_search_matches_title_and_outcome() {
        let mut by_outcome = make_rec("o1", 0.05, 10.0, 100.0);
        by_outcome.market.outcome = "CPI below 3.5%".to_string();
        let recs = vec![
            make_rec("Market CPI", 0.05, 10.0, 100.0),
            by_outcome,
            make_rec("unrelated", 0.05, 10.0, 100.0),
        ];
        let ranked = ranker(RankingConfig {
            search: Some("cpi".to_string()),
            ..Default::default()
        })
        .rank(recs);
        let ids: Vec<_> = ranked.iter().map(|r| r.market_id()).collect();
        assert!(ids.contains(&"Market CPI"));
        assert!(ids.contains(&"o1"));
        assert!(!ids.contains(&"unrelated"));
    }

    #[test]
    fn test_recency_filter() {
        let mut soon = make_rec("soon", 0.05, 10.0, 100.0);
        soon.market.closes_at = Some(Utc::now() + Duration::days(2));
        let mut far = make_rec("far", 0.05, 10.0, 100.0);
        far.market.closes_at = Some(Utc::now() + Duration::days(90));
        let mut unknown = make_rec("unknown", 0.05, 10.0, 100.0);
        unknown.market.closes_at = None;

        let ranked = ranker(RankingConfig {
            max_days_to_close: Some(7.0),
            ..Default::default()
        })
        .rank(vec![soon, far, unknown]);
        let ids: Vec<_> = ranked.iter().map(|r| r.market_id()).collect();
        assert!(ids.contains(&"soon"));
        assert!(!ids.contains(&"far"));
        // Unknown close time passes
        assert!(ids.contains(&"unknown"));
    }

    #[test]
    fn test_failing_any_predicate_excludes() {
        // Passes volume but fails search — excluded outright.
        let recs = vec![make_rec("a", 0.05, 10.0, 500.0)];
        let ranked = ranker(RankingConfig {
            min_volume: Some(100.0),
            search: Some("zzz".to_string()),
            ..Default::default()
        })
        .rank(recs);
        assert!(ranked.is_empty());
    }
}
