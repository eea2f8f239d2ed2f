//! TIPSTER — Kelly-based stake recommender for binary prediction markets.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! reads a market snapshot (and optionally a pasted analysis payload)
//! from JSON files, runs the recommendation pipeline, and prints the
//! ranked table.

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use tipster::analysis::{parse_payload, AnalysisIndex};
use tipster::config::AppConfig;
use tipster::strategy::Pipeline;
use tipster::types::{Market, Recommendation};

const BANNER: &str = r#"
 _____ ___ ____  ____ _____ _____ ____
|_   _|_ _|  _ \/ ___|_   _| ____|  _ \
  | |  | || |_) \___ \ | | |  _| | |_) |
  | |  | ||  __/ ___) || | | |___|  _ <
  |_| |___|_|   |____/ |_| |_____|_| \_\

  Kelly-sized stakes for binary prediction markets
  v0.1.0
"#;

fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    // Load configuration from TOML; a missing file means defaults.
    let config_path =
        std::env::var("TIPSTER_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    let cfg = if std::path::Path::new(&config_path).exists() {
        AppConfig::load(&config_path)?
    } else {
        AppConfig::default()
    };

    init_logging();

    println!("{BANNER}");
    info!(
        bankroll = cfg.sizing.bankroll,
        risk_mode = %cfg.sizing.risk_mode,
        min_edge = cfg.sizing.min_edge,
        "TIPSTER starting up"
    );

    // -- Inputs -----------------------------------------------------------

    let mut args = std::env::args().skip(1);
    let markets_path = match args.next() {
        Some(p) => p,
        None => bail!("Usage: tipster <markets.json> [analysis.json]"),
    };
    let analysis_path = args.next();

    let markets = load_markets(&markets_path)?;
    info!(count = markets.len(), path = %markets_path, "Markets loaded");

    let analysis = match analysis_path {
        Some(path) => load_analysis(&path)?,
        None => AnalysisIndex::default(),
    };

    // -- Pipeline ---------------------------------------------------------

    let pipeline = Pipeline::new(&cfg);
    let outcome = pipeline.run(&markets, &analysis);

    for failure in &outcome.skipped {
        warn!(market_id = %failure.market_id, error = %failure.error, "Market skipped");
    }
    for failure in &outcome.rejected_overrides {
        warn!(
            market_id = %failure.market_id,
            error = %failure.error,
            "Override rejected; heuristic estimate kept"
        );
    }

    // -- Output -----------------------------------------------------------

    println!(
        "Bankroll: {:.2} | Risk mode: {} | Min edge: {:.1}%",
        cfg.sizing.bankroll,
        cfg.sizing.risk_mode,
        cfg.sizing.min_edge * 100.0,
    );
    print_table(&outcome.recommendations, &outcome.stale);

    info!(
        recommendations = outcome.recommendations.len(),
        skipped = outcome.skipped.len(),
        stale = outcome.stale.len(),
        "Run complete"
    );

    Ok(())
}

/// Read a JSON array of market snapshots.
fn load_markets(path: &str) -> Result<Vec<Market>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read markets file: {path}"))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse markets file: {path}"))
}

/// Read a pasted analysis payload and report its per-record rejects.
fn load_analysis(path: &str) -> Result<AnalysisIndex> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read analysis file: {path}"))?;
    let parsed = parse_payload(&contents)
        .with_context(|| format!("Failed to parse analysis file: {path}"))?;
    for (market_id, error) in &parsed.rejected {
        warn!(%market_id, %error, "Analysis record rejected at parse time");
    }
    info!(records = parsed.records.len(), path, "Analysis payload loaded");
    Ok(parsed.records)
}

/// Render the ranked recommendations as a fixed-width table.
fn print_table(recommendations: &[Recommendation], stale: &[String]) {
    println!(
        "| {:<40} | {:<13} | {:>5} | {:>5} | {:>7} | {:<4} | {:<4} | {:>8} |",
        "Market", "Domain", "s", "p0", "Edge", "Side", "Sig", "Stake",
    );
    println!(
        "|{:-<42}|{:-<15}|{:-<7}|{:-<7}|{:-<9}|{:-<6}|{:-<6}|{:-<10}|",
        "", "", "", "", "", "", "", "",
    );

    for rec in recommendations {
        let stale_mark = if stale.contains(&rec.market.id) { "*" } else { "" };
        println!(
            "| {:<40} | {:<13} | {:>5.3} | {:>5.3} | {:>+7.3} | {:<4} | {:<4} | {:>8.2} |",
            clip(&rec.market.title, 40),
            format!("{}{}", rec.market.domain, stale_mark),
            rec.s,
            rec.p0,
            rec.edge,
            rec.side.to_string(),
            rec.signal.to_string(),
            rec.stake_amount,
        );
    }

    if !stale.is_empty() {
        println!("* analysis applied from a stale snapshot");
    }
}

/// Single-line, clipped cell content.
fn clip(text: &str, width: usize) -> String {
    let flat: String = text
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    flat.chars().take(width).collect()
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("tipster=info"));

    let json_logging = std::env::var("TIPSTER_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        fmt().with_env_filter(env_filter).with_target(true).init();
    }
}
