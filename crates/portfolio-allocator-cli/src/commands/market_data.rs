use clap::Args;
use serde_json::Value;
use std::time::Instant;

use portfolio_allocator_core::types::with_metadata;

use crate::input;

/// Arguments for synthetic market statistics
#[derive(Args)]
pub struct MarketStatsArgs {
    /// Comma-separated asset identifiers
    #[arg(long, value_delimiter = ',', required = true)]
    pub assets: Vec<String>,

    /// Market assumption table (JSON or YAML); built-in table when omitted
    #[arg(long)]
    pub assumptions: Option<String>,
}

pub fn run_market_stats(args: MarketStatsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let assumptions = input::file::read_assumptions(args.assumptions.as_deref())?;
    let assets: Vec<String> = args.assets.iter().map(|a| a.trim().to_string()).collect();
    let stats = assumptions.generate(&assets);

    let warnings = stats
        .unknown_assets
        .iter()
        .map(|a| format!("No return assumption for {}; default return applied", a))
        .collect();

    let output = with_metadata(
        "Synthetic market statistics (class-based volatility and correlation)",
        &serde_json::json!({
            "n_assets": assets.len(),
            "default_return": assumptions.default_return.to_string(),
            "default_volatility": assumptions.default_volatility.to_string(),
            "base_correlation": assumptions.base_correlation.to_string(),
        }),
        warnings,
        start.elapsed().as_micros() as u64,
        stats,
    );
    Ok(serde_json::to_value(output)?)
}
