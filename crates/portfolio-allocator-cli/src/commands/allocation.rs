use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use portfolio_allocator_core::allocation::{self, AllocationRequest};

use crate::input;

/// Arguments for an allocation over named assets
#[derive(Args)]
pub struct OptimizeArgs {
    /// Comma-separated asset identifiers (e.g. "BTC,ETH,USDC")
    #[arg(long, value_delimiter = ',')]
    pub assets: Option<Vec<String>>,

    /// Risk tolerance: 0 minimizes risk, 1 maximizes return
    #[arg(long, default_value = "0.5", allow_hyphen_values = true)]
    pub risk_tolerance: Decimal,

    /// Market assumption table (JSON or YAML); built-in table when omitted
    #[arg(long)]
    pub assumptions: Option<String>,

    /// Path to a JSON allocation request, used when --assets is absent
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_optimize(args: OptimizeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request = match args.assets {
        Some(assets) => AllocationRequest {
            assets: assets.into_iter().map(|a| a.trim().to_string()).collect(),
            risk_tolerance: args.risk_tolerance,
        },
        None => input::read_request(args.input.as_deref(), "allocation")?,
    };
    let assumptions = input::file::read_assumptions(args.assumptions.as_deref())?;
    let result = allocation::allocate(&request, &assumptions)?;
    Ok(serde_json::to_value(result)?)
}
