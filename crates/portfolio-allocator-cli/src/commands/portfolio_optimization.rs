use clap::Args;
use serde_json::Value;

use portfolio_allocator_core::portfolio_optimization::mean_variance::{
    self, MeanVarianceInput, OptimizationResult,
};
use portfolio_allocator_core::AllocatorError;

use crate::input;

#[derive(Args)]
pub struct SolveArgs {
    /// JSON file with expected_returns, covariance_matrix and risk_tolerance
    #[arg(long)]
    pub input: Option<String>,
}

#[derive(Args)]
pub struct FrontierArgs {
    /// Comma-separated asset identifiers
    #[arg(long, value_delimiter = ',', required = true)]
    pub assets: Vec<String>,

    /// Number of evenly spaced risk tolerances from 0 to 1
    #[arg(long, default_value = "11")]
    pub points: u32,

    /// Market assumption table (JSON or YAML); built-in table when omitted
    #[arg(long)]
    pub assumptions: Option<String>,
}

pub fn run_solve(args: SolveArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mv_input: MeanVarianceInput =
        input::read_request(args.input.as_deref(), "mean-variance optimization")?;
    mv_input.validate()?;
    let output = mean_variance::optimize_mean_variance(&mv_input);
    if let OptimizationResult::Failure { reason } = &output.result {
        return Err(AllocatorError::OptimizationFailed {
            reason: reason.clone(),
        }
        .into());
    }
    Ok(serde_json::to_value(output)?)
}

pub fn run_frontier(args: FrontierArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let assumptions = input::file::read_assumptions(args.assumptions.as_deref())?;
    let assets: Vec<String> = args.assets.iter().map(|a| a.trim().to_string()).collect();
    if assets.iter().any(|a| a.is_empty()) {
        return Err(AllocatorError::InvalidInput {
            field: "assets".into(),
            reason: "Asset identifier must not be blank".into(),
        }
        .into());
    }
    let stats = assumptions.generate(&assets);
    let result =
        mean_variance::trace_frontier(&stats.expected_returns, &stats.covariance_matrix, args.points)?;
    Ok(serde_json::to_value(result)?)
}
