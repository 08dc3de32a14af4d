//! Request-level allocation: validate, generate market statistics, optimize,
//! and key the weights by asset.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::AllocatorError;
use crate::market_data::MarketAssumptions;
use crate::portfolio_optimization::mean_variance::concentration_warnings_for;
use crate::portfolio_optimization::{optimize_portfolio_with, ActiveSetSolver, QpSolver};
use crate::types::{with_metadata, AssetId, ComputationOutput, Rate, Weight};
use crate::AllocatorResult;

fn default_risk_tolerance() -> Decimal {
    dec!(0.5)
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// An allocation request as received from a caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationRequest {
    /// Ordered asset identifiers.
    pub assets: Vec<AssetId>,
    /// Within [0, 1]; defaults to 0.5.
    #[serde(default = "default_risk_tolerance")]
    pub risk_tolerance: Decimal,
}

/// Weight assigned to one asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetAllocation {
    pub asset: AssetId,
    pub weight: Weight,
}

/// Optimized allocation in request order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationOutput {
    pub optimized_allocations: Vec<AssetAllocation>,
    pub expected_return: Rate,
    pub expected_risk: Rate,
    pub sharpe_ratio: Decimal,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Allocate capital across `request.assets` under `assumptions`.
///
/// Invalid requests return a validation error (see
/// [`AllocatorError::is_validation`]); an optimizer failure returns
/// [`AllocatorError::OptimizationFailed`].
pub fn allocate(
    request: &AllocationRequest,
    assumptions: &MarketAssumptions,
) -> AllocatorResult<ComputationOutput<AllocationOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_request(request)?;

    let stats = assumptions.generate(&request.assets);
    for asset in &stats.unknown_assets {
        warnings.push(format!(
            "No return assumption for {}; using default return {} and volatility {}",
            asset,
            assumptions.default_return,
            assumptions.volatility(asset)
        ));
    }
    for asset in duplicate_assets(&request.assets) {
        warnings.push(format!("Duplicate asset identifier: {}", asset));
    }

    let solver = ActiveSetSolver::default();
    let portfolio = optimize_portfolio_with(
        &stats.expected_returns,
        &stats.covariance_matrix,
        request.risk_tolerance,
        &solver,
    )
    .into_result()?;

    warnings.extend(concentration_warnings_for(&portfolio.weights, &request.assets));

    let optimized_allocations = request
        .assets
        .iter()
        .zip(portfolio.weights.iter())
        .map(|(asset, weight)| AssetAllocation {
            asset: asset.clone(),
            weight: *weight,
        })
        .collect();

    let output = AllocationOutput {
        optimized_allocations,
        expected_return: portfolio.expected_return,
        expected_risk: portfolio.expected_risk,
        sharpe_ratio: portfolio.sharpe_ratio,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Mean-Variance Allocation over synthetic market statistics",
        &serde_json::json!({
            "n_assets": request.assets.len(),
            "risk_tolerance": request.risk_tolerance.to_string(),
            "risk_aversion": (Decimal::ONE - request.risk_tolerance).to_string(),
            "default_return": assumptions.default_return.to_string(),
            "solver": solver.name(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_request(request: &AllocationRequest) -> AllocatorResult<()> {
    if request.assets.is_empty() {
        return Err(AllocatorError::InsufficientData(
            "At least one asset must be provided".into(),
        ));
    }
    if let Some(i) = request.assets.iter().position(|a| a.trim().is_empty()) {
        return Err(AllocatorError::InvalidInput {
            field: format!("assets[{}]", i),
            reason: "Asset identifier must not be blank".into(),
        });
    }
    if request.risk_tolerance < Decimal::ZERO || request.risk_tolerance > Decimal::ONE {
        return Err(AllocatorError::InvalidInput {
            field: "risk_tolerance".into(),
            reason: format!(
                "Risk tolerance must be between 0 and 1, got {}",
                request.risk_tolerance
            ),
        });
    }
    Ok(())
}

fn duplicate_assets(assets: &[AssetId]) -> Vec<&AssetId> {
    let mut dups: Vec<&AssetId> = Vec::new();
    for (i, asset) in assets.iter().enumerate() {
        if assets[..i].contains(asset) && !dups.contains(&asset) {
            dups.push(asset);
        }
    }
    dups
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
