use napi::{Result as NapiResult, Status};
use napi_derive::napi;
use rust_decimal::Decimal;
use serde::Deserialize;

use portfolio_allocator_core::allocation::{self, AllocationRequest};
use portfolio_allocator_core::market_data::MarketAssumptions;
use portfolio_allocator_core::portfolio_optimization::mean_variance::{self, MeanVarianceInput};
use portfolio_allocator_core::AllocatorError;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Rejected requests surface as `InvalidArg`, everything else as a failure.
fn allocator_error(e: AllocatorError) -> napi::Error {
    let status = if e.is_validation() {
        Status::InvalidArg
    } else {
        Status::GenericFailure
    };
    napi::Error::new(status, e.to_string())
}

fn assumptions_or_default(assumptions: Option<MarketAssumptions>) -> NapiResult<MarketAssumptions> {
    match assumptions {
        Some(a) => {
            a.validate().map_err(allocator_error)?;
            Ok(a)
        }
        None => Ok(MarketAssumptions::default()),
    }
}

// ---------------------------------------------------------------------------
// Allocation
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct AllocateInput {
    #[serde(flatten)]
    request: AllocationRequest,
    #[serde(default)]
    assumptions: Option<MarketAssumptions>,
}

#[napi]
pub fn allocate_portfolio(input_json: String) -> NapiResult<String> {
    let input: AllocateInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let assumptions = assumptions_or_default(input.assumptions)?;
    let output = allocation::allocate(&input.request, &assumptions).map_err(allocator_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Market data
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct MarketStatisticsInput {
    assets: Vec<String>,
    #[serde(default)]
    assumptions: Option<MarketAssumptions>,
}

#[napi]
pub fn market_statistics(input_json: String) -> NapiResult<String> {
    let input: MarketStatisticsInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let assumptions = assumptions_or_default(input.assumptions)?;
    let stats = assumptions.generate(&input.assets);
    serde_json::to_string(&stats).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Portfolio optimization
// ---------------------------------------------------------------------------

/// Malformed requests are rejected with `InvalidArg`. Otherwise returns the
/// envelope for both outcomes; callers branch on `result.status`.
#[napi]
pub fn optimize_portfolio(input_json: String) -> NapiResult<String> {
    let input: MeanVarianceInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    input.validate().map_err(allocator_error)?;
    let output = mean_variance::optimize_mean_variance(&input);
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[derive(Deserialize)]
struct FrontierInput {
    expected_returns: Vec<Decimal>,
    covariance_matrix: Vec<Vec<Decimal>>,
    #[serde(default = "default_points")]
    points: u32,
}

fn default_points() -> u32 {
    11
}

#[napi]
pub fn efficient_frontier(input_json: String) -> NapiResult<String> {
    let input: FrontierInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        mean_variance::trace_frontier(&input.expected_returns, &input.covariance_matrix, input.points)
            .map_err(allocator_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
