use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use super::linalg::{
    check_positive_semidefinite, check_symmetric, quad_form, sqrt_decimal, vec_dot,
};
use super::solver::{ActiveSetSolver, QpSolver, QuadraticProgram};
use crate::error::AllocatorError;
use crate::types::{round_output, with_metadata, ComputationOutput, Matrix, Rate, Weight};
use crate::AllocatorResult;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const SYMMETRY_TOLERANCE: Decimal = dec!(0.0000000001);

/// Slack allowed on the solver's answer before it is rejected as infeasible.
const FEASIBILITY_TOLERANCE: Decimal = dec!(0.000001);

const CONCENTRATION_WARNING: Decimal = dec!(0.40);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Input to a single-period mean-variance optimization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeanVarianceInput {
    /// Expected return per asset.
    pub expected_returns: Vec<Rate>,
    /// N x N covariance matrix of asset returns.
    pub covariance_matrix: Matrix,
    /// 0 = minimize risk, 1 = maximize return.
    pub risk_tolerance: Decimal,
}

impl MeanVarianceInput {
    /// Reject a malformed request: no assets, mismatched dimensions, or a
    /// tolerance outside [0, 1]. Symmetry and semidefiniteness are properties
    /// of the market data and surface later as a `Failure`.
    pub fn validate(&self) -> AllocatorResult<()> {
        validate_request(&self.expected_returns, &self.covariance_matrix, self.risk_tolerance)
    }
}

/// Optimal long-only, fully-invested portfolio. Every figure is rounded to
/// four decimal places.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimalPortfolio {
    pub weights: Vec<Weight>,
    pub expected_return: Rate,
    /// Portfolio standard deviation.
    pub expected_risk: Rate,
    /// expected_return / expected_risk, or 0 when risk is zero.
    pub sharpe_ratio: Decimal,
}

/// Outcome of an optimization: callers branch on the variant, never on
/// side-channel state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OptimizationResult {
    Success(OptimalPortfolio),
    Failure { reason: String },
}

impl OptimizationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, OptimizationResult::Success(_))
    }

    pub fn portfolio(&self) -> Option<&OptimalPortfolio> {
        match self {
            OptimizationResult::Success(p) => Some(p),
            OptimizationResult::Failure { .. } => None,
        }
    }

    /// Convert a failure into [`AllocatorError::OptimizationFailed`].
    pub fn into_result(self) -> AllocatorResult<OptimalPortfolio> {
        match self {
            OptimizationResult::Success(p) => Ok(p),
            OptimizationResult::Failure { reason } => {
                Err(AllocatorError::OptimizationFailed { reason })
            }
        }
    }
}

/// One risk-tolerance level of a frontier sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontierPoint {
    pub risk_tolerance: Decimal,
    pub expected_return: Rate,
    pub expected_risk: Rate,
    pub sharpe_ratio: Decimal,
    pub weights: Vec<Weight>,
}

/// Output of a frontier sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontierOutput {
    pub points: Vec<FrontierPoint>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Maximize `μ·w − (1 − risk_tolerance)·wᵀΣw` subject to `Σw = 1, w ≥ 0`
/// with the default active-set solver.
pub fn optimize_portfolio(
    expected_returns: &[Rate],
    covariance_matrix: &[Vec<Decimal>],
    risk_tolerance: Decimal,
) -> OptimizationResult {
    optimize_portfolio_with(
        expected_returns,
        covariance_matrix,
        risk_tolerance,
        &ActiveSetSolver::default(),
    )
}

/// Same as [`optimize_portfolio`] with an explicit solver backend.
///
/// Validation errors, solver errors and panics raised while solving all
/// come back as [`OptimizationResult::Failure`].
pub fn optimize_portfolio_with<S: QpSolver + ?Sized>(
    expected_returns: &[Rate],
    covariance_matrix: &[Vec<Decimal>],
    risk_tolerance: Decimal,
    solver: &S,
) -> OptimizationResult {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        solve_mean_variance(expected_returns, covariance_matrix, risk_tolerance, solver)
    }));
    match outcome {
        Ok(Ok(portfolio)) => OptimizationResult::Success(portfolio),
        Ok(Err(e)) => OptimizationResult::Failure {
            reason: e.to_string(),
        },
        Err(payload) => OptimizationResult::Failure {
            reason: AllocatorError::NumericalFault(panic_message(payload.as_ref())).to_string(),
        },
    }
}

/// Optimize a [`MeanVarianceInput`] and wrap the outcome in the standard
/// envelope.
pub fn optimize_mean_variance(input: &MeanVarianceInput) -> ComputationOutput<OptimizationResult> {
    let start = Instant::now();
    let solver = ActiveSetSolver::default();
    let result = optimize_portfolio_with(
        &input.expected_returns,
        &input.covariance_matrix,
        input.risk_tolerance,
        &solver,
    );

    let warnings = match result.portfolio() {
        Some(p) => concentration_warnings(&p.weights, |i| format!("asset {}", i)),
        None => Vec::new(),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    with_metadata(
        "Long-only Mean-Variance Optimization (quadratic utility)",
        &serde_json::json!({
            "n_assets": input.expected_returns.len(),
            "risk_tolerance": input.risk_tolerance.to_string(),
            "risk_aversion": (Decimal::ONE - input.risk_tolerance).to_string(),
            "solver": solver.name(),
        }),
        warnings,
        elapsed,
        result,
    )
}

/// Solve at `points` evenly spaced risk tolerances from 0 to 1 inclusive.
pub fn trace_frontier(
    expected_returns: &[Rate],
    covariance_matrix: &[Vec<Decimal>],
    points: u32,
) -> AllocatorResult<ComputationOutput<FrontierOutput>> {
    let start = Instant::now();
    if points < 2 {
        return Err(AllocatorError::InvalidInput {
            field: "points".into(),
            reason: format!("At least 2 frontier points required, got {}", points),
        });
    }
    validate_dimensions(expected_returns, covariance_matrix)?;

    let solver = ActiveSetSolver::default();
    let last = Decimal::from(points - 1);
    let mut frontier = Vec::with_capacity(points as usize);
    for i in 0..points {
        let risk_tolerance = Decimal::from(i) / last;
        let portfolio =
            optimize_portfolio_with(expected_returns, covariance_matrix, risk_tolerance, &solver)
                .into_result()?;
        frontier.push(FrontierPoint {
            risk_tolerance: round_output(risk_tolerance).normalize(),
            expected_return: portfolio.expected_return,
            expected_risk: portfolio.expected_risk,
            sharpe_ratio: portfolio.sharpe_ratio,
            weights: portfolio.weights,
        });
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Mean-Variance Frontier (risk tolerance sweep)",
        &serde_json::json!({
            "n_assets": expected_returns.len(),
            "points": points,
            "solver": solver.name(),
        }),
        Vec::new(),
        elapsed,
        FrontierOutput { points: frontier },
    ))
}

// ---------------------------------------------------------------------------
// Core routine
// ---------------------------------------------------------------------------

fn solve_mean_variance<S: QpSolver + ?Sized>(
    mu: &[Rate],
    sigma: &[Vec<Decimal>],
    risk_tolerance: Decimal,
    solver: &S,
) -> AllocatorResult<OptimalPortfolio> {
    let n = mu.len();
    validate_input(mu, sigma, risk_tolerance)?;

    // max μ·w − a·wᵀΣw  ==  min ½wᵀ(2aΣ)w − μ·w
    let risk_aversion = Decimal::ONE - risk_tolerance;
    let scale = dec!(2) * risk_aversion;
    let hessian: Matrix = sigma
        .iter()
        .map(|row| row.iter().map(|s| *s * scale).collect())
        .collect();
    let problem = QuadraticProgram::new(hessian, mu.to_vec())?;

    let weights = solver.solve(&problem)?;
    check_solution(&weights, n, solver.name())?;

    let expected_return = vec_dot(mu, &weights);
    let expected_risk = sqrt_decimal(quad_form(&weights, sigma));
    // Computed from unrounded figures; rounding happens below.
    let sharpe_ratio = compute_sharpe(expected_return, expected_risk);

    Ok(OptimalPortfolio {
        weights: weights.into_iter().map(round_output).collect(),
        expected_return: round_output(expected_return),
        expected_risk: round_output(expected_risk),
        sharpe_ratio: round_output(sharpe_ratio),
    })
}

/// Sharpe ratio with a zero-risk guard. A riskless portfolio reports 0
/// whatever its return.
fn compute_sharpe(ret: Decimal, risk: Decimal) -> Decimal {
    if risk.is_zero() {
        Decimal::ZERO
    } else {
        ret / risk
    }
}

fn check_solution(weights: &[Decimal], n: usize, solver: &str) -> AllocatorResult<()> {
    if weights.len() != n {
        return Err(AllocatorError::OptimizationFailed {
            reason: format!("{} returned {} weights for {} assets", solver, weights.len(), n),
        });
    }
    let total: Decimal = weights.iter().sum();
    if (total - Decimal::ONE).abs() > FEASIBILITY_TOLERANCE
        || weights.iter().any(|w| *w < -FEASIBILITY_TOLERANCE)
    {
        return Err(AllocatorError::OptimizationFailed {
            reason: format!("{} returned an infeasible allocation (sum {})", solver, total),
        });
    }
    Ok(())
}

fn concentration_warnings(weights: &[Weight], label: impl Fn(usize) -> String) -> Vec<String> {
    weights
        .iter()
        .enumerate()
        .filter(|(_, w)| **w > CONCENTRATION_WARNING)
        .map(|(i, w)| format!("Concentrated position: {} has weight {:.4}", label(i), w))
        .collect()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "solver panicked".to_string()
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Request-shape checks: the caller's fault when they fail.
fn validate_request(mu: &[Rate], sigma: &[Vec<Decimal>], risk_tolerance: Decimal) -> AllocatorResult<()> {
    validate_dimensions(mu, sigma)?;
    if risk_tolerance < Decimal::ZERO || risk_tolerance > Decimal::ONE {
        return Err(AllocatorError::InvalidInput {
            field: "risk_tolerance".into(),
            reason: format!("Must be within [0, 1], got {}", risk_tolerance),
        });
    }
    Ok(())
}

fn validate_dimensions(mu: &[Rate], sigma: &[Vec<Decimal>]) -> AllocatorResult<()> {
    let n = mu.len();
    if n == 0 {
        return Err(AllocatorError::InsufficientData(
            "At least one asset required".into(),
        ));
    }
    if sigma.len() != n {
        return Err(AllocatorError::InvalidInput {
            field: "covariance_matrix".into(),
            reason: format!("Expected {}x{} matrix but got {} rows", n, n, sigma.len()),
        });
    }
    for (i, row) in sigma.iter().enumerate() {
        if row.len() != n {
            return Err(AllocatorError::InvalidInput {
                field: "covariance_matrix".into(),
                reason: format!("Row {} has {} columns, expected {}", i, row.len(), n),
            });
        }
    }
    Ok(())
}

fn validate_input(mu: &[Rate], sigma: &[Vec<Decimal>], risk_tolerance: Decimal) -> AllocatorResult<()> {
    validate_request(mu, sigma, risk_tolerance)?;
    check_symmetric(sigma, SYMMETRY_TOLERANCE)?;
    check_positive_semidefinite(sigma)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Public helpers for the allocation workflow
// ---------------------------------------------------------------------------

/// Warnings for positions above the concentration threshold, labelled by
/// asset identifier.
pub fn concentration_warnings_for(weights: &[Weight], assets: &[String]) -> Vec<String> {
    concentration_warnings(weights, |i| {
        assets
            .get(i)
            .cloned()
            .unwrap_or_else(|| format!("asset {}", i))
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
