use portfolio_allocator_core::portfolio_optimization::{
    optimize_mean_variance, optimize_portfolio, optimize_portfolio_with, trace_frontier,
    MeanVarianceInput, OptimizationResult, ProjectedGradientSolver,
};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn three_asset_fixture() -> (Vec<Decimal>, Vec<Vec<Decimal>>) {
    let mu = vec![dec!(0.08), dec!(0.12), dec!(0.03)];
    let sigma = vec![
        vec![dec!(0.04), dec!(0.006), dec!(0.001)],
        vec![dec!(0.006), dec!(0.09), dec!(0.002)],
        vec![dec!(0.001), dec!(0.002), dec!(0.01)],
    ];
    (mu, sigma)
}

#[test]
fn test_weights_feasible_across_tolerances() {
    let (mu, sigma) = three_asset_fixture();
    for t in [dec!(0.0), dec!(0.25), dec!(0.5), dec!(0.75), dec!(1.0)] {
        let p = match optimize_portfolio(&mu, &sigma, t) {
            OptimizationResult::Success(p) => p,
            OptimizationResult::Failure { reason } => panic!("tolerance {}: {}", t, reason),
        };
        let total: Decimal = p.weights.iter().sum();
        assert!((total - Decimal::ONE).abs() <= dec!(0.0001), "sum {}", total);
        assert!(p.weights.iter().all(|w| *w >= dec!(-0.000001)));
    }
}

#[test]
fn test_expected_return_monotone() {
    let (mu, sigma) = three_asset_fixture();
    let r = |t| optimize_portfolio(&mu, &sigma, t).into_result().unwrap().expected_return;
    let (lo, mid, hi) = (r(dec!(0.0)), r(dec!(0.5)), r(dec!(1.0)));
    assert!(lo <= mid, "{} > {}", lo, mid);
    assert!(mid <= hi, "{} > {}", mid, hi);
    assert_eq!(hi, dec!(0.1200));
}

#[test]
fn test_zero_covariance_sharpe_is_zero() {
    let mu = vec![dec!(0.05), dec!(0.10)];
    let sigma = vec![vec![Decimal::ZERO; 2]; 2];
    let p = optimize_portfolio(&mu, &sigma, dec!(0.5)).into_result().unwrap();
    assert_eq!(p.expected_risk, Decimal::ZERO);
    assert_eq!(p.sharpe_ratio, Decimal::ZERO);
    assert_eq!(p.weights, vec![dec!(0.0000), dec!(1.0000)]);
}

#[test]
fn test_negative_diagonal_is_failure() {
    let mu = vec![dec!(0.1), dec!(0.2)];
    let sigma = vec![vec![dec!(-0.04), dec!(0)], vec![dec!(0), dec!(0.09)]];
    let result = optimize_portfolio(&mu, &sigma, dec!(0.5));
    assert!(!result.is_success());
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["status"], "failure");
}

#[test]
fn test_backends_agree() {
    let (mu, sigma) = three_asset_fixture();
    let a = optimize_portfolio(&mu, &sigma, dec!(0.5)).into_result().unwrap();
    let b = optimize_portfolio_with(&mu, &sigma, dec!(0.5), &ProjectedGradientSolver::default())
        .into_result()
        .unwrap();
    for (x, y) in a.weights.iter().zip(b.weights.iter()) {
        assert!((*x - *y).abs() <= dec!(0.0002), "{} vs {}", x, y);
    }
}

#[test]
fn test_envelope_reports_solver() {
    let (mu, sigma) = three_asset_fixture();
    let out = optimize_mean_variance(&MeanVarianceInput {
        expected_returns: mu,
        covariance_matrix: sigma,
        risk_tolerance: dec!(0.5),
    });
    assert!(out.result.is_success());
    assert_eq!(out.assumptions["solver"], "active_set");
}

#[test]
fn test_frontier_sweep() {
    let (mu, sigma) = three_asset_fixture();
    let out = trace_frontier(&mu, &sigma, 5).unwrap();
    let points = &out.result.points;
    assert_eq!(points.len(), 5);
    assert_eq!(points[0].risk_tolerance, dec!(0));
    assert_eq!(points[4].risk_tolerance, dec!(1));
    for pair in points.windows(2) {
        assert!(pair[0].expected_return <= pair[1].expected_return);
    }
}

#[test]
fn test_frontier_needs_two_points() {
    let (mu, sigma) = three_asset_fixture();
    assert!(trace_frontier(&mu, &sigma, 1).unwrap_err().is_validation());
}
