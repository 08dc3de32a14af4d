use portfolio_allocator_core::allocation::{allocate, AllocationRequest};
use portfolio_allocator_core::market_data::{
    provide_market_statistics, MarketAssumptions, VolatilityClass,
};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn assets(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

fn request(ids: &[&str], risk_tolerance: Decimal) -> AllocationRequest {
    AllocationRequest {
        assets: assets(ids),
        risk_tolerance,
    }
}

/// Default table with BTC moved into its own volatility class.
fn with_btc_volatility(volatility: Decimal) -> MarketAssumptions {
    let mut a = MarketAssumptions::default();
    a.volatility_classes.insert(
        0,
        VolatilityClass {
            name: "btc".into(),
            members: assets(&["BTC"]),
            volatility,
        },
    );
    a
}

// ===========================================================================
// Market statistics
// ===========================================================================

#[test]
fn test_covariance_symmetric_for_whole_table() {
    let all = assets(&[
        "BTC", "ETH", "SOL", "AVAX", "BNB", "USDC", "USDT", "DAI", "LINK", "DOT", "ADA", "XRP",
        "MATIC", "DOGE", "UNI", "SHIB", "AAVE", "MKR", "UNLISTED",
    ]);
    let stats = provide_market_statistics(&all);
    let n = all.len();
    for i in 0..n {
        assert_eq!(
            stats.covariance_matrix[i][i],
            stats.volatilities[i] * stats.volatilities[i]
        );
        for j in 0..n {
            assert_eq!(stats.covariance_matrix[i][j], stats.covariance_matrix[j][i]);
        }
    }
    assert_eq!(stats.unknown_assets, assets(&["UNLISTED"]));
}

#[test]
fn test_majors_pair_uses_major_correlation() {
    let stats = provide_market_statistics(&assets(&["BTC", "ETH", "USDC"]));
    assert_eq!(stats.correlation_matrix[0][1], dec!(0.80));
    assert_eq!(stats.covariance_matrix[0][1], dec!(0.80) * dec!(0.80) * dec!(0.80));
    assert_eq!(stats.correlation_matrix[0][2], dec!(0.50));
}

// ===========================================================================
// End-to-end allocation
// ===========================================================================

#[test]
fn test_end_to_end_btc_eth_usdc() {
    let out = allocate(
        &request(&["BTC", "ETH", "USDC"], dec!(0.5)),
        &MarketAssumptions::default(),
    )
    .unwrap();
    let res = out.result;

    let names: Vec<&str> = res
        .optimized_allocations
        .iter()
        .map(|a| a.asset.as_str())
        .collect();
    assert_eq!(names, vec!["BTC", "ETH", "USDC"]);

    let total: Decimal = res.optimized_allocations.iter().map(|a| a.weight).sum();
    assert!((total - Decimal::ONE).abs() <= dec!(0.0001), "sum {}", total);
    assert!(res
        .optimized_allocations
        .iter()
        .all(|a| a.weight >= dec!(-0.000001)));
    assert!(res.expected_risk > Decimal::ZERO);
    assert_eq!(out.metadata.precision, "rust_decimal_128bit");
}

#[test]
fn test_btc_volatility_does_not_lower_optimal_risk() {
    // At the default table BTC is dominated by ETH and held at zero, so its
    // volatility can only leave the optimal risk unchanged or raise it.
    let req = request(&["BTC", "ETH", "USDC"], dec!(0.5));
    let base = allocate(&req, &MarketAssumptions::default()).unwrap();
    let raised = allocate(&req, &with_btc_volatility(dec!(0.95))).unwrap();
    assert!(raised.result.expected_risk >= base.result.expected_risk);
}

#[test]
fn test_btc_volatility_raises_risk_when_btc_held() {
    let mut low = with_btc_volatility(dec!(0.80));
    low.expected_returns.insert("BTC".into(), dec!(0.40));
    let mut high = with_btc_volatility(dec!(0.90));
    high.expected_returns.insert("BTC".into(), dec!(0.40));

    let req = request(&["BTC", "ETH", "USDC"], dec!(1.0));
    let a = allocate(&req, &low).unwrap().result;
    let b = allocate(&req, &high).unwrap().result;

    assert_eq!(a.optimized_allocations[0].weight, Decimal::ONE);
    assert_eq!(b.optimized_allocations[0].weight, Decimal::ONE);
    assert_eq!(a.expected_risk, dec!(0.8000));
    assert_eq!(b.expected_risk, dec!(0.9000));
    assert!(b.expected_risk > a.expected_risk);
}

#[test]
fn test_return_monotone_in_risk_tolerance() {
    let assumptions = MarketAssumptions::default();
    let returns: Vec<Decimal> = [dec!(0.0), dec!(0.5), dec!(1.0)]
        .iter()
        .map(|t| {
            allocate(&request(&["BTC", "ETH", "USDC"], *t), &assumptions)
                .unwrap()
                .result
                .expected_return
        })
        .collect();
    assert!(returns[0] <= returns[1]);
    assert!(returns[1] <= returns[2]);
    // Pure return seeking puts everything in ETH.
    assert_eq!(returns[2], dec!(0.2500));
}

#[test]
fn test_single_asset_any_tolerance() {
    for t in [dec!(0.0), dec!(0.3), dec!(1.0)] {
        let out = allocate(&request(&["DOGE"], t), &MarketAssumptions::default()).unwrap();
        assert_eq!(out.result.optimized_allocations[0].weight, Decimal::ONE);
    }
}

// ===========================================================================
// Boundary errors
// ===========================================================================

#[test]
fn test_empty_request_is_validation_error() {
    let err = allocate(&request(&[], dec!(0.5)), &MarketAssumptions::default()).unwrap_err();
    assert!(err.is_validation());
}

#[test]
fn test_request_json_round_trip_shape() {
    let req: AllocationRequest =
        serde_json::from_str(r#"{"assets":["BTC","USDC"],"risk_tolerance":"0.25"}"#).unwrap();
    assert_eq!(req.risk_tolerance, dec!(0.25));
    let out = allocate(&req, &MarketAssumptions::default()).unwrap();
    let json = serde_json::to_value(&out.result).unwrap();
    assert_eq!(json["optimized_allocations"][0]["asset"], "BTC");
    assert!(json["sharpe_ratio"].is_string());
}
