//! Per-asset return and volatility assumptions plus the correlation
//! heuristic, held as data so the generator can run against any table.
//!
//! Class membership is evaluated in declaration order: the first class that
//! names an asset decides its volatility, and the first correlation class
//! naming both assets of a pair decides their correlation.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::AllocatorError;
use crate::types::{AssetId, Rate};
use crate::AllocatorResult;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const DEFAULT_RETURN: Decimal = dec!(0.15);
const DEFAULT_VOLATILITY: Decimal = dec!(0.50);
const BASE_CORRELATION: Decimal = dec!(0.50);

const HIGH_VOLATILITY: Decimal = dec!(0.80);
const MID_VOLATILITY: Decimal = dec!(0.60);
const STABLE_VOLATILITY: Decimal = dec!(0.05);

const STABLECOIN_CORRELATION: Decimal = dec!(0.95);
const MAJOR_CORRELATION: Decimal = dec!(0.80);

const STABLECOINS: [&str; 3] = ["USDC", "USDT", "DAI"];
const MAJORS: [&str; 2] = ["BTC", "ETH"];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A named group of assets sharing one volatility assumption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolatilityClass {
    pub name: String,
    pub members: Vec<AssetId>,
    /// Annualized standard deviation of returns.
    pub volatility: Rate,
}

/// A named group of assets that are correlated with each other above the
/// base level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationClass {
    pub name: String,
    pub members: Vec<AssetId>,
    /// Pairwise correlation between two distinct members.
    pub correlation: Decimal,
}

/// Injectable market assumptions driving the statistics generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketAssumptions {
    /// Annualized expected return per known asset.
    pub expected_returns: BTreeMap<AssetId, Rate>,
    /// Return assigned to assets missing from `expected_returns`.
    pub default_return: Rate,
    /// Volatility classes in precedence order.
    pub volatility_classes: Vec<VolatilityClass>,
    /// Volatility assigned when no class matches.
    pub default_volatility: Rate,
    /// Correlation classes in precedence order.
    pub correlation_classes: Vec<CorrelationClass>,
    /// Correlation between two distinct assets sharing no class.
    pub base_correlation: Decimal,
}

impl VolatilityClass {
    pub fn contains(&self, asset: &str) -> bool {
        self.members.iter().any(|m| m == asset)
    }
}

impl CorrelationClass {
    pub fn contains(&self, asset: &str) -> bool {
        self.members.iter().any(|m| m == asset)
    }
}

// ---------------------------------------------------------------------------
// Lookups
// ---------------------------------------------------------------------------

impl MarketAssumptions {
    /// Expected return for `asset`, falling back to the default. Never fails.
    pub fn expected_return(&self, asset: &str) -> Rate {
        self.expected_returns
            .get(asset)
            .copied()
            .unwrap_or(self.default_return)
    }

    /// Whether `asset` has an explicit return assumption.
    pub fn is_known(&self, asset: &str) -> bool {
        self.expected_returns.contains_key(asset)
    }

    /// Volatility of the first class containing `asset`, else the default.
    pub fn volatility(&self, asset: &str) -> Rate {
        self.volatility_classes
            .iter()
            .find(|class| class.contains(asset))
            .map(|class| class.volatility)
            .unwrap_or(self.default_volatility)
    }

    /// Correlation between two assets at distinct positions in a request.
    pub fn pair_correlation(&self, a: &str, b: &str) -> Decimal {
        self.correlation_classes
            .iter()
            .find(|class| class.contains(a) && class.contains(b))
            .map(|class| class.correlation)
            .unwrap_or(self.base_correlation)
    }

    /// Parse assumptions from JSON and check them.
    pub fn from_json(json: &str) -> AllocatorResult<Self> {
        let assumptions: MarketAssumptions =
            serde_json::from_str(json).map_err(|e| AllocatorError::InvalidInput {
                field: "assumptions".into(),
                reason: e.to_string(),
            })?;
        assumptions.validate()?;
        Ok(assumptions)
    }

    /// Reject tables that cannot describe a market: negative volatilities and
    /// correlations outside [-1, 1].
    pub fn validate(&self) -> AllocatorResult<()> {
        if self.default_volatility < Decimal::ZERO {
            return Err(AllocatorError::InvalidInput {
                field: "default_volatility".into(),
                reason: format!("must be non-negative, got {}", self.default_volatility),
            });
        }
        for (i, class) in self.volatility_classes.iter().enumerate() {
            if class.volatility < Decimal::ZERO {
                return Err(AllocatorError::InvalidInput {
                    field: format!("volatility_classes[{}]", i),
                    reason: format!(
                        "class '{}' has negative volatility {}",
                        class.name, class.volatility
                    ),
                });
            }
        }
        check_correlation("base_correlation", self.base_correlation)?;
        for (i, class) in self.correlation_classes.iter().enumerate() {
            check_correlation(&format!("correlation_classes[{}]", i), class.correlation)?;
        }
        Ok(())
    }
}

fn check_correlation(field: &str, value: Decimal) -> AllocatorResult<()> {
    if value < Decimal::NEGATIVE_ONE || value > Decimal::ONE {
        return Err(AllocatorError::InvalidInput {
            field: field.into(),
            reason: format!("correlation must be within [-1, 1], got {}", value),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Built-in table
// ---------------------------------------------------------------------------

fn members(ids: &[&str]) -> Vec<AssetId> {
    ids.iter().map(|s| s.to_string()).collect()
}

impl Default for MarketAssumptions {
    fn default() -> Self {
        let expected_returns: BTreeMap<AssetId, Rate> = [
            ("BTC", dec!(0.20)),
            ("ETH", dec!(0.25)),
            ("SOL", dec!(0.30)),
            ("AVAX", dec!(0.22)),
            ("BNB", dec!(0.18)),
            ("USDC", dec!(0.04)),
            ("USDT", dec!(0.04)),
            ("DAI", dec!(0.04)),
            ("LINK", dec!(0.15)),
            ("DOT", dec!(0.17)),
            ("ADA", dec!(0.16)),
            ("XRP", dec!(0.13)),
            ("MATIC", dec!(0.23)),
            ("DOGE", dec!(0.10)),
            ("UNI", dec!(0.14)),
            ("SHIB", dec!(0.08)),
            ("AAVE", dec!(0.19)),
            ("MKR", dec!(0.21)),
        ]
        .into_iter()
        .map(|(asset, ret)| (asset.to_string(), ret))
        .collect();

        MarketAssumptions {
            expected_returns,
            default_return: DEFAULT_RETURN,
            volatility_classes: vec![
                VolatilityClass {
                    name: "high".into(),
                    members: members(&["BTC", "ETH", "SOL", "AVAX", "DOGE", "SHIB"]),
                    volatility: HIGH_VOLATILITY,
                },
                VolatilityClass {
                    name: "mid".into(),
                    members: members(&[
                        "BNB", "LINK", "DOT", "ADA", "XRP", "MATIC", "UNI", "AAVE", "MKR",
                    ]),
                    volatility: MID_VOLATILITY,
                },
                VolatilityClass {
                    name: "stable".into(),
                    members: members(&STABLECOINS),
                    volatility: STABLE_VOLATILITY,
                },
            ],
            default_volatility: DEFAULT_VOLATILITY,
            correlation_classes: vec![
                CorrelationClass {
                    name: "stablecoins".into(),
                    members: members(&STABLECOINS),
                    correlation: STABLECOIN_CORRELATION,
                },
                CorrelationClass {
                    name: "majors".into(),
                    members: members(&MAJORS),
                    correlation: MAJOR_CORRELATION,
                },
            ],
            base_correlation: BASE_CORRELATION,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
