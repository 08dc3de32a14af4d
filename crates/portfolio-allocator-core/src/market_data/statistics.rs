use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::assumptions::MarketAssumptions;
use crate::types::{AssetId, Matrix, Rate};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Synthetic market statistics for an ordered list of assets. Every vector
/// and matrix is indexed in the order of `assets`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketStatistics {
    pub assets: Vec<AssetId>,
    pub expected_returns: Vec<Rate>,
    pub volatilities: Vec<Rate>,
    pub correlation_matrix: Matrix,
    /// outer(volatilities, volatilities) scaled element-wise by correlation.
    pub covariance_matrix: Matrix,
    /// Assets priced with the default return because the table lacks them.
    pub unknown_assets: Vec<AssetId>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Market statistics from the built-in assumption table.
///
/// An empty asset list yields empty vectors and a 0x0 matrix.
pub fn provide_market_statistics(assets: &[AssetId]) -> MarketStatistics {
    MarketAssumptions::default().generate(assets)
}

impl MarketAssumptions {
    /// Build expected returns and the covariance matrix for `assets`.
    ///
    /// Lookups are total, so this never fails. Symmetry is exact: each
    /// off-diagonal pair is computed once and written to both cells.
    pub fn generate(&self, assets: &[AssetId]) -> MarketStatistics {
        let n = assets.len();

        let expected_returns: Vec<Rate> =
            assets.iter().map(|a| self.expected_return(a)).collect();
        let volatilities: Vec<Rate> = assets.iter().map(|a| self.volatility(a)).collect();

        let mut correlation_matrix = vec![vec![Decimal::ZERO; n]; n];
        let mut covariance_matrix = vec![vec![Decimal::ZERO; n]; n];
        for i in 0..n {
            correlation_matrix[i][i] = Decimal::ONE;
            covariance_matrix[i][i] = volatilities[i] * volatilities[i];
            for j in (i + 1)..n {
                let rho = self.pair_correlation(&assets[i], &assets[j]);
                let cov = volatilities[i] * volatilities[j] * rho;
                correlation_matrix[i][j] = rho;
                correlation_matrix[j][i] = rho;
                covariance_matrix[i][j] = cov;
                covariance_matrix[j][i] = cov;
            }
        }

        let mut unknown_assets: Vec<AssetId> = Vec::new();
        for asset in assets {
            if !self.is_known(asset) && !unknown_assets.contains(asset) {
                unknown_assets.push(asset.clone());
            }
        }

        MarketStatistics {
            assets: assets.to_vec(),
            expected_returns,
            volatilities,
            correlation_matrix,
            covariance_matrix,
            unknown_assets,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
