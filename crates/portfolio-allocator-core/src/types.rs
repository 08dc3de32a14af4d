use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Rates and returns expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Portfolio weight as a fraction of capital (0.25 = 25%).
pub type Weight = Decimal;

/// Opaque asset identifier, e.g. a ticker symbol.
pub type AssetId = String;

/// Dense row-major matrix.
pub type Matrix = Vec<Vec<Decimal>>;

/// Decimal places used for every presented figure.
pub const OUTPUT_DECIMAL_PLACES: u32 = 4;

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

/// Round a figure for presentation.
pub fn round_output(value: Decimal) -> Decimal {
    value.round_dp(OUTPUT_DECIMAL_PLACES)
}
