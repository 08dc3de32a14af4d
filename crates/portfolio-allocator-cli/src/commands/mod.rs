pub mod allocation;
pub mod market_data;
pub mod portfolio_optimization;
