pub mod assumptions;
pub mod statistics;

pub use assumptions::{CorrelationClass, MarketAssumptions, VolatilityClass};
pub use statistics::{provide_market_statistics, MarketStatistics};
