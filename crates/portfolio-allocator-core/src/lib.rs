pub mod error;
pub mod types;

#[cfg(feature = "market_data")]
pub mod market_data;

#[cfg(feature = "portfolio_optimization")]
pub mod portfolio_optimization;

#[cfg(feature = "allocation")]
pub mod allocation;

pub use error::AllocatorError;
pub use types::*;

/// Standard result type for all allocator operations
pub type AllocatorResult<T> = Result<T, AllocatorError>;
