pub mod linalg;
pub mod mean_variance;
pub mod solver;

pub use mean_variance::{
    optimize_mean_variance, optimize_portfolio, optimize_portfolio_with, trace_frontier,
    FrontierOutput, FrontierPoint, MeanVarianceInput, OptimalPortfolio, OptimizationResult,
};
pub use solver::{ActiveSetSolver, ProjectedGradientSolver, QpSolver, QuadraticProgram};
