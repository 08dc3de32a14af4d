mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::allocation::OptimizeArgs;
use commands::market_data::MarketStatsArgs;
use commands::portfolio_optimization::{FrontierArgs, SolveArgs};
use portfolio_allocator_core::AllocatorError;

/// Long-only mean-variance portfolio allocation
#[derive(Parser)]
#[command(
    name = "pfa",
    version,
    about = "Long-only mean-variance portfolio allocation",
    long_about = "Allocates capital across a list of assets by maximizing expected return \
                  minus a risk penalty, using synthetic market statistics and decimal \
                  precision. Also exposes the raw optimizer and a risk-tolerance sweep."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Optimize an allocation across named assets
    Optimize(OptimizeArgs),
    /// Show synthetic expected returns, volatilities and covariance
    MarketStats(MarketStatsArgs),
    /// Solve a mean-variance problem from raw returns and covariance
    Solve(SolveArgs),
    /// Sweep risk tolerance from 0 to 1 over named assets
    Frontier(FrontierArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

/// 2 for a rejected request, 1 for everything else.
fn exit_code(err: &(dyn std::error::Error + 'static)) -> i32 {
    match err.downcast_ref::<AllocatorError>() {
        Some(e) if e.is_validation() => 2,
        _ => 1,
    }
}

fn main() {
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Optimize(args) => commands::allocation::run_optimize(args),
        Commands::MarketStats(args) => commands::market_data::run_market_stats(args),
        Commands::Solve(args) => commands::portfolio_optimization::run_solve(args),
        Commands::Frontier(args) => commands::portfolio_optimization::run_frontier(args),
        Commands::Version => {
            println!("pfa {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(exit_code(e.as_ref()));
        }
    }
}
