//! Integration tests for the firesim simulation engine
//!
//! Tests are organized by topic:
//! - `engine` - Run loop invariants and the historical baseline
//! - `determinism` - Seeded reproducibility
//! - `strategies` - Withdrawal strategies driven through the engine
//! - `income` - Scheduled and legacy income offsets
//! - `analytics` - Cohorts, comparison and result stripping
//! - `properties` - Property-based checks over random configurations

mod analytics;
mod properties;
mod strategies;

use crate::model::{Asset, AssetClass, Portfolio, SimulationParameters};

/// $1M split 60/40 between US stocks and bonds
pub(crate) fn sixty_forty() -> Portfolio {
    Portfolio::new()
        .with_asset(Asset::new("Total Market", AssetClass::UsStocks, 2_000.0, 300.0))
        .with_asset(Asset::new("Aggregate Bond", AssetClass::Bonds, 5_000.0, 80.0))
}

pub(crate) fn stocks_only(value: f64) -> Portfolio {
    Portfolio::new().with_asset(Asset::new("Total Market", AssetClass::UsStocks, 1.0, value))
}

/// Seeded 4% fixed-percentage parameters for a $1M portfolio
pub(crate) fn baseline_params(runs: usize, seed: u64) -> SimulationParameters {
    SimulationParameters {
        number_of_runs: runs,
        time_horizon_years: 30,
        initial_portfolio_value: 1_000_000.0,
        rng_seed: Some(seed),
        ..Default::default()
    }
}
