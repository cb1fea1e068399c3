//! Retirement (FIRE) Monte Carlo simulation library
//!
//! This crate estimates whether a portfolio lasts through retirement when
//! market returns, inflation and withdrawals are uncertain. It provides:
//! - Historical bootstrap (i.i.d. or block) and parametric return sampling
//! - Fixed or historically correlated inflation
//! - Four withdrawal strategies (fixed %, dynamic %, guardrails, fixed dollar)
//! - Age-gated guaranteed income (pensions, Social Security) with optional COLA
//! - Sequence-of-returns cohorts, strategy comparison and withdrawal-rate search
//!
//! All amounts are in real (year-1) dollars.
//!
//! ```ignore
//! use firesim_core::model::{Asset, AssetClass, HistoricalDataset, Portfolio, SimulationParameters};
//! use firesim_core::simulation::run_simulation;
//!
//! let portfolio = Portfolio::new()
//!     .with_asset(Asset::new("VTI", AssetClass::UsStocks, 2_000.0, 300.0))
//!     .with_asset(Asset::new("BND", AssetClass::Bonds, 5_000.0, 80.0));
//!
//! let params = SimulationParameters::builder()
//!     .initial_value(portfolio.total_value())
//!     .years(30)
//!     .seed(42)
//!     .build()?;
//!
//! let result = run_simulation(&portfolio, &params, &HistoricalDataset::us_default())?;
//! println!("success rate: {:.1}%", result.success_rate * 100.0);
//! ```

#![warn(clippy::all)]

// ============================================================================
// Core modules
// ============================================================================

pub mod analysis;
pub mod error;
pub mod sampler;
pub mod simulation;
pub mod stats;
pub mod withdrawal;

// ============================================================================
// Type definition modules
// ============================================================================

pub mod config;
pub mod model;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use config::{ParametersBuilder, RetirementAssumptions};
pub use error::{AnalysisError, ConfigurationError, DataUnavailableError, SimulationError};
pub use simulation::{run_simulation, run_simulation_from_source, run_simulation_with_progress};
