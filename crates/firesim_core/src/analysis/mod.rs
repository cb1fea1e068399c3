//! Post-hoc analytics over simulation output.
//!
//! - [`analyze_sequence_risk`] splits the runs of an existing result into
//!   poor, average and good early-return cohorts.
//! - [`compare_strategies`] re-runs the engine once per withdrawal strategy.
//! - [`sweep_withdrawal_rates`] and [`find_sustainable_withdrawal_rate`]
//!   re-run it across withdrawal rates.
//!
//! ```ignore
//! use firesim_core::analysis::{RateSearch, find_sustainable_withdrawal_rate};
//!
//! let found = find_sustainable_withdrawal_rate(
//!     &portfolio,
//!     &params,
//!     &HistoricalDataset::us_default(),
//!     &RateSearch { target_success: 0.90, ..Default::default() },
//! )?;
//! println!("{:.2}% is sustainable", found.withdrawal_rate * 100.0);
//! ```

mod cohort;
mod comparison;
mod sweep;

pub use cohort::*;
pub use comparison::*;
pub use sweep::*;

use rand::Rng;

use crate::model::SimulationParameters;

/// Copy of `params` with a concrete seed, so that repeated engine calls see
/// the same market paths.
fn with_pinned_seed(params: &SimulationParameters) -> SimulationParameters {
    let mut pinned = params.clone();
    pinned.rng_seed = Some(params.rng_seed.unwrap_or_else(|| rand::rng().random()));
    pinned
}
