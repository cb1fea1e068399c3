//! Withdrawal-rate sensitivity
//!
//! Both the sweep and the search re-run the engine with the same seed at
//! every rate, so differences between points come from the rate alone.

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::model::{HistoricalDataset, Portfolio, SimulationParameters, WithdrawalStrategy};
use crate::simulation::run_simulation;

use super::with_pinned_seed;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    pub withdrawal_rate: f64,
    pub success_rate: f64,
    pub median_final_balance: f64,
}

/// Outcome of [`find_sustainable_withdrawal_rate`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SustainableRate {
    /// Highest rate found that meets the target (the lower bound when even
    /// that misses it)
    pub withdrawal_rate: f64,
    pub success_rate: f64,
    /// Whether `withdrawal_rate` actually meets the target
    pub feasible: bool,
    pub converged: bool,
    pub iterations: usize,
}

/// Search settings for [`find_sustainable_withdrawal_rate`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateSearch {
    /// Required success rate, e.g. 0.95
    pub target_success: f64,
    pub min_rate: f64,
    pub max_rate: f64,
    /// Stop once the bracket is narrower than this
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for RateSearch {
    fn default() -> Self {
        Self {
            target_success: 0.95,
            min_rate: 0.0,
            max_rate: 0.10,
            tolerance: 1e-4,
            max_iterations: 30,
        }
    }
}

/// Parameters with the withdrawal rate replaced. A fixed-dollar strategy
/// follows the rate too (`initial_value * rate`).
fn at_rate(base: &SimulationParameters, rate: f64) -> SimulationParameters {
    let mut params = base.clone();
    params.withdrawal_config.withdrawal_rate = rate;
    if let WithdrawalStrategy::FixedDollar { annual_amount } =
        &mut params.withdrawal_config.strategy
    {
        *annual_amount = Some(base.initial_portfolio_value * rate);
    }
    params
}

fn evaluate(
    portfolio: &Portfolio,
    params: &SimulationParameters,
    dataset: &HistoricalDataset,
    rate: f64,
) -> Result<SweepPoint, AnalysisError> {
    let result = run_simulation(portfolio, &at_rate(params, rate), dataset)?;
    Ok(SweepPoint {
        withdrawal_rate: rate,
        success_rate: result.success_rate,
        median_final_balance: result.median_final_balance,
    })
}

/// Success rate and median final balance at each rate in `rates`.
pub fn sweep_withdrawal_rates(
    portfolio: &Portfolio,
    params: &SimulationParameters,
    dataset: &HistoricalDataset,
    rates: &[f64],
) -> Result<Vec<SweepPoint>, AnalysisError> {
    let base = with_pinned_seed(params);
    rates
        .iter()
        .map(|rate| evaluate(portfolio, &base, dataset, *rate))
        .collect()
}

/// Binary search for the highest withdrawal rate whose success rate meets
/// `search.target_success`.
///
/// Assumes success falls as the rate rises.
pub fn find_sustainable_withdrawal_rate(
    portfolio: &Portfolio,
    params: &SimulationParameters,
    dataset: &HistoricalDataset,
    search: &RateSearch,
) -> Result<SustainableRate, AnalysisError> {
    let RateSearch {
        target_success,
        min_rate: mut low,
        max_rate: mut high,
        tolerance,
        max_iterations,
    } = *search;
    if !(low.is_finite() && high.is_finite() && low >= 0.0 && low < high)
        || !(0.0..=1.0).contains(&target_success)
    {
        return Err(AnalysisError::InvalidSearchBounds { low, high });
    }

    let base = with_pinned_seed(params);

    // Evaluate endpoints first
    let mut best = evaluate(portfolio, &base, dataset, low)?;
    if best.success_rate < target_success {
        return Ok(SustainableRate {
            withdrawal_rate: low,
            success_rate: best.success_rate,
            feasible: false,
            converged: false,
            iterations: 0,
        });
    }
    let high_point = evaluate(portfolio, &base, dataset, high)?;
    if high_point.success_rate >= target_success {
        return Ok(SustainableRate {
            withdrawal_rate: high,
            success_rate: high_point.success_rate,
            feasible: true,
            converged: true,
            iterations: 0,
        });
    }

    let mut iterations = 0;
    while iterations < max_iterations && high - low > tolerance {
        iterations += 1;
        let mid = f64::midpoint(low, high);
        let point = evaluate(portfolio, &base, dataset, mid)?;
        tracing::debug!(
            iteration = iterations,
            rate = mid,
            success_rate = point.success_rate,
            "withdrawal rate search"
        );
        if point.success_rate >= target_success {
            low = mid;
            best = point;
        } else {
            high = mid;
        }
    }

    Ok(SustainableRate {
        withdrawal_rate: best.withdrawal_rate,
        success_rate: best.success_rate,
        feasible: true,
        converged: high - low <= tolerance,
        iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Asset, AssetClass, HistoricalReturns};

    fn portfolio() -> Portfolio {
        Portfolio::new().with_asset(Asset::new("Index", AssetClass::UsStocks, 1.0, 100_000.0))
    }

    fn params() -> SimulationParameters {
        SimulationParameters {
            number_of_runs: 20,
            time_horizon_years: 10,
            initial_portfolio_value: 100_000.0,
            inflation_rate: 0.0,
            rng_seed: Some(1),
            ..Default::default()
        }
    }

    /// Flat 0% real returns: a rate above 10% over 10 years always fails.
    fn flat() -> HistoricalDataset {
        HistoricalDataset::new().with_series(
            AssetClass::UsStocks,
            HistoricalReturns::new("flat", 2000, vec![0.0; 5]),
        )
    }

    #[test]
    fn test_sweep_reports_each_rate() {
        let points =
            sweep_withdrawal_rates(&portfolio(), &params(), &flat(), &[0.05, 0.09, 0.12]).unwrap();
        let success: Vec<f64> = points.iter().map(|p| p.success_rate).collect();
        assert_eq!(success, vec![1.0, 1.0, 0.0]);
        assert_eq!(points[0].withdrawal_rate, 0.05);
        assert!(points[0].median_final_balance > points[1].median_final_balance);
    }

    #[test]
    fn test_search_converges_on_break_even_rate() {
        let search = RateSearch {
            target_success: 0.95,
            min_rate: 0.01,
            max_rate: 0.20,
            tolerance: 1e-4,
            max_iterations: 40,
        };
        let found =
            find_sustainable_withdrawal_rate(&portfolio(), &params(), &flat(), &search).unwrap();
        assert!(found.feasible);
        assert!(found.converged);
        assert_eq!(found.success_rate, 1.0);
        assert!(found.withdrawal_rate < 0.10 && found.withdrawal_rate > 0.0998);
    }

    #[test]
    fn test_search_reports_infeasible_lower_bound() {
        let search = RateSearch {
            min_rate: 0.15,
            max_rate: 0.20,
            ..Default::default()
        };
        let found =
            find_sustainable_withdrawal_rate(&portfolio(), &params(), &flat(), &search).unwrap();
        assert!(!found.feasible);
        assert_eq!(found.withdrawal_rate, 0.15);
    }

    #[test]
    fn test_search_rejects_bad_bounds() {
        let search = RateSearch {
            min_rate: 0.05,
            max_rate: 0.01,
            ..Default::default()
        };
        assert!(matches!(
            find_sustainable_withdrawal_rate(&portfolio(), &params(), &flat(), &search),
            Err(AnalysisError::InvalidSearchBounds { .. })
        ));
    }

    #[test]
    fn test_fixed_dollar_follows_rate() {
        let mut base = params();
        base.withdrawal_config.strategy = WithdrawalStrategy::FixedDollar {
            annual_amount: Some(1.0),
        };
        let adjusted = at_rate(&base, 0.05);
        assert_eq!(
            adjusted.withdrawal_config.strategy,
            WithdrawalStrategy::FixedDollar {
                annual_amount: Some(5_000.0)
            }
        );
    }
}
