//! Simulation output and progress tracking

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};

use crate::model::SimulationParameters;
use crate::stats::{self, standard};

/// One Monte Carlo trajectory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRun {
    pub run_number: usize,
    /// Real balance at the end of each year; index 0 is the initial value
    pub yearly_balances: Vec<f64>,
    pub success: bool,
    /// Sampled real portfolio return for years 1..=T
    #[serde(default)]
    pub annual_returns: Vec<f64>,
    /// Real amount actually taken from the portfolio for years 1..=T
    #[serde(default)]
    pub annual_withdrawals: Vec<f64>,
    /// First year the balance reached zero
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ruin_year: Option<u32>,
}

impl SimulationRun {
    #[must_use]
    pub fn final_balance(&self) -> f64 {
        self.yearly_balances.last().copied().unwrap_or(0.0)
    }

    #[must_use]
    pub fn total_withdrawn(&self) -> f64 {
        self.annual_withdrawals.iter().sum()
    }

    /// Any balance after year 0 hit zero
    #[must_use]
    pub fn is_ruined(&self) -> bool {
        self.yearly_balances.iter().skip(1).any(|b| *b <= 0.0)
    }
}

/// Distribution of balances across runs for one year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YearlyBalanceSummary {
    pub year: u32,
    pub p5: f64,
    pub p25: f64,
    pub median: f64,
    pub p75: f64,
    pub p95: f64,
    pub mean: f64,
}

impl YearlyBalanceSummary {
    fn from_samples(year: u32, samples: &mut [f64]) -> Self {
        samples.sort_by(f64::total_cmp);
        Self {
            year,
            p5: stats::percentile_sorted(samples, standard::P5),
            p25: stats::percentile_sorted(samples, standard::P25),
            median: stats::percentile_sorted(samples, standard::P50),
            p75: stats::percentile_sorted(samples, standard::P75),
            p95: stats::percentile_sorted(samples, standard::P95),
            mean: stats::mean(samples),
        }
    }
}

/// Scalar outcome statistics of a result
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResultSummary {
    pub number_of_runs: usize,
    pub success_rate: f64,
    pub median_final_balance: f64,
    pub probability_of_ruin: f64,
    pub average_annual_withdrawal: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub parameters: SimulationParameters,
    pub success_rate: f64,
    pub median_final_balance: f64,
    pub probability_of_ruin: f64,
    pub average_annual_withdrawal: f64,
    pub yearly_balances: Vec<YearlyBalanceSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_simulation_runs: Option<Vec<SimulationRun>>,
}

impl SimulationResult {
    /// Aggregate runs (in run order) into a result that keeps the runs.
    #[must_use]
    pub fn from_runs(parameters: SimulationParameters, runs: Vec<SimulationRun>) -> Self {
        let horizon = parameters.time_horizon_years;
        let n = runs.len();

        let (success_rate, probability_of_ruin, average_annual_withdrawal) = if n == 0 {
            (0.0, 0.0, 0.0)
        } else {
            let successes = runs.iter().filter(|r| r.success).count();
            let ruined = runs.iter().filter(|r| r.is_ruined()).count();
            let per_run_average: Vec<f64> = runs
                .iter()
                .map(|r| r.total_withdrawn() / f64::from(horizon.max(1)))
                .collect();
            (
                successes as f64 / n as f64,
                ruined as f64 / n as f64,
                stats::mean(&per_run_average),
            )
        };

        let finals: Vec<f64> = runs.iter().map(SimulationRun::final_balance).collect();
        let median_final_balance = stats::median(&finals);

        let yearly_balances = if n == 0 {
            Vec::new()
        } else {
            let mut samples = vec![0.0; n];
            (0..=horizon)
                .map(|year| {
                    for (slot, run) in samples.iter_mut().zip(&runs) {
                        *slot = run
                            .yearly_balances
                            .get(year as usize)
                            .copied()
                            .unwrap_or(0.0);
                    }
                    YearlyBalanceSummary::from_samples(year, &mut samples)
                })
                .collect()
        };

        Self {
            parameters,
            success_rate,
            median_final_balance,
            probability_of_ruin,
            average_annual_withdrawal,
            yearly_balances,
            all_simulation_runs: Some(runs),
        }
    }

    /// Copy without per-run trajectories
    #[must_use]
    pub fn without_runs(&self) -> Self {
        Self {
            parameters: self.parameters.clone(),
            success_rate: self.success_rate,
            median_final_balance: self.median_final_balance,
            probability_of_ruin: self.probability_of_ruin,
            average_annual_withdrawal: self.average_annual_withdrawal,
            yearly_balances: self.yearly_balances.clone(),
            all_simulation_runs: None,
        }
    }

    /// Drop per-run trajectories in place
    #[must_use]
    pub fn strip_runs(mut self) -> Self {
        self.all_simulation_runs = None;
        self
    }

    #[must_use]
    pub fn runs(&self) -> Option<&[SimulationRun]> {
        self.all_simulation_runs.as_deref()
    }

    #[must_use]
    pub fn number_of_runs(&self) -> usize {
        self.runs()
            .map_or(self.parameters.number_of_runs, <[SimulationRun]>::len)
    }

    #[must_use]
    pub fn summary(&self) -> ResultSummary {
        ResultSummary {
            number_of_runs: self.number_of_runs(),
            success_rate: self.success_rate,
            median_final_balance: self.median_final_balance,
            probability_of_ruin: self.probability_of_ruin,
            average_annual_withdrawal: self.average_annual_withdrawal,
        }
    }

    /// Rebuild every aggregate from the stored runs. `None` when stripped.
    #[must_use]
    pub fn recompute_from_runs(&self) -> Option<Self> {
        let runs = self.all_simulation_runs.clone()?;
        Some(Self::from_runs(self.parameters.clone(), runs))
    }
}

/// Progress tracking for a Monte Carlo invocation.
///
/// Clones share the same counters, so a UI thread can poll progress and
/// request cancellation while the engine runs elsewhere.
#[derive(Debug, Clone, Default)]
pub struct MonteCarloProgress {
    completed: Arc<AtomicUsize>,
    cancelled: Arc<AtomicBool>,
}

impl MonteCarloProgress {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from existing atomics (for UI integration)
    pub fn from_atomics(completed: Arc<AtomicUsize>, cancelled: Arc<AtomicBool>) -> Self {
        Self {
            completed,
            cancelled,
        }
    }

    /// Number of completed runs
    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn increment(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.completed.store(0, Ordering::Relaxed);
        self.cancelled.store(false, Ordering::Relaxed);
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}
