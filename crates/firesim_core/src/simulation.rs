//! Monte Carlo engine
//!
//! Every run gets its own `SmallRng` seeded from `base_seed + run_number`, so
//! a seeded invocation is reproducible regardless of how runs are scheduled
//! across threads.

use std::collections::BTreeMap;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
#[cfg(feature = "parallel")]
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::error::{ConfigurationError, Result, SimulationError};
use crate::model::{
    AssetClass, HistoricalDataSource, HistoricalDataset, MonteCarloProgress, Portfolio,
    SimulationParameters, SimulationResult, SimulationRun,
};
use crate::sampler::{BlockCursor, InflationModel, ReturnSampler};
use crate::withdrawal::{IncomeSource, WithdrawalInputs, WithdrawalState, calculate_withdrawal};

/// Run the Monte Carlo simulation.
pub fn run_simulation(
    portfolio: &Portfolio,
    params: &SimulationParameters,
    dataset: &HistoricalDataset,
) -> Result<SimulationResult> {
    run_simulation_with_progress(portfolio, params, dataset, &MonteCarloProgress::new())
}

/// Load the dataset from `source`, then run. Load failures are returned
/// as `DataUnavailable`.
pub fn run_simulation_from_source(
    portfolio: &Portfolio,
    params: &SimulationParameters,
    source: &dyn HistoricalDataSource,
) -> Result<SimulationResult> {
    let dataset = source.load()?;
    run_simulation(portfolio, params, &dataset)
}

/// Run the Monte Carlo simulation, reporting each completed run to
/// `progress`. Cancellation is checked before each run starts; a cancelled
/// invocation returns [`SimulationError::Cancelled`].
pub fn run_simulation_with_progress(
    portfolio: &Portfolio,
    params: &SimulationParameters,
    dataset: &HistoricalDataset,
    progress: &MonteCarloProgress,
) -> Result<SimulationResult> {
    let engine = Engine::new(portfolio, params, dataset)?;
    let base_seed = params.rng_seed.unwrap_or_else(|| rand::rng().random());

    tracing::info!(
        runs = params.number_of_runs,
        horizon = params.time_horizon_years,
        seeded = params.rng_seed.is_some(),
        "starting Monte Carlo simulation"
    );

    let simulate = |run_number: usize| {
        if progress.is_cancelled() {
            return None;
        }
        let run = engine.simulate_run(run_number, base_seed.wrapping_add(run_number as u64));
        progress.increment();
        Some(run)
    };

    #[cfg(feature = "parallel")]
    let runs: Option<Vec<SimulationRun>> = (0..params.number_of_runs)
        .into_par_iter()
        .map(simulate)
        .collect();
    #[cfg(not(feature = "parallel"))]
    let runs: Option<Vec<SimulationRun>> = (0..params.number_of_runs).map(simulate).collect();

    let Some(runs) = runs else {
        tracing::warn!(
            completed = progress.completed(),
            "Monte Carlo simulation cancelled"
        );
        return Err(SimulationError::Cancelled);
    };

    let result = SimulationResult::from_runs(params.clone(), runs);
    tracing::info!(
        success_rate = result.success_rate,
        median_final_balance = result.median_final_balance,
        "Monte Carlo simulation complete"
    );
    Ok(result)
}

/// Everything resolved once per invocation and shared by all runs
struct Engine<'a> {
    params: &'a SimulationParameters,
    sampler: ReturnSampler<'a>,
    inflation: InflationModel<'a>,
    income_source: IncomeSource,
}

impl<'a> Engine<'a> {
    fn new(
        portfolio: &Portfolio,
        params: &'a SimulationParameters,
        dataset: &'a HistoricalDataset,
    ) -> Result<Self> {
        if portfolio.is_empty() {
            return Err(ConfigurationError::EmptyPortfolio.into());
        }
        params.validate()?;

        let weights: BTreeMap<AssetClass, f64> = params.allocation_weights(portfolio);
        tracing::debug!(
            ?weights,
            strategy = ?params.withdrawal_config.strategy,
            rate = params.withdrawal_config.withdrawal_rate,
            bootstrap = params.use_historical_bootstrap,
            inflation = ?params.inflation_strategy,
            "simulation configuration"
        );

        Ok(Self {
            params,
            sampler: ReturnSampler::new(&weights, params, dataset)?,
            inflation: InflationModel::new(params, dataset)?,
            income_source: IncomeSource::resolve(params),
        })
    }

    /// One trajectory: a fold over `(balance, withdrawal state, price index)`.
    fn simulate_run(&self, run_number: usize, seed: u64) -> SimulationRun {
        let params = self.params;
        let horizon = params.time_horizon_years;
        let initial = params.initial_portfolio_value;
        let schedule = params.active_income_schedule();
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut cursor = BlockCursor::default();

        let mut yearly_balances = Vec::with_capacity(horizon as usize + 1);
        let mut annual_returns = Vec::with_capacity(horizon as usize);
        let mut annual_withdrawals = Vec::with_capacity(horizon as usize);
        yearly_balances.push(initial);

        let mut balance = initial;
        let mut state = WithdrawalState::default();
        let mut price_index = 1.0;
        let mut ruin_year = None;

        for year in 1..=horizon {
            // Draws continue after ruin so later years consume the same
            // random stream whatever happened earlier
            let draw = self.sampler.sample(year, &mut cursor, &mut rng);
            let inflation = self.inflation.sample(&draw);
            // The market path is recorded in full; cohort scoring reads it
            annual_returns.push(draw.real_return);

            if balance > 0.0 {
                balance = (balance * (1.0 + draw.real_return)).max(0.0);

                let inputs = WithdrawalInputs {
                    current_balance: balance,
                    year,
                    initial_balance: initial,
                    price_index,
                    scheduled_income: self.income_source.scheduled_income(
                        schedule,
                        year,
                        params.retirement_age,
                        price_index,
                    ),
                    income_source: self.income_source,
                    tax_rate: params.tax_rate,
                };
                let (requested, next_state) =
                    calculate_withdrawal(&params.withdrawal_config, state, &inputs);
                state = next_state;

                let actual = requested.min(balance);
                balance = (balance - requested).max(0.0);
                annual_withdrawals.push(actual);

                if balance <= 0.0 {
                    balance = 0.0;
                    ruin_year = Some(year);
                }
            } else {
                annual_withdrawals.push(0.0);
            }

            yearly_balances.push(balance);
            price_index *= 1.0 + inflation;
        }

        SimulationRun {
            run_number,
            yearly_balances,
            success: balance > 0.0,
            annual_returns,
            annual_withdrawals,
            ruin_year,
        }
    }
}
