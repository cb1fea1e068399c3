//! Side-by-side comparison of the four withdrawal strategies

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::model::{
    HistoricalDataset, Portfolio, SimulationParameters, StrategyKind, WithdrawalConfiguration,
    WithdrawalStrategy,
};
use crate::simulation::run_simulation;

use super::with_pinned_seed;

/// Upper bound on runs per strategy when no explicit count is given
pub const DEFAULT_COMPARISON_RUNS: usize = 1_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonOptions {
    /// Runs per strategy; defaults to `min(number_of_runs, 1000)`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runs: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyOutcome {
    pub kind: StrategyKind,
    pub strategy: WithdrawalStrategy,
    pub success_rate: f64,
    pub median_final_balance: f64,
    pub average_annual_withdrawal: f64,
    pub probability_of_ruin: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyComparison {
    pub runs_per_strategy: usize,
    /// One outcome per strategy, in [`StrategyKind::ALL`] order
    pub outcomes: Vec<StrategyOutcome>,
    /// Best first: success rate, then median final balance
    pub ranking: Vec<StrategyKind>,
}

impl StrategyComparison {
    #[must_use]
    pub fn outcome(&self, kind: StrategyKind) -> Option<&StrategyOutcome> {
        self.outcomes.iter().find(|o| o.kind == kind)
    }

    #[must_use]
    pub fn best(&self) -> Option<StrategyKind> {
        self.ranking.first().copied()
    }
}

/// Rate every variant shares. A fixed-dollar base implies
/// `annual_amount / initial_value`; any other base uses its configured rate.
#[must_use]
pub fn common_withdrawal_rate(base: &WithdrawalConfiguration, initial_value: f64) -> f64 {
    match base.strategy {
        WithdrawalStrategy::FixedDollar {
            annual_amount: Some(amount),
        } if initial_value > 0.0 => amount / initial_value,
        _ => base.withdrawal_rate,
    }
}

/// The `kind` variant at the same withdrawal rate as `base`.
///
/// A variant of the base's own kind is the base strategy itself, so its
/// bands or dollar amount are kept. Otherwise the defaults apply and fixed
/// dollar withdraws `initial_value` times the common rate.
#[must_use]
pub fn strategy_variant(
    kind: StrategyKind,
    base: &WithdrawalConfiguration,
    initial_value: f64,
) -> WithdrawalStrategy {
    if base.strategy.kind() == kind {
        return base.strategy.clone();
    }
    match kind {
        StrategyKind::FixedPercentage => WithdrawalStrategy::FixedPercentage,
        StrategyKind::DynamicPercentage => WithdrawalStrategy::default_dynamic(),
        StrategyKind::Guardrails => WithdrawalStrategy::default_guardrails(),
        StrategyKind::FixedDollar => WithdrawalStrategy::FixedDollar {
            annual_amount: Some(initial_value * common_withdrawal_rate(base, initial_value)),
        },
    }
}

/// Re-run the engine once per strategy with a reduced run count. Every
/// strategy sees the same market paths.
pub fn compare_strategies(
    portfolio: &Portfolio,
    params: &SimulationParameters,
    dataset: &HistoricalDataset,
    options: ComparisonOptions,
) -> Result<StrategyComparison, AnalysisError> {
    let runs = options
        .runs
        .unwrap_or_else(|| params.number_of_runs.min(DEFAULT_COMPARISON_RUNS));
    let mut base = with_pinned_seed(params);
    base.number_of_runs = runs;
    base.withdrawal_config.withdrawal_rate =
        common_withdrawal_rate(&params.withdrawal_config, params.initial_portfolio_value);

    let mut outcomes = Vec::with_capacity(StrategyKind::ALL.len());
    for kind in StrategyKind::ALL {
        let mut variant = base.clone();
        variant.withdrawal_config.strategy =
            strategy_variant(kind, &params.withdrawal_config, params.initial_portfolio_value);

        let result = run_simulation(portfolio, &variant, dataset)?;
        outcomes.push(StrategyOutcome {
            kind,
            strategy: variant.withdrawal_config.strategy,
            success_rate: result.success_rate,
            median_final_balance: result.median_final_balance,
            average_annual_withdrawal: result.average_annual_withdrawal,
            probability_of_ruin: result.probability_of_ruin,
        });
    }

    let mut ranked: Vec<&StrategyOutcome> = outcomes.iter().collect();
    ranked.sort_by(|a, b| rank_order(a, b));
    let ranking = ranked.into_iter().map(|o| o.kind).collect();

    Ok(StrategyComparison {
        runs_per_strategy: runs,
        outcomes,
        ranking,
    })
}

fn rank_order(a: &StrategyOutcome, b: &StrategyOutcome) -> Ordering {
    b.success_rate
        .total_cmp(&a.success_rate)
        .then(b.median_final_balance.total_cmp(&a.median_final_balance))
}
