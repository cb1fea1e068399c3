//! Property-based checks over random configurations

use proptest::prelude::*;

use crate::model::{AssetClass, HistoricalDataset, SimulationParameters, WithdrawalStrategy};
use crate::simulation::run_simulation;

use super::sixty_forty;

fn strategy_for(index: usize) -> WithdrawalStrategy {
    match index {
        0 => WithdrawalStrategy::FixedPercentage,
        1 => WithdrawalStrategy::DynamicPercentage {
            floor_percentage: Some(0.03),
            ceiling_percentage: Some(0.06),
        },
        2 => WithdrawalStrategy::default_guardrails(),
        _ => WithdrawalStrategy::FixedDollar {
            annual_amount: Some(45_000.0),
        },
    }
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(24))]

    #[test]
    fn prop_balances_are_bounded_and_rates_are_probabilities(
        seed in any::<u64>(),
        rate in 0.0f64..0.12,
        years in 1u32..45,
        strategy in 0usize..4,
        bootstrap in any::<bool>(),
        block in prop::option::of(2usize..12),
        stock_weight in 0.0f64..=1.0,
    ) {
        let params = SimulationParameters::builder()
            .runs(40)
            .years(years)
            .initial_value(1_000_000.0)
            .seed(seed)
            .historical_bootstrap(bootstrap)
            .allocation(AssetClass::UsStocks, stock_weight)
            .allocation(AssetClass::Bonds, 1.0 - stock_weight)
            .withdrawal(strategy_for(strategy), rate)
            .build()
            .unwrap();
        let params = SimulationParameters {
            bootstrap_block_length: block,
            ..params
        };

        let result = run_simulation(&sixty_forty(), &params, &HistoricalDataset::us_default())
            .unwrap();

        prop_assert!((0.0..=1.0).contains(&result.success_rate));
        prop_assert!((0.0..=1.0).contains(&result.probability_of_ruin));
        prop_assert!(result.average_annual_withdrawal >= 0.0);
        for run in result.runs().unwrap() {
            prop_assert_eq!(run.yearly_balances.len(), years as usize + 1);
            prop_assert_eq!(run.yearly_balances[0], 1_000_000.0);
            prop_assert!(run.yearly_balances.iter().all(|b| b.is_finite() && *b >= 0.0));
            prop_assert!(run.annual_withdrawals.iter().all(|w| *w >= 0.0));
            prop_assert_eq!(run.success, run.ruin_year.is_none());
        }
    }
}
