//! Withdrawal strategies driven through the engine

use crate::model::{
    AssetClass, HistoricalDataset, HistoricalReturns, SimulationParameters, WithdrawalStrategy,
};
use crate::simulation::run_simulation;

use super::{baseline_params, sixty_forty, stocks_only};

fn flat_dataset(r: f64) -> HistoricalDataset {
    HistoricalDataset::new().with_series(
        AssetClass::UsStocks,
        HistoricalReturns::new("flat", 2000, vec![r; 20]),
    )
}

/// Deterministic -10% real every year
fn crash_params(strategy: WithdrawalStrategy, rate: f64) -> SimulationParameters {
    SimulationParameters::builder()
        .runs(1)
        .years(20)
        .initial_value(1_000_000.0)
        .historical_bootstrap(false)
        .custom_return(AssetClass::UsStocks, -0.10)
        .custom_volatility(AssetClass::UsStocks, 0.0)
        .withdrawal(strategy, rate)
        .seed(1)
        .build()
        .unwrap()
}

#[test]
fn test_higher_rates_never_succeed_more_often() {
    let dataset = HistoricalDataset::us_default();
    let rates = [0.03, 0.04, 0.05, 0.06];
    let success: Vec<f64> = rates
        .iter()
        .map(|rate| {
            let mut params = baseline_params(1_000, 31);
            params.withdrawal_config.withdrawal_rate = *rate;
            run_simulation(&sixty_forty(), &params, &dataset)
                .unwrap()
                .success_rate
        })
        .collect();

    for pair in success.windows(2) {
        assert!(pair[0] >= pair[1], "success rates not monotone: {success:?}");
    }
}

#[test]
fn test_guardrails_cut_after_a_breach_in_a_crash() {
    let result = run_simulation(
        &stocks_only(1_000_000.0),
        &crash_params(WithdrawalStrategy::default_guardrails(), 0.05),
        &HistoricalDataset::new(),
    )
    .unwrap();
    let run = &result.runs().unwrap()[0];
    let upper = 0.05 * 1.2;

    let mut cuts = 0;
    for t in 1..run.annual_withdrawals.len() {
        let post_return = run.yearly_balances[t] * (1.0 + run.annual_returns[t]);
        if post_return <= 0.0 {
            break;
        }
        let prior = run.annual_withdrawals[t - 1];
        if prior / post_return > upper {
            assert!(
                run.annual_withdrawals[t] < prior,
                "year {}: rate {:.4} above upper guardrail without a cut",
                t + 1,
                prior / post_return
            );
            cuts += 1;
        }
    }
    assert!(cuts > 0, "a sustained crash must breach the upper guardrail");
}

#[test]
fn test_guardrails_outlast_fixed_percentage_in_a_crash() {
    let fixed = run_simulation(
        &stocks_only(1_000_000.0),
        &crash_params(WithdrawalStrategy::FixedPercentage, 0.05),
        &HistoricalDataset::new(),
    )
    .unwrap();
    let guarded = run_simulation(
        &stocks_only(1_000_000.0),
        &crash_params(WithdrawalStrategy::default_guardrails(), 0.05),
        &HistoricalDataset::new(),
    )
    .unwrap();

    let fixed_run = &fixed.runs().unwrap()[0];
    let guarded_run = &guarded.runs().unwrap()[0];
    let fixed_ruin = fixed_run.ruin_year.unwrap();
    assert!(
        guarded_run.ruin_year.is_none_or(|year| year > fixed_ruin),
        "guardrails depleted in {:?}, fixed percentage in {fixed_ruin}",
        guarded_run.ruin_year
    );
}

#[test]
fn test_dynamic_percentage_never_depletes_without_a_floor() {
    let result = run_simulation(
        &stocks_only(1_000_000.0),
        &crash_params(WithdrawalStrategy::default_dynamic(), 0.05),
        &HistoricalDataset::new(),
    )
    .unwrap();
    let run = &result.runs().unwrap()[0];
    assert!(run.success);
    for t in 0..run.annual_withdrawals.len() {
        let post_return = run.yearly_balances[t] * 0.9;
        assert!((run.annual_withdrawals[t] - 0.05 * post_return).abs() < 1e-6);
    }
}

#[test]
fn test_fixed_dollar_is_constant_until_depleted() {
    let mut params = baseline_params(1, 0);
    params.time_horizon_years = 12;
    params.inflation_rate = 0.0;
    params.withdrawal_config.strategy = WithdrawalStrategy::FixedDollar {
        annual_amount: Some(100_000.0),
    };

    let result = run_simulation(&stocks_only(1_000_000.0), &params, &flat_dataset(0.0)).unwrap();
    let run = &result.runs().unwrap()[0];
    assert_eq!(&run.annual_withdrawals[..10], &[100_000.0; 10]);
    assert_eq!(run.ruin_year, Some(10));
    assert_eq!(&run.annual_withdrawals[10..], &[0.0, 0.0]);
    assert!(!run.success);
}

#[test]
fn test_tax_grosses_up_the_draw() {
    let mut params = baseline_params(1, 0);
    params.time_horizon_years = 3;
    params.inflation_rate = 0.0;
    params.tax_rate = Some(0.2);

    let result = run_simulation(&stocks_only(1_000_000.0), &params, &flat_dataset(0.0)).unwrap();
    let run = &result.runs().unwrap()[0];
    for w in &run.annual_withdrawals {
        assert!((w - 50_000.0).abs() < 1e-6);
    }
}
