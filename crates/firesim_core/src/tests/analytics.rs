//! Analytics over engine output

use crate::analysis::{
    CohortKind, RateSearch, analyze_sequence_risk, find_sustainable_withdrawal_rate,
    sweep_withdrawal_rates,
};
use crate::error::AnalysisError;
use crate::model::{AssetClass, HistoricalDataset, HistoricalReturns, SimulationRun};
use crate::simulation::run_simulation;

use super::{baseline_params, sixty_forty, stocks_only};

#[test]
fn test_poor_early_returns_fail_more_often() {
    let mut params = baseline_params(2_000, 1066);
    params.withdrawal_config.withdrawal_rate = 0.045;
    let result =
        run_simulation(&sixty_forty(), &params, &HistoricalDataset::us_default()).unwrap();

    let cohorts = analyze_sequence_risk(&result).unwrap();
    assert_eq!(cohorts.early_years, 5);
    assert_eq!(cohorts.poor.kind, CohortKind::Poor);
    assert_eq!(
        cohorts.poor.size + cohorts.average.size + cohorts.good.size,
        2_000
    );
    assert!(cohorts.poor.median_early_return <= cohorts.average.median_early_return);
    assert!(cohorts.average.median_early_return <= cohorts.good.median_early_return);
    assert!(cohorts.poor.success_rate <= cohorts.average.success_rate);
    assert!(cohorts.average.success_rate <= cohorts.good.success_rate);
    assert!(cohorts.success_spread() > 0.0);

    let final_year = params.time_horizon_years as usize;
    assert!(cohorts.poor.median_balances[final_year] < cohorts.good.median_balances[final_year]);
}

#[test]
fn test_early_ruin_lands_in_the_poor_cohort() {
    // Every path depletes within four years; the mix of -30% and -5% years
    // decides how soon
    let dataset = HistoricalDataset::new().with_series(
        AssetClass::UsStocks,
        HistoricalReturns::new("bear", 2000, vec![-0.30, -0.05]),
    );
    let mut params = baseline_params(300, 31);
    params.time_horizon_years = 10;
    params.inflation_rate = 0.0;
    params.withdrawal_config.withdrawal_rate = 0.30;
    let result = run_simulation(&stocks_only(1.0e6), &params, &dataset).unwrap();
    let runs = result.runs().unwrap();
    assert!(runs.iter().all(|run| run.ruin_year.is_some_and(|y| y <= 4)));
    assert!(runs.iter().all(|run| run.annual_returns.iter().all(|r| *r < 0.0)));

    let cohorts = analyze_sequence_risk(&result).unwrap();
    assert!((cohorts.poor.median_early_return + 0.30).abs() < 1e-12);
    assert!((cohorts.good.median_early_return + 0.05).abs() < 1e-12);
    assert!(cohorts.poor.success_rate <= cohorts.good.success_rate);

    let members = |numbers: &[usize]| -> Vec<&SimulationRun> {
        numbers.iter().map(|n| &runs[*n]).collect()
    };
    let mean_ruin = |members: &[&SimulationRun]| {
        members.iter().filter_map(|run| run.ruin_year).sum::<u32>() as f64 / members.len() as f64
    };
    let poor = members(&cohorts.poor.run_numbers);
    let good = members(&cohorts.good.run_numbers);
    assert!(
        mean_ruin(&poor) < mean_ruin(&good),
        "poor cohort ruins at {:.2} on average, good at {:.2}",
        mean_ruin(&poor),
        mean_ruin(&good)
    );

    let ruined_in_year_two =
        |members: &[&SimulationRun]| members.iter().filter(|run| run.ruin_year == Some(2)).count();
    assert!(ruined_in_year_two(&poor) > ruined_in_year_two(&good));
}

#[test]
fn test_cohorts_need_run_data() {
    let result = run_simulation(
        &sixty_forty(),
        &baseline_params(50, 2),
        &HistoricalDataset::us_default(),
    )
    .unwrap()
    .strip_runs();
    assert_eq!(
        analyze_sequence_risk(&result).unwrap_err(),
        AnalysisError::MissingRunData
    );
}

#[test]
fn test_sweep_over_history_is_monotone() {
    let points = sweep_withdrawal_rates(
        &sixty_forty(),
        &baseline_params(800, 12),
        &HistoricalDataset::us_default(),
        &[0.02, 0.035, 0.05, 0.065, 0.08],
    )
    .unwrap();

    assert_eq!(points.len(), 5);
    assert!(points[0].success_rate >= 0.99);
    for pair in points.windows(2) {
        assert!(pair[0].success_rate >= pair[1].success_rate);
        assert!(pair[0].median_final_balance >= pair[1].median_final_balance);
    }
}

#[test]
fn test_sustainable_rate_meets_target() {
    let dataset = HistoricalDataset::us_default();
    let params = baseline_params(800, 21);
    let search = RateSearch {
        target_success: 0.90,
        tolerance: 5e-4,
        ..Default::default()
    };

    let found = find_sustainable_withdrawal_rate(&sixty_forty(), &params, &dataset, &search)
        .unwrap();
    assert!(found.feasible);
    assert!(found.success_rate >= 0.90);
    assert!((0.03..0.07).contains(&found.withdrawal_rate));

    // Re-running at the reported rate reproduces its success
    let check = sweep_withdrawal_rates(&sixty_forty(), &params, &dataset, &[found.withdrawal_rate])
        .unwrap();
    assert_eq!(check[0].success_rate, found.success_rate);
}
