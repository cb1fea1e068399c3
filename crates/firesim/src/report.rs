//! Text and JSON rendering of a finished simulation

use std::fmt::Write;

use clap::ValueEnum;
use firesim_core::analysis::{CohortStatistics, SequenceRiskAnalysis, StrategyComparison};
use firesim_core::model::SimulationResult;
use serde::Serialize;

use crate::worker::SimulationReport;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Whole dollars with thousands separators, e.g. `$1,234,567`.
/// Engine amounts are real, so these are today's dollars.
pub fn format_dollars(value: f64) -> String {
    let digits = (value.abs().round() as u64).to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    let sign = if value < 0.0 && digits != "0" { "-" } else { "" };
    format!("{sign}${grouped}")
}

/// A probability or withdrawal rate, e.g. `4.25%`
pub fn format_rate(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

/// An annual return with its sign, e.g. `+6.1%`
pub fn format_return(value: f64) -> String {
    format!("{:+.1}%", value * 100.0)
}

#[derive(Serialize)]
struct JsonReport<'a> {
    scenario: &'a str,
    #[serde(flatten)]
    report: &'a SimulationReport,
}

pub fn render(
    format: OutputFormat,
    scenario: &str,
    report: &SimulationReport,
) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Text => Ok(render_text(scenario, report)),
        OutputFormat::Json => serde_json::to_string_pretty(&JsonReport { scenario, report }),
    }
}

pub fn render_text(scenario: &str, report: &SimulationReport) -> String {
    let mut out = String::new();
    write_summary(&mut out, scenario, &report.result);
    if let Some(cohorts) = &report.cohorts {
        write_cohorts(&mut out, cohorts);
    }
    if let Some(comparison) = &report.comparison {
        write_comparison(&mut out, comparison);
    }
    out
}

fn write_summary(out: &mut String, scenario: &str, result: &SimulationResult) {
    let params = &result.parameters;
    let _ = writeln!(out, "{scenario}");
    let _ = writeln!(
        out,
        "  {} runs over {} years, {} initial, {} withdrawal rate",
        result.number_of_runs(),
        params.time_horizon_years,
        format_dollars(params.initial_portfolio_value),
        format_rate(params.withdrawal_config.withdrawal_rate),
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "  Success rate:          {}", format_rate(result.success_rate));
    let _ = writeln!(
        out,
        "  Probability of ruin:   {}",
        format_rate(result.probability_of_ruin)
    );
    let _ = writeln!(
        out,
        "  Median final balance:  {}",
        format_dollars(result.median_final_balance)
    );
    let _ = writeln!(
        out,
        "  Avg annual withdrawal: {}",
        format_dollars(result.average_annual_withdrawal)
    );

    let _ = writeln!(out);
    let _ = writeln!(out, "  Balances in today's dollars");
    let _ = writeln!(
        out,
        "  {:>4}  {:>14}  {:>14}  {:>14}",
        "Year", "P5", "Median", "P95"
    );
    // Every fifth year plus the last
    let last = result.yearly_balances.len().saturating_sub(1);
    for summary in result
        .yearly_balances
        .iter()
        .enumerate()
        .filter(|(i, _)| i % 5 == 0 || *i == last)
        .map(|(_, s)| s)
    {
        let _ = writeln!(
            out,
            "  {:>4}  {:>14}  {:>14}  {:>14}",
            summary.year,
            format_dollars(summary.p5),
            format_dollars(summary.median),
            format_dollars(summary.p95),
        );
    }
}

fn write_cohorts(out: &mut String, cohorts: &SequenceRiskAnalysis) {
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Sequence of returns (median of first {} years)",
        cohorts.early_years
    );
    for cohort in [&cohorts.poor, &cohorts.average, &cohorts.good] {
        write_cohort(out, cohort);
    }
    let _ = writeln!(
        out,
        "  Success spread (good - poor): {}",
        format_rate(cohorts.success_spread())
    );
}

fn write_cohort(out: &mut String, cohort: &CohortStatistics) {
    let final_median = cohort.median_balances.last().copied().unwrap_or(0.0);
    let _ = writeln!(
        out,
        "  {:<8} {:>5} runs  early return {:>7}  success {:>7}  median final {}",
        format!("{:?}", cohort.kind),
        cohort.size,
        format_return(cohort.median_early_return),
        format_rate(cohort.success_rate),
        format_dollars(final_median),
    );
}

fn write_comparison(out: &mut String, comparison: &StrategyComparison) {
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Strategy comparison ({} runs each, best first)",
        comparison.runs_per_strategy
    );
    for kind in &comparison.ranking {
        let Some(outcome) = comparison.outcome(*kind) else {
            continue;
        };
        let _ = writeln!(
            out,
            "  {:<20} success {:>7}  median final {:>14}  avg withdrawal {}",
            kind.label(),
            format_rate(outcome.success_rate),
            format_dollars(outcome.median_final_balance),
            format_dollars(outcome.average_annual_withdrawal),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use firesim_core::analysis::{ComparisonOptions, analyze_sequence_risk, compare_strategies};
    use firesim_core::model::{
        Asset, AssetClass, HistoricalDataset, Portfolio, SimulationParameters,
    };
    use firesim_core::simulation::run_simulation;

    fn report() -> SimulationReport {
        let portfolio = Portfolio::new()
            .with_asset(Asset::new("Total Market", AssetClass::UsStocks, 1.0, 1_000_000.0));
        let params = SimulationParameters {
            number_of_runs: 90,
            rng_seed: Some(8),
            ..Default::default()
        };
        let dataset = HistoricalDataset::us_default();
        let result = run_simulation(&portfolio, &params, &dataset).unwrap();
        SimulationReport {
            cohorts: Some(analyze_sequence_risk(&result).unwrap()),
            comparison: Some(
                compare_strategies(&portfolio, &params, &dataset, ComparisonOptions::default())
                    .unwrap(),
            ),
            result: result.strip_runs(),
        }
    }

    #[test]
    fn test_number_formats() {
        assert_eq!(format_dollars(1_234_567.4), "$1,234,567");
        assert_eq!(format_dollars(123_456.0), "$123,456");
        assert_eq!(format_dollars(-950.0), "-$950");
        assert_eq!(format_dollars(-0.3), "$0");
        assert_eq!(format_rate(0.0425), "4.25%");
        assert_eq!(format_return(0.061), "+6.1%");
        assert_eq!(format_return(-0.12), "-12.0%");
    }

    #[test]
    fn test_text_report_sections() {
        let text = render(OutputFormat::Text, "Baseline", &report()).unwrap();
        assert!(text.starts_with("Baseline\n"));
        assert!(text.contains("90 runs over 30 years"));
        assert!(text.contains("Success rate:"));
        assert!(text.contains("today's dollars"));
        assert!(text.contains("Sequence of returns"));
        assert!(text.contains("Guardrails"));
        // Years 0, 5, ..., 30
        assert_eq!(text.lines().filter(|l| l.trim_start().starts_with("25 ")).count(), 1);
    }

    #[test]
    fn test_json_report_omits_runs() {
        let json = render(OutputFormat::Json, "Baseline", &report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["scenario"], "Baseline");
        assert!(value["result"]["success_rate"].is_number());
        assert!(value["result"].get("all_simulation_runs").is_none_or(|v| v.is_null()));
        assert_eq!(value["comparison"]["outcomes"].as_array().unwrap().len(), 4);
        assert_eq!(value["cohorts"]["early_years"], 5);
    }
}
