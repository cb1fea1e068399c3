//! Sequence-of-returns risk
//!
//! Runs are ranked by the median of their early-retirement returns and split
//! into thirds. Comparing the thirds shows how much the first few years decide
//! the outcome.

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::model::{SimulationResult, SimulationRun};
use crate::stats;

/// Minimum number of runs needed to form three cohorts
pub const MIN_COHORT_RUNS: usize = 3;
/// Number of leading years used to score a run
pub const EARLY_YEARS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CohortKind {
    Poor,
    Average,
    Good,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortStatistics {
    pub kind: CohortKind,
    pub size: usize,
    /// Median of the members' early-return scores
    pub median_early_return: f64,
    /// Median balance across members, per year (index 0 is the initial value)
    pub median_balances: Vec<f64>,
    pub success_rate: f64,
    pub run_numbers: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceRiskAnalysis {
    /// Leading years that were scored
    pub early_years: usize,
    pub poor: CohortStatistics,
    pub average: CohortStatistics,
    pub good: CohortStatistics,
}

impl SequenceRiskAnalysis {
    /// Success rate gap between the best and worst early sequences
    #[must_use]
    pub fn success_spread(&self) -> f64 {
        self.good.success_rate - self.poor.success_rate
    }
}

/// Split the runs of `result` into poor, average and good early-return
/// cohorts.
pub fn analyze_sequence_risk(
    result: &SimulationResult,
) -> Result<SequenceRiskAnalysis, AnalysisError> {
    let runs = result.runs().ok_or(AnalysisError::MissingRunData)?;
    let n = runs.len();
    if n < MIN_COHORT_RUNS {
        return Err(AnalysisError::InsufficientRuns {
            required: MIN_COHORT_RUNS,
            available: n,
        });
    }

    let early_years = EARLY_YEARS.min(result.parameters.time_horizon_years as usize);
    let mut scored: Vec<(f64, &SimulationRun)> = runs
        .iter()
        .map(|run| (early_score(run, early_years), run))
        .collect();
    scored.sort_by(|(a, run_a), (b, run_b)| {
        a.total_cmp(b).then(run_a.run_number.cmp(&run_b.run_number))
    });

    let third = n / 3;
    let horizon = result.parameters.time_horizon_years as usize;

    tracing::debug!(runs = n, early_years, "sequence-of-returns cohorts");

    Ok(SequenceRiskAnalysis {
        early_years,
        poor: cohort(CohortKind::Poor, &scored[..third], horizon),
        average: cohort(CohortKind::Average, &scored[third..2 * third], horizon),
        good: cohort(CohortKind::Good, &scored[2 * third..], horizon),
    })
}

fn early_score(run: &SimulationRun, early_years: usize) -> f64 {
    let end = early_years.min(run.annual_returns.len());
    stats::median(&run.annual_returns[..end])
}

fn cohort(kind: CohortKind, members: &[(f64, &SimulationRun)], horizon: usize) -> CohortStatistics {
    let scores: Vec<f64> = members.iter().map(|(score, _)| *score).collect();
    let median_balances = (0..=horizon)
        .map(|year| {
            let balances: Vec<f64> = members
                .iter()
                .map(|(_, run)| run.yearly_balances.get(year).copied().unwrap_or(0.0))
                .collect();
            stats::median(&balances)
        })
        .collect();
    let successes = members.iter().filter(|(_, run)| run.success).count();

    CohortStatistics {
        kind,
        size: members.len(),
        median_early_return: stats::median(&scores),
        median_balances,
        success_rate: if members.is_empty() {
            0.0
        } else {
            successes as f64 / members.len() as f64
        },
        run_numbers: members.iter().map(|(_, run)| run.run_number).collect(),
    }
}
