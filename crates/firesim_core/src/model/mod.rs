mod income;
mod market;
mod params;
mod portfolio;
mod results;
mod withdrawal;

pub use income::{IncomeSchedule, ScheduledIncome, age_in_year};
pub use market::{
    BuiltinHistory, HistoricalDataSource, HistoricalDataset, HistoricalInflation,
    HistoricalReturns, HistoricalStatistics, historical_data, load_with_fallback,
};
pub use params::{InflationStrategy, SimulationParameters, WEIGHT_SUM_TOLERANCE};
pub use portfolio::{Asset, AssetClass, Portfolio};
pub use results::{
    MonteCarloProgress, ResultSummary, SimulationResult, SimulationRun, YearlyBalanceSummary,
};
pub use withdrawal::{
    DEFAULT_GUARDRAIL_ADJUSTMENT, DEFAULT_LOWER_GUARDRAIL_FACTOR, DEFAULT_UPPER_GUARDRAIL_FACTOR,
    GuardrailBands, StrategyKind, WithdrawalConfiguration, WithdrawalStrategy,
};
