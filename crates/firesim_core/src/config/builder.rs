//! Parameters Builder
//!
//! Fluent construction of [`SimulationParameters`], validated on `build()`.
//!
//! # Example
//!
//! ```ignore
//! use firesim_core::model::{AssetClass, ScheduledIncome, SimulationParameters, WithdrawalStrategy};
//!
//! let params = SimulationParameters::builder()
//!     .runs(10_000)
//!     .years(30)
//!     .initial_value(1_000_000.0)
//!     .allocation(AssetClass::UsStocks, 0.6)
//!     .allocation(AssetClass::Bonds, 0.4)
//!     .withdrawal(WithdrawalStrategy::default_guardrails(), 0.045)
//!     .retirement_age(60)
//!     .income(ScheduledIncome::new("Social Security", 30_000.0, 67).inflation_adjusted(true))
//!     .seed(42)
//!     .build()?;
//! ```

use crate::error::ConfigurationError;
use crate::model::{
    AssetClass, InflationStrategy, ScheduledIncome, SimulationParameters,
    WithdrawalConfiguration, WithdrawalStrategy,
};

/// Builder for [`SimulationParameters`]
#[derive(Debug, Clone, Default)]
pub struct ParametersBuilder {
    params: SimulationParameters,
}

impl SimulationParameters {
    #[must_use]
    pub fn builder() -> ParametersBuilder {
        ParametersBuilder::new()
    }
}

impl ParametersBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from existing parameters
    #[must_use]
    pub fn from_parameters(params: SimulationParameters) -> Self {
        Self { params }
    }

    // =========================================================================
    // Run shape
    // =========================================================================

    #[must_use]
    pub fn runs(mut self, runs: usize) -> Self {
        self.params.number_of_runs = runs;
        self
    }

    /// Set the time horizon in years
    #[must_use]
    pub fn years(mut self, years: u32) -> Self {
        self.params.time_horizon_years = years;
        self
    }

    #[must_use]
    pub fn initial_value(mut self, value: f64) -> Self {
        self.params.initial_portfolio_value = value;
        self
    }

    #[must_use]
    pub fn retirement_age(mut self, age: u32) -> Self {
        self.params.retirement_age = Some(age);
        self
    }

    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.params.rng_seed = Some(seed);
        self
    }

    // =========================================================================
    // Market model
    // =========================================================================

    /// Toggle historical bootstrap (parametric sampling when off)
    #[must_use]
    pub fn historical_bootstrap(mut self, enabled: bool) -> Self {
        self.params.use_historical_bootstrap = enabled;
        self
    }

    #[must_use]
    pub fn block_length(mut self, years: usize) -> Self {
        self.params.bootstrap_block_length = Some(years);
        self
    }

    /// Add a custom allocation weight, replacing the portfolio's own weights
    #[must_use]
    pub fn allocation(mut self, class: AssetClass, weight: f64) -> Self {
        self.params
            .custom_allocation_weights
            .get_or_insert_with(Default::default)
            .insert(class, weight);
        self
    }

    #[must_use]
    pub fn custom_return(mut self, class: AssetClass, mean: f64) -> Self {
        self.params
            .custom_returns
            .get_or_insert_with(Default::default)
            .insert(class, mean);
        self
    }

    #[must_use]
    pub fn custom_volatility(mut self, class: AssetClass, volatility: f64) -> Self {
        self.params
            .custom_volatility
            .get_or_insert_with(Default::default)
            .insert(class, volatility);
        self
    }

    /// Set a fixed inflation rate
    #[must_use]
    pub fn inflation(mut self, rate: f64) -> Self {
        self.params.inflation_rate = rate;
        self
    }

    #[must_use]
    pub fn inflation_strategy(mut self, strategy: InflationStrategy) -> Self {
        self.params.inflation_strategy = strategy;
        self
    }

    // =========================================================================
    // Withdrawals & income
    // =========================================================================

    #[must_use]
    pub fn withdrawal(mut self, strategy: WithdrawalStrategy, rate: f64) -> Self {
        self.params.withdrawal_config.strategy = strategy;
        self.params.withdrawal_config.withdrawal_rate = rate;
        self
    }

    #[must_use]
    pub fn withdrawal_config(mut self, config: WithdrawalConfiguration) -> Self {
        self.params.withdrawal_config = config;
        self
    }

    #[must_use]
    pub fn adjust_for_inflation(mut self, adjust: bool) -> Self {
        self.params.withdrawal_config.adjust_for_inflation = adjust;
        self
    }

    /// Add a scheduled income stream
    #[must_use]
    pub fn income(mut self, stream: ScheduledIncome) -> Self {
        self.params
            .income_schedule
            .get_or_insert_with(Default::default)
            .streams
            .push(stream);
        self
    }

    /// Legacy flat income offset in real dollars
    #[must_use]
    pub fn fixed_income_real(mut self, amount: f64) -> Self {
        self.params.withdrawal_config.fixed_income_real = Some(amount);
        self
    }

    /// Legacy flat income offset in nominal dollars
    #[must_use]
    pub fn fixed_income_nominal(mut self, amount: f64) -> Self {
        self.params.withdrawal_config.fixed_income_nominal = Some(amount);
        self
    }

    #[must_use]
    pub fn tax_rate(mut self, rate: f64) -> Self {
        self.params.tax_rate = Some(rate);
        self
    }

    /// Validate and return the parameters
    pub fn build(self) -> Result<SimulationParameters, ConfigurationError> {
        self.params.validate()?;
        Ok(self.params)
    }
}
