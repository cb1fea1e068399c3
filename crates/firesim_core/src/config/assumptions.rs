//! Personal planning assumptions
//!
//! Ages, savings and spending are passed explicitly rather than read from
//! global settings. They drive a deterministic accumulation projection and
//! seed the Monte Carlo configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::model::{SimulationParameters, WithdrawalStrategy};

use super::ParametersBuilder;

/// Longest accumulation period considered by
/// [`RetirementAssumptions::years_to_financial_independence`]
pub const MAX_ACCUMULATION_YEARS: u32 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetirementAssumptions {
    pub current_age: u32,
    pub retirement_age: u32,
    pub life_expectancy: u32,
    pub current_savings: f64,
    /// Saved at the end of each year until retirement
    #[serde(default)]
    pub annual_contribution: f64,
    /// Real spending target in retirement
    pub annual_spending: f64,
    /// Real return assumed for the deterministic projection
    #[serde(default = "default_real_return")]
    pub expected_real_return: f64,
}

fn default_real_return() -> f64 {
    0.05
}

impl RetirementAssumptions {
    /// Portfolio needed to fund `annual_spending` at `withdrawal_rate`.
    /// Infinite for a non-positive rate.
    #[must_use]
    pub fn fire_number(&self, withdrawal_rate: f64) -> f64 {
        if withdrawal_rate > 0.0 {
            self.annual_spending / withdrawal_rate
        } else {
            f64::INFINITY
        }
    }

    #[must_use]
    pub fn years_until_retirement(&self) -> u32 {
        self.retirement_age.saturating_sub(self.current_age)
    }

    /// Years spent in retirement
    #[must_use]
    pub fn horizon_years(&self) -> u32 {
        self.life_expectancy.saturating_sub(self.retirement_age)
    }

    /// Savings at the retirement date, growing at `expected_real_return`
    /// with end-of-year contributions.
    #[must_use]
    pub fn projected_savings_at_retirement(&self) -> f64 {
        (0..self.years_until_retirement()).fold(self.current_savings, |savings, _| {
            self.grow_one_year(savings)
        })
    }

    /// Years of saving until the portfolio reaches the FIRE number for
    /// `withdrawal_rate`. `Some(0)` when already there; `None` when not
    /// reached within [`MAX_ACCUMULATION_YEARS`].
    #[must_use]
    pub fn years_to_financial_independence(&self, withdrawal_rate: f64) -> Option<u32> {
        let target = self.fire_number(withdrawal_rate);
        let mut savings = self.current_savings;
        for year in 0..=MAX_ACCUMULATION_YEARS {
            if savings >= target {
                return Some(year);
            }
            savings = self.grow_one_year(savings);
        }
        None
    }

    /// Initial withdrawal rate implied by spending and projected savings.
    /// `None` when nothing is projected to be saved.
    #[must_use]
    pub fn withdrawal_rate(&self) -> Option<f64> {
        let savings = self.projected_savings_at_retirement();
        (savings > 0.0).then(|| self.annual_spending / savings)
    }

    /// Default parameters sized to these assumptions
    pub fn to_parameters(&self) -> Result<SimulationParameters, ConfigurationError> {
        self.apply_to(SimulationParameters::default())
    }

    /// Overwrite the initial value, horizon, retirement age and withdrawal
    /// rate of `base`. A fixed-dollar strategy withdraws `annual_spending`.
    pub fn apply_to(
        &self,
        base: SimulationParameters,
    ) -> Result<SimulationParameters, ConfigurationError> {
        let mut withdrawal_config = base.withdrawal_config.clone();
        withdrawal_config.withdrawal_rate = self.withdrawal_rate().unwrap_or(0.0);
        if let WithdrawalStrategy::FixedDollar { annual_amount } = &mut withdrawal_config.strategy
        {
            *annual_amount = Some(self.annual_spending);
        }

        ParametersBuilder::from_parameters(base)
            .initial_value(self.projected_savings_at_retirement())
            .years(self.horizon_years())
            .retirement_age(self.retirement_age)
            .withdrawal_config(withdrawal_config)
            .build()
    }

    fn grow_one_year(&self, savings: f64) -> f64 {
        savings * (1.0 + self.expected_real_return) + self.annual_contribution
    }
}
