//! Simulation parameters, fixed for the duration of one engine invocation

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::model::{AssetClass, IncomeSchedule, Portfolio, WithdrawalConfiguration};

/// Tolerance on the sum of custom allocation weights
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-3;

/// How each year's inflation rate is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InflationStrategy {
    /// Always the baseline `inflation_rate`
    #[default]
    Fixed,
    /// Historical CPI for the calendar year the stock return was drawn from
    HistoricallyCorrelated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationParameters {
    pub number_of_runs: usize,
    pub time_horizon_years: u32,
    /// Baseline annual inflation
    pub inflation_rate: f64,
    pub use_historical_bootstrap: bool,
    pub initial_portfolio_value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retirement_age: Option<u32>,
    /// Overrides the weights derived from the portfolio snapshot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_allocation_weights: Option<BTreeMap<AssetClass, f64>>,
    #[serde(default)]
    pub withdrawal_config: WithdrawalConfiguration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub income_schedule: Option<IncomeSchedule>,
    /// Flat rate applied to portfolio withdrawals
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rng_seed: Option<u64>,
    /// Block bootstrap length in years; absent or 1 means i.i.d. sampling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bootstrap_block_length: Option<usize>,
    /// Per-class mean real return; forces parametric sampling for that class
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_returns: Option<BTreeMap<AssetClass, f64>>,
    /// Per-class volatility; forces parametric sampling for that class
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_volatility: Option<BTreeMap<AssetClass, f64>>,
    #[serde(default)]
    pub inflation_strategy: InflationStrategy,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            number_of_runs: 10_000,
            time_horizon_years: 30,
            inflation_rate: 0.025,
            use_historical_bootstrap: true,
            initial_portfolio_value: 1_000_000.0,
            retirement_age: None,
            custom_allocation_weights: None,
            withdrawal_config: WithdrawalConfiguration::default(),
            income_schedule: None,
            tax_rate: None,
            rng_seed: None,
            bootstrap_block_length: None,
            custom_returns: None,
            custom_volatility: None,
            inflation_strategy: InflationStrategy::Fixed,
        }
    }
}

impl SimulationParameters {
    /// Scheduled income that actually takes part in the simulation
    #[must_use]
    pub fn active_income_schedule(&self) -> Option<&IncomeSchedule> {
        self.income_schedule.as_ref().filter(|s| !s.is_empty())
    }

    /// Block length to use, `None` for i.i.d. sampling
    #[must_use]
    pub fn block_length(&self) -> Option<usize> {
        self.bootstrap_block_length.filter(|len| *len > 1)
    }

    /// Class weights to simulate with: the custom override when present,
    /// otherwise the portfolio's value weights.
    #[must_use]
    pub fn allocation_weights(&self, portfolio: &Portfolio) -> BTreeMap<AssetClass, f64> {
        match &self.custom_allocation_weights {
            Some(weights) => weights.clone(),
            None => portfolio.class_weights(),
        }
    }

    /// Whether `class` has a custom return or volatility override
    #[must_use]
    pub fn has_parametric_override(&self, class: AssetClass) -> bool {
        self.custom_returns
            .as_ref()
            .is_some_and(|m| m.contains_key(&class))
            || self
                .custom_volatility
                .as_ref()
                .is_some_and(|m| m.contains_key(&class))
    }

    /// Check everything that does not depend on the portfolio or dataset.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.number_of_runs == 0 {
            return Err(ConfigurationError::NonPositiveRuns);
        }
        if self.time_horizon_years == 0 {
            return Err(ConfigurationError::NonPositiveHorizon);
        }
        if !(self.initial_portfolio_value.is_finite() && self.initial_portfolio_value > 0.0) {
            return Err(ConfigurationError::NonPositiveInitialValue(
                self.initial_portfolio_value,
            ));
        }
        if !self.inflation_rate.is_finite() || self.inflation_rate <= -1.0 {
            return Err(ConfigurationError::InvalidInflationRate(self.inflation_rate));
        }

        if let Some(weights) = &self.custom_allocation_weights {
            if let Some((class, weight)) = weights.iter().find(|(_, w)| !(**w >= 0.0)) {
                return Err(ConfigurationError::NegativeAllocationWeight {
                    class: *class,
                    weight: *weight,
                });
            }
            let sum: f64 = weights.values().sum();
            if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
                return Err(ConfigurationError::AllocationWeightsSum(sum));
            }
        }

        self.withdrawal_config.validate()?;

        if let Some(schedule) = &self.income_schedule {
            schedule.validate()?;
        }

        if let Some(tax) = self.tax_rate
            && !(0.0..1.0).contains(&tax)
        {
            return Err(ConfigurationError::InvalidTaxRate(tax));
        }

        if self.bootstrap_block_length == Some(0) {
            return Err(ConfigurationError::InvalidBlockLength);
        }

        if let Some(returns) = &self.custom_returns
            && let Some((class, value)) = returns.iter().find(|(_, r)| !r.is_finite() || **r <= -1.0)
        {
            return Err(ConfigurationError::InvalidCustomReturn {
                class: *class,
                value: *value,
            });
        }

        if let Some(volatility) = &self.custom_volatility
            && let Some((class, value)) = volatility
                .iter()
                .find(|(_, v)| !v.is_finite() || **v < 0.0)
        {
            return Err(ConfigurationError::InvalidVolatility {
                class: *class,
                volatility: *value,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ScheduledIncome, WithdrawalStrategy};

    #[test]
    fn test_defaults_are_valid() {
        assert!(SimulationParameters::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_degenerate_sizes() {
        let params = SimulationParameters {
            number_of_runs: 0,
            ..Default::default()
        };
        assert_eq!(params.validate(), Err(ConfigurationError::NonPositiveRuns));

        let params = SimulationParameters {
            time_horizon_years: 0,
            ..Default::default()
        };
        assert_eq!(params.validate(), Err(ConfigurationError::NonPositiveHorizon));

        let params = SimulationParameters {
            initial_portfolio_value: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(ConfigurationError::NonPositiveInitialValue(_))
        ));
    }

    #[test]
    fn test_custom_weights_tolerance() {
        let mut weights = BTreeMap::new();
        weights.insert(AssetClass::UsStocks, 0.6);
        weights.insert(AssetClass::Bonds, 0.4005);
        let params = SimulationParameters {
            custom_allocation_weights: Some(weights.clone()),
            ..Default::default()
        };
        assert!(params.validate().is_ok());

        weights.insert(AssetClass::Bonds, 0.5);
        let params = SimulationParameters {
            custom_allocation_weights: Some(weights.clone()),
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(ConfigurationError::AllocationWeightsSum(_))
        ));

        weights.insert(AssetClass::UsStocks, 1.2);
        weights.insert(AssetClass::Bonds, -0.2);
        let params = SimulationParameters {
            custom_allocation_weights: Some(weights),
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(ConfigurationError::NegativeAllocationWeight {
                class: AssetClass::Bonds,
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_bad_optional_fields() {
        let params = SimulationParameters {
            tax_rate: Some(1.0),
            ..Default::default()
        };
        assert_eq!(params.validate(), Err(ConfigurationError::InvalidTaxRate(1.0)));

        let params = SimulationParameters {
            bootstrap_block_length: Some(0),
            ..Default::default()
        };
        assert_eq!(params.validate(), Err(ConfigurationError::InvalidBlockLength));

        let params = SimulationParameters {
            custom_volatility: Some(BTreeMap::from([(AssetClass::Bonds, -0.1)])),
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(ConfigurationError::InvalidVolatility { .. })
        ));

        let params = SimulationParameters {
            withdrawal_config: WithdrawalConfiguration::new(
                WithdrawalStrategy::FixedDollar {
                    annual_amount: None,
                },
                0.04,
            ),
            ..Default::default()
        };
        assert_eq!(
            params.validate(),
            Err(ConfigurationError::MissingFixedDollarAmount)
        );

        let params = SimulationParameters {
            income_schedule: Some(IncomeSchedule::new().with_stream(ScheduledIncome::new(
                "bad", 0.0, 67,
            ))),
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(ConfigurationError::InvalidIncomeStream { .. })
        ));
    }

    #[test]
    fn test_block_length_one_is_iid() {
        let params = SimulationParameters {
            bootstrap_block_length: Some(1),
            ..Default::default()
        };
        assert!(params.validate().is_ok());
        assert_eq!(params.block_length(), None);

        let params = SimulationParameters {
            bootstrap_block_length: Some(5),
            ..Default::default()
        };
        assert_eq!(params.block_length(), Some(5));
    }

    #[test]
    fn test_empty_schedule_is_inactive() {
        let params = SimulationParameters {
            income_schedule: Some(IncomeSchedule::new()),
            ..Default::default()
        };
        assert!(params.active_income_schedule().is_none());
    }
}
