//! Withdrawal policy configuration
//!
//! The policy itself is evaluated by [`crate::withdrawal::calculate_withdrawal`];
//! this module only holds the serializable configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Default upper guardrail, as a multiple of the initial withdrawal rate
pub const DEFAULT_UPPER_GUARDRAIL_FACTOR: f64 = 1.2;
/// Default lower guardrail, as a multiple of the initial withdrawal rate
pub const DEFAULT_LOWER_GUARDRAIL_FACTOR: f64 = 0.8;
pub const DEFAULT_GUARDRAIL_ADJUSTMENT: f64 = 0.10;

/// How the annual withdrawal is determined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WithdrawalStrategy {
    /// `initial_balance * rate`, inflated each year if configured
    FixedPercentage,
    /// `current_balance * rate`, optionally clamped to a band around
    /// `initial_balance`
    DynamicPercentage {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        floor_percentage: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ceiling_percentage: Option<f64>,
    },
    /// Guyton-Klinger style guardrails
    Guardrails {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        upper_guardrail: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lower_guardrail: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        adjustment_magnitude: Option<f64>,
    },
    /// A constant dollar amount per year
    FixedDollar {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        annual_amount: Option<f64>,
    },
}

impl WithdrawalStrategy {
    /// Guardrails with every bound left at its default
    #[must_use]
    pub fn default_guardrails() -> Self {
        WithdrawalStrategy::Guardrails {
            upper_guardrail: None,
            lower_guardrail: None,
            adjustment_magnitude: None,
        }
    }

    /// Unbounded dynamic percentage
    #[must_use]
    pub fn default_dynamic() -> Self {
        WithdrawalStrategy::DynamicPercentage {
            floor_percentage: None,
            ceiling_percentage: None,
        }
    }

    #[must_use]
    pub fn kind(&self) -> StrategyKind {
        match self {
            WithdrawalStrategy::FixedPercentage => StrategyKind::FixedPercentage,
            WithdrawalStrategy::DynamicPercentage { .. } => StrategyKind::DynamicPercentage,
            WithdrawalStrategy::Guardrails { .. } => StrategyKind::Guardrails,
            WithdrawalStrategy::FixedDollar { .. } => StrategyKind::FixedDollar,
        }
    }
}

impl Default for WithdrawalStrategy {
    fn default() -> Self {
        WithdrawalStrategy::FixedPercentage
    }
}

/// Fieldless discriminant of [`WithdrawalStrategy`], used to label comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StrategyKind {
    FixedPercentage,
    DynamicPercentage,
    Guardrails,
    FixedDollar,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 4] = [
        StrategyKind::FixedPercentage,
        StrategyKind::DynamicPercentage,
        StrategyKind::Guardrails,
        StrategyKind::FixedDollar,
    ];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            StrategyKind::FixedPercentage => "Fixed percentage",
            StrategyKind::DynamicPercentage => "Dynamic percentage",
            StrategyKind::Guardrails => "Guardrails",
            StrategyKind::FixedDollar => "Fixed dollar",
        }
    }
}

/// Resolved guardrail bands, absolute withdrawal rates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuardrailBands {
    pub upper: f64,
    pub lower: f64,
    pub magnitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawalConfiguration {
    #[serde(default)]
    pub strategy: WithdrawalStrategy,
    /// Initial withdrawal rate, e.g. 0.04
    pub withdrawal_rate: f64,
    #[serde(default = "default_true")]
    pub adjust_for_inflation: bool,
    /// Legacy flat income offset, already in real dollars. Ignored when an
    /// income schedule is configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_income_real: Option<f64>,
    /// Legacy flat income offset in nominal dollars (deflated each year).
    /// Ignored when an income schedule is configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_income_nominal: Option<f64>,
}

fn default_true() -> bool {
    true
}

impl Default for WithdrawalConfiguration {
    fn default() -> Self {
        Self {
            strategy: WithdrawalStrategy::FixedPercentage,
            withdrawal_rate: 0.04,
            adjust_for_inflation: true,
            fixed_income_real: None,
            fixed_income_nominal: None,
        }
    }
}

impl WithdrawalConfiguration {
    #[must_use]
    pub fn new(strategy: WithdrawalStrategy, withdrawal_rate: f64) -> Self {
        Self {
            strategy,
            withdrawal_rate,
            ..Self::default()
        }
    }

    /// Whether the legacy flat income fields carry any value
    #[must_use]
    pub fn has_legacy_income(&self) -> bool {
        self.fixed_income_real.is_some() || self.fixed_income_nominal.is_some()
    }

    /// Guardrail bands with defaults applied. `None` for other strategies.
    #[must_use]
    pub fn guardrail_bands(&self) -> Option<GuardrailBands> {
        match self.strategy {
            WithdrawalStrategy::Guardrails {
                upper_guardrail,
                lower_guardrail,
                adjustment_magnitude,
            } => Some(GuardrailBands {
                upper: upper_guardrail
                    .unwrap_or(self.withdrawal_rate * DEFAULT_UPPER_GUARDRAIL_FACTOR),
                lower: lower_guardrail
                    .unwrap_or(self.withdrawal_rate * DEFAULT_LOWER_GUARDRAIL_FACTOR),
                magnitude: adjustment_magnitude.unwrap_or(DEFAULT_GUARDRAIL_ADJUSTMENT),
            }),
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let rate = self.withdrawal_rate;
        if !rate.is_finite() || rate < 0.0 {
            return Err(ConfigurationError::InvalidWithdrawalRate(rate));
        }

        match self.strategy {
            WithdrawalStrategy::FixedPercentage => {}
            WithdrawalStrategy::DynamicPercentage {
                floor_percentage,
                ceiling_percentage,
            } => {
                for bound in [floor_percentage, ceiling_percentage].into_iter().flatten() {
                    if !bound.is_finite() || bound < 0.0 {
                        return Err(ConfigurationError::InvalidDynamicBounds {
                            floor: floor_percentage.unwrap_or(0.0),
                            ceiling: ceiling_percentage.unwrap_or(f64::INFINITY),
                        });
                    }
                }
                if let (Some(floor), Some(ceiling)) = (floor_percentage, ceiling_percentage)
                    && floor > ceiling
                {
                    return Err(ConfigurationError::InvalidDynamicBounds { floor, ceiling });
                }
            }
            WithdrawalStrategy::Guardrails { .. } => {
                if let Some(bands) = self.guardrail_bands() {
                    if !(bands.lower.is_finite()
                        && bands.upper.is_finite()
                        && bands.lower >= 0.0
                        && bands.lower < bands.upper)
                    {
                        return Err(ConfigurationError::InvalidGuardrails {
                            upper: bands.upper,
                            lower: bands.lower,
                        });
                    }
                    if !(bands.magnitude > 0.0 && bands.magnitude < 1.0) {
                        return Err(ConfigurationError::InvalidGuardrailAdjustment(
                            bands.magnitude,
                        ));
                    }
                }
            }
            WithdrawalStrategy::FixedDollar { annual_amount } => match annual_amount {
                None => return Err(ConfigurationError::MissingFixedDollarAmount),
                Some(amount) if !(amount.is_finite() && amount > 0.0) => {
                    return Err(ConfigurationError::InvalidFixedDollarAmount(amount));
                }
                Some(_) => {}
            },
        }

        for income in [self.fixed_income_real, self.fixed_income_nominal]
            .into_iter()
            .flatten()
        {
            if !income.is_finite() || income < 0.0 {
                return Err(ConfigurationError::InvalidIncomeStream {
                    name: "fixed income".to_string(),
                    reason: "legacy fixed income must be finite and non-negative",
                });
            }
        }

        Ok(())
    }
}
