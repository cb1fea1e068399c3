//! Withdrawal strategy state machine
//!
//! The engine works in real (year-1) dollars. Strategies that carry a dollar
//! amount from year to year keep it as a baseline in year-1 dollars:
//! - with `adjust_for_inflation`, the nominal withdrawal tracks prices, so the
//!   real amount equals the baseline;
//! - without it, the nominal amount is frozen and its real value decays as
//!   `baseline / price_index`.
//!
//! Each year is one step of a fold over `(balance, carried)`:
//! [`calculate_withdrawal`] returns the portfolio draw together with the state
//! for the next year.

use crate::model::{IncomeSchedule, SimulationParameters, WithdrawalConfiguration, WithdrawalStrategy};

/// Which income mechanism offsets spending. Resolved once per engine
/// invocation; scheduled income takes precedence and the two never add up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IncomeSource {
    /// A non-empty income schedule is configured
    Scheduled,
    /// Legacy flat income from the withdrawal configuration
    Legacy { real: f64, nominal: f64 },
    None,
}

impl IncomeSource {
    #[must_use]
    pub fn resolve(params: &SimulationParameters) -> Self {
        if params.active_income_schedule().is_some() {
            return IncomeSource::Scheduled;
        }
        let config = &params.withdrawal_config;
        if config.has_legacy_income() {
            IncomeSource::Legacy {
                real: config.fixed_income_real.unwrap_or(0.0),
                nominal: config.fixed_income_nominal.unwrap_or(0.0),
            }
        } else {
            IncomeSource::None
        }
    }

    /// Real income for the year
    #[must_use]
    pub fn offset(&self, scheduled_income: f64, price_index: f64) -> f64 {
        match *self {
            IncomeSource::Scheduled => scheduled_income,
            IncomeSource::Legacy { real, nominal } => real + nominal / price_index,
            IncomeSource::None => 0.0,
        }
    }

    /// Scheduled income for the year, or 0 when the schedule is not the
    /// active source
    #[must_use]
    pub fn scheduled_income(
        &self,
        schedule: Option<&IncomeSchedule>,
        year: u32,
        retirement_age: Option<u32>,
        price_index: f64,
    ) -> f64 {
        match (self, schedule) {
            (IncomeSource::Scheduled, Some(schedule)) => {
                schedule.total_income(year, retirement_age, price_index)
            }
            _ => 0.0,
        }
    }
}

/// State carried between years of a run
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WithdrawalState {
    /// Baseline withdrawal in year-1 dollars; `None` before the first year
    pub carried: Option<f64>,
}

/// Per-year inputs to the withdrawal policy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WithdrawalInputs {
    /// Balance after this year's market return
    pub current_balance: f64,
    /// 1-based simulation year
    pub year: u32,
    pub initial_balance: f64,
    /// Cumulative inflation since year 1 (1.0 in year 1)
    pub price_index: f64,
    pub scheduled_income: f64,
    pub income_source: IncomeSource,
    pub tax_rate: Option<f64>,
}

/// Compute this year's portfolio draw (real dollars, before clamping to the
/// available balance) and the next state.
#[must_use]
pub fn calculate_withdrawal(
    config: &WithdrawalConfiguration,
    state: WithdrawalState,
    inputs: &WithdrawalInputs,
) -> (f64, WithdrawalState) {
    let rate = config.withdrawal_rate;
    let initial = inputs.initial_balance;
    let to_real = |baseline: f64| {
        if config.adjust_for_inflation {
            baseline
        } else {
            baseline / inputs.price_index
        }
    };

    let (amount, carried) = match config.strategy {
        WithdrawalStrategy::FixedPercentage => {
            let baseline = state.carried.unwrap_or(initial * rate);
            (to_real(baseline), baseline)
        }
        WithdrawalStrategy::DynamicPercentage {
            floor_percentage,
            ceiling_percentage,
        } => {
            let mut amount = inputs.current_balance.max(0.0) * rate;
            if let Some(ceiling) = ceiling_percentage {
                amount = amount.min(ceiling * initial);
            }
            if let Some(floor) = floor_percentage {
                amount = amount.max(floor * initial);
            }
            (amount, amount)
        }
        WithdrawalStrategy::Guardrails { .. } => {
            let baseline = match (state.carried, config.guardrail_bands()) {
                (Some(carried), Some(bands)) if inputs.year > 1 => {
                    let balance = inputs.current_balance;
                    let prior_real = to_real(carried);
                    if balance <= 0.0 || prior_real / balance > bands.upper {
                        carried * (1.0 - bands.magnitude)
                    } else if prior_real / balance < bands.lower {
                        carried * (1.0 + bands.magnitude)
                    } else {
                        carried
                    }
                }
                (Some(carried), _) => carried,
                (None, _) => initial * rate,
            };
            (to_real(baseline), baseline)
        }
        WithdrawalStrategy::FixedDollar { annual_amount } => {
            let baseline = state.carried.or(annual_amount).unwrap_or(0.0);
            (to_real(baseline), baseline)
        }
    };

    let offset = inputs
        .income_source
        .offset(inputs.scheduled_income, inputs.price_index);
    let spending = (amount - offset).max(0.0);
    let draw = match inputs.tax_rate {
        Some(tax) if tax > 0.0 => spending / (1.0 - tax),
        _ => spending,
    };

    (
        draw,
        WithdrawalState {
            carried: Some(carried),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ScheduledIncome, WithdrawalStrategy};

    fn inputs(year: u32, balance: f64, price_index: f64) -> WithdrawalInputs {
        WithdrawalInputs {
            current_balance: balance,
            year,
            initial_balance: 1_000_000.0,
            price_index,
            scheduled_income: 0.0,
            income_source: IncomeSource::None,
            tax_rate: None,
        }
    }

    fn configuration(strategy: WithdrawalStrategy, adjust: bool) -> WithdrawalConfiguration {
        WithdrawalConfiguration {
            adjust_for_inflation: adjust,
            ..WithdrawalConfiguration::new(strategy, 0.04)
        }
    }

    #[test]
    fn test_fixed_percentage_is_constant_in_real_terms() {
        let config = configuration(WithdrawalStrategy::FixedPercentage, true);
        let (first, state) = calculate_withdrawal(&config, WithdrawalState::default(), &inputs(1, 1.0e6, 1.0));
        assert_eq!(first, 40_000.0);

        // never re-based to the balance, whatever happens to the market
        let (second, _) = calculate_withdrawal(&config, state, &inputs(2, 500_000.0, 1.08));
        assert!((second - 40_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_unadjusted_amount_decays_with_prices() {
        let config = configuration(WithdrawalStrategy::FixedPercentage, false);
        let (_, state) = calculate_withdrawal(&config, WithdrawalState::default(), &inputs(1, 1.0e6, 1.0));
        let (second, _) = calculate_withdrawal(&config, state, &inputs(2, 1.0e6, 1.03));
        assert!((second - 40_000.0 / 1.03).abs() < 1e-9);
    }

    #[test]
    fn test_dynamic_percentage_clamps_to_band() {
        let config = configuration(
            WithdrawalStrategy::DynamicPercentage {
                floor_percentage: Some(0.03),
                ceiling_percentage: Some(0.05),
            },
            true,
        );
        let state = WithdrawalState::default();
        assert_eq!(calculate_withdrawal(&config, state, &inputs(3, 1.0e6, 1.0)).0, 40_000.0);
        assert_eq!(calculate_withdrawal(&config, state, &inputs(3, 500_000.0, 1.0)).0, 30_000.0);
        assert_eq!(calculate_withdrawal(&config, state, &inputs(3, 2.0e6, 1.0)).0, 50_000.0);

        let unbounded = configuration(WithdrawalStrategy::default_dynamic(), true);
        assert_eq!(calculate_withdrawal(&unbounded, state, &inputs(3, 2.0e6, 1.0)).0, 80_000.0);
    }

    #[test]
    fn test_guardrails_cut_after_crash_and_raise_after_boom() {
        let config = configuration(WithdrawalStrategy::default_guardrails(), true);
        let (first, state) =
            calculate_withdrawal(&config, WithdrawalState::default(), &inputs(1, 1.0e6, 1.0));
        assert_eq!(first, 40_000.0);

        // 40k / 600k = 6.7% > 4.8% upper guardrail
        let (cut, cut_state) = calculate_withdrawal(&config, state, &inputs(2, 600_000.0, 1.0));
        assert!((cut - 36_000.0).abs() < 1e-9);
        assert!(cut < first);

        // 40k / 1.5M = 2.7% < 3.2% lower guardrail
        let (raise, _) = calculate_withdrawal(&config, state, &inputs(2, 1.5e6, 1.0));
        assert!((raise - 44_000.0).abs() < 1e-9);

        // inside the band: unchanged
        let (same, _) = calculate_withdrawal(&config, cut_state, &inputs(3, 900_000.0, 1.0));
        assert!((same - 36_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_guardrails_zero_balance_counts_as_above_upper() {
        let config = configuration(WithdrawalStrategy::default_guardrails(), true);
        let state = WithdrawalState {
            carried: Some(40_000.0),
        };
        let (draw, _) = calculate_withdrawal(&config, state, &inputs(5, 0.0, 1.0));
        assert!((draw - 36_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_fixed_dollar_uses_configured_amount() {
        let config = configuration(
            WithdrawalStrategy::FixedDollar {
                annual_amount: Some(35_000.0),
            },
            true,
        );
        let (draw, state) =
            calculate_withdrawal(&config, WithdrawalState::default(), &inputs(1, 1.0e6, 1.0));
        assert_eq!(draw, 35_000.0);
        assert_eq!(state.carried, Some(35_000.0));
    }

    #[test]
    fn test_income_offset_and_tax() {
        let config = configuration(WithdrawalStrategy::FixedPercentage, true);
        let mut year = inputs(1, 1.0e6, 1.0);
        year.income_source = IncomeSource::Scheduled;
        year.scheduled_income = 30_000.0;
        let (draw, _) = calculate_withdrawal(&config, WithdrawalState::default(), &year);
        assert!((draw - 10_000.0).abs() < 1e-9);

        year.tax_rate = Some(0.2);
        let (draw, _) = calculate_withdrawal(&config, WithdrawalState::default(), &year);
        assert!((draw - 12_500.0).abs() < 1e-9);

        // income above spending never produces a negative draw
        year.scheduled_income = 100_000.0;
        let (draw, _) = calculate_withdrawal(&config, WithdrawalState::default(), &year);
        assert_eq!(draw, 0.0);
    }

    #[test]
    fn test_schedule_takes_precedence_over_legacy_income() {
        let mut params = SimulationParameters::default();
        params.withdrawal_config.fixed_income_real = Some(10_000.0);
        params.withdrawal_config.fixed_income_nominal = Some(5_000.0);
        let legacy = IncomeSource::resolve(&params);
        assert_eq!(
            legacy,
            IncomeSource::Legacy {
                real: 10_000.0,
                nominal: 5_000.0
            }
        );
        assert!((legacy.offset(0.0, 1.25) - 14_000.0).abs() < 1e-9);

        params.income_schedule =
            Some(IncomeSchedule::new().with_stream(ScheduledIncome::new("SS", 20_000.0, 67)));
        let scheduled = IncomeSource::resolve(&params);
        assert_eq!(scheduled, IncomeSource::Scheduled);
        // legacy fields are ignored, not added
        assert_eq!(scheduled.offset(20_000.0, 1.25), 20_000.0);

        params.income_schedule = Some(IncomeSchedule::new());
        assert!(matches!(IncomeSource::resolve(&params), IncomeSource::Legacy { .. }));

        assert_eq!(
            IncomeSource::resolve(&SimulationParameters::default()),
            IncomeSource::None
        );
    }
}
