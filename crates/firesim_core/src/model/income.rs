//! Guaranteed income streams (pensions, Social Security, annuities)

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Age reached during simulation year `year`.
///
/// Year 0 is the retirement date itself (the initial balance snapshot), so the
/// cash flows of year `t` happen at `retirement_age + t`: year 1 is lived at
/// `retirement_age + 1`, not at `retirement_age`. A stream starting at the
/// retirement age is therefore already active in year 1, and one starting
/// two years later first pays in year 2.
#[must_use]
pub fn age_in_year(retirement_age: u32, year: u32) -> u32 {
    retirement_age.saturating_add(year)
}

/// A named income stream that switches on at `start_age`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledIncome {
    pub name: String,
    /// Nominal amount per year, in year-1 dollars
    pub annual_amount: f64,
    pub start_age: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_age: Option<u32>,
    /// COLA: keeps constant purchasing power when true
    #[serde(default)]
    pub inflation_adjusted: bool,
}

impl ScheduledIncome {
    #[must_use]
    pub fn new(name: impl Into<String>, annual_amount: f64, start_age: u32) -> Self {
        Self {
            name: name.into(),
            annual_amount,
            start_age,
            end_age: None,
            inflation_adjusted: false,
        }
    }

    #[must_use]
    pub fn until_age(mut self, end_age: u32) -> Self {
        self.end_age = Some(end_age);
        self
    }

    #[must_use]
    pub fn inflation_adjusted(mut self, adjusted: bool) -> Self {
        self.inflation_adjusted = adjusted;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !(self.annual_amount.is_finite() && self.annual_amount > 0.0) {
            return Err(ConfigurationError::InvalidIncomeStream {
                name: self.name.clone(),
                reason: "annual amount must be positive",
            });
        }
        if let Some(end_age) = self.end_age
            && end_age < self.start_age
        {
            return Err(ConfigurationError::InvalidIncomeStream {
                name: self.name.clone(),
                reason: "end age must not precede start age",
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn is_active(&self, age: u32) -> bool {
        age >= self.start_age && self.end_age.is_none_or(|end| age <= end)
    }

    /// Real value received at `age`, given the price level relative to year 1.
    #[must_use]
    pub fn real_amount(&self, age: u32, price_index: f64) -> f64 {
        if !self.is_active(age) {
            0.0
        } else if self.inflation_adjusted {
            self.annual_amount
        } else {
            self.annual_amount / price_index
        }
    }
}

/// Collection of guaranteed income streams.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IncomeSchedule {
    pub streams: Vec<ScheduledIncome>,
}

impl IncomeSchedule {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_stream(mut self, stream: ScheduledIncome) -> Self {
        self.streams.push(stream);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.streams.iter().try_for_each(ScheduledIncome::validate)
    }

    /// Total real income paid in simulation year `year` (1-based).
    ///
    /// `price_index` is the cumulative inflation factor since year 1 (1.0 in
    /// year 1); it only affects streams without COLA.
    #[must_use]
    pub fn total_income(&self, year: u32, retirement_age: Option<u32>, price_index: f64) -> f64 {
        let Some(retirement_age) = retirement_age else {
            return 0.0;
        };
        let age = age_in_year(retirement_age, year);
        self.streams
            .iter()
            .map(|stream| stream.real_amount(age, price_index))
            .sum()
    }
}

impl From<Vec<ScheduledIncome>> for IncomeSchedule {
    fn from(streams: Vec<ScheduledIncome>) -> Self {
        Self { streams }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cola_stream_starts_exactly_at_start_age() {
        let schedule = IncomeSchedule::new()
            .with_stream(ScheduledIncome::new("Social Security", 30_000.0, 67).inflation_adjusted(true));

        for year in 1..=6 {
            assert_eq!(schedule.total_income(year, Some(60), 1.0), 0.0, "year {year}");
        }
        for year in 7..=30 {
            // COLA income ignores the price level entirely
            let price_index = 1.03_f64.powi(year as i32 - 1);
            assert_eq!(schedule.total_income(year, Some(60), price_index), 30_000.0);
        }
    }

    #[test]
    fn test_year_one_is_a_year_past_retirement() {
        assert_eq!(age_in_year(60, 0), 60);
        assert_eq!(age_in_year(60, 1), 61);
        assert_eq!(age_in_year(u32::MAX - 1, 5), u32::MAX);

        let at_retirement = IncomeSchedule::new().with_stream(ScheduledIncome::new("Annuity", 5_000.0, 60));
        assert_eq!(at_retirement.total_income(1, Some(60), 1.0), 5_000.0);
    }

    #[test]
    fn test_no_retirement_age_means_no_income() {
        let schedule = IncomeSchedule::new().with_stream(ScheduledIncome::new("Pension", 10_000.0, 0));
        assert_eq!(schedule.total_income(1, None, 1.0), 0.0);
        assert_eq!(IncomeSchedule::new().total_income(1, Some(65), 1.0), 0.0);
    }

    #[test]
    fn test_end_age_is_inclusive() {
        let stream = ScheduledIncome::new("Bridge", 12_000.0, 61).until_age(63);
        assert!(!stream.is_active(60));
        assert!(stream.is_active(61));
        assert!(stream.is_active(63));
        assert!(!stream.is_active(64));
    }

    #[test]
    fn test_nominal_stream_loses_purchasing_power() {
        let schedule = IncomeSchedule::new().with_stream(ScheduledIncome::new("Annuity", 20_000.0, 60));
        let mut previous = f64::INFINITY;
        let mut price_index = 1.0;
        for year in 1..=20 {
            let income = schedule.total_income(year, Some(60), price_index);
            assert!(income < previous);
            previous = income;
            price_index *= 1.025;
        }
        assert_eq!(schedule.total_income(1, Some(60), 1.0), 20_000.0);
    }

    #[test]
    fn test_streams_are_summed() {
        let schedule = IncomeSchedule::new()
            .with_stream(ScheduledIncome::new("A", 10_000.0, 62).inflation_adjusted(true))
            .with_stream(ScheduledIncome::new("B", 5_000.0, 65).inflation_adjusted(true));
        assert_eq!(schedule.total_income(2, Some(60), 1.0), 10_000.0);
        assert_eq!(schedule.total_income(5, Some(60), 1.0), 15_000.0);
    }

    #[test]
    fn test_validation() {
        assert!(ScheduledIncome::new("ok", 1.0, 65).validate().is_ok());
        assert!(ScheduledIncome::new("zero", 0.0, 65).validate().is_err());
        assert!(
            ScheduledIncome::new("backwards", 1.0, 65)
                .until_age(60)
                .validate()
                .is_err()
        );
    }
}
