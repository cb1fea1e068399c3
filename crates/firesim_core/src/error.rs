use std::fmt;

use crate::model::AssetClass;

/// Invalid simulation configuration, detected before any run starts
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    EmptyPortfolio,
    NonPositiveRuns,
    NonPositiveHorizon,
    NonPositiveInitialValue(f64),
    AllocationWeightsSum(f64),
    NegativeAllocationWeight { class: AssetClass, weight: f64 },
    InvalidWithdrawalRate(f64),
    MissingFixedDollarAmount,
    InvalidFixedDollarAmount(f64),
    InvalidGuardrails { upper: f64, lower: f64 },
    InvalidGuardrailAdjustment(f64),
    InvalidDynamicBounds { floor: f64, ceiling: f64 },
    InvalidTaxRate(f64),
    InvalidVolatility { class: AssetClass, volatility: f64 },
    InvalidCustomReturn { class: AssetClass, value: f64 },
    InvalidBlockLength,
    InvalidInflationRate(f64),
    InvalidIncomeStream { name: String, reason: &'static str },
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationError::EmptyPortfolio => {
                write!(f, "portfolio has no assets; add at least one asset")
            }
            ConfigurationError::NonPositiveRuns => {
                write!(f, "number of runs must be greater than zero")
            }
            ConfigurationError::NonPositiveHorizon => {
                write!(f, "time horizon must be at least one year")
            }
            ConfigurationError::NonPositiveInitialValue(value) => {
                write!(f, "initial portfolio value must be positive (got {value})")
            }
            ConfigurationError::AllocationWeightsSum(sum) => {
                write!(f, "custom allocation weights must sum to 1 (got {sum:.4})")
            }
            ConfigurationError::NegativeAllocationWeight { class, weight } => {
                write!(f, "allocation weight for {class} is negative ({weight})")
            }
            ConfigurationError::InvalidWithdrawalRate(rate) => {
                write!(f, "withdrawal rate must be finite and non-negative (got {rate})")
            }
            ConfigurationError::MissingFixedDollarAmount => {
                write!(f, "fixed-dollar strategy requires an annual amount")
            }
            ConfigurationError::InvalidFixedDollarAmount(amount) => {
                write!(f, "fixed-dollar annual amount must be positive (got {amount})")
            }
            ConfigurationError::InvalidGuardrails { upper, lower } => {
                write!(
                    f,
                    "guardrails must satisfy 0 <= lower < upper (lower={lower}, upper={upper})"
                )
            }
            ConfigurationError::InvalidGuardrailAdjustment(magnitude) => {
                write!(
                    f,
                    "guardrail adjustment must be between 0 and 1 (got {magnitude})"
                )
            }
            ConfigurationError::InvalidDynamicBounds { floor, ceiling } => {
                write!(
                    f,
                    "dynamic withdrawal floor must not exceed ceiling (floor={floor}, ceiling={ceiling})"
                )
            }
            ConfigurationError::InvalidTaxRate(rate) => {
                write!(f, "tax rate must be in [0, 1) (got {rate})")
            }
            ConfigurationError::InvalidVolatility { class, volatility } => {
                write!(
                    f,
                    "volatility for {class} must be finite and non-negative (got {volatility})"
                )
            }
            ConfigurationError::InvalidCustomReturn { class, value } => {
                write!(f, "custom return for {class} must be finite (got {value})")
            }
            ConfigurationError::InvalidBlockLength => {
                write!(f, "bootstrap block length must be at least 1")
            }
            ConfigurationError::InvalidInflationRate(rate) => {
                write!(f, "inflation rate must be finite and above -100% (got {rate})")
            }
            ConfigurationError::InvalidIncomeStream { name, reason } => {
                write!(f, "income stream '{name}': {reason}")
            }
        }
    }
}

impl std::error::Error for ConfigurationError {}

/// Historical data could not be loaded or is unusable
#[derive(Debug, Clone, PartialEq)]
pub enum DataUnavailableError {
    /// The data source failed to produce a dataset
    MissingDataset(String),
    EmptySeries(AssetClass),
    MalformedSeries {
        class: AssetClass,
        reason: &'static str,
    },
    EmptyInflation,
    MalformedInflation(&'static str),
}

impl fmt::Display for DataUnavailableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataUnavailableError::MissingDataset(msg) => {
                write!(f, "historical dataset unavailable: {msg}")
            }
            DataUnavailableError::EmptySeries(class) => {
                write!(f, "historical series for {class} is empty")
            }
            DataUnavailableError::MalformedSeries { class, reason } => {
                write!(f, "historical series for {class} is malformed: {reason}")
            }
            DataUnavailableError::EmptyInflation => {
                write!(f, "historical inflation series is empty")
            }
            DataUnavailableError::MalformedInflation(reason) => {
                write!(f, "historical inflation series is malformed: {reason}")
            }
        }
    }
}

impl std::error::Error for DataUnavailableError {}

/// Errors surfaced by the Monte Carlo engine
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationError {
    Configuration(ConfigurationError),
    DataUnavailable(DataUnavailableError),
    /// Monte Carlo simulation was cancelled by the caller
    Cancelled,
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::Configuration(e) => write!(f, "configuration error: {e}"),
            SimulationError::DataUnavailable(e) => write!(f, "{e}"),
            SimulationError::Cancelled => write!(f, "simulation cancelled"),
        }
    }
}

impl std::error::Error for SimulationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimulationError::Configuration(e) => Some(e),
            SimulationError::DataUnavailable(e) => Some(e),
            SimulationError::Cancelled => None,
        }
    }
}

impl From<ConfigurationError> for SimulationError {
    fn from(err: ConfigurationError) -> Self {
        SimulationError::Configuration(err)
    }
}

impl From<DataUnavailableError> for SimulationError {
    fn from(err: DataUnavailableError) -> Self {
        SimulationError::DataUnavailable(err)
    }
}

/// Errors from post-hoc analytics over simulation output
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// The result was stripped of its per-run trajectories
    MissingRunData,
    InsufficientRuns {
        required: usize,
        available: usize,
    },
    InvalidSearchBounds {
        low: f64,
        high: f64,
    },
    Simulation(SimulationError),
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::MissingRunData => {
                write!(f, "per-run trajectories are required but were stripped")
            }
            AnalysisError::InsufficientRuns {
                required,
                available,
            } => write!(
                f,
                "analysis needs at least {required} runs ({available} available)"
            ),
            AnalysisError::InvalidSearchBounds { low, high } => {
                write!(f, "invalid search bounds [{low}, {high}]")
            }
            AnalysisError::Simulation(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for AnalysisError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AnalysisError::Simulation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SimulationError> for AnalysisError {
    fn from(err: SimulationError) -> Self {
        AnalysisError::Simulation(err)
    }
}

impl From<ConfigurationError> for AnalysisError {
    fn from(err: ConfigurationError) -> Self {
        AnalysisError::Simulation(SimulationError::Configuration(err))
    }
}

pub type Result<T> = std::result::Result<T, SimulationError>;
