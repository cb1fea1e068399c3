//! YAML scenario files
//!
//! A scenario bundles a portfolio snapshot, simulation parameters and optional
//! personal retirement assumptions:
//!
//! ```yaml
//! name: Early retirement
//! portfolio:
//!   assets:
//!     - name: Total Market
//!       asset_class: us_stocks
//!       quantity: 2000
//!       unit_value: 300
//!     - name: Aggregate Bond
//!       asset_class: bonds
//!       quantity: 5000
//!       unit_value: 80
//! retirement:
//!   current_age: 40
//!   retirement_age: 50
//!   life_expectancy: 95
//!   current_savings: 1000000
//!   annual_contribution: 40000
//!   annual_spending: 60000
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use firesim_core::error::{ConfigurationError, DataUnavailableError};
use firesim_core::model::{HistoricalDataSource, HistoricalDataset, Portfolio, SimulationParameters};
use firesim_core::RetirementAssumptions;
use serde::{Deserialize, Serialize};

/// Error types for scenario file operations
#[derive(Debug)]
pub enum ScenarioError {
    Io(String),
    Parse(String),
}

impl std::fmt::Display for ScenarioError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScenarioError::Io(msg) => write!(f, "IO error: {}", msg),
            ScenarioError::Parse(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for ScenarioError {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub portfolio: Portfolio,
    #[serde(default)]
    pub parameters: SimulationParameters,
    /// Sizes the initial value, horizon and withdrawal rate when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retirement: Option<RetirementAssumptions>,
}

/// Command-line values that take precedence over the scenario file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOverrides {
    pub runs: Option<usize>,
    pub seed: Option<u64>,
}

impl Scenario {
    pub fn from_yaml(yaml: &str) -> Result<Self, ScenarioError> {
        serde_saphyr::from_str(yaml).map_err(|e| ScenarioError::Parse(e.to_string()))
    }

    pub fn to_yaml(&self) -> Result<String, ScenarioError> {
        serde_saphyr::to_string(self).map_err(|e| ScenarioError::Parse(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ScenarioError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_yaml(&content)
    }

    /// Display name, falling back to `fallback` (usually the file stem)
    pub fn display_name<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.name.as_deref().unwrap_or(fallback)
    }

    /// Final parameters: retirement assumptions first, then command-line
    /// overrides, validated.
    pub fn resolve(&self, overrides: RunOverrides) -> Result<SimulationParameters, ConfigurationError> {
        let mut params = match &self.retirement {
            Some(assumptions) => assumptions.apply_to(self.parameters.clone())?,
            None => self.parameters.clone(),
        };
        if let Some(runs) = overrides.runs {
            params.number_of_runs = runs;
        }
        if let Some(seed) = overrides.seed {
            params.rng_seed = Some(seed);
        }
        params.validate()?;
        Ok(params)
    }
}

/// Historical dataset stored as a YAML file
#[derive(Debug, Clone)]
pub struct HistoryFile {
    path: PathBuf,
}

impl HistoryFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl HistoricalDataSource for HistoryFile {
    fn load(&self) -> Result<HistoricalDataset, DataUnavailableError> {
        let content = fs::read_to_string(&self.path).map_err(|e| {
            DataUnavailableError::MissingDataset(format!("{}: {}", self.path.display(), e))
        })?;
        serde_saphyr::from_str(&content).map_err(|e| {
            DataUnavailableError::MissingDataset(format!("{}: {}", self.path.display(), e))
        })
    }
}
