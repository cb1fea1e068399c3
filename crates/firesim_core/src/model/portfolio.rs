//! Portfolio snapshot consumed by the engine
//!
//! The caller owns the portfolio; the engine only reads the per-class weights
//! derived from a value snapshot.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Broad asset class used to select a historical series or a parametric profile.
///
/// Ordering is significant: weight maps are iterated in this order so that
/// random draws happen in the same sequence on every invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    UsStocks,
    SmallCapStocks,
    InternationalStocks,
    EmergingMarkets,
    Bonds,
    Tips,
    RealEstate,
    Commodities,
    Cash,
    Crypto,
    Other,
}

impl AssetClass {
    pub const ALL: [AssetClass; 11] = [
        AssetClass::UsStocks,
        AssetClass::SmallCapStocks,
        AssetClass::InternationalStocks,
        AssetClass::EmergingMarkets,
        AssetClass::Bonds,
        AssetClass::Tips,
        AssetClass::RealEstate,
        AssetClass::Commodities,
        AssetClass::Cash,
        AssetClass::Crypto,
        AssetClass::Other,
    ];

    /// Built-in long-run real mean return, used when no history is available.
    #[must_use]
    pub fn default_mean(self) -> f64 {
        match self {
            AssetClass::UsStocks => 0.07,
            AssetClass::SmallCapStocks => 0.08,
            AssetClass::InternationalStocks => 0.06,
            AssetClass::EmergingMarkets => 0.07,
            AssetClass::Bonds => 0.02,
            AssetClass::Tips => 0.015,
            AssetClass::RealEstate => 0.05,
            AssetClass::Commodities => 0.02,
            AssetClass::Cash => 0.005,
            AssetClass::Crypto => 0.10,
            AssetClass::Other => 0.04,
        }
    }

    /// Built-in annual volatility (standard deviation of real returns).
    #[must_use]
    pub fn default_volatility(self) -> f64 {
        match self {
            AssetClass::UsStocks => 0.17,
            AssetClass::SmallCapStocks => 0.22,
            AssetClass::InternationalStocks => 0.18,
            AssetClass::EmergingMarkets => 0.25,
            AssetClass::Bonds => 0.08,
            AssetClass::Tips => 0.06,
            AssetClass::RealEstate => 0.19,
            AssetClass::Commodities => 0.16,
            AssetClass::Cash => 0.01,
            AssetClass::Crypto => 0.70,
            AssetClass::Other => 0.12,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            AssetClass::UsStocks => "US stocks",
            AssetClass::SmallCapStocks => "US small cap",
            AssetClass::InternationalStocks => "international stocks",
            AssetClass::EmergingMarkets => "emerging markets",
            AssetClass::Bonds => "bonds",
            AssetClass::Tips => "TIPS",
            AssetClass::RealEstate => "real estate",
            AssetClass::Commodities => "commodities",
            AssetClass::Cash => "cash",
            AssetClass::Crypto => "crypto",
            AssetClass::Other => "other",
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single holding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub name: String,
    pub asset_class: AssetClass,
    pub quantity: f64,
    pub unit_value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    /// Overrides the class default in the portfolio's derived statistics.
    /// The engine samples whole classes and never reads this; use
    /// `SimulationParameters::custom_returns` to change the sampled mean.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_return: Option<f64>,
    /// Same as `expected_return`, see `SimulationParameters::custom_volatility`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volatility: Option<f64>,
}

impl Asset {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        asset_class: AssetClass,
        quantity: f64,
        unit_value: f64,
    ) -> Self {
        Self {
            name: name.into(),
            asset_class,
            quantity,
            unit_value,
            ticker: None,
            expected_return: None,
            volatility: None,
        }
    }

    #[must_use]
    pub fn ticker(mut self, ticker: impl Into<String>) -> Self {
        self.ticker = Some(ticker.into());
        self
    }

    #[must_use]
    pub fn expected_return(mut self, expected_return: f64) -> Self {
        self.expected_return = Some(expected_return);
        self
    }

    #[must_use]
    pub fn volatility(mut self, volatility: f64) -> Self {
        self.volatility = Some(volatility);
        self
    }

    /// Market value of the holding (`quantity * unit_value`)
    #[must_use]
    pub fn value(&self) -> f64 {
        self.quantity * self.unit_value
    }

    fn effective_return(&self) -> f64 {
        self.expected_return
            .unwrap_or_else(|| self.asset_class.default_mean())
    }

    fn effective_volatility(&self) -> f64 {
        self.volatility
            .unwrap_or_else(|| self.asset_class.default_volatility())
    }
}

/// Ordered set of holdings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    #[serde(default)]
    pub assets: Vec<Asset>,
}

impl Portfolio {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_asset(mut self, asset: Asset) -> Self {
        self.assets.push(asset);
        self
    }

    pub fn push(&mut self, asset: Asset) {
        self.assets.push(asset);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    #[must_use]
    pub fn total_value(&self) -> f64 {
        self.assets.iter().map(Asset::value).sum()
    }

    /// Value weight of each asset class present in the portfolio.
    ///
    /// Weights sum to 1 unless the total value is not positive, in which case
    /// every class present maps to 0.
    #[must_use]
    pub fn class_weights(&self) -> BTreeMap<AssetClass, f64> {
        let total = self.total_value();
        let mut weights = BTreeMap::new();
        for asset in &self.assets {
            *weights.entry(asset.asset_class).or_insert(0.0) += asset.value();
        }
        for weight in weights.values_mut() {
            *weight = if total > 0.0 { *weight / total } else { 0.0 };
        }
        weights
    }

    /// Value-weighted expected real return, honoring per-asset overrides.
    #[must_use]
    pub fn weighted_expected_return(&self) -> f64 {
        self.weighted(Asset::effective_return)
    }

    /// Value-weighted volatility. Ignores correlation, so this is an upper
    /// bound on the true portfolio volatility.
    #[must_use]
    pub fn weighted_volatility(&self) -> f64 {
        self.weighted(Asset::effective_volatility)
    }

    fn weighted(&self, metric: impl Fn(&Asset) -> f64) -> f64 {
        let total = self.total_value();
        if total <= 0.0 {
            return 0.0;
        }
        self.assets
            .iter()
            .map(|asset| asset.value() / total * metric(asset))
            .sum()
    }
}
