//! Historical market data
//!
//! Per-asset-class annual real returns and a historical inflation series, with
//! summary statistics. The dataset is built once by the caller and shared
//! read-only across every simulation run.

use std::borrow::Cow;
use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::DataUnavailableError;
use crate::model::AssetClass;

/// Basic statistics for a historical series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoricalStatistics {
    pub arithmetic_mean: f64,
    pub geometric_mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub years: usize,
}

impl HistoricalStatistics {
    fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let arithmetic_mean = values.iter().sum::<f64>() / n;

        // Geometric mean: (product of (1+r))^(1/n) - 1
        let product: f64 = values.iter().map(|r| 1.0 + r).product();
        let geometric_mean = product.powf(1.0 / n) - 1.0;

        let variance = values
            .iter()
            .map(|r| (r - arithmetic_mean).powi(2))
            .sum::<f64>()
            / n;

        Some(Self {
            arithmetic_mean,
            geometric_mean,
            std_dev: variance.sqrt(),
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            years: values.len(),
        })
    }
}

/// Annual real return series for one asset class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalReturns {
    /// Index/source name for display purposes
    pub name: Cow<'static, str>,
    /// Calendar year of `returns[0]`
    pub start_year: i16,
    pub returns: Cow<'static, [f64]>,
}

impl HistoricalReturns {
    #[must_use]
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        start_year: i16,
        returns: impl Into<Cow<'static, [f64]>>,
    ) -> Self {
        Self {
            name: name.into(),
            start_year,
            returns: returns.into(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.returns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.returns.is_empty()
    }

    /// Calendar year of the last observation. `None` for an empty series or
    /// one whose years run past `i16::MAX`.
    #[must_use]
    pub fn end_year(&self) -> Option<i16> {
        year_at(self.start_year, self.returns.len().checked_sub(1)?)
    }

    /// Calendar year of `returns[index]`
    #[must_use]
    pub fn year_at(&self, index: usize) -> Option<i16> {
        year_at(self.start_year, index)
    }

    /// Return observed in a given calendar year, if covered
    #[must_use]
    pub fn return_for_year(&self, year: i16) -> Option<f64> {
        self.returns.get(year_offset(self.start_year, year)?).copied()
    }

    /// Sample a random year (i.i.d. with replacement). Returns the calendar
    /// year drawn together with its return.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<(i16, f64)> {
        if self.returns.is_empty() {
            return None;
        }
        let idx = rng.random_range(0..self.returns.len());
        Some((self.year_at(idx)?, self.returns[idx]))
    }

    #[must_use]
    pub fn statistics(&self) -> Option<HistoricalStatistics> {
        HistoricalStatistics::from_values(&self.returns)
    }

    /// Reject series that cannot be sampled meaningfully.
    pub fn validate(&self, class: AssetClass) -> Result<(), DataUnavailableError> {
        if self.returns.is_empty() {
            return Err(DataUnavailableError::EmptySeries(class));
        }
        if self.returns.iter().any(|r| !r.is_finite()) {
            return Err(DataUnavailableError::MalformedSeries {
                class,
                reason: "contains non-finite values",
            });
        }
        if self.returns.iter().any(|r| *r <= -1.0) {
            return Err(DataUnavailableError::MalformedSeries {
                class,
                reason: "contains a return of -100% or worse",
            });
        }
        if self.end_year().is_none() {
            return Err(DataUnavailableError::MalformedSeries {
                class,
                reason: "calendar years run past 32767",
            });
        }
        Ok(())
    }
}

fn year_at(start_year: i16, index: usize) -> Option<i16> {
    start_year.checked_add(i16::try_from(index).ok()?)
}

fn year_offset(start_year: i16, year: i16) -> Option<usize> {
    usize::try_from(i32::from(year) - i32::from(start_year)).ok()
}

/// Annual inflation series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalInflation {
    pub name: Cow<'static, str>,
    /// Calendar year of `rates[0]`
    pub start_year: i16,
    pub rates: Cow<'static, [f64]>,
}

impl HistoricalInflation {
    #[must_use]
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        start_year: i16,
        rates: impl Into<Cow<'static, [f64]>>,
    ) -> Self {
        Self {
            name: name.into(),
            start_year,
            rates: rates.into(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    #[must_use]
    pub fn rate_for_year(&self, year: i16) -> Option<f64> {
        self.rates.get(year_offset(self.start_year, year)?).copied()
    }

    #[must_use]
    pub fn statistics(&self) -> Option<HistoricalStatistics> {
        HistoricalStatistics::from_values(&self.rates)
    }

    pub fn validate(&self) -> Result<(), DataUnavailableError> {
        if self.rates.is_empty() {
            return Err(DataUnavailableError::EmptyInflation);
        }
        if self.rates.iter().any(|r| !r.is_finite() || *r <= -1.0) {
            return Err(DataUnavailableError::MalformedInflation(
                "rates must be finite and above -100%",
            ));
        }
        if year_at(self.start_year, self.rates.len() - 1).is_none() {
            return Err(DataUnavailableError::MalformedInflation(
                "calendar years run past 32767",
            ));
        }
        Ok(())
    }

    /// US CPI inflation (All Urban Consumers), 1948-2025
    #[must_use]
    pub fn us_cpi() -> Self {
        Self::new("US CPI", 1948, historical_data::US_CPI)
    }
}

/// Historical annual real returns keyed by asset class, plus inflation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoricalDataset {
    #[serde(default)]
    pub series: BTreeMap<AssetClass, HistoricalReturns>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inflation: Option<HistoricalInflation>,
}

impl HistoricalDataset {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_series(mut self, class: AssetClass, series: HistoricalReturns) -> Self {
        self.series.insert(class, series);
        self
    }

    #[must_use]
    pub fn with_inflation(mut self, inflation: HistoricalInflation) -> Self {
        self.inflation = Some(inflation);
        self
    }

    /// Built-in US dataset: nominal index returns deflated by CPI, restricted
    /// to the years covered by the CPI series.
    #[must_use]
    pub fn us_default() -> Self {
        use historical_data as h;

        let series = [
            (AssetClass::UsStocks, "S&P 500", 1948, h::US_STOCKS),
            (AssetClass::SmallCapStocks, "US Small Cap", 1948, h::US_SMALL_CAP),
            (
                AssetClass::InternationalStocks,
                "Intl Developed",
                1991,
                h::INTL_DEVELOPED,
            ),
            (
                AssetClass::EmergingMarkets,
                "Emerging Markets",
                1991,
                h::EMERGING_MARKETS,
            ),
            (AssetClass::Bonds, "US Long Bonds", 1948, h::BONDS),
            (AssetClass::Tips, "TIPS", 2004, h::TIPS),
            (AssetClass::RealEstate, "REITs", 2005, h::REAL_ESTATE),
            (AssetClass::Commodities, "Gold", 2001, h::GOLD),
            (AssetClass::Cash, "US T-Bills", 1948, h::CASH),
        ];

        let mut dataset = Self::new().with_inflation(HistoricalInflation::us_cpi());
        for (class, name, start_year, returns) in series {
            dataset = dataset.with_series(class, HistoricalReturns::new(name, start_year, returns));
        }
        dataset
    }

    #[must_use]
    pub fn series(&self, class: AssetClass) -> Option<&HistoricalReturns> {
        self.series.get(&class)
    }

    #[must_use]
    pub fn statistics(&self, class: AssetClass) -> Option<HistoricalStatistics> {
        self.series(class).and_then(HistoricalReturns::statistics)
    }

    /// Series whose calendar years drive shared (block) draws and correlated
    /// inflation: US stocks when present, otherwise the longest series.
    #[must_use]
    pub fn reference_series(&self) -> Option<(AssetClass, &HistoricalReturns)> {
        if let Some(stocks) = self.series.get(&AssetClass::UsStocks)
            && !stocks.is_empty()
        {
            return Some((AssetClass::UsStocks, stocks));
        }
        self.series
            .iter()
            .filter(|(_, s)| !s.is_empty())
            // max_by_key keeps the last maximum; reverse so ties go to the first class
            .rev()
            .max_by_key(|(_, s)| s.len())
            .map(|(class, s)| (*class, s))
    }

    /// Check every class the caller intends to sample. Classes absent from the
    /// dataset are not an error (they fall back to parametric defaults).
    pub fn validate_for<'a>(
        &self,
        classes: impl IntoIterator<Item = &'a AssetClass>,
    ) -> Result<(), DataUnavailableError> {
        for class in classes {
            if let Some(series) = self.series.get(class) {
                series.validate(*class)?;
            }
        }
        Ok(())
    }
}

/// Something that can produce the historical dataset (file, embedded table, ...)
pub trait HistoricalDataSource {
    fn load(&self) -> Result<HistoricalDataset, DataUnavailableError>;
}

impl<F> HistoricalDataSource for F
where
    F: Fn() -> Result<HistoricalDataset, DataUnavailableError>,
{
    fn load(&self) -> Result<HistoricalDataset, DataUnavailableError> {
        self()
    }
}

/// The embedded US dataset, usable as an explicit fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinHistory;

impl HistoricalDataSource for BuiltinHistory {
    fn load(&self) -> Result<HistoricalDataset, DataUnavailableError> {
        Ok(HistoricalDataset::us_default())
    }
}

/// Load from `source`; only when a `fallback` is explicitly supplied is a
/// failure replaced by the fallback's dataset.
pub fn load_with_fallback(
    source: &dyn HistoricalDataSource,
    fallback: Option<&dyn HistoricalDataSource>,
) -> Result<HistoricalDataset, DataUnavailableError> {
    match source.load() {
        Ok(dataset) => Ok(dataset),
        Err(err) => match fallback {
            Some(fallback) => {
                tracing::warn!("historical data unavailable ({err}); using fallback dataset");
                fallback.load()
            }
            None => Err(err),
        },
    }
}

/// Built-in annual series. Returns are real (nominal total return deflated by
/// US CPI for the same calendar year).
///
/// Sources: Robert Shiller (S&P 500, long bonds), Kenneth French Data Library
/// (small cap, international, emerging), FRED (T-bills, CPIAUCSL), Yahoo
/// Finance ETF history (REITs, gold, TIPS).
pub mod historical_data {
    /// US large cap stocks (S&P 500 total return), 1948-2023
    pub const US_STOCKS: &[f64] = &[
        0.0035, 0.1238, 0.1037, 0.2495, 0.1882, 0.1329, 0.0260, 0.4322, 0.2429, 0.0369,
        -0.0734, 0.3632, 0.0635, 0.0517, 0.1752, -0.0424, 0.1902, 0.1344, 0.0805, -0.0931,
        0.1038, 0.0436, -0.1252, 0.0329, 0.0958, 0.0798, -0.2379, -0.2554, 0.3064, 0.0463,
        -0.1552, 0.0216, 0.0345, 0.1472, -0.0959, 0.2271, 0.1522, 0.0335, 0.2330, 0.2462,
        -0.0596, 0.1196, 0.1539, -0.0388, 0.2703, 0.0444, 0.0865, -0.0165, 0.2982, 0.2434,
        0.2518, 0.2745, 0.1148, -0.0648, -0.1514, -0.2132, 0.2393, 0.0263, 0.0734, 0.0869,
        -0.0083, -0.3634, 0.2989, 0.1264, 0.0169, 0.1414, 0.2423, 0.1260, -0.0521, 0.1801,
        0.2205, -0.0677, 0.2590, 0.0928, 0.1476, -0.1463,
    ];

    /// US small cap stocks (market + SMB factor), 1948-2024
    pub const US_SMALL_CAP: &[f64] = &[
        -0.0983, 0.2630, 0.2363, 0.0894, 0.0576, -0.0104, 0.4866, 0.1855, 0.0449, -0.1525,
        0.5674, 0.1625, -0.0321, 0.2718, -0.1922, 0.1307, 0.1356, 0.3372, -0.0914, 0.7283,
        0.3215, -0.2908, -0.1637, 0.1800, 0.0130, -0.4738, -0.3618, 0.4313, 0.3484, 0.1212,
        0.1243, 0.2743, 0.2327, -0.0500, 0.2489, 0.3150, -0.0782, 0.2773, 0.0561, -0.1296,
        0.1825, 0.1097, -0.2467, 0.4652, 0.1406, 0.1447, -0.0313, 0.2387, 0.1275, 0.2140,
        -0.0226, 0.3540, -0.1870, 0.0492, -0.1915, 0.5485, 0.1252, 0.0031, 0.1265, -0.0565,
        -0.3418, 0.3382, 0.2945, -0.0801, 0.1315, 0.4070, 0.0344, -0.0428, 0.1769, 0.1458,
        -0.0999, 0.2133, 0.3572, 0.1210, -0.3131, 0.1920, 0.1051,
    ];

    /// US 3-month Treasury bills, 1948-2025
    pub const CASH: &[f64] = &[
        -0.0165, 0.0300, -0.0435, -0.0419, 0.0080, 0.0128, 0.0131, 0.0135, -0.0019, 0.0018,
        0.0001, 0.0184, 0.0150, 0.0167, 0.0152, 0.0149, 0.0232, 0.0199, 0.0145, 0.0100,
        0.0060, 0.0073, 0.0078, 0.0103, 0.0064, -0.0175, -0.0381, -0.0127, -0.0007, -0.0132,
        -0.0165, -0.0281, -0.0082, 0.0469, 0.0653, 0.0464, 0.0527, 0.0356, 0.0473, 0.0138,
        0.0216, 0.0332, 0.0117, 0.0232, 0.0045, 0.0018, 0.0161, 0.0289, 0.0158, 0.0330,
        0.0312, 0.0191, 0.0230, 0.0176, -0.0086, -0.0101, -0.0191, -0.0018, 0.0216, 0.0023,
        0.0139, -0.0259, -0.0128, -0.0292, -0.0164, -0.0143, -0.0062, -0.0059, -0.0170, -0.0117,
        -0.0006, -0.0025, -0.0094, -0.0664, -0.0413, 0.0169, 0.0204, 0.0138,
    ];

    /// US long-term government bonds, 1948-2023
    pub const BONDS: &[f64] = &[
        -0.0072, 0.0483, -0.0421, -0.0473, 0.0067, 0.0141, 0.0673, -0.0129, -0.0286, -0.0347,
        0.0446, -0.0625, 0.0465, 0.0528, 0.0212, 0.0181, 0.0131, 0.0147, -0.0406, 0.0043,
        -0.0403, -0.0798, -0.0409, 0.1316, 0.0226, -0.0715, -0.0979, -0.0281, 0.0566, 0.0232,
        -0.0872, -0.1157, -0.1696, -0.1566, 0.1671, 0.2349, -0.0346, 0.2232, 0.3257, -0.0217,
        0.0027, 0.0668, 0.0173, 0.1078, 0.1133, 0.1293, -0.0622, 0.0834, 0.0419, 0.0533,
        0.1324, -0.0039, -0.0091, 0.1232, 0.0565, 0.0719, -0.0135, 0.0078, -0.0218, 0.0190,
        0.1235, 0.0403, 0.0213, 0.0347, 0.0874, -0.0403, 0.0018, 0.0511, 0.0239, -0.0410,
        -0.0423, 0.0685, 0.1035, -0.0994, -0.1601, -0.0665,
    ];

    /// Developed markets ex-US, 1991-2024
    pub const INTL_DEVELOPED: &[f64] = &[
        0.0628, -0.1781, 0.2663, 0.0721, 0.0574, 0.0240, -0.0215, 0.1495, 0.3307, -0.1922,
        -0.2235, -0.1410, 0.4103, 0.1872, 0.1302, 0.2243, 0.0856, -0.4279, 0.2989, 0.1030,
        -0.1520, 0.1526, 0.2119, -0.0514, -0.0139, 0.0122, 0.2447, -0.1569, 0.1912, 0.0916,
        0.0466, -0.2016, 0.1233, 0.0070,
    ];

    /// Emerging markets, 1991-2023
    pub const EMERGING_MARKETS: &[f64] = &[
        -0.6929, 0.9030, -0.0988, -0.0611, -0.0149, -0.2359, -0.2545, 0.8789, -0.3093, -0.0588,
        -0.0420, 0.6238, 0.2517, 0.2783, 0.2842, 0.3998, -0.4545, 0.6177, 0.2909, -0.1335,
        0.1620, 0.0252, 0.0061, -0.1195, 0.1582, 0.2652, -0.1065, 0.0534, 0.0787, 0.1265,
        -0.1328, 0.0333, -0.0623,
    ];

    /// US REITs, 2005-2025
    pub const REAL_ESTATE: &[f64] = &[
        0.0832, 0.3195, -0.1982, -0.3697, 0.2658, 0.2657, 0.0541, 0.1560, 0.0078, 0.2956,
        0.0178, 0.0639, 0.0271, -0.0787, 0.2599, -0.0585, 0.3115, -0.3069, 0.0826, 0.0189,
        0.0058,
    ];

    /// Gold, 2001-2025
    pub const GOLD: &[f64] = &[
        0.0085, 0.2170, 0.1720, 0.0184, 0.1437, 0.1982, 0.2625, 0.0585, 0.2056, 0.2792,
        0.0691, 0.0511, -0.2931, -0.0214, -0.1101, 0.0628, 0.1122, -0.0406, 0.1617, 0.2297,
        -0.0992, -0.0643, 0.0970, 0.2392, 0.6027,
    ];

    /// US Treasury inflation-protected securities, 2004-2025
    pub const TIPS: &[f64] = &[
        0.0478, -0.0082, -0.0218, 0.0751, 0.0007, 0.0595, 0.0462, 0.0994, 0.0456, -0.0985,
        0.0292, -0.0237, 0.0258, 0.0077, -0.0336, 0.0589, 0.0940, -0.0138, -0.1755, 0.0046,
        -0.0119, 0.0400,
    ];

    /// US CPI inflation (All Urban Consumers), 1948-2025
    pub const US_CPI: &[f64] = &[
        0.0273, -0.0183, 0.0580, 0.0596, 0.0091, 0.0060, -0.0037, 0.0037, 0.0283, 0.0304, 0.0176,
        0.0152, 0.0136, 0.0067, 0.0123, 0.0165, 0.0120, 0.0192, 0.0336, 0.0328, 0.0471, 0.0590,
        0.0557, 0.0327, 0.0341, 0.0894, 0.1210, 0.0713, 0.0504, 0.0668, 0.0899, 0.1325, 0.1235,
        0.0891, 0.0383, 0.0379, 0.0404, 0.0379, 0.0119, 0.0433, 0.0441, 0.0464, 0.0625, 0.0298,
        0.0297, 0.0281, 0.0260, 0.0253, 0.0338, 0.0170, 0.0161, 0.0268, 0.0344, 0.0160, 0.0248,
        0.0204, 0.0334, 0.0334, 0.0252, 0.0411, -0.0002, 0.0281, 0.0144, 0.0306, 0.0176, 0.0151,
        0.0065, 0.0064, 0.0205, 0.0213, 0.0200, 0.0232, 0.0132, 0.0716, 0.0641, 0.0332, 0.0287,
        0.0265,
    ];
}
