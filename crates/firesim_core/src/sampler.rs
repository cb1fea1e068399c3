//! Annual return and inflation generators
//!
//! A [`ReturnSampler`] is resolved once per engine invocation from the
//! allocation weights, parameters and dataset, then shared read-only by every
//! run. All validation happens at construction; sampling itself cannot fail.
//!
//! Each class with a positive weight is sampled in one of two ways:
//! - **historical**: bootstrap from the class's series (i.i.d., or in blocks of
//!   consecutive calendar years that every class shares),
//! - **parametric**: an independent `Normal(mean, volatility)` draw.
//!
//! Parametric sampling is used for every class when bootstrap is disabled,
//! for classes with a custom return or volatility, and for classes the
//! dataset has no series for. Its mean and volatility come from the class
//! overrides in the parameters, then the dataset, then the class defaults;
//! asset-level overrides on the portfolio are not consulted.

use std::collections::BTreeMap;

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::error::{ConfigurationError, SimulationError};
use crate::model::{
    AssetClass, HistoricalDataset, HistoricalInflation, HistoricalReturns, InflationStrategy,
    SimulationParameters,
};

/// One year of sampled market behaviour
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketDraw {
    /// Weighted real portfolio return
    pub real_return: f64,
    /// Calendar year the reference (stock) return came from, if the draw was
    /// historical
    pub stock_year: Option<i16>,
}

/// Position inside the current bootstrap block. One cursor per run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockCursor {
    index: usize,
    remaining: usize,
}

impl BlockCursor {
    /// Advance one year, drawing a new block start when the current block is
    /// used up. Wraps circularly at the end of the series.
    fn next_year<R: Rng + ?Sized>(
        &mut self,
        series: &HistoricalReturns,
        block_length: usize,
        rng: &mut R,
    ) -> Option<i16> {
        if self.remaining == 0 {
            self.index = rng.random_range(0..series.len());
            self.remaining = block_length;
        }
        let year = series.year_at(self.index);
        self.index = (self.index + 1) % series.len();
        self.remaining -= 1;
        year
    }
}

#[derive(Debug, Clone)]
enum ClassModel<'a> {
    Historical(&'a HistoricalReturns),
    Parametric(Normal<f64>),
}

#[derive(Debug, Clone)]
struct WeightedClass<'a> {
    class: AssetClass,
    weight: f64,
    model: ClassModel<'a>,
}

#[derive(Debug, Clone)]
pub struct ReturnSampler<'a> {
    classes: Vec<WeightedClass<'a>>,
    /// Series whose calendar years drive block draws and correlated inflation.
    /// `None` when bootstrap is disabled or the dataset is empty.
    reference: Option<(AssetClass, &'a HistoricalReturns)>,
    block_length: Option<usize>,
}

impl<'a> ReturnSampler<'a> {
    /// Resolve a sampling model for every class with a positive weight.
    ///
    /// Fails with `DataUnavailable` when bootstrap is enabled and a weighted
    /// class's series exists but cannot be sampled.
    pub fn new(
        weights: &BTreeMap<AssetClass, f64>,
        params: &SimulationParameters,
        dataset: &'a HistoricalDataset,
    ) -> Result<Self, SimulationError> {
        let bootstrap = params.use_historical_bootstrap;
        let weighted: Vec<(AssetClass, f64)> = weights
            .iter()
            .filter(|(_, w)| **w > 0.0)
            .map(|(c, w)| (*c, *w))
            .collect();

        if bootstrap {
            dataset.validate_for(
                weighted
                    .iter()
                    .map(|(class, _)| class)
                    .filter(|class| !params.has_parametric_override(**class)),
            )?;
        }

        let mut classes = Vec::with_capacity(weighted.len());
        for (class, weight) in weighted {
            let series = dataset.series(class).filter(|s| !s.is_empty());
            let model = match series {
                Some(series) if bootstrap && !params.has_parametric_override(class) => {
                    ClassModel::Historical(series)
                }
                _ => {
                    if bootstrap && series.is_none() {
                        tracing::warn!(
                            "no historical series for {class}; using parametric defaults"
                        );
                    }
                    ClassModel::Parametric(parametric_model(class, params, dataset)?)
                }
            };
            classes.push(WeightedClass {
                class,
                weight,
                model,
            });
        }

        let reference = if bootstrap {
            dataset.reference_series()
        } else {
            None
        };

        tracing::debug!(
            classes = classes.len(),
            historical = classes
                .iter()
                .filter(|c| matches!(c.model, ClassModel::Historical(_)))
                .count(),
            block_length = ?params.block_length(),
            "return sampler ready"
        );

        Ok(Self {
            classes,
            reference,
            block_length: params.block_length(),
        })
    }

    /// Draw the real portfolio return for simulation year `year` (1-based).
    ///
    /// `cursor` carries the block position between years of the same run and
    /// is reset at year 1.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        year: u32,
        cursor: &mut BlockCursor,
        rng: &mut R,
    ) -> MarketDraw {
        if year <= 1 {
            *cursor = BlockCursor::default();
        }

        let shared_year = match (self.block_length, self.reference) {
            (Some(len), Some((_, series))) => cursor.next_year(series, len, rng),
            _ => None,
        };
        let reference_class = self.reference.map(|(class, _)| class);

        let mut stock_year = shared_year;
        let mut real_return = 0.0;
        for weighted in &self.classes {
            let class_return = match &weighted.model {
                ClassModel::Parametric(normal) => normal.sample(rng),
                ClassModel::Historical(series) => {
                    match shared_year.and_then(|y| series.return_for_year(y)) {
                        Some(r) => r,
                        // i.i.d. draw, or a block year this series doesn't cover
                        None => match series.sample(rng) {
                            Some((drawn_year, r)) => {
                                if stock_year.is_none() && reference_class == Some(weighted.class)
                                {
                                    stock_year = Some(drawn_year);
                                }
                                r
                            }
                            None => 0.0,
                        },
                    }
                }
            };
            real_return += weighted.weight * class_return;
        }

        // Stocks unweighted in i.i.d. mode: still pick a market year for inflation
        if stock_year.is_none()
            && let Some((_, series)) = self.reference
        {
            stock_year = series.sample(rng).map(|(y, _)| y);
        }

        MarketDraw {
            real_return,
            stock_year,
        }
    }

    /// Classes actually sampled, with their weights
    pub fn weights(&self) -> impl Iterator<Item = (AssetClass, f64)> + '_ {
        self.classes.iter().map(|c| (c.class, c.weight))
    }
}

fn parametric_model(
    class: AssetClass,
    params: &SimulationParameters,
    dataset: &HistoricalDataset,
) -> Result<Normal<f64>, ConfigurationError> {
    let stats = dataset
        .statistics(class)
        .filter(|s| s.arithmetic_mean.is_finite() && s.std_dev.is_finite());

    let mean = params
        .custom_returns
        .as_ref()
        .and_then(|m| m.get(&class).copied())
        .or(stats.map(|s| s.arithmetic_mean))
        .unwrap_or_else(|| class.default_mean());
    let volatility = params
        .custom_volatility
        .as_ref()
        .and_then(|m| m.get(&class).copied())
        .or(stats.map(|s| s.std_dev))
        .unwrap_or_else(|| class.default_volatility());

    Normal::new(mean, volatility)
        .map_err(|_| ConfigurationError::InvalidVolatility { class, volatility })
}

/// Annual inflation, fixed or tied to the sampled market year.
#[derive(Debug, Clone, Copy)]
pub struct InflationModel<'a> {
    baseline: f64,
    history: Option<&'a HistoricalInflation>,
}

impl<'a> InflationModel<'a> {
    /// Correlated inflation falls back to the fixed rate only when the
    /// dataset carries no series; a series that fails validation is an error.
    pub fn new(
        params: &SimulationParameters,
        dataset: &'a HistoricalDataset,
    ) -> Result<Self, SimulationError> {
        let history = match params.inflation_strategy {
            InflationStrategy::Fixed => None,
            InflationStrategy::HistoricallyCorrelated => match &dataset.inflation {
                Some(inflation) => {
                    inflation.validate()?;
                    Some(inflation)
                }
                None => {
                    tracing::warn!("no historical inflation series; using fixed inflation rate");
                    None
                }
            },
        };
        Ok(Self {
            baseline: params.inflation_rate,
            history,
        })
    }

    /// Inflation for the year of `draw`. Falls back to the baseline when the
    /// draw was parametric or its year is not covered.
    #[must_use]
    pub fn sample(&self, draw: &MarketDraw) -> f64 {
        self.history
            .zip(draw.stock_year)
            .and_then(|(history, year)| history.rate_for_year(year))
            .unwrap_or(self.baseline)
    }

    #[must_use]
    pub fn is_correlated(&self) -> bool {
        self.history.is_some()
    }
}
