//! Simulation configuration
//!
//! [`SimulationParameters`](crate::model::SimulationParameters) can be built
//! directly, deserialized, assembled with the fluent [`ParametersBuilder`], or
//! derived from personal [`RetirementAssumptions`].

mod assumptions;
mod builder;

pub use assumptions::{MAX_ACCUMULATION_YEARS, RetirementAssumptions};
pub use builder::ParametersBuilder;
