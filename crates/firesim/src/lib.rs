//! Command-line driver for the firesim retirement simulator
//!
//! Loads a YAML [`Scenario`](scenario::Scenario), runs the Monte Carlo engine
//! on a background [`SimulationWorker`](worker::SimulationWorker) and renders
//! the result as text or JSON.

pub mod logging;
pub mod report;
pub mod scenario;
pub mod worker;

pub use logging::init_logging;
pub use report::{OutputFormat, render};
pub use scenario::{HistoryFile, RunOverrides, Scenario, ScenarioError};
pub use worker::{
    AnalysisRequest, SimulationReport, SimulationRequest, SimulationResponse, SimulationWorker,
};
