//! Background worker for running simulations off the main thread.
//!
//! The main thread sends a [`SimulationRequest`] and polls for
//! [`SimulationResponse`]s. While the engine runs, the worker posts progress
//! updates; [`SimulationWorker::cancel`] stops the engine before its next run.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, channel};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use firesim_core::analysis::{
    ComparisonOptions, SequenceRiskAnalysis, StrategyComparison, analyze_sequence_risk,
    compare_strategies,
};
use firesim_core::error::SimulationError;
use firesim_core::model::{
    HistoricalDataset, MonteCarloProgress, Portfolio, SimulationParameters, SimulationResult,
};
use firesim_core::simulation::run_simulation_with_progress;
use serde::Serialize;

/// How often progress is posted while the engine runs
const PROGRESS_INTERVAL: Duration = Duration::from_millis(200);

/// Optional analytics computed after the main run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub cohorts: bool,
    pub compare: bool,
}

/// Request sent to the background worker
#[derive(Debug)]
pub enum SimulationRequest {
    /// Run Monte Carlo simulation
    Run {
        portfolio: Portfolio,
        params: SimulationParameters,
        dataset: Arc<HistoricalDataset>,
        analysis: AnalysisRequest,
    },
    /// Graceful shutdown
    Shutdown,
}

/// Everything produced for one request
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    /// Aggregates only; per-run data is dropped once analytics are done
    pub result: SimulationResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cohorts: Option<SequenceRiskAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<StrategyComparison>,
}

/// Response from the background worker
#[derive(Debug)]
pub enum SimulationResponse {
    /// Progress update for Monte Carlo
    Progress { current: usize, total: usize },
    /// Simulation completed (boxed to reduce enum size)
    Complete(Box<SimulationReport>),
    /// Simulation was cancelled
    Cancelled,
    /// Error occurred
    Error(String),
}

/// Background worker that runs simulations on a separate thread
pub struct SimulationWorker {
    request_tx: Sender<SimulationRequest>,
    response_rx: Receiver<SimulationResponse>,
    cancel_flag: Arc<AtomicBool>,
    progress: Arc<AtomicUsize>,
    thread: Option<JoinHandle<()>>,
}

impl SimulationWorker {
    /// Create a new simulation worker with a background thread
    pub fn new() -> Self {
        let (request_tx, request_rx) = channel();
        let (response_tx, response_rx) = channel();
        let cancel_flag = Arc::new(AtomicBool::new(false));
        let progress = Arc::new(AtomicUsize::new(0));

        let ctx = WorkerContext {
            response_tx,
            cancel_flag: cancel_flag.clone(),
            progress: progress.clone(),
        };

        let thread = thread::spawn(move || {
            ctx.run(request_rx);
        });

        Self {
            request_tx,
            response_rx,
            cancel_flag,
            progress,
            thread: Some(thread),
        }
    }

    /// Send a simulation request to the worker
    pub fn send(&self, request: SimulationRequest) -> bool {
        // Clear cancel flag for new work
        self.cancel_flag.store(false, Ordering::SeqCst);
        self.progress.store(0, Ordering::SeqCst);
        self.request_tx.send(request).is_ok()
    }

    /// Wait up to `timeout` for a response
    pub fn recv_timeout(&self, timeout: Duration) -> Result<SimulationResponse, RecvTimeoutError> {
        self.response_rx.recv_timeout(timeout)
    }

    /// Runs completed in the current request
    pub fn get_progress(&self) -> usize {
        self.progress.load(Ordering::SeqCst)
    }

    /// Request cancellation of the current operation
    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_flag.load(Ordering::SeqCst)
    }

    /// Shutdown the worker thread
    pub fn shutdown(&self) {
        let _ = self.request_tx.send(SimulationRequest::Shutdown);
    }
}

impl Default for SimulationWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SimulationWorker {
    fn drop(&mut self) {
        self.cancel();
        self.shutdown();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Shared state for the background worker thread.
struct WorkerContext {
    response_tx: Sender<SimulationResponse>,
    cancel_flag: Arc<AtomicBool>,
    progress: Arc<AtomicUsize>,
}

impl WorkerContext {
    fn run(&self, request_rx: Receiver<SimulationRequest>) {
        while let Ok(request) = request_rx.recv() {
            match request {
                SimulationRequest::Shutdown => break,
                SimulationRequest::Run {
                    portfolio,
                    params,
                    dataset,
                    analysis,
                } => {
                    tracing::info!(
                        runs = params.number_of_runs,
                        seed = ?params.rng_seed,
                        "Starting Monte Carlo simulation"
                    );
                    if self.cancel_flag.load(Ordering::SeqCst) {
                        let _ = self.response_tx.send(SimulationResponse::Cancelled);
                        continue;
                    }
                    self.progress.store(0, Ordering::SeqCst);
                    let response = match self.run_monte_carlo(&portfolio, &params, &dataset, analysis)
                    {
                        Ok(Some(report)) => SimulationResponse::Complete(Box::new(report)),
                        Ok(None) => SimulationResponse::Cancelled,
                        Err(e) => SimulationResponse::Error(e),
                    };
                    let _ = self.response_tx.send(response);
                }
            }
        }
    }

    fn run_monte_carlo(
        &self,
        portfolio: &Portfolio,
        params: &SimulationParameters,
        dataset: &HistoricalDataset,
        analysis: AnalysisRequest,
    ) -> Result<Option<SimulationReport>, String> {
        let mc_progress =
            MonteCarloProgress::from_atomics(self.progress.clone(), self.cancel_flag.clone());
        let total = params.number_of_runs;

        let outcome = thread::scope(|scope| {
            let engine = scope
                .spawn(|| run_simulation_with_progress(portfolio, params, dataset, &mc_progress));
            while !engine.is_finished() {
                let _ = self.response_tx.send(SimulationResponse::Progress {
                    current: mc_progress.completed(),
                    total,
                });
                thread::sleep(PROGRESS_INTERVAL);
            }
            engine.join()
        });

        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(SimulationError::Cancelled)) => return Ok(None),
            Ok(Err(e)) => return Err(e.to_string()),
            Err(_) => return Err("Simulation thread panicked".to_string()),
        };
        let _ = self.response_tx.send(SimulationResponse::Progress {
            current: total,
            total,
        });

        let cohorts = if analysis.cohorts {
            Some(analyze_sequence_risk(&result).map_err(|e| e.to_string())?)
        } else {
            None
        };

        if self.cancel_flag.load(Ordering::SeqCst) {
            return Ok(None);
        }
        let comparison = if analysis.compare {
            tracing::info!("Comparing withdrawal strategies");
            Some(
                compare_strategies(portfolio, params, dataset, ComparisonOptions::default())
                    .map_err(|e| e.to_string())?,
            )
        } else {
            None
        };

        Ok(Some(SimulationReport {
            result: result.strip_runs(),
            cohorts,
            comparison,
        }))
    }
}
