use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::RecvTimeoutError;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{WrapErr, bail};
use firesim::{
    AnalysisRequest, HistoryFile, OutputFormat, RunOverrides, Scenario, SimulationRequest,
    SimulationResponse, SimulationWorker, init_logging, render,
};
use firesim_core::model::{
    BuiltinHistory, HistoricalDataSource, HistoricalDataset, load_with_fallback,
};

#[derive(Parser, Debug)]
#[command(name = "firesim")]
#[command(about = "Monte Carlo retirement (FIRE) simulator")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log level (debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a scenario file
    Run(RunArgs),
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Path to the scenario YAML file
    scenario: PathBuf,

    /// Historical dataset YAML (default: built-in US history)
    #[arg(long)]
    history: Option<PathBuf>,

    /// Use the built-in history if the --history file cannot be loaded
    #[arg(long, requires = "history")]
    fallback_builtin: bool,

    /// Override the number of runs
    #[arg(short, long)]
    runs: Option<usize>,

    /// Override the RNG seed
    #[arg(short, long)]
    seed: Option<u64>,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Split runs into sequence-of-returns cohorts
    #[arg(long)]
    cohorts: bool,

    /// Compare all withdrawal strategies on the same market paths
    #[arg(long)]
    compare: bool,

    /// Cancel the simulation after this many seconds
    #[arg(long)]
    timeout: Option<u64>,
}

fn load_dataset(args: &RunArgs) -> color_eyre::Result<HistoricalDataset> {
    let Some(path) = &args.history else {
        return Ok(HistoricalDataset::us_default());
    };
    let source = HistoryFile::new(path);
    let fallback = args
        .fallback_builtin
        .then_some(&BuiltinHistory as &dyn HistoricalDataSource);
    load_with_fallback(&source, fallback)
        .wrap_err_with(|| format!("Failed to load history from {}", path.display()))
}

fn run(args: RunArgs) -> color_eyre::Result<()> {
    let scenario = Scenario::load(&args.scenario)
        .wrap_err_with(|| format!("Failed to load scenario {}", args.scenario.display()))?;
    let file_stem = args
        .scenario
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = scenario.display_name(&file_stem).to_string();

    let params = scenario
        .resolve(RunOverrides {
            runs: args.runs,
            seed: args.seed,
        })
        .wrap_err("Invalid simulation parameters")?;
    let dataset = Arc::new(load_dataset(&args)?);

    let worker = SimulationWorker::new();
    let request = SimulationRequest::Run {
        portfolio: scenario.portfolio,
        params,
        dataset,
        analysis: AnalysisRequest {
            cohorts: args.cohorts,
            compare: args.compare,
        },
    };
    if !worker.send(request) {
        bail!("Simulation worker is not running");
    }

    let started = Instant::now();
    let deadline = args.timeout.map(Duration::from_secs);
    loop {
        if let Some(deadline) = deadline
            && started.elapsed() > deadline
            && !worker.is_cancelled()
        {
            tracing::warn!("Timeout reached, cancelling simulation");
            worker.cancel();
        }

        match worker.recv_timeout(Duration::from_millis(250)) {
            Ok(SimulationResponse::Progress { current, total }) => {
                tracing::debug!(current, total, "Simulation progress");
            }
            Ok(SimulationResponse::Complete(report)) => {
                println!("{}", render(args.format, &name, &report)?);
                return Ok(());
            }
            Ok(SimulationResponse::Cancelled) => {
                bail!("Simulation cancelled after {} runs", worker.get_progress())
            }
            Ok(SimulationResponse::Error(message)) => bail!("Simulation failed: {message}"),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => bail!("Simulation worker stopped unexpectedly"),
        }
    }
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    init_logging(&args.log_level)?;

    match args.command {
        Command::Run(run_args) => run(run_args),
    }
}
