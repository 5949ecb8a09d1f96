// src/bin/run_bycycle.rs
//! Run cycle-by-cycle feature extraction over every session and region
//! listed in a metadata export.
//!
//! ```bash
//! run-bycycle --csv-path out/csv \
//!     --preprocessed-path data/preprocessed \
//!     --meta-data-path meta/metaDataExt.json
//! ```
//!
//! Events go to the console (INFO, override with `RUST_LOG`) and to
//! `<log-dir>/RunBycycle_<YYYYMMDD_HHMMSS>.log` (DEBUG).

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use lfp_bycycle::config::constants::paths::{DEFAULT_LOG_DIR, LOG_FILE_PREFIX};
use lfp_bycycle::config::ConfigLoader;
use lfp_bycycle::metadata::{load_session_plan, FileEngineLauncher};
use lfp_bycycle::pipeline::{PipelineBuilder, RunPaths};
use lfp_bycycle::report::TracingReporter;
use lfp_bycycle::utils::{format_elapsed, format_timestamp, Clock, SystemClock};

#[derive(Parser, Debug)]
#[command(name = "run-bycycle")]
#[command(author, version, about = "Cycle-by-cycle LFP feature extraction", long_about = None)]
struct Args {
    /// Root directory for feature CSVs
    #[arg(long = "csv-path", alias = "csv_path")]
    csv_path: PathBuf,

    /// Directory holding the preprocessed session containers
    #[arg(long = "preprocessed-path", alias = "preProcessedPath")]
    preprocessed_path: PathBuf,

    /// Metadata export (.json or .toml)
    #[arg(long = "meta-data-path", alias = "meta_data_path")]
    meta_data_path: PathBuf,

    /// Directory for the run log
    #[arg(long, default_value = DEFAULT_LOG_DIR)]
    log_dir: PathBuf,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let started = Instant::now();

    let log_path = match init_logging(&args.log_dir, &SystemClock) {
        Ok(path) => path,
        Err(err) => {
            eprintln!("Failed to set up logging: {:#}", err);
            return ExitCode::FAILURE;
        }
    };
    info!("Logging to {}", log_path.display());

    let code = match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("Run aborted: {:#}", err);
            ExitCode::FAILURE
        }
    };

    info!("Run completed in {}", format_elapsed(started.elapsed()));
    code
}

fn run(args: &Args) -> Result<()> {
    info!("CSV path: {}", args.csv_path.display());
    info!("Preprocessed path: {}", args.preprocessed_path.display());
    info!("Metadata path: {}", args.meta_data_path.display());

    let config = ConfigLoader::new().load().context("Invalid configuration")?;
    let summary = config.get_summary();
    info!(
        "Window [{}, {}) s, {} Hz, band ({}, {}) Hz, lowpass {} Hz, min cycles {}",
        summary.time_window.0,
        summary.time_window.1,
        summary.sampling_rate_hz,
        summary.band_hz.0,
        summary.band_hz.1,
        summary.lowpass_cutoff_hz,
        summary.min_n_cycles
    );

    let reporter = Arc::new(TracingReporter);
    let plan = load_session_plan(&FileEngineLauncher, &args.meta_data_path, reporter.as_ref())
        .context("Failed to load session metadata")?;

    let pipeline = PipelineBuilder::new(config, RunPaths::new(&args.csv_path, &args.preprocessed_path))
        .reporter(reporter)
        .build();
    let summary = pipeline.run(&plan);

    info!(
        "{} region CSVs written, {} merged CSVs, {} of {} sessions skipped",
        summary.regions_written(),
        summary.merged_files().len(),
        summary.sessions_skipped(),
        summary.sessions.len()
    );
    Ok(())
}

/// File layer at DEBUG, console layer at INFO unless `RUST_LOG` says otherwise
fn init_logging(log_dir: &Path, clock: &dyn Clock) -> Result<PathBuf> {
    fs::create_dir_all(log_dir).with_context(|| format!("Cannot create {}", log_dir.display()))?;
    let log_path = log_dir.join(format!("{}_{}.log", LOG_FILE_PREFIX, format_timestamp(&clock.now())));
    let file = File::create(&log_path).with_context(|| format!("Cannot create {}", log_path.display()))?;

    let file_layer = fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .with_filter(LevelFilter::DEBUG);

    let console_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let console_layer = fmt::layer().with_target(false).with_filter(console_filter);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("A global subscriber is already installed")?;

    Ok(log_path)
}
