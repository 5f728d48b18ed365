// Sleepwatch Replay - Motion recording replay tool
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # Sleepwatch Replay
//!
//! Replays a motion-score recording (or a synthetic scenario) through the
//! monitor and prints the final sleep report as JSON.
//!
//! ## Usage
//!
//! ```bash
//! # Replay a CSV recording as fast as possible
//! sleepwatch-replay --csv night.csv
//!
//! # Synthetic night at 60x, single-tier states, saved to history
//! sleepwatch-replay --scenario night --minutes 90 --speed 60 \
//!     --mode single-tier --history sleep_history.json
//! ```

mod replay;

use clap::{Parser, ValueEnum};
use replay::{ReplayConfig, ReplayEngine, ReplayError, ReplaySource};
use sleepwatch::{MonitorConfig, SessionHistory, StateMode};
use sleepwatch_testdata::Scenario;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

/// State set selection on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    TwoTier,
    SingleTier,
}

impl From<ModeArg> for StateMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::TwoTier => StateMode::TwoTier,
            ModeArg::SingleTier => StateMode::SingleTier,
        }
    }
}

/// Sleepwatch recording replay
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// CSV file with timestamp_ms,motion_score rows
    #[arg(short, long, conflicts_with = "scenario")]
    csv: Option<String>,

    /// Synthetic scenario (calm_sleep, active_sleep, apnea, wake_up, spasms, night)
    #[arg(long)]
    scenario: Option<String>,

    /// Scenario length in minutes
    #[arg(long, default_value = "30")]
    minutes: f64,

    /// Scenario random seed
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Replay speed multiplier (1.0 = real-time, 0 = as fast as possible)
    #[arg(short, long, default_value = "0")]
    speed: f64,

    /// State mode (overrides the config file)
    #[arg(short, long, value_enum)]
    mode: Option<ModeArg>,

    /// JSON monitor configuration
    #[arg(long)]
    config: Option<String>,

    /// Seconds between status log lines
    #[arg(long, default_value = "10")]
    status_every: u64,

    /// Append the finished session to this history file
    #[arg(long)]
    history: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match args.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };
        EnvFilter::from_default_env().add_directive(level.into())
    });

    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Sleepwatch Replay v{}", env!("CARGO_PKG_VERSION"));

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Replay failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), ReplayError> {
    let source = match (args.csv, args.scenario) {
        (Some(path), _) => ReplaySource::Csv(path),
        (None, Some(name)) => ReplaySource::Scenario {
            scenario: name.parse::<Scenario>()?,
            minutes: args.minutes,
            seed: args.seed,
        },
        (None, None) => {
            info!("No input given, replaying the 'night' scenario");
            ReplaySource::Scenario {
                scenario: Scenario::Night,
                minutes: args.minutes,
                seed: args.seed,
            }
        }
    };

    let mut monitor_config = match &args.config {
        Some(path) => MonitorConfig::from_json_file(path)?,
        None => MonitorConfig::default(),
    };
    if let Some(mode) = args.mode {
        monitor_config.mode = mode.into();
    }
    info!("Mode: {}", monitor_config.mode.as_str());

    let replay_config = ReplayConfig {
        speed: args.speed.max(0.0),
        status_every: Duration::from_secs(args.status_every.max(1)),
    };
    let engine = Arc::new(ReplayEngine::new(&source, monitor_config, replay_config)?);
    let monitor = engine.monitor();

    let reporter = tokio::spawn({
        let engine = Arc::clone(&engine);
        async move { engine.report_status().await }
    });
    let fed = tokio::spawn({
        let engine = Arc::clone(&engine);
        async move { engine.run().await }
    })
    .await?;
    reporter.abort();
    fed?;

    let report = monitor.report()?;
    println!("{}", report.to_json_pretty()?);

    if let Some(path) = args.history {
        match monitor.stop_session()? {
            Some(entry) => {
                let history = SessionHistory::new(path);
                history.append(entry)?;
                info!("Session saved to {}", history.path().display());
            }
            None => warn!("Not enough sleep recorded; session not saved"),
        }
    }

    Ok(())
}
