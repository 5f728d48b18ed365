// Sleepwatch Replay - Recording replay engine
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Replays a recorded or synthetic motion stream through a shared monitor.
//!
//! The monitor runs on a [`ManualClock`] that follows the sample timestamps,
//! so a replay at any speed produces the same states and durations as the
//! live run would have.

use sleepwatch::{
    ConfigError, HistoryError, ManualClock, MonitorConfig, MotionSample, SharedMonitor,
    SleepError, SleepMonitor,
};
use sleepwatch_testdata::{DatasetError, MotionTrace, Scenario};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Samples fed between cooperative yields when replaying at full speed.
const YIELD_EVERY: usize = 256;

/// Configuration for a replay run.
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// Replay speed multiplier (1.0 = real-time, 0 = as fast as possible).
    pub speed: f64,
    /// Interval between status log lines, in wall-clock time.
    pub status_every: Duration,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            speed: 0.0,
            status_every: Duration::from_secs(10),
        }
    }
}

/// Progress of a replay, shared with the reporter task.
#[derive(Debug, Default)]
pub struct ReplayState {
    pub position: AtomicUsize,
    pub total_samples: AtomicUsize,
    pub transitions: AtomicUsize,
    pub running: AtomicBool,
}

impl ReplayState {
    pub fn progress_percent(&self) -> f64 {
        let total = self.total_samples.load(Ordering::SeqCst);
        if total == 0 {
            return 0.0;
        }
        self.position.load(Ordering::SeqCst) as f64 / total as f64 * 100.0
    }
}

/// Where the samples come from.
#[derive(Debug, Clone)]
pub enum ReplaySource {
    Csv(String),
    Scenario {
        scenario: Scenario,
        minutes: f64,
        seed: u64,
    },
}

/// Feeds samples into a [`SharedMonitor`].
pub struct ReplayEngine {
    config: ReplayConfig,
    state: Arc<ReplayState>,
    clock: ManualClock,
    monitor: SharedMonitor,
    samples: Vec<MotionSample>,
}

impl ReplayEngine {
    /// Load the source and build a monitor for it.
    pub fn new(
        source: &ReplaySource,
        monitor_config: MonitorConfig,
        config: ReplayConfig,
    ) -> Result<Self, ReplayError> {
        let samples = match source {
            ReplaySource::Csv(path) => parse_csv(Path::new(path))?,
            ReplaySource::Scenario {
                scenario,
                minutes,
                seed,
            } => {
                let trace = scenario.build(*minutes, *seed);
                info!("Generated scenario '{}' ({} min, seed {})", scenario, minutes, seed);
                trace_samples(&trace)
            }
        };
        if samples.is_empty() {
            return Err(ReplayError::EmptyDataset);
        }

        let clock = ManualClock::new();
        let monitor = SleepMonitor::with_clock(monitor_config, Arc::new(clock.clone()))?;

        let state = Arc::new(ReplayState::default());
        state.total_samples.store(samples.len(), Ordering::SeqCst);

        let span_ms = samples
            .last()
            .map(|s| s.timestamp_ms)
            .unwrap_or(0)
            .saturating_sub(samples[0].timestamp_ms);
        info!(
            "Loaded {} samples spanning {:.1} min",
            samples.len(),
            span_ms as f64 / 60_000.0
        );

        Ok(Self {
            config,
            state,
            clock,
            monitor: SharedMonitor::new(monitor),
            samples,
        })
    }

    pub fn state(&self) -> Arc<ReplayState> {
        Arc::clone(&self.state)
    }

    pub fn monitor(&self) -> SharedMonitor {
        self.monitor.clone()
    }

    /// Feed every sample, pacing by timestamp deltas divided by speed.
    pub async fn run(&self) -> Result<(), ReplayError> {
        self.state.running.store(true, Ordering::SeqCst);
        info!("Starting replay: speed={}", self.config.speed);

        let result = self.feed().await;

        self.state.running.store(false, Ordering::SeqCst);
        info!(
            "Replay complete: {} samples, {} transitions",
            self.state.position.load(Ordering::SeqCst),
            self.state.transitions.load(Ordering::SeqCst)
        );
        result
    }

    async fn feed(&self) -> Result<(), ReplayError> {
        for (position, sample) in self.samples.iter().enumerate() {
            self.clock.set_ms(sample.timestamp_ms);
            let outcome = self.monitor.ingest_sample(*sample)?;
            if let Some(transition) = outcome.transition {
                self.state.transitions.fetch_add(1, Ordering::SeqCst);
                debug!(
                    "Sample {} committed {} -> {} (rule {})",
                    position, transition.from, transition.to, outcome.rule
                );
            }
            self.state.position.store(position + 1, Ordering::SeqCst);

            if self.config.speed > 0.0 {
                let delta_ms = self
                    .samples
                    .get(position + 1)
                    .map_or(0, |next| next.timestamp_ms.saturating_sub(sample.timestamp_ms));
                let wait_ms = (delta_ms as f64 / self.config.speed) as u64;
                if wait_ms > 0 {
                    sleep(Duration::from_millis(wait_ms)).await;
                }
            } else if position % YIELD_EVERY == 0 {
                tokio::task::yield_now().await;
            }
        }
        Ok(())
    }

    /// Log a status line every `status_every`. Runs until aborted or the
    /// monitor becomes unreadable.
    pub async fn report_status(&self) {
        let mut ticker = tokio::time::interval(self.config.status_every);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if !self.state.running.load(Ordering::SeqCst) {
                continue;
            }
            match self.monitor.status() {
                Ok(status) => info!(
                    "[{:5.1}%] {} for {:.0}s, mean {:.0}, rate {}",
                    self.state.progress_percent(),
                    status.current_state,
                    status.state_duration_seconds,
                    status.motion_mean,
                    status
                        .breathing_rate_bpm
                        .map_or_else(|| "-".to_string(), |r| format!("{:.1} bpm", r))
                ),
                Err(e) => {
                    warn!("Status unavailable: {}", e);
                    break;
                }
            }
        }
    }
}

/// Read `timestamp_ms,motion_score` rows.
///
/// Column order is free and extra columns are ignored. Rows with an empty
/// score are skipped.
pub fn parse_csv(path: &Path) -> Result<Vec<MotionSample>, ReplayError> {
    if !path.exists() {
        return Err(ReplayError::FileNotFound(path.display().to_string()));
    }
    let mut reader = csv::Reader::from_path(path)?;

    let headers = reader.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| ReplayError::InvalidFormat(format!("Missing column '{}'", name)))
    };
    let ts_col = column("timestamp_ms")?;
    let score_col = column("motion_score")?;

    let mut samples = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let record = result?;
        let line = index + 2;

        let timestamp_ms: u64 = record
            .get(ts_col)
            .map(str::trim)
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| ReplayError::InvalidFormat(format!("Invalid timestamp at line {}", line)))?;

        let score = record.get(score_col).map(str::trim).unwrap_or("");
        if score.is_empty() {
            continue;
        }
        let motion_score: f64 = score.parse().map_err(|_| {
            ReplayError::InvalidFormat(format!("Invalid motion score at line {}", line))
        })?;

        samples.push(MotionSample::new(timestamp_ms, motion_score));
    }

    Ok(samples)
}

fn trace_samples(trace: &MotionTrace) -> Vec<MotionSample> {
    trace
        .rows
        .iter()
        .map(|r| MotionSample::new(r.timestamp_ms, r.motion_score))
        .collect()
}

/// Replay errors.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Empty dataset")]
    EmptyDataset,

    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Monitor error: {0}")]
    Monitor(#[from] SleepError),

    #[error("History error: {0}")]
    History(#[from] HistoryError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
