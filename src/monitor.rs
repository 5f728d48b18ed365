// Sleepwatch - Motion-based sleep state monitoring
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! SleepMonitor - main orchestrator for sleep state monitoring.
//!
//! One monitor owns one session: the sample window, breathing analyzer,
//! classifier, hysteresis gate and session tracker. [`SharedMonitor`] wraps
//! it in a single lock so readers on another thread always get a snapshot
//! taken from one tick.

use crate::breathing::BreathingAnalyzer;
use crate::classifier::{Classification, ClassifierInput, StateClassifier};
use crate::clock::{Clock, MonotonicClock};
use crate::config::MonitorConfig;
use crate::error::{Result, SleepError};
use crate::event::SleepEvent;
use crate::history::HistoryEntry;
use crate::hysteresis::{HysteresisGate, Transition};
use crate::quality::{QualityReport, QualityScorer};
use crate::session::{SessionMetrics, SleepSessionTracker};
use crate::snapshot::{
    MonitorSnapshot, SessionSnapshot, SleepReport, StatusParts, StatusSnapshot,
};
use crate::state::SleepState;
use crate::window::{DensityBands, MotionSample, SlidingWindowAggregator, WindowStats};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Result of one ingested sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    /// Confirmed state after the tick.
    pub state: SleepState,
    /// Raw candidate; `None` when the classifier held.
    pub raw: Option<SleepState>,
    /// Name of the deciding rule.
    pub rule: &'static str,
    /// Commit made by this tick, if any.
    pub transition: Option<Transition>,
}

/// Signal-to-state pipeline for one monitoring session.
pub struct SleepMonitor {
    config: MonitorConfig,
    clock: Arc<dyn Clock>,
    window: SlidingWindowAggregator,
    breathing: BreathingAnalyzer,
    classifier: StateClassifier,
    gate: HysteresisGate,
    tracker: SleepSessionTracker,
    scorer: QualityScorer,
    last_classification: Option<Classification>,
}

impl std::fmt::Debug for SleepMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SleepMonitor")
            .field("mode", &self.config.mode)
            .field("state", &self.gate.confirmed())
            .field("samples", &self.window.len())
            .field("session_id", &self.tracker.metrics().session_id)
            .finish()
    }
}

impl SleepMonitor {
    /// Create a monitor on the system monotonic clock.
    pub fn new(config: MonitorConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(MonotonicClock::new()))
    }

    /// Create a monitor on the given clock.
    ///
    /// Fails if the configuration is incoherent.
    pub fn with_clock(config: MonitorConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        log::info!(
            "Sleep monitor starting in {} mode",
            config.mode.as_str()
        );
        Ok(Self {
            window: SlidingWindowAggregator::new(config.windows.retention_ms),
            breathing: BreathingAnalyzer::new(
                config.breathing.clone(),
                config.thresholds.breath_peak,
            ),
            classifier: StateClassifier::new(
                config.thresholds.clone(),
                config.mode,
                config.windows.min_samples,
            ),
            gate: HysteresisGate::new(config.confirmation.clone()),
            tracker: SleepSessionTracker::new(clock.now_utc()),
            scorer: QualityScorer::new(config.quality.clone(), config.mode),
            last_classification: None,
            config,
            clock,
        })
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Confirmed state.
    pub fn state(&self) -> SleepState {
        self.gate.confirmed()
    }

    /// Classification of the latest tick.
    pub fn last_classification(&self) -> Option<Classification> {
        self.last_classification
    }

    pub fn metrics(&self) -> &SessionMetrics {
        self.tracker.metrics()
    }

    /// Ingest a score stamped with the monitor's clock.
    pub fn ingest(&mut self, motion_score: f64) -> Result<TickOutcome> {
        let sample = MotionSample::new(self.clock.now_ms(), motion_score);
        self.ingest_sample(sample)
    }

    /// Run one full tick for a timestamped sample.
    pub fn ingest_sample(&mut self, sample: MotionSample) -> Result<TickOutcome> {
        self.window.ingest(sample)?;
        let now_ms = sample.timestamp_ms;
        self.tracker.observe_sample(now_ms);

        self.breathing.process(sample);
        self.tracker.update_breathing(self.breathing.stats());

        let input = ClassifierInput {
            stats: self.window_stats(self.config.windows.classification_ms),
            spasm_stats: self.window_stats(self.config.windows.spasm_ms),
            retained_samples: self.window.len(),
            phase: self.breathing.phase(),
            confirmed: self.gate.confirmed(),
            sleep_tier: self.gate.sleep_tier(),
        };
        let classification = self.classifier.classify(&input);
        self.last_classification = Some(classification);

        let transition = self.gate.observe(classification.raw, now_ms);
        if let Some(transition) = &transition {
            self.tracker.record_transition(transition);
        }

        Ok(TickOutcome {
            state: self.gate.confirmed(),
            raw: classification.raw,
            rule: classification.rule,
            transition,
        })
    }

    /// Current-state record at the clock's time.
    pub fn status(&self) -> StatusSnapshot {
        self.status_at(self.now_ms())
    }

    pub fn status_at(&self, now_ms: u64) -> StatusSnapshot {
        StatusSnapshot::from_parts(StatusParts {
            now_ms,
            mode: self.config.mode,
            stats: self.window_stats(self.config.windows.classification_ms),
            last_motion_score: self.window.latest().map(|s| s.motion_score),
            pending: self.gate.pending(),
            metrics: self.tracker.metrics(),
        })
    }

    /// Session record at the clock's time.
    pub fn session(&self) -> SessionSnapshot {
        self.session_at(self.now_ms())
    }

    pub fn session_at(&self, now_ms: u64) -> SessionSnapshot {
        let quality = self.quality_at(now_ms);
        SessionSnapshot::new(self.tracker.metrics(), &quality, self.config.mode, now_ms)
    }

    /// Status and session taken at the same instant.
    pub fn snapshot(&self) -> MonitorSnapshot {
        let now_ms = self.now_ms();
        MonitorSnapshot::new(self.status_at(now_ms), self.session_at(now_ms))
    }

    pub fn quality(&self) -> QualityReport {
        self.quality_at(self.now_ms())
    }

    pub fn quality_at(&self, now_ms: u64) -> QualityReport {
        self.scorer.score_session(self.tracker.metrics(), now_ms)
    }

    /// Most recent events, newest first.
    pub fn recent_events(&self, count: usize) -> Vec<SleepEvent> {
        self.tracker.metrics().recent_events(count)
    }

    pub fn report(&self) -> SleepReport {
        self.report_at(self.now_ms())
    }

    pub fn report_at(&self, now_ms: u64) -> SleepReport {
        let quality = self.quality_at(now_ms);
        SleepReport::new(
            self.tracker.metrics(),
            &quality,
            self.config.mode,
            now_ms,
            self.clock.now_utc(),
        )
    }

    /// Discard the session and start a fresh one. Configuration is kept.
    pub fn reset(&mut self) {
        let previous = self.tracker.metrics().session_id;
        self.window.clear();
        self.breathing.reset();
        self.gate.reset();
        self.tracker = SleepSessionTracker::new(self.clock.now_utc());
        self.last_classification = None;
        log::info!(
            "Session {} reset; new session {}",
            previous,
            self.tracker.metrics().session_id
        );
    }

    /// End the session and start a fresh one.
    ///
    /// Returns a history entry when enough sleep was recorded.
    pub fn stop_session(&mut self) -> Option<HistoryEntry> {
        let now_ms = self.now_ms();
        self.tracker.close_accrual(now_ms);

        let metrics = self.tracker.metrics();
        let sleep_ms = metrics.total_sleep_ms(now_ms);
        log::info!(
            "Session {} stopped. Total sleep: {:.1}s",
            metrics.session_id,
            sleep_ms as f64 / 1000.0
        );
        let entry = if sleep_ms >= self.config.quality.min_sleep_ms {
            Some(HistoryEntry::new(
                metrics.started_at,
                sleep_ms,
                self.report_at(now_ms),
            ))
        } else {
            None
        };

        self.reset();
        entry
    }

    /// Read time: the clock, never earlier than the newest sample.
    fn now_ms(&self) -> u64 {
        let clock_ms = self.clock.now_ms();
        self.window
            .latest()
            .map_or(clock_ms, |s| clock_ms.max(s.timestamp_ms))
    }

    fn window_stats(&self, window_ms: u64) -> WindowStats {
        self.window.stats(
            window_ms,
            DensityBands {
                low: self.config.thresholds.no_motion,
                high: self.config.thresholds.awake,
            },
        )
    }
}

/// Thread-safe handle to a [`SleepMonitor`].
///
/// Ingestion takes the write lock for one full tick; every read takes the
/// read lock once and returns an owned copy.
#[derive(Debug, Clone)]
pub struct SharedMonitor {
    inner: Arc<RwLock<SleepMonitor>>,
}

impl SharedMonitor {
    pub fn new(monitor: SleepMonitor) -> Self {
        Self {
            inner: Arc::new(RwLock::new(monitor)),
        }
    }

    pub fn ingest(&self, motion_score: f64) -> Result<TickOutcome> {
        self.write()?.ingest(motion_score)
    }

    pub fn ingest_sample(&self, sample: MotionSample) -> Result<TickOutcome> {
        self.write()?.ingest_sample(sample)
    }

    pub fn state(&self) -> Result<SleepState> {
        Ok(self.read()?.state())
    }

    pub fn status(&self) -> Result<StatusSnapshot> {
        Ok(self.read()?.status())
    }

    pub fn session(&self) -> Result<SessionSnapshot> {
        Ok(self.read()?.session())
    }

    pub fn snapshot(&self) -> Result<MonitorSnapshot> {
        Ok(self.read()?.snapshot())
    }

    pub fn recent_events(&self, count: usize) -> Result<Vec<SleepEvent>> {
        Ok(self.read()?.recent_events(count))
    }

    pub fn report(&self) -> Result<SleepReport> {
        Ok(self.read()?.report())
    }

    pub fn reset(&self) -> Result<()> {
        self.write()?.reset();
        Ok(())
    }

    pub fn stop_session(&self) -> Result<Option<HistoryEntry>> {
        Ok(self.write()?.stop_session())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, SleepMonitor>> {
        self.inner.read().map_err(|_| SleepError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, SleepMonitor>> {
        self.inner.write().map_err(|_| SleepError::LockPoisoned)
    }
}
