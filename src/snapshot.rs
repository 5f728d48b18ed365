// Sleepwatch - Motion-based sleep state monitoring
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Read-only records handed to external consumers.
//!
//! Every record is a fully formed copy. Undefined figures (no breathing
//! rhythm yet, no completed cycle) are `null` in JSON, never NaN.

use crate::breathing::SleepPhase;
use crate::hysteresis::PendingTransition;
use crate::quality::{QualityRating, QualityReport};
use crate::session::SessionMetrics;
use crate::state::{SleepState, StateMode};
use crate::window::WindowStats;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Version of the snapshot format.
pub const SNAPSHOT_VERSION: &str = "0.1.0";

/// Breathing rate below this is reported as slow.
pub const SLOW_BREATHING_BPM: f64 = 25.0;
/// Breathing rate above this is reported as fast.
pub const FAST_BREATHING_BPM: f64 = 60.0;

/// Candidate state awaiting confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PendingSnapshot {
    pub target: SleepState,
    pub elapsed_seconds: f64,
}

impl PendingSnapshot {
    pub fn from_pending(pending: &PendingTransition, now_ms: u64) -> Self {
        Self {
            target: pending.target,
            elapsed_seconds: pending.elapsed_ms(now_ms) as f64 / 1000.0,
        }
    }
}

/// Current-state record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub timestamp_ms: u64,
    pub mode: StateMode,
    pub current_state: SleepState,
    /// True while the confirmed state is in the sleep family.
    pub breathing_detected: bool,
    pub state_duration_seconds: f64,
    pub motion_mean: f64,
    pub motion_std: f64,
    pub last_motion_score: f64,
    pub sample_count: usize,
    pub breathing_rate_bpm: Option<f64>,
    pub breathing_variability: Option<f64>,
    pub breathing_phase: SleepPhase,
    pub pending_transition: Option<PendingSnapshot>,
}

/// Inputs for a [`StatusSnapshot`], gathered under one lock.
#[derive(Debug, Clone, Copy)]
pub struct StatusParts<'a> {
    pub now_ms: u64,
    pub mode: StateMode,
    pub stats: WindowStats,
    pub last_motion_score: Option<f64>,
    pub pending: Option<&'a PendingTransition>,
    pub metrics: &'a SessionMetrics,
}

impl StatusSnapshot {
    pub fn from_parts(parts: StatusParts<'_>) -> Self {
        let metrics = parts.metrics;
        let state = metrics.current_state;
        Self {
            timestamp_ms: parts.now_ms,
            mode: parts.mode,
            current_state: state,
            breathing_detected: state.is_sleep_family(),
            state_duration_seconds: metrics.time_in_state_ms(parts.now_ms) as f64 / 1000.0,
            motion_mean: parts.stats.mean,
            motion_std: parts.stats.std,
            last_motion_score: parts.last_motion_score.unwrap_or(0.0),
            sample_count: parts.stats.sample_count,
            breathing_rate_bpm: metrics.breathing.rate_bpm,
            breathing_variability: metrics.breathing.variability,
            breathing_phase: metrics.breathing.phase,
            pending_transition: parts
                .pending
                .map(|p| PendingSnapshot::from_pending(p, parts.now_ms)),
        }
    }
}

/// Session-level record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub mode: StateMode,
    pub session_duration_seconds: u64,
    pub total_sleep_minutes: u64,
    /// Two-tier only.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub deep_sleep_minutes: Option<u64>,
    /// Two-tier only.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub light_sleep_minutes: Option<u64>,
    pub awake_minutes: u64,
    pub no_breathing_seconds: u64,
    pub wake_ups: u32,
    pub spasms: u32,
    pub sleep_cycles: u32,
    pub sleep_quality_score: u8,
    pub rating: QualityRating,
    pub events_count: usize,
}

impl SessionSnapshot {
    pub fn new(
        metrics: &SessionMetrics,
        quality: &QualityReport,
        mode: StateMode,
        now_ms: u64,
    ) -> Self {
        let durations = metrics.durations_at(now_ms);
        let two_tier = |ms: u64| match mode {
            StateMode::TwoTier => Some(ms / 60_000),
            StateMode::SingleTier => None,
        };
        Self {
            session_id: metrics.session_id,
            started_at: metrics.started_at,
            mode,
            session_duration_seconds: metrics.elapsed_ms(now_ms) / 1000,
            total_sleep_minutes: durations.sleep_ms() / 60_000,
            deep_sleep_minutes: two_tier(durations.deep_sleep_ms),
            light_sleep_minutes: two_tier(durations.light_sleep_ms),
            awake_minutes: durations.awake_ms / 60_000,
            no_breathing_seconds: durations.no_breathing_ms / 1000,
            wake_ups: metrics.wake_ups,
            spasms: metrics.spasms,
            sleep_cycles: metrics.sleep_cycles,
            sleep_quality_score: quality.score,
            rating: quality.rating,
            events_count: metrics.events.len(),
        }
    }
}

/// Status and session read together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorSnapshot {
    /// Format version.
    pub version: String,
    pub status: StatusSnapshot,
    pub session: SessionSnapshot,
}

impl MonitorSnapshot {
    pub fn new(status: StatusSnapshot, session: SessionSnapshot) -> Self {
        Self {
            version: SNAPSHOT_VERSION.to_string(),
            status,
            session,
        }
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty JSON.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Breathing rate interpretation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreathingStatus {
    Slow,
    Normal,
    Fast,
    Unknown,
}

impl BreathingStatus {
    pub fn from_rate(rate_bpm: Option<f64>) -> Self {
        match rate_bpm {
            None => BreathingStatus::Unknown,
            Some(bpm) if bpm < SLOW_BREATHING_BPM => BreathingStatus::Slow,
            Some(bpm) if bpm > FAST_BREATHING_BPM => BreathingStatus::Fast,
            Some(_) => BreathingStatus::Normal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Total sleep as `"{h}h {m}m"`.
    pub total_sleep: String,
    pub quality_score: u8,
    pub quality_rating: QualityRating,
    pub sufficient_data: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepBreakdown {
    pub deep_sleep_minutes: u64,
    pub deep_sleep_percent: u32,
    pub light_sleep_minutes: u64,
    pub light_sleep_percent: u32,
    pub description: String,
}

impl SleepBreakdown {
    fn new(deep_ms: u64, light_ms: u64, sleep_ms: u64) -> Self {
        let percent = |ms: u64| (ms as f64 / sleep_ms.max(1) as f64 * 100.0).floor() as u32;
        let deep_sleep_percent = percent(deep_ms);
        Self {
            deep_sleep_minutes: deep_ms / 60_000,
            deep_sleep_percent,
            light_sleep_minutes: light_ms / 60_000,
            light_sleep_percent: percent(light_ms),
            description: describe_breakdown(deep_sleep_percent).to_string(),
        }
    }
}

fn describe_breakdown(deep_percent: u32) -> &'static str {
    match deep_percent {
        40.. => "Good balance of deep and light sleep.",
        25..=39 => "Normal pattern, cycling between sleep phases.",
        10..=24 => "Mostly light/REM sleep.",
        _ => "Very little deep sleep detected.",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventsSummary {
    pub wake_ups: u32,
    pub spasms: u32,
    pub sleep_cycles: u32,
    pub average_cycle_minutes: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreathingSummary {
    pub average_rate_bpm: Option<f64>,
    pub status: BreathingStatus,
    /// Coefficient of variation as a percentage.
    pub variability_percent: Option<f64>,
    pub current_phase: SleepPhase,
}

/// End-of-session summary report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepReport {
    pub session_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub summary: ReportSummary,
    /// Two-tier only.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub breakdown: Option<SleepBreakdown>,
    pub events: EventsSummary,
    pub breathing: BreathingSummary,
    pub session: SessionSnapshot,
}

impl SleepReport {
    pub fn new(
        metrics: &SessionMetrics,
        quality: &QualityReport,
        mode: StateMode,
        now_ms: u64,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let durations = metrics.durations_at(now_ms);
        let sleep_ms = durations.sleep_ms();
        let breathing = &metrics.breathing;

        Self {
            session_id: metrics.session_id,
            generated_at,
            summary: ReportSummary {
                total_sleep: format_duration(sleep_ms),
                quality_score: quality.score,
                quality_rating: quality.rating,
                sufficient_data: quality.sufficient_data,
            },
            breakdown: match mode {
                StateMode::TwoTier => Some(SleepBreakdown::new(
                    durations.deep_sleep_ms,
                    durations.light_sleep_ms,
                    sleep_ms,
                )),
                StateMode::SingleTier => None,
            },
            events: EventsSummary {
                wake_ups: metrics.wake_ups,
                spasms: metrics.spasms,
                sleep_cycles: metrics.sleep_cycles,
                average_cycle_minutes: metrics
                    .average_cycle_minutes()
                    .map(|m| (m * 10.0).round() / 10.0),
            },
            breathing: BreathingSummary {
                average_rate_bpm: breathing.rate_bpm,
                status: BreathingStatus::from_rate(breathing.rate_bpm),
                variability_percent: breathing
                    .variability
                    .map(|cv| (cv * 1000.0).round() / 10.0),
                current_phase: breathing.phase,
            },
            session: SessionSnapshot::new(metrics, quality, mode, now_ms),
        }
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty JSON.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Whole minutes as `"{h}h {m}m"`.
pub fn format_duration(ms: u64) -> String {
    let minutes = ms / 60_000;
    format!("{}h {}m", minutes / 60, minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QualityConfig;
    use crate::hysteresis::Transition;
    use crate::quality::QualityScorer;
    use crate::session::SleepSessionTracker;

    const MINUTE: u64 = 60_000;

    fn sample_session() -> SleepSessionTracker {
        let mut tracker = SleepSessionTracker::new(Utc::now());
        tracker.observe_sample(0);
        for (from, to, at_ms) in [
            (SleepState::Unknown, SleepState::Awake, 1_000),
            (SleepState::Awake, SleepState::DeepSleep, 5 * MINUTE),
            (SleepState::DeepSleep, SleepState::LightSleep, 50 * MINUTE),
            (SleepState::LightSleep, SleepState::DeepSleep, 80 * MINUTE),
        ] {
            tracker.record_transition(&Transition {
                from,
                to,
                at_ms,
                pending_ms: 0,
            });
        }
        tracker
    }

    fn quality(metrics: &SessionMetrics, now_ms: u64) -> QualityReport {
        QualityScorer::new(QualityConfig::default(), StateMode::TwoTier)
            .score_session(metrics, now_ms)
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0h 0m");
        assert_eq!(format_duration(95 * MINUTE + 59_000), "1h 35m");
    }

    #[test]
    fn test_breathing_status() {
        assert_eq!(BreathingStatus::from_rate(None), BreathingStatus::Unknown);
        assert_eq!(BreathingStatus::from_rate(Some(20.0)), BreathingStatus::Slow);
        assert_eq!(BreathingStatus::from_rate(Some(30.0)), BreathingStatus::Normal);
        assert_eq!(BreathingStatus::from_rate(Some(61.0)), BreathingStatus::Fast);
    }

    #[test]
    fn test_session_snapshot() {
        let tracker = sample_session();
        let now = 100 * MINUTE;
        let q = quality(tracker.metrics(), now);
        let snapshot = SessionSnapshot::new(tracker.metrics(), &q, StateMode::TwoTier, now);

        assert_eq!(snapshot.session_duration_seconds, 6000);
        assert_eq!(snapshot.total_sleep_minutes, 95);
        assert_eq!(snapshot.deep_sleep_minutes, Some(65));
        assert_eq!(snapshot.light_sleep_minutes, Some(30));
        assert_eq!(snapshot.sleep_cycles, 1);
        assert_eq!(snapshot.events_count, 4);
    }

    #[test]
    fn test_single_tier_omits_phases() {
        let tracker = sample_session();
        let q = quality(tracker.metrics(), MINUTE);
        let snapshot = SessionSnapshot::new(tracker.metrics(), &q, StateMode::SingleTier, MINUTE);
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(!json.contains("deep_sleep_minutes"));
    }

    #[test]
    fn test_report_contents() {
        let tracker = sample_session();
        let now = 100 * MINUTE;
        let q = quality(tracker.metrics(), now);
        let report = SleepReport::new(tracker.metrics(), &q, StateMode::TwoTier, now, Utc::now());

        assert_eq!(report.summary.total_sleep, "1h 35m");
        let breakdown = report.breakdown.as_ref().unwrap();
        assert_eq!(breakdown.deep_sleep_percent, 68);
        assert_eq!(breakdown.light_sleep_percent, 31);
        assert_eq!(report.events.average_cycle_minutes, Some(75.0));
        assert_eq!(report.breathing.status, BreathingStatus::Unknown);
        assert!(report.breathing.variability_percent.is_none());
    }

    #[test]
    fn test_report_json_roundtrip() {
        let tracker = sample_session();
        let now = 100 * MINUTE;
        let q = quality(tracker.metrics(), now);
        let report = SleepReport::new(tracker.metrics(), &q, StateMode::TwoTier, now, Utc::now());

        let json = report.to_json_pretty().unwrap();
        let parsed = SleepReport::from_json(&json).unwrap();
        assert_eq!(report, parsed);
        assert!(!json.contains("NaN"));
    }
}
