// Sleepwatch - Motion-based sleep state monitoring
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Sleep event types and definitions.

use crate::state::SleepState;
use serde::{Deserialize, Serialize};

/// Type of sleep event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SleepEventKind {
    /// Entered the sleep family from AWAKE or UNKNOWN.
    FellAsleep,
    /// Left the sleep family for AWAKE.
    WokeUp,
    /// Confirmed spasm.
    Spasm,
    /// DEEP_SLEEP and LIGHT_SLEEP swapped.
    PhaseChange,
    /// Confirmed NO_BREATHING.
    NoBreathingAlert,
    /// Any other confirmed change.
    StateChange,
}

impl SleepEventKind {
    /// Kind of event a committed transition produces.
    pub fn for_transition(from: SleepState, to: SleepState) -> Self {
        match (from, to) {
            (_, SleepState::NoBreathing) => SleepEventKind::NoBreathingAlert,
            (_, SleepState::Spasm) => SleepEventKind::Spasm,
            (from, SleepState::Awake) if from.is_sleep_family() => SleepEventKind::WokeUp,
            (SleepState::Awake | SleepState::Unknown, to) if to.is_sleep_family() => {
                SleepEventKind::FellAsleep
            }
            (SleepState::DeepSleep, SleepState::LightSleep)
            | (SleepState::LightSleep, SleepState::DeepSleep) => SleepEventKind::PhaseChange,
            _ => SleepEventKind::StateChange,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SleepEventKind::FellAsleep => "fell_asleep",
            SleepEventKind::WokeUp => "woke_up",
            SleepEventKind::Spasm => "spasm",
            SleepEventKind::PhaseChange => "phase_change",
            SleepEventKind::NoBreathingAlert => "no_breathing_alert",
            SleepEventKind::StateChange => "state_change",
        }
    }
}

/// Severity level of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventSeverity {
    Info,
    Warning,
    Critical,
}

impl EventSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventSeverity::Info => "INFO",
            EventSeverity::Warning => "WARN",
            EventSeverity::Critical => "CRIT",
        }
    }
}

/// Additional details for specific event kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventDetails {
    /// Length of the sleep stretch that just ended.
    SleepStretch { sleep_seconds: f64 },
    /// Sleep cycle closed by this change.
    CycleCompleted { cycle_minutes: f64 },
    /// No additional details.
    None,
}

/// An append-only session event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepEvent {
    /// Event kind.
    pub kind: SleepEventKind,
    /// Severity level.
    pub severity: EventSeverity,
    /// Commit time (ms, monotonic).
    pub timestamp_ms: u64,
    /// Confirmed state before the change.
    pub from: SleepState,
    /// Confirmed state after the change.
    pub to: SleepState,
    /// Human-readable message.
    pub message: String,
    /// Additional details.
    pub details: EventDetails,
}

impl SleepEvent {
    /// Create a new event.
    pub fn new(
        kind: SleepEventKind,
        severity: EventSeverity,
        timestamp_ms: u64,
        from: SleepState,
        to: SleepState,
        message: impl Into<String>,
        details: EventDetails,
    ) -> Self {
        Self {
            kind,
            severity,
            timestamp_ms,
            from,
            to,
            message: message.into(),
            details,
        }
    }

    /// Create a fell-asleep event.
    pub fn fell_asleep(timestamp_ms: u64, from: SleepState, to: SleepState) -> Self {
        Self::new(
            SleepEventKind::FellAsleep,
            EventSeverity::Info,
            timestamp_ms,
            from,
            to,
            format!("Fell asleep ({})", to),
            EventDetails::None,
        )
    }

    /// Create a woke-up event carrying the sleep stretch length.
    pub fn woke_up(timestamp_ms: u64, from: SleepState, sleep_seconds: f64) -> Self {
        Self::new(
            SleepEventKind::WokeUp,
            EventSeverity::Info,
            timestamp_ms,
            from,
            SleepState::Awake,
            format!("Woke up after {:.0}s of sleep", sleep_seconds),
            EventDetails::SleepStretch { sleep_seconds },
        )
    }

    /// Create a spasm event.
    pub fn spasm(timestamp_ms: u64, from: SleepState) -> Self {
        Self::new(
            SleepEventKind::Spasm,
            EventSeverity::Warning,
            timestamp_ms,
            from,
            SleepState::Spasm,
            format!("Spasm during {}", from),
            EventDetails::None,
        )
    }

    /// Create a phase change event.
    pub fn phase_change(
        timestamp_ms: u64,
        from: SleepState,
        to: SleepState,
        cycle_minutes: Option<f64>,
    ) -> Self {
        let details = match cycle_minutes {
            Some(cycle_minutes) => EventDetails::CycleCompleted { cycle_minutes },
            None => EventDetails::None,
        };
        Self::new(
            SleepEventKind::PhaseChange,
            EventSeverity::Info,
            timestamp_ms,
            from,
            to,
            format!("Sleep phase changed: {} -> {}", from, to),
            details,
        )
    }

    /// Create a no-breathing alert.
    pub fn no_breathing_alert(timestamp_ms: u64, from: SleepState) -> Self {
        Self::new(
            SleepEventKind::NoBreathingAlert,
            EventSeverity::Critical,
            timestamp_ms,
            from,
            SleepState::NoBreathing,
            "No breathing motion detected",
            EventDetails::None,
        )
    }

    /// Create a generic state change event.
    pub fn state_change(timestamp_ms: u64, from: SleepState, to: SleepState) -> Self {
        Self::new(
            SleepEventKind::StateChange,
            EventSeverity::Info,
            timestamp_ms,
            from,
            to,
            format!("State changed: {} -> {}", from, to),
            EventDetails::None,
        )
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty JSON.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
