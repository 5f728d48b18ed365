// Sleepwatch - Motion-based sleep state monitoring
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Synthetic scenarios replayed through the monitor
//!
//! Traces come from `sleepwatch-testdata` with fixed seeds, so every run sees
//! the same samples.

use sleepwatch::{
    EventSeverity, ManualClock, MonitorConfig, MotionSample, SleepEventKind, SleepMonitor,
    SleepState, StateMode,
};
use sleepwatch_testdata::{MotionTrace, Scenario};
use std::sync::Arc;

const SEED: u64 = 42;

/// Replay `trace` and return the monitor plus the confirmed state per sample.
fn replay(trace: &MotionTrace, mode: StateMode) -> (SleepMonitor, Vec<(u64, SleepState)>) {
    let clock = ManualClock::new();
    let mut monitor =
        SleepMonitor::with_clock(MonitorConfig::with_mode(mode), Arc::new(clock.clone())).unwrap();

    let mut states = Vec::with_capacity(trace.len());
    for row in &trace.rows {
        clock.set_ms(row.timestamp_ms);
        let outcome = monitor
            .ingest_sample(MotionSample::new(row.timestamp_ms, row.motion_score))
            .unwrap();
        states.push((row.timestamp_ms, outcome.state));
    }
    (monitor, states)
}

fn count_kind(monitor: &SleepMonitor, kind: SleepEventKind) -> usize {
    monitor
        .metrics()
        .events
        .iter()
        .filter(|e| e.kind == kind)
        .count()
}

#[test]
fn test_calm_sleep_settles_deep() {
    let trace = Scenario::CalmSleep.build(5.0, SEED);
    let (monitor, states) = replay(&trace, StateMode::TwoTier);

    assert_eq!(monitor.state(), SleepState::DeepSleep);
    assert!(states.iter().skip(3).all(|(_, s)| s.is_sleep_family()));

    let status = monitor.status();
    let rate = status.breathing_rate_bpm.unwrap();
    assert!((25.0..=35.0).contains(&rate), "rate {}", rate);
    assert!(status.breathing_variability.unwrap() < 0.15);
    assert_eq!(monitor.metrics().wake_ups, 0);
}

#[test]
fn test_active_sleep_stays_light() {
    let trace = Scenario::ActiveSleep.build(5.0, SEED);
    let (monitor, states) = replay(&trace, StateMode::TwoTier);

    assert_eq!(monitor.state(), SleepState::LightSleep);
    assert!(states.iter().all(|(_, s)| *s != SleepState::DeepSleep));
    assert!(monitor.status().breathing_variability.unwrap() > 0.30);
}

#[test]
fn test_apnea_raises_alert_inside_still_stretch() {
    let trace = Scenario::Apnea.build(5.0, SEED);
    let still = trace.metadata.segments[1].clone();
    assert_eq!(still.label, "no_breathing");

    let (monitor, states) = replay(&trace, StateMode::TwoTier);

    let alerts: Vec<_> = monitor
        .metrics()
        .events
        .iter()
        .filter(|e| e.kind == SleepEventKind::NoBreathingAlert)
        .collect();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].severity, EventSeverity::Critical);
    // Never sooner than the 12 s confirmation after stillness begins.
    assert!(alerts[0].timestamp_ms >= still.start_ms + 12_000);
    assert!(alerts[0].timestamp_ms < still.end_ms);

    let (_, last) = states.last().copied().unwrap();
    assert!(last.is_sleep_family());
}

#[test]
fn test_wake_up_counted_once() {
    let trace = Scenario::WakeUp.build(6.0, SEED);
    let (monitor, _) = replay(&trace, StateMode::TwoTier);

    assert_eq!(monitor.metrics().wake_ups, 1);
    assert_eq!(count_kind(&monitor, SleepEventKind::WokeUp), 1);
    assert!(monitor.state().is_sleep_family());

    let durations = monitor.metrics().durations_at(trace.rows.last().unwrap().timestamp_ms);
    // Two minutes awake, give or take the confirmation delays.
    assert!(durations.awake_ms > 90_000 && durations.awake_ms < 150_000);
}

#[test]
fn test_isolated_jerks_are_spasms() {
    let trace = Scenario::Spasms.build(5.0, SEED);
    let (monitor, _) = replay(&trace, StateMode::TwoTier);

    // The fifth jerk sits on the last samples and is still pending.
    assert_eq!(monitor.metrics().spasms, 4);
    assert_eq!(count_kind(&monitor, SleepEventKind::Spasm), 4);
    assert_eq!(monitor.metrics().wake_ups, 0);
}

#[test]
fn test_single_tier_night_never_splits_phases() {
    let trace = Scenario::Night.build(10.0, SEED);
    let (monitor, states) = replay(&trace, StateMode::SingleTier);

    assert!(states
        .iter()
        .all(|(_, s)| !matches!(s, SleepState::DeepSleep | SleepState::LightSleep)));
    assert_eq!(monitor.state(), SleepState::Sleeping);
    assert!(monitor.metrics().wake_ups >= 1);

    let report = monitor.report();
    assert!(report.breakdown.is_none());
    assert!(report.session.deep_sleep_minutes.is_none());
}

#[test]
fn test_two_tier_night() {
    let trace = Scenario::Night.build(10.0, SEED);
    let (monitor, _) = replay(&trace, StateMode::TwoTier);
    let metrics = monitor.metrics();

    assert!(metrics.wake_ups >= 1);
    assert!(metrics.spasms >= 1);
    assert!(count_kind(&monitor, SleepEventKind::PhaseChange) >= 1);
    assert!(count_kind(&monitor, SleepEventKind::FellAsleep) >= 2);

    let now = trace.rows.last().unwrap().timestamp_ms;
    let durations = metrics.durations_at(now);
    assert_eq!(durations.total_ms(), metrics.elapsed_ms(now));
    assert!(durations.deep_sleep_ms > 0 && durations.light_sleep_ms > 0);

    let report = monitor.report();
    assert!(report.breakdown.is_some());
    assert!(report.summary.sufficient_data);
}
