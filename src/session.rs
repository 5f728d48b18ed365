// Sleepwatch - Motion-based sleep state monitoring
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Session metric accumulation.
//!
//! The tracker is driven only by committed transitions. Each commit closes
//! the duration accrual of the previous state, opens one for the new state
//! and appends exactly one [`SleepEvent`]. The open accrual is folded in on
//! read, so per-state durations always sum to the session's elapsed time.

use crate::breathing::BreathingStats;
use crate::event::{SleepEvent, SleepEventKind};
use crate::hysteresis::Transition;
use crate::state::SleepState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Time spent in each state (ms).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDurations {
    pub unknown_ms: u64,
    pub no_breathing_ms: u64,
    pub deep_sleep_ms: u64,
    pub light_sleep_ms: u64,
    pub sleeping_ms: u64,
    pub spasm_ms: u64,
    pub awake_ms: u64,
}

impl StateDurations {
    pub fn get(&self, state: SleepState) -> u64 {
        match state {
            SleepState::Unknown => self.unknown_ms,
            SleepState::NoBreathing => self.no_breathing_ms,
            SleepState::DeepSleep => self.deep_sleep_ms,
            SleepState::LightSleep => self.light_sleep_ms,
            SleepState::Sleeping => self.sleeping_ms,
            SleepState::Spasm => self.spasm_ms,
            SleepState::Awake => self.awake_ms,
        }
    }

    pub fn add(&mut self, state: SleepState, ms: u64) {
        let slot = match state {
            SleepState::Unknown => &mut self.unknown_ms,
            SleepState::NoBreathing => &mut self.no_breathing_ms,
            SleepState::DeepSleep => &mut self.deep_sleep_ms,
            SleepState::LightSleep => &mut self.light_sleep_ms,
            SleepState::Sleeping => &mut self.sleeping_ms,
            SleepState::Spasm => &mut self.spasm_ms,
            SleepState::Awake => &mut self.awake_ms,
        };
        *slot += ms;
    }

    /// Sum over all states.
    pub fn total_ms(&self) -> u64 {
        SleepState::ALL.iter().map(|&s| self.get(s)).sum()
    }

    /// DEEP + LIGHT + SLEEPING + SPASM.
    pub fn sleep_ms(&self) -> u64 {
        SleepState::ALL
            .iter()
            .filter(|s| s.is_asleep())
            .map(|&s| self.get(s))
            .sum()
    }
}

/// Accumulated metrics for one monitoring session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMetrics {
    pub session_id: Uuid,
    /// Wall-clock session start.
    pub started_at: DateTime<Utc>,
    /// Monotonic start: the first ingested sample.
    pub start_ms: Option<u64>,
    /// Confirmed state whose accrual is open.
    pub current_state: SleepState,
    pub state_entered_ms: Option<u64>,
    /// Closed accruals only; see [`SessionMetrics::durations_at`].
    pub durations: StateDurations,
    pub wake_ups: u32,
    pub spasms: u32,
    pub sleep_cycles: u32,
    pub cycle_durations_ms: Vec<u64>,
    /// Latest breathing figures.
    pub breathing: BreathingStats,
    pub events: Vec<SleepEvent>,
}

impl SessionMetrics {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            started_at,
            start_ms: None,
            current_state: SleepState::Unknown,
            state_entered_ms: None,
            durations: StateDurations::default(),
            wake_ups: 0,
            spasms: 0,
            sleep_cycles: 0,
            cycle_durations_ms: Vec::new(),
            breathing: BreathingStats::default(),
            events: Vec::new(),
        }
    }

    /// Elapsed session time at `now_ms`.
    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        self.start_ms.map_or(0, |start| now_ms.saturating_sub(start))
    }

    /// Time spent in the current state at `now_ms`.
    pub fn time_in_state_ms(&self, now_ms: u64) -> u64 {
        self.state_entered_ms
            .map_or(0, |entered| now_ms.saturating_sub(entered))
    }

    /// Per-state durations including the open accrual.
    pub fn durations_at(&self, now_ms: u64) -> StateDurations {
        let mut durations = self.durations;
        durations.add(self.current_state, self.time_in_state_ms(now_ms));
        durations
    }

    /// Total sleep at `now_ms`.
    pub fn total_sleep_ms(&self, now_ms: u64) -> u64 {
        self.durations_at(now_ms).sleep_ms()
    }

    /// Mean completed cycle length in minutes.
    pub fn average_cycle_minutes(&self) -> Option<f64> {
        if self.cycle_durations_ms.is_empty() {
            return None;
        }
        let total: u64 = self.cycle_durations_ms.iter().sum();
        Some(total as f64 / self.cycle_durations_ms.len() as f64 / 60_000.0)
    }

    /// Most recent events, newest first.
    pub fn recent_events(&self, count: usize) -> Vec<SleepEvent> {
        self.events.iter().rev().take(count).cloned().collect()
    }
}

/// Progress through a DEEP -> LIGHT -> DEEP traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CycleProgress {
    Idle,
    Deep { start_ms: u64 },
    DeepThenLight { start_ms: u64 },
}

/// Owns and mutates the metrics of one session.
#[derive(Debug)]
pub struct SleepSessionTracker {
    metrics: SessionMetrics,
    sleep_started_ms: Option<u64>,
    cycle: CycleProgress,
}

impl SleepSessionTracker {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            metrics: SessionMetrics::new(started_at),
            sleep_started_ms: None,
            cycle: CycleProgress::Idle,
        }
    }

    pub fn metrics(&self) -> &SessionMetrics {
        &self.metrics
    }

    /// Start the monotonic clock on the first sample.
    pub fn observe_sample(&mut self, timestamp_ms: u64) {
        if self.metrics.start_ms.is_none() {
            self.metrics.start_ms = Some(timestamp_ms);
            self.metrics.state_entered_ms = Some(timestamp_ms);
            log::info!(
                "Session {} started at {}",
                self.metrics.session_id,
                self.metrics.started_at.to_rfc3339()
            );
        }
    }

    pub fn update_breathing(&mut self, breathing: BreathingStats) {
        self.metrics.breathing = breathing;
    }

    /// Account for a committed transition and append its event.
    pub fn record_transition(&mut self, transition: &Transition) -> &SleepEvent {
        let Transition { from, to, at_ms, .. } = *transition;
        self.observe_sample(at_ms);
        self.close_accrual(at_ms);
        self.metrics.current_state = to;

        let cycle_ms = self.advance_cycle(to, at_ms);

        let event = match SleepEventKind::for_transition(from, to) {
            SleepEventKind::NoBreathingAlert => SleepEvent::no_breathing_alert(at_ms, from),
            SleepEventKind::Spasm => {
                self.metrics.spasms += 1;
                SleepEvent::spasm(at_ms, from)
            }
            SleepEventKind::WokeUp => {
                self.metrics.wake_ups += 1;
                let stretch_ms = self
                    .sleep_started_ms
                    .map_or(0, |start| at_ms.saturating_sub(start));
                SleepEvent::woke_up(at_ms, from, stretch_ms as f64 / 1000.0)
            }
            SleepEventKind::FellAsleep => SleepEvent::fell_asleep(at_ms, from, to),
            SleepEventKind::PhaseChange => {
                SleepEvent::phase_change(at_ms, from, to, cycle_ms.map(|ms| ms as f64 / 60_000.0))
            }
            SleepEventKind::StateChange => SleepEvent::state_change(at_ms, from, to),
        };

        if to.is_asleep() && !from.is_asleep() {
            self.sleep_started_ms = Some(at_ms);
        } else if !to.is_asleep() {
            self.sleep_started_ms = None;
        }

        log::debug!("Event {}: {}", event.kind.as_str(), event.message);
        self.metrics.events.push(event);
        let last = self.metrics.events.len() - 1;
        &self.metrics.events[last]
    }

    /// Fold the open accrual up to `now_ms` into the closed totals.
    pub fn close_accrual(&mut self, now_ms: u64) {
        let elapsed = self.metrics.time_in_state_ms(now_ms);
        let state = self.metrics.current_state;
        self.metrics.durations.add(state, elapsed);
        if let Some(entered) = self.metrics.state_entered_ms {
            self.metrics.state_entered_ms = Some(now_ms.max(entered));
        }
    }

    /// Returns the completed cycle length when `to` closes one.
    fn advance_cycle(&mut self, to: SleepState, at_ms: u64) -> Option<u64> {
        let (next, completed) = match (self.cycle, to) {
            (CycleProgress::Idle, SleepState::DeepSleep) => {
                (CycleProgress::Deep { start_ms: at_ms }, None)
            }
            (CycleProgress::Deep { start_ms }, SleepState::LightSleep) => {
                (CycleProgress::DeepThenLight { start_ms }, None)
            }
            (CycleProgress::DeepThenLight { start_ms }, SleepState::DeepSleep) => (
                CycleProgress::Deep { start_ms: at_ms },
                Some(at_ms.saturating_sub(start_ms)),
            ),
            (progress, SleepState::Spasm) => (progress, None),
            (progress, state) if state.is_sleep_family() => (progress, None),
            _ => (CycleProgress::Idle, None),
        };
        self.cycle = next;

        if let Some(cycle_ms) = completed {
            self.metrics.sleep_cycles += 1;
            self.metrics.cycle_durations_ms.push(cycle_ms);
            log::debug!("Sleep cycle completed in {}ms", cycle_ms);
        }
        completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SleepState::*;

    fn commit(tracker: &mut SleepSessionTracker, from: SleepState, to: SleepState, at_ms: u64) {
        tracker.record_transition(&Transition {
            from,
            to,
            at_ms,
            pending_ms: 0,
        });
    }

    fn tracker() -> SleepSessionTracker {
        let mut tracker = SleepSessionTracker::new(Utc::now());
        tracker.observe_sample(0);
        tracker
    }

    #[test]
    fn test_durations_sum_to_elapsed() {
        let mut t = tracker();
        commit(&mut t, Unknown, LightSleep, 2_000);
        commit(&mut t, LightSleep, DeepSleep, 40_000);
        commit(&mut t, DeepSleep, Awake, 100_000);

        let m = t.metrics();
        let durations = m.durations_at(130_000);
        assert_eq!(durations.total_ms(), m.elapsed_ms(130_000));
        assert_eq!(durations.unknown_ms, 2_000);
        assert_eq!(durations.light_sleep_ms, 38_000);
        assert_eq!(durations.deep_sleep_ms, 60_000);
        assert_eq!(durations.awake_ms, 30_000);
        assert_eq!(durations.sleep_ms(), 98_000);
    }

    #[test]
    fn test_open_accrual_advances() {
        let mut t = tracker();
        commit(&mut t, Unknown, DeepSleep, 1_000);
        let m = t.metrics();
        assert_eq!(m.time_in_state_ms(11_000), 10_000);
        assert_eq!(m.total_sleep_ms(11_000), 10_000);
        assert_eq!(m.total_sleep_ms(21_000), 20_000);
    }

    #[test]
    fn test_wake_ups_only_from_sleep() {
        let mut t = tracker();
        commit(&mut t, Unknown, Awake, 1_000);
        assert_eq!(t.metrics().wake_ups, 0);

        commit(&mut t, Awake, LightSleep, 20_000);
        commit(&mut t, LightSleep, Awake, 80_000);
        assert_eq!(t.metrics().wake_ups, 1);

        commit(&mut t, Awake, NoBreathing, 90_000);
        commit(&mut t, NoBreathing, Awake, 95_000);
        assert_eq!(t.metrics().wake_ups, 1);
    }

    #[test]
    fn test_spasm_to_awake_is_not_a_wake_up() {
        let mut t = tracker();
        commit(&mut t, Unknown, DeepSleep, 1_000);
        commit(&mut t, DeepSleep, Spasm, 30_000);
        commit(&mut t, Spasm, Awake, 40_000);

        let m = t.metrics();
        assert_eq!(m.wake_ups, 0);
        assert_eq!(m.spasms, 1);
        assert_eq!(m.events.last().unwrap().kind, SleepEventKind::StateChange);
    }

    #[test]
    fn test_woke_up_carries_sleep_stretch() {
        let mut t = tracker();
        commit(&mut t, Unknown, DeepSleep, 10_000);
        commit(&mut t, DeepSleep, Spasm, 20_000);
        commit(&mut t, Spasm, DeepSleep, 23_000);
        commit(&mut t, DeepSleep, Awake, 70_000);

        let event = t.metrics().events.last().unwrap().clone();
        assert_eq!(event.kind, SleepEventKind::WokeUp);
        assert_eq!(
            event.details,
            crate::event::EventDetails::SleepStretch { sleep_seconds: 60.0 }
        );
    }

    #[test]
    fn test_spasm_counting_uncapped() {
        let mut t = tracker();
        commit(&mut t, Unknown, DeepSleep, 0);
        let mut now = 1_000;
        for _ in 0..15 {
            commit(&mut t, DeepSleep, Spasm, now);
            commit(&mut t, Spasm, DeepSleep, now + 3_000);
            now += 10_000;
        }
        assert_eq!(t.metrics().spasms, 15);
        assert_eq!(t.metrics().events.len(), 31);
    }

    #[test]
    fn test_sleep_cycle_deep_light_deep() {
        let mut t = tracker();
        commit(&mut t, Unknown, DeepSleep, 0);
        commit(&mut t, DeepSleep, LightSleep, 600_000);
        commit(&mut t, LightSleep, Spasm, 700_000);
        commit(&mut t, Spasm, LightSleep, 703_000);
        commit(&mut t, LightSleep, DeepSleep, 1_200_000);

        let m = t.metrics();
        assert_eq!(m.sleep_cycles, 1);
        assert_eq!(m.cycle_durations_ms, vec![1_200_000]);
        assert_eq!(m.average_cycle_minutes(), Some(20.0));
    }

    #[test]
    fn test_awake_breaks_cycle() {
        let mut t = tracker();
        commit(&mut t, Unknown, DeepSleep, 0);
        commit(&mut t, DeepSleep, LightSleep, 60_000);
        commit(&mut t, LightSleep, Awake, 120_000);
        commit(&mut t, Awake, DeepSleep, 200_000);
        assert_eq!(t.metrics().sleep_cycles, 0);
    }

    #[test]
    fn test_one_event_per_commit() {
        let mut t = tracker();
        commit(&mut t, Unknown, LightSleep, 1_000);
        commit(&mut t, LightSleep, NoBreathing, 30_000);
        commit(&mut t, NoBreathing, LightSleep, 40_000);

        let kinds: Vec<_> = t.metrics().events.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SleepEventKind::FellAsleep,
                SleepEventKind::NoBreathingAlert,
                SleepEventKind::StateChange,
            ]
        );
    }

    #[test]
    fn test_recent_events_newest_first() {
        let mut t = tracker();
        commit(&mut t, Unknown, Awake, 1_000);
        commit(&mut t, Awake, LightSleep, 20_000);
        commit(&mut t, LightSleep, DeepSleep, 60_000);

        let recent = t.metrics().recent_events(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].to, DeepSleep);
        assert_eq!(recent[1].to, LightSleep);
    }

    #[test]
    fn test_close_accrual_keeps_sum() {
        let mut t = tracker();
        commit(&mut t, Unknown, DeepSleep, 5_000);
        t.close_accrual(65_000);
        let m = t.metrics();
        assert_eq!(m.durations.deep_sleep_ms, 60_000);
        assert_eq!(m.durations_at(65_000).total_ms(), 65_000);
    }
}
