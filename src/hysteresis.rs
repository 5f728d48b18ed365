// Sleepwatch - Motion-based sleep state monitoring
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Hysteresis between raw candidates and the confirmed state.
//!
//! A raw candidate must persist for the duration required by its
//! (from, to) pair before it is confirmed. Persistence is tracked with a
//! single pending slot: a different candidate replaces it and restarts its
//! timer, and a tick that agrees with the confirmed state clears it.
//!
//! Two shortcuts skip the wait. A raw `UNKNOWN` commits at once. The first
//! classification of a session also commits at once, except `NO_BREATHING`
//! which is never raised before its full confirmation time. Later entries
//! out of `UNKNOWN` wait like any other transition.
//!
//! A confirmed `SPASM` is transient: once it has lasted `spasm_max_ms`
//! without a fresh jerk, the sleep state it interrupted is restored.

use crate::config::ConfirmationConfig;
use crate::state::SleepState;
use serde::{Deserialize, Serialize};

/// Candidate waiting for confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTransition {
    pub target: SleepState,
    pub first_observed_ms: u64,
}

impl PendingTransition {
    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.first_observed_ms)
    }
}

/// A committed state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from: SleepState,
    pub to: SleepState,
    pub at_ms: u64,
    /// How long the candidate was pending; 0 for immediate commits.
    pub pending_ms: u64,
}

/// Required persistence for a transition.
pub fn required_ms(from: SleepState, to: SleepState, config: &ConfirmationConfig) -> u64 {
    match to {
        SleepState::Unknown => 0,
        SleepState::Spasm => config.spasm_ms,
        SleepState::NoBreathing => config.no_breathing_ms,
        SleepState::Awake => config.awake_ms,
        SleepState::DeepSleep | SleepState::LightSleep | SleepState::Sleeping => {
            if from.is_sleep_family() {
                config.phase_change_ms
            } else if from == SleepState::Awake {
                config.sleep_ms
            } else {
                config.resume_ms
            }
        }
    }
}

/// Confirms candidate states once they have persisted long enough.
#[derive(Debug)]
pub struct HysteresisGate {
    config: ConfirmationConfig,
    confirmed: SleepState,
    confirmed_since_ms: Option<u64>,
    pending: Option<PendingTransition>,
    /// Set by the first commit of a session; cleared only by `reset`.
    bootstrapped: bool,
    /// Sleep state a confirmed SPASM interrupted.
    pre_spasm: Option<SleepState>,
}

impl HysteresisGate {
    pub fn new(config: ConfirmationConfig) -> Self {
        Self {
            config,
            confirmed: SleepState::Unknown,
            confirmed_since_ms: None,
            pending: None,
            bootstrapped: false,
            pre_spasm: None,
        }
    }

    pub fn confirmed(&self) -> SleepState {
        self.confirmed
    }

    /// When the confirmed state was entered; `None` before the first commit.
    pub fn confirmed_since_ms(&self) -> Option<u64> {
        self.confirmed_since_ms
    }

    pub fn pending(&self) -> Option<&PendingTransition> {
        self.pending.as_ref()
    }

    /// Confirmed DEEP/LIGHT/SLEEPING, or the one a confirmed SPASM interrupted.
    pub fn sleep_tier(&self) -> Option<SleepState> {
        match self.confirmed {
            state if state.is_sleep_family() => Some(state),
            SleepState::Spasm => self.pre_spasm,
            _ => None,
        }
    }

    /// Feed one raw candidate. `None` holds the confirmed state.
    pub fn observe(&mut self, raw: Option<SleepState>, now_ms: u64) -> Option<Transition> {
        if !matches!(raw, Some(SleepState::Spasm | SleepState::Unknown)) {
            if let Some(transition) = self.end_spasm(now_ms) {
                return Some(transition);
            }
        }

        let Some(raw) = raw else {
            self.pending = None;
            return None;
        };

        if raw == self.confirmed {
            if let Some(pending) = self.pending.take() {
                log::debug!(
                    "Pending {} abandoned after {}ms",
                    pending.target,
                    pending.elapsed_ms(now_ms)
                );
            }
            return None;
        }

        let bootstrap = !self.bootstrapped && raw != SleepState::NoBreathing;
        if raw == SleepState::Unknown || bootstrap {
            return Some(self.commit(raw, now_ms, 0));
        }

        let pending = match self.pending {
            Some(pending) if pending.target == raw => pending,
            _ => {
                let pending = PendingTransition {
                    target: raw,
                    first_observed_ms: now_ms,
                };
                self.pending = Some(pending);
                log::debug!("Pending {} -> {} at {}ms", self.confirmed, raw, now_ms);
                pending
            }
        };

        let elapsed = pending.elapsed_ms(now_ms);
        if elapsed >= required_ms(self.confirmed, raw, &self.config) {
            Some(self.commit(raw, now_ms, elapsed))
        } else {
            None
        }
    }

    pub fn reset(&mut self) {
        self.confirmed = SleepState::Unknown;
        self.confirmed_since_ms = None;
        self.pending = None;
        self.bootstrapped = false;
        self.pre_spasm = None;
    }

    /// Restore the interrupted sleep state once a spasm has run its course.
    fn end_spasm(&mut self, now_ms: u64) -> Option<Transition> {
        if self.confirmed != SleepState::Spasm {
            return None;
        }
        let prior = self.pre_spasm?;
        let held_ms = now_ms.saturating_sub(self.confirmed_since_ms?);
        if held_ms < self.config.spasm_max_ms {
            return None;
        }
        log::debug!("Spasm ended after {}ms", held_ms);
        Some(self.commit(prior, now_ms, held_ms))
    }

    fn commit(&mut self, to: SleepState, now_ms: u64, pending_ms: u64) -> Transition {
        let transition = Transition {
            from: self.confirmed,
            to,
            at_ms: now_ms,
            pending_ms,
        };
        self.pre_spasm = match to {
            SleepState::Spasm if transition.from.is_sleep_family() => Some(transition.from),
            SleepState::Spasm => self.pre_spasm,
            _ => None,
        };
        if to != SleepState::Unknown {
            self.bootstrapped = true;
        }
        self.confirmed = to;
        self.confirmed_since_ms = Some(now_ms);
        self.pending = None;
        log::info!(
            "State {} -> {} at {}ms (pending {}ms)",
            transition.from,
            transition.to,
            now_ms,
            pending_ms
        );
        transition
    }
}
